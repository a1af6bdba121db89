use nearspace_core::{PositionUpdate, RoomId};
use std::time::{Duration, Instant};

/// Decides which local position updates are worth sending to the relay.
///
/// An update goes out when the room changes, or when the avatar moved more
/// than `threshold` units on either axis since the last emitted update and at
/// least `min_interval` has passed. Room changes skip the rate limit.
///
/// The newest suppressed position is kept and handed out by
/// [`take_pending`](Self::take_pending) once the rate limit allows, so the
/// relay always ends up with where the avatar actually stopped.
#[derive(Debug, Clone)]
pub struct PositionReporter {
    threshold: f64,
    min_interval: Duration,
    last: Option<(PositionUpdate, Instant)>,
    pending: Option<PositionUpdate>,
}

impl PositionReporter {
    pub fn new(threshold: f64, max_per_second: u32) -> Self {
        let min_interval = if max_per_second == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(1.0 / max_per_second as f64)
        };

        Self {
            threshold,
            min_interval,
            last: None,
            pending: None,
        }
    }

    pub fn should_emit(&mut self, update: &PositionUpdate, now: Instant) -> bool {
        let emit = match &self.last {
            None => true,
            Some((last, at)) => {
                let room_changed = last.room_id != update.room_id;
                let moved = (update.x - last.x).abs() > self.threshold
                    || (update.y - last.y).abs() > self.threshold;
                let throttled = now.saturating_duration_since(*at) < self.min_interval;

                room_changed || (moved && !throttled)
            }
        };

        if emit {
            self.last = Some((update.clone(), now));
            self.pending = None;
        } else if self
            .last
            .as_ref()
            .is_some_and(|(last, _)| last.x != update.x || last.y != update.y)
        {
            self.pending = Some(update.clone());
        } else {
            self.pending = None;
        }
        emit
    }

    /// Returns the last suppressed update once `min_interval` has passed
    /// since the previous emit, and records it as emitted.
    pub fn take_pending(&mut self, now: Instant) -> Option<PositionUpdate> {
        if let Some((_, at)) = &self.last {
            if now.saturating_duration_since(*at) < self.min_interval {
                return None;
            }
        }

        let update = self.pending.take()?;
        self.last = Some((update.clone(), now));
        Some(update)
    }

    pub fn last_room(&self) -> Option<&RoomId> {
        self.last.as_ref().and_then(|(update, _)| update.room_id.as_ref())
    }
}
