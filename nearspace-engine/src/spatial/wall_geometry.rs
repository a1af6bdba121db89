use nearspace_core::{Bounds, Entrance, Room, Side};

/// Default wall thickness used by the map renderer.
pub const WALL_THICKNESS: f64 = 10.0;

/// Collision rectangles for the four walls of `room`, with a gap cut out for
/// every entrance. Walls sit outside the room bounds.
pub fn wall_segments(room: &Room, thickness: f64) -> Vec<Bounds> {
    let b = room.bounds;
    let mut segments = Vec::new();

    for side in [Side::Top, Side::Bottom, Side::Left, Side::Right] {
        let (x, y, length) = match side {
            Side::Top => (b.x, b.y - thickness, b.width),
            Side::Bottom => (b.x, b.bottom(), b.width),
            Side::Left => (b.x - thickness, b.y, b.height),
            Side::Right => (b.right(), b.y, b.height),
        };

        for (start, len) in open_spans(length, &room.entrances, side) {
            let rect = match side {
                Side::Top | Side::Bottom => Bounds::new(x + start, y, len, thickness),
                Side::Left | Side::Right => Bounds::new(x, y + start, thickness, len),
            };
            segments.push(rect);
        }
    }

    segments
}

/// `(start, length)` of every wall piece left on one side after removing
/// the entrances on that side.
fn open_spans(length: f64, entrances: &[Entrance], side: Side) -> Vec<(f64, f64)> {
    let mut gaps: Vec<&Entrance> = entrances.iter().filter(|e| e.side == side).collect();
    gaps.sort_by(|a, b| a.offset.total_cmp(&b.offset));

    let mut spans = Vec::new();
    let mut cursor = 0.0;

    for gap in gaps {
        let start = gap.offset.clamp(0.0, length);
        let end = (gap.offset + gap.width).clamp(0.0, length);

        let len = start - cursor;
        if len > 0.0 {
            spans.push((cursor, len));
        }
        cursor = cursor.max(end);
    }

    if length - cursor > 0.0 {
        spans.push((cursor, length - cursor));
    }

    spans
}
