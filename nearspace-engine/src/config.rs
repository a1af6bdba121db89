use crate::error::EngineError;
use crate::proximity::DEFAULT_PROXIMITY_RADIUS;
use crate::transport::TransportConfig;
use nearspace_core::{IceServerConfig, ParticipantId, Position};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Spawn point used when a participant first joins a space.
pub const SPAWN_POSITION: Position = Position { x: 340.0, y: 500.0 };

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub space_id: String,
    pub self_id: ParticipantId,
    pub display_name: String,
    pub relay_url: String,
    pub proximity_radius: f64,
    pub ice_servers: Vec<IceServerConfig>,
    pub signaling_retry_delay_ms: u64,
    pub signaling_retry_attempts: u32,
    /// Consecutive failed reconnects before the relay client gives up.
    pub relay_reconnect_attempts: u32,
    /// First reconnect delay; doubles per attempt up to 30s.
    pub relay_reconnect_delay_ms: u64,
    pub movement_threshold: f64,
    pub max_updates_per_second: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            space_id: String::new(),
            self_id: ParticipantId::generate(),
            display_name: String::from("Guest"),
            relay_url: String::from("ws://localhost:3001/ws"),
            proximity_radius: DEFAULT_PROXIMITY_RADIUS,
            ice_servers: TransportConfig::default().ice_servers,
            signaling_retry_delay_ms: 100,
            signaling_retry_attempts: 1,
            relay_reconnect_attempts: 5,
            relay_reconnect_delay_ms: 1000,
            movement_threshold: 10.0,
            max_updates_per_second: 20,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.self_id.as_str().is_empty() {
            return Err(EngineError::InvalidConfig("self_id must not be empty".into()));
        }
        if self.proximity_radius.is_nan() || self.proximity_radius <= 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "proximity_radius must be positive, got {}",
                self.proximity_radius
            )));
        }
        Ok(())
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.signaling_retry_delay_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.relay_reconnect_delay_ms)
    }

    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            ice_servers: self.ice_servers.clone(),
        }
    }
}
