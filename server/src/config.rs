//! Process-start parameters for the server.

use crate::game::RoundSettings;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("round time must be positive, got {0}")]
    RoundTime(f32),
    #[error("tick rate must be at least 1 Hz")]
    TickRate,
    #[error("broadcast rate must be at least 1 Hz")]
    BroadcastRate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// When false the simulation runs without a listener.
    pub network_enabled: bool,
    pub round_time: f32,
    pub tick_rate: u32,
    pub broadcast_rate: u32,
    pub starting_money: u32,
    /// Read commands from stdin as well as from the network.
    pub console: bool,
    pub seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9999,
            network_enabled: true,
            round_time: 180.0,
            tick_rate: 60,
            broadcast_rate: 10,
            starting_money: 200,
            console: false,
            seed: None,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.round_time > 0.0 && self.round_time.is_finite()) {
            return Err(ConfigError::RoundTime(self.round_time));
        }
        if self.tick_rate == 0 {
            return Err(ConfigError::TickRate);
        }
        if self.broadcast_rate == 0 {
            return Err(ConfigError::BroadcastRate);
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn round_settings(&self) -> RoundSettings {
        RoundSettings {
            round_time: self.round_time,
            starting_money: self.starting_money,
            seed: self.seed,
        }
    }
}
