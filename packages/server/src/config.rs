//! Server configuration.
//!
//! Each component owns a config struct with sensible defaults. The binary fills
//! them from command-line flags and `DOJO_*` environment variables.

use std::{path::PathBuf, time::Duration};

use thiserror::Error;

use crate::{
    infrastructure::sandbox::{DockerSandboxConfig, ExecutorConfig},
    usecase::GameConfig,
};

/// Per-connection limits for the WebSocket pumps.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Capacity of each connection's outbound queue.
    pub outbound_queue_capacity: usize,
    /// Largest inbound message accepted.
    pub max_message_size: usize,
    /// Time allowed between two inbound frames before the connection is dropped.
    pub pong_wait: Duration,
    /// Interval between server pings. Must be shorter than `pong_wait`.
    pub ping_period: Duration,
    /// Time allowed to write a single frame.
    pub write_wait: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        let pong_wait = Duration::from_secs(60);
        Self {
            outbound_queue_capacity: 256,
            max_message_size: 16 * 1024,
            pong_wait,
            ping_period: pong_wait * 9 / 10,
            write_wait: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("ping period ({ping_period:?}) must be shorter than pong wait ({pong_wait:?})")]
    PingPeriodTooLong {
        ping_period: Duration,
        pong_wait: Duration,
    },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Everything the server binary needs to start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// JSON file with challenges and users to load at startup.
    pub seed_file: Option<PathBuf>,
    pub hub: HubConfig,
    pub game: GameConfig,
    pub executor: ExecutorConfig,
    pub sandbox: DockerSandboxConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            seed_file: None,
            hub: HubConfig::default(),
            game: GameConfig::default(),
            executor: ExecutorConfig::default(),
            sandbox: DockerSandboxConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hub.ping_period >= self.hub.pong_wait {
            return Err(ConfigError::PingPeriodTooLong {
                ping_period: self.hub.ping_period,
                pong_wait: self.hub.pong_wait,
            });
        }

        let sizes = [
            ("outbound queue capacity", self.hub.outbound_queue_capacity),
            ("max message size", self.hub.max_message_size),
            ("worker count", self.executor.workers),
            ("execution queue capacity", self.executor.queue_capacity),
            ("max output bytes", self.sandbox.max_output_bytes),
        ];
        if let Some((name, _)) = sizes.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Zero(*name));
        }
        if self.executor.timeout.is_zero() {
            return Err(ConfigError::Zero("execution timeout"));
        }

        Ok(())
    }
}
