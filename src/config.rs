use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::devices::DeviceDescriptor;
use crate::engine::EngineKind;

/// Prefix for environment overrides, e.g. `CAPCTL__SESSION__PROGRESS_INTERVAL_MS=20`
pub const ENV_PREFIX: &str = "CAPCTL";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub session: SessionSettings,
    pub engine: EngineConfig,
    pub devices: DeviceInventory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, overridden by `RUST_LOG` when set
    pub level: String,
    /// Emit structured JSON logs instead of human-readable lines
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Whether elapsed-time progress is written while recording
    pub progress_enabled: bool,
    /// Progress reporter tick
    pub progress_interval_ms: u64,
    /// How long to wait for the engine's terminal event after a stop
    pub finish_timeout_ms: u64,
    /// Capacity of the engine event channel
    pub event_buffer: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            progress_enabled: true,
            progress_interval_ms: 50,
            finish_timeout_ms: 30_000,
            event_buffer: 100,
        }
    }
}

impl SessionSettings {
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms.max(1))
    }

    pub fn finish_timeout(&self) -> Duration {
        Duration::from_millis(self.finish_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub backend: EngineKind,
    /// Simulated time spent finalizing the container after a stop
    pub finalize_delay_ms: u64,
    /// Simulated backend only: report a failure this long after start
    pub fail_after_ms: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backend: EngineKind::Simulated,
            finalize_delay_ms: 200,
            fail_after_ms: None,
        }
    }
}

/// Device listing served by the static resolver, in engine order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceInventory {
    pub audio_inputs: Vec<DeviceDescriptor>,
    pub audio_outputs: Vec<DeviceDescriptor>,
    pub displays: Vec<DeviceDescriptor>,
}

impl Config {
    /// Layer defaults, an optional config file and `CAPCTL__*` environment variables
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        settings
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}
