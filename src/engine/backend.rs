use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

use super::simulated::SimulatedEngine;
use crate::config::EngineConfig;
use crate::error::ControlResult;
use crate::options::CaptureConfiguration;

/// Status reported by the engine through `EngineEvent::StatusChanged`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineStatus {
    Idle,
    Recording,
    Paused,
    Finishing,
}

/// Notification pushed by the engine, delivered in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    StatusChanged(EngineStatus),
    Completed,
    /// Error description, surfaced to the caller verbatim
    Failed(String),
}

/// Capture engine trait
///
/// Calls must return promptly; long-running work (finalizing the output
/// container) happens on the engine's side and is reported through events.
#[async_trait::async_trait]
pub trait CaptureEngine: Send + Sync {
    /// Replace the active configuration; never called while a start is in flight
    async fn set_options(&mut self, config: &CaptureConfiguration) -> ControlResult<()>;

    /// Begin recording to `path`
    async fn start(&mut self, path: &Path) -> ControlResult<()>;

    /// Request the end of recording; completion arrives as `EngineEvent::Completed`
    async fn stop(&mut self) -> ControlResult<()>;

    async fn pause(&mut self) -> ControlResult<()>;

    async fn resume(&mut self) -> ControlResult<()>;

    /// Hand out the event receiver; `None` once it has been taken
    fn take_events(&mut self) -> Option<mpsc::Receiver<EngineEvent>>;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Available engine backends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// In-process engine that emits the real event sequence and writes a manifest
    #[default]
    Simulated,
}

/// Capture engine factory
pub struct EngineFactory;

impl EngineFactory {
    /// Create an engine with its initial configuration
    pub fn create(
        config: &EngineConfig,
        initial: CaptureConfiguration,
        event_buffer: usize,
    ) -> ControlResult<Box<dyn CaptureEngine>> {
        let engine: Box<dyn CaptureEngine> = match config.backend {
            EngineKind::Simulated => {
                let mut engine = SimulatedEngine::new(initial, event_buffer)
                    .with_finalize_delay(Duration::from_millis(config.finalize_delay_ms));
                if let Some(ms) = config.fail_after_ms {
                    engine = engine.with_fault_after(Duration::from_millis(ms));
                }
                Box::new(engine)
            }
        };

        info!("Capture engine created: {}", engine.name());

        Ok(engine)
    }
}
