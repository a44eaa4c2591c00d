//! In-process capture engine
//!
//! Emits the same status sequence a real recorder does and, on stop, writes
//! a JSON manifest of the capture configuration to the output path.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::backend::{CaptureEngine, EngineEvent, EngineStatus};
use crate::error::{ControlError, ControlResult};
use crate::options::CaptureConfiguration;

#[derive(Serialize)]
struct RecordingManifest<'a> {
    path: &'a Path,
    configuration: &'a CaptureConfiguration,
    finished_at: String,
}

pub struct SimulatedEngine {
    config: CaptureConfiguration,
    status: EngineStatus,
    path: Option<PathBuf>,
    finalize_delay: Duration,
    fault_after: Option<Duration>,
    fault_task: Option<JoinHandle<()>>,
    events_tx: mpsc::Sender<EngineEvent>,
    events_rx: Option<mpsc::Receiver<EngineEvent>>,
}

impl SimulatedEngine {
    pub fn new(config: CaptureConfiguration, event_buffer: usize) -> Self {
        let (events_tx, events_rx) = mpsc::channel(event_buffer.max(1));
        Self {
            config,
            status: EngineStatus::Idle,
            path: None,
            finalize_delay: Duration::ZERO,
            fault_after: None,
            fault_task: None,
            events_tx,
            events_rx: Some(events_rx),
        }
    }

    pub fn with_finalize_delay(mut self, delay: Duration) -> Self {
        self.finalize_delay = delay;
        self
    }

    /// Report `Failed` this long after recording starts
    pub fn with_fault_after(mut self, after: Duration) -> Self {
        self.fault_after = Some(after);
        self
    }

    pub fn status(&self) -> EngineStatus {
        self.status
    }

    pub fn configuration(&self) -> &CaptureConfiguration {
        &self.config
    }

    async fn emit(&self, event: EngineEvent) {
        if self.events_tx.send(event).await.is_err() {
            debug!("Engine event dropped, no subscriber");
        }
    }

    async fn set_status(&mut self, status: EngineStatus) {
        self.status = status;
        self.emit(EngineEvent::StatusChanged(status)).await;
    }
}

#[async_trait::async_trait]
impl CaptureEngine for SimulatedEngine {
    async fn set_options(&mut self, config: &CaptureConfiguration) -> ControlResult<()> {
        if self.status == EngineStatus::Finishing {
            return Err(ControlError::engine("Cannot reconfigure while finishing"));
        }
        self.config = config.clone();
        Ok(())
    }

    async fn start(&mut self, path: &Path) -> ControlResult<()> {
        if self.status != EngineStatus::Idle {
            return Err(ControlError::engine("Recorder already started"));
        }

        info!("Simulated recording to {}", path.display());
        self.path = Some(path.to_path_buf());
        self.set_status(EngineStatus::Recording).await;

        if let Some(after) = self.fault_after {
            let tx = self.events_tx.clone();
            self.fault_task = Some(tokio::spawn(async move {
                tokio::time::sleep(after).await;
                let _ = tx
                    .send(EngineEvent::Failed("Simulated capture fault".to_string()))
                    .await;
            }));
        }

        Ok(())
    }

    async fn stop(&mut self) -> ControlResult<()> {
        let path = match (self.status, &self.path) {
            (EngineStatus::Recording | EngineStatus::Paused, Some(path)) => path.clone(),
            _ => return Err(ControlError::engine("Recorder is not recording")),
        };

        if let Some(task) = self.fault_task.take() {
            task.abort();
        }

        self.set_status(EngineStatus::Finishing).await;

        let manifest = serde_json::to_vec_pretty(&RecordingManifest {
            path: &path,
            configuration: &self.config,
            finished_at: chrono::Utc::now().to_rfc3339(),
        })
        .map_err(|e| ControlError::engine(e.to_string()))?;

        let tx = self.events_tx.clone();
        let delay = self.finalize_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let event = match tokio::fs::write(&path, manifest).await {
                Ok(()) => EngineEvent::Completed,
                Err(e) => EngineEvent::Failed(format!("{}: {}", path.display(), e)),
            };
            let _ = tx.send(event).await;
        });

        Ok(())
    }

    async fn pause(&mut self) -> ControlResult<()> {
        match self.status {
            EngineStatus::Recording => {
                self.set_status(EngineStatus::Paused).await;
                Ok(())
            }
            EngineStatus::Paused => Ok(()),
            _ => Err(ControlError::engine("Recorder is not recording")),
        }
    }

    async fn resume(&mut self) -> ControlResult<()> {
        match self.status {
            EngineStatus::Paused => {
                self.set_status(EngineStatus::Recording).await;
                Ok(())
            }
            EngineStatus::Recording => Ok(()),
            _ => Err(ControlError::engine("Recorder is not paused")),
        }
    }

    fn take_events(&mut self) -> Option<mpsc::Receiver<EngineEvent>> {
        self.events_rx.take()
    }

    fn name(&self) -> &str {
        "simulated"
    }
}
