// Shared fixtures for controller tests

#![allow(dead_code)]

use capture_control::config::{DeviceInventory, SessionSettings};
use capture_control::error::{ControlError, ControlResult};
use capture_control::protocol::{output, Output, OutputReceiver};
use capture_control::{
    CaptureConfiguration, CaptureEngine, DeviceDescriptor, EngineEvent, EngineStatus,
    PartialOptions, Session, SessionController, SessionSnapshot, StaticDeviceResolver,
};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufReader, DuplexStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Engine double that records every call and echoes status events
pub struct ScriptedEngine {
    calls: Arc<Mutex<Vec<String>>>,
    configs: Arc<Mutex<Vec<CaptureConfiguration>>>,
    events_tx: mpsc::Sender<EngineEvent>,
    events_rx: Option<mpsc::Receiver<EngineEvent>>,
    complete_on_stop: bool,
    fail_start: Option<String>,
}

/// Test-side view of a `ScriptedEngine` after it moved into the controller
#[derive(Clone)]
pub struct EngineProbe {
    calls: Arc<Mutex<Vec<String>>>,
    configs: Arc<Mutex<Vec<CaptureConfiguration>>>,
    events_tx: mpsc::Sender<EngineEvent>,
}

impl EngineProbe {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_config(&self) -> Option<CaptureConfiguration> {
        self.configs.lock().unwrap().last().cloned()
    }

    pub async fn send(&self, event: EngineEvent) {
        self.events_tx.send(event).await.unwrap();
    }
}

impl ScriptedEngine {
    pub fn new() -> Self {
        let (events_tx, events_rx) = mpsc::channel(64);
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            configs: Arc::new(Mutex::new(Vec::new())),
            events_tx,
            events_rx: Some(events_rx),
            complete_on_stop: true,
            fail_start: None,
        }
    }

    /// Leave completion to the test instead of reporting it on stop
    pub fn manual_completion(mut self) -> Self {
        self.complete_on_stop = false;
        self
    }

    pub fn failing_start(mut self, error: &str) -> Self {
        self.fail_start = Some(error.to_string());
        self
    }

    pub fn probe(&self) -> EngineProbe {
        EngineProbe {
            calls: Arc::clone(&self.calls),
            configs: Arc::clone(&self.configs),
            events_tx: self.events_tx.clone(),
        }
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    async fn emit(&self, event: EngineEvent) {
        let _ = self.events_tx.send(event).await;
    }
}

#[async_trait::async_trait]
impl CaptureEngine for ScriptedEngine {
    async fn set_options(&mut self, config: &CaptureConfiguration) -> ControlResult<()> {
        self.record("set_options");
        self.configs.lock().unwrap().push(config.clone());
        Ok(())
    }

    async fn start(&mut self, path: &Path) -> ControlResult<()> {
        self.record(format!("start:{}", path.display()));
        if let Some(error) = &self.fail_start {
            return Err(ControlError::engine(error.clone()));
        }
        self.emit(EngineEvent::StatusChanged(EngineStatus::Recording))
            .await;
        Ok(())
    }

    async fn stop(&mut self) -> ControlResult<()> {
        self.record("stop");
        self.emit(EngineEvent::StatusChanged(EngineStatus::Finishing))
            .await;
        if self.complete_on_stop {
            self.emit(EngineEvent::Completed).await;
        }
        Ok(())
    }

    async fn pause(&mut self) -> ControlResult<()> {
        self.record("pause");
        self.emit(EngineEvent::StatusChanged(EngineStatus::Paused))
            .await;
        Ok(())
    }

    async fn resume(&mut self) -> ControlResult<()> {
        self.record("resume");
        self.emit(EngineEvent::StatusChanged(EngineStatus::Recording))
            .await;
        Ok(())
    }

    fn take_events(&mut self) -> Option<mpsc::Receiver<EngineEvent>> {
        self.events_rx.take()
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

pub fn inventory() -> DeviceInventory {
    DeviceInventory {
        audio_inputs: vec![
            DeviceDescriptor::new("mic-usb", "USB Microphone"),
            DeviceDescriptor::new("mic-array", "Microphone Array"),
        ],
        audio_outputs: vec![DeviceDescriptor::new("speakers", "Speakers")],
        displays: vec![
            DeviceDescriptor::new(r"\\.\DISPLAY1", "Primary"),
            DeviceDescriptor::new(r"\\.\DISPLAY2", "Secondary"),
        ],
    }
}

pub fn quiet_settings() -> SessionSettings {
    SessionSettings {
        progress_enabled: false,
        progress_interval_ms: 10,
        finish_timeout_ms: 2_000,
        event_buffer: 64,
    }
}

/// A controller running on its own task, fed through an in-memory pipe
pub struct Harness {
    pub input: DuplexStream,
    pub outputs: OutputReceiver,
    pub probe: EngineProbe,
    pub gate: capture_control::TransitionGate,
    pub cancel: tokio_util::sync::CancellationToken,
    pub task: JoinHandle<ControlResult<SessionSnapshot>>,
}

pub struct HarnessBuilder {
    engine: ScriptedEngine,
    settings: SessionSettings,
    defaults: PartialOptions,
    autostart: bool,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            engine: ScriptedEngine::new(),
            settings: quiet_settings(),
            defaults: PartialOptions::default(),
            autostart: false,
        }
    }

    pub fn engine(mut self, engine: ScriptedEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn settings(mut self, settings: SessionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn defaults(mut self, defaults: PartialOptions) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn autostart(mut self) -> Self {
        self.autostart = true;
        self
    }

    pub fn spawn(self) -> Harness {
        let probe = self.engine.probe();
        let (output_tx, outputs) = output::channel();
        let (input, controller_side) = tokio::io::duplex(4096);

        let controller = SessionController::new(
            Session::new("capture.mp4"),
            Box::new(self.engine),
            Arc::new(StaticDeviceResolver::new(inventory())),
            self.settings,
            self.defaults,
            output_tx,
        )
        .with_autostart(self.autostart);

        let gate = controller.gate();
        let cancel = controller.cancellation_token();
        let task = tokio::spawn(controller.run(BufReader::new(controller_side)));

        Harness {
            input,
            outputs,
            probe,
            gate,
            cancel,
            task,
        }
    }
}

impl Harness {
    pub async fn send(&mut self, line: &str) {
        self.input
            .write_all(format!("{}\n", line).as_bytes())
            .await
            .unwrap();
    }

    /// Next non-progress output, failing the test after two seconds
    pub async fn next_status(&mut self) -> Output {
        loop {
            let output = tokio::time::timeout(Duration::from_secs(2), self.outputs.recv())
                .await
                .expect("timed out waiting for output")
                .expect("output channel closed");
            if !output.is_progress() {
                return output;
            }
        }
    }

    /// Close input and wait for the session to end
    pub async fn finish(self) -> (SessionSnapshot, OutputReceiver, EngineProbe) {
        drop(self.input);
        let snapshot = tokio::time::timeout(Duration::from_secs(5), self.task)
            .await
            .expect("controller did not stop")
            .expect("controller panicked")
            .expect("controller failed");
        (snapshot, self.outputs, self.probe)
    }
}

/// Remaining non-progress outputs once every sender is gone
pub fn drain_statuses(outputs: &mut OutputReceiver) -> Vec<Output> {
    let mut statuses = Vec::new();
    while let Ok(output) = outputs.try_recv() {
        if !output.is_progress() {
            statuses.push(output);
        }
    }
    statuses
}
