use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument};

use super::progress::ProgressReporter;
use super::session::{Session, SessionSnapshot, TransitionGate};
use super::state::{SessionState, Trigger};
use crate::config::SessionSettings;
use crate::devices::DeviceResolver;
use crate::engine::{CaptureEngine, EngineEvent, EngineStatus};
use crate::error::{ControlError, ControlResult};
use crate::options::{self, PartialOptions, RegionBounds};
use crate::protocol::{parse_line, Command, Output, OutputSender, SourceSelection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    /// Stop was acknowledged; leave the read loop and wait for the engine
    Finish,
}

/// Drives one session: command intake, engine events and progress, all
/// funnelled through a single `TransitionGate`
pub struct SessionController {
    gate: TransitionGate,
    engine: Box<dyn CaptureEngine>,
    resolver: Arc<dyn DeviceResolver>,
    settings: SessionSettings,
    /// Session creation options; `start` takes its region from here
    defaults: PartialOptions,
    output: OutputSender,
    output_path: PathBuf,
    cancel: CancellationToken,
    autostart: bool,
}

impl SessionController {
    pub fn new(
        session: Session,
        engine: Box<dyn CaptureEngine>,
        resolver: Arc<dyn DeviceResolver>,
        settings: SessionSettings,
        defaults: PartialOptions,
        output: OutputSender,
    ) -> Self {
        let output_path = session.output_path().to_path_buf();
        let gate = TransitionGate::new(session, output.clone());

        Self {
            gate,
            engine,
            resolver,
            settings,
            defaults,
            output,
            output_path,
            cancel: CancellationToken::new(),
            autostart: false,
        }
    }

    /// Begin recording with the session defaults before reading any command
    pub fn with_autostart(mut self, autostart: bool) -> Self {
        self.autostart = autostart;
        self
    }

    /// Raising this token stops progress, stops the engine and ends the read loop
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn gate(&self) -> TransitionGate {
        self.gate.clone()
    }

    /// Run the session until it ends, input closes, or cancellation
    pub async fn run<R>(self, input: R) -> ControlResult<SessionSnapshot>
    where
        R: AsyncBufRead + Unpin,
    {
        let span = tracing::info_span!("session", id = %self.gate.snapshot().id);
        self.run_session(input).instrument(span).await
    }

    async fn run_session<R>(mut self, input: R) -> ControlResult<SessionSnapshot>
    where
        R: AsyncBufRead + Unpin,
    {
        let events = self
            .engine
            .take_events()
            .ok_or_else(|| ControlError::engine("Engine event stream already taken"))?;

        let events_token = CancellationToken::new();
        let event_task = tokio::spawn(
            consume_events(self.gate.clone(), events, events_token.clone()).in_current_span(),
        );

        let progress_token = self.cancel.child_token();
        let progress_task = self.settings.progress_enabled.then(|| {
            let reporter = ProgressReporter::new(
                self.gate.clone(),
                self.settings.progress_interval(),
                progress_token.clone(),
            );
            tokio::spawn(reporter.run().in_current_span())
        });

        info!(
            "Session ready on {} engine, output {}",
            self.engine.name(),
            self.output_path.display()
        );

        let mut flow = Flow::Continue;
        if self.autostart {
            let sources = SourceSelection {
                audio_disabled: self.defaults.audio_disabled,
                ..SourceSelection::default()
            };
            flow = self.handle_command(Command::Start { sources }).await;
        }

        let mut state_rx = self.gate.subscribe();
        let mut lines = input.lines();

        while flow == Flow::Continue && !self.gate.state().is_terminal() {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Cancellation requested");
                    break;
                }
                changed = state_rx.changed() => {
                    if changed.is_err() || state_rx.borrow_and_update().is_terminal() {
                        break;
                    }
                }
                line = lines.next_line() => match line {
                    Ok(Some(line)) => flow = self.handle_line(&line).await,
                    Ok(None) => {
                        info!("Command input closed");
                        break;
                    }
                    Err(e) => {
                        error!("Failed to read command input: {}", e);
                        break;
                    }
                },
            }
        }

        self.finish(&mut state_rx).await;

        progress_token.cancel();
        events_token.cancel();

        if let Some(task) = progress_task {
            if let Err(e) = task.await {
                error!("Progress task panicked: {}", e);
            }
        }
        if let Err(e) = event_task.await {
            error!("Engine event task panicked: {}", e);
        }

        let snapshot = self.gate.snapshot();
        info!(
            summary = %serde_json::to_string(&snapshot).unwrap_or_default(),
            "Session ended {}",
            snapshot.state
        );

        Ok(snapshot)
    }

    /// Stop a live recording and wait, bounded, for the engine's verdict
    async fn finish(&mut self, state_rx: &mut watch::Receiver<SessionState>) {
        if matches!(
            self.gate.state(),
            SessionState::Recording | SessionState::Paused
        ) {
            info!("Stopping recording before exit");
            self.stop_recording().await;
        }

        if self.gate.state() != SessionState::Finishing {
            return;
        }

        let wait_terminal = async {
            loop {
                if state_rx.borrow_and_update().is_terminal() {
                    break;
                }
                if state_rx.changed().await.is_err() {
                    break;
                }
            }
        };

        let timeout = self.settings.finish_timeout();
        if tokio::time::timeout(timeout, wait_terminal).await.is_err() {
            warn!("Engine did not finish within {:?}", timeout);
        }
    }

    async fn handle_line(&mut self, line: &str) -> Flow {
        match parse_line(line) {
            Ok(Some(command)) => self.handle_command(command).await,
            Ok(None) => Flow::Continue,
            Err(e) => {
                warn!(line, "Discarding command: {}", e);
                Flow::Continue
            }
        }
    }

    async fn handle_command(&mut self, command: Command) -> Flow {
        if let Err(e) = self.gate.check(command.kind()) {
            warn!("Rejecting command: {}", e);
            return Flow::Continue;
        }

        match command {
            Command::SetOptions { region, sources } => {
                let requested = self.requested(region, sources);
                self.begin(requested).await
            }
            Command::Start { sources } => {
                let requested = self.requested(self.defaults.region, sources);
                self.begin(requested).await
            }
            Command::Pause => {
                // the engine's StatusChanged(Paused) performs the transition
                if let Err(e) = self.engine.pause().await {
                    self.engine_failed(e);
                }
                Flow::Continue
            }
            Command::Resume => self.resume().await,
            Command::Stop => self.stop_recording().await,
            Command::ListAudioDevices => {
                self.list_audio_devices();
                Flow::Continue
            }
        }
    }

    fn requested(&self, region: RegionBounds, sources: SourceSelection) -> PartialOptions {
        PartialOptions {
            region,
            audio_disabled: sources.audio_disabled,
            audio_input_device: sources.audio_input_device,
            audio_output_device: self.defaults.audio_output_device.clone(),
            display: sources.display_name,
        }
    }

    async fn begin(&mut self, requested: PartialOptions) -> Flow {
        let config = match options::build(&requested, self.resolver.as_ref()) {
            Ok(config) => config,
            Err(e) => {
                warn!("Rejecting configuration: {}", e);
                let _ = self.output.send(Output::Rejected(e.to_string()));
                return Flow::Continue;
            }
        };

        debug!(?config, "Capture configuration resolved");

        if let Err(e) = self.engine.set_options(&config).await {
            self.engine_failed(e);
            return Flow::Continue;
        }
        if let Err(e) = self.engine.start(&self.output_path).await {
            self.engine_failed(e);
            return Flow::Continue;
        }

        if let Err(e) = self.gate.apply(Trigger::Started(config)) {
            warn!("Engine started but the session moved on: {}", e);
        }

        Flow::Continue
    }

    async fn resume(&mut self) -> Flow {
        if let Err(e) = self.gate.apply(Trigger::Resume) {
            warn!("Rejecting command: {}", e);
            return Flow::Continue;
        }
        if let Err(e) = self.engine.resume().await {
            self.engine_failed(e);
        }
        Flow::Continue
    }

    async fn stop_recording(&mut self) -> Flow {
        if let Err(e) = self.gate.apply(Trigger::Stop) {
            warn!("Rejecting command: {}", e);
            return Flow::Continue;
        }

        match self.engine.stop().await {
            Ok(()) => info!("Stop acknowledged by engine"),
            Err(e) => self.engine_failed(e),
        }

        Flow::Finish
    }

    fn list_audio_devices(&self) {
        let devices = self.resolver.list_audio_input_devices().unwrap_or_else(|e| {
            warn!("Listing audio devices: {}", e);
            Vec::new()
        });
        let _ = self.output.send(Output::AudioDevices(devices));
    }

    /// Engine call errors are terminal; there is no retry
    fn engine_failed(&self, e: ControlError) {
        error!("Engine call failed: {}", e);
        if let Err(e) = self.gate.apply(Trigger::EngineFailed(e.to_string())) {
            debug!("Failure not applied: {}", e);
        }
    }
}

/// Apply engine events, in arrival order, until cancelled or terminal
pub async fn consume_events(
    gate: TransitionGate,
    mut events: mpsc::Receiver<EngineEvent>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => {
                    debug!("Engine event stream closed");
                    break;
                }
            },
        };

        let trigger = match event {
            EngineEvent::StatusChanged(EngineStatus::Paused) => Trigger::EnginePaused,
            EngineEvent::StatusChanged(status) => {
                debug!(?status, "Engine status");
                continue;
            }
            EngineEvent::Completed => Trigger::EngineCompleted,
            EngineEvent::Failed(error) => Trigger::EngineFailed(error),
        };

        if let Err(e) = gate.apply(trigger) {
            debug!("Ignoring engine event: {}", e);
        }

        if gate.state().is_terminal() {
            break;
        }
    }
}
