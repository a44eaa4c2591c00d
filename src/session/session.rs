use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};
use uuid::Uuid;

use super::clock::ElapsedClock;
use super::state::{SessionState, Trigger};
use crate::error::{ControlError, ControlResult};
use crate::options::CaptureConfiguration;
use crate::protocol::{CommandKind, Output, OutputSender};

/// A state change that was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub from: SessionState,
    pub to: SessionState,
}

impl Transition {
    /// Status line announcing this transition
    fn output(&self, error: Option<&str>) -> Option<Output> {
        match (self.from, self.to) {
            (SessionState::Idle, SessionState::Recording) => Some(Output::RecordingStarted),
            (SessionState::Paused, SessionState::Recording) => Some(Output::RecordingResumed),
            (_, SessionState::Paused) => Some(Output::RecordingPaused),
            (_, SessionState::Finishing) => Some(Output::Finishing),
            (_, SessionState::Completed) => Some(Output::RecordingCompleted),
            (_, SessionState::Failed) => Some(Output::RecordingFailed(
                error.unwrap_or_default().to_string(),
            )),
            _ => None,
        }
    }
}

/// The single recording session of a process run
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    output_path: PathBuf,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    state: SessionState,
    config: Option<Arc<CaptureConfiguration>>,
    clock: ElapsedClock,
    error: Option<String>,
    history: Vec<Transition>,
}

impl Session {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            id: Uuid::new_v4(),
            output_path: output_path.into(),
            created_at: Utc::now(),
            started_at: None,
            state: SessionState::Idle,
            config: None,
            clock: ElapsedClock::default(),
            error: None,
            history: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed()
    }

    pub fn configuration(&self) -> Option<&CaptureConfiguration> {
        self.config.as_deref()
    }

    /// Apply `trigger` if the transition table allows it from the current state
    pub fn fire(&mut self, trigger: Trigger) -> ControlResult<Transition> {
        let from = self.state;
        let to = from
            .next(&trigger)
            .ok_or_else(|| ControlError::illegal(from, trigger.name()))?;

        match trigger {
            Trigger::Started(config) => {
                self.config = Some(Arc::new(config));
                self.started_at = Some(Utc::now());
                self.clock.restart();
            }
            Trigger::EnginePaused | Trigger::Stop => self.clock.pause(),
            Trigger::Resume => self.clock.resume(),
            Trigger::EngineCompleted => self.clock.pause(),
            Trigger::EngineFailed(error) => {
                self.clock.pause();
                self.error = Some(error);
            }
        }

        self.state = to;
        let transition = Transition { from, to };
        self.history.push(transition);

        Ok(transition)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            output_path: self.output_path.clone(),
            state: self.state,
            elapsed_ms: self.clock.elapsed().as_millis() as u64,
            created_at: self.created_at,
            started_at: self.started_at,
            configuration: self.config.as_deref().cloned(),
            error: self.error.clone(),
            history: self.history.clone(),
        }
    }
}

/// Point-in-time copy of the session for reporting
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub output_path: PathBuf,
    pub state: SessionState,
    pub elapsed_ms: u64,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub configuration: Option<CaptureConfiguration>,
    pub error: Option<String>,
    pub history: Vec<Transition>,
}

/// Serializes every transition on the session
///
/// Command intake, the engine event consumer and the progress reporter all
/// go through one lock. The pre-state is checked and the transition applied
/// under that lock, and the status line is queued before it is released, so
/// output order always matches transition order.
#[derive(Clone)]
pub struct TransitionGate {
    session: Arc<Mutex<Session>>,
    state_tx: Arc<watch::Sender<SessionState>>,
    output: OutputSender,
}

impl TransitionGate {
    pub fn new(session: Session, output: OutputSender) -> Self {
        let (state_tx, _) = watch::channel(session.state());
        Self {
            session: Arc::new(Mutex::new(session)),
            state_tx: Arc::new(state_tx),
            output,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Compare-and-transition: applies only if legal from the state held right now
    pub fn apply(&self, trigger: Trigger) -> ControlResult<Transition> {
        let mut session = self.lock();
        let transition = session.fire(trigger)?;

        info!("Session {} -> {}", transition.from, transition.to);

        if let Some(line) = transition.output(session.error.as_deref()) {
            let _ = self.output.send(line);
        }
        self.state_tx.send_replace(transition.to);

        Ok(transition)
    }

    /// Legality check for a command that does not itself transition yet
    pub fn check(&self, kind: CommandKind) -> ControlResult<SessionState> {
        let state = self.lock().state();
        if state.permits(kind) {
            Ok(state)
        } else {
            Err(ControlError::illegal(state, kind.as_str()))
        }
    }

    /// Queue a progress line if, and only if, the session is recording
    pub fn emit_progress(&self) -> SessionState {
        let session = self.lock();
        if session.state() == SessionState::Recording {
            let _ = self.output.send(Output::Progress(session.elapsed()));
        } else {
            debug!("Progress skipped while {}", session.state());
        }
        session.state()
    }

    pub fn state(&self) -> SessionState {
        self.lock().state()
    }

    pub fn output_path(&self) -> PathBuf {
        self.lock().output_path().to_path_buf()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock().snapshot()
    }

    /// Observe state changes, e.g. to wait for a terminal state
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{AudioSelection, RegionBounds};
    use crate::protocol::output;

    fn config() -> CaptureConfiguration {
        CaptureConfiguration {
            region: RegionBounds::FULL_DISPLAY,
            audio: AudioSelection {
                enabled: false,
                input_device: None,
                output_device: None,
                input_enabled: true,
                output_enabled: true,
            },
            display: None,
        }
    }

    #[test]
    fn test_fire_records_history() {
        let mut session = Session::new("out.mp4");
        session.fire(Trigger::Started(config())).unwrap();
        session.fire(Trigger::Stop).unwrap();
        session.fire(Trigger::EngineCompleted).unwrap();

        let snapshot = session.snapshot();
        assert_eq!(snapshot.state, SessionState::Completed);
        assert_eq!(snapshot.history.len(), 3);
        assert!(snapshot.configuration.is_some());
        assert!(snapshot.started_at.is_some());
    }

    #[test]
    fn test_illegal_trigger_leaves_session_untouched() {
        let mut session = Session::new("out.mp4");
        let err = session.fire(Trigger::Resume).unwrap_err();
        assert!(matches!(
            err,
            ControlError::IllegalTransition {
                state: SessionState::Idle,
                ..
            }
        ));
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.snapshot().history.is_empty());
    }

    #[test]
    fn test_gate_emits_status_lines_in_order() {
        let (tx, mut rx) = output::channel();
        let gate = TransitionGate::new(Session::new("out.mp4"), tx);

        gate.apply(Trigger::Started(config())).unwrap();
        gate.apply(Trigger::EnginePaused).unwrap();
        gate.apply(Trigger::Resume).unwrap();
        gate.apply(Trigger::EngineFailed("device lost".to_string()))
            .unwrap();

        assert_eq!(rx.try_recv().unwrap(), Output::RecordingStarted);
        assert_eq!(rx.try_recv().unwrap(), Output::RecordingPaused);
        assert_eq!(rx.try_recv().unwrap(), Output::RecordingResumed);
        assert_eq!(
            rx.try_recv().unwrap(),
            Output::RecordingFailed("device lost".to_string())
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_progress_only_while_recording() {
        let (tx, mut rx) = output::channel();
        let gate = TransitionGate::new(Session::new("out.mp4"), tx);

        assert_eq!(gate.emit_progress(), SessionState::Idle);
        assert!(rx.try_recv().is_err());

        gate.apply(Trigger::Started(config())).unwrap();
        let _ = rx.try_recv();
        assert_eq!(gate.emit_progress(), SessionState::Recording);
        assert!(rx.try_recv().unwrap().is_progress());
    }

    #[test]
    fn test_watch_tracks_state() {
        let (tx, _rx) = output::channel();
        let gate = TransitionGate::new(Session::new("out.mp4"), tx);
        let watcher = gate.subscribe();

        gate.apply(Trigger::EngineFailed("no display".to_string()))
            .unwrap();
        assert_eq!(*watcher.borrow(), SessionState::Failed);
    }
}
