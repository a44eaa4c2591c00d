use serde::{Deserialize, Serialize};
use std::fmt;

use crate::options::CaptureConfiguration;
use crate::protocol::CommandKind;

/// Lifecycle of a recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// Created, engine not started
    Idle,
    Recording,
    Paused,
    /// Stop forwarded to the engine, waiting for it to finalize
    Finishing,
    Completed,
    Failed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether `kind` may be issued in this state
    pub fn permits(&self, kind: CommandKind) -> bool {
        match kind {
            CommandKind::Start | CommandKind::SetOptions => *self == Self::Idle,
            CommandKind::Pause => *self == Self::Recording,
            CommandKind::Resume => *self == Self::Paused,
            CommandKind::Stop => matches!(self, Self::Recording | Self::Paused),
            CommandKind::ListAudioDevices => true,
        }
    }

    /// Transition table; `None` when `trigger` is not legal from this state
    pub fn next(&self, trigger: &Trigger) -> Option<SessionState> {
        use SessionState::*;

        match (self, trigger) {
            (Idle, Trigger::Started(_)) => Some(Recording),
            (Recording, Trigger::EnginePaused) => Some(Paused),
            (Paused, Trigger::Resume) => Some(Recording),
            (Recording | Paused, Trigger::Stop) => Some(Finishing),
            (Finishing, Trigger::EngineCompleted) => Some(Completed),
            (state, Trigger::EngineFailed(_)) if !state.is_terminal() => Some(Failed),
            _ => None,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
            Self::Paused => "paused",
            Self::Finishing => "finishing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Anything that can move the session: accepted commands and engine events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Engine accepted `start`/`set_options` with this configuration
    Started(CaptureConfiguration),
    /// Engine reported `StatusChanged(Paused)`
    EnginePaused,
    Resume,
    Stop,
    EngineCompleted,
    EngineFailed(String),
}

impl Trigger {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Started(_) => "start",
            Self::EnginePaused => "engine paused",
            Self::Resume => "resume",
            Self::Stop => "stop",
            Self::EngineCompleted => "engine completed",
            Self::EngineFailed(_) => "engine failed",
        }
    }
}
