use crate::session::SessionState;

/// Errors raised while turning control lines into capture engine operations
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    /// Wrong field count or a field that failed its type check
    #[error("Malformed command: field `{field}`: {reason}")]
    MalformedCommand { field: String, reason: String },

    /// Syntactically valid command that the current state does not permit
    #[error("Illegal transition: `{trigger}` is not permitted while {state}")]
    IllegalTransition {
        state: SessionState,
        trigger: String,
    },

    #[error("Invalid region: top={top} bottom={bottom} left={left} right={right}")]
    InvalidRegion {
        top: i32,
        bottom: i32,
        left: i32,
        right: i32,
    },

    #[error("Device query failed: {0}")]
    DeviceQueryFailed(String),

    #[error("{0}")]
    EngineFailure(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type ControlResult<T> = Result<T, ControlError>;

impl ControlError {
    pub fn malformed(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedCommand {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn illegal(state: SessionState, trigger: impl Into<String>) -> Self {
        Self::IllegalTransition {
            state,
            trigger: trigger.into(),
        }
    }

    pub fn engine(msg: impl Into<String>) -> Self {
        Self::EngineFailure(msg.into())
    }
}
