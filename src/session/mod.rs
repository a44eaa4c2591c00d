//! Recording session management
//!
//! This module provides the session lifecycle:
//! - The state machine and its transition table
//! - The elapsed-time clock owned by the session
//! - A single transition gate shared by command intake, engine events and progress
//! - The controller that wires them to the capture engine

mod clock;
mod controller;
mod progress;
mod session;
mod state;

pub use clock::ElapsedClock;
pub use controller::{consume_events, SessionController};
pub use progress::ProgressReporter;
pub use session::{Session, SessionSnapshot, Transition, TransitionGate};
pub use state::{SessionState, Trigger};
