//! Capture engine adapter
//!
//! The engine itself (frame grabbing, mixing, container writing) lives
//! outside this crate. The controller drives it through `CaptureEngine`
//! and observes it through a single ordered event channel.

pub mod backend;
pub mod simulated;

pub use backend::{CaptureEngine, EngineEvent, EngineFactory, EngineKind, EngineStatus};
pub use simulated::SimulatedEngine;
