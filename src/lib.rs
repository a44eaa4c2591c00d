pub mod config;
pub mod devices;
pub mod engine;
pub mod error;
pub mod logging;
pub mod options;
pub mod protocol;
pub mod session;

pub use config::Config;
pub use devices::{DeviceDescriptor, DeviceResolver, StaticDeviceResolver};
pub use engine::{CaptureEngine, EngineEvent, EngineFactory, EngineKind, EngineStatus};
pub use error::{ControlError, ControlResult};
pub use options::{CaptureConfiguration, PartialOptions, RegionBounds};
pub use protocol::{Command, CommandKind, Output};
pub use session::{Session, SessionController, SessionSnapshot, SessionState, TransitionGate};
