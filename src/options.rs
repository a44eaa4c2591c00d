//! Capture configuration assembly.
//!
//! A command supplies a `PartialOptions`; `build` fills the gaps from the
//! device resolver and validates geometry before anything reaches the engine.

use serde::Serialize;
use tracing::warn;

use crate::devices::{DeviceDescriptor, DeviceResolver};
use crate::error::{ControlError, ControlResult};

/// Capture rectangle edges; all four at zero selects the full display
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegionBounds {
    pub top: i32,
    pub bottom: i32,
    pub left: i32,
    pub right: i32,
}

impl RegionBounds {
    pub const FULL_DISPLAY: Self = Self {
        top: 0,
        bottom: 0,
        left: 0,
        right: 0,
    };

    pub fn new(top: i32, bottom: i32, left: i32, right: i32) -> Self {
        Self {
            top,
            bottom,
            left,
            right,
        }
    }

    pub fn is_full_display(&self) -> bool {
        *self == Self::FULL_DISPLAY
    }

    /// The engine does not check geometry, so inverted edges are refused here
    pub fn validate(&self) -> ControlResult<()> {
        if self.is_full_display() {
            return Ok(());
        }

        if self.top > self.bottom || self.left > self.right {
            return Err(ControlError::InvalidRegion {
                top: self.top,
                bottom: self.bottom,
                left: self.left,
                right: self.right,
            });
        }

        Ok(())
    }
}

/// Caller-supplied options; `None` means "resolve a default"
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialOptions {
    pub region: RegionBounds,
    pub audio_disabled: bool,
    pub audio_input_device: Option<String>,
    pub audio_output_device: Option<String>,
    pub display: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioSelection {
    pub enabled: bool,
    /// `None` leaves the choice to the engine (system default)
    pub input_device: Option<String>,
    pub output_device: Option<String>,
    pub input_enabled: bool,
    pub output_enabled: bool,
}

/// Validated, immutable configuration handed to the capture engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptureConfiguration {
    pub region: RegionBounds,
    pub audio: AudioSelection,
    /// `None` selects the primary display
    pub display: Option<String>,
}

/// Resolve `requested` against `resolver`: explicit value, then resolver default, then unset
pub fn build(
    requested: &PartialOptions,
    resolver: &dyn DeviceResolver,
) -> ControlResult<CaptureConfiguration> {
    requested.region.validate()?;

    let input_device = explicit_or(&requested.audio_input_device, || {
        first_device("audio input", resolver.list_audio_input_devices())
    });
    let output_device = explicit_or(&requested.audio_output_device, || {
        first_device("audio output", resolver.list_audio_output_devices())
    });
    let display = explicit_or(&requested.display, || match resolver.primary_display_id() {
        Ok(id) => id,
        Err(e) => {
            warn!("{}; using the primary display", e);
            None
        }
    });

    Ok(CaptureConfiguration {
        region: requested.region,
        audio: AudioSelection {
            enabled: !requested.audio_disabled,
            input_device,
            output_device,
            input_enabled: true,
            output_enabled: true,
        },
        display,
    })
}

fn explicit_or(
    explicit: &Option<String>,
    fallback: impl FnOnce() -> Option<String>,
) -> Option<String> {
    match explicit.as_deref() {
        Some(value) if !value.is_empty() => Some(value.to_string()),
        _ => fallback(),
    }
}

fn first_device(kind: &str, listing: ControlResult<Vec<DeviceDescriptor>>) -> Option<String> {
    match listing {
        Ok(devices) => devices.into_iter().next().map(|d| d.id),
        Err(e) => {
            warn!("{}; using the system default {} device", e, kind);
            None
        }
    }
}
