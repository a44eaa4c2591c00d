//! Audio device and display discovery.
//!
//! Listings are re-queried on every call and never cached; the first entry
//! of a listing is the default selection when the caller names no device.

use serde::{Deserialize, Serialize};

use crate::config::DeviceInventory;
use crate::error::{ControlError, ControlResult};

/// Identifier plus human-readable name, as reported by the capture engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub id: String,
    pub name: String,
}

impl DeviceDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Device and display queries
///
/// Implementations must return promptly; a failing query surfaces
/// `ControlError::DeviceQueryFailed` and callers fall back to "unset".
pub trait DeviceResolver: Send + Sync {
    fn list_audio_input_devices(&self) -> ControlResult<Vec<DeviceDescriptor>>;

    fn list_audio_output_devices(&self) -> ControlResult<Vec<DeviceDescriptor>>;

    /// `None` when no display is known; the engine then uses the primary display
    fn primary_display_id(&self) -> ControlResult<Option<String>>;
}

/// Resolver backed by a fixed listing from configuration
#[derive(Debug, Clone, Default)]
pub struct StaticDeviceResolver {
    inventory: DeviceInventory,
}

impl StaticDeviceResolver {
    pub fn new(inventory: DeviceInventory) -> Self {
        Self { inventory }
    }
}

impl DeviceResolver for StaticDeviceResolver {
    fn list_audio_input_devices(&self) -> ControlResult<Vec<DeviceDescriptor>> {
        Ok(self.inventory.audio_inputs.clone())
    }

    fn list_audio_output_devices(&self) -> ControlResult<Vec<DeviceDescriptor>> {
        Ok(self.inventory.audio_outputs.clone())
    }

    fn primary_display_id(&self) -> ControlResult<Option<String>> {
        Ok(self.inventory.displays.first().map(|d| d.id.clone()))
    }
}

/// Resolver whose every query fails; stands in for an unreachable device API
#[derive(Debug, Clone)]
pub struct UnavailableDeviceResolver {
    reason: String,
}

impl UnavailableDeviceResolver {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn fail<T>(&self) -> ControlResult<T> {
        Err(ControlError::DeviceQueryFailed(self.reason.clone()))
    }
}

impl DeviceResolver for UnavailableDeviceResolver {
    fn list_audio_input_devices(&self) -> ControlResult<Vec<DeviceDescriptor>> {
        self.fail()
    }

    fn list_audio_output_devices(&self) -> ControlResult<Vec<DeviceDescriptor>> {
        self.fail()
    }

    fn primary_display_id(&self) -> ControlResult<Option<String>> {
        self.fail()
    }
}
