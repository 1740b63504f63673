//! Camera input and frame handling.
//!
//! This module provides the device abstraction the coordinator owns, the
//! configuration applied when a device is opened, and the raw frame type
//! handed to the encoder.

mod camera;
mod config;
#[cfg(feature = "camera")]
mod device;
mod frame;

pub use camera::{Camera, CameraError, DeviceCounters, MockCamera};
pub use config::{CaptureConfig, ConfigError};
#[cfg(feature = "camera")]
pub use device::NokhwaCamera;
pub use frame::{Frame, PixelFormat};
