//! Timed photo capture sessions.
//!
//! A [`CaptureSession`] writes a fixed number of images into the capture
//! directory, one per capture interval, and reports progress as typed
//! [`SessionEvent`]s. Framing those events for the wire is left to the
//! HTTP layer.

mod naming;
mod runner;

pub use naming::{capture_filename, CAPTURE_PREFIX};
pub use runner::{CaptureSession, SessionError, SessionEvent};
