//! Prometheus metrics for camera and pipeline activity.
//!
//! # Metrics Exposed
//!
//! ## Device
//! - `camstream_camera_active` - Camera running (1) or stopped (0)
//! - `camstream_camera_starts_total` - Device open/start cycles
//!
//! ## Live view
//! - `camstream_frames_streamed_total` - Encoded frames sent to viewers
//! - `camstream_encode_failures_total` - Frames skipped on encode failure
//! - `camstream_active_viewers` - Attached live view streams
//!
//! ## Capture sessions
//! - `camstream_captures_total` - Image files written
//! - `camstream_sessions_completed_total` - Sessions that reached `done`
//! - `camstream_sessions_aborted_total` - Sessions cut short by a stop
//!
//! The server exposes the text encoding at `GET /metrics`.

mod collector;

pub use collector::{MetricsError, MetricsRegistry};
