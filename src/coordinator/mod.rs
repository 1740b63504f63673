//! Shared access to the single camera device.
//!
//! One [`CameraCoordinator`] is constructed at startup and shared through an
//! `Arc` with every request handler. It owns the device handle outright:
//! nothing else ever sees the [`Camera`](crate::capture::Camera), only the
//! coordinator's lock-scoped operations.
//!
//! ```text
//!   start ──► [inactive] ──open/start/warm-up──► [active] ──stop──► [inactive]
//!                 │                                  │
//!            get_frame → None                   get_frame → Some(frame)
//! ```

mod access;

pub use access::{CameraCoordinator, CameraFactory, StartOutcome, DEFAULT_WARMUP};
