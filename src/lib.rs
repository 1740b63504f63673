//! Shared Camera Server Library
//!
//! Exposes one physical camera to many concurrent HTTP clients: a live
//! MJPEG view, timed photo capture sessions with server-sent progress, and
//! explicit start/stop control.
//!
//! # Architecture
//!
//! ```text
//!                 ┌──────────────► FrameStream ──► /video_feed
//! Camera ◄── CameraCoordinator
//!                 └──────────────► CaptureSession ──► /capture_photos
//! ```
//!
//! The [`CameraCoordinator`] is the only owner of the device. Every device
//! call happens under its lock, one operation at a time, and is never held
//! across a pipeline's pause. Pipelines learn that the camera was stopped
//! because the coordinator stops handing out frames; there is no separate
//! cancellation signal.
//!
//! # Example
//!
//! ```no_run
//! use camstream::{
//!     capture::{Camera, CaptureConfig, MockCamera},
//!     config::StreamConfig,
//!     coordinator::CameraCoordinator,
//!     metrics::MetricsRegistry,
//!     streaming::FrameStream,
//! };
//! use std::sync::Arc;
//!
//! let coordinator = Arc::new(CameraCoordinator::new(
//!     || Ok(Box::new(MockCamera::new()) as Box<dyn Camera + Send>),
//!     CaptureConfig::default(),
//!     MetricsRegistry::new().unwrap(),
//! ));
//!
//! let frames = FrameStream::attach(Arc::clone(&coordinator), &StreamConfig::default()).unwrap();
//! for jpeg in frames.take(10) {
//!     println!("{} byte frame", jpeg.len());
//! }
//! coordinator.stop();
//! ```

#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod capture;
pub mod config;
pub mod coordinator;
pub mod metrics;
#[cfg(feature = "server")]
pub mod server;
pub mod session;
pub mod storage;
pub mod streaming;

// Re-export commonly used types at crate root
pub use capture::{Camera, CameraError, CaptureConfig, Frame, MockCamera, PixelFormat};
pub use config::FileConfig;
pub use coordinator::{CameraCoordinator, StartOutcome};
pub use session::{CaptureSession, SessionEvent};
pub use streaming::FrameStream;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
