//! Live view pipeline.
//!
//! ```text
//! coordinator.get_frame ─► to_encoder_order ─► encode_jpeg ─► viewer
//!        │ None
//!        └──────────► end of stream
//! ```
//!
//! A [`FrameStream`] is a plain iterator. The HTTP layer drives it from a
//! producer thread and frames each buffer as a multipart part.

mod encode;
mod pipeline;

pub use encode::{encode_jpeg, to_encoder_order, EncodeError};
pub use pipeline::FrameStream;
