//! Color conversion and JPEG compression for raw frames.

use crate::capture::{Frame, PixelFormat};
use image::{codecs::jpeg::JpegEncoder, ExtendedColorType};
use std::borrow::Cow;
use thiserror::Error;

/// Errors that can occur while encoding a frame.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("frame buffer of {len} bytes does not match {width}x{height} {format:?}")]
    InvalidFrame {
        len: usize,
        width: u32,
        height: u32,
        format: PixelFormat,
    },
    #[error("jpeg encoding failed: {0}")]
    Jpeg(#[from] image::ImageError),
}

/// Rearranges a frame's pixels into the channel order the encoder expects.
///
/// RGB and grayscale buffers are borrowed as-is; BGR and padded layouts are
/// converted into a new packed RGB buffer.
pub fn to_encoder_order(frame: &Frame) -> (Cow<'_, [u8]>, ExtendedColorType) {
    let pixels = frame.pixels();
    match frame.format() {
        PixelFormat::Rgb24 => (Cow::Borrowed(pixels), ExtendedColorType::Rgb8),
        PixelFormat::Gray8 => (Cow::Borrowed(pixels), ExtendedColorType::L8),
        PixelFormat::Bgr24 => (
            Cow::Owned(
                pixels
                    .chunks_exact(3)
                    .flat_map(|p| [p[2], p[1], p[0]])
                    .collect(),
            ),
            ExtendedColorType::Rgb8,
        ),
        PixelFormat::Rgbx32 => (
            Cow::Owned(
                pixels
                    .chunks_exact(4)
                    .flat_map(|p| [p[0], p[1], p[2]])
                    .collect(),
            ),
            ExtendedColorType::Rgb8,
        ),
        PixelFormat::Bgrx32 => (
            Cow::Owned(
                pixels
                    .chunks_exact(4)
                    .flat_map(|p| [p[2], p[1], p[0]])
                    .collect(),
            ),
            ExtendedColorType::Rgb8,
        ),
    }
}

/// Encodes a frame as a baseline JPEG image.
pub fn encode_jpeg(frame: &Frame, quality: u8) -> Result<Vec<u8>, EncodeError> {
    if !frame.is_valid() {
        return Err(EncodeError::InvalidFrame {
            len: frame.pixels().len(),
            width: frame.width(),
            height: frame.height(),
            format: frame.format(),
        });
    }

    let (pixels, color) = to_encoder_order(frame);
    let mut jpeg = Vec::with_capacity(frame.pixel_count() / 4);
    JpegEncoder::new_with_quality(&mut jpeg, quality.clamp(1, 100)).encode(
        &pixels,
        frame.width(),
        frame.height(),
        color,
    )?;
    Ok(jpeg)
}
