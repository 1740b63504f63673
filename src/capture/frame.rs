//! Frame type representing a raw captured image with its pixel layout.

use serde::{Deserialize, Serialize};

/// Memory layout of the pixels in a [`Frame`].
///
/// Devices hand out whatever layout they were configured for; the
/// streaming encoder converts to RGB before compressing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// 8-bit R, G, B.
    #[default]
    Rgb24,
    /// 8-bit B, G, R.
    Bgr24,
    /// 8-bit R, G, B followed by an unused padding byte.
    Rgbx32,
    /// 8-bit B, G, R followed by an unused padding byte.
    Bgrx32,
    /// Single 8-bit luma channel.
    Gray8,
}

impl PixelFormat {
    /// Bytes used by one pixel.
    #[inline]
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Gray8 => 1,
            PixelFormat::Rgb24 | PixelFormat::Bgr24 => 3,
            PixelFormat::Rgbx32 | PixelFormat::Bgrx32 => 4,
        }
    }
}

/// A single raw frame from the camera.
///
/// Frames are ephemeral: each one is produced by a single coordinator
/// call and handed straight to the encoder.
#[derive(Clone)]
pub struct Frame {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    format: PixelFormat,
    sequence: u64,
}

impl Frame {
    /// Creates a new frame with the given parameters.
    pub fn new(
        pixels: Vec<u8>,
        width: u32,
        height: u32,
        format: PixelFormat,
        sequence: u64,
    ) -> Self {
        Self {
            pixels,
            width,
            height,
            format,
            sequence,
        }
    }

    /// Returns a reference to the raw pixel data.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Returns the device sequence number.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns the total number of pixels (width * height).
    #[inline]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Validates that the pixel buffer size matches dimensions and format.
    pub fn is_valid(&self) -> bool {
        self.pixel_count() > 0
            && self.pixels.len() == self.pixel_count() * self.format.bytes_per_pixel()
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("sequence", &self.sequence)
            .field("pixel_bytes", &self.pixels.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_creation() {
        let pixels = vec![0u8; 640 * 480 * 3];
        let frame = Frame::new(pixels, 640, 480, PixelFormat::Rgb24, 1);

        assert_eq!(frame.width(), 640);
        assert_eq!(frame.height(), 480);
        assert_eq!(frame.sequence(), 1);
        assert!(frame.is_valid());
    }

    #[test]
    fn test_frame_invalid_size() {
        let pixels = vec![0u8; 640 * 480]; // one byte per pixel, format wants four
        let frame = Frame::new(pixels, 640, 480, PixelFormat::Bgrx32, 1);

        assert!(!frame.is_valid());
    }

    #[test]
    fn test_empty_frame_invalid() {
        let frame = Frame::new(Vec::new(), 0, 0, PixelFormat::Gray8, 0);
        assert!(!frame.is_valid());
    }
}
