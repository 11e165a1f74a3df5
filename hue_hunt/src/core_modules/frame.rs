// THEORY:
// A `Frame` is the raw image handed to the detector: a row-major byte buffer
// plus its dimensions and pixel layout. Like `Pixel`, it is a "dumb" data
// container; it knows how to address a pixel and nothing else.
//
// The buffer length is validated once, at construction. Everything downstream
// (sampler, aggregator, overlay) can then index without re-checking, and a
// malformed buffer is a construction error rather than a detection error.
//
// A frame with zero width or height is legal. Cameras report 0x0 until the
// first real frame arrives, and such a frame simply produces no samples.

use crate::core_modules::pixel::pixel::Pixel;
use image::{RgbImage, RgbaImage};
use thiserror::Error;

/// Describes how pixels are laid out and how many bytes each uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// 3 bytes per pixel (R, G, B)
    Rgb8,
    /// 4 bytes per pixel (R, G, B, A)
    Rgba8,
}

impl PixelFormat {
    pub const fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame buffer holds {actual} bytes, expected {expected} for {width}x{height} {format:?}")]
    InvalidDimensions {
        width: u32,
        height: u32,
        format: PixelFormat,
        expected: usize,
        actual: usize,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    format: PixelFormat,
}

impl Frame {
    /// Validates buffer size against dimensions and constructs a frame.
    pub fn new(data: Vec<u8>, width: u32, height: u32, format: PixelFormat) -> Result<Self, FrameError> {
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if data.len() != expected {
            return Err(FrameError::InvalidDimensions {
                width,
                height,
                format,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            format,
        })
    }

    /// A 0x0 frame, as produced by a source that has not started delivering.
    pub fn empty(format: PixelFormat) -> Self {
        Self {
            data: Vec::new(),
            width: 0,
            height: 0,
            format,
        }
    }

    /// Builds a frame where every pixel has the same color.
    pub fn solid(width: u32, height: u32, pixel: Pixel) -> Self {
        let data = [pixel.red, pixel.green, pixel.blue, pixel.alpha].repeat(width as usize * height as usize);
        Self {
            data,
            width,
            height,
            format: PixelFormat::Rgba8,
        }
    }

    pub fn from_rgba_image(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            data: image.into_raw(),
            width,
            height,
            format: PixelFormat::Rgba8,
        }
    }

    pub fn from_rgb_image(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            data: image.into_raw(),
            width,
            height,
            format: PixelFormat::Rgb8,
        }
    }

    /// Copies the frame into an opaque-where-RGB `RgbaImage`.
    pub fn to_rgba_image(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            let pixel = self.pixel(x, y).unwrap_or_default();
            image::Rgba([pixel.red, pixel.green, pixel.blue, pixel.alpha])
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Returns the pixel at (x, y) if inside bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Pixel> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let bytes_per_pixel = self.format.bytes_per_pixel();
        let index = (y as usize * self.width as usize + x as usize) * bytes_per_pixel;
        self.data.get(index..index + bytes_per_pixel).and_then(Pixel::from_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_buffers() {
        let err = Frame::new(vec![0; 10], 2, 2, PixelFormat::Rgb8).unwrap_err();
        assert_eq!(
            err,
            FrameError::InvalidDimensions {
                width: 2,
                height: 2,
                format: PixelFormat::Rgb8,
                expected: 12,
                actual: 10,
            }
        );
        assert!(Frame::new(vec![0; 16], 2, 2, PixelFormat::Rgba8).is_ok());
    }

    #[test]
    fn zero_sized_frames_are_empty() {
        let frame = Frame::new(Vec::new(), 0, 480, PixelFormat::Rgba8).unwrap();
        assert!(frame.is_empty());
        assert!(Frame::empty(PixelFormat::Rgb8).is_empty());
        assert_eq!(frame.pixel(0, 0), None);
    }

    #[test]
    fn addresses_pixels_row_major() {
        let data = vec![
            1, 2, 3, /**/ 4, 5, 6, //
            7, 8, 9, /**/ 10, 11, 12,
        ];
        let frame = Frame::new(data, 2, 2, PixelFormat::Rgb8).unwrap();
        assert_eq!(frame.pixel(1, 0), Some(Pixel::opaque(4, 5, 6)));
        assert_eq!(frame.pixel(0, 1), Some(Pixel::opaque(7, 8, 9)));
        assert_eq!(frame.pixel(2, 0), None);
    }

    #[test]
    fn image_conversions_keep_layout() {
        let image = RgbaImage::from_pixel(3, 2, image::Rgba([9, 8, 7, 6]));
        let frame = Frame::from_rgba_image(image.clone());
        assert_eq!((frame.width(), frame.height()), (3, 2));
        assert_eq!(frame.pixel(2, 1), Some(Pixel::new(9, 8, 7, 6)));
        assert_eq!(frame.to_rgba_image(), image);

        let solid = Frame::solid(4, 4, Pixel::opaque(0, 255, 0));
        assert_eq!(solid.data().len(), 64);
        assert_eq!(solid.pixel(3, 3), Some(Pixel::opaque(0, 255, 0)));
    }
}
