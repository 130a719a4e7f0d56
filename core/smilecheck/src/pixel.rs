use image::{DynamicImage, RgbaImage};

use crate::error::SmileCheckError;

/// Bytes per pixel in a [`PixelBuffer`] (R, G, B, A).
pub const RGBA_STRIDE: usize = 4;

/// One sampled video frame as row-major RGBA bytes.
///
/// The layout matches what a browser canvas hands back from `getImageData`,
/// so frames can be passed through without reshuffling channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw RGBA bytes. The length must be exactly `width * height * 4`.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, SmileCheckError> {
        if width == 0 || height == 0 {
            return Err(SmileCheckError::ZeroDimensions);
        }
        let expected = width as usize * height as usize * RGBA_STRIDE;
        if data.len() != expected {
            return Err(SmileCheckError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// A buffer where every pixel has the same RGB value and full opacity.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Result<Self, SmileCheckError> {
        let pixels = width as usize * height as usize;
        let data = std::iter::repeat([rgb[0], rgb[1], rgb[2], 255])
            .take(pixels)
            .flatten()
            .collect();
        Self::new(width, height, data)
    }

    /// Take ownership of an `image` RGBA buffer.
    pub fn from_rgba_image(image: RgbaImage) -> Result<Self, SmileCheckError> {
        let (width, height) = image.dimensions();
        Self::new(width, height, image.into_raw())
    }

    /// Convert any decoded image to RGBA.
    pub fn from_dynamic_image(image: &DynamicImage) -> Result<Self, SmileCheckError> {
        Self::from_rgba_image(image.to_rgba8())
    }

    /// Decode an encoded still (PNG or JPEG) into a frame.
    pub fn decode(bytes: &[u8]) -> Result<Self, SmileCheckError> {
        let decoded =
            image::load_from_memory(bytes).map_err(|e| SmileCheckError::DecodeError(e.to_string()))?;
        Self::from_dynamic_image(&decoded)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Number of pixels in the frame.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// RGBA channels of the pixel at `(x, y)`.
    pub fn rgba(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = (y as usize * self.width as usize + x as usize) * RGBA_STRIDE;
        [
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
            self.data[offset + 3],
        ]
    }

    /// Luma of every pixel in row-major order (Rec. 601 weights, 0–255 scale).
    /// Alpha is ignored.
    pub fn luma_plane(&self) -> Vec<f64> {
        self.data
            .chunks_exact(RGBA_STRIDE)
            .map(|px| luma(px[0], px[1], px[2]))
            .collect()
    }

    /// Convert back into an `image` buffer, e.g. for encoding a capture.
    pub fn to_rgba_image(&self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.data.clone())
    }
}

/// Rec. 601 luma: 0.299 R + 0.587 G + 0.114 B.
pub fn luma(r: u8, g: u8, b: u8) -> f64 {
    0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_dimensions() {
        assert_eq!(
            PixelBuffer::new(0, 10, Vec::new()),
            Err(SmileCheckError::ZeroDimensions)
        );
    }

    #[test]
    fn rejects_wrong_length() {
        let err = PixelBuffer::new(2, 2, vec![0; 15]).unwrap_err();
        assert_eq!(
            err,
            SmileCheckError::BufferSizeMismatch {
                expected: 16,
                actual: 15
            }
        );
    }

    #[test]
    fn filled_sets_every_pixel() {
        let buffer = PixelBuffer::filled(3, 2, [10, 20, 30]).unwrap();
        assert_eq!(buffer.pixel_count(), 6);
        assert_eq!(buffer.rgba(2, 1), [10, 20, 30, 255]);
    }

    #[test]
    fn rgba_reads_row_major() {
        let mut data = vec![0u8; 2 * 2 * 4];
        // pixel (1, 1) is the last one
        data[12..16].copy_from_slice(&[1, 2, 3, 4]);
        let buffer = PixelBuffer::new(2, 2, data).unwrap();
        assert_eq!(buffer.rgba(1, 1), [1, 2, 3, 4]);
        assert_eq!(buffer.rgba(0, 1), [0, 0, 0, 0]);
    }

    #[test]
    fn luma_weights() {
        assert_eq!(luma(0, 0, 0), 0.0);
        assert!((luma(255, 255, 255) - 255.0).abs() < 1e-9);
        assert!((luma(255, 0, 0) - 76.245).abs() < 1e-9);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            PixelBuffer::decode(b"not an image"),
            Err(SmileCheckError::DecodeError(_))
        ));
    }

    #[test]
    fn image_round_trip_keeps_dimensions() {
        let img = RgbaImage::from_pixel(4, 3, image::Rgba([9, 8, 7, 255]));
        let buffer = PixelBuffer::from_rgba_image(img).unwrap();
        assert_eq!((buffer.width(), buffer.height()), (4, 3));
        let back = buffer.to_rgba_image().unwrap();
        assert_eq!(back.get_pixel(3, 2).0, [9, 8, 7, 255]);
    }
}
