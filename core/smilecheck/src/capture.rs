use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ImageEncoder, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::crop::{mouth_crop, CropRegion, DEFAULT_MOUTH_MARGIN};
use crate::error::SmileCheckError;
use crate::pixel::PixelBuffer;
use crate::session::CaptureEvent;

/// Encoding used for the uploaded capture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JPEG at the requested quality.
    #[default]
    Jpeg,

    /// Lossless PNG; quality is ignored.
    Png,
}

/// An encoded capture ready to hand to the upload collaborator.
#[derive(Debug, Clone)]
pub struct EncodedCapture {
    pub data: Vec<u8>,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
}

/// Cut `region` out of a frame.
pub fn crop_frame(frame: &PixelBuffer, region: CropRegion) -> Result<PixelBuffer, SmileCheckError> {
    let image = to_image(frame)?;
    let cropped = image::imageops::crop_imm(&image, region.x, region.y, region.width, region.height)
        .to_image();
    PixelBuffer::from_rgba_image(cropped)
}

/// Flatten alpha by compositing onto a white background.
pub(crate) fn flatten_alpha(rgba: &RgbaImage) -> RgbImage {
    let (width, height) = rgba.dimensions();
    let mut rgb = RgbImage::new(width, height);

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as f32 / 255.0;
        let inv_alpha = 1.0 - alpha;
        let out_r = (r as f32 * alpha + 255.0 * inv_alpha).round() as u8;
        let out_g = (g as f32 * alpha + 255.0 * inv_alpha).round() as u8;
        let out_b = (b as f32 * alpha + 255.0 * inv_alpha).round() as u8;
        rgb.put_pixel(x, y, image::Rgb([out_r, out_g, out_b]));
    }

    rgb
}

/// Encode a frame for upload. `quality` is 0.0–1.0 and only affects JPEG.
pub fn encode_frame(
    frame: &PixelBuffer,
    format: OutputFormat,
    quality: f32,
) -> Result<EncodedCapture, SmileCheckError> {
    if !(0.0..=1.0).contains(&quality) {
        return Err(SmileCheckError::InvalidQuality(quality));
    }

    let rgb = flatten_alpha(&to_image(frame)?);
    let mut buffer = Vec::new();

    match format {
        OutputFormat::Jpeg => {
            let quality_percent = ((quality * 100.0).round() as u8).max(1);
            JpegEncoder::new_with_quality(&mut buffer, quality_percent)
                .write_image(rgb.as_raw(), rgb.width(), rgb.height(), image::ExtendedColorType::Rgb8)
                .map_err(|e| SmileCheckError::EncodeError(e.to_string()))?;
        }
        OutputFormat::Png => {
            PngEncoder::new(&mut buffer)
                .write_image(rgb.as_raw(), rgb.width(), rgb.height(), image::ExtendedColorType::Rgb8)
                .map_err(|e| SmileCheckError::EncodeError(e.to_string()))?;
        }
    }

    Ok(EncodedCapture {
        data: buffer,
        format,
        width: rgb.width(),
        height: rgb.height(),
    })
}

impl CaptureEvent {
    /// The captured frame cropped to the mouth, or the whole frame when the
    /// detector gave no mouth box.
    pub fn mouth_frame(&self, margin: f64) -> Result<PixelBuffer, SmileCheckError> {
        let region = self.face.mouth_bounding_box.as_ref().and_then(|mouth| {
            mouth_crop(self.frame.width(), self.frame.height(), mouth, margin)
        });
        match region {
            Some(region) => crop_frame(&self.frame, region),
            None => Ok(self.frame.clone()),
        }
    }

    /// Crop to the mouth with the default margin and encode for upload.
    pub fn encode(&self, format: OutputFormat, quality: f32) -> Result<EncodedCapture, SmileCheckError> {
        encode_frame(&self.mouth_frame(DEFAULT_MOUTH_MARGIN)?, format, quality)
    }
}

fn to_image(frame: &PixelBuffer) -> Result<RgbaImage, SmileCheckError> {
    frame.to_rgba_image().ok_or(SmileCheckError::BufferSizeMismatch {
        expected: frame.pixel_count() * crate::pixel::RGBA_STRIDE,
        actual: frame.as_bytes().len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face_detector::{FaceDetectionResult, NormalizedRect, Point};

    fn gradient(width: u32, height: u32) -> PixelBuffer {
        let mut img = RgbaImage::new(width, height);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            *pixel = image::Rgba([
                (x * 255 / width.max(1)) as u8,
                (y * 255 / height.max(1)) as u8,
                128,
                255,
            ]);
        }
        PixelBuffer::from_rgba_image(img).unwrap()
    }

    fn event_with_mouth(mouth: Option<NormalizedRect>) -> CaptureEvent {
        CaptureEvent {
            slot_index: 0,
            slot_label: "front".into(),
            cycle: 1,
            frame: gradient(64, 48),
            face: FaceDetectionResult {
                face_detected: true,
                face_center: Some(Point::CENTER),
                mouth_landmarks: Vec::new(),
                mouth_bounding_box: mouth,
            },
        }
    }

    #[test]
    fn flatten_alpha_composites_on_white() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, image::Rgba([0, 0, 0, 0]));
        img.put_pixel(1, 0, image::Rgba([10, 20, 30, 255]));
        let rgb = flatten_alpha(&img);
        assert_eq!(rgb.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(rgb.get_pixel(1, 0).0, [10, 20, 30]);
    }

    #[test]
    fn jpeg_has_magic_bytes() {
        let encoded = encode_frame(&gradient(32, 24), OutputFormat::Jpeg, 0.8).unwrap();
        assert_eq!(encoded.data[0], 0xFF);
        assert_eq!(encoded.data[1], 0xD8);
        assert_eq!((encoded.width, encoded.height), (32, 24));
    }

    #[test]
    fn png_round_trips_through_decode() {
        let frame = gradient(16, 8);
        let encoded = encode_frame(&frame, OutputFormat::Png, 1.0).unwrap();
        assert_eq!(&encoded.data[1..4], b"PNG");
        let decoded = PixelBuffer::decode(&encoded.data).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn rejects_out_of_range_quality() {
        let frame = gradient(8, 8);
        assert_eq!(
            encode_frame(&frame, OutputFormat::Jpeg, 1.5).unwrap_err(),
            SmileCheckError::InvalidQuality(1.5)
        );
        assert!(encode_frame(&frame, OutputFormat::Jpeg, -0.1).is_err());
    }

    #[test]
    fn mouth_frame_crops_to_box() {
        let event = event_with_mouth(Some(NormalizedRect {
            x: 0.25,
            y: 0.5,
            width: 0.5,
            height: 0.25,
        }));
        let mouth = event.mouth_frame(1.0).unwrap();
        assert_eq!((mouth.width(), mouth.height()), (32, 12));
        assert_eq!(mouth.rgba(0, 0), event.frame.rgba(16, 24));
    }

    #[test]
    fn mouth_frame_falls_back_to_full_frame() {
        let event = event_with_mouth(None);
        assert_eq!(event.mouth_frame(DEFAULT_MOUTH_MARGIN).unwrap(), event.frame);
    }

    #[test]
    fn encode_uses_mouth_crop() {
        let event = event_with_mouth(Some(NormalizedRect {
            x: 0.25,
            y: 0.25,
            width: 0.25,
            height: 0.25,
        }));
        let encoded = event.encode(OutputFormat::Jpeg, 0.7).unwrap();
        // 16x12 box grown by the default margin
        assert_eq!((encoded.width, encoded.height), (26, 19));
    }
}
