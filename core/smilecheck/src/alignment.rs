//! Geometry for the on-screen alignment circle and countdown ring.

use serde::{Deserialize, Serialize};

use crate::face_detector::{FaceDetectionResult, NormalizedRect, Point};

/// Default circle radius as a fraction of container width.
pub const DEFAULT_RADIUS_PCT: f64 = 0.2;

/// Target circle the user's face must sit inside.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AlignmentCircle {
    pub center: Point,
    /// Radius as a fraction of container width.
    pub radius_pct: f64,
}

impl Default for AlignmentCircle {
    fn default() -> Self {
        Self {
            center: Point::CENTER,
            radius_pct: DEFAULT_RADIUS_PCT,
        }
    }
}

impl AlignmentCircle {
    pub fn with_center(self, center: Point) -> Self {
        Self { center, ..self }
    }

    /// Radius in container pixels.
    pub fn radius_px(&self, container: Container) -> f64 {
        self.radius_pct * container.width
    }

    /// Whether `face_center` lies within the circle once both are scaled to
    /// container pixels. The boundary counts as inside.
    pub fn contains(&self, face_center: Point, container: Container) -> bool {
        let dx = (face_center.x - self.center.x) * container.width;
        let dy = (face_center.y - self.center.y) * container.height;
        dx.hypot(dy) <= self.radius_px(container)
    }
}

/// Size of the element the video is rendered into, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub width: f64,
    pub height: f64,
}

impl Container {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Alignment verdict for one detector result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignmentVerdict {
    pub face_aligned: bool,
    pub mouth_valid: bool,
}

pub fn evaluate(
    face: &FaceDetectionResult,
    circle: &AlignmentCircle,
    container: Container,
) -> AlignmentVerdict {
    AlignmentVerdict {
        face_aligned: face
            .detected_center()
            .is_some_and(|center| circle.contains(center, container)),
        mouth_valid: mouth_valid(face),
    }
}

/// A mouth is usable when the detector produced landmarks or a bounding box.
pub fn mouth_valid(face: &FaceDetectionResult) -> bool {
    face.face_detected && (!face.mouth_landmarks.is_empty() || face.mouth_bounding_box.is_some())
}

/// Fraction of the countdown ring to draw: `(total - countdown) / total`.
pub fn ring_progress(countdown: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let countdown = countdown.min(total);
    f64::from(total - countdown) / f64::from(total)
}

/// SVG `stroke-dashoffset` for a ring of the given circumference.
pub fn ring_dash_offset(circumference: f64, countdown: u32, total: u32) -> f64 {
    circumference * (1.0 - ring_progress(countdown, total))
}

/// Mouth geometry mapped to container pixels for overlay drawing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MouthOverlay {
    pub points: Vec<(f64, f64)>,
    pub bounding_box: Option<PixelRect>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelRect {
    fn scaled(rect: &NormalizedRect, container: Container) -> Self {
        Self {
            x: rect.x * container.width,
            y: rect.y * container.height,
            width: rect.width * container.width,
            height: rect.height * container.height,
        }
    }
}

pub fn mouth_overlay(face: &FaceDetectionResult, container: Container) -> MouthOverlay {
    MouthOverlay {
        points: face
            .mouth_landmarks
            .iter()
            .map(|p| (p.x * container.width, p.y * container.height))
            .collect(),
        bounding_box: face
            .mouth_bounding_box
            .as_ref()
            .map(|rect| PixelRect::scaled(rect, container)),
    }
}
