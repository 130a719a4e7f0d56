use serde::{Deserialize, Serialize};

use crate::pixel::PixelBuffer;

/// A point in normalized frame coordinates, `(0, 0)` top-left to `(1, 1)`
/// bottom-right.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const CENTER: Point = Point { x: 0.5, y: 0.5 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in normalized frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Per-tick output of a face/mouth detector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FaceDetectionResult {
    pub face_detected: bool,
    pub face_center: Option<Point>,
    /// Mouth contour points in detector order; may be empty.
    pub mouth_landmarks: Vec<Point>,
    pub mouth_bounding_box: Option<NormalizedRect>,
}

impl FaceDetectionResult {
    /// Result used when the detector reports nothing this tick.
    pub fn no_face() -> Self {
        Self::default()
    }

    /// Face center, only when the detector claims a face.
    pub fn detected_center(&self) -> Option<Point> {
        if self.face_detected {
            self.face_center
        } else {
            None
        }
    }
}

/// Pluggable face/mouth detection backend.
///
/// Browser pipelines usually run detection in JavaScript and pass
/// [`FaceDetectionResult`] values straight into the session. Native pipelines
/// implement this trait instead and call
/// [`CaptureSession::sample_with`](crate::CaptureSession::sample_with).
pub trait FaceDetector: Send + Sync {
    fn detect(&self, frame: &PixelBuffer) -> FaceDetectionResult;
}
