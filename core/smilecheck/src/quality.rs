use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::metrics::{blur_score_of, brightness_stats_of, contrast_of, BrightnessStats};
use crate::pixel::PixelBuffer;

/// Thresholds applied to [`QualityMetrics`], on a 0–255 luma scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QualityConfig {
    /// Minimum variance of the Laplacian.
    pub min_blur_score: f64,
    /// Lowest acceptable mean luma.
    pub min_brightness: f64,
    /// Highest acceptable mean luma.
    pub max_brightness: f64,
    /// Minimum luma standard deviation.
    pub min_contrast: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_blur_score: 100.0,
            min_brightness: 30.0,
            max_brightness: 220.0,
            min_contrast: 20.0,
        }
    }
}

/// Pass/fail verdict for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QualityChecks {
    pub blur: bool,
    pub brightness: bool,
    pub exposure: bool,
}

impl QualityChecks {
    /// Verdict for a frame that could not be sampled.
    pub fn not_ready() -> Self {
        Self::default()
    }

    pub fn all_passed(&self) -> bool {
        self.blur && self.brightness && self.exposure
    }
}

/// Raw measurements behind a [`QualityChecks`] verdict.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityMetrics {
    pub blur_score: f64,
    pub brightness: BrightnessStats,
    pub contrast: f64,
}

impl QualityMetrics {
    pub fn measure(buffer: &PixelBuffer) -> Self {
        let luma = buffer.luma_plane();
        Self {
            blur_score: blur_score_of(&luma, buffer.width() as usize),
            brightness: brightness_stats_of(&luma),
            contrast: contrast_of(&luma),
        }
    }

    pub fn checks(&self, config: &QualityConfig) -> QualityChecks {
        QualityChecks {
            blur: self.blur_score >= config.min_blur_score,
            brightness: self.brightness.mean >= config.min_brightness
                && self.brightness.mean <= config.max_brightness,
            exposure: self.contrast >= config.min_contrast,
        }
    }
}

/// Applies a [`QualityConfig`] to sampled frames.
#[derive(Debug, Clone, Default)]
pub struct ImageQualityAnalyzer {
    config: QualityConfig,
}

impl ImageQualityAnalyzer {
    pub fn new(config: QualityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &QualityConfig {
        &self.config
    }

    /// Judge a frame. `None` means the video has not produced a frame yet,
    /// which fails every check rather than erroring.
    pub fn analyze(&self, frame: Option<&PixelBuffer>) -> QualityChecks {
        self.analyze_with_metrics(frame)
            .map(|(checks, _)| checks)
            .unwrap_or_else(QualityChecks::not_ready)
    }

    /// Like [`analyze`](Self::analyze) but also returns the measured values.
    pub fn analyze_with_metrics(
        &self,
        frame: Option<&PixelBuffer>,
    ) -> Option<(QualityChecks, QualityMetrics)> {
        let frame = frame?;
        let metrics = QualityMetrics::measure(frame);
        let checks = metrics.checks(&self.config);
        debug!(
            blur_score = metrics.blur_score,
            mean_luma = metrics.brightness.mean,
            contrast = metrics.contrast,
            passed = checks.all_passed(),
            "frame quality"
        );
        Some((checks, metrics))
    }
}

pub const BLUR_HINT: &str = "Image too blurry — hold still or move closer";
pub const BRIGHTNESS_HINT: &str = "Lighting is off — move to a brighter spot or away from glare";
pub const EXPOSURE_HINT: &str = "Low contrast — avoid backlight and shadows on your face";

/// One remediation hint per failing check, ordered blur, brightness, exposure.
pub fn quality_feedback(checks: &QualityChecks) -> Vec<&'static str> {
    [
        (checks.blur, BLUR_HINT),
        (checks.brightness, BRIGHTNESS_HINT),
        (checks.exposure, EXPOSURE_HINT),
    ]
    .into_iter()
    .filter(|(passed, _)| !passed)
    .map(|(_, hint)| hint)
    .collect()
}
