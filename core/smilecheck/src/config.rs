use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::alignment::{AlignmentCircle, DEFAULT_RADIUS_PCT};
use crate::error::SmileCheckError;
use crate::face_detector::Point;
use crate::guardrail::DEFAULT_COUNTDOWN_TOTAL;
use crate::quality::QualityConfig;

/// One photo view the user is guided through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureSlot {
    pub label: String,
    /// Overrides the alignment circle center for this view.
    #[serde(default)]
    pub circle_center: Option<Point>,
}

impl CaptureSlot {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            circle_center: None,
        }
    }

    pub fn centered_at(mut self, center: Point) -> Self {
        self.circle_center = Some(center);
        self
    }
}

impl Default for CaptureSlot {
    fn default() -> Self {
        Self::new("front")
    }
}

/// Pre-configured threshold sets.
///
/// Apply with [`CaptureConfig::preset`], then override individual settings.
/// A preset replaces thresholds, radius and countdown timing but leaves the
/// slot list alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    /// Default thresholds (blur 100, brightness 30–220, contrast 20).
    Standard,

    /// Relaxed thresholds for dim rooms and low-end front cameras.
    ///
    /// - blur 60, brightness 20–230, contrast 15
    /// - slower countdown so the user has time to steady the phone
    LowLight,

    /// Tighter framing and sharper frames for clinical partner captures.
    ///
    /// - blur 150, brightness 40–210, contrast 25
    /// - circle radius 15% of width
    Strict,
}

/// Settings for a [`crate::CaptureSession`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureConfig {
    pub quality: QualityConfig,
    /// Alignment circle radius as a fraction of container width.
    pub circle_radius_pct: f64,
    /// Countdown ticks between alignment and capture.
    pub countdown_total: u32,
    /// Wall time per countdown tick.
    pub countdown_interval_ms: u64,
    /// How often the host should sample a frame.
    pub sample_interval_ms: u64,
    /// Views to capture in order. Must not be empty.
    pub slots: Vec<CaptureSlot>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            quality: QualityConfig::default(),
            circle_radius_pct: DEFAULT_RADIUS_PCT,
            countdown_total: DEFAULT_COUNTDOWN_TOTAL,
            countdown_interval_ms: 1000,
            sample_interval_ms: 200,
            slots: vec![CaptureSlot::default()],
        }
    }
}

impl CaptureConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn preset(mut self, preset: Preset) -> Self {
        let base = CaptureConfig::default();
        self.circle_radius_pct = base.circle_radius_pct;
        self.countdown_total = base.countdown_total;
        self.countdown_interval_ms = base.countdown_interval_ms;
        self.sample_interval_ms = base.sample_interval_ms;
        match preset {
            Preset::Standard => {
                self.quality = QualityConfig::default();
            }
            Preset::LowLight => {
                self.quality = QualityConfig {
                    min_blur_score: 60.0,
                    min_brightness: 20.0,
                    max_brightness: 230.0,
                    min_contrast: 15.0,
                };
                self.countdown_interval_ms = 1200;
                self.sample_interval_ms = 300;
            }
            Preset::Strict => {
                self.quality = QualityConfig {
                    min_blur_score: 150.0,
                    min_brightness: 40.0,
                    max_brightness: 210.0,
                    min_contrast: 25.0,
                };
                self.circle_radius_pct = 0.15;
            }
        }
        self
    }

    pub fn quality(mut self, quality: QualityConfig) -> Self {
        self.quality = quality;
        self
    }

    pub fn circle_radius(mut self, radius_pct: f64) -> Self {
        self.circle_radius_pct = radius_pct;
        self
    }

    pub fn countdown(mut self, total: u32) -> Self {
        self.countdown_total = total;
        self
    }

    pub fn countdown_interval(mut self, interval: Duration) -> Self {
        self.countdown_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn slots(mut self, slots: Vec<CaptureSlot>) -> Self {
        self.slots = slots;
        self
    }

    pub fn countdown_interval_duration(&self) -> Duration {
        Duration::from_millis(self.countdown_interval_ms)
    }

    pub fn sample_interval_duration(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    /// Alignment circle for the slot at `index`, falling back to frame center.
    pub fn circle_for_slot(&self, index: usize) -> AlignmentCircle {
        let circle = AlignmentCircle {
            radius_pct: self.circle_radius_pct,
            ..AlignmentCircle::default()
        };
        match self.slots.get(index).and_then(|slot| slot.circle_center) {
            Some(center) => circle.with_center(center),
            None => circle,
        }
    }

    pub fn validate(&self) -> Result<(), SmileCheckError> {
        let invalid = |msg: &str| Err(SmileCheckError::InvalidConfig(msg.to_string()));

        if !(self.circle_radius_pct > 0.0 && self.circle_radius_pct <= 1.0) {
            return invalid("circle radius must be in (0, 1]");
        }
        if self.countdown_total == 0 {
            return invalid("countdown total must be at least 1");
        }
        if self.countdown_interval_ms == 0 || self.sample_interval_ms == 0 {
            return invalid("intervals must be non-zero");
        }
        if self.quality.min_brightness > self.quality.max_brightness {
            return invalid("min brightness exceeds max brightness");
        }
        if self.slots.is_empty() {
            return invalid("at least one capture slot is required");
        }
        let off_frame = |p: &Point| !(0.0..=1.0).contains(&p.x) || !(0.0..=1.0).contains(&p.y);
        if self
            .slots
            .iter()
            .filter_map(|slot| slot.circle_center.as_ref())
            .any(off_frame)
        {
            return invalid("slot circle centers must be normalized to [0, 1]");
        }
        Ok(())
    }
}
