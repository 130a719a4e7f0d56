//! Per-frame pixel statistics on the luma channel.
//!
//! All functions are pure and run in a single pass (or two for variance)
//! over the frame.

use serde::Serialize;

use crate::pixel::PixelBuffer;

/// Mean and extremes of frame luma on a 0–255 scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BrightnessStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

/// Variance of the Laplacian response over the frame interior.
///
/// Higher is sharper. The 1-pixel border is skipped so every sample has four
/// orthogonal neighbours; frames narrower or shorter than 3 pixels score 0.
pub fn blur_score(buffer: &PixelBuffer) -> f64 {
    blur_score_of(&buffer.luma_plane(), buffer.width() as usize)
}

pub fn brightness_stats(buffer: &PixelBuffer) -> BrightnessStats {
    brightness_stats_of(&buffer.luma_plane())
}

/// Population standard deviation of luma.
pub fn contrast(buffer: &PixelBuffer) -> f64 {
    contrast_of(&buffer.luma_plane())
}

/// [`blur_score`] over a precomputed row-major luma plane `width` wide.
pub(crate) fn blur_score_of(luma: &[f64], width: usize) -> f64 {
    let w = width;
    let h = if w == 0 { 0 } else { luma.len() / w };
    if w < 3 || h < 3 {
        return 0.0;
    }

    let mut responses = Vec::with_capacity((w - 2) * (h - 2));
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let i = y * w + x;
            let response = 4.0 * luma[i] - luma[i - w] - luma[i + w] - luma[i - 1] - luma[i + 1];
            responses.push(response);
        }
    }

    variance(&responses)
}

pub(crate) fn brightness_stats_of(luma: &[f64]) -> BrightnessStats {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    for &value in luma {
        min = min.min(value);
        max = max.max(value);
        sum += value;
    }

    BrightnessStats {
        mean: sum / luma.len() as f64,
        min,
        max,
    }
}

pub(crate) fn contrast_of(luma: &[f64]) -> f64 {
    variance(luma).sqrt()
}

fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}
