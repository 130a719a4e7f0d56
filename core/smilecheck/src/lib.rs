//! Capture-quality gate and consent-aware result routing for dental photo scans.
//!
//! Two independent halves:
//!
//! - **Capture**: [`CaptureSession`] takes one sampled video frame per tick,
//!   judges blur, brightness and contrast, checks face/mouth alignment against
//!   a target circle, and runs a countdown that emits exactly one
//!   [`CaptureEvent`] per completed run.
//! - **Results**: [`decide`] maps flow and consent context to a UI variant and
//!   report recipient; [`filter_scan_result`] projects a stored ML result down
//!   to what that audience may see.
//!
//! # Example
//!
//! ```no_run
//! use smilecheck::{CaptureConfig, CaptureSession, FaceDetectionResult, PixelBuffer};
//!
//! let mut session = CaptureSession::new(CaptureConfig::new()).unwrap();
//! # let (width, height, rgba) = (640u32, 480u32, vec![0u8; 640 * 480 * 4]);
//! # let detected = FaceDetectionResult::no_face();
//! let frame = PixelBuffer::new(width, height, rgba).unwrap();
//! if let Some(tick) = session.sample(Some(&frame), Some(&detected)) {
//!     for hint in &tick.feedback {
//!         println!("{hint}");
//!     }
//!     if let Some(capture) = tick.capture {
//!         let upload = capture.encode(smilecheck::OutputFormat::Jpeg, 0.85).unwrap();
//!         println!("captured {} bytes", upload.data.len());
//!     }
//! }
//! ```
//!
//! ```
//! use smilecheck::{decide, FlowType, RoutingInput, UiVariant};
//!
//! let decision = decide(&RoutingInput::adult(FlowType::Charity));
//! assert_eq!(decision.ui_variant, UiVariant::AdultFull);
//! assert!(decision.allow_pathology_in_ui);
//! ```

/// Per-slot alignment circle and countdown ring geometry.
pub mod alignment;
mod capture;
mod config;
mod crop;
mod error;
/// Face detection traits and data types.
pub mod face_detector;
/// Countdown-then-capture state machine.
pub mod guardrail;
/// Blur, brightness and contrast measurements.
pub mod metrics;
mod pixel;
mod quality;
mod result_filter;
mod routing;
mod session;

pub use alignment::{AlignmentCircle, Container};
pub use capture::{crop_frame, encode_frame, EncodedCapture, OutputFormat};
pub use config::{CaptureConfig, CaptureSlot, Preset};
pub use crop::{mouth_crop, CropRegion, DEFAULT_MOUTH_MARGIN};
pub use error::SmileCheckError;
pub use face_detector::{FaceDetectionResult, FaceDetector, NormalizedRect, Point};
pub use guardrail::{CaptureGuardrail, GuardrailResult, GuardrailSignals, Phase};
pub use metrics::BrightnessStats;
pub use pixel::{luma, PixelBuffer};
pub use quality::{quality_feedback, ImageQualityAnalyzer, QualityChecks, QualityConfig, QualityMetrics};
pub use result_filter::{
    filter_scan_result, filter_scan_result_for, AgeGroup, FilteredScanResult, ResultView,
    ScanMetadata, ScanRecord, Whitening, CONTACT_CLINIC_MESSAGE,
};
pub use routing::{
    decide, derive_charity_care_priority, derive_school_simplified_status, CarePriority,
    ConsentMethod, FlowType, ReportRecipient, RoutingDecision, RoutingInput, SchoolStatus,
    UiVariant,
};
pub use session::{CaptureEvent, CaptureSession, Clock, ManualClock, SessionTick, SystemClock};
