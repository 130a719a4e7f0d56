use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SmileCheckError {
    #[error("frame dimensions are zero")]
    ZeroDimensions,

    #[error("pixel buffer holds {actual} bytes, expected {expected} for RGBA")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error("failed to decode image: {0}")]
    DecodeError(String),

    #[error("failed to encode image: {0}")]
    EncodeError(String),

    #[error("quality must be between 0.0 and 1.0, got {0}")]
    InvalidQuality(f32),

    #[error("unknown flow type: {0}")]
    UnknownFlowType(String),

    #[error("unknown consent method: {0}")]
    UnknownConsentMethod(String),

    #[error("invalid capture configuration: {0}")]
    InvalidConfig(String),
}
