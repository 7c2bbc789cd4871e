//! Crate-wide error taxonomy.
//!
//! Every fallible step of a cycle maps onto one of these variants so the
//! worker loop can log a failed cycle and move on without inspecting the
//! source module.

use crate::config::Rect;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("No visible window title contains \"{0}\"")]
    WindowNotFound(String),

    #[error("Screen capture failed: {0}")]
    CaptureFailed(String),

    #[error(
        "Crop rect ({},{},{},{}) exceeds frame bounds ({}x{})",
        rect.left, rect.top, rect.right, rect.bottom, width, height
    )]
    InvalidCropRect {
        rect: Rect,
        width: u32,
        height: u32,
    },

    #[error("OCR engine unavailable: {0}")]
    OcrEngineUnavailable(String),

    #[error("Text recognition failed: {0}")]
    RecognitionFailed(String),

    #[error("Webhook delivery failed: {0}")]
    PublishFailed(String),

    #[error("Failed to write artifact {key}: {source}")]
    ArtifactWriteFailed {
        key: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}
