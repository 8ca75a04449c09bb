//! Error types for the slidecast pipeline.

use thiserror::Error;

/// Errors produced by the slidecast pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Narration synthesis error
    #[error("TTS generation error: {0}")]
    TtsGeneration(String),

    /// Audio processing error
    #[error("Audio processing error: {0}")]
    AudioProcessing(String),

    /// Video processing error
    #[error("Video processing error: {0}")]
    VideoProcessing(String),

    /// Talking-head generation error
    #[error("Video generation error: {0}")]
    VideoGeneration(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Other error
    #[error("Other error: {0}")]
    Other(String),
}

impl From<&str> for PipelineError {
    fn from(s: &str) -> Self {
        PipelineError::Other(s.to_string())
    }
}

impl From<String> for PipelineError {
    fn from(s: String) -> Self {
        PipelineError::Other(s)
    }
}

/// Result type for the slidecast pipeline.
pub type Result<T> = std::result::Result<T, PipelineError>;
