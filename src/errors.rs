// src/errors.rs
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StudioError {
    #[error("Invalid color format: {0}")]
    InvalidColorFormat(String),

    #[error("Invalid color channel: {0}")]
    InvalidColorChannel(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Mask generation failed: {0}")]
    MaskGenerationFailed(String),

    #[error("Analysis failed: {0}")]
    AnalysisFailed(String),

    #[error("Recolor failed: {0}")]
    RecolorFailed(String),

    #[error("History entry not found: {0}")]
    HistoryNotFound(String),

    #[error("History persistence failed: {0}")]
    HistoryPersistFailed(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Unsupported image: {0}")]
    UnsupportedImage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Pipeline not ready: {0}")]
    NotReady(String),

    #[error("Pipeline session {0} was superseded")]
    Superseded(Uuid),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Fieldless discriminant of [`StudioError`], published to pipeline
/// observers alongside the failed stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidColorFormat,
    InvalidColorChannel,
    UploadFailed,
    MaskGenerationFailed,
    AnalysisFailed,
    RecolorFailed,
    HistoryNotFound,
    HistoryPersistFailed,
    NetworkError,
    UnsupportedImage,
    Serialization,
    NotReady,
    Superseded,
    Config,
    Io,
}

impl StudioError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StudioError::InvalidColorFormat(_) => ErrorKind::InvalidColorFormat,
            StudioError::InvalidColorChannel(_) => ErrorKind::InvalidColorChannel,
            StudioError::UploadFailed(_) => ErrorKind::UploadFailed,
            StudioError::MaskGenerationFailed(_) => ErrorKind::MaskGenerationFailed,
            StudioError::AnalysisFailed(_) => ErrorKind::AnalysisFailed,
            StudioError::RecolorFailed(_) => ErrorKind::RecolorFailed,
            StudioError::HistoryNotFound(_) => ErrorKind::HistoryNotFound,
            StudioError::HistoryPersistFailed(_) => ErrorKind::HistoryPersistFailed,
            StudioError::NetworkError(_) => ErrorKind::NetworkError,
            StudioError::UnsupportedImage(_) => ErrorKind::UnsupportedImage,
            StudioError::Serialization(_) => ErrorKind::Serialization,
            StudioError::NotReady(_) => ErrorKind::NotReady,
            StudioError::Superseded(_) => ErrorKind::Superseded,
            StudioError::Config(_) => ErrorKind::Config,
            StudioError::Io(_) => ErrorKind::Io,
        }
    }
}

impl From<reqwest::Error> for StudioError {
    fn from(e: reqwest::Error) -> Self {
        StudioError::NetworkError(e.to_string())
    }
}

impl From<serde_json::Error> for StudioError {
    fn from(e: serde_json::Error) -> Self {
        StudioError::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for StudioError {
    fn from(e: std::io::Error) -> Self {
        StudioError::Io(e.to_string())
    }
}
