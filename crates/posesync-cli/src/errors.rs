use posesync_core::project::AnnotationIndexError;
use posesync_core::sync::MarksIncomplete;
use thiserror::Error;

/// Errors that can occur while loading, persisting, or bundling a session
#[derive(Debug, Error)]
pub enum PosesyncError {
    #[error("sensor data format error: {0}")]
    SensorFormat(String),

    #[error("bundle format error: {0}")]
    BundleFormat(String),

    #[error("no media loaded")]
    NoMedia,

    #[error(transparent)]
    MarksIncomplete(#[from] MarksIncomplete),

    #[error(transparent)]
    AnnotationIndex(#[from] AnnotationIndexError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

pub type Result<T> = std::result::Result<T, PosesyncError>;
