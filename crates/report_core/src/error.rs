use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Request rejected before a job is created.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Report title is required")]
    MissingTitle,

    #[error("Export format is required")]
    MissingFormat,

    #[error("Unknown export format: {0}")]
    UnknownFormat(String),

    #[error("Select at least one dataset to export")]
    NoDatasetsSelected,
}

/// A single capture target produced no usable image.
///
/// Always recovered by the caller: the visual is omitted and the job goes on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("Capture target '{0}' not found")]
    TargetNotFound(String),

    #[error("Element '{0}' has no canvas or renderable content")]
    NothingToCapture(String),

    #[error("Every capture strategy failed for '{0}'")]
    Exhausted(String),

    #[error("Rasterization failed: {0}")]
    Rasterize(String),
}

/// A selected dataset with zero records. Recovered by skipping the dataset.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Dataset '{name}' has no records")]
pub struct EmptyDatasetError {
    pub name: String,
}

/// Job-level failure. Every variant reaches the single top-level handler.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Invalid export request: {0}")]
    Validation(#[from] ValidationError),

    #[error("Nothing to export: none of the selected datasets contain data")]
    EmptyExport,

    #[error("Encoding failed: {0}")]
    Encoding(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("An export is already in progress")]
    AlreadyRunning,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Broad classification used for logging and notification styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Caused by the request itself; the user can fix it.
    UserError,
    /// The underlying format library failed.
    EncoderError,
    /// Writing or handing over the artifact failed.
    DeliveryError,
    /// Anything else.
    SystemError,
}

impl ExportError {
    /// Wrap an encoder failure, keeping the full context chain as raw text.
    pub fn encoding(err: &anyhow::Error) -> Self {
        Self::Encoding(format!("{err:#}"))
    }

    pub fn delivery(err: &anyhow::Error) -> Self {
        Self::Delivery(format!("{err:#}"))
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) | Self::EmptyExport | Self::AlreadyRunning => {
                ErrorCategory::UserError
            }
            Self::Encoding(_) => ErrorCategory::EncoderError,
            Self::Delivery(_) => ErrorCategory::DeliveryError,
            Self::Internal(_) => ErrorCategory::SystemError,
        }
    }

    /// Message shown to the user at the end of a failed job.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(err) => err.to_string(),
            Self::EmptyExport => "None of the selected datasets contain data to export.".into(),
            Self::Encoding(raw) => format!("The report could not be generated: {raw}"),
            Self::Delivery(raw) => format!("The report could not be saved: {raw}"),
            Self::AlreadyRunning => "An export is already running. Please wait.".into(),
            Self::Internal(_) => "An unexpected error occurred while exporting.".into(),
        }
    }
}
