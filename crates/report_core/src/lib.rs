// Shared model, error taxonomy, configuration and logging for the export engine.

pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod naming;
pub mod notifications;

pub use config::ExportConfig;
pub use error::{
    CaptureError, EmptyDatasetError, ErrorCategory, ExportError, ValidationError,
};
pub use model::{
    CapturedImage, Dataset, DatasetRegistry, EncodedArtifact, ExportFormat, ExportJob,
    ExportReport, ExportRequest, Record, SkippedItem,
};
pub use notifications::{Notice, NoticeKind, NotificationStore};
