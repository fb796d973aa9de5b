use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// One row of a dataset. Key order is preserved from the source JSON.
pub type Record = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Datasets
// ---------------------------------------------------------------------------

/// A named, ordered array of uniform records.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset<'a> {
    pub name: &'a str,
    pub records: &'a [Record],
}

/// Insertion-ordered mapping from dataset name to its records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetRegistry {
    datasets: IndexMap<String, Vec<Record>>,
}

impl DatasetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a registry from a JSON object of `name -> [record, ...]`.
    pub fn from_json_str(input: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn insert(&mut self, name: impl Into<String>, records: Vec<Record>) {
        self.datasets.insert(name.into(), records);
    }

    pub fn get(&self, name: &str) -> Option<Dataset<'_>> {
        self.datasets
            .get_key_value(name)
            .map(|(name, records)| Dataset { name, records })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.datasets.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Formats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Excel,
    Csv,
    Pdf,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Excel => "xlsx",
            Self::Csv => "csv",
            Self::Pdf => "pdf",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Excel => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Csv => "text/csv;charset=utf-8",
            Self::Pdf => "application/pdf",
        }
    }

    /// Whether chart captures are embedded in this format.
    pub fn embeds_visuals(&self) -> bool {
        matches!(self, Self::Pdf)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Excel => "Excel",
            Self::Csv => "CSV",
            Self::Pdf => "PDF",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Excel => "excel",
            Self::Csv => "csv",
            Self::Pdf => "pdf",
        })
    }
}

impl FromStr for ExportFormat {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "excel" | "xlsx" => Ok(Self::Excel),
            "csv" => Ok(Self::Csv),
            "pdf" => Ok(Self::Pdf),
            "" => Err(ValidationError::MissingFormat),
            other => Err(ValidationError::UnknownFormat(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Request / Job
// ---------------------------------------------------------------------------

/// What the user submitted. Nothing here has been validated yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportRequest {
    pub title: String,
    pub format: Option<ExportFormat>,
    pub dataset_names: Vec<String>,
    pub capture_ids: Vec<String>,
}

impl ExportRequest {
    pub fn new(title: impl Into<String>, format: ExportFormat) -> Self {
        Self {
            title: title.into(),
            format: Some(format),
            ..Self::default()
        }
    }

    pub fn with_datasets<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dataset_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_captures<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capture_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Check title, format and selection, producing an immutable job.
    pub fn validate(&self, started_at: DateTime<Utc>) -> Result<ExportJob, ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::MissingTitle);
        }
        let format = self.format.ok_or(ValidationError::MissingFormat)?;

        let dataset_names: Vec<String> = self
            .dataset_names
            .iter()
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .map(String::from)
            .collect();
        if dataset_names.is_empty() {
            return Err(ValidationError::NoDatasetsSelected);
        }

        Ok(ExportJob {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            format,
            dataset_names,
            capture_ids: self.capture_ids.clone(),
            started_at,
        })
    }
}

/// A validated export. Fields are private so a job cannot change once created.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportJob {
    id: String,
    title: String,
    format: ExportFormat,
    dataset_names: Vec<String>,
    capture_ids: Vec<String>,
    started_at: DateTime<Utc>,
}

impl ExportJob {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn format(&self) -> ExportFormat {
        self.format
    }

    pub fn dataset_names(&self) -> &[String] {
        &self.dataset_names
    }

    pub fn capture_ids(&self) -> &[String] {
        &self.capture_ids
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Unix milliseconds used in artifact file names.
    pub fn timestamp_ms(&self) -> i64 {
        self.started_at.timestamp_millis()
    }
}

// ---------------------------------------------------------------------------
// Capture output
// ---------------------------------------------------------------------------

const IMAGE_MIME_PREFIXES: [&str; 3] = ["data:image/png", "data:image/jpeg", "data:image/webp"];

/// A rasterized chart as a base64 data URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedImage {
    pub image_data: String,
    pub width: u32,
    pub height: u32,
}

impl CapturedImage {
    pub fn new(image_data: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            image_data: image_data.into(),
            width,
            height,
        }
    }

    /// Build a data URI from raw encoded image bytes.
    pub fn from_bytes(mime: &str, bytes: &[u8], width: u32, height: u32) -> Self {
        let image_data = format!("data:{mime};base64,{}", BASE64.encode(bytes));
        Self::new(image_data, width, height)
    }

    /// MIME type declared by the data URI, e.g. `image/png`.
    pub fn mime_type(&self) -> Option<&str> {
        let rest = self.image_data.strip_prefix("data:")?;
        let end = rest.find([';', ','])?;
        Some(&rest[..end])
    }

    /// A usable image has a known image MIME prefix, base64 payload and non-zero size.
    pub fn is_valid(&self) -> bool {
        if self.width == 0 || self.height == 0 {
            return false;
        }
        if !IMAGE_MIME_PREFIXES
            .iter()
            .any(|prefix| self.image_data.starts_with(prefix))
        {
            return false;
        }
        match self.image_data.split_once(";base64,") {
            Some((_, payload)) => !payload.is_empty(),
            None => false,
        }
    }

    /// Decode the base64 payload back into encoded image bytes.
    pub fn decode_payload(&self) -> anyhow::Result<Vec<u8>> {
        let (_, payload) = self
            .image_data
            .split_once(";base64,")
            .ok_or_else(|| anyhow::anyhow!("Image data is not a base64 data URI"))?;
        Ok(BASE64.decode(payload)?)
    }
}

// ---------------------------------------------------------------------------
// Artifacts and reports
// ---------------------------------------------------------------------------

/// One downloadable file produced by an encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedArtifact {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime_type: String,
}

impl EncodedArtifact {
    pub fn new(bytes: Vec<u8>, filename: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            filename: filename.into(),
            mime_type: mime_type.into(),
        }
    }
}

/// An item the job left out, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedItem {
    pub name: String,
    pub reason: String,
}

/// Summary of a finished job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportReport {
    pub job_id: String,
    /// File names in delivery order.
    pub delivered: Vec<String>,
    /// Where the sink put each file, when it knows (e.g. a filesystem path).
    pub locations: Vec<String>,
    pub skipped_datasets: Vec<SkippedItem>,
    pub skipped_captures: Vec<SkippedItem>,
}

impl ExportReport {
    pub fn summary(&self) -> String {
        let files = match self.delivered.len() {
            1 => "1 file".to_string(),
            n => format!("{n} files"),
        };
        let mut msg = format!("Export complete: {files} generated");
        if !self.skipped_datasets.is_empty() {
            msg.push_str(&format!(
                ", {} dataset(s) skipped",
                self.skipped_datasets.len()
            ));
        }
        if !self.skipped_captures.is_empty() {
            msg.push_str(&format!(
                ", {} chart(s) could not be captured",
                self.skipped_captures.len()
            ));
        }
        msg
    }
}
