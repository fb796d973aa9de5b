use chrono::{DateTime, Utc};
use report_core::{ExportConfig, ExportJob};

/// Document-level metadata attached once per workbook or PDF.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentMeta {
    pub title: String,
    pub subject: String,
    pub author: String,
    pub created: DateTime<Utc>,
}

impl DocumentMeta {
    pub fn for_job(job: &ExportJob, config: &ExportConfig) -> Self {
        Self {
            title: job.title().to_string(),
            subject: config.subject.clone(),
            author: config.author.clone(),
            created: job.started_at(),
        }
    }
}
