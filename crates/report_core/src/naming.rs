//! Artifact file names.
//!
//! Single-file jobs are named `{title}-{unix_ms}.{ext}`, CSV jobs
//! `{title}-{dataset}-{unix_ms}.csv`.

use crate::model::{ExportFormat, ExportJob};

const UNSAFE_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Replace characters that are not allowed in file names with `_`.
pub fn sanitize_component(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| {
            if UNSAFE_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    if cleaned.is_empty() {
        "export".to_string()
    } else {
        cleaned
    }
}

/// File name of the single workbook or document produced by a job.
pub fn document_filename(job: &ExportJob) -> String {
    format!(
        "{}-{}.{}",
        sanitize_component(job.title()),
        job.timestamp_ms(),
        job.format().extension()
    )
}

/// File name of one dataset's CSV file.
pub fn csv_filename(job: &ExportJob, dataset: &str) -> String {
    format!(
        "{}-{}-{}.{}",
        sanitize_component(job.title()),
        sanitize_component(dataset),
        job.timestamp_ms(),
        ExportFormat::Csv.extension()
    )
}
