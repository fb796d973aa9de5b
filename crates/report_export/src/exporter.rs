//! The export orchestrator.
//!
//! One call to [`Exporter::run`] is one job: validate, capture (PDF only),
//! normalize, encode, deliver. The in-flight latch and the overlay are held
//! by guards for the whole call, and every outcome except a latch rejection
//! ends with exactly one notice, including a job that panics.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use chrono::Utc;
use report_capture::{CaptureChain, CaptureTarget};
use report_core::{
    DatasetRegistry, EncodedArtifact, ExportConfig, ExportError, ExportFormat, ExportJob,
    ExportReport, ExportRequest, Notice, NoticeKind,
};
use report_docs::pdf::{Visual, encode_document};
use report_docs::{Table, csv, normalize_selection, xlsx};
use tracing::{error, info, warn};

use crate::latch::InFlightLatch;
use crate::notify::Notifier;
use crate::overlay::{LoadingOverlay, NoOverlay, OverlayGuard};
use crate::sink::DownloadSink;

/// Text of a caught panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

pub struct Exporter {
    config: ExportConfig,
    chain: CaptureChain,
    sink: Box<dyn DownloadSink>,
    notifier: Arc<dyn Notifier>,
    overlay: Box<dyn LoadingOverlay>,
    latch: InFlightLatch,
}

impl Exporter {
    pub fn new(
        config: ExportConfig,
        sink: Box<dyn DownloadSink>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let chain = CaptureChain::standard(None, None, &config);
        Self {
            config,
            chain,
            sink,
            notifier,
            overlay: Box::new(NoOverlay),
            latch: InFlightLatch::new(),
        }
    }

    pub fn with_capture_chain(mut self, chain: CaptureChain) -> Self {
        self.chain = chain;
        self
    }

    pub fn with_overlay(mut self, overlay: Box<dyn LoadingOverlay>) -> Self {
        self.overlay = overlay;
        self
    }

    /// Share a latch with other exporters bound to the same capture targets.
    pub fn with_latch(mut self, latch: InFlightLatch) -> Self {
        self.latch = latch;
        self
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub fn latch(&self) -> &InFlightLatch {
        &self.latch
    }

    /// Run one export job.
    pub fn run(
        &self,
        registry: &DatasetRegistry,
        targets: &[CaptureTarget],
        request: &ExportRequest,
    ) -> Result<ExportReport, ExportError> {
        let Some(_running) = self.latch.try_acquire() else {
            warn!("Export '{}' rejected: another export is running", request.title);
            return Err(ExportError::AlreadyRunning);
        };

        let result = {
            let _overlay = OverlayGuard::show(self.overlay.as_ref(), "Generating report...");
            catch_unwind(AssertUnwindSafe(|| self.execute(registry, targets, request)))
                .unwrap_or_else(|payload| Err(ExportError::Internal(panic_message(&*payload))))
        };

        match &result {
            Ok(report) => {
                info!("Export {} finished: {}", report.job_id, report.summary());
                self.notifier
                    .notify(Notice::new(NoticeKind::Success, report.summary()).with_title("Export"));
            }
            Err(err) => {
                error!("Export '{}' failed ({:?}): {err}", request.title, err.category());
                self.notifier.notify(Notice::from_error(err));
            }
        }
        result
    }

    fn execute(
        &self,
        registry: &DatasetRegistry,
        targets: &[CaptureTarget],
        request: &ExportRequest,
    ) -> Result<ExportReport, ExportError> {
        let job = request.validate(Utc::now())?;
        info!(
            "Export {} started: '{}' as {}, {} dataset(s), {} capture(s)",
            job.id(),
            job.title(),
            job.format(),
            job.dataset_names().len(),
            job.capture_ids().len()
        );

        let mut report = ExportReport {
            job_id: job.id().to_string(),
            ..ExportReport::default()
        };

        let visuals = if job.format().embeds_visuals() && !job.capture_ids().is_empty() {
            let outcome = self.chain.capture_targets(targets, job.capture_ids());
            report.skipped_captures = outcome.skipped;
            outcome
                .visuals
                .into_iter()
                .map(|v| Visual::new(v.title, v.image))
                .collect()
        } else {
            Vec::new()
        };

        let selection = normalize_selection(registry, job.dataset_names());
        report.skipped_datasets = selection.skipped;
        if selection.tables.is_empty() {
            return Err(ExportError::EmptyExport);
        }

        let artifacts = self
            .encode(&job, &selection.tables, &visuals)
            .map_err(|e| ExportError::encoding(&e))?;

        for artifact in &artifacts {
            let location = self
                .sink
                .deliver(artifact)
                .map_err(|e| ExportError::delivery(&e))?;
            report.delivered.push(artifact.filename.clone());
            if let Some(location) = location {
                report.locations.push(location);
            }
        }

        Ok(report)
    }

    fn encode(
        &self,
        job: &ExportJob,
        tables: &[Table],
        visuals: &[Visual],
    ) -> anyhow::Result<Vec<EncodedArtifact>> {
        match job.format() {
            ExportFormat::Excel => Ok(vec![xlsx::encode_workbook(job, tables, &self.config)?]),
            ExportFormat::Csv => csv::encode_csv_files(job, tables, self.config.csv_delimiter),
            ExportFormat::Pdf => Ok(vec![encode_document(job, tables, visuals, &self.config)?]),
        }
    }
}
