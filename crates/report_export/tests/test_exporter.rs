use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::bail;
use image::{DynamicImage, ImageFormat, RgbImage};
use parking_lot::Mutex;
use report_capture::{CaptureChain, CaptureTarget, RawCanvas, StaticImageElement};
use report_core::{
    DatasetRegistry, EncodedArtifact, ExportConfig, ExportError, ExportFormat, ExportRequest,
    NoticeKind, NotificationStore, ValidationError,
};
use report_export::*;

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
struct MemorySink {
    files: Arc<Mutex<Vec<EncodedArtifact>>>,
}

impl DownloadSink for MemorySink {
    fn deliver(&self, artifact: &EncodedArtifact) -> anyhow::Result<Option<String>> {
        self.files.lock().push(artifact.clone());
        Ok(None)
    }
}

struct FailingSink;

impl DownloadSink for FailingSink {
    fn deliver(&self, artifact: &EncodedArtifact) -> anyhow::Result<Option<String>> {
        bail!("disk full while writing {}", artifact.filename)
    }
}

struct PanickingSink;

impl DownloadSink for PanickingSink {
    fn deliver(&self, _artifact: &EncodedArtifact) -> anyhow::Result<Option<String>> {
        panic!("sink state corrupted")
    }
}

#[derive(Clone, Default)]
struct RecordingOverlay {
    shown: Arc<AtomicUsize>,
    hidden: Arc<AtomicUsize>,
    visible: Arc<AtomicBool>,
}

impl LoadingOverlay for RecordingOverlay {
    fn show(&self, _message: &str) {
        self.shown.fetch_add(1, Ordering::SeqCst);
        self.visible.store(true, Ordering::SeqCst);
    }

    fn hide(&self) {
        self.hidden.fetch_add(1, Ordering::SeqCst);
        self.visible.store(false, Ordering::SeqCst);
    }
}

struct Harness {
    exporter: Exporter,
    sink: MemorySink,
    store: Arc<Mutex<NotificationStore>>,
    overlay: RecordingOverlay,
}

fn harness_with(config: ExportConfig) -> Harness {
    let sink = MemorySink::default();
    let store = Arc::new(Mutex::new(NotificationStore::new()));
    let overlay = RecordingOverlay::default();
    let exporter = Exporter::new(config, Box::new(sink.clone()), store.clone())
        .with_overlay(Box::new(overlay.clone()));
    Harness {
        exporter,
        sink,
        store,
        overlay,
    }
}

fn harness() -> Harness {
    harness_with(ExportConfig::default())
}

fn registry() -> DatasetRegistry {
    let mut registry = DatasetRegistry::from_json_str(
        r#"{
            "employees": [{"id": 1, "name": "Ana"}],
            "empty": []
        }"#,
    )
    .unwrap();
    let rows = |prefix: &str| {
        (0..60)
            .map(|i| {
                serde_json::json!({"id": i, "item": format!("{prefix} {i}"), "amount": i * 10})
                    .as_object()
                    .cloned()
                    .unwrap()
            })
            .collect::<Vec<_>>()
    };
    registry.insert("sales", rows("sale"));
    registry.insert("purchases", rows("purchase"));
    registry
}

fn png_target(id: &str, title: &str) -> CaptureTarget {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 20, image::Rgb([10, 120, 200])))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    let element = StaticImageElement::from_bytes(id, bytes).unwrap();
    CaptureTarget::new(id, title, Box::new(element))
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn test_csv_export_of_single_dataset() {
    let h = harness();
    let request = ExportRequest::new("Report", ExportFormat::Csv).with_datasets(["employees"]);

    let report = h.exporter.run(&registry(), &[], &request).unwrap();

    let files = h.sink.files.lock();
    assert_eq!(files.len(), 1);
    let file = &files[0];
    let ts = file
        .filename
        .strip_prefix("Report-employees-")
        .and_then(|rest| rest.strip_suffix(".csv"))
        .unwrap();
    assert!(ts.parse::<i64>().is_ok(), "timestamp was {ts}");
    assert_eq!(String::from_utf8_lossy(&file.bytes), "id,name\n1,Ana\n");
    assert_eq!(file.mime_type, "text/csv;charset=utf-8");
    assert_eq!(report.delivered, vec![file.filename.clone()]);
}

#[test]
fn test_csv_export_yields_one_file_per_non_empty_dataset() {
    let h = harness();
    let request = ExportRequest::new("Q", ExportFormat::Csv)
        .with_datasets(["sales", "empty", "purchases", "nope"]);

    let report = h.exporter.run(&registry(), &[], &request).unwrap();

    assert_eq!(h.sink.files.lock().len(), 2);
    let skipped: Vec<&str> = report.skipped_datasets.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(skipped, vec!["empty", "nope"]);
}

#[test]
fn test_excel_with_unmatched_names_is_an_empty_export() {
    let h = harness();
    let request = ExportRequest::new("Report", ExportFormat::Excel).with_datasets(["ghost", "empty"]);

    let err = h.exporter.run(&registry(), &[], &request).unwrap_err();

    assert!(matches!(err, ExportError::EmptyExport));
    assert!(h.sink.files.lock().is_empty());
    let store = h.store.lock();
    assert_eq!(store.len(), 1);
    let notice = store.latest().unwrap();
    assert_eq!(notice.kind, NoticeKind::Warning);
    assert_eq!(notice.message, err.user_message());
}

#[test]
fn test_excel_export_produces_one_workbook() {
    let h = harness();
    let request =
        ExportRequest::new("Ledger", ExportFormat::Excel).with_datasets(["sales", "purchases"]);

    h.exporter.run(&registry(), &[], &request).unwrap();

    let files = h.sink.files.lock();
    assert_eq!(files.len(), 1);
    assert!(files[0].filename.starts_with("Ledger-"));
    assert!(files[0].filename.ends_with(".xlsx"));
    assert_eq!(&files[0].bytes[0..2], b"PK");
}

#[test]
fn test_pdf_with_two_long_tables_has_consistent_footers() {
    let h = harness();
    let request =
        ExportRequest::new("Monthly", ExportFormat::Pdf).with_datasets(["sales", "purchases"]);

    h.exporter.run(&registry(), &[], &request).unwrap();

    let files = h.sink.files.lock();
    assert_eq!(files.len(), 1);
    let content = String::from_utf8_lossy(&files[0].bytes);
    let total = content.matches("/Type /Page /Parent").count();
    assert!(total >= 3, "expected cover plus two content pages, got {total}");
    for page in 1..=total {
        let footer = format!("(p\\341gina {page} de {total}) Tj");
        assert_eq!(content.matches(&footer).count(), 1, "{footer}");
    }
}

#[test]
fn test_pdf_embeds_captured_charts_and_reports_missing_ones() {
    let h = harness();
    let exporter = h
        .exporter
        .with_capture_chain(CaptureChain::new().with_strategy(RawCanvas));
    let targets = vec![png_target("revenue", "Revenue")];
    let request = ExportRequest::new("Charts", ExportFormat::Pdf)
        .with_datasets(["sales"])
        .with_captures(["revenue", "missing"]);

    let report = exporter.run(&registry(), &targets, &request).unwrap();

    let files = h.sink.files.lock();
    let content = String::from_utf8_lossy(&files[0].bytes);
    assert!(content.contains("/Subtype /Image /Width 40 /Height 20"));
    assert!(content.contains("(Revenue) Tj"));
    assert_eq!(report.skipped_captures.len(), 1);
    assert_eq!(report.skipped_captures[0].name, "missing");
}

#[test]
fn test_formats_without_visuals_skip_capture() {
    let h = harness();
    let targets = vec![png_target("revenue", "Revenue")];
    let request = ExportRequest::new("Flat", ExportFormat::Csv)
        .with_datasets(["employees"])
        .with_captures(["revenue", "missing"]);

    let report = h.exporter.run(&registry(), &targets, &request).unwrap();
    assert!(report.skipped_captures.is_empty());
}

#[test]
fn test_export_while_in_flight_is_rejected_without_side_effects() {
    let h = harness();
    let _running = h.exporter.latch().try_acquire().unwrap();
    let request = ExportRequest::new("Report", ExportFormat::Csv).with_datasets(["employees"]);

    let err = h.exporter.run(&registry(), &[], &request).unwrap_err();

    assert!(matches!(err, ExportError::AlreadyRunning));
    assert!(h.sink.files.lock().is_empty());
    assert_eq!(h.store.lock().len(), 0);
    assert_eq!(h.overlay.shown.load(Ordering::SeqCst), 0);
}

#[test]
fn test_latch_is_released_after_each_job() {
    let h = harness();
    let ok = ExportRequest::new("Report", ExportFormat::Csv).with_datasets(["employees"]);
    let bad = ExportRequest::new("", ExportFormat::Csv).with_datasets(["employees"]);

    assert!(h.exporter.run(&registry(), &[], &bad).is_err());
    assert!(!h.exporter.latch().is_running());
    assert!(h.exporter.run(&registry(), &[], &ok).is_ok());
    assert!(!h.exporter.latch().is_running());
}

#[test]
fn test_overlay_is_hidden_on_success_and_every_failure() {
    let config = ExportConfig {
        // '"' is not a usable delimiter, so the CSV encoder fails.
        csv_delimiter: '"',
        ..ExportConfig::default()
    };
    let h = harness_with(config);
    let registry = registry();

    let encoder_failure = ExportRequest::new("R", ExportFormat::Csv).with_datasets(["employees"]);
    let validation_failure = ExportRequest {
        title: "R".into(),
        format: None,
        dataset_names: vec!["employees".into()],
        capture_ids: Vec::new(),
    };
    let success = ExportRequest::new("R", ExportFormat::Excel).with_datasets(["employees"]);

    let err = h.exporter.run(&registry, &[], &encoder_failure).unwrap_err();
    assert!(matches!(err, ExportError::Encoding(ref raw) if raw.contains("delimiter")));

    let err = h.exporter.run(&registry, &[], &validation_failure).unwrap_err();
    assert!(matches!(err, ExportError::Validation(ValidationError::MissingFormat)));

    h.exporter.run(&registry, &[], &success).unwrap();

    assert_eq!(h.overlay.shown.load(Ordering::SeqCst), 3);
    assert_eq!(h.overlay.hidden.load(Ordering::SeqCst), 3);
    assert!(!h.overlay.visible.load(Ordering::SeqCst));
    assert_eq!(h.store.lock().len(), 3);
}

#[test]
fn test_delivery_failure_is_reported_as_error() {
    let store = Arc::new(Mutex::new(NotificationStore::new()));
    let exporter = Exporter::new(ExportConfig::default(), Box::new(FailingSink), store.clone());
    let request = ExportRequest::new("R", ExportFormat::Pdf).with_datasets(["employees"]);

    let err = exporter.run(&registry(), &[], &request).unwrap_err();

    assert!(matches!(err, ExportError::Delivery(ref raw) if raw.contains("disk full")));
    assert_eq!(store.lock().latest().unwrap().kind, NoticeKind::Error);
}

#[test]
fn test_success_notice_summarizes_the_job() {
    let h = harness();
    let request =
        ExportRequest::new("R", ExportFormat::Csv).with_datasets(["employees", "empty"]);

    h.exporter.run(&registry(), &[], &request).unwrap();

    let store = h.store.lock();
    let notice = store.latest().unwrap();
    assert_eq!(notice.kind, NoticeKind::Success);
    assert!(notice.message.contains("1 file generated"));
    assert!(notice.message.contains("1 dataset(s) skipped"));
}

#[test]
fn test_directory_sink_writes_every_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let exporter = Exporter::new(
        ExportConfig::default(),
        Box::new(DirectorySink::new(dir.path())),
        Arc::new(LogNotifier),
    );
    let request =
        ExportRequest::new("Team", ExportFormat::Csv).with_datasets(["sales", "purchases"]);

    let report = exporter.run(&registry(), &[], &request).unwrap();

    assert_eq!(report.locations.len(), 2);
    for location in &report.locations {
        let text = std::fs::read_to_string(location).unwrap();
        assert_eq!(text.lines().count(), 61);
    }
}

#[test]
fn test_clashing_dataset_names_write_separate_files() {
    let dir = tempfile::tempdir().unwrap();
    let exporter = Exporter::new(
        ExportConfig::default(),
        Box::new(DirectorySink::new(dir.path())),
        Arc::new(LogNotifier),
    );
    let registry =
        DatasetRegistry::from_json_str(r#"{"a/b": [{"v": 1}], "a:b": [{"v": 2}]}"#).unwrap();
    let request = ExportRequest::new("R", ExportFormat::Csv).with_datasets(["a/b", "a:b"]);

    let report = exporter.run(&registry, &[], &request).unwrap();

    assert_eq!(report.delivered.len(), 2);
    assert_ne!(report.delivered[0], report.delivered[1]);
    let on_disk = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(on_disk, 2);
    let contents: Vec<String> = report
        .locations
        .iter()
        .map(|l| std::fs::read_to_string(l).unwrap())
        .collect();
    assert_eq!(contents, vec!["v\n1\n", "v\n2\n"]);
}

#[test]
fn test_panic_during_job_is_reported_and_releases_guards() {
    let store = Arc::new(Mutex::new(NotificationStore::new()));
    let overlay = RecordingOverlay::default();
    let exporter = Exporter::new(ExportConfig::default(), Box::new(PanickingSink), store.clone())
        .with_overlay(Box::new(overlay.clone()));
    let request = ExportRequest::new("R", ExportFormat::Csv).with_datasets(["employees"]);

    let err = exporter.run(&registry(), &[], &request).unwrap_err();

    assert!(matches!(err, ExportError::Internal(ref raw) if raw.contains("sink state corrupted")));
    assert!(!exporter.latch().is_running());
    assert!(!overlay.visible.load(Ordering::SeqCst));
    let store = store.lock();
    assert_eq!(store.len(), 1);
    assert_eq!(store.latest().unwrap().kind, NoticeKind::Error);
    assert_eq!(store.latest().unwrap().message, err.user_message());
}
