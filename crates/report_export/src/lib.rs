// Export orchestration: single-job latch, overlay guard, notification and
// delivery of encoded artifacts.

pub mod exporter;
pub mod latch;
pub mod notify;
pub mod overlay;
pub mod sink;

#[cfg(target_arch = "wasm32")]
pub mod browser;

pub use exporter::Exporter;
pub use latch::{InFlightLatch, LatchGuard};
pub use notify::{LogNotifier, Notifier};
pub use overlay::{LoadingOverlay, NoOverlay, OverlayGuard};
pub use sink::{DirectorySink, DownloadSink};

#[cfg(target_arch = "wasm32")]
pub use browser::{BrowserSink, browser_exporter};
