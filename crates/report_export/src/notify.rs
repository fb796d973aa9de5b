use parking_lot::Mutex;
use report_core::{Notice, NoticeKind, NotificationStore};
use tracing::{error, info, warn};

/// Receives the single completion or failure notice of each job.
pub trait Notifier {
    fn notify(&self, notice: Notice);
}

impl Notifier for Mutex<NotificationStore> {
    fn notify(&self, notice: Notice) {
        self.lock().push(notice);
    }
}

/// Writes notices to the log. Used by headless front ends.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        match notice.kind {
            NoticeKind::Info | NoticeKind::Success => info!("{}", notice.message),
            NoticeKind::Warning => warn!("{}", notice.message),
            NoticeKind::Error => error!("{}", notice.message),
        }
    }
}
