use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ErrorCategory, ExportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeKind {
    Info,
    Success,
    Warning,
    Error,
}

/// Blocking completion/failure message shown at the end of a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notice {
    pub id: String,
    pub kind: NoticeKind,
    pub title: Option<String>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl Notice {
    pub fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            title: None,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Failure notice for a job-level error. User mistakes are warnings.
    pub fn from_error(err: &ExportError) -> Self {
        let kind = match err.category() {
            ErrorCategory::UserError => NoticeKind::Warning,
            _ => NoticeKind::Error,
        };
        Self::new(kind, err.user_message()).with_title("Export failed")
    }
}

/// Most recent job notices, newest first. Holds at most
/// [`NotificationStore::CAPACITY`] entries.
#[derive(Debug, Default)]
pub struct NotificationStore {
    notices: VecDeque<Notice>,
}

impl NotificationStore {
    pub const CAPACITY: usize = 50;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, notice: Notice) {
        self.notices.push_front(notice);
        self.notices.truncate(Self::CAPACITY);
    }

    pub fn len(&self) -> usize {
        self.notices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notices.is_empty()
    }

    pub fn latest(&self) -> Option<&Notice> {
        self.notices.front()
    }
}
