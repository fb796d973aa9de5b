use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Single-job in-flight flag.
///
/// Cloning shares the flag; a second [`try_acquire`](Self::try_acquire) while
/// a guard is alive fails.
#[derive(Debug, Clone, Default)]
pub struct InFlightLatch {
    running: Arc<AtomicBool>,
}

impl InFlightLatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn try_acquire(&self) -> Option<LatchGuard> {
        if self.running.swap(true, Ordering::SeqCst) {
            return None;
        }
        Some(LatchGuard {
            running: Arc::clone(&self.running),
        })
    }
}

/// Releases the latch when dropped.
#[derive(Debug)]
pub struct LatchGuard {
    running: Arc<AtomicBool>,
}

impl Drop for LatchGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}
