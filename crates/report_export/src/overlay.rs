/// A blocking "export in progress" indicator owned by the host UI.
pub trait LoadingOverlay {
    fn show(&self, message: &str);
    fn hide(&self);
}

/// Hosts without a visible overlay.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOverlay;

impl LoadingOverlay for NoOverlay {
    fn show(&self, _message: &str) {}
    fn hide(&self) {}
}

/// Keeps the overlay visible until dropped.
pub struct OverlayGuard<'a> {
    overlay: &'a dyn LoadingOverlay,
}

impl<'a> OverlayGuard<'a> {
    pub fn show(overlay: &'a dyn LoadingOverlay, message: &str) -> Self {
        overlay.show(message);
        Self { overlay }
    }
}

impl Drop for OverlayGuard<'_> {
    fn drop(&mut self) {
        self.overlay.hide();
    }
}
