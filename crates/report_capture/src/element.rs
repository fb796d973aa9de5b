//! Capabilities the capture chain needs from the host element tree.
//!
//! Nothing here knows about a browser: the DOM bindings, the static image
//! element used by the CLI and the test fakes all implement these traits.

use std::any::Any;

use report_core::{CaptureError, CapturedImage};

/// A descendant hidden for the duration of a capture.
///
/// `handle` is meaningful only to the element that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HiddenNode {
    pub handle: usize,
    /// Inline `display` value before hiding, restored verbatim.
    pub previous_display: String,
}

/// An element presumed to contain a rendered chart.
pub trait CaptureElement {
    fn id(&self) -> &str;

    /// The chart canvas inside this element, if any.
    fn canvas(&self) -> Option<&dyn ChartCanvas>;

    /// Whether the subtree has anything visible worth rasterizing.
    fn has_renderable_content(&self) -> bool;

    /// Hide every descendant matching one of `selectors`.
    fn hide_descendants(&self, selectors: &[&str]) -> Vec<HiddenNode>;

    fn restore_descendants(&self, hidden: &[HiddenNode]);

    /// The concrete element, for capabilities bound to one host.
    fn as_any(&self) -> Option<&dyn Any> {
        None
    }
}

/// A bitmap surface a chart was drawn on.
pub trait ChartCanvas {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Encode the current pixels as a data URI. `None` when the surface
    /// cannot be read (tainted, detached, zero-sized).
    fn to_data_url(&self) -> Option<String>;

    /// The concrete surface, for runtimes bound to one host.
    fn as_any(&self) -> Option<&dyn Any> {
        None
    }
}

/// Access to a live charting runtime.
///
/// Returns `None` when `canvas` is not bound to a chart instance.
pub trait ChartRuntime {
    fn try_get_bitmap(&self, canvas: &dyn ChartCanvas) -> Option<CapturedImage>;
}

/// Generic rasterization of an arbitrary element subtree.
pub trait SubtreeRasterizer {
    fn rasterize(
        &self,
        element: &dyn CaptureElement,
        scale: f32,
    ) -> Result<CapturedImage, CaptureError>;
}

/// Interactive controls hidden for as long as this guard lives.
///
/// Dropping the guard restores every node, including when rasterization
/// returns early with an error.
pub struct HiddenControls<'a> {
    element: &'a dyn CaptureElement,
    nodes: Vec<HiddenNode>,
}

impl<'a> HiddenControls<'a> {
    pub fn hide(element: &'a dyn CaptureElement, selectors: &[&str]) -> Self {
        let nodes = element.hide_descendants(selectors);
        Self { element, nodes }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Drop for HiddenControls<'_> {
    fn drop(&mut self) {
        if !self.nodes.is_empty() {
            self.element.restore_descendants(&self.nodes);
        }
    }
}
