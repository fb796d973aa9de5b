//! The individual capture strategies, tried in order by [`CaptureChain`].
//!
//! [`CaptureChain`]: crate::CaptureChain

use std::sync::Arc;

use report_core::CapturedImage;
use report_core::config::DEFAULT_HIDDEN_SELECTORS;
use tracing::debug;

use crate::element::{CaptureElement, ChartRuntime, HiddenControls, SubtreeRasterizer};

/// One way of turning an element into an image.
///
/// `None` means "no result"; the chain moves on to the next strategy.
pub trait CaptureStrategy {
    fn name(&self) -> &'static str;
    fn attempt(&self, element: &dyn CaptureElement) -> Option<CapturedImage>;
}

/// Ask the chart runtime for the bitmap of the chart bound to the element's canvas.
pub struct ChartInstance {
    runtime: Arc<dyn ChartRuntime>,
}

impl ChartInstance {
    pub fn new(runtime: Arc<dyn ChartRuntime>) -> Self {
        Self { runtime }
    }
}

impl CaptureStrategy for ChartInstance {
    fn name(&self) -> &'static str {
        "chart-instance"
    }

    fn attempt(&self, element: &dyn CaptureElement) -> Option<CapturedImage> {
        let canvas = element.canvas()?;
        self.runtime.try_get_bitmap(canvas)
    }
}

/// Read the element's canvas pixels directly.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawCanvas;

impl CaptureStrategy for RawCanvas {
    fn name(&self) -> &'static str {
        "raw-canvas"
    }

    fn attempt(&self, element: &dyn CaptureElement) -> Option<CapturedImage> {
        let canvas = element.canvas()?;
        let data_url = canvas.to_data_url()?;
        Some(CapturedImage::new(data_url, canvas.width(), canvas.height()))
    }
}

/// Rasterize the whole subtree with interactive controls hidden.
pub struct Subtree {
    rasterizer: Arc<dyn SubtreeRasterizer>,
    hidden_selectors: Vec<String>,
    scale: f32,
}

impl Subtree {
    pub fn new(rasterizer: Arc<dyn SubtreeRasterizer>) -> Self {
        Self {
            rasterizer,
            hidden_selectors: DEFAULT_HIDDEN_SELECTORS.iter().map(|s| s.to_string()).collect(),
            scale: 2.0,
        }
    }

    pub fn with_hidden_selectors(mut self, selectors: Vec<String>) -> Self {
        self.hidden_selectors = selectors;
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }
}

impl CaptureStrategy for Subtree {
    fn name(&self) -> &'static str {
        "subtree"
    }

    fn attempt(&self, element: &dyn CaptureElement) -> Option<CapturedImage> {
        let selectors: Vec<&str> = self.hidden_selectors.iter().map(String::as_str).collect();
        let hidden = HiddenControls::hide(element, &selectors);
        debug!("Hid {} controls in '{}'", hidden.len(), element.id());

        match self.rasterizer.rasterize(element, self.scale) {
            Ok(image) => Some(image),
            Err(e) => {
                debug!("Subtree rasterization of '{}' failed: {e}", element.id());
                None
            }
        }
        // `hidden` drops here and restores the controls.
    }
}
