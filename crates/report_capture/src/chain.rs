use std::sync::Arc;

use report_core::{CaptureError, CapturedImage, ExportConfig, SkippedItem};
use tracing::{debug, info, warn};

use crate::element::{CaptureElement, ChartRuntime, SubtreeRasterizer};
use crate::strategy::{CaptureStrategy, ChartInstance, RawCanvas, Subtree};

/// An element offered for capture, with the caption used in the document.
pub struct CaptureTarget {
    pub id: String,
    pub title: String,
    pub element: Box<dyn CaptureElement>,
}

impl CaptureTarget {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        element: Box<dyn CaptureElement>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            element,
        }
    }
}

/// A successfully captured target.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedVisual {
    pub id: String,
    pub title: String,
    pub image: CapturedImage,
}

/// Result of capturing a job's requested targets.
#[derive(Debug, Clone, Default)]
pub struct CaptureOutcome {
    pub visuals: Vec<CapturedVisual>,
    pub skipped: Vec<SkippedItem>,
}

/// Ordered fallback over capture strategies.
#[derive(Default)]
pub struct CaptureChain {
    strategies: Vec<Box<dyn CaptureStrategy>>,
}

impl CaptureChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strategy(mut self, strategy: impl CaptureStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// Chart instance, then raw canvas, then subtree rasterization.
    ///
    /// Strategies whose capability is not available are left out.
    pub fn standard(
        runtime: Option<Arc<dyn ChartRuntime>>,
        rasterizer: Option<Arc<dyn SubtreeRasterizer>>,
        config: &ExportConfig,
    ) -> Self {
        let mut chain = Self::new();
        if let Some(runtime) = runtime {
            chain = chain.with_strategy(ChartInstance::new(runtime));
        }
        chain = chain.with_strategy(RawCanvas);
        if let Some(rasterizer) = rasterizer {
            chain = chain.with_strategy(
                Subtree::new(rasterizer)
                    .with_hidden_selectors(config.hidden_selectors.clone())
                    .with_scale(config.capture_scale),
            );
        }
        chain
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Capture one element. Invalid or empty images count as no result.
    pub fn capture(&self, element: &dyn CaptureElement) -> Result<CapturedImage, CaptureError> {
        let id = element.id();
        if element.canvas().is_none() && !element.has_renderable_content() {
            return Err(CaptureError::NothingToCapture(id.to_string()));
        }

        for strategy in &self.strategies {
            match strategy.attempt(element) {
                Some(image) if image.is_valid() => {
                    debug!(
                        "Captured '{id}' via {} ({}x{})",
                        strategy.name(),
                        image.width,
                        image.height
                    );
                    return Ok(image);
                }
                Some(_) => debug!("{} returned an unusable image for '{id}'", strategy.name()),
                None => debug!("{} produced nothing for '{id}'", strategy.name()),
            }
        }

        Err(CaptureError::Exhausted(id.to_string()))
    }

    /// Capture every target whose id is in `ids`, in target order.
    ///
    /// Failures are recorded as skipped and never abort the batch.
    pub fn capture_targets(&self, targets: &[CaptureTarget], ids: &[String]) -> CaptureOutcome {
        let mut outcome = CaptureOutcome::default();

        for id in ids {
            if !targets.iter().any(|t| &t.id == id) {
                let err = CaptureError::TargetNotFound(id.clone());
                warn!("{err}");
                outcome.skipped.push(SkippedItem {
                    name: id.clone(),
                    reason: err.to_string(),
                });
            }
        }

        for target in targets.iter().filter(|t| ids.contains(&t.id)) {
            match self.capture(target.element.as_ref()) {
                Ok(image) => outcome.visuals.push(CapturedVisual {
                    id: target.id.clone(),
                    title: target.title.clone(),
                    image,
                }),
                Err(err) => {
                    warn!("Omitting visual '{}': {err}", target.title);
                    outcome.skipped.push(SkippedItem {
                        name: target.title.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        info!(
            "Captured {} of {} requested visuals",
            outcome.visuals.len(),
            ids.len()
        );
        outcome
    }
}
