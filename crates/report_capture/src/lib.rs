// Chart capture: element capabilities, ordered fallback strategies and the
// scoped hiding of interactive controls.

pub mod chain;
pub mod element;
pub mod static_image;
pub mod strategy;

#[cfg(target_arch = "wasm32")]
pub mod dom;

#[cfg(target_arch = "wasm32")]
pub use dom::{CanvasCompositor, ChartJsRuntime, DomElement, browser_chain, dom_targets};

pub use chain::{CaptureChain, CaptureOutcome, CaptureTarget, CapturedVisual};
pub use element::{
    CaptureElement, ChartCanvas, ChartRuntime, HiddenControls, HiddenNode, SubtreeRasterizer,
};
pub use static_image::StaticImageElement;
pub use strategy::{CaptureStrategy, ChartInstance, RawCanvas, Subtree};
