//! Browser DOM bindings for the capture capabilities (wasm32 only).
//!
//! [`ChartJsRuntime`] asks the page's Chart.js for the chart bound to a
//! canvas. [`CanvasCompositor`] is the subtree fallback: it flattens every
//! visible canvas layer of the element onto one scaled surface.

use std::any::Any;
use std::cell::RefCell;
use std::sync::Arc;

use report_core::{CaptureError, CapturedImage, ExportConfig};
use tracing::debug;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, Document, Element, HtmlCanvasElement, HtmlElement};

use crate::chain::{CaptureChain, CaptureTarget};
use crate::element::{CaptureElement, ChartCanvas, ChartRuntime, HiddenNode, SubtreeRasterizer};

#[wasm_bindgen]
extern "C" {
    /// A Chart.js chart instance.
    type ChartHandle;

    // Throws a ReferenceError when Chart.js is not on the page.
    #[wasm_bindgen(catch, js_namespace = Chart, js_name = getChart)]
    fn chart_for_canvas(canvas: &HtmlCanvasElement) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = toBase64Image)]
    fn to_base64_image(this: &ChartHandle) -> Result<String, JsValue>;
}

pub struct DomCanvas {
    canvas: HtmlCanvasElement,
}

impl ChartCanvas for DomCanvas {
    fn width(&self) -> u32 {
        self.canvas.width()
    }

    fn height(&self) -> u32 {
        self.canvas.height()
    }

    fn to_data_url(&self) -> Option<String> {
        // Tainted canvases throw; an empty one yields "data:," and fails validation later.
        self.canvas.to_data_url_with_type("image/png").ok()
    }

    fn as_any(&self) -> Option<&dyn Any> {
        Some(self)
    }
}

/// A DOM element presumed to contain a chart.
pub struct DomElement {
    id: String,
    element: Element,
    canvas: Option<DomCanvas>,
    hidden: RefCell<Vec<HtmlElement>>,
}

impl DomElement {
    pub fn new(element: Element) -> Self {
        let canvas = element
            .query_selector("canvas")
            .ok()
            .flatten()
            .and_then(|node| node.dyn_into::<HtmlCanvasElement>().ok())
            .map(|canvas| DomCanvas { canvas });
        Self {
            id: element.id(),
            element,
            canvas,
            hidden: RefCell::new(Vec::new()),
        }
    }

    /// Look up an element by id in the current document.
    pub fn by_id(id: &str) -> Option<Self> {
        let document = web_sys::window()?.document()?;
        document.get_element_by_id(id).map(Self::new)
    }

    pub fn element(&self) -> &Element {
        &self.element
    }
}

impl CaptureElement for DomElement {
    fn id(&self) -> &str {
        &self.id
    }

    fn canvas(&self) -> Option<&dyn ChartCanvas> {
        self.canvas.as_ref().map(|c| c as &dyn ChartCanvas)
    }

    fn has_renderable_content(&self) -> bool {
        self.element.child_element_count() > 0
            && self.element.client_width() > 0
            && self.element.client_height() > 0
    }

    fn hide_descendants(&self, selectors: &[&str]) -> Vec<HiddenNode> {
        let mut hidden = self.hidden.borrow_mut();
        let mut nodes = Vec::new();

        for selector in selectors {
            let Ok(list) = self.element.query_selector_all(selector) else {
                continue;
            };
            for i in 0..list.length() {
                let Some(node) = list.item(i) else { continue };
                let Ok(html) = node.dyn_into::<HtmlElement>() else {
                    continue;
                };
                let style = html.style();
                let previous_display = style.get_property_value("display").unwrap_or_default();
                if style.set_property("display", "none").is_err() {
                    continue;
                }
                nodes.push(HiddenNode {
                    handle: hidden.len(),
                    previous_display,
                });
                hidden.push(html);
            }
        }
        nodes
    }

    fn restore_descendants(&self, nodes: &[HiddenNode]) {
        let mut hidden = self.hidden.borrow_mut();
        // Reverse order so a node hidden by two selectors ends up with its original value.
        for node in nodes.iter().rev() {
            let Some(html) = hidden.get(node.handle) else {
                continue;
            };
            let style = html.style();
            if node.previous_display.is_empty() {
                let _ = style.remove_property("display");
            } else {
                let _ = style.set_property("display", &node.previous_display);
            }
        }
        hidden.clear();
    }

    fn as_any(&self) -> Option<&dyn Any> {
        Some(self)
    }
}

/// Chart.js lookup by canvas. Yields nothing when Chart.js is absent or the
/// canvas has no chart bound to it.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChartJsRuntime;

impl ChartRuntime for ChartJsRuntime {
    fn try_get_bitmap(&self, canvas: &dyn ChartCanvas) -> Option<CapturedImage> {
        let dom = canvas.as_any()?.downcast_ref::<DomCanvas>()?;
        let chart = chart_for_canvas(&dom.canvas).ok()?;
        if chart.is_undefined() || chart.is_null() {
            return None;
        }
        let data_url = chart.unchecked_into::<ChartHandle>().to_base64_image().ok()?;
        Some(CapturedImage::new(data_url, dom.width(), dom.height()))
    }
}

fn rasterize_error(id: &str, what: &str) -> CaptureError {
    CaptureError::Rasterize(format!("{what} for '{id}'"))
}

/// Scaled, white-backed drawing surface detached from the document.
fn blank_surface(
    document: &Document,
    width: u32,
    height: u32,
) -> Option<(HtmlCanvasElement, CanvasRenderingContext2d)> {
    let surface: HtmlCanvasElement = document.create_element("canvas").ok()?.dyn_into().ok()?;
    surface.set_width(width);
    surface.set_height(height);
    let context: CanvasRenderingContext2d = surface.get_context("2d").ok()??.dyn_into().ok()?;
    context.set_fill_style_str("#ffffff");
    context.fill_rect(0.0, 0.0, f64::from(width), f64::from(height));
    Some((surface, context))
}

/// Flattens the visible canvas layers of a [`DomElement`] at their on-screen
/// offsets. Layers hidden by the capture (zero-sized boxes) are left out.
#[derive(Debug, Default, Clone, Copy)]
pub struct CanvasCompositor;

impl SubtreeRasterizer for CanvasCompositor {
    fn rasterize(
        &self,
        element: &dyn CaptureElement,
        scale: f32,
    ) -> Result<CapturedImage, CaptureError> {
        let id = element.id();
        let dom = element
            .as_any()
            .and_then(|any| any.downcast_ref::<DomElement>())
            .ok_or_else(|| rasterize_error(id, "not a DOM element"))?;

        let scale = f64::from(scale);
        let root = dom.element.get_bounding_client_rect();
        let width = (root.width() * scale).round() as u32;
        let height = (root.height() * scale).round() as u32;
        if width == 0 || height == 0 {
            return Err(rasterize_error(id, "zero-sized box"));
        }

        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| rasterize_error(id, "document unavailable"))?;
        let (surface, context) = blank_surface(&document, width, height)
            .ok_or_else(|| rasterize_error(id, "no 2d context"))?;
        context
            .scale(scale, scale)
            .map_err(|_| rasterize_error(id, "scale rejected"))?;

        let layers = dom
            .element
            .query_selector_all("canvas")
            .map_err(|_| rasterize_error(id, "canvas query failed"))?;
        let mut drawn = 0;
        for i in 0..layers.length() {
            let Some(layer) = layers
                .item(i)
                .and_then(|node| node.dyn_into::<HtmlCanvasElement>().ok())
            else {
                continue;
            };
            let rect = layer.get_bounding_client_rect();
            if rect.width() <= 0.0 || rect.height() <= 0.0 {
                continue;
            }
            context
                .draw_image_with_html_canvas_element_and_dw_and_dh(
                    &layer,
                    rect.left() - root.left(),
                    rect.top() - root.top(),
                    rect.width(),
                    rect.height(),
                )
                .map_err(|_| rasterize_error(id, "tainted canvas layer"))?;
            drawn += 1;
        }
        if drawn == 0 {
            return Err(rasterize_error(id, "no visible canvas layers"));
        }
        debug!("Composited {drawn} canvas layer(s) of '{id}' at {width}x{height}");

        let data_url = surface
            .to_data_url_with_type("image/png")
            .map_err(|_| rasterize_error(id, "surface not readable"))?;
        Ok(CapturedImage::new(data_url, width, height))
    }
}

/// The full chain for pages that render with Chart.js.
pub fn browser_chain(config: &ExportConfig) -> CaptureChain {
    let runtime: Arc<dyn ChartRuntime> = Arc::new(ChartJsRuntime);
    let rasterizer: Arc<dyn SubtreeRasterizer> = Arc::new(CanvasCompositor);
    CaptureChain::standard(Some(runtime), Some(rasterizer), config)
}

/// Capture targets for `(id, title)` pairs found in the current document.
/// Ids with no element are left out and later reported as not found.
pub fn dom_targets<'a>(
    entries: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Vec<CaptureTarget> {
    entries
        .into_iter()
        .filter_map(|(id, title)| {
            DomElement::by_id(id).map(|element| CaptureTarget::new(id, title, Box::new(element)))
        })
        .collect()
}
