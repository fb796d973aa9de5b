//! Browser download delivery (wasm32 only).

use std::sync::Arc;

use anyhow::{Result, anyhow};
use report_capture::browser_chain;
use report_core::{EncodedArtifact, ExportConfig};
use tracing::debug;
use wasm_bindgen::JsCast;
use web_sys::{Blob, BlobPropertyBag, Document, HtmlAnchorElement, Url};

use crate::{Exporter, Notifier};

/// Object URL revoked on drop.
struct ObjectUrl(String);

impl ObjectUrl {
    fn for_bytes(bytes: &[u8], mime: &str) -> Result<Self> {
        let array = js_sys::Uint8Array::from(bytes);
        let parts = js_sys::Array::new();
        parts.push(&array.buffer());

        let opts = BlobPropertyBag::new();
        opts.set_type(mime);
        let blob = Blob::new_with_u8_array_sequence_and_options(&parts, &opts)
            .map_err(|_| anyhow!("Failed to create blob"))?;
        let url = Url::create_object_url_with_blob(&blob)
            .map_err(|_| anyhow!("Unable to create object URL"))?;
        Ok(Self(url))
    }
}

impl Drop for ObjectUrl {
    fn drop(&mut self) {
        let _ = Url::revoke_object_url(&self.0);
    }
}

/// Hidden anchor attached to the body, removed on drop.
struct TransientAnchor(HtmlAnchorElement);

impl TransientAnchor {
    fn attach(document: &Document, href: &str, filename: &str) -> Result<Self> {
        let anchor: HtmlAnchorElement = document
            .create_element("a")
            .map_err(|_| anyhow!("Unable to create anchor"))?
            .dyn_into()
            .map_err(|_| anyhow!("Anchor cast failed"))?;
        anchor.set_href(href);
        anchor.set_download(filename);
        let _ = anchor.style().set_property("display", "none");

        // Build the guard before attaching so a failed append still cleans up.
        let guard = Self(anchor);
        document
            .body()
            .ok_or_else(|| anyhow!("Missing document body"))?
            .append_child(&guard.0)
            .map_err(|_| anyhow!("Unable to attach anchor"))?;
        Ok(guard)
    }

    fn click(&self) {
        self.0.click();
    }
}

impl Drop for TransientAnchor {
    fn drop(&mut self) {
        self.0.remove();
    }
}

/// Triggers a browser download per artifact.
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserSink;

impl crate::DownloadSink for BrowserSink {
    fn deliver(&self, artifact: &EncodedArtifact) -> Result<Option<String>> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| anyhow!("Document unavailable"))?;

        let url = ObjectUrl::for_bytes(&artifact.bytes, &artifact.mime_type)?;
        let anchor = TransientAnchor::attach(&document, &url.0, &artifact.filename)?;
        anchor.click();
        debug!("Triggered download of {}", artifact.filename);

        // Anchor is removed before the URL is revoked.
        drop(anchor);
        drop(url);
        Ok(None)
    }
}

/// Exporter for a page: downloads through the browser and captures charts
/// through Chart.js, the raw canvas and then the canvas compositor.
pub fn browser_exporter(config: ExportConfig, notifier: Arc<dyn Notifier>) -> Exporter {
    let chain = browser_chain(&config);
    Exporter::new(config, Box::new(BrowserSink), notifier).with_capture_chain(chain)
}
