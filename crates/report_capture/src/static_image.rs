//! An element backed by an already-encoded chart image.
//!
//! Used when charts are rendered ahead of time (for example by the CLI,
//! which receives PNG/JPEG files on the command line).

use std::io::Cursor;
use std::path::Path;

use anyhow::{Context, Result, bail};
use image::{ImageFormat, ImageReader};
use report_core::CapturedImage;

use crate::element::{CaptureElement, ChartCanvas, HiddenNode};

/// Encoded image bytes exposed as a canvas.
#[derive(Debug, Clone)]
pub struct StaticCanvas {
    mime: &'static str,
    bytes: Vec<u8>,
    width: u32,
    height: u32,
}

impl ChartCanvas for StaticCanvas {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn to_data_url(&self) -> Option<String> {
        if self.bytes.is_empty() {
            return None;
        }
        let image = CapturedImage::from_bytes(self.mime, &self.bytes, self.width, self.height);
        Some(image.image_data)
    }
}

#[derive(Debug, Clone)]
pub struct StaticImageElement {
    id: String,
    canvas: StaticCanvas,
}

impl StaticImageElement {
    /// Wrap encoded image bytes, sniffing the format and reading dimensions.
    pub fn from_bytes(id: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let reader = ImageReader::new(Cursor::new(&bytes))
            .with_guessed_format()
            .context("Failed to read image header")?;
        let mime = match reader.format() {
            Some(ImageFormat::Png) => "image/png",
            Some(ImageFormat::Jpeg) => "image/jpeg",
            Some(ImageFormat::WebP) => "image/webp",
            Some(other) => bail!("Unsupported chart image format: {other:?}"),
            None => bail!("Unrecognized chart image format"),
        };
        let (width, height) = reader
            .into_dimensions()
            .context("Failed to read image dimensions")?;

        Ok(Self {
            id: id.into(),
            canvas: StaticCanvas {
                mime,
                bytes,
                width,
                height,
            },
        })
    }

    pub fn from_path(id: impl Into<String>, path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read chart image: {}", path.display()))?;
        Self::from_bytes(id, bytes)
            .with_context(|| format!("Invalid chart image: {}", path.display()))
    }
}

impl CaptureElement for StaticImageElement {
    fn id(&self) -> &str {
        &self.id
    }

    fn canvas(&self) -> Option<&dyn ChartCanvas> {
        Some(&self.canvas)
    }

    fn has_renderable_content(&self) -> bool {
        self.canvas.width > 0 && self.canvas.height > 0
    }

    fn hide_descendants(&self, _selectors: &[&str]) -> Vec<HiddenNode> {
        Vec::new()
    }

    fn restore_descendants(&self, _hidden: &[HiddenNode]) {}
}
