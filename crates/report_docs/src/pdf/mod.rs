//! Paginated PDF document: cover with table of contents, captured charts,
//! then one striped table section per dataset.

pub mod layout;
pub mod text;
mod writer;

use std::fmt::Write as _;

use anyhow::{Context, Result, bail};
use chrono::Local;
use image::{DynamicImage, GenericImageView, Rgba};
use report_core::config::{DocumentLabels, PageLayout};
use report_core::naming::document_filename;
use report_core::{CapturedImage, EncodedArtifact, ExportConfig, ExportFormat, ExportJob};
use tracing::{debug, warn};

use crate::meta::DocumentMeta;
use crate::normalize::Table;
use layout::{ChartBlock, layout_content, stamp_pages};
pub use writer::RgbImage;

/// A captured chart to embed, with the caption shown above it.
#[derive(Debug, Clone, PartialEq)]
pub struct Visual {
    pub title: String,
    pub image: CapturedImage,
}

impl Visual {
    pub fn new(title: impl Into<String>, image: CapturedImage) -> Self {
        Self {
            title: title.into(),
            image,
        }
    }
}

/// Flatten any transparency onto white; PDF image XObjects here carry no alpha.
fn to_rgb(image: &DynamicImage) -> RgbImage {
    let (width, height) = image.dimensions();
    let mut pixels = Vec::with_capacity(width as usize * height as usize * 3);
    for (_, _, Rgba([r, g, b, a])) in image.pixels() {
        let alpha = u16::from(a);
        let blend = |c: u8| ((u16::from(c) * alpha + 255 * (255 - alpha)) / 255) as u8;
        pixels.extend_from_slice(&[blend(r), blend(g), blend(b)]);
    }
    RgbImage {
        width,
        height,
        pixels,
    }
}

fn decode_visual(visual: &Visual) -> Result<RgbImage> {
    let bytes = visual
        .image
        .decode_payload()
        .context("Invalid image data URI")?;
    let decoded = image::load_from_memory(&bytes).context("Unsupported image encoding")?;
    Ok(to_rgb(&decoded))
}

/// Build the complete PDF for `tables` and `visuals`.
///
/// Visuals that fail to decode are left out with a warning; the document
/// itself only fails when there is nothing tabular to show.
pub fn generate_document(
    meta: &DocumentMeta,
    tables: &[Table],
    visuals: &[Visual],
    labels: &DocumentLabels,
    geometry: &PageLayout,
) -> Result<Vec<u8>> {
    if tables.is_empty() {
        bail!("Document has no tables with data");
    }

    let mut images = Vec::with_capacity(visuals.len());
    let mut charts = Vec::with_capacity(visuals.len());
    for visual in visuals {
        match decode_visual(visual) {
            Ok(image) => {
                charts.push(ChartBlock {
                    title: visual.title.clone(),
                    width_px: image.width,
                    height_px: image.height,
                });
                images.push(image);
            }
            Err(e) => warn!("Skipping chart '{}': {e:#}", visual.title),
        }
    }

    let local = meta.created.with_timezone(&Local);
    let mut generated_on = String::new();
    if write!(generated_on, "{}", local.format(&labels.date_format)).is_err() {
        warn!("Invalid date format '{}', using RFC 2822", labels.date_format);
        generated_on = local.to_rfc2822();
    }

    let mut layout = layout_content(&meta.title, &generated_on, tables, &charts, labels, geometry);
    stamp_pages(&mut layout, labels, geometry);
    debug!(
        "Laid out {} pages ({} cover, {} charts, {} tables)",
        layout.pages.len(),
        layout.cover_pages,
        charts.len(),
        tables.len()
    );

    Ok(writer::write_pdf(&layout.pages, &images, meta))
}

/// Encode a job's tables and visuals as its single PDF artifact.
pub fn encode_document(
    job: &ExportJob,
    tables: &[Table],
    visuals: &[Visual],
    config: &ExportConfig,
) -> Result<EncodedArtifact> {
    let meta = DocumentMeta::for_job(job, config);
    let bytes = generate_document(&meta, tables, visuals, &config.labels, &config.layout)?;
    Ok(EncodedArtifact::new(
        bytes,
        document_filename(job),
        ExportFormat::Pdf.mime_type(),
    ))
}
