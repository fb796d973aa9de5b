//! Minimal PDF 1.4 serializer for laid-out pages.
//!
//! Uses the built-in Helvetica fonts (no font files) and embeds chart images
//! as uncompressed RGB XObjects.

use std::fmt::Write as _;

use super::layout::{DrawOp, Font, PAGE_HEIGHT, PAGE_WIDTH, Page, Rgb};
use super::text::pdf_literal;
use crate::meta::DocumentMeta;

/// Decoded chart bitmap ready for embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbImage {
    pub width: u32,
    pub height: u32,
    /// `width * height * 3` bytes, row-major.
    pub pixels: Vec<u8>,
}

// Fixed object numbers; images and pages follow.
const CATALOG: usize = 1;
const PAGES: usize = 2;
const FONT_BOLD: usize = 3;
const FONT_REGULAR: usize = 4;
const INFO: usize = 5;
const FIRST_DYNAMIC: usize = 6;

struct PdfBuffer {
    bytes: Vec<u8>,
    offsets: Vec<usize>,
}

impl PdfBuffer {
    fn new() -> Self {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");
        Self {
            bytes,
            offsets: Vec::new(),
        }
    }

    /// Append object `id`; objects must be added in increasing id order.
    fn object(&mut self, id: usize, body: &str) {
        debug_assert_eq!(id, self.offsets.len() + 1);
        self.offsets.push(self.bytes.len());
        self.bytes
            .extend_from_slice(format!("{id} 0 obj\n{body}\nendobj\n").as_bytes());
    }

    fn stream(&mut self, id: usize, dict: &str, data: &[u8]) {
        debug_assert_eq!(id, self.offsets.len() + 1);
        self.offsets.push(self.bytes.len());
        self.bytes.extend_from_slice(
            format!("{id} 0 obj\n<< {dict} /Length {} >>\nstream\n", data.len()).as_bytes(),
        );
        self.bytes.extend_from_slice(data);
        self.bytes.extend_from_slice(b"\nendstream\nendobj\n");
    }

    fn finish(mut self) -> Vec<u8> {
        let xref_offset = self.bytes.len();
        let size = self.offsets.len() + 1;
        let mut tail = format!("xref\n0 {size}\n0000000000 65535 f \n");
        for offset in &self.offsets {
            let _ = writeln!(tail, "{offset:010} 00000 n ");
        }
        let _ = write!(
            tail,
            "trailer\n<< /Size {size} /Root {CATALOG} 0 R /Info {INFO} 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n"
        );
        self.bytes.extend_from_slice(tail.as_bytes());
        self.bytes
    }
}

fn fill_color(c: Rgb) -> String {
    format!("{:.3} {:.3} {:.3} rg", c.0, c.1, c.2)
}

fn stroke_color(c: Rgb) -> String {
    format!("{:.3} {:.3} {:.3} RG", c.0, c.1, c.2)
}

/// Content stream for one page, flipping top-left coordinates into PDF space.
fn content_stream(page: &Page) -> String {
    let mut out = String::new();
    for op in &page.ops {
        match op {
            DrawOp::Text {
                x,
                y,
                size,
                font,
                color,
                text,
            } => {
                let font_name = match font {
                    Font::Bold => "F1",
                    Font::Regular => "F2",
                };
                let _ = writeln!(
                    out,
                    "BT\n{}\n/{font_name} {size:.1} Tf\n{x:.2} {:.2} Td\n({}) Tj\nET",
                    fill_color(*color),
                    PAGE_HEIGHT - y,
                    pdf_literal(text)
                );
            }
            DrawOp::FillRect { x, y, w, h, color } => {
                let _ = writeln!(
                    out,
                    "{}\n{x:.2} {:.2} {w:.2} {h:.2} re f",
                    fill_color(*color),
                    PAGE_HEIGHT - y - h
                );
            }
            DrawOp::StrokeRect { x, y, w, h, color } => {
                let _ = writeln!(
                    out,
                    "{}\n0.5 w\n{x:.2} {:.2} {w:.2} {h:.2} re S",
                    stroke_color(*color),
                    PAGE_HEIGHT - y - h
                );
            }
            DrawOp::Image { index, x, y, w, h } => {
                let _ = writeln!(
                    out,
                    "q\n{w:.2} 0 0 {h:.2} {x:.2} {:.2} cm\n/Im{index} Do\nQ",
                    PAGE_HEIGHT - y - h
                );
            }
        }
    }
    out
}

fn pdf_date(meta: &DocumentMeta) -> String {
    meta.created.format("D:%Y%m%d%H%M%SZ").to_string()
}

/// Serialize pages into a complete PDF file.
pub fn write_pdf(pages: &[Page], images: &[RgbImage], meta: &DocumentMeta) -> Vec<u8> {
    let first_image = FIRST_DYNAMIC;
    let first_page = first_image + images.len();
    let page_ids: Vec<usize> = (0..pages.len()).map(|i| first_page + 2 * i).collect();

    let mut pdf = PdfBuffer::new();

    pdf.object(CATALOG, &format!("<< /Type /Catalog /Pages {PAGES} 0 R >>"));

    let kids: Vec<String> = page_ids.iter().map(|id| format!("{id} 0 R")).collect();
    pdf.object(
        PAGES,
        &format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            pages.len()
        ),
    );

    pdf.object(
        FONT_BOLD,
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>",
    );
    pdf.object(
        FONT_REGULAR,
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>",
    );

    pdf.object(
        INFO,
        &format!(
            "<< /Title ({}) /Subject ({}) /Author ({}) /Producer (report_docs) /CreationDate ({}) >>",
            pdf_literal(&meta.title),
            pdf_literal(&meta.subject),
            pdf_literal(&meta.author),
            pdf_date(meta)
        ),
    );

    for (i, image) in images.iter().enumerate() {
        pdf.stream(
            first_image + i,
            &format!(
                "/Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceRGB /BitsPerComponent 8",
                image.width, image.height
            ),
            &image.pixels,
        );
    }

    let xobjects: String = (0..images.len())
        .map(|i| format!("/Im{i} {} 0 R", first_image + i))
        .collect::<Vec<_>>()
        .join(" ");
    let resources = format!(
        "/Resources << /Font << /F1 {FONT_BOLD} 0 R /F2 {FONT_REGULAR} 0 R >> /XObject << {xobjects} >> >>"
    );

    for (page, page_id) in pages.iter().zip(&page_ids) {
        let content_id = page_id + 1;
        pdf.object(
            *page_id,
            &format!(
                "<< /Type /Page /Parent {PAGES} 0 R /MediaBox [0 0 {PAGE_WIDTH:.0} {PAGE_HEIGHT:.0}] /Contents {content_id} 0 R {resources} >>"
            ),
        );
        pdf.stream(content_id, "", content_stream(page).as_bytes());
    }

    pdf.finish()
}
