//! Two-pass page layout.
//!
//! Pass 1 ([`layout_content`]) places the cover, charts and tables with a
//! running vertical cursor and decides every page break. Pass 2
//! ([`stamp_pages`]) runs once the page count is final and writes the
//! `página i de N` footers and the table-of-contents page numbers.
//!
//! Coordinates are in points with the origin at the top-left corner of the
//! page; the writer flips them into PDF space.

use report_core::config::{DocumentLabels, PageLayout};

use super::text::{fit_text, text_width};
use crate::normalize::Table;

/// A4 portrait.
pub const PAGE_WIDTH: f64 = 595.0;
pub const PAGE_HEIGHT: f64 = 842.0;

const CELL_PADDING: f64 = 4.0;
const SECTION_GAP: f64 = 16.0;
const TOC_LINE_HEIGHT: f64 = 18.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb(pub f64, pub f64, pub f64);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0.0, 0.0, 0.0);
    pub const WHITE: Rgb = Rgb(1.0, 1.0, 1.0);
    pub const BAND: Rgb = Rgb(0.12, 0.31, 0.47);
    pub const HEADER: Rgb = Rgb(0.27, 0.35, 0.45);
    pub const STRIPE: Rgb = Rgb(0.96, 0.96, 0.96);
    pub const BORDER: Rgb = Rgb(0.6, 0.6, 0.6);
    pub const MUTED: Rgb = Rgb(0.4, 0.4, 0.4);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

/// One drawing instruction. `y` of text is the baseline.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text {
        x: f64,
        y: f64,
        size: f64,
        font: Font,
        color: Rgb,
        text: String,
    },
    FillRect {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        color: Rgb,
    },
    StrokeRect {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        color: Rgb,
    },
    Image {
        index: usize,
        x: f64,
        y: f64,
        w: f64,
        h: f64,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub ops: Vec<DrawOp>,
}

impl Page {
    /// Every text drawn on this page, in drawing order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

/// Table-of-contents line whose page number is filled in by pass 2.
#[derive(Debug, Clone, PartialEq)]
pub struct TocEntry {
    pub label: String,
    /// Page holding the TOC line.
    pub toc_page: usize,
    /// Baseline of the TOC line.
    pub y: f64,
    /// First page of the section, zero-based.
    pub section_page: usize,
}

/// A chart block to place: title plus pixel size of the decoded bitmap.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartBlock {
    pub title: String,
    pub width_px: u32,
    pub height_px: u32,
}

/// Result of pass 1.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layout {
    pub pages: Vec<Page>,
    pub toc: Vec<TocEntry>,
    /// Number of leading pages taken by the cover and table of contents.
    pub cover_pages: usize,
    /// Sum of the heights of all laid-out content after the cover.
    pub content_height: f64,
}

/// Vertical space available to content on one page.
pub fn usable_height(geometry: &PageLayout) -> f64 {
    bottom_limit(geometry) - geometry.margin
}

fn bottom_limit(geometry: &PageLayout) -> f64 {
    PAGE_HEIGHT - geometry.bottom_safe_margin
}

fn content_width(geometry: &PageLayout) -> f64 {
    PAGE_WIDTH - 2.0 * geometry.margin
}

/// Running cursor over a growing list of pages.
struct Cursor<'a> {
    geometry: &'a PageLayout,
    pages: Vec<Page>,
    y: f64,
    placed: f64,
}

impl<'a> Cursor<'a> {
    fn new(geometry: &'a PageLayout) -> Self {
        Self {
            geometry,
            pages: vec![Page::default()],
            y: geometry.margin,
            placed: 0.0,
        }
    }

    fn page_index(&self) -> usize {
        self.pages.len() - 1
    }

    fn remaining(&self) -> f64 {
        bottom_limit(self.geometry) - self.y
    }

    fn new_page(&mut self) {
        self.pages.push(Page::default());
        self.y = self.geometry.margin;
    }

    /// Start a new page unless `height` still fits on the current one.
    fn ensure(&mut self, height: f64) {
        if self.remaining() < height && self.y > self.geometry.margin {
            self.new_page();
        }
    }

    fn advance(&mut self, height: f64) {
        self.y += height;
        self.placed += height;
    }

    /// Vertical gap that never pushes the cursor past the bottom margin.
    fn gap(&mut self, height: f64) {
        let h = height.min(self.remaining().max(0.0));
        self.advance(h);
    }

    fn push(&mut self, op: DrawOp) {
        if let Some(page) = self.pages.last_mut() {
            page.ops.push(op);
        }
    }

    fn text(
        &mut self,
        x: f64,
        y: f64,
        size: f64,
        font: Font,
        color: Rgb,
        text: impl Into<String>,
    ) {
        self.push(DrawOp::Text {
            x,
            y,
            size,
            font,
            color,
            text: text.into(),
        });
    }
}

fn centered_x(text: &str, size: f64) -> f64 {
    ((PAGE_WIDTH - text_width(text, size)) / 2.0).max(0.0)
}

/// Pass 1: cover page with table of contents, charts, then one section per table.
pub fn layout_content(
    title: &str,
    generated_on: &str,
    tables: &[Table],
    charts: &[ChartBlock],
    labels: &DocumentLabels,
    geometry: &PageLayout,
) -> Layout {
    let mut cursor = Cursor::new(geometry);
    let width = content_width(geometry);
    let left = geometry.margin;

    // -- Cover -------------------------------------------------------------
    let title_size = geometry.title_font_size;
    let title_text = fit_text(title, title_size, width);
    let title_y = PAGE_HEIGHT * 0.25;
    let title_x = centered_x(&title_text, title_size);
    cursor.text(title_x, title_y, title_size, Font::Bold, Rgb::BLACK, title_text);

    let date_line = format!("{} {generated_on}", labels.generated_on);
    let date_x = centered_x(&date_line, 11.0);
    cursor.text(date_x, title_y + 30.0, 11.0, Font::Regular, Rgb::MUTED, date_line);

    cursor.y = title_y + 80.0;
    cursor.text(left, cursor.y, 14.0, Font::Bold, Rgb::BLACK, labels.contents.clone());
    cursor.y += 24.0;

    let mut toc = Vec::with_capacity(tables.len());
    for (i, table) in tables.iter().enumerate() {
        if cursor.remaining() < TOC_LINE_HEIGHT {
            cursor.new_page();
        }
        let label = format!(
            "{}. {} ({} {})",
            i + 1,
            table.name,
            table.row_count(),
            labels.records
        );
        let label = fit_text(&label, 11.0, width - 40.0);
        cursor.text(left + 10.0, cursor.y, 11.0, Font::Regular, Rgb::BLACK, label.clone());
        toc.push(TocEntry {
            label,
            toc_page: cursor.page_index(),
            y: cursor.y,
            section_page: 0,
        });
        cursor.y += TOC_LINE_HEIGHT;
    }

    let cover_pages = cursor.pages.len();
    cursor.new_page();
    // Only content after the cover counts towards the pagination bound.
    cursor.placed = 0.0;

    // -- Charts --------------------------------------------------------------
    if !charts.is_empty() {
        section_band(&mut cursor, &labels.charts, geometry, width);
        for (index, chart) in charts.iter().enumerate() {
            chart_block(&mut cursor, index, chart, geometry, width);
        }
        cursor.gap(SECTION_GAP);
    }

    // -- Tables --------------------------------------------------------------
    for (table, entry) in tables.iter().zip(toc.iter_mut()) {
        // Band, header row and at least one body row stay together.
        cursor.ensure(geometry.header_band_height + 6.0 + 2.0 * geometry.row_height);
        entry.section_page = cursor.page_index();
        let band_label = format!("{} ({} {})", table.name, table.row_count(), labels.records);
        section_band(&mut cursor, &band_label, geometry, width);
        table_block(&mut cursor, table, geometry, width);
        cursor.gap(SECTION_GAP);
    }

    // Drop a trailing page that ended up empty.
    if cursor.pages.len() > cover_pages + 1
        && cursor.pages.last().is_some_and(|p| p.ops.is_empty())
    {
        cursor.pages.pop();
    }

    Layout {
        pages: cursor.pages,
        toc,
        cover_pages,
        content_height: cursor.placed,
    }
}

fn section_band(cursor: &mut Cursor<'_>, label: &str, geometry: &PageLayout, width: f64) {
    let h = geometry.header_band_height;
    cursor.ensure(h + 6.0 + geometry.row_height);
    let top = cursor.y;
    cursor.push(DrawOp::FillRect {
        x: geometry.margin,
        y: top,
        w: width,
        h,
        color: Rgb::BAND,
    });
    let size = geometry.section_font_size;
    let text = fit_text(label, size, width - 2.0 * CELL_PADDING);
    cursor.text(
        geometry.margin + 8.0,
        top + h / 2.0 + size * 0.35,
        size,
        Font::Bold,
        Rgb::WHITE,
        text,
    );
    cursor.advance(h);
    cursor.gap(6.0);
}

fn chart_block(
    cursor: &mut Cursor<'_>,
    index: usize,
    chart: &ChartBlock,
    geometry: &PageLayout,
    width: f64,
) {
    let caption = 16.0;
    let max_h = usable_height(geometry) - caption;
    let aspect = chart.height_px.max(1) as f64 / chart.width_px.max(1) as f64;
    let mut w = width;
    let mut h = w * aspect;
    if h > max_h {
        h = max_h;
        w = h / aspect;
    }

    cursor.ensure(caption + h);
    let caption_text = fit_text(&chart.title, 11.0, width);
    cursor.text(
        geometry.margin,
        cursor.y + 11.0,
        11.0,
        Font::Bold,
        Rgb::BLACK,
        caption_text,
    );
    cursor.advance(caption);
    cursor.push(DrawOp::Image {
        index,
        x: geometry.margin + (width - w) / 2.0,
        y: cursor.y,
        w,
        h,
    });
    cursor.advance(h);
    cursor.gap(12.0);
}

fn header_row(cursor: &mut Cursor<'_>, table: &Table, geometry: &PageLayout, col_width: f64) {
    let rh = geometry.row_height;
    let size = geometry.table_font_size;
    let top = cursor.y;
    cursor.push(DrawOp::FillRect {
        x: geometry.margin,
        y: top,
        w: col_width * table.column_count() as f64,
        h: rh,
        color: Rgb::HEADER,
    });
    for (i, header) in table.headers.iter().enumerate() {
        let x = geometry.margin + i as f64 * col_width + CELL_PADDING;
        let text = fit_text(header, size, col_width - 2.0 * CELL_PADDING);
        cursor.text(x, top + rh - 5.0, size, Font::Bold, Rgb::WHITE, text);
    }
    cursor.advance(rh);
}

fn table_block(cursor: &mut Cursor<'_>, table: &Table, geometry: &PageLayout, width: f64) {
    let cols = table.column_count().max(1);
    let col_width = width / cols as f64;
    let rh = geometry.row_height;
    let size = geometry.table_font_size;
    let table_width = col_width * cols as f64;

    cursor.ensure(2.0 * rh);
    let mut chunk_top = cursor.y;
    header_row(cursor, table, geometry, col_width);

    for (row_idx, row) in table.rows.iter().enumerate() {
        if cursor.remaining() < rh {
            close_chunk(cursor, geometry, chunk_top, table_width);
            cursor.new_page();
            chunk_top = cursor.y;
            header_row(cursor, table, geometry, col_width);
        }

        let top = cursor.y;
        if row_idx % 2 == 1 {
            cursor.push(DrawOp::FillRect {
                x: geometry.margin,
                y: top,
                w: table_width,
                h: rh,
                color: Rgb::STRIPE,
            });
        }
        for (col_idx, cell) in row.iter().enumerate() {
            let x = geometry.margin + col_idx as f64 * col_width + CELL_PADDING;
            let text = fit_text(&cell.to_string(), size, col_width - 2.0 * CELL_PADDING);
            if !text.is_empty() {
                cursor.text(x, top + rh - 5.0, size, Font::Regular, Rgb::BLACK, text);
            }
        }
        cursor.advance(rh);
    }

    close_chunk(cursor, geometry, chunk_top, table_width);
}

/// Border around the part of a table that sits on the current page.
fn close_chunk(cursor: &mut Cursor<'_>, geometry: &PageLayout, top: f64, table_width: f64) {
    cursor.push(DrawOp::StrokeRect {
        x: geometry.margin,
        y: top,
        w: table_width,
        h: cursor.y - top,
        color: Rgb::BORDER,
    });
}

/// Pass 2: footers on every page and page numbers in the table of contents.
pub fn stamp_pages(layout: &mut Layout, labels: &DocumentLabels, geometry: &PageLayout) {
    let total = layout.pages.len();
    let size = geometry.footer_font_size;
    let footer_y = PAGE_HEIGHT - geometry.bottom_safe_margin / 2.0;

    for (i, page) in layout.pages.iter_mut().enumerate() {
        let text = labels.footer_text(i + 1, total);
        page.ops.push(DrawOp::Text {
            x: centered_x(&text, size),
            y: footer_y,
            size,
            font: Font::Regular,
            color: Rgb::MUTED,
            text,
        });
    }

    let right = PAGE_WIDTH - geometry.margin;
    for entry in &layout.toc {
        let number = (entry.section_page + 1).to_string();
        if let Some(page) = layout.pages.get_mut(entry.toc_page) {
            page.ops.push(DrawOp::Text {
                x: right - text_width(&number, 11.0),
                y: entry.y,
                size: 11.0,
                font: Font::Regular,
                color: Rgb::BLACK,
                text: number,
            });
        }
    }
}
