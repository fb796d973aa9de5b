use std::collections::HashSet;

use anyhow::{Context, Result, bail};
use report_core::naming::document_filename;
use report_core::{EncodedArtifact, ExportConfig, ExportFormat, ExportJob};
use rust_xlsxwriter::{Color, DocProperties, ExcelDateTime, Format, Workbook, Worksheet};
use tracing::debug;

use crate::meta::DocumentMeta;
use crate::normalize::{CellValue, Table};

/// Hard limit of the xlsx format.
pub const MAX_SHEET_NAME_LEN: usize = 31;

/// Longest string a single cell may hold.
const MAX_CELL_CHARS: usize = 32_767;

const INVALID_SHEET_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

/// Cut `name` to `max` chars, then drop the edge apostrophes and spaces a
/// cut can expose.
fn fit(name: &str, max: usize) -> String {
    let cut: String = name.chars().take(max).collect();
    cut.trim().trim_matches('\'').trim().to_string()
}

/// Make `raw` a legal, unique worksheet name. Never fails.
///
/// `used` holds lowercase names already taken in the workbook.
pub fn sheet_name(raw: &str, index: usize, used: &mut HashSet<String>) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if INVALID_SHEET_CHARS.contains(&c) { '_' } else { c })
        .collect();

    let mut base = fit(cleaned.trim().trim_matches('\''), MAX_SHEET_NAME_LEN);
    if base.is_empty() {
        base = format!("Hoja{}", index + 1);
    }
    // Reserved by Excel.
    if base.eq_ignore_ascii_case("history") {
        base.push('_');
    }

    let mut candidate = base.clone();
    let mut n = 2;
    while used.contains(&candidate.to_lowercase()) {
        let suffix = format!("~{n}");
        candidate = fit(&base, MAX_SHEET_NAME_LEN - suffix.chars().count()) + &suffix;
        n += 1;
    }

    used.insert(candidate.to_lowercase());
    candidate
}

fn write_cell(worksheet: &mut Worksheet, row: u32, col: u16, cell: &CellValue) -> Result<()> {
    match cell {
        CellValue::Empty => {}
        CellValue::Bool(b) => {
            worksheet.write_boolean(row, col, *b)?;
        }
        CellValue::Number(n) => match n.as_f64() {
            Some(num) if num.is_finite() => {
                worksheet.write_number(row, col, num)?;
            }
            _ => {
                worksheet.write_string(row, col, n.to_string())?;
            }
        },
        CellValue::Text(s) => {
            if s.chars().count() > MAX_CELL_CHARS {
                let clipped: String = s.chars().take(MAX_CELL_CHARS).collect();
                worksheet.write_string(row, col, clipped)?;
            } else {
                worksheet.write_string(row, col, s)?;
            }
        }
    }
    Ok(())
}

fn write_table(worksheet: &mut Worksheet, table: &Table, header_format: &Format) -> Result<()> {
    for (col, header) in table.headers.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, header, header_format)
            .with_context(|| format!("Failed to write header at column {col}"))?;
    }

    for (row_idx, row) in table.rows.iter().enumerate() {
        let excel_row = (row_idx + 1) as u32;
        for (col_idx, cell) in row.iter().enumerate() {
            write_cell(worksheet, excel_row, col_idx as u16, cell)
                .with_context(|| format!("Failed to write cell at ({excel_row}, {col_idx})"))?;
        }
    }

    worksheet
        .set_freeze_panes(1, 0)
        .context("Failed to freeze header row")?;
    worksheet.autofit();
    Ok(())
}

/// Generate an XLSX workbook with one worksheet per table.
///
/// Returns the raw bytes of the xlsx file.
pub fn generate_workbook(
    tables: &[Table],
    meta: &DocumentMeta,
    header_color: u32,
) -> Result<Vec<u8>> {
    if tables.is_empty() {
        bail!("Workbook has no worksheets with data");
    }

    let mut workbook = Workbook::new();

    let created = ExcelDateTime::from_timestamp(meta.created.timestamp())
        .context("Invalid workbook creation time")?;
    let properties = DocProperties::new()
        .set_title(&meta.title)
        .set_subject(&meta.subject)
        .set_author(&meta.author)
        .set_creation_datetime(&created);
    workbook.set_properties(&properties);

    let header_format = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(header_color));

    let mut used = HashSet::new();
    for (index, table) in tables.iter().enumerate() {
        let name = sheet_name(&table.name, index, &mut used);
        let worksheet = workbook.add_worksheet();
        worksheet
            .set_name(&name)
            .with_context(|| format!("Failed to set sheet name: {name}"))?;
        write_table(worksheet, table, &header_format)
            .with_context(|| format!("Failed to write sheet '{name}'"))?;
        debug!(
            "Wrote sheet '{name}': {} rows x {} columns",
            table.row_count(),
            table.column_count()
        );
    }

    let bytes = workbook
        .save_to_buffer()
        .context("Failed to save workbook to buffer")?;

    Ok(bytes)
}

/// Encode a job's tables as its single workbook artifact.
pub fn encode_workbook(
    job: &ExportJob,
    tables: &[Table],
    config: &ExportConfig,
) -> Result<EncodedArtifact> {
    let meta = DocumentMeta::for_job(job, config);
    let bytes = generate_workbook(tables, &meta, config.sheet_header_color)?;
    Ok(EncodedArtifact::new(
        bytes,
        document_filename(job),
        ExportFormat::Excel.mime_type(),
    ))
}
