use std::collections::HashSet;

use anyhow::{Context, Result, bail};
use report_core::naming::csv_filename;
use report_core::{EncodedArtifact, ExportFormat, ExportJob};
use tracing::debug;

use crate::normalize::Table;

/// Generate delimited text from headers and rows.
///
/// Fields containing the delimiter, a quote or a newline are quote-wrapped by
/// the `csv` crate; every line ends with `\n`.
pub fn generate_delimited(
    headers: &[String],
    rows: &[Vec<String>],
    delimiter: char,
) -> Result<String> {
    if !delimiter.is_ascii() || delimiter == '"' || delimiter == '\n' {
        bail!("Unsupported CSV delimiter: {delimiter:?}");
    }

    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter as u8)
        .quote_style(csv::QuoteStyle::Necessary)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer
        .write_record(headers)
        .context("Failed to write header record")?;

    for row in rows {
        writer
            .write_record(row)
            .context("Failed to write data record")?;
    }

    let bytes = writer.into_inner().context("Failed to flush CSV writer")?;

    String::from_utf8(bytes).context("CSV output contained invalid UTF-8")
}

/// Encode one normalized table.
pub fn encode_table(table: &Table, delimiter: char) -> Result<String> {
    generate_delimited(&table.headers, &table.text_rows(), delimiter)
        .with_context(|| format!("Failed to encode dataset '{}' as CSV", table.name))
}

/// File name for `dataset` that no earlier artifact of the job uses.
///
/// Distinct dataset names can sanitize to the same component, so clashes get
/// a `-2`, `-3`... suffix on the dataset part. Compared case-insensitively.
fn unique_filename(job: &ExportJob, dataset: &str, used: &mut HashSet<String>) -> String {
    let mut candidate = csv_filename(job, dataset);
    let mut n = 2;
    while used.contains(&candidate.to_lowercase()) {
        candidate = csv_filename(job, &format!("{dataset}-{n}"));
        n += 1;
    }
    used.insert(candidate.to_lowercase());
    candidate
}

/// One CSV artifact per table, in table order, with distinct file names.
pub fn encode_csv_files(
    job: &ExportJob,
    tables: &[Table],
    delimiter: char,
) -> Result<Vec<EncodedArtifact>> {
    let mut used = HashSet::new();
    tables
        .iter()
        .map(|table| {
            let text = encode_table(table, delimiter)?;
            let filename = unique_filename(job, &table.name, &mut used);
            debug!("Encoded '{}' as {filename} ({} bytes)", table.name, text.len());
            Ok(EncodedArtifact::new(
                text.into_bytes(),
                filename,
                ExportFormat::Csv.mime_type(),
            ))
        })
        .collect()
}

/// Parse CSV text into headers and rows. The first record is the header row.
pub fn parse_csv(input: &str, delimiter: u8) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .from_reader(input.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .context("Failed to read CSV headers")?
        .iter()
        .map(String::from)
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.context("Failed to read CSV record")?;
        rows.push(record.iter().map(String::from).collect());
    }

    Ok((headers, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::CellValue;
    use chrono::{TimeZone, Utc};
    use report_core::ExportRequest;

    fn table(name: &str, headers: &[&str], rows: Vec<Vec<CellValue>>) -> Table {
        Table {
            name: name.into(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows,
        }
    }

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.into())
    }

    #[test]
    fn test_single_record_matches_exact_output() {
        let t = table(
            "employees",
            &["id", "name"],
            vec![vec![CellValue::Number(1u64.into()), text("Ana")]],
        );
        assert_eq!(encode_table(&t, ',').unwrap(), "id,name\n1,Ana\n");
    }

    #[test]
    fn test_line_count_is_header_plus_records() {
        let rows: Vec<Vec<CellValue>> = (0..25i64)
            .map(|i| vec![CellValue::Number(i.into()), text("x"), CellValue::Empty])
            .collect();
        let t = table("t", &["a", "b", "c"], rows);
        let out = encode_table(&t, ',').unwrap();

        assert_eq!(out.lines().count(), 26);
        assert_eq!(out.lines().next().unwrap().split(',').count(), 3);
    }

    #[test]
    fn test_fields_with_delimiter_are_quoted() {
        let t = table(
            "t",
            &["Name", "Location"],
            vec![vec![text("Smith, John"), text("Austin")]],
        );
        let out = encode_table(&t, ',').unwrap();
        assert!(out.contains("\"Smith, John\",Austin"));
    }

    #[test]
    fn test_custom_delimiter_quotes_only_that_delimiter() {
        let t = table("t", &["a", "b"], vec![vec![text("1,5"), text("x;y")]]);
        let out = encode_table(&t, ';').unwrap();
        assert_eq!(out, "a;b\n1,5;\"x;y\"\n");
    }

    #[test]
    fn test_quotes_and_newlines_survive_parsing() {
        let t = table("t", &["note"], vec![vec![text("say \"hi\"\nbye")]]);
        let out = encode_table(&t, ',').unwrap();
        let (headers, rows) = parse_csv(&out, b',').unwrap();
        assert_eq!(headers, vec!["note"]);
        assert_eq!(rows[0][0], "say \"hi\"\nbye");
    }

    #[test]
    fn test_non_ascii_delimiter_is_rejected() {
        let t = table("t", &["a"], vec![vec![text("1")]]);
        assert!(encode_table(&t, '¦').is_err());
    }

    #[test]
    fn test_one_artifact_per_table() {
        let job = ExportRequest::new("Report", ExportFormat::Csv)
            .with_datasets(["a", "b"])
            .validate(Utc.timestamp_millis_opt(42).unwrap())
            .unwrap();
        let tables = vec![
            table("a", &["x"], vec![vec![text("1")]]),
            table("b", &["y"], vec![vec![text("2")]]),
        ];
        let artifacts = encode_csv_files(&job, &tables, ',').unwrap();

        let names: Vec<&str> = artifacts.iter().map(|a| a.filename.as_str()).collect();
        assert_eq!(names, vec!["Report-a-42.csv", "Report-b-42.csv"]);
        assert!(artifacts.iter().all(|a| a.mime_type.starts_with("text/csv")));
    }

    #[test]
    fn test_sanitized_name_clashes_get_distinct_files() {
        let job = ExportRequest::new("R", ExportFormat::Csv)
            .with_datasets(["a/b", "a:b", "A_B"])
            .validate(Utc.timestamp_millis_opt(7).unwrap())
            .unwrap();
        let tables = vec![
            table("a/b", &["v"], vec![vec![text("1")]]),
            table("a:b", &["v"], vec![vec![text("2")]]),
            table("A_B", &["v"], vec![vec![text("3")]]),
        ];
        let artifacts = encode_csv_files(&job, &tables, ',').unwrap();

        let names: Vec<&str> = artifacts.iter().map(|a| a.filename.as_str()).collect();
        assert_eq!(names, vec!["R-a_b-7.csv", "R-a_b-2-7.csv", "R-A_B-3-7.csv"]);
        assert_eq!(artifacts[1].bytes, b"v\n2\n");
    }
}
