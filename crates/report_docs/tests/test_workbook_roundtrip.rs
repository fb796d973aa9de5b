use std::collections::BTreeMap;
use std::io::{Cursor, Read};

use chrono::Utc;
use regex::Regex;
use report_core::{DatasetRegistry, ExportConfig, ExportFormat, ExportRequest};
use report_docs::normalize_selection;
use report_docs::xlsx::encode_workbook;
use zip::ZipArchive;

fn registry() -> DatasetRegistry {
    DatasetRegistry::from_json_str(
        r#"{
            "employees": [
                {"id": 1, "name": "Ana", "active": true},
                {"id": 2, "name": "Luis", "active": false},
                {"id": 3, "name": "Marta", "active": true}
            ],
            "a sheet name that is clearly longer than thirty-one characters": [
                {"k": "v"}
            ],
            "A SHEET NAME THAT IS CLEARLY LONGER THAN THIRTY-ONE CHARACTERS": [
                {"k": "w"}
            ],
            "empty": []
        }"#,
    )
    .unwrap()
}

fn read_entry(archive: &mut ZipArchive<Cursor<Vec<u8>>>, name: &str) -> String {
    let mut file = archive.by_name(name).unwrap();
    let mut out = String::new();
    file.read_to_string(&mut out).unwrap();
    out
}

fn export(names: &[&str]) -> (ZipArchive<Cursor<Vec<u8>>>, String) {
    let registry = registry();
    let job = ExportRequest::new("Quarterly", ExportFormat::Excel)
        .with_datasets(names.iter().copied())
        .validate(Utc::now())
        .unwrap();
    let selection = normalize_selection(&registry, job.dataset_names());
    let artifact = encode_workbook(&job, &selection.tables, &ExportConfig::default()).unwrap();

    assert!(artifact.filename.starts_with("Quarterly-"));
    assert!(artifact.filename.ends_with(".xlsx"));
    assert_eq!(artifact.mime_type, ExportFormat::Excel.mime_type());

    let archive = ZipArchive::new(Cursor::new(artifact.bytes)).unwrap();
    (archive, artifact.filename)
}

/// Shared-string table, in index order.
fn shared_strings(archive: &mut ZipArchive<Cursor<Vec<u8>>>) -> Vec<String> {
    let xml = read_entry(archive, "xl/sharedStrings.xml");
    let si = Regex::new(r#"<si><t[^>]*>([^<]*)</t></si>"#).unwrap();
    si.captures_iter(&xml).map(|c| c[1].to_string()).collect()
}

/// Every written cell keyed by zero-based (row, column), rendered as text.
fn read_cells(archive: &mut ZipArchive<Cursor<Vec<u8>>>) -> BTreeMap<(u32, u32), String> {
    let strings = shared_strings(archive);
    let sheet = read_entry(archive, "xl/worksheets/sheet1.xml");
    let cell = Regex::new(r#"<c r="([A-Z]+)(\d+)"([^>]*)><v>([^<]*)</v></c>"#).unwrap();

    cell.captures_iter(&sheet)
        .map(|c| {
            let col = c[1].bytes().fold(0u32, |acc, b| acc * 26 + u32::from(b - b'A' + 1)) - 1;
            let row: u32 = c[2].parse::<u32>().unwrap() - 1;
            let attrs = &c[3];
            let raw = &c[4];
            let value = if attrs.contains(r#"t="s""#) {
                strings[raw.parse::<usize>().unwrap()].clone()
            } else if attrs.contains(r#"t="b""#) {
                (raw == "1").to_string()
            } else {
                raw.to_string()
            };
            ((row, col), value)
        })
        .collect()
}

#[test]
fn test_every_cell_matches_its_source_record() {
    let (mut archive, _) = export(&["employees"]);
    let cells = read_cells(&mut archive);

    let expected = [
        ["id", "name", "active"],
        ["1", "Ana", "true"],
        ["2", "Luis", "false"],
        ["3", "Marta", "true"],
    ];
    let mut want = BTreeMap::new();
    for (row, values) in expected.iter().enumerate() {
        for (col, value) in values.iter().enumerate() {
            want.insert((row as u32, col as u32), value.to_string());
        }
    }
    assert_eq!(cells, want);
}

#[test]
fn test_worksheet_holds_header_plus_every_record() {
    let (mut archive, _) = export(&["employees"]);
    let sheet = read_entry(&mut archive, "xl/worksheets/sheet1.xml");

    let cells = Regex::new(r#"<c r="[A-Z]+\d+""#).unwrap();
    // 1 header row + 3 records, 3 columns each.
    assert_eq!(cells.find_iter(&sheet).count(), 4 * 3);

    let strings = read_entry(&mut archive, "xl/sharedStrings.xml");
    for expected in ["id", "name", "active", "Ana", "Luis", "Marta"] {
        assert!(strings.contains(&format!(">{expected}<")), "missing {expected}");
    }
}

#[test]
fn test_header_row_is_frozen() {
    let (mut archive, _) = export(&["employees"]);
    let sheet = read_entry(&mut archive, "xl/worksheets/sheet1.xml");
    assert!(sheet.contains(r#"state="frozen""#));
}

#[test]
fn test_sheet_names_are_legal_and_unique() {
    let (mut archive, _) = export(&[
        "employees",
        "a sheet name that is clearly longer than thirty-one characters",
        "A SHEET NAME THAT IS CLEARLY LONGER THAN THIRTY-ONE CHARACTERS",
        "empty",
    ]);
    let workbook = read_entry(&mut archive, "xl/workbook.xml");

    let sheet_re = Regex::new(r#"<sheet name="([^"]*)""#).unwrap();
    let names: Vec<String> = sheet_re
        .captures_iter(&workbook)
        .map(|c| c[1].to_string())
        .collect();

    // The empty dataset gets no sheet.
    assert_eq!(names.len(), 3);
    for name in &names {
        assert!(name.chars().count() <= 31, "{name}");
    }
    let lower: std::collections::HashSet<String> =
        names.iter().map(|n| n.to_lowercase()).collect();
    assert_eq!(lower.len(), names.len());
}

#[test]
fn test_document_properties_carry_title_and_author() {
    let (mut archive, _) = export(&["employees"]);
    let core = read_entry(&mut archive, "docProps/core.xml");
    assert!(core.contains("<dc:title>Quarterly</dc:title>"));
    assert!(core.contains(&format!(
        "<dc:creator>{}</dc:creator>",
        ExportConfig::default().author
    )));
}
