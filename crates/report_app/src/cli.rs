use std::path::PathBuf;

use clap::Parser;
use report_core::ExportFormat;

/// Export named datasets to XLSX, CSV or PDF.
#[derive(Debug, Parser)]
#[command(name = "report-export", version, about)]
pub struct Cli {
    /// JSON file mapping dataset names to arrays of records.
    #[arg(long, value_name = "FILE")]
    pub datasets: PathBuf,

    /// Report title, used for the cover page and file names.
    #[arg(long)]
    pub title: String,

    /// Output format: excel (or xlsx), csv, pdf.
    #[arg(long)]
    pub format: ExportFormat,

    /// Dataset to include; repeat for several. Defaults to every dataset.
    #[arg(long = "select", value_name = "NAME")]
    pub select: Vec<String>,

    /// Pre-rendered chart to embed in PDF output, as `id=title=path`.
    #[arg(long = "chart", value_name = "ID=TITLE=PATH", value_parser = parse_chart)]
    pub charts: Vec<ChartArg>,

    /// Directory the files are written to.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub out: PathBuf,

    /// Config file; defaults to ~/.report_export/config.json.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartArg {
    pub id: String,
    pub title: String,
    pub path: PathBuf,
}

pub fn parse_chart(raw: &str) -> Result<ChartArg, String> {
    let mut parts = raw.splitn(3, '=');
    let (Some(id), Some(title), Some(path)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format!("expected ID=TITLE=PATH, got '{raw}'"));
    };
    if id.trim().is_empty() || path.trim().is_empty() {
        return Err(format!("chart id and path must not be empty in '{raw}'"));
    }
    Ok(ChartArg {
        id: id.trim().to_string(),
        title: title.trim().to_string(),
        path: PathBuf::from(path.trim()),
    })
}
