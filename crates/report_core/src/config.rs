use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Interactive controls hidden before a whole-subtree rasterization.
pub const DEFAULT_HIDDEN_SELECTORS: [&str; 6] = [
    "input",
    "button",
    "select",
    "textarea",
    ".legend-checkbox",
    ".chart-legend-controls",
];

/// Export configuration stored at `~/.report_export/config.json`.
///
/// Every field has a default, so a partial file only overrides what it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    // Document metadata
    pub author: String,
    pub subject: String,

    // CSV
    pub csv_delimiter: char,

    // Workbook
    /// Header row fill as `0xRRGGBB`.
    pub sheet_header_color: u32,

    // Paginated document
    pub labels: DocumentLabels,
    pub layout: PageLayout,

    // Capture
    pub capture_scale: f32,
    pub hidden_selectors: Vec<String>,

    // General
    pub log_level: String,
}

/// User-visible strings of the paginated document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentLabels {
    pub generated_on: String,
    pub contents: String,
    pub charts: String,
    pub records: String,
    /// `{page}` and `{total}` are substituted on every page.
    pub footer: String,
    pub date_format: String,
}

/// Page geometry and typography of the paginated document, in points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageLayout {
    pub margin: f64,
    /// Distance from the page bottom that content must never cross.
    pub bottom_safe_margin: f64,
    pub row_height: f64,
    pub header_band_height: f64,
    pub title_font_size: f64,
    pub section_font_size: f64,
    pub table_font_size: f64,
    pub footer_font_size: f64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            author: "Report Export".into(),
            subject: "Data export".into(),
            csv_delimiter: ',',
            sheet_header_color: 0x1F4E79,
            labels: DocumentLabels::default(),
            layout: PageLayout::default(),
            capture_scale: 2.0,
            hidden_selectors: DEFAULT_HIDDEN_SELECTORS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            log_level: "info".into(),
        }
    }
}

impl Default for DocumentLabels {
    fn default() -> Self {
        Self {
            generated_on: "Generado el".into(),
            contents: "Contenido".into(),
            charts: "Gráficos".into(),
            records: "registros".into(),
            footer: "página {page} de {total}".into(),
            date_format: "%d/%m/%Y %H:%M".into(),
        }
    }
}

impl DocumentLabels {
    pub fn footer_text(&self, page: usize, total: usize) -> String {
        self.footer
            .replace("{page}", &page.to_string())
            .replace("{total}", &total.to_string())
    }
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            margin: 40.0,
            bottom_safe_margin: 60.0,
            row_height: 18.0,
            header_band_height: 26.0,
            title_font_size: 26.0,
            section_font_size: 13.0,
            table_font_size: 9.0,
            footer_font_size: 9.0,
        }
    }
}

impl ExportConfig {
    /// Returns the base config directory: `~/.report_export/`
    pub fn base_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".report_export"))
    }

    /// Returns the config file path: `~/.report_export/config.json`
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("config.json"))
    }

    /// Returns the logs directory: `~/.report_export/logs/`
    pub fn logs_dir() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("logs"))
    }

    /// Load from the default location, falling back to defaults if absent.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load from `path`. A missing file yields defaults; a malformed one is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        info!("Loaded export config from {}", path.display());
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    pub fn hidden_selectors(&self) -> Vec<&str> {
        self.hidden_selectors.iter().map(String::as_str).collect()
    }
}
