// 🖼️ Summary Reporter - renders aggregate stats after a successful commit
//
// The engine only needs `render`; the query path reads the artifact back.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// How many names the summary lists
pub const TOP_N: usize = 5;

const ARTIFACT_FILE: &str = "summary.svg";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("summary artifact not generated yet")]
    NotFound,

    #[error("summary artifact I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// Aggregates handed to the reporter after each committed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshSummary {
    pub country_count: u64,
    /// Up to five names, fewer if fewer records exist
    pub top_five: Vec<String>,
    pub last_refresh: Option<DateTime<Utc>>,
}

pub trait SummaryReporter: Send + Sync {
    /// Render the artifact and return where it was written
    fn render(&self, summary: &RefreshSummary) -> Result<PathBuf, ReportError>;

    /// Read the last rendered artifact
    fn load(&self) -> Result<Vec<u8>, ReportError>;

    fn content_type(&self) -> &'static str;
}

// ============================================================================
// SVG RENDERER
// ============================================================================

/// Writes `summary.svg` into a cache directory.
#[derive(Debug, Clone)]
pub struct SvgSummaryRenderer {
    cache_dir: PathBuf,
}

impl SvgSummaryRenderer {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        SvgSummaryRenderer {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.cache_dir.join(ARTIFACT_FILE)
    }
}

impl SummaryReporter for SvgSummaryRenderer {
    fn render(&self, summary: &RefreshSummary) -> Result<PathBuf, ReportError> {
        std::fs::create_dir_all(&self.cache_dir)?;

        let path = self.artifact_path();
        let staging = path.with_extension("svg.tmp");

        // Write then rename so readers never see a half-written file
        std::fs::write(&staging, render_svg(summary))?;
        std::fs::rename(&staging, &path)?;

        Ok(path)
    }

    fn load(&self) -> Result<Vec<u8>, ReportError> {
        read_artifact(&self.artifact_path())
    }

    fn content_type(&self) -> &'static str {
        "image/svg+xml"
    }
}

fn read_artifact(path: &Path) -> Result<Vec<u8>, ReportError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(ReportError::NotFound),
        Err(e) => Err(ReportError::Io(e)),
    }
}

pub fn render_svg(summary: &RefreshSummary) -> String {
    let mut lines = vec![format!(
        "Total number of countries: {}",
        summary.country_count
    )];

    lines.push("Top 5 countries by estimated GDP:".to_string());
    if summary.top_five.is_empty() {
        lines.push("  (none)".to_string());
    }
    for (rank, name) in summary.top_five.iter().enumerate() {
        lines.push(format!("  {}. {}", rank + 1, name));
    }

    lines.push(format!(
        "Last refresh: {}",
        summary
            .last_refresh
            .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_else(|| "never".to_string())
    ));

    let height = 40 + lines.len() * 24;
    let mut svg = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"600\" height=\"{height}\" viewBox=\"0 0 600 {height}\">\n\
         <rect width=\"600\" height=\"{height}\" fill=\"#091b4d\"/>\n"
    );

    for (i, line) in lines.iter().enumerate() {
        svg.push_str(&format!(
            "<text x=\"16\" y=\"{}\" fill=\"#11a2e6\" font-family=\"Arial, sans-serif\" font-size=\"14\" xml:space=\"preserve\">{}</text>\n",
            32 + i * 24,
            escape_xml(line)
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
