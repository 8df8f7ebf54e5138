//! Report renderers for epicreport.
//!
//! Turns a [`ReportModel`] into bytes in one of three formats:
//! - [`OutputFormat::Markdown`]: headings, paragraphs, bullets, pipe tables
//! - [`OutputFormat::Json`]: the model itself, pretty-printed
//! - [`OutputFormat::Word`]: a Flat OPC WordprocessingML package
//!
//! Rendering is a pure function of the model: the same model always yields
//! the same bytes.

pub mod json;
pub mod markdown;
pub mod word;

use serde::Serialize;
use tracing::{debug, instrument};

use epicreport_shared::{ReportError, ReportModel, Result};

pub use word::{DocumentBuilder, FlatOpcBuilder, WordLayout};

/// A supported output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Markdown,
    Json,
    Word,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 3] = [Self::Markdown, Self::Json, Self::Word];

    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Json => "json",
            Self::Word => "xml",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "md" | "markdown" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            "word" | "docx" | "xml" => Ok(Self::Word),
            other => Err(ReportError::validation(format!(
                "unsupported output format '{other}' (expected md, json, word or all)"
            ))),
        }
    }

    /// Parse a `--format` value; `all` selects every format.
    pub fn parse_selection(value: &str) -> Result<Vec<Self>> {
        if value.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::ALL.to_vec());
        }
        Ok(vec![Self::parse(value)?])
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Markdown => "markdown",
            Self::Json => "json",
            Self::Word => "word",
        })
    }
}

/// Render the model in the given format.
#[instrument(skip_all, fields(%format, sections = model.sections.len()))]
pub fn render(model: &ReportModel, format: OutputFormat) -> Result<Vec<u8>> {
    let bytes = match format {
        OutputFormat::Markdown => markdown::render(model).into_bytes(),
        OutputFormat::Json => json::render(model)?,
        OutputFormat::Word => word::render(model)?,
    };
    debug!(size = bytes.len(), "rendered report");
    Ok(bytes)
}
