//! The report document model handed from the report builder to renderers.
//!
//! A report is a flat, ordered list of sections. Nesting is expressed with
//! heading levels; every section carries exactly one content shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The terminal artifact of report assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportModel {
    /// Document title (also the heading of the header section).
    pub title: String,
    /// When the report was assembled.
    pub generated_at: DateTime<Utc>,
    /// Sections in render order.
    pub sections: Vec<Section>,
}

impl ReportModel {
    /// All sections of the given kind, in order.
    pub fn sections_of(&self, kind: SectionKind) -> impl Iterator<Item = &Section> {
        self.sections.iter().filter(move |s| s.kind == kind)
    }
}

/// What part of the fixed template a section belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Header,
    ExecutiveSummary,
    ActiveCommitted,
    /// Per-epic heading and details line inside the Active/Committed section.
    EpicDetail,
    KeyUpdates,
    ChildItems,
    NewEpics,
    OtherStates,
    Footer,
}

/// A heading plus one block of content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub kind: SectionKind,
    /// Heading level, 1 = document title.
    pub level: u8,
    pub heading: String,
    pub content: Content,
}

/// The three content shapes a section can hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Content {
    Prose(String),
    Bullets(Vec<String>),
    Table(Table),
}

/// Table layouts; renderers pick column widths by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    ChildItems,
    NewEpics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub kind: TableKind,
    pub columns: Vec<String>,
    pub rows: Vec<TableRow>,
}

/// A data row tagged with its zero-based position for alternating styles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub index: usize,
    pub cells: Vec<String>,
}

impl Table {
    /// Build a table, tagging each row with its index.
    pub fn new(kind: TableKind, columns: &[&str], rows: Vec<Vec<String>>) -> Self {
        Self {
            kind,
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
            rows: rows
                .into_iter()
                .enumerate()
                .map(|(index, cells)| TableRow { index, cells })
                .collect(),
        }
    }
}
