//! Core domain types for epic status reporting.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Display value for work items without an assignee.
pub const UNASSIGNED: &str = "Unassigned";

/// `Display Name <user@example.com>` identity strings.
static IDENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(.*?)\s*<[^>]*>\s*$").expect("valid identity regex"));

/// Reduce an API identity string to a display name.
///
/// `Jane Doe <jane@example.com>` becomes `Jane Doe`; empty or missing values
/// become [`UNASSIGNED`].
pub fn normalize_assignee(raw: Option<&str>) -> String {
    let raw = raw.map(str::trim).unwrap_or_default();
    let name = match IDENTITY_RE.captures(raw) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or_default(),
        None => raw,
    };
    if name.is_empty() {
        UNASSIGNED.to_string()
    } else {
        name.to_string()
    }
}

// ---------------------------------------------------------------------------
// EpicState
// ---------------------------------------------------------------------------

/// Lifecycle state of an epic as reported by the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum EpicState {
    Active,
    Committed,
    New,
    Removed,
    /// Any state outside the four above, kept verbatim for display.
    Other(String),
}

impl EpicState {
    /// Parse a tracker state string (case-insensitive).
    ///
    /// A missing state maps to `Other("Unknown")`.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Self::Other("Unknown".into());
        };
        match raw.to_ascii_lowercase().as_str() {
            "active" => Self::Active,
            "committed" => Self::Committed,
            "new" => Self::New,
            "removed" => Self::Removed,
            _ => Self::Other(raw.to_string()),
        }
    }

    /// Whether the state was one of the enumerated tracker states.
    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "Active",
            Self::Committed => "Committed",
            Self::New => "New",
            Self::Removed => "Removed",
            Self::Other(s) => s,
        }
    }
}

impl std::fmt::Display for EpicState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for EpicState {
    fn from(s: String) -> Self {
        Self::parse(Some(&s))
    }
}

impl From<EpicState> for String {
    fn from(state: EpicState) -> Self {
        state.as_str().to_string()
    }
}

// ---------------------------------------------------------------------------
// Epic / ChildItem
// ---------------------------------------------------------------------------

/// A task, story, bug or feature owned by exactly one epic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildItem {
    pub id: u64,
    pub title: String,
    /// Work item type (Task, User Story, Bug, Feature, ...).
    pub work_item_type: String,
    /// Raw tracker state; child states are displayed, never classified.
    pub state: String,
    /// Display name, or "Unassigned".
    pub assignee: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

/// A top-level tracked work item with its ordered child items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Epic {
    pub id: u64,
    pub title: String,
    pub state: EpicState,
    /// Display name, or "Unassigned".
    pub assignee: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub children: Vec<ChildItem>,
}

impl Epic {
    /// Split a tracker tag string (`"a; b;c"`) into a tag set.
    pub fn parse_tags(raw: &str) -> BTreeSet<String> {
        raw.split(';')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// EpicQuery
// ---------------------------------------------------------------------------

/// Selection passed to a work-item source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpicQuery {
    pub project: String,
    /// Area path, e.g. `One\CloudInit`.
    pub area_path: String,
    /// Iteration path, e.g. `One\Bromine`.
    pub iteration_path: String,
}
