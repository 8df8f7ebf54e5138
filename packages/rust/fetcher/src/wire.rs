//! Raw Azure DevOps work-item payloads and their conversion to domain types.
//!
//! The same shape is used by the REST API (`value[]` of a work-items batch
//! response) and by snapshot files, so both sources share one decoder.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use epicreport_shared::{ChildItem, Epic, EpicState, normalize_assignee};

/// Link type from a parent to its children.
pub(crate) const HIERARCHY_FORWARD: &str = "System.LinkTypes.Hierarchy-Forward";

/// A work item as returned by `_apis/wit/workitems`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawWorkItem {
    pub id: u64,
    #[serde(default)]
    pub fields: RawFields,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relations: Option<Vec<RawRelation>>,
}

/// The subset of `System.*` fields the report reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawFields {
    #[serde(rename = "System.Title", default)]
    pub title: Option<String>,
    #[serde(rename = "System.State", default)]
    pub state: Option<String>,
    #[serde(rename = "System.WorkItemType", default)]
    pub work_item_type: Option<String>,
    #[serde(rename = "System.AssignedTo", default)]
    pub assigned_to: Option<IdentityRef>,
    #[serde(rename = "System.Tags", default)]
    pub tags: Option<String>,
    #[serde(rename = "System.ChangedDate", default)]
    pub changed_date: Option<DateTime<Utc>>,
}

/// `System.AssignedTo` is a plain string in older payloads and an identity
/// object in current API versions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdentityRef {
    Display(String),
    Identity {
        #[serde(rename = "displayName", default)]
        display_name: Option<String>,
        #[serde(rename = "uniqueName", default)]
        unique_name: Option<String>,
    },
}

impl IdentityRef {
    fn display_name(&self) -> Option<&str> {
        match self {
            Self::Display(s) => Some(s),
            Self::Identity {
                display_name,
                unique_name,
            } => display_name.as_deref().or(unique_name.as_deref()),
        }
    }
}

/// A link on a work item (`$expand=relations`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRelation {
    pub rel: String,
    pub url: String,
}

/// A snapshot file: epics with their child items inlined.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotFile {
    pub epics: Vec<SnapshotEpic>,
}

/// One epic entry in a snapshot file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotEpic {
    #[serde(flatten)]
    pub item: RawWorkItem,
    #[serde(default)]
    pub children: Vec<RawWorkItem>,
}

impl RawWorkItem {
    /// Ids of hierarchy children, in relation order.
    pub fn child_ids(&self) -> Vec<u64> {
        self.relations
            .iter()
            .flatten()
            .filter(|r| r.rel == HIERARCHY_FORWARD)
            .filter_map(|r| r.url.rsplit('/').next()?.parse().ok())
            .collect()
    }

    fn assignee(&self) -> String {
        normalize_assignee(
            self.fields
                .assigned_to
                .as_ref()
                .and_then(IdentityRef::display_name),
        )
    }

    /// Convert into a child item record.
    pub fn into_child(self) -> ChildItem {
        let assignee = self.assignee();
        ChildItem {
            id: self.id,
            title: self.fields.title.unwrap_or_else(|| "Untitled".into()),
            work_item_type: self.fields.work_item_type.unwrap_or_else(|| "Item".into()),
            state: self.fields.state.unwrap_or_else(|| "Unknown".into()),
            assignee,
            last_updated: self.fields.changed_date,
        }
    }

    /// Convert into an epic record owning `children`.
    ///
    /// `fetched_at` stands in for `System.ChangedDate` when the payload omits it.
    pub fn into_epic(self, children: Vec<ChildItem>, fetched_at: DateTime<Utc>) -> Epic {
        let assignee = self.assignee();
        Epic {
            id: self.id,
            title: self.fields.title.unwrap_or_else(|| "Unknown Epic".into()),
            state: EpicState::parse(self.fields.state.as_deref()),
            assignee,
            tags: self
                .fields
                .tags
                .as_deref()
                .map(Epic::parse_tags)
                .unwrap_or_default(),
            last_updated: self.fields.changed_date.unwrap_or(fetched_at),
            children,
        }
    }
}
