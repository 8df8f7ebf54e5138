//! Offline source reading a JSON snapshot of work items.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use epicreport_shared::{Epic, EpicQuery, ReportError, Result};

use crate::WorkItemSource;
use crate::wire::{RawWorkItem, SnapshotFile};

/// Source backed by a snapshot file (`{"epics": [...]}`).
///
/// The snapshot is taken to already be the result of the query, so the
/// selection is only logged, not applied.
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    path: PathBuf,
}

impl SnapshotSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decode snapshot content. Missing `System.ChangedDate` values fall back to `loaded_at`.
    pub fn parse(content: &str, loaded_at: DateTime<Utc>) -> Result<Vec<Epic>> {
        let file: SnapshotFile = serde_json::from_str(content)
            .map_err(|e| ReportError::parse(format!("invalid snapshot: {e}")))?;

        Ok(file
            .epics
            .into_iter()
            .map(|entry| {
                let children = entry
                    .children
                    .into_iter()
                    .map(RawWorkItem::into_child)
                    .collect();
                entry.item.into_epic(children, loaded_at)
            })
            .collect())
    }
}

impl WorkItemSource for SnapshotSource {
    fn describe(&self) -> String {
        format!("Snapshot ({})", self.path.display())
    }

    #[instrument(skip_all, fields(path = %self.path.display()))]
    async fn fetch_epics(&self, query: &EpicQuery) -> Result<Vec<Epic>> {
        debug!(area = %query.area_path, iteration = %query.iteration_path, "reading snapshot");

        // Unreadable or malformed snapshots are a failed fetch, like a dead API.
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            ReportError::source_unavailable(format!("{}: {e}", self.path.display()))
        })?;
        let epics = Self::parse(&content, Utc::now()).map_err(|e| {
            ReportError::source_unavailable(format!("{}: {e}", self.path.display()))
        })?;

        info!(count = epics.len(), "epics loaded from snapshot");
        Ok(epics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use epicreport_shared::EpicState;

    fn query() -> EpicQuery {
        EpicQuery {
            project: "One".into(),
            area_path: "One\\CloudInit".into(),
            iteration_path: "One\\Bromine".into(),
        }
    }

    #[tokio::test]
    async fn snapshot_fixture_loads() {
        let source = SnapshotSource::new(
            Path::new(env!("CARGO_MANIFEST_DIR"))
                .join("../../../fixtures/json/snapshot.fixture.json"),
        );
        let epics = source.fetch_epics(&query()).await.expect("load fixture");

        assert_eq!(epics.len(), 8);
        assert_eq!(epics[0].id, 24900549);
        assert_eq!(epics[0].assignee, "Christopher Patterson");
        assert_eq!(epics[0].children.len(), 2);
        assert!(epics.iter().any(|e| e.state == EpicState::Removed));
    }

    #[tokio::test]
    async fn missing_snapshot_is_source_unavailable() {
        let source = SnapshotSource::new("/nonexistent/epicreport/snapshot.json");
        let err = source.fetch_epics(&query()).await.unwrap_err();
        assert!(matches!(err, ReportError::SourceUnavailable { .. }));
    }

    #[test]
    fn parse_uses_load_time_when_changed_date_missing() {
        let loaded_at = Utc.with_ymd_and_hms(2025, 7, 1, 9, 0, 0).unwrap();
        let epics = SnapshotSource::parse(
            r#"{"epics":[{"id":1,"fields":{"System.Title":"X","System.State":"New"}}]}"#,
            loaded_at,
        )
        .unwrap();
        assert_eq!(epics[0].last_updated, loaded_at);
        assert!(epics[0].children.is_empty());
    }

    #[test]
    fn parse_rejects_malformed_json() {
        let err = SnapshotSource::parse("{\"epics\": 3}", Utc::now()).unwrap_err();
        assert!(err.to_string().contains("invalid snapshot"));
    }
}
