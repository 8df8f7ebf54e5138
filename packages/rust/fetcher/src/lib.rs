//! Work-item sources for epic status reports.
//!
//! A [`WorkItemSource`] turns an [`EpicQuery`] (project, area path, iteration
//! path) into epic records with their child items. Two sources ship here:
//! - [`AzureDevOpsSource`]: live Azure DevOps Boards REST API
//! - [`SnapshotSource`]: a JSON snapshot of previously fetched work items

mod azure;
mod snapshot;
pub mod wire;

use std::future::Future;

use epicreport_shared::{Epic, EpicQuery, Result};

pub use azure::AzureDevOpsSource;
pub use snapshot::SnapshotSource;

/// Something that can deliver epics for a query.
///
/// Any failure must surface as an error; a source never returns a partial
/// result.
pub trait WorkItemSource {
    /// Human-readable description used in logs and the report header.
    fn describe(&self) -> String;

    /// Fetch all epics matching `query`, each with its child items.
    fn fetch_epics(&self, query: &EpicQuery) -> impl Future<Output = Result<Vec<Epic>>> + Send;
}
