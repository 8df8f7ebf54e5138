//! Partitioning of fetched epics into report buckets.
//!
//! Removed epics are dropped here and never reach later stages.

use serde::Serialize;
use tracing::{debug, instrument, warn};

use epicreport_shared::{Epic, EpicState};

/// Report grouping derived from an epic's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    ActiveCommitted,
    New,
    Other,
}

impl Bucket {
    /// Map a state to its bucket. `None` means the epic is dropped.
    pub fn for_state(state: &EpicState) -> Option<Self> {
        match state {
            EpicState::Active | EpicState::Committed => Some(Self::ActiveCommitted),
            EpicState::New => Some(Self::New),
            EpicState::Removed => None,
            EpicState::Other(_) => Some(Self::Other),
        }
    }
}

/// Counts reported in the executive summary and footer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BucketCounts {
    /// Non-removed epics.
    pub total: usize,
    pub active_committed: usize,
    pub new: usize,
    pub other: usize,
    /// Child items across all non-removed epics.
    pub child_items: usize,
    /// Removed epics that were dropped.
    pub removed: usize,
}

/// Output of [`classify`]. Each bucket keeps input order.
#[derive(Debug, Clone, Default)]
pub struct Classification {
    pub active_committed: Vec<Epic>,
    pub new: Vec<Epic>,
    pub other: Vec<Epic>,
    /// Removed epics dropped from the input.
    pub removed: usize,
    /// Diagnostics for epics with unrecognized states. Logged, never rendered.
    pub warnings: Vec<String>,
}

impl Classification {
    pub fn counts(&self) -> BucketCounts {
        BucketCounts {
            total: self.total(),
            active_committed: self.active_committed.len(),
            new: self.new.len(),
            other: self.other.len(),
            child_items: self.epics().map(|e| e.children.len()).sum(),
            removed: self.removed,
        }
    }

    /// Number of non-removed epics.
    pub fn total(&self) -> usize {
        self.active_committed.len() + self.new.len() + self.other.len()
    }

    pub fn bucket(&self, bucket: Bucket) -> &[Epic] {
        match bucket {
            Bucket::ActiveCommitted => &self.active_committed,
            Bucket::New => &self.new,
            Bucket::Other => &self.other,
        }
    }

    /// Every retained epic, bucket by bucket.
    pub fn epics(&self) -> impl Iterator<Item = &Epic> {
        self.active_committed
            .iter()
            .chain(self.new.iter())
            .chain(self.other.iter())
    }

    /// Per-state counts in the order states were first seen.
    pub fn state_distribution(&self) -> Vec<(String, usize)> {
        let mut dist: Vec<(String, usize)> = Vec::new();
        for epic in self.epics() {
            let name = epic.state.to_string();
            match dist.iter_mut().find(|(s, _)| *s == name) {
                Some((_, n)) => *n += 1,
                None => dist.push((name, 1)),
            }
        }
        dist
    }
}

/// Drop Removed epics and partition the rest into buckets.
#[instrument(skip_all, fields(input = epics.len()))]
pub fn classify(epics: Vec<Epic>) -> Classification {
    let mut out = Classification::default();

    for epic in epics {
        let Some(bucket) = Bucket::for_state(&epic.state) else {
            debug!(id = epic.id, "dropping removed epic");
            out.removed += 1;
            continue;
        };

        if !epic.state.is_recognized() {
            let message = format!(
                "epic #{} has unrecognized state '{}', listed under other states",
                epic.id, epic.state
            );
            warn!(id = epic.id, state = %epic.state, "unrecognized epic state");
            out.warnings.push(message);
        }

        match bucket {
            Bucket::ActiveCommitted => out.active_committed.push(epic),
            Bucket::New => out.new.push(epic),
            Bucket::Other => out.other.push(epic),
        }
    }

    debug!(
        active_committed = out.active_committed.len(),
        new = out.new.len(),
        other = out.other.len(),
        removed = out.removed,
        "classification complete"
    );

    out
}
