use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::aggregate::overall_percent;
use crate::view_model::{ItemCounts, JobView};

/// Opaque job identifier assigned by the external job runner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Single,
    Playlist,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    Active,
    Completed,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }
}

/// Per-item state machine: `pending -> starting -> downloading -> {completed | error | skipped}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    #[default]
    Pending,
    Starting,
    Downloading,
    Completed,
    Error,
    Skipped,
}

impl ItemStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ItemStatus::Completed | ItemStatus::Error | ItemStatus::Skipped
        )
    }

    fn stage(self) -> u8 {
        match self {
            ItemStatus::Pending => 0,
            ItemStatus::Starting => 1,
            ItemStatus::Downloading => 2,
            ItemStatus::Completed | ItemStatus::Error | ItemStatus::Skipped => 3,
        }
    }

    /// True when moving from `self` to `next` is a forward (or identical) transition.
    ///
    /// Terminal statuses only accept themselves; `completed -> error` is a regression.
    pub fn can_advance_to(self, next: ItemStatus) -> bool {
        if self == next {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        next.stage() > self.stage()
    }

    /// Parses the status strings used on the wire. Unknown strings yield `None`.
    pub fn from_wire(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(ItemStatus::Pending),
            "starting" => Some(ItemStatus::Starting),
            "downloading" => Some(ItemStatus::Downloading),
            "completed" => Some(ItemStatus::Completed),
            "error" => Some(ItemStatus::Error),
            "skipped" => Some(ItemStatus::Skipped),
            _ => None,
        }
    }
}

/// One media unit within a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub index: u32,
    pub title: String,
    pub status: ItemStatus,
    pub progress_percent: f64,
    pub error: Option<String>,
}

impl Item {
    pub fn new(index: u32, title: impl Into<String>) -> Self {
        Self {
            index,
            title: title.into(),
            status: ItemStatus::Pending,
            progress_percent: 0.0,
            error: None,
        }
    }

    pub(crate) fn placeholder(index: u32) -> Self {
        Self::new(index, default_title(index))
    }
}

pub(crate) fn default_title(index: u32) -> String {
    format!("Item {index}")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub kind: JobKind,
    pub status: JobStatus,
    pub overall_progress_percent: f64,
    pub title: Option<String>,
    pub total_items: Option<u32>,
    pub error: Option<String>,
}

/// Index of the synthetic item every `single` job carries.
pub const SINGLE_ITEM_INDEX: u32 = 0;

/// Authoritative state for one tracked job.
///
/// Observers only get shared references or [`JobView`] snapshots; mutation
/// happens through [`crate::reconcile`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressStore {
    job: Job,
    items: BTreeMap<u32, Item>,
    /// Runner media id -> item index, fixed the first time the id is seen.
    keys: BTreeMap<String, u32>,
    dirty: bool,
}

impl ProgressStore {
    pub fn new(id: JobId, kind: JobKind) -> Self {
        let mut items = BTreeMap::new();
        if kind == JobKind::Single {
            items.insert(SINGLE_ITEM_INDEX, Item::new(SINGLE_ITEM_INDEX, ""));
        }
        Self {
            job: Job {
                id,
                kind,
                status: JobStatus::Pending,
                overall_progress_percent: 0.0,
                title: None,
                total_items: None,
                error: None,
            },
            items,
            keys: BTreeMap::new(),
            dirty: false,
        }
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    pub fn item(&self, index: u32) -> Option<&Item> {
        self.items.get(&index)
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn is_terminal(&self) -> bool {
        self.job.status.is_terminal()
    }

    /// Returns whether anything changed since the last call, clearing the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn view(&self) -> JobView {
        JobView {
            job: self.job.clone(),
            items: self.items.values().cloned().collect(),
            counts: ItemCounts::tally(self.items.values()),
        }
    }

    pub(crate) fn job_mut(&mut self) -> &mut Job {
        &mut self.job
    }

    pub(crate) fn items_mut(&mut self) -> &mut BTreeMap<u32, Item> {
        &mut self.items
    }

    /// Records that `key` names the item at `index`. An existing binding is kept.
    pub(crate) fn bind_key(&mut self, key: &str, index: u32) {
        if !self.keys.contains_key(key) {
            self.keys.insert(key.to_string(), index);
        }
    }

    /// Index for an item known only by its key, assigning the next free index
    /// on first sight. `None` when the index space is exhausted.
    pub(crate) fn index_for_key(&mut self, key: &str) -> Option<u32> {
        if let Some(index) = self.keys.get(key) {
            return Some(*index);
        }
        let highest = self
            .items
            .keys()
            .next_back()
            .copied()
            .max(self.keys.values().max().copied());
        let index = match highest {
            Some(highest) => highest.checked_add(1)?,
            None => 0,
        };
        self.keys.insert(key.to_string(), index);
        Some(index)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Re-derives the aggregate; called after every mutation.
    pub(crate) fn recompute_overall(&mut self) {
        let overall = overall_percent(self.job.kind, self.items.values());
        if overall != self.job.overall_progress_percent {
            self.job.overall_progress_percent = overall;
            self.dirty = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ItemStatus, JobId, JobKind, ProgressStore};

    #[test]
    fn key_indices_are_assigned_once_after_the_highest_known() {
        let mut store = ProgressStore::new(JobId::new("p"), JobKind::Playlist);
        store.bind_key("x", 4);
        assert_eq!(store.index_for_key("a"), Some(5));
        assert_eq!(store.index_for_key("b"), Some(6));
        assert_eq!(store.index_for_key("a"), Some(5));
        assert_eq!(store.index_for_key("x"), Some(4));

        store.bind_key("a", 9);
        assert_eq!(store.index_for_key("a"), Some(5));
    }

    #[test]
    fn key_index_space_exhaustion_yields_none() {
        let mut store = ProgressStore::new(JobId::new("p"), JobKind::Playlist);
        store.bind_key("last", u32::MAX);
        assert_eq!(store.index_for_key("next"), None);
        assert_eq!(store.index_for_key("last"), Some(u32::MAX));
    }

    #[test]
    fn forward_transitions_are_accepted() {
        assert!(ItemStatus::Pending.can_advance_to(ItemStatus::Starting));
        assert!(ItemStatus::Pending.can_advance_to(ItemStatus::Completed));
        assert!(ItemStatus::Starting.can_advance_to(ItemStatus::Downloading));
        assert!(ItemStatus::Downloading.can_advance_to(ItemStatus::Skipped));
        assert!(ItemStatus::Downloading.can_advance_to(ItemStatus::Downloading));
    }

    #[test]
    fn backward_and_cross_terminal_transitions_are_rejected() {
        assert!(!ItemStatus::Completed.can_advance_to(ItemStatus::Downloading));
        assert!(!ItemStatus::Downloading.can_advance_to(ItemStatus::Starting));
        assert!(!ItemStatus::Completed.can_advance_to(ItemStatus::Error));
        assert!(!ItemStatus::Skipped.can_advance_to(ItemStatus::Pending));
    }

    #[test]
    fn wire_status_parsing_is_case_insensitive() {
        assert_eq!(ItemStatus::from_wire("Completed"), Some(ItemStatus::Completed));
        assert_eq!(ItemStatus::from_wire(" error "), Some(ItemStatus::Error));
        assert_eq!(ItemStatus::from_wire("paused"), None);
    }
}
