use std::collections::BTreeMap;

use crate::state::{Item, ItemStatus};

/// Canonical update produced by the normalizer, independent of the channel that delivered it.
#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalUpdate {
    /// Playlist start: announces the title, the item count and the initial items.
    Init(InitUpdate),
    /// Partial snapshot of current item states.
    Items(ItemsUpdate),
    /// Final item snapshot; completes the job.
    Terminal(TerminalUpdate),
    /// Legacy single-job shape: one percentage plus an optional status.
    Scalar(ScalarUpdate),
}

impl CanonicalUpdate {
    pub fn kind_name(&self) -> &'static str {
        match self {
            CanonicalUpdate::Init(_) => "init",
            CanonicalUpdate::Items(_) => "items",
            CanonicalUpdate::Terminal(_) => "terminal",
            CanonicalUpdate::Scalar(_) => "scalar",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct InitUpdate {
    pub total_items: Option<u32>,
    pub title: Option<String>,
    pub items: ItemBatch,
}

/// Item patches carried by one message.
///
/// Entries without an explicit index are resolved through their runner key
/// when applied, so the same key always lands on the same item.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ItemBatch {
    pub indexed: BTreeMap<u32, ItemPatch>,
    pub unindexed: Vec<ItemPatch>,
}

impl ItemBatch {
    pub fn is_empty(&self) -> bool {
        self.indexed.is_empty() && self.unindexed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.indexed.len() + self.unindexed.len()
    }
}

impl FromIterator<(u32, ItemPatch)> for ItemBatch {
    fn from_iter<T: IntoIterator<Item = (u32, ItemPatch)>>(iter: T) -> Self {
        Self {
            indexed: iter.into_iter().collect(),
            unindexed: Vec::new(),
        }
    }
}

/// Fields of an item present in one message; `None` keeps the stored value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ItemPatch {
    /// The runner's media id for this item (the key of its `videos` entry).
    pub key: Option<String>,
    pub title: Option<String>,
    pub status: Option<ItemStatus>,
    pub progress_percent: Option<f64>,
    pub error: Option<String>,
}

impl ItemPatch {
    pub fn status(status: ItemStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_progress(mut self, percent: f64) -> Self {
        self.progress_percent = Some(percent);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }
}

impl From<&Item> for ItemPatch {
    fn from(item: &Item) -> Self {
        Self {
            key: None,
            title: Some(item.title.clone()),
            status: Some(item.status),
            progress_percent: Some(item.progress_percent),
            error: item.error.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ItemsUpdate {
    pub items: ItemBatch,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TerminalUpdate {
    pub items: ItemBatch,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScalarUpdate {
    pub progress_percent: f64,
    /// Media title from the status `metadata`, when the runner sends one.
    pub title: Option<String>,
    pub status: Option<ItemStatus>,
    pub error: Option<String>,
}
