use crate::state::{Item, ItemStatus, Job};

/// Read-only snapshot of a tracked job, handed to observers.
#[derive(Debug, Clone, PartialEq)]
pub struct JobView {
    pub job: Job,
    pub items: Vec<Item>,
    pub counts: ItemCounts,
}

impl JobView {
    pub fn overall_percent(&self) -> f64 {
        self.job.overall_progress_percent
    }

    pub fn item(&self, index: u32) -> Option<&Item> {
        self.items.iter().find(|item| item.index == index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ItemCounts {
    pub pending: usize,
    pub active: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl ItemCounts {
    pub(crate) fn tally<'a>(items: impl IntoIterator<Item = &'a Item>) -> Self {
        items.into_iter().fold(Self::default(), |mut counts, item| {
            match item.status {
                ItemStatus::Pending => counts.pending += 1,
                ItemStatus::Starting | ItemStatus::Downloading => counts.active += 1,
                ItemStatus::Completed => counts.completed += 1,
                ItemStatus::Error => counts.failed += 1,
                ItemStatus::Skipped => counts.skipped += 1,
            }
            counts
        })
    }

    pub fn total(&self) -> usize {
        self.pending + self.active + self.completed + self.failed + self.skipped
    }
}
