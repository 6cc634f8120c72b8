use tracker_logging::{tracker_debug, tracker_info, tracker_trace, tracker_warn};

use crate::effect::{Effect, TerminalReason};
use crate::msg::{CanonicalUpdate, InitUpdate, ItemBatch, ItemPatch, ScalarUpdate, TerminalUpdate};
use crate::state::{Item, ItemStatus, JobKind, JobStatus, ProgressStore, SINGLE_ITEM_INDEX};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Merge {
    Changed,
    Unchanged,
    Stale,
}

/// Applies one canonical update and returns the resulting store plus any effects.
///
/// Item updates only move forward through the item state machine; regressions
/// are dropped. Once the job is terminal the store no longer changes.
pub fn reconcile(mut store: ProgressStore, update: CanonicalUpdate) -> (ProgressStore, Vec<Effect>) {
    if store.is_terminal() {
        tracker_trace!(job = store.job().id; "ignoring {} update after terminal state", update.kind_name());
        return (store, Vec::new());
    }

    let effects = match update {
        CanonicalUpdate::Init(init) => {
            apply_init(&mut store, init);
            Vec::new()
        }
        CanonicalUpdate::Items(update) => {
            activate(&mut store);
            merge_batch(&mut store, &update.items);
            Vec::new()
        }
        CanonicalUpdate::Terminal(terminal) => apply_terminal(&mut store, terminal),
        CanonicalUpdate::Scalar(scalar) => apply_scalar(&mut store, scalar),
    };

    store.recompute_overall();
    (store, effects)
}

/// Fails a job that never reported a terminal state within the tracking deadline.
pub fn expire(mut store: ProgressStore, message: impl Into<String>) -> (ProgressStore, Vec<Effect>) {
    if store.is_terminal() {
        return (store, Vec::new());
    }
    let effects = fail_job(&mut store, message.into(), TerminalReason::TimedOut);
    store.recompute_overall();
    (store, effects)
}

fn activate(store: &mut ProgressStore) {
    if store.job().status == JobStatus::Pending {
        store.job_mut().status = JobStatus::Active;
        store.mark_dirty();
    }
}

fn apply_init(store: &mut ProgressStore, init: InitUpdate) {
    activate(store);

    let mut changed = false;
    {
        let job = store.job_mut();
        if init.title.is_some() && job.title != init.title {
            job.title = init.title;
            changed = true;
        }
        if init.total_items.is_some() && job.total_items != init.total_items {
            job.total_items = init.total_items;
            changed = true;
        }
    }
    if changed {
        store.mark_dirty();
    }

    // Items already seen are merged rather than replaced so a late init cannot regress them.
    merge_batch(store, &init.items);
}

fn apply_terminal(store: &mut ProgressStore, terminal: TerminalUpdate) -> Vec<Effect> {
    merge_batch(store, &terminal.items);
    complete_job(store)
}

/// Applies explicitly indexed entries first, then places the rest by media key.
fn merge_batch(store: &mut ProgressStore, batch: &ItemBatch) {
    for (index, patch) in &batch.indexed {
        if let Some(key) = patch.key.as_deref() {
            store.bind_key(key, *index);
        }
        merge_into(store, *index, patch);
    }
    for patch in &batch.unindexed {
        let Some(key) = patch.key.as_deref() else {
            tracker_warn!(job = store.job().id; "dropping item without index or key");
            continue;
        };
        match store.index_for_key(key) {
            Some(index) => {
                merge_into(store, index, patch);
            }
            None => {
                tracker_warn!(job = store.job().id; "no free index left for item {}", key);
            }
        }
    }
}

fn apply_scalar(store: &mut ProgressStore, scalar: ScalarUpdate) -> Vec<Effect> {
    activate(store);

    if store.job().kind == JobKind::Single {
        let status = scalar
            .status
            .or_else(|| (scalar.progress_percent > 0.0).then_some(ItemStatus::Downloading));
        if let Some(title) = scalar.title.as_deref() {
            if store.job().title.as_deref() != Some(title) {
                store.job_mut().title = Some(title.to_string());
                store.mark_dirty();
            }
        }
        let patch = ItemPatch {
            key: None,
            title: scalar.title.clone(),
            status,
            progress_percent: Some(scalar.progress_percent),
            error: scalar.error.clone(),
        };
        merge_into(store, SINGLE_ITEM_INDEX, &patch);
    }

    match scalar.status {
        Some(ItemStatus::Completed) => complete_job(store),
        Some(ItemStatus::Error) => {
            let message = scalar.error.unwrap_or_else(|| "job failed".to_string());
            fail_job(store, message, TerminalReason::Failed)
        }
        _ => Vec::new(),
    }
}

fn complete_job(store: &mut ProgressStore) -> Vec<Effect> {
    let unresolved: Vec<u32> = store
        .items()
        .filter(|item| !item.status.is_terminal())
        .map(|item| item.index)
        .collect();
    if !unresolved.is_empty() {
        tracker_debug!(job = store.job().id; "marking unresolved items {:?} as skipped", unresolved);
    }
    for index in unresolved {
        merge_into(store, index, &ItemPatch::status(ItemStatus::Skipped));
    }

    let job = store.job_mut();
    job.status = JobStatus::Completed;
    job.error = None;
    store.mark_dirty();
    tracker_info!(job = store.job().id; "job completed");

    vec![Effect::StopChannels {
        reason: TerminalReason::Completed,
    }]
}

fn fail_job(store: &mut ProgressStore, message: String, reason: TerminalReason) -> Vec<Effect> {
    tracker_warn!(job = store.job().id; "job failed: {}", message);
    let job = store.job_mut();
    job.status = JobStatus::Error;
    job.error = Some(message);
    store.mark_dirty();

    vec![Effect::StopChannels { reason }]
}

fn merge_into(store: &mut ProgressStore, index: u32, patch: &ItemPatch) -> Merge {
    let current = store.item(index).cloned();
    let outcome = match current {
        Some(current) => match merged(&current, patch) {
            None => Merge::Stale,
            Some(next) if next == current => Merge::Unchanged,
            Some(next) => {
                store.items_mut().insert(index, next);
                Merge::Changed
            }
        },
        None => {
            let base = Item::placeholder(index);
            let next = merged(&base, patch).unwrap_or(base);
            store.items_mut().insert(index, next);
            Merge::Changed
        }
    };

    match outcome {
        Merge::Changed => store.mark_dirty(),
        Merge::Stale => {
            tracker_debug!(job = store.job().id; "dropped stale update for item {}", index);
        }
        Merge::Unchanged => {}
    }
    outcome
}

/// The merged item, or `None` when the patch would move the item backwards.
fn merged(current: &Item, patch: &ItemPatch) -> Option<Item> {
    let status = patch.status.unwrap_or(current.status);
    if !current.status.can_advance_to(status) {
        return None;
    }

    let mut next = current.clone();
    if let Some(title) = patch.title.as_deref() {
        if !title.trim().is_empty() {
            next.title = title.to_string();
        }
    }
    if let Some(percent) = patch.progress_percent {
        let percent = clamp_percent(percent);
        next.progress_percent = if status == current.status {
            current.progress_percent.max(percent)
        } else {
            percent
        };
    }
    next.status = status;
    next.error = match status {
        ItemStatus::Error | ItemStatus::Skipped => {
            patch.error.clone().or_else(|| current.error.clone())
        }
        _ => None,
    };
    Some(next)
}

fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::{clamp_percent, merged};
    use crate::msg::ItemPatch;
    use crate::state::{Item, ItemStatus};

    #[test]
    fn clamp_handles_out_of_range_and_nan() {
        assert_eq!(clamp_percent(-3.0), 0.0);
        assert_eq!(clamp_percent(140.0), 100.0);
        assert_eq!(clamp_percent(f64::NAN), 0.0);
    }

    #[test]
    fn progress_never_decreases_while_downloading() {
        let current = Item {
            status: ItemStatus::Downloading,
            progress_percent: 60.0,
            ..Item::new(1, "a")
        };
        let next = merged(
            &current,
            &ItemPatch::status(ItemStatus::Downloading).with_progress(20.0),
        )
        .expect("same status is accepted");
        assert_eq!(next.progress_percent, 60.0);
    }

    #[test]
    fn error_message_cleared_when_not_in_error() {
        let current = Item::new(1, "a");
        let patch = ItemPatch::status(ItemStatus::Downloading).with_error("ignored");
        let next = merged(&current, &patch).expect("forward");
        assert_eq!(next.error, None);
    }

    #[test]
    fn regression_yields_none() {
        let current = Item {
            status: ItemStatus::Completed,
            ..Item::new(1, "a")
        };
        assert!(merged(&current, &ItemPatch::status(ItemStatus::Starting)).is_none());
    }
}
