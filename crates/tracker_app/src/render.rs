use tracker_core::{Item, ItemStatus, JobKind, JobStatus, JobView};

/// One-line summary: overall percent, job status, item counts and title.
pub fn status_line(view: &JobView) -> String {
    let mut line = format!(
        "[{:>3.0}%] {}",
        view.overall_percent(),
        job_status_label(view.job.status)
    );

    if view.job.kind == JobKind::Playlist {
        let counts = view.counts;
        let total = view
            .job
            .total_items
            .map_or(counts.total(), |total| (total as usize).max(counts.total()));
        line.push_str(&format!(
            " | {}/{} done, {} failed, {} skipped, {} active",
            counts.completed, total, counts.failed, counts.skipped, counts.active
        ));
    }
    if let Some(title) = view.job.title.as_deref() {
        line.push_str(&format!(" | {title}"));
    }
    if let Some(error) = view.job.error.as_deref() {
        line.push_str(&format!(" | error: {error}"));
    }
    line
}

/// Items of `next` that are new or differ from `previous`.
pub fn changed_items<'a>(previous: Option<&JobView>, next: &'a JobView) -> Vec<&'a Item> {
    next.items
        .iter()
        .filter(|item| previous.and_then(|prev| prev.item(item.index)) != Some(*item))
        .collect()
}

pub fn item_line(item: &Item) -> String {
    let title = if item.title.is_empty() {
        "(untitled)"
    } else {
        item.title.as_str()
    };
    let mut line = format!("  #{:<3} {:<11} ", item.index, item_status_label(item.status));
    if item.status == ItemStatus::Downloading {
        line.push_str(&format!("{:>3.0}% ", item.progress_percent));
    }
    line.push_str(title);
    if let Some(error) = item.error.as_deref() {
        line.push_str(&format!(" ({error})"));
    }
    line
}

fn job_status_label(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Pending => "pending",
        JobStatus::Active => "active",
        JobStatus::Completed => "completed",
        JobStatus::Error => "error",
    }
}

fn item_status_label(status: ItemStatus) -> &'static str {
    match status {
        ItemStatus::Pending => "pending",
        ItemStatus::Starting => "starting",
        ItemStatus::Downloading => "downloading",
        ItemStatus::Completed => "completed",
        ItemStatus::Error => "error",
        ItemStatus::Skipped => "skipped",
    }
}

#[cfg(test)]
mod tests {
    use tracker_core::{
        reconcile, CanonicalUpdate, InitUpdate, ItemPatch, ItemStatus, ItemsUpdate, JobId, JobKind,
        JobView, ProgressStore,
    };

    use super::{changed_items, item_line, status_line};

    fn playlist_view() -> JobView {
        let store = ProgressStore::new(JobId::new("p"), JobKind::Playlist);
        let init = CanonicalUpdate::Init(InitUpdate {
            total_items: Some(3),
            title: Some("Mix".to_string()),
            items: [(1, "One"), (2, "Two"), (3, "Three")]
                .into_iter()
                .map(|(index, title)| (index, ItemPatch::status(ItemStatus::Pending).with_title(title)))
                .collect(),
        });
        let (store, _) = reconcile(store, init);
        let mut update = ItemsUpdate::default();
        update
            .items
            .indexed
            .insert(1, ItemPatch::status(ItemStatus::Completed).with_progress(100.0));
        update
            .items
            .indexed
            .insert(2, ItemPatch::status(ItemStatus::Downloading).with_progress(42.0));
        let (store, _) = reconcile(store, CanonicalUpdate::Items(update));
        store.view()
    }

    #[test]
    fn playlist_status_line_has_counts_and_title() {
        assert_eq!(
            status_line(&playlist_view()),
            "[ 33%] active | 1/3 done, 0 failed, 0 skipped, 1 active | Mix"
        );
    }

    #[test]
    fn only_changed_items_are_reported() {
        let view = playlist_view();
        assert_eq!(changed_items(None, &view).len(), 3);
        assert!(changed_items(Some(&view), &view).is_empty());
    }

    #[test]
    fn downloading_item_shows_percent() {
        let view = playlist_view();
        let line = item_line(view.item(2).unwrap());
        assert!(line.contains("downloading"));
        assert!(line.contains(" 42% Two"));
    }
}
