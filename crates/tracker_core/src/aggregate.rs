use crate::state::{Item, ItemStatus, JobKind};

/// Overall job percentage.
///
/// Playlists count completed items only, so partially downloaded items add
/// nothing until they finish. A single job mirrors its one item.
pub fn overall_percent<'a>(kind: JobKind, items: impl IntoIterator<Item = &'a Item>) -> f64 {
    match kind {
        JobKind::Single => items
            .into_iter()
            .next()
            .map(|item| item.progress_percent)
            .unwrap_or(0.0),
        JobKind::Playlist => {
            let (total, completed) = items.into_iter().fold((0usize, 0usize), |(t, c), item| {
                (t + 1, c + usize::from(item.status == ItemStatus::Completed))
            });
            if total == 0 {
                return 0.0;
            }
            (completed as f64 / total as f64 * 100.0).round()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::overall_percent;
    use crate::state::{Item, ItemStatus, JobKind};

    fn item(index: u32, status: ItemStatus, progress: f64) -> Item {
        Item {
            status,
            progress_percent: progress,
            ..Item::new(index, format!("Item {index}"))
        }
    }

    #[test]
    fn empty_playlist_is_zero() {
        assert_eq!(overall_percent(JobKind::Playlist, &[] as &[Item]), 0.0);
    }

    #[test]
    fn single_job_uses_item_progress() {
        let items = [item(0, ItemStatus::Downloading, 45.5)];
        assert_eq!(overall_percent(JobKind::Single, &items), 45.5);
    }

    #[test]
    fn playlist_rounds_half_up() {
        let items = [
            item(1, ItemStatus::Completed, 100.0),
            item(2, ItemStatus::Pending, 0.0),
            item(3, ItemStatus::Completed, 100.0),
            item(4, ItemStatus::Pending, 0.0),
            item(5, ItemStatus::Pending, 0.0),
            item(6, ItemStatus::Pending, 0.0),
            item(7, ItemStatus::Pending, 0.0),
            item(8, ItemStatus::Pending, 0.0),
        ];
        // 2 / 8 = 25.0
        assert_eq!(overall_percent(JobKind::Playlist, &items), 25.0);
    }
}
