//! The same message sequence delivered once per channel must converge to the
//! same store no matter how the two deliveries interleave.
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tracker_core::{
    normalize, reconcile, ItemStatus, JobId, JobKind, JobStatus, JobView, ProgressStore,
};

/// Every merge of two copies of `0..len` that keeps each copy in order.
fn interleavings(len: usize) -> Vec<Vec<usize>> {
    fn walk(push: usize, poll: usize, len: usize, prefix: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        if push == len && poll == len {
            out.push(prefix.clone());
            return;
        }
        if push < len {
            prefix.push(push);
            walk(push + 1, poll, len, prefix, out);
            prefix.pop();
        }
        if poll < len {
            prefix.push(poll);
            walk(push, poll + 1, len, prefix, out);
            prefix.pop();
        }
    }

    let mut out = Vec::new();
    walk(0, 0, len, &mut Vec::new(), &mut out);
    out
}

fn run(kind: JobKind, messages: &[Value], order: &[usize]) -> JobView {
    let mut store = ProgressStore::new(JobId::new("job"), kind);
    for &index in order {
        let update = normalize(&messages[index]).expect("normalizable");
        store = reconcile(store, update).0;
    }
    store.view()
}

fn video(index: u32, status: &str, progress: f64) -> Value {
    json!({"index": index, "title": format!("Video {index}"), "status": status, "progress": progress})
}

#[test]
fn interleaving_enumeration_is_complete() {
    // C(6, 3)
    assert_eq!(interleavings(3).len(), 20);
}

#[test]
fn playlist_sequence_converges_for_every_interleaving() {
    let messages = vec![
        json!({"type": "playlist_init", "totalVideos": 2, "playlistTitle": "Set",
               "videos": {"a": video(1, "pending", 0.0), "b": video(2, "pending", 0.0)}}),
        json!({"type": "video_update",
               "videos": {"a": video(1, "starting", 0.0), "b": video(2, "pending", 0.0)}}),
        json!({"type": "video_update",
               "videos": {"a": video(1, "downloading", 40.0), "b": video(2, "pending", 0.0)}}),
        json!({"type": "video_update",
               "videos": {"a": video(1, "completed", 100.0), "b": video(2, "starting", 0.0)}}),
        json!({"type": "video_update",
               "videos": {"a": video(1, "completed", 100.0),
                          "b": {"index": 2, "title": "Video 2", "status": "error", "progress": 0, "error": "gone"}}}),
        json!({"type": "playlist_complete", "totalVideos": 2,
               "videos": {"a": video(1, "completed", 100.0),
                          "b": {"index": 2, "title": "Video 2", "status": "error", "progress": 0, "error": "gone"}}}),
    ];

    let orders = interleavings(messages.len());
    let reference = run(JobKind::Playlist, &messages, &orders[0]);
    assert_eq!(reference.job.status, JobStatus::Completed);
    assert_eq!(reference.overall_percent(), 50.0);

    for order in &orders[1..] {
        assert_eq!(run(JobKind::Playlist, &messages, order), reference, "order {order:?}");
    }
}

#[test]
fn single_sequence_converges_for_every_interleaving() {
    let messages = vec![
        json!({"progress": 0, "status": "starting"}),
        json!({"progress": 20, "status": "downloading"}),
        json!({"progress": 45, "status": "downloading"}),
        json!({"progress": 100, "status": "completed"}),
    ];

    let orders = interleavings(messages.len());
    let reference = run(JobKind::Single, &messages, &orders[0]);
    assert_eq!(reference.job.status, JobStatus::Completed);
    assert_eq!(reference.overall_percent(), 100.0);

    for order in &orders[1..] {
        assert_eq!(run(JobKind::Single, &messages, order), reference, "order {order:?}");
    }
}

#[test]
fn non_terminal_prefix_converges_too() {
    // Without a terminal message the store stays open, so every field must agree.
    let messages = vec![
        json!({"type": "video_update", "videos": {"a": video(1, "downloading", 10.0)}}),
        json!({"type": "video_update", "videos": {"a": video(1, "downloading", 35.0)}}),
        json!({"type": "video_update", "videos": {"a": video(1, "downloading", 70.0), "b": video(2, "starting", 0.0)}}),
    ];

    let orders = interleavings(messages.len());
    let reference = run(JobKind::Playlist, &messages, &orders[0]);
    assert_eq!(reference.job.status, JobStatus::Active);
    assert_eq!(reference.item(1).unwrap().progress_percent, 70.0);

    for order in &orders[1..] {
        assert_eq!(run(JobKind::Playlist, &messages, order), reference, "order {order:?}");
    }
}

#[test]
fn entries_without_index_converge_on_the_same_slots() {
    let messages = vec![
        json!({"type": "video_update",
               "videos": {"a": {"title": "Alpha", "status": "downloading", "progress": 10}}}),
        json!({"type": "video_update",
               "videos": {"a": {"status": "downloading", "progress": 50},
                          "b": {"title": "Beta", "status": "starting"}}}),
        json!({"type": "video_update",
               "videos": {"b": {"status": "completed", "progress": 100},
                          "c": {"title": "Gamma", "status": "starting"}}}),
    ];

    let orders = interleavings(messages.len());
    let reference = run(JobKind::Playlist, &messages, &orders[0]);
    let slots: Vec<_> = reference
        .items
        .iter()
        .map(|item| (item.index, item.title.as_str(), item.status))
        .collect();
    assert_eq!(
        slots,
        vec![
            (0, "Alpha", ItemStatus::Downloading),
            (1, "Beta", ItemStatus::Completed),
            (2, "Gamma", ItemStatus::Starting),
        ]
    );

    for order in &orders[1..] {
        assert_eq!(run(JobKind::Playlist, &messages, order), reference, "order {order:?}");
    }
}
