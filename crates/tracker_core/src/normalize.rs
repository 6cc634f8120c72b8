//! Wire message normalization.
//!
//! Both channels deliver the same JSON shapes. Typed playlist messages carry
//! a `type` tag and a `videos` map keyed by the runner's media id; anything
//! else is the legacy single-job shape with a bare `progress` number.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracker_logging::tracker_warn;

use crate::msg::{
    CanonicalUpdate, InitUpdate, ItemBatch, ItemPatch, ItemsUpdate, ScalarUpdate, TerminalUpdate,
};
use crate::state::ItemStatus;

pub const TYPE_PLAYLIST_INIT: &str = "playlist_init";
pub const TYPE_VIDEO_UPDATE: &str = "video_update";
pub const TYPE_PLAYLIST_COMPLETE: &str = "playlist_complete";

const JOB_ID_KEYS: [&str; 2] = ["jobId", "downloadId"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    #[error("message is not valid json: {0}")]
    InvalidJson(String),
    #[error("message is not a json object")]
    NotAnObject,
}

#[derive(Debug, Default, Deserialize)]
struct WireItem {
    index: Option<u32>,
    title: Option<String>,
    status: Option<String>,
    progress: Option<f64>,
    error: Option<String>,
}

/// Parses a raw text frame into a JSON value.
pub fn parse_frame(text: &str) -> Result<Value, NormalizeError> {
    let value: Value =
        serde_json::from_str(text).map_err(|err| NormalizeError::InvalidJson(err.to_string()))?;
    if !value.is_object() {
        return Err(NormalizeError::NotAnObject);
    }
    Ok(value)
}

/// Job id a message is tagged with (`jobId`, or the runner's `downloadId`).
pub fn message_job_id(message: &Value) -> Option<&str> {
    JOB_ID_KEYS
        .iter()
        .find_map(|key| message.get(*key).and_then(Value::as_str))
}

/// Maps one wire message onto a canonical update.
pub fn normalize(message: &Value) -> Result<CanonicalUpdate, NormalizeError> {
    let object = message.as_object().ok_or(NormalizeError::NotAnObject)?;

    let update = match object.get("type").and_then(Value::as_str) {
        Some(TYPE_PLAYLIST_INIT) => CanonicalUpdate::Init(InitUpdate {
            total_items: first_u32(object, &["totalVideos", "totalItems"]),
            title: first_string(object, &["playlistTitle", "title"]),
            items: collect_batch(object, init_patch),
        }),
        Some(TYPE_VIDEO_UPDATE) => CanonicalUpdate::Items(ItemsUpdate {
            items: collect_batch(object, update_patch),
        }),
        Some(TYPE_PLAYLIST_COMPLETE) => CanonicalUpdate::Terminal(TerminalUpdate {
            items: collect_batch(object, update_patch),
        }),
        _ => CanonicalUpdate::Scalar(scalar(object)),
    };
    Ok(update)
}

fn scalar(object: &Map<String, Value>) -> ScalarUpdate {
    // A zero `progress` falls through to `videoProgress`, matching the runner's legacy shape.
    let progress = object
        .get("progress")
        .and_then(Value::as_f64)
        .filter(|p| *p != 0.0)
        .or_else(|| object.get("videoProgress").and_then(Value::as_f64))
        .unwrap_or(0.0);
    let status = object
        .get("status")
        .and_then(Value::as_str)
        .and_then(ItemStatus::from_wire);
    let title = object
        .get("metadata")
        .and_then(Value::as_object)
        .and_then(|metadata| first_string(metadata, &["title"]))
        .filter(|title| !title.trim().is_empty());
    ScalarUpdate {
        progress_percent: progress,
        title,
        status,
        error: first_string(object, &["error"]),
    }
}

/// Decodes the `videos` map, keeping each entry's media id as its key.
///
/// Entries with an explicit `index` are keyed by it; the rest are left for the
/// store to place by media id. Undecodable entries are skipped.
fn collect_batch(
    object: &Map<String, Value>,
    to_patch: fn(&str, WireItem) -> Option<ItemPatch>,
) -> ItemBatch {
    let mut batch = ItemBatch::default();
    let Some(videos) = object.get("videos").and_then(Value::as_object) else {
        return batch;
    };

    for (key, raw) in videos {
        let wire = match WireItem::deserialize(raw) {
            Ok(wire) => wire,
            Err(err) => {
                tracker_warn!("skipping undecodable item {}: {}", key, err);
                continue;
            }
        };
        let index = wire.index;
        let Some(patch) = to_patch(key, wire) else {
            continue;
        };
        match index {
            Some(index) => {
                batch.indexed.insert(index, patch);
            }
            None => batch.unindexed.push(patch),
        }
    }
    batch
}

/// Patch for a progress message; entries with an unknown status are dropped.
fn update_patch(key: &str, wire: WireItem) -> Option<ItemPatch> {
    let status = match wire.status.as_deref() {
        Some(raw) => match ItemStatus::from_wire(raw) {
            Some(status) => Some(status),
            None => {
                tracker_warn!("skipping item {} with unknown status {:?}", key, raw);
                return None;
            }
        },
        None => None,
    };
    Some(ItemPatch {
        key: Some(key.to_string()),
        title: wire.title,
        status,
        progress_percent: wire.progress,
        error: wire.error,
    })
}

/// Patch for an announced item; an unknown status announces it as pending.
fn init_patch(key: &str, wire: WireItem) -> Option<ItemPatch> {
    let status = wire
        .status
        .as_deref()
        .and_then(ItemStatus::from_wire)
        .unwrap_or_default();
    Some(ItemPatch {
        key: Some(key.to_string()),
        title: wire.title,
        status: Some(status),
        progress_percent: wire.progress,
        error: wire.error,
    })
}

fn first_string(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| object.get(*key).and_then(Value::as_str))
        .map(ToOwned::to_owned)
}

fn first_u32(object: &Map<String, Value>, keys: &[&str]) -> Option<u32> {
    keys.iter()
        .find_map(|key| object.get(*key).and_then(Value::as_u64))
        .and_then(|n| u32::try_from(n).ok())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{collect_batch, message_job_id, parse_frame, update_patch, NormalizeError};

    #[test]
    fn job_id_accepts_both_keys() {
        assert_eq!(message_job_id(&json!({"jobId": "a"})), Some("a"));
        assert_eq!(message_job_id(&json!({"downloadId": "b"})), Some("b"));
        assert_eq!(message_job_id(&json!({"progress": 3})), None);
    }

    #[test]
    fn non_object_frames_are_rejected() {
        assert_eq!(parse_frame("[1,2]"), Err(NormalizeError::NotAnObject));
        assert!(matches!(parse_frame("{oops"), Err(NormalizeError::InvalidJson(_))));
    }

    #[test]
    fn entries_without_index_keep_their_media_key() {
        let message = json!({
            "videos": {
                "a": {"index": 4, "status": "pending"},
                "b": {"status": "pending"},
                "c": {"status": "pending"}
            }
        });
        let batch = collect_batch(message.as_object().unwrap(), update_patch);
        assert_eq!(batch.indexed.get(&4).and_then(|p| p.key.as_deref()), Some("a"));
        let keys: Vec<_> = batch.unindexed.iter().map(|p| p.key.as_deref()).collect();
        assert_eq!(keys, vec![Some("b"), Some("c")]);
    }

    #[test]
    fn highest_explicit_index_does_not_overflow() {
        let message = json!({"type": "video_update",
                             "videos": {"a": {"index": u32::MAX}, "b": {}}});
        let batch = collect_batch(message.as_object().unwrap(), update_patch);
        assert_eq!(batch.len(), 2);
        assert!(batch.indexed.contains_key(&u32::MAX));
    }
}
