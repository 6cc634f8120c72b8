//! Tracker core: pure progress store, wire normalization and reconciliation.
mod aggregate;
mod effect;
mod msg;
mod normalize;
mod reconcile;
mod state;
mod view_model;

pub use aggregate::overall_percent;
pub use effect::{Effect, TerminalReason};
pub use msg::{
    CanonicalUpdate, InitUpdate, ItemBatch, ItemPatch, ItemsUpdate, ScalarUpdate, TerminalUpdate,
};
pub use normalize::{
    message_job_id, normalize, parse_frame, NormalizeError, TYPE_PLAYLIST_COMPLETE,
    TYPE_PLAYLIST_INIT, TYPE_VIDEO_UPDATE,
};
pub use reconcile::{expire, reconcile};
pub use state::{
    Item, ItemStatus, Job, JobId, JobKind, JobStatus, ProgressStore, SINGLE_ITEM_INDEX,
};
pub use view_model::{ItemCounts, JobView};
