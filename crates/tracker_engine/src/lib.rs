//! Tracker engine: job runner client, push and poll channels, and the
//! lifecycle controller that feeds them into the core reconciliation.
mod poll;
mod push;
mod runner;
mod settings;
mod sink;
mod tracker;
mod types;

pub use poll::PollChannel;
pub use push::{PushChannel, PushConnector, PushStream, WsPushConnector};
pub use runner::{HttpJobRunner, JobRunner};
pub use settings::{ConfigError, TrackerSettings, DEFAULT_POLL_INTERVAL};
pub use sink::{ChannelUpdateSink, UpdateSink};
pub use tracker::JobTracker;
pub use types::{
    ChannelError, ChannelSource, Delivery, Destination, FailureKind, JobStartError, StartRequest,
    TrackerPhase,
};
