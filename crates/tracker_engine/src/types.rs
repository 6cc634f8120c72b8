use std::fmt;

use serde::Serialize;
use tracker_core::{CanonicalUpdate, JobKind};

/// Which transport delivered an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelSource {
    Push,
    Poll,
}

impl fmt::Display for ChannelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelSource::Push => write!(f, "push"),
            ChannelSource::Poll => write!(f, "poll"),
        }
    }
}

/// A canonical update tagged with the channel it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub source: ChannelSource,
    pub update: CanonicalUpdate,
}

impl Delivery {
    pub fn new(source: ChannelSource, update: CanonicalUpdate) -> Self {
        Self { source, update }
    }
}

/// Where the external runner should keep the fetched media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Destination {
    #[default]
    Library,
    TempFile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartRequest {
    pub source_url: String,
    pub kind: JobKind,
    pub quality: String,
    pub destination: Destination,
}

impl StartRequest {
    pub fn single(source_url: impl Into<String>) -> Self {
        Self::new(source_url, JobKind::Single)
    }

    pub fn playlist(source_url: impl Into<String>) -> Self {
        Self::new(source_url, JobKind::Playlist)
    }

    fn new(source_url: impl Into<String>, kind: JobKind) -> Self {
        Self {
            source_url: source_url.into(),
            kind,
            quality: "best".to_string(),
            destination: Destination::default(),
        }
    }

    pub fn with_quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = quality.into();
        self
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), JobStartError> {
        if self.source_url.trim().is_empty() {
            return Err(JobStartError::InvalidRequest("source url is empty".into()));
        }
        Ok(())
    }

    pub(crate) fn body(&self) -> StartBody<'_> {
        StartBody {
            url: self.source_url.trim(),
            quality: &self.quality,
            save_to_library: self.destination == Destination::Library,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StartBody<'a> {
    pub url: &'a str,
    pub quality: &'a str,
    pub save_to_library: bool,
}

/// Lifecycle of one controller: `idle -> starting -> tracking -> terminal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackerPhase {
    #[default]
    Idle,
    Starting,
    Tracking,
    Terminal,
}

/// Non-fatal transport failure on either channel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ChannelError {
    pub kind: FailureKind,
    pub message: String,
}

impl ChannelError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    Connect,
    Timeout,
    HttpStatus(u16),
    Decode,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::Connect => write!(f, "connection failed"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Decode => write!(f, "undecodable response"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

/// The "start job" call failed; tracking never began.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobStartError {
    #[error("invalid start request: {0}")]
    InvalidRequest(String),
    #[error("job runner rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("job runner response did not contain a job id")]
    MissingJobId,
    #[error("job runner unreachable: {0}")]
    Transport(#[from] ChannelError),
}
