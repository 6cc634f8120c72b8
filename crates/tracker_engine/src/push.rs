use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::BoxStream;
use futures_util::{future, SinkExt, StreamExt};
use serde_json::json;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_util::sync::CancellationToken;
use tracker_core::{message_job_id, normalize, parse_frame, JobId};
use tracker_logging::{tracker_info, tracker_trace, tracker_warn};
use url::Url;

use crate::settings::{ConfigError, TrackerSettings};
use crate::sink::UpdateSink;
use crate::types::{ChannelError, ChannelSource, Delivery, FailureKind};

/// Raw text frames received after subscribing.
pub type PushStream = BoxStream<'static, Result<String, ChannelError>>;

/// Opens the server-initiated message transport for one job.
#[async_trait::async_trait]
pub trait PushConnector: Send + Sync {
    /// Connects and subscribes to `job_id`.
    async fn connect(&self, job_id: &JobId) -> Result<PushStream, ChannelError>;
}

/// WebSocket push transport: one `subscribe` frame, then JSON text frames.
#[derive(Debug, Clone)]
pub struct WsPushConnector {
    url: Url,
    connect_timeout: Duration,
}

impl WsPushConnector {
    pub fn new(settings: &TrackerSettings) -> Result<Self, ConfigError> {
        Ok(Self {
            url: settings.push_endpoint()?,
            connect_timeout: settings.connect_timeout,
        })
    }
}

#[async_trait::async_trait]
impl PushConnector for WsPushConnector {
    async fn connect(&self, job_id: &JobId) -> Result<PushStream, ChannelError> {
        let connect = tokio_tungstenite::connect_async(self.url.as_str());
        let (mut ws, _) = tokio::time::timeout(self.connect_timeout, connect)
            .await
            .map_err(|_| ChannelError::new(FailureKind::Timeout, "websocket connect timed out"))?
            .map_err(|err| ChannelError::new(FailureKind::Connect, err.to_string()))?;

        // `downloadId` is what the runner keys subscriptions on.
        let subscribe = json!({
            "type": "subscribe",
            "jobId": job_id.as_str(),
            "downloadId": job_id.as_str(),
        });
        ws.send(WsMessage::Text(subscribe.to_string().into()))
            .await
            .map_err(|err| ChannelError::new(FailureKind::Network, err.to_string()))?;

        let frames = ws
            .take_while(|frame| future::ready(!matches!(frame, Ok(WsMessage::Close(_)))))
            .filter_map(|frame| {
                future::ready(match frame {
                    Ok(WsMessage::Text(text)) => Some(Ok(text.as_str().to_owned())),
                    Ok(_) => None,
                    Err(err) => Some(Err(ChannelError::new(FailureKind::Network, err.to_string()))),
                })
            });
        Ok(frames.boxed())
    }
}

/// Running push channel for one job. Stopping is idempotent and also happens on drop.
pub struct PushChannel {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PushChannel {
    pub fn open(
        connector: Arc<dyn PushConnector>,
        job_id: JobId,
        sink: Arc<dyn UpdateSink>,
        parent: &CancellationToken,
    ) -> Self {
        let token = parent.child_token();
        let task = tokio::spawn(run_push(connector, job_id, sink, token.clone()));
        Self {
            token,
            task: Some(task),
        }
    }

    pub fn stop(&mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for PushChannel {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_push(
    connector: Arc<dyn PushConnector>,
    job_id: JobId,
    sink: Arc<dyn UpdateSink>,
    token: CancellationToken,
) {
    let connected = tokio::select! {
        biased;
        _ = token.cancelled() => return,
        result = connector.connect(&job_id) => result,
    };
    let mut frames = match connected {
        Ok(frames) => {
            tracker_info!(job = job_id; "push channel open");
            frames
        }
        Err(err) => {
            // Not retried; polling carries the session from here.
            tracker_warn!(job = job_id; "push channel unavailable: {}", err);
            return;
        }
    };

    loop {
        let frame = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            frame = frames.next() => frame,
        };
        match frame {
            Some(Ok(text)) => forward_frame(&job_id, &text, sink.as_ref()),
            Some(Err(err)) => {
                tracker_warn!(job = job_id; "push channel failed: {}", err);
                return;
            }
            None => {
                tracker_info!(job = job_id; "push channel closed by server");
                return;
            }
        }
    }
    tracker_info!(job = job_id; "push channel stopped");
}

fn forward_frame(job_id: &JobId, text: &str, sink: &dyn UpdateSink) {
    let message = match parse_frame(text) {
        Ok(message) => message,
        Err(err) => {
            tracker_warn!(job = job_id; "ignoring push frame: {}", err);
            return;
        }
    };
    match message_job_id(&message) {
        Some(id) if id == job_id.as_str() => {}
        other => {
            tracker_trace!(job = job_id; "discarding push message for {:?}", other);
            return;
        }
    }
    match normalize(&message) {
        Ok(update) => sink.deliver(Delivery::new(ChannelSource::Push, update)),
        Err(err) => tracker_warn!(job = job_id; "ignoring push message: {}", err),
    }
}
