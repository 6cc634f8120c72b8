use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracker_core::{expire, reconcile, Effect, JobId, JobView, ProgressStore};
use tracker_logging::{tracker_info, tracker_trace, tracker_warn};

use crate::poll::PollChannel;
use crate::push::{PushChannel, PushConnector, WsPushConnector};
use crate::runner::{HttpJobRunner, JobRunner};
use crate::settings::{ConfigError, TrackerSettings};
use crate::sink::{ChannelUpdateSink, UpdateSink};
use crate::types::{ChannelError, Delivery, JobStartError, StartRequest, TrackerPhase};

const TIMEOUT_MESSAGE: &str = "tracking timed out";

/// Tracks one job at a time over both channels.
///
/// `start` asks the runner for a job and opens the push and poll channels;
/// every update flows through a single session task that owns the
/// [`ProgressStore`] and publishes [`JobView`] snapshots. Reaching a terminal
/// status, calling [`JobTracker::stop`], or dropping the tracker tears both
/// channels down.
pub struct JobTracker {
    settings: TrackerSettings,
    runner: Arc<dyn JobRunner>,
    push: Arc<dyn PushConnector>,
    phase: TrackerPhase,
    session: Option<Session>,
}

impl JobTracker {
    /// Fails on settings the channels cannot run with, such as a zero poll interval.
    pub fn new(
        settings: TrackerSettings,
        runner: Arc<dyn JobRunner>,
        push: Arc<dyn PushConnector>,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self {
            settings,
            runner,
            push,
            phase: TrackerPhase::Idle,
            session: None,
        })
    }

    /// Tracker wired to the HTTP runner and the WebSocket push channel.
    pub fn connect(settings: TrackerSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        let runner = Arc::new(HttpJobRunner::new(&settings)?);
        let push = Arc::new(WsPushConnector::new(&settings)?);
        Self::new(settings, runner, push)
    }

    pub async fn start(&mut self, request: StartRequest) -> Result<JobId, JobStartError> {
        if self.session.is_some() {
            tracker_info!("releasing previous job before starting a new one");
            self.stop();
            self.session = None;
        }

        self.phase = TrackerPhase::Starting;
        tracker_info!("starting {:?} job for {}", request.kind, request.source_url);
        let job_id = match self.runner.start_job(&request).await {
            Ok(job_id) => job_id,
            Err(err) => {
                tracker_warn!("job start failed: {}", err);
                self.phase = TrackerPhase::Idle;
                return Err(err);
            }
        };

        let store = ProgressStore::new(job_id.clone(), request.kind);
        self.session = Some(Session::open(
            store,
            Arc::clone(&self.runner),
            Arc::clone(&self.push),
            &self.settings,
        ));
        self.phase = TrackerPhase::Tracking;
        tracker_info!(job = job_id; "tracking");
        Ok(job_id)
    }

    /// Tears down both channels and the session. Safe to call repeatedly.
    pub fn stop(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !session.is_stopped() {
            tracker_info!(job = session.job_id; "stopping");
        }
        session.stop();
        self.phase = TrackerPhase::Terminal;
    }

    /// Stops tracking, then asks the runner to cancel the job.
    pub async fn cancel_remote(&mut self) -> Result<(), ChannelError> {
        let Some(job_id) = self.job_id() else {
            return Ok(());
        };
        self.stop();
        tracker_info!(job = job_id; "cancelling job on the runner");
        self.runner.cancel_job(&job_id).await
    }

    pub fn phase(&self) -> TrackerPhase {
        match &self.session {
            Some(session) if session.is_stopped() => TrackerPhase::Terminal,
            _ => self.phase,
        }
    }

    pub fn job_id(&self) -> Option<JobId> {
        self.session.as_ref().map(|session| session.job_id.clone())
    }

    /// Latest snapshot of the tracked job, if one was started.
    pub fn view(&self) -> Option<JobView> {
        self.session
            .as_ref()
            .map(|session| session.view_rx.borrow().clone())
    }

    pub fn subscribe(&self) -> Option<watch::Receiver<JobView>> {
        self.session.as_ref().map(|session| session.view_rx.clone())
    }

    /// Waits until the job reaches a terminal status or tracking is stopped,
    /// returning the final snapshot.
    pub async fn wait_terminal(&self) -> Option<JobView> {
        let session = self.session.as_ref()?;
        let mut view_rx = session.view_rx.clone();
        let token = session.token.clone();

        let terminal = tokio::select! {
            biased;
            result = view_rx.wait_for(|view| view.job.status.is_terminal()) => {
                result.ok().map(|view| view.clone())
            }
            _ = token.cancelled() => None,
        };
        Some(terminal.unwrap_or_else(|| view_rx.borrow().clone()))
    }
}

impl Drop for JobTracker {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Session {
    job_id: JobId,
    token: CancellationToken,
    push: PushChannel,
    poll: PollChannel,
    task: Option<JoinHandle<()>>,
    view_rx: watch::Receiver<JobView>,
}

impl Session {
    fn open(
        store: ProgressStore,
        runner: Arc<dyn JobRunner>,
        push: Arc<dyn PushConnector>,
        settings: &TrackerSettings,
    ) -> Self {
        let job_id = store.job().id.clone();
        let token = CancellationToken::new();
        let (view_tx, view_rx) = watch::channel(store.view());
        let (tx, rx) = mpsc::unbounded_channel();
        let sink: Arc<dyn UpdateSink> = Arc::new(ChannelUpdateSink::new(tx));

        let task = tokio::spawn(run_session(
            store,
            rx,
            view_tx,
            token.clone(),
            settings.job_timeout,
        ));
        let push = PushChannel::open(push, job_id.clone(), Arc::clone(&sink), &token);
        let poll = PollChannel::start(runner, job_id.clone(), settings.poll_interval, sink, &token);

        Self {
            job_id,
            token,
            push,
            poll,
            task: Some(task),
            view_rx,
        }
    }

    fn stop(&mut self) {
        self.token.cancel();
        self.push.stop();
        self.poll.stop();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }
}

enum SessionEvent {
    Cancelled,
    TimedOut,
    Update(Delivery),
    Closed,
}

async fn run_session(
    mut store: ProgressStore,
    mut rx: mpsc::UnboundedReceiver<Delivery>,
    view_tx: watch::Sender<JobView>,
    token: CancellationToken,
    job_timeout: Option<Duration>,
) {
    let job_id = store.job().id.clone();
    let deadline = tokio::time::sleep(job_timeout.unwrap_or_default());
    tokio::pin!(deadline);
    let mut deadline_armed = job_timeout.is_some();

    loop {
        let event = tokio::select! {
            biased;
            _ = token.cancelled() => SessionEvent::Cancelled,
            _ = &mut deadline, if deadline_armed => {
                deadline_armed = false;
                SessionEvent::TimedOut
            }
            delivery = rx.recv() => match delivery {
                Some(delivery) => SessionEvent::Update(delivery),
                None => SessionEvent::Closed,
            },
        };

        let effects = match event {
            SessionEvent::Cancelled | SessionEvent::Closed => break,
            SessionEvent::TimedOut => {
                let (next, effects) = expire(store, TIMEOUT_MESSAGE);
                store = next;
                effects
            }
            SessionEvent::Update(delivery) => {
                tracker_trace!(job = job_id; "{} update via {}", delivery.update.kind_name(), delivery.source);
                let (next, effects) = reconcile(store, delivery.update);
                store = next;
                effects
            }
        };

        if store.consume_dirty() {
            view_tx.send_replace(store.view());
        }
        for effect in effects {
            match effect {
                Effect::StopChannels { reason } => {
                    tracker_info!(job = job_id; "terminal ({:?}), stopping channels", reason);
                    token.cancel();
                }
            }
        }
    }
    tracker_trace!(job = job_id; "session ended");
}
