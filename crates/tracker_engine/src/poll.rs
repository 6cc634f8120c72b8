use std::sync::Arc;
use std::time::Duration;

use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracker_core::{normalize, JobId};
use tracker_logging::{tracker_debug, tracker_info, tracker_warn};

use crate::runner::JobRunner;
use crate::sink::UpdateSink;
use crate::types::{ChannelSource, Delivery};

/// Fixed-interval status polling for one job.
///
/// Every tick spawns its own request, so a slow response never delays the
/// next tick; responses are delivered in arrival order. Stopping aborts the
/// timer and every request still in flight.
pub struct PollChannel {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PollChannel {
    /// # Panics
    ///
    /// Panics if `period` is zero; [`crate::JobTracker::new`] rejects such settings.
    pub fn start(
        runner: Arc<dyn JobRunner>,
        job_id: JobId,
        period: Duration,
        sink: Arc<dyn UpdateSink>,
        parent: &CancellationToken,
    ) -> Self {
        let token = parent.child_token();
        let task = tokio::spawn(run_poll(runner, job_id, period, sink, token.clone()));
        Self {
            token,
            task: Some(task),
        }
    }

    pub fn stop(&mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            // Aborting drops the JoinSet, which aborts requests in flight.
            task.abort();
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for PollChannel {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_poll(
    runner: Arc<dyn JobRunner>,
    job_id: JobId,
    period: Duration,
    sink: Arc<dyn UpdateSink>,
    token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; the first poll waits one period.
    ticker.tick().await;

    tracker_info!(job = job_id; "poll channel started ({:?})", period);
    let mut in_flight = JoinSet::new();
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                in_flight.spawn(poll_once(
                    Arc::clone(&runner),
                    job_id.clone(),
                    Arc::clone(&sink),
                    token.clone(),
                ));
            }
            Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
        }
    }
    in_flight.abort_all();
    tracker_info!(job = job_id; "poll channel stopped");
}

async fn poll_once(
    runner: Arc<dyn JobRunner>,
    job_id: JobId,
    sink: Arc<dyn UpdateSink>,
    token: CancellationToken,
) {
    let response = match runner.poll_status(&job_id).await {
        Ok(response) => response,
        Err(err) => {
            tracker_warn!(job = job_id; "status poll failed: {}", err);
            return;
        }
    };
    if token.is_cancelled() {
        tracker_debug!(job = job_id; "discarding poll response after stop");
        return;
    }
    match normalize(&response) {
        Ok(update) => sink.deliver(Delivery::new(ChannelSource::Poll, update)),
        Err(err) => tracker_warn!(job = job_id; "ignoring poll response: {}", err),
    }
}
