use serde::Deserialize;
use serde_json::Value;
use tracker_core::{JobId, JobKind};
use url::Url;

use crate::settings::{ConfigError, TrackerSettings};
use crate::types::{ChannelError, FailureKind, JobStartError, StartRequest};

/// External job runner: starts jobs, reports their status, cancels them.
#[async_trait::async_trait]
pub trait JobRunner: Send + Sync {
    async fn start_job(&self, request: &StartRequest) -> Result<JobId, JobStartError>;

    /// One poll of the job's current status, in the push message shape.
    async fn poll_status(&self, job_id: &JobId) -> Result<Value, ChannelError>;

    async fn cancel_job(&self, job_id: &JobId) -> Result<(), ChannelError>;
}

#[derive(Debug, Deserialize)]
struct StartResponse {
    #[serde(rename = "downloadId", alias = "jobId")]
    job_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// REST client for the job runner's `download/*` resources.
#[derive(Debug, Clone)]
pub struct HttpJobRunner {
    client: reqwest::Client,
    base: Url,
}

impl HttpJobRunner {
    pub fn new(settings: &TrackerSettings) -> Result<Self, ConfigError> {
        let base = settings.api_base()?;
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ConfigError::Client(err.to_string()))?;
        Ok(Self { client, base })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ChannelError> {
        self.base
            .join(path)
            .map_err(|err| ChannelError::new(FailureKind::InvalidUrl, err.to_string()))
    }

    /// `{base}/{prefix}/{job_id}` with the id escaped as a single path segment.
    fn job_endpoint(&self, prefix: &str, job_id: &JobId) -> Result<Url, ChannelError> {
        let mut url = self.endpoint(prefix)?;
        url.path_segments_mut()
            .map_err(|_| ChannelError::new(FailureKind::InvalidUrl, "api base cannot hold paths"))?
            .pop_if_empty()
            .push(job_id.as_str());
        Ok(url)
    }
}

#[async_trait::async_trait]
impl JobRunner for HttpJobRunner {
    async fn start_job(&self, request: &StartRequest) -> Result<JobId, JobStartError> {
        request.validate()?;
        let path = match request.kind {
            JobKind::Single => "download/video",
            JobKind::Playlist => "download/playlist",
        };
        let url = self.endpoint(path)?;

        let response = self
            .client
            .post(url)
            .json(&request.body())
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error)
                .unwrap_or_else(|| status.to_string());
            return Err(JobStartError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: StartResponse = response.json().await.map_err(map_reqwest_error)?;
        match body.job_id {
            Some(id) if !id.trim().is_empty() => Ok(JobId::new(id)),
            _ => Err(JobStartError::MissingJobId),
        }
    }

    async fn poll_status(&self, job_id: &JobId) -> Result<Value, ChannelError> {
        let url = self.job_endpoint("download/progress/", job_id)?;
        let response = self.client.get(url).send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChannelError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }
        response.json::<Value>().await.map_err(map_reqwest_error)
    }

    async fn cancel_job(&self, job_id: &JobId) -> Result<(), ChannelError> {
        let url = self.job_endpoint("download/cancel/", job_id)?;
        let response = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChannelError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }
        Ok(())
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ChannelError {
    if err.is_timeout() {
        return ChannelError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_connect() {
        return ChannelError::new(FailureKind::Connect, err.to_string());
    }
    if err.is_decode() {
        return ChannelError::new(FailureKind::Decode, err.to_string());
    }
    ChannelError::new(FailureKind::Network, err.to_string())
}
