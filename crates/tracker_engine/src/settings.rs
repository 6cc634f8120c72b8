use std::time::Duration;

use url::Url;

/// Poll period used when nothing else is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerSettings {
    /// Base of the job runner's REST api, e.g. `http://localhost:3001/api/`.
    pub api_base_url: String,
    /// WebSocket endpoint of the push channel.
    pub push_url: String,
    pub poll_interval: Duration,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Give up on a job that reports nothing terminal for this long. Disabled by default.
    pub job_timeout: Option<Duration>,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3001/api/".to_string(),
            push_url: "ws://localhost:3001".to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            job_timeout: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {field}: {message}")]
    InvalidUrl { field: &'static str, message: String },
    #[error("poll interval must be greater than zero")]
    ZeroPollInterval,
    #[error("http client could not be built: {0}")]
    Client(String),
}

impl TrackerSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api_base()?;
        self.push_endpoint()?;
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }
        Ok(())
    }

    /// The api base with a trailing slash so relative joins append instead of replacing.
    pub(crate) fn api_base(&self) -> Result<Url, ConfigError> {
        let mut url = parse_url("api_base_url", &self.api_base_url, &["http", "https"])?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    pub(crate) fn push_endpoint(&self) -> Result<Url, ConfigError> {
        parse_url("push_url", &self.push_url, &["ws", "wss"])
    }
}

fn parse_url(field: &'static str, raw: &str, schemes: &[&str]) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|err| ConfigError::InvalidUrl {
        field,
        message: err.to_string(),
    })?;
    if !schemes.contains(&url.scheme()) {
        return Err(ConfigError::InvalidUrl {
            field,
            message: format!("unsupported scheme {}", url.scheme()),
        });
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{ConfigError, TrackerSettings};

    #[test]
    fn defaults_are_valid() {
        assert_eq!(TrackerSettings::default().validate(), Ok(()));
    }

    #[test]
    fn api_base_gains_trailing_slash() {
        let settings = TrackerSettings {
            api_base_url: "http://runner.local/api".to_string(),
            ..TrackerSettings::default()
        };
        let base = settings.api_base().unwrap();
        assert_eq!(base.join("download/video").unwrap().as_str(), "http://runner.local/api/download/video");
    }

    #[test]
    fn rejects_wrong_scheme_and_zero_interval() {
        let settings = TrackerSettings {
            push_url: "http://runner.local".to_string(),
            ..TrackerSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidUrl { field: "push_url", .. })
        ));

        let settings = TrackerSettings {
            poll_interval: Duration::ZERO,
            ..TrackerSettings::default()
        };
        assert_eq!(settings.validate(), Err(ConfigError::ZeroPollInterval));
    }
}
