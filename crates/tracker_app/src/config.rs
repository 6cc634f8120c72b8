//! RON config file merged with command-line flags.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracker_engine::{Destination, StartRequest, TrackerSettings};

use crate::cli::Args;

/// Settings a config file may carry. Missing fields keep their defaults.
///
/// ```ron
/// (
///     api_base_url: "http://runner.local:3001/api/",
///     poll_interval_ms: 500,
///     job_timeout_secs: Some(3600),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub api_base_url: String,
    pub push_url: String,
    pub poll_interval_ms: u64,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub job_timeout_secs: Option<u64>,
    pub quality: String,
    pub save_to_library: bool,
}

impl Default for FileConfig {
    fn default() -> Self {
        let settings = TrackerSettings::default();
        Self {
            api_base_url: settings.api_base_url,
            push_url: settings.push_url,
            poll_interval_ms: u64::try_from(settings.poll_interval.as_millis()).unwrap_or(u64::MAX),
            connect_timeout_secs: settings.connect_timeout.as_secs(),
            request_timeout_secs: settings.request_timeout.as_secs(),
            job_timeout_secs: None,
            quality: "best".to_string(),
            save_to_library: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("could not read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse config file {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
}

pub fn load(path: &Path) -> Result<FileConfig, ConfigFileError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    ron::from_str(&content).map_err(|err| ConfigFileError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

/// Everything needed to start and track one job.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub settings: TrackerSettings,
    pub request: StartRequest,
}

/// Applies command-line flags on top of the file values.
pub fn resolve(args: &Args, file: FileConfig) -> RunConfig {
    let settings = TrackerSettings {
        api_base_url: args.api.clone().unwrap_or(file.api_base_url),
        push_url: args.push.clone().unwrap_or(file.push_url),
        poll_interval: Duration::from_millis(args.poll_ms.unwrap_or(file.poll_interval_ms)),
        connect_timeout: Duration::from_secs(file.connect_timeout_secs),
        request_timeout: Duration::from_secs(file.request_timeout_secs),
        job_timeout: args
            .timeout_secs
            .or(file.job_timeout_secs)
            .map(Duration::from_secs),
    };

    let request = if args.playlist {
        StartRequest::playlist(args.url.as_str())
    } else {
        StartRequest::single(args.url.as_str())
    };
    let destination = if args.temp_only || !file.save_to_library {
        Destination::TempFile
    } else {
        Destination::Library
    };
    let request = request
        .with_quality(args.quality.clone().unwrap_or(file.quality))
        .with_destination(destination);

    RunConfig { settings, request }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use clap::Parser;
    use tracker_core::JobKind;
    use tracker_engine::{Destination, TrackerSettings};

    use super::{load, resolve, ConfigFileError, FileConfig};
    use crate::cli::Args;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["tracker_app", "https://media.example/v/1"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).expect("valid args")
    }

    #[test]
    fn defaults_match_engine_defaults() {
        let run = resolve(&args(&[]), FileConfig::default());
        assert_eq!(run.settings, TrackerSettings::default());
        assert_eq!(run.request.kind, JobKind::Single);
        assert_eq!(run.request.quality, "best");
        assert_eq!(run.request.destination, Destination::Library);
    }

    #[test]
    fn file_values_are_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"(
                api_base_url: "http://runner.local/api/",
                poll_interval_ms: 250,
                job_timeout_secs: Some(90),
                save_to_library: false,
            )"#
        )
        .unwrap();

        let config = load(file.path()).unwrap();
        let run = resolve(&args(&["--playlist"]), config);
        assert_eq!(run.settings.api_base_url, "http://runner.local/api/");
        assert_eq!(run.settings.poll_interval, Duration::from_millis(250));
        assert_eq!(run.settings.job_timeout, Some(Duration::from_secs(90)));
        assert_eq!(run.settings.push_url, TrackerSettings::default().push_url);
        assert_eq!(run.request.kind, JobKind::Playlist);
        assert_eq!(run.request.destination, Destination::TempFile);
    }

    #[test]
    fn flags_override_file() {
        let config = FileConfig {
            api_base_url: "http://from-file/api/".to_string(),
            quality: "480p".to_string(),
            job_timeout_secs: Some(10),
            ..FileConfig::default()
        };
        let run = resolve(
            &args(&["--api", "http://from-flag/api/", "-q", "1080p", "--timeout-secs", "30", "--temp-only"]),
            config,
        );
        assert_eq!(run.settings.api_base_url, "http://from-flag/api/");
        assert_eq!(run.settings.job_timeout, Some(Duration::from_secs(30)));
        assert_eq!(run.request.quality, "1080p");
        assert_eq!(run.request.destination, Destination::TempFile);
    }

    #[test]
    fn unknown_fields_and_missing_files_are_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "(poll_every: 3)").unwrap();
        assert!(matches!(load(file.path()), Err(ConfigFileError::Parse { .. })));

        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.ron");
        assert!(matches!(load(&missing), Err(ConfigFileError::Read { .. })));
    }
}
