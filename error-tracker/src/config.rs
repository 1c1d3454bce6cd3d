use serde::Deserialize;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Listener and admin listener cannot share {0}")]
    ListenerConflict(String),

    #[error("Report path must start with '/': {0}")]
    InvalidPath(String),

    #[error("Empty app id")]
    EmptyAppId,

    #[error("Empty {0} in sink config")]
    EmptySinkField(&'static str),

    #[error("Sink timeout cannot be 0")]
    InvalidTimeout,
}

/// Error tracker configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Listener for error reports
    pub listener: Listener,
    /// Listener for health and readiness checks
    pub admin_listener: Listener,
    /// Path reports are sent to
    #[serde(default = "default_path")]
    pub path: String,
    /// Application identifier stamped on every forwarded event
    pub app_id: String,
    /// Where forwarded reports are written
    pub sink: SinkConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
}

fn default_path() -> String {
    "/r".into()
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;

        if self.listener == self.admin_listener {
            return Err(ValidationError::ListenerConflict(format!(
                "{}:{}",
                self.listener.host, self.listener.port
            )));
        }

        if !self.path.starts_with('/') {
            return Err(ValidationError::InvalidPath(self.path.clone()));
        }

        if self.app_id.is_empty() {
            return Err(ValidationError::EmptyAppId);
        }

        self.sink.validate()
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    pub host: String,
    pub port: u16,
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkConfig {
    /// Google Cloud Logging `entries:write` REST endpoint
    CloudLogging {
        /// Defaults to [`DEFAULT_CLOUD_LOGGING_ENDPOINT`]
        endpoint: Option<Url>,
        project_id: String,
        #[serde(default = "default_log_name")]
        log_name: String,
        /// Sent as `Authorization: Bearer <token>` when set
        bearer_token: Option<String>,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
    /// Log events through `tracing`, for local development
    Stdout,
}

pub const DEFAULT_CLOUD_LOGGING_ENDPOINT: &str = "https://logging.googleapis.com/v2/entries:write";

fn default_log_name() -> String {
    "javascript.errors".into()
}

fn default_timeout_secs() -> u64 {
    10
}

impl SinkConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            SinkConfig::CloudLogging {
                project_id,
                log_name,
                timeout_secs,
                ..
            } => {
                if project_id.is_empty() {
                    return Err(ValidationError::EmptySinkField("project_id"));
                }
                if log_name.is_empty() {
                    return Err(ValidationError::EmptySinkField("log_name"));
                }
                if *timeout_secs == 0 {
                    return Err(ValidationError::InvalidTimeout);
                }
                Ok(())
            }
            SinkConfig::Stdout => Ok(()),
        }
    }
}

/// Sampling configuration
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct SamplingConfig {
    /// Fixed seed for the sampling generator. Seeded from entropy when unset.
    pub seed: Option<u64>,
}
