use thiserror::Error;

/// Result type alias for error-tracker operations
pub type Result<T, E = ErrorTrackerError> = std::result::Result<T, E>;

/// Errors that stop the service
#[derive(Error, Debug)]
pub enum ErrorTrackerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] crate::config::ValidationError),

    #[error("log sink error: {0}")]
    Sink(#[from] SinkError),
}

/// Problems with the report itself, answered with 400
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReportError {
    #[error("One of 'message' or 'exception' must be present.")]
    MissingMessage,
}

/// Failure to hand a report to the logging backend
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("could not build HTTP client: {0}")]
    Client(reqwest::Error),

    #[error("invalid logging endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    #[error("request to logging backend failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("logging backend returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("could not serialize log entry: {0}")]
    Serialize(#[from] serde_json::Error),
}
