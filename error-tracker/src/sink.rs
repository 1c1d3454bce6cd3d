//! Destinations for forwarded error events.

use crate::config::{DEFAULT_CLOUD_LOGGING_ENDPOINT, SinkConfig};
use crate::errors::SinkError;
use crate::event::ErrorEvent;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Writes one event per forwarded report. Each write is a single attempt.
#[async_trait]
pub trait LogSink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn write(&self, event: &ErrorEvent) -> Result<(), SinkError>;
}

pub fn build_sink(config: &SinkConfig) -> Result<Arc<dyn LogSink>, SinkError> {
    let sink: Arc<dyn LogSink> = match config {
        SinkConfig::CloudLogging {
            endpoint,
            project_id,
            log_name,
            bearer_token,
            timeout_secs,
        } => Arc::new(CloudLoggingSink::new(
            match endpoint {
                Some(endpoint) => endpoint.clone(),
                None => Url::parse(DEFAULT_CLOUD_LOGGING_ENDPOINT)?,
            },
            project_id,
            log_name,
            bearer_token.clone(),
            Duration::from_secs(*timeout_secs),
        )?),
        SinkConfig::Stdout => Arc::new(StdoutSink),
    };
    Ok(sink)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WriteEntriesRequest<'a> {
    log_name: &'a str,
    resource: MonitoredResource,
    entries: [LogEntry<'a>; 1],
}

#[derive(Serialize)]
struct MonitoredResource {
    r#type: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LogEntry<'a> {
    severity: &'static str,
    json_payload: &'a ErrorEvent,
}

/// Sends events to the Cloud Logging `entries:write` API
pub struct CloudLoggingSink {
    client: reqwest::Client,
    endpoint: Url,
    log_name: String,
    bearer_token: Option<String>,
}

impl CloudLoggingSink {
    pub fn new(
        endpoint: Url,
        project_id: &str,
        log_name: &str,
        bearer_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(SinkError::Client)?;

        Ok(CloudLoggingSink {
            client,
            endpoint,
            log_name: format!("projects/{project_id}/logs/{log_name}"),
            bearer_token,
        })
    }

    fn body<'a>(&'a self, event: &'a ErrorEvent) -> WriteEntriesRequest<'a> {
        WriteEntriesRequest {
            log_name: &self.log_name,
            resource: MonitoredResource { r#type: "global" },
            entries: [LogEntry {
                severity: event.severity.as_str(),
                json_payload: event,
            }],
        }
    }
}

#[async_trait]
impl LogSink for CloudLoggingSink {
    fn name(&self) -> &'static str {
        "cloud_logging"
    }

    async fn write(&self, event: &ErrorEvent) -> Result<(), SinkError> {
        let mut request = self.client.post(self.endpoint.clone()).json(&self.body(event));
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Status { status, body });
        }

        tracing::debug!(application = %event.application, "Forwarded error report");
        Ok(())
    }
}

/// Emits events as structured log lines
pub struct StdoutSink;

#[async_trait]
impl LogSink for StdoutSink {
    fn name(&self) -> &'static str {
        "stdout"
    }

    async fn write(&self, event: &ErrorEvent) -> Result<(), SinkError> {
        let payload = serde_json::to_string(event)?;
        tracing::info!(
            target: "error_tracker::events",
            severity = %event.severity,
            application = %event.application,
            payload = %payload,
            "Error report"
        );
        Ok(())
    }
}
