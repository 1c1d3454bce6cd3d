//! The structured record forwarded to the logging backend.

use crate::classifier::{Classification, Severity};
use crate::report::ErrorReport;
use serde::Serialize;
use std::fmt;

pub const ENVIRONMENT: &str = "prod";

/// Request metadata attached to a forwarded error.
///
/// Only the referrer and user agent are recorded, never the caller's address.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ErrorRequestMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_referrer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_user_agent: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ErrorRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub meta: ErrorRequestMeta,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ErrorEvent {
    pub application: String,
    #[serde(rename = "appID")]
    pub app_id: String,
    pub environment: &'static str,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
    pub request: ErrorRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub line: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classname: Option<String>,
    pub severity: Severity,
}

impl ErrorEvent {
    pub fn new(report: &ErrorReport, classification: &Classification, app_id: &str) -> Self {
        ErrorEvent {
            application: classification.label.clone(),
            app_id: app_id.to_string(),
            environment: ENVIRONMENT,
            version: classification.version.clone(),
            message: report.message.clone(),
            exception: report.exception.clone(),
            request: ErrorRequest {
                url: report.document_url().map(String::from),
                meta: ErrorRequestMeta {
                    http_referrer: report.referrer.clone(),
                    http_user_agent: report.user_agent.clone(),
                },
            },
            filename: report.filename.clone(),
            line: report.line,
            classname: report.classname.clone(),
            severity: classification.severity,
        }
    }
}

/// Human readable dump returned to `debug=1` requests
impl fmt::Display for ErrorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let opt = |value: &Option<String>| value.clone().unwrap_or_default();

        writeln!(f, "application: {}", self.application)?;
        writeln!(f, "appID: {}", self.app_id)?;
        writeln!(f, "environment: {}", self.environment)?;
        writeln!(f, "version: {}", self.version)?;
        writeln!(f, "severity: {}", self.severity)?;
        writeln!(f, "message: {}", opt(&self.message))?;
        writeln!(f, "exception: {}", opt(&self.exception))?;
        writeln!(f, "filename: {}", opt(&self.filename))?;
        writeln!(f, "line: {}", self.line)?;
        writeln!(f, "classname: {}", opt(&self.classname))?;
        writeln!(f, "url: {}", opt(&self.request.url))?;
        writeln!(f, "referrer: {}", opt(&self.request.meta.http_referrer))?;
        write!(f, "user agent: {}", opt(&self.request.meta.http_user_agent))
    }
}
