//! Parsing of an incoming error report from the request URI and headers.

use http::HeaderMap;
use http::Uri;
use http::header::{REFERER, USER_AGENT};
use std::collections::HashSet;
use std::fmt;

/// Version string baked into unreleased test builds of the runtime.
pub const INTERNAL_RUNTIME_VERSION: &str = "$internalRuntimeVersion$";

/// The runtime flavor that produced the error (`rt` parameter)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RuntimeKind {
    Inabox,
    ThirdParty,
    /// Any other value is kept verbatim so it still shows up in the label
    Other(String),
}

impl RuntimeKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "" => None,
            "inabox" => Some(RuntimeKind::Inabox),
            "3p" => Some(RuntimeKind::ThirdParty),
            other => Some(RuntimeKind::Other(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RuntimeKind::Inabox => "inabox",
            RuntimeKind::ThirdParty => "3p",
            RuntimeKind::Other(value) => value,
        }
    }
}

impl fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single client-side error report.
///
/// Empty query values are treated the same as absent ones.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ErrorReport {
    pub message: Option<String>,
    pub exception: Option<String>,
    /// Raw runtime version, empty when not sent
    pub version: String,
    pub line: i32,
    pub filename: Option<String>,
    pub classname: Option<String>,
    /// `r` parameter if present, otherwise the `Referer` header
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub is_assertion: bool,
    pub runtime: Option<RuntimeKind>,
    /// Legacy `3p=1` flag, only meaningful when `runtime` is absent
    pub is_legacy_third_party: bool,
    pub is_canary: bool,
    pub is_expected: bool,
    pub debug: bool,
}

impl ErrorReport {
    /// Builds a report from the query string and headers of a request.
    ///
    /// Only the `Referer` and `User-Agent` headers are read. When a query key
    /// repeats, its first value is used.
    pub fn from_parts(uri: &Uri, headers: &HeaderMap) -> Self {
        let mut report = ErrorReport::default();
        let mut referrer_param = None;
        let mut seen = HashSet::new();

        let query = uri.query().unwrap_or("");
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if !seen.insert(key.clone()) {
                continue;
            }
            match key.as_ref() {
                "m" => report.message = non_empty(&value),
                "s" => report.exception = non_empty(&value),
                "v" => report.version = value.into_owned(),
                "l" => report.line = value.parse().unwrap_or(0),
                "f" => report.filename = non_empty(&value),
                "el" => report.classname = non_empty(&value),
                "r" => referrer_param = non_empty(&value),
                "a" => report.is_assertion = value == "1",
                "rt" => report.runtime = RuntimeKind::parse(&value),
                "3p" => report.is_legacy_third_party = value == "1",
                "ca" => report.is_canary = value == "1",
                "ex" => report.is_expected = value == "1",
                "debug" => report.debug = value == "1",
                _ => {}
            }
        }

        report.referrer = referrer_param.or_else(|| header_value(headers, REFERER));
        report.user_agent = header_value(headers, USER_AGENT);
        report
    }

    pub fn is_internal_version(&self) -> bool {
        self.version == INTERNAL_RUNTIME_VERSION
    }

    pub fn has_content(&self) -> bool {
        self.message.is_some() || self.exception.is_some()
    }

    /// The page the runtime was running on
    pub fn document_url(&self) -> Option<&str> {
        self.referrer.as_deref()
    }

    pub fn is_third_party(&self) -> bool {
        match &self.runtime {
            Some(runtime) => *runtime == RuntimeKind::ThirdParty,
            None => self.is_legacy_third_party,
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn header_value(headers: &HeaderMap, name: http::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(non_empty)
}
