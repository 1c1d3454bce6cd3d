use crate::classifier::{Classification, Decision, classify};
use crate::errors::ErrorTrackerError;
use crate::event::ErrorEvent;
use crate::metrics_defs::{
    REPORTS_DROPPED, REPORTS_FORWARD_FAILED, REPORTS_FORWARDED, REPORTS_REJECTED,
    REPORTS_THROTTLED, REQUEST_DURATION,
};
use crate::report::ErrorReport;
use crate::sampler::RandomSource;
use crate::sink::LogSink;
use http::header::{ALLOW, HeaderValue};
use http::request::Parts;
use http_body_util::combinators::BoxBody;
use hyper::body::{Bytes, Incoming};
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode};
use shared::http::{make_boxed_error_response, make_no_content_response, make_text_response};
use shared::{counter, histogram};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

type ServiceBody = BoxBody<Bytes, ErrorTrackerError>;

/// Serves the error report endpoint.
///
/// Cloning is cheap; all clones share the same sink and random source.
#[derive(Clone)]
pub struct ErrorTrackerService {
    path: Arc<str>,
    app_id: Arc<str>,
    sink: Arc<dyn LogSink>,
    random: Arc<dyn RandomSource>,
}

impl ErrorTrackerService {
    pub fn new(
        path: &str,
        app_id: &str,
        sink: Arc<dyn LogSink>,
        random: Arc<dyn RandomSource>,
    ) -> Self {
        Self {
            path: path.into(),
            app_id: app_id.into(),
            sink,
            random,
        }
    }

    pub async fn handle<B>(&self, req: Request<B>) -> Response<ServiceBody> {
        let start = Instant::now();
        let (parts, _) = req.into_parts();

        let response = self.dispatch(&parts).await;

        histogram!(REQUEST_DURATION, "status" => response.status().as_str().to_string())
            .record(start.elapsed().as_secs_f64());
        response
    }

    async fn dispatch(&self, parts: &Parts) -> Response<ServiceBody> {
        if parts.uri.path() != &*self.path {
            return make_boxed_error_response(StatusCode::NOT_FOUND);
        }

        if parts.method != Method::GET && parts.method != Method::POST {
            let mut response = make_boxed_error_response(StatusCode::METHOD_NOT_ALLOWED);
            response
                .headers_mut()
                .insert(ALLOW, HeaderValue::from_static("GET, POST"));
            return response;
        }

        let report = ErrorReport::from_parts(&parts.uri, &parts.headers);

        match classify(&report, self.random.as_ref()) {
            Err(e) => {
                counter!(REPORTS_REJECTED).increment(1);
                tracing::warn!(error = %e, "Malformed error report");
                make_text_response(StatusCode::BAD_REQUEST, format!("{e}\n"))
            }
            Ok(Decision::Drop) => {
                counter!(REPORTS_DROPPED).increment(1);
                make_no_content_response()
            }
            Ok(Decision::Throttled(classification)) => {
                counter!(REPORTS_THROTTLED, "rule" => classification.rule).increment(1);
                make_text_response(StatusCode::OK, "THROTTLED\n\n")
            }
            Ok(Decision::Forward(classification)) => {
                self.forward(&report, &classification).await
            }
        }
    }

    async fn forward(
        &self,
        report: &ErrorReport,
        classification: &Classification,
    ) -> Response<ServiceBody> {
        let event = ErrorEvent::new(report, classification, &self.app_id);

        if let Err(e) = self.sink.write(&event).await {
            counter!(REPORTS_FORWARD_FAILED, "sink" => self.sink.name()).increment(1);
            tracing::error!(
                error = %e,
                sink = self.sink.name(),
                application = %event.application,
                "Cannot upload error report"
            );
            return make_text_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Cannot upload error report to logging backend\n",
            );
        }

        counter!(
            REPORTS_FORWARDED,
            "rule" => classification.rule,
            "severity" => classification.severity.as_str(),
        )
        .increment(1);

        if report.debug {
            make_text_response(StatusCode::OK, format!("OK\n\n{event}\n"))
        } else {
            make_no_content_response()
        }
    }
}

impl Service<Request<Incoming>> for ErrorTrackerService {
    type Response = Response<ServiceBody>;
    type Error = ErrorTrackerError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.handle(req).await) })
    }
}
