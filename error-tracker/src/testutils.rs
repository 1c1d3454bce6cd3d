use crate::errors::SinkError;
use crate::event::ErrorEvent;
use crate::sampler::RandomSource;
use crate::sink::LogSink;
use async_trait::async_trait;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use url::Url;

/// Always returns the same draw and counts how often it was asked
pub struct FixedDraw {
    value: f64,
    draws: AtomicUsize,
}

impl FixedDraw {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            draws: AtomicUsize::new(0),
        }
    }

    pub fn draws(&self) -> usize {
        self.draws.load(Ordering::SeqCst)
    }
}

impl RandomSource for FixedDraw {
    fn draw(&self) -> f64 {
        self.draws.fetch_add(1, Ordering::SeqCst);
        self.value
    }
}

/// Keeps every written event in memory, optionally failing each write
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ErrorEvent>>,
    fail: bool,
}

impl RecordingSink {
    pub fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn events(&self) -> Vec<ErrorEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl LogSink for RecordingSink {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn write(&self, event: &ErrorEvent) -> Result<(), SinkError> {
        if self.fail {
            return Err(SinkError::Status {
                status: StatusCode::SERVICE_UNAVAILABLE,
                body: "unavailable".into(),
            });
        }
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

type RecordedRequest = (Option<String>, Bytes);

/// Local stand-in for the logging API. Records the authorization header and
/// body of every request and answers with a fixed status.
pub struct TestLoggingServer {
    port: u16,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl TestLoggingServer {
    pub async fn spawn(status: u16) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to address");
        let port = listener.local_addr().unwrap().port();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = requests.clone();
        tokio::spawn(async move {
            loop {
                let (stream, _) = listener.accept().await.unwrap();
                let io = TokioIo::new(stream);
                let recorded = recorded.clone();

                tokio::spawn(async move {
                    let handler = service_fn(move |req: Request<Incoming>| {
                        let recorded = recorded.clone();
                        async move {
                            let authorization = req
                                .headers()
                                .get(hyper::header::AUTHORIZATION)
                                .and_then(|v| v.to_str().ok())
                                .map(String::from);
                            let body = req.into_body().collect().await.unwrap().to_bytes();
                            recorded.lock().unwrap().push((authorization, body));

                            let mut response = Response::new(Full::new(Bytes::from("{}")));
                            *response.status_mut() = StatusCode::from_u16(status).unwrap();
                            Ok::<_, Infallible>(response)
                        }
                    });

                    let _ = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
                        .serve_connection(io, handler)
                        .await;
                });
            }
        });

        Self { port, requests }
    }

    pub fn url(&self) -> Url {
        Url::parse(&format!("http://127.0.0.1:{}/v2/entries:write", self.port)).unwrap()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}
