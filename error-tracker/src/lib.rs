pub mod classifier;
pub mod config;
pub mod errors;
pub mod event;
pub mod metrics_defs;
pub mod report;
pub mod sampler;
pub mod service;
pub mod sink;

#[cfg(test)]
mod testutils;

use errors::ErrorTrackerError;
use sampler::SharedRng;
use service::ErrorTrackerService;
use shared::admin_service::AdminService;
use shared::http::run_http_service;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub async fn run(config: config::Config) -> errors::Result<()> {
    config.validate()?;
    shared::metrics_defs::describe_all(metrics_defs::ALL_METRICS);

    let ready = Arc::new(AtomicBool::new(false));

    let sink = sink::build_sink(&config.sink)?;
    tracing::info!(sink = sink.name(), path = %config.path, "Starting error tracker");
    ready.store(true, Ordering::Relaxed);

    let random = Arc::new(SharedRng::new(config.sampling.seed));
    let service = ErrorTrackerService::new(&config.path, &config.app_id, sink, random);

    let ready_flag = ready.clone();
    let admin_service = AdminService::<_, ErrorTrackerError>::new(move || {
        ready_flag.load(Ordering::Relaxed)
    });

    let tracker_task = run_http_service(&config.listener.host, config.listener.port, service);
    let admin_task = run_http_service(
        &config.admin_listener.host,
        config.admin_listener.port,
        admin_service,
    );

    tokio::try_join!(tracker_task, admin_task)?;
    Ok(())
}
