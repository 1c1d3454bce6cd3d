use crate::config::LoggingConfig;
use sentry::types::{Dsn, ParseDsnError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(thiserror::Error, Debug)]
pub enum LoggingError {
    #[error("invalid sentry DSN: {0}")]
    InvalidDsn(#[from] ParseDsnError),
}

fn sentry_dsn(config: Option<&LoggingConfig>) -> Result<Option<Dsn>, LoggingError> {
    let dsn = config
        .and_then(|c| c.sentry_dsn.as_deref())
        .map(str::parse::<Dsn>)
        .transpose()?;
    Ok(dsn)
}

/// Installs the global subscriber. Error events are sent to Sentry when a DSN
/// is configured; the returned guard flushes Sentry on drop.
pub fn init(
    config: Option<&LoggingConfig>,
) -> Result<Option<sentry::ClientInitGuard>, LoggingError> {
    let dsn = sentry_dsn(config)?;

    let level = config.map_or("info", |c| c.level.as_str());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let guard = dsn.map(|dsn| {
        sentry::init(sentry::ClientOptions {
            dsn: Some(dsn),
            release: sentry::release_name!(),
            ..Default::default()
        })
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(guard.is_some().then(sentry::integrations::tracing::layer))
        .init();

    Ok(guard)
}
