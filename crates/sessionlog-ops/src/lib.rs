//! Operational helpers: logging, diagnostic capture, snapshot persistence.

pub mod capture;
pub mod store;

use sessionlog_types::{config::OpsConfig, Result, SessionLogError};
use tracing::Subscriber;
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

pub use capture::{diagnostic_channel, install_panic_capture, DiagnosticLayer, DiagnosticSender};
pub use store::{resolve_storage_dir, session_file_name, session_stamp, LocalStore};

/// Console output honours `ops.log_level`; the capture layer sees every
/// warning and error regardless of it.
pub fn subscriber(
    config: &OpsConfig,
    capture: Option<DiagnosticLayer>,
) -> Result<impl Subscriber + Send + Sync + 'static> {
    let filter = EnvFilter::try_new(config.log_level.clone())
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|err| SessionLogError::Ops(format!("failed to create log filter: {err}")))?;

    Ok(tracing_subscriber::registry()
        .with(fmt::layer().with_filter(filter))
        .with(capture.map(|layer| layer.with_filter(LevelFilter::WARN))))
}

/// Installs the global subscriber. When a capture layer is given, warnings
/// and errors are also forwarded to the session.
pub fn init_tracing(config: &OpsConfig, capture: Option<DiagnosticLayer>) -> Result<()> {
    subscriber(config, capture)?
        .try_init()
        .map_err(|err| SessionLogError::Ops(format!("tracing init error: {err}")))?;
    Ok(())
}
