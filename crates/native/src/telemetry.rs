use snafu::Snafu;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "DERMA_LOG";

#[derive(Debug, Snafu)]
#[snafu(display("failed to initialize tracing subscriber: {message}"))]
pub struct TelemetryError {
    message: String,
}

/// Installs a fmt subscriber filtered by `DERMA_LOG`, defaulting to `info`.
pub fn init_tracing(verbose: bool) -> Result<(), TelemetryError> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|error| TelemetryError {
            message: error.to_string(),
        })
}
