//! Terminal host for the diagnosis client: disk images, reqwest, figment config.

pub mod config;
pub mod session;
pub mod telemetry;
pub mod transport;

pub use config::{ConfigError, default_config_path, load_config};
pub use session::{NativeSession, TracingSurface};
pub use telemetry::init_tracing;
pub use transport::ReqwestTransport;
