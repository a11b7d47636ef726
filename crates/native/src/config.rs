use std::path::{Path, PathBuf};

use derma_core::ClientConfig;
use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use snafu::{ResultExt, Snafu};

pub const CONFIG_DIRECTORY_NAME: &str = "derma";
pub const CONFIG_FILE_NAME: &str = "client.json";
pub const ENV_PREFIX: &str = "DERMA_";

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ConfigError {
    #[snafu(display("failed to load client config on `{stage}`: {source}"))]
    Extract {
        stage: &'static str,
        #[snafu(source(from(figment::Error, Box::new)))]
        source: Box<figment::Error>,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// `<config dir>/derma/client.json`, or a relative path when no config dir exists.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIRECTORY_NAME))
        .unwrap_or_else(|| PathBuf::from(".derma"))
        .join(CONFIG_FILE_NAME)
}

/// Layers defaults, the JSON file at `path` (when present) and `DERMA_*` variables.
pub fn load_config(path: &Path) -> ConfigResult<ClientConfig> {
    if !path.exists() {
        tracing::info!(?path, "client config not found, using defaults and environment");
    }

    let figment = Figment::from(Serialized::defaults(ClientConfig::default()))
        .merge(Json::file(path))
        .merge(Env::prefixed(ENV_PREFIX));

    let config = figment
        .extract::<ClientConfig>()
        .context(ExtractSnafu {
            stage: "extract-client-config",
        })?
        .normalized();
    tracing::debug!(
        base_url = %config.base_url,
        timeout = config.request_timeout_secs,
        "client config loaded"
    );
    Ok(config)
}
