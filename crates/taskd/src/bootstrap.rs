//! Process wiring.
//!
//! Translates [`TaskdConfig`] into the settings each crate takes and builds
//! the server. Kept out of `main` so it can be tested.

use std::path::Path;
use std::sync::Arc;

use taskd_config::{ConfigError, ConfigLoader, TaskdConfig};
use taskd_server::{Server, ServerConfig};
use taskd_service::ItemService;
use taskd_store::MemoryStore;
use taskd_telemetry::TelemetryConfig;

use crate::VERSION;

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "TASKD";

/// Default configuration file, read if present.
pub const DEFAULT_CONFIG_FILE: &str = "taskd.toml";

/// Loads configuration: `.env`, then the file, then `TASKD__*` and `PORT`.
///
/// An explicit `path` must exist; the default file is optional.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be loaded, an override does
/// not parse, or validation fails.
pub fn load_config(path: Option<&Path>) -> Result<TaskdConfig, ConfigError> {
    let loader = ConfigLoader::new().with_defaults().with_dotenv();

    let loader = match path {
        Some(path) => loader.with_file(path)?,
        None => loader.with_optional_file(DEFAULT_CONFIG_FILE)?,
    };

    loader.with_env_prefix(ENV_PREFIX).load()
}

/// Builds telemetry settings from the loaded configuration.
#[must_use]
pub fn telemetry_config(config: &TaskdConfig) -> TelemetryConfig {
    let builder = TelemetryConfig::builder()
        .service_name(&config.server.service_name)
        .service_version(VERSION)
        .logging_enabled(config.logging.enabled)
        .log_level(&config.logging.level)
        .log_format(config.logging.format);

    if config.metrics.enabled {
        builder.metrics_addr(&config.metrics.addr).build()
    } else {
        builder.without_metrics().build()
    }
}

/// Builds server settings from the loaded configuration.
#[must_use]
pub fn server_config(config: &TaskdConfig) -> ServerConfig {
    ServerConfig::builder()
        .http_addr(config.server.http_addr.clone())
        .shutdown_timeout(config.server.shutdown_timeout())
        .request_timeout(config.server.request_timeout())
        .service_name(config.server.service_name.clone())
        .service_version(VERSION)
        .build()
}

/// Wires a fresh in-memory store, the service and the server.
#[must_use]
pub fn build_server(config: &TaskdConfig) -> Server {
    let store = Arc::new(MemoryStore::new());
    let service = ItemService::new(store);
    Server::new(server_config(config), service)
}
