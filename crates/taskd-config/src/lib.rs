//! Typed configuration for taskd.
//!
//! - TOML and JSON configuration files
//! - `TASKD__SECTION__KEY` environment variable overrides, plus `PORT`
//! - Strict parsing (fails on unknown fields)
//! - Layered configuration (defaults → file → env)
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:8080"
//! shutdown_timeout_secs = 5
//! request_timeout_ms = 10000
//! service_name = "taskd"
//!
//! [logging]
//! enabled = true
//! level = "info"
//! format = "json"
//!
//! [metrics]
//! enabled = false
//! addr = "0.0.0.0:9090"
//! ```
//!
//! # Example
//!
//! ```no_run
//! use taskd_config::ConfigLoader;
//!
//! # fn main() -> Result<(), taskd_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_dotenv()
//!     .with_optional_file("taskd.toml")?
//!     .with_env_prefix("TASKD")
//!     .load()?;
//!
//! println!("Server will listen on: {}", config.server.http_addr);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::TaskdConfig;
pub use error::ConfigError;
pub use loader::{ConfigLoader, PORT_ENV_VAR};
pub use schema::{LogFormat, LoggingConfig, MetricsConfig, ServerConfig};
