//! # Taskd
//!
//! An in-memory todo service: create, read, update and delete items over
//! HTTP, with per-request cancellation and a bounded drain on shutdown.
//!
//! ## Architecture
//!
//! ```text
//! HTTP ─▶ taskd-server ─▶ taskd-service ─▶ taskd-store
//!              │                │               │
//!              └── RequestContext (token + deadline) ──┘
//!              │
//!              └── on failure: taskd_core::classify ─▶ status + body
//! ```
//!
//! This crate ties the pieces together: [`bootstrap`] turns a loaded
//! [`TaskdConfig`](config::TaskdConfig) into telemetry and server settings
//! and wires the store, service and server.

#![doc(html_root_url = "https://docs.rs/taskd/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub use taskd_config as config;
pub use taskd_core as core;
pub use taskd_server as server;
pub use taskd_service as service;
pub use taskd_store as store;
pub use taskd_telemetry as telemetry;

pub mod bootstrap;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
