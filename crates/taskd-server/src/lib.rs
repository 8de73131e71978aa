//! # Taskd Server
//!
//! HTTP server for taskd.
//!
//! - [`Server`] / [`BoundServer`] - HTTP/1.1 via Hyper, bound before serving
//! - [`Coordinator`] - Request admission and bounded drain on shutdown
//! - [`ShutdownSignal`] - SIGTERM/SIGINT or programmatic trigger
//! - [`route`] - The fixed `/todos` route table
//! - [`HealthCheck`] - `/health` and `/ready` probes
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use taskd_server::{Server, ServerConfig};
//! use taskd_service::ItemService;
//! use taskd_store::MemoryStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = ItemService::new(Arc::new(MemoryStore::new()));
//!     let server = Server::new(ServerConfig::default(), service);
//!
//!     server.bind().await?.run().await?;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/taskd-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod api;
pub mod config;
mod coordinator;
mod health;
mod router;
mod server;
pub mod shutdown;

pub use api::{HttpResponse, ResponseBody};
pub use config::{ServerConfig, ServerConfigBuilder};
pub use coordinator::{Coordinator, DrainReport, LifecycleState, RequestGuard};
pub use health::{HealthCheck, HealthStatus, ReadinessStatus};
pub use router::{route, Operation, RouteMatch};
pub use server::{BoundServer, Server, ServerError};
pub use shutdown::{ShutdownReceiver, ShutdownSignal};
