//! Health and readiness endpoints.
//!
//! - `/health` - Liveness: always 200 while the process serves HTTP
//! - `/ready` - Readiness: 200 only while the coordinator is accepting
//!
//! # Example
//!
//! ```rust
//! use taskd_server::HealthCheck;
//!
//! let health = HealthCheck::new("taskd", "0.1.0");
//! let status = health.status();
//! assert!(status.is_healthy());
//! assert_eq!(status.service(), "taskd");
//! ```

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::coordinator::{Coordinator, LifecycleState};

/// Body of the `/health` response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthStatus {
    /// Always "healthy" when served
    status: String,

    /// Service name
    service: String,

    /// Service version
    version: String,

    /// Server uptime in seconds
    uptime_seconds: u64,
}

impl HealthStatus {
    /// Creates a healthy status.
    #[must_use]
    pub fn healthy(service: impl Into<String>, version: impl Into<String>, uptime: Duration) -> Self {
        Self {
            status: "healthy".to_string(),
            service: service.into(),
            version: version.into(),
            uptime_seconds: uptime.as_secs(),
        }
    }

    /// Returns the status string.
    #[must_use]
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Returns the service name.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Returns the service version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the uptime in seconds.
    #[must_use]
    pub fn uptime_seconds(&self) -> u64 {
        self.uptime_seconds
    }

    /// Returns whether the status is healthy.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Liveness probe.
#[derive(Debug, Clone)]
pub struct HealthCheck {
    service: String,
    version: String,
    start_time: Instant,
}

impl HealthCheck {
    /// Creates a health check; uptime counts from now.
    #[must_use]
    pub fn new(service: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            version: version.into(),
            start_time: Instant::now(),
        }
    }

    /// Returns the current health status.
    #[must_use]
    pub fn status(&self) -> HealthStatus {
        HealthStatus::healthy(&self.service, &self.version, self.uptime())
    }

    /// Returns the server uptime.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Returns the service name.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Returns the service version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }
}

/// Body of the `/ready` response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReadinessStatus {
    /// Whether new requests are admitted
    ready: bool,

    /// Lifecycle state name
    state: String,

    /// Admitted, unfinished requests
    in_flight: usize,
}

impl ReadinessStatus {
    /// Snapshots the coordinator.
    #[must_use]
    pub fn from_coordinator(coordinator: &Coordinator) -> Self {
        let state = coordinator.state();
        Self {
            ready: state == LifecycleState::Accepting,
            state: state.to_string(),
            in_flight: coordinator.in_flight(),
        }
    }

    /// Returns whether the server is ready.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Returns the lifecycle state name.
    #[must_use]
    pub fn state(&self) -> &str {
        &self.state
    }

    /// Returns the in-flight count at snapshot time.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }
}
