//! Request context types.
//!
//! The [`RequestContext`] travels with a request from the transport layer,
//! through the service, into every store call. It carries the request ID used
//! for log correlation, a cancellation token, and an optional deadline.
//!
//! Every store operation calls [`RequestContext::check`] before it touches
//! shared state, so a withdrawn or expired request never mutates anything.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::ItemError;

/// A unique identifier for each request, using UUID v7.
///
/// UUID v7 is time-ordered, which makes it ideal for request tracking
/// and log correlation.
///
/// # Example
///
/// ```
/// use taskd_core::RequestId;
///
/// let id = RequestId::new();
/// println!("Request ID: {}", id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new unique request ID using UUID v7.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Per-request context passed to every service and store call.
///
/// Cloning a context is cheap and the clones share the same token, so
/// cancelling one cancels all of them.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use taskd_core::RequestContext;
///
/// let ctx = RequestContext::new().with_timeout(Duration::from_secs(5));
/// assert!(ctx.check().is_ok());
///
/// ctx.cancel();
/// assert!(ctx.check().is_err());
/// ```
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique identifier for this request.
    request_id: RequestId,

    /// Fires when the caller withdraws interest or the server gives up.
    token: CancellationToken,

    /// Point in time after which the request is no longer worth finishing.
    deadline: Option<Instant>,

    /// The operation being served (e.g., "createItem").
    operation_id: Option<String>,

    /// When the request started processing.
    started_at: Instant,
}

impl RequestContext {
    /// Creates a context with a fresh request ID, no deadline and its own
    /// root token.
    #[must_use]
    pub fn new() -> Self {
        Self::with_token(CancellationToken::new())
    }

    /// Creates a context bound to an existing token.
    ///
    /// The server passes a child of its shutdown token here so that a drain
    /// timeout reaches every admitted request.
    #[must_use]
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            request_id: RequestId::new(),
            token,
            deadline: None,
            operation_id: None,
            started_at: Instant::now(),
        }
    }

    /// Returns a new context that expires at `deadline`.
    ///
    /// An earlier deadline already set on the context wins.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// Returns a new context that expires `timeout` from now.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Returns a new context with the specified operation ID.
    #[must_use]
    pub fn with_operation_id(mut self, operation_id: impl Into<String>) -> Self {
        self.operation_id = Some(operation_id.into());
        self
    }

    /// Returns the request ID.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the operation ID if set.
    #[must_use]
    pub fn operation_id(&self) -> Option<&str> {
        self.operation_id.as_deref()
    }

    /// Returns the deadline, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns the underlying cancellation token.
    #[must_use]
    pub const fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Cancels this context and every clone of it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns `true` once the token has fired.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Returns `true` once the deadline has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Fails if the request was cancelled or its deadline has passed.
    ///
    /// Cancellation is reported ahead of expiry when both hold.
    pub fn check(&self) -> Result<(), ItemError> {
        if self.is_cancelled() {
            return Err(ItemError::Canceled);
        }
        if self.is_expired() {
            return Err(ItemError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Resolves once the context is cancelled or its deadline passes, yielding
    /// the matching error.
    pub async fn done(&self) -> ItemError {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    () = self.token.cancelled() => ItemError::Canceled,
                    () = tokio::time::sleep_until(deadline.into()) => ItemError::DeadlineExceeded,
                }
            }
            None => {
                self.token.cancelled().await;
                ItemError::Canceled
            }
        }
    }

    /// Returns the elapsed time since the request started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
