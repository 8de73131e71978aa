//! Request admission and drain coordination.
//!
//! The [`Coordinator`] owns the server lifecycle:
//!
//! ```text
//! Starting ──bind──▶ Accepting ──signal──▶ Draining ──idle or timeout──▶ Stopped
//! ```
//!
//! Requests are admitted only while `Accepting`. Each admitted request holds
//! a [`RequestGuard`] whose cancellation token is a child of the
//! coordinator's root token. Draining leaves those tokens alone; only when
//! the drain timeout elapses is the root cancelled, which every
//! still-running request observes as `Canceled`.

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use taskd_telemetry::metrics::set_in_flight;

/// Server lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LifecycleState {
    /// Constructed, listener not yet bound.
    Starting = 0,
    /// Admitting new requests.
    Accepting = 1,
    /// Refusing new requests, waiting for admitted ones.
    Draining = 2,
    /// Drain finished.
    Stopped = 3,
}

impl LifecycleState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Starting,
            1 => Self::Accepting,
            2 => Self::Draining,
            _ => Self::Stopped,
        }
    }

    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Accepting => "accepting",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`Coordinator::drain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    /// Requests still running when the timeout fired.
    pub abandoned: usize,
    /// Time spent draining.
    pub elapsed: Duration,
}

impl DrainReport {
    /// Returns `true` if every admitted request finished in time.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.abandoned == 0
    }
}

#[derive(Debug)]
struct Inner {
    state: AtomicU8,
    in_flight: AtomicUsize,
    idle: Notify,
    root: CancellationToken,
}

/// Tracks admitted requests and drives the shutdown sequence.
///
/// Cloning is cheap; all clones share state.
///
/// # Example
///
/// ```rust
/// use taskd_server::{Coordinator, LifecycleState};
///
/// let coordinator = Coordinator::new();
/// assert!(coordinator.admit().is_none());
///
/// coordinator.mark_accepting();
/// let guard = coordinator.admit().expect("accepting");
/// assert_eq!(coordinator.in_flight(), 1);
///
/// drop(guard);
/// assert_eq!(coordinator.in_flight(), 0);
/// assert_eq!(coordinator.state(), LifecycleState::Accepting);
/// ```
#[derive(Debug, Clone)]
pub struct Coordinator {
    inner: Arc<Inner>,
}

impl Coordinator {
    /// Creates a coordinator in the `Starting` state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: AtomicU8::new(LifecycleState::Starting as u8),
                in_flight: AtomicUsize::new(0),
                idle: Notify::new(),
                root: CancellationToken::new(),
            }),
        }
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.inner.state.load(Ordering::SeqCst))
    }

    /// Returns `true` while new requests are admitted.
    #[must_use]
    pub fn is_accepting(&self) -> bool {
        self.state() == LifecycleState::Accepting
    }

    /// Returns the number of admitted, unfinished requests.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Moves `Starting → Accepting`. No effect in any other state.
    pub fn mark_accepting(&self) {
        let _ = self.inner.state.compare_exchange(
            LifecycleState::Starting as u8,
            LifecycleState::Accepting as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    /// Stops admitting requests. Returns `true` on the transition into
    /// `Draining`, `false` if the coordinator was already draining or stopped.
    pub fn begin_drain(&self) -> bool {
        let previous = self
            .inner
            .state
            .fetch_max(LifecycleState::Draining as u8, Ordering::SeqCst);
        previous < LifecycleState::Draining as u8
    }

    /// Admits a request, or returns `None` unless the state is `Accepting`.
    ///
    /// The count is raised before the state is checked, so a drain that
    /// starts concurrently either sees this request or refuses it.
    #[must_use]
    pub fn admit(&self) -> Option<RequestGuard> {
        let count = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;

        if !self.is_accepting() {
            self.release();
            return None;
        }

        set_in_flight(count);
        Some(RequestGuard {
            inner: Arc::clone(&self.inner),
            token: self.inner.root.child_token(),
        })
    }

    /// Waits until no request is in flight.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            // register before re-checking so a release in between is not lost
            notified.as_mut().enable();

            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Drains admitted requests.
    ///
    /// Waits up to `timeout` for the in-flight count to reach zero. On
    /// timeout the root token is cancelled so every remaining request sees
    /// `Canceled`; those requests are reported as abandoned. The state ends
    /// as `Stopped` either way.
    pub async fn drain(&self, timeout: Duration) -> DrainReport {
        let started = Instant::now();
        self.begin_drain();

        tracing::info!(
            in_flight = self.in_flight(),
            timeout = ?timeout,
            "draining in-flight requests"
        );

        let abandoned = if tokio::time::timeout(timeout, self.wait_idle()).await.is_ok() {
            0
        } else {
            let remaining = self.in_flight();
            self.inner.root.cancel();
            remaining
        };

        self.inner
            .state
            .store(LifecycleState::Stopped as u8, Ordering::SeqCst);

        let report = DrainReport {
            abandoned,
            elapsed: started.elapsed(),
        };

        if report.is_clean() {
            tracing::info!(elapsed = ?report.elapsed, "drain complete");
        } else {
            tracing::warn!(
                abandoned = report.abandoned,
                elapsed = ?report.elapsed,
                "drain timed out, cancelling remaining requests"
            );
        }

        report
    }

    fn release(&self) {
        release(&self.inner);
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

fn release(inner: &Inner) {
    let previous = inner.in_flight.fetch_sub(1, Ordering::SeqCst);
    if previous == 1 {
        inner.idle.notify_waiters();
    }
}

/// Proof of admission for one request.
///
/// Dropping the guard marks the request finished.
#[derive(Debug)]
pub struct RequestGuard {
    inner: Arc<Inner>,
    token: CancellationToken,
}

impl RequestGuard {
    /// Token for this request; a child of the coordinator's root.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        release(&self.inner);
        set_in_flight(self.inner.in_flight.load(Ordering::SeqCst));
    }
}
