//! Shutdown signal handling.
//!
//! A [`ShutdownSignal`] is the trigger that moves the server from accepting
//! to draining. It fires on SIGTERM or SIGINT, or when a test calls
//! [`ShutdownSignal::trigger`].

use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

/// A future that completes when the shutdown signal is triggered.
///
/// Created by [`ShutdownSignal::recv()`].
pub type ShutdownReceiver = WaitForCancellationFutureOwned;

/// A signal that can be used to trigger and await shutdown.
///
/// Clones share state; triggering one wakes every waiter.
///
/// # Example
///
/// ```rust
/// use taskd_server::ShutdownSignal;
///
/// let shutdown = ShutdownSignal::new();
/// let shutdown_clone = shutdown.clone();
///
/// shutdown.trigger();
/// assert!(shutdown_clone.is_shutdown());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    token: CancellationToken,
}

impl ShutdownSignal {
    /// Creates a new, untriggered signal.
    #[must_use]
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Triggers the signal. Idempotent.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    /// Returns `true` if shutdown has been triggered.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Returns a future that completes when the signal fires.
    ///
    /// Completes immediately if it already has.
    pub fn recv(&self) -> ShutdownReceiver {
        self.token.clone().cancelled_owned()
    }

    /// Creates a signal that fires on SIGTERM or SIGINT.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn with_os_signals() -> Self {
        let signal = Self::new();
        let signal_clone = signal.clone();

        tokio::spawn(async move {
            wait_for_os_signal().await;
            signal_clone.trigger();
        });

        signal
    }
}

/// Waits for SIGTERM or SIGINT (Ctrl+C only on non-Unix targets).
///
/// If the handlers cannot be installed the failure is logged and the future
/// never resolves, leaving programmatic triggers as the only way out.
async fn wait_for_os_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(term), Ok(int)) => (term, int),
                (Err(e), _) | (_, Err(e)) => {
                    tracing::error!(error = %e, "failed to register signal handlers");
                    std::future::pending::<()>().await;
                    return;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!(signal = "SIGTERM", "shutdown signal received");
            }
            _ = sigint.recv() => {
                tracing::info!(signal = "SIGINT", "shutdown signal received");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to wait for Ctrl+C");
            std::future::pending::<()>().await;
        }
        tracing::info!(signal = "ctrl_c", "shutdown signal received");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_shutdown_signal_new() {
        let signal = ShutdownSignal::new();
        assert!(!signal.is_shutdown());
    }

    #[test]
    fn test_shutdown_signal_trigger_idempotent() {
        let signal = ShutdownSignal::new();
        signal.trigger();
        signal.trigger();
        assert!(signal.is_shutdown());
    }

    #[test]
    fn test_shutdown_signal_clone() {
        let signal1 = ShutdownSignal::new();
        let signal2 = signal1.clone();

        signal1.trigger();

        assert!(signal2.is_shutdown());
    }

    #[test]
    fn test_receiver_pending_until_triggered() {
        let signal = ShutdownSignal::new();
        let mut recv = tokio_test::task::spawn(signal.recv());

        tokio_test::assert_pending!(recv.poll());
        signal.trigger();
        assert!(recv.is_woken());
        tokio_test::assert_ready!(recv.poll());
    }

    #[test]
    fn test_receiver_created_after_trigger_is_ready() {
        let signal = ShutdownSignal::new();
        signal.trigger();

        let mut recv = tokio_test::task::spawn(signal.recv());
        tokio_test::assert_ready!(recv.poll());
    }

    #[tokio::test]
    async fn test_shutdown_recv_completes_when_triggered() {
        let signal = ShutdownSignal::new();
        let signal_clone = signal.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            signal_clone.trigger();
        });

        tokio::time::timeout(Duration::from_secs(1), signal.recv())
            .await
            .expect("recv should complete");
    }

    #[tokio::test]
    async fn test_shutdown_recv_completes_immediately_if_triggered() {
        let signal = ShutdownSignal::new();
        signal.trigger();

        tokio::time::timeout(Duration::from_millis(10), signal.recv())
            .await
            .expect("recv should complete immediately");
    }
}
