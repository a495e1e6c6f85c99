//! Shutdown signal handling.
//!
//! The connector must be disposed on the way out no matter how the process
//! is asked to stop. [`SigDown`] turns SIGTERM and SIGINT into a
//! cancellation token the command loops select on; the dispose call then
//! runs on the normal exit path.

use tokio::signal::unix::SignalKind;
use tokio::signal::unix::signal;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Watches for SIGTERM/SIGINT and trips a cancellation token.
pub struct SigDown {
    tracker: TaskTracker,
    cancellation: CancellationToken,
}

impl SigDown {
    /// Installs the signal watcher.
    ///
    /// Returns an error if signal registration fails.
    pub fn install() -> Result<Self, std::io::Error> {
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        let inner = CancellationToken::new();
        let outer = inner.clone();
        let tracker = TaskTracker::new();
        tracker.spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => {
                    inner.cancel();
                },
                _ = sigint.recv() => {
                    inner.cancel();
                }
            }
        });
        tracker.close();
        Ok(Self {
            tracker,
            cancellation: outer,
        })
    }

    /// Returns a clone of the cancellation token for the command loops.
    pub fn token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Waits for a shutdown signal and ensures the watcher task completes.
    #[allow(dead_code)]
    pub async fn recv(&self) {
        self.cancellation.cancelled().await;
        self.tracker.wait().await;
    }
}
