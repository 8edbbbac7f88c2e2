//! Graceful shutdown on SIGTERM, SIGINT, or an IPC shutdown request

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;
use tracing::debug;

/// Resolves when the daemon should stop
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    requested: Arc<Notify>,
}

impl ShutdownSignal {
    /// Create a new shutdown signal handler
    pub fn new() -> Self {
        Self {
            requested: Arc::new(Notify::new()),
        }
    }

    /// Request shutdown from inside the daemon
    ///
    /// A request made before anyone waits is kept until `wait` is called.
    pub fn trigger(&self) {
        self.requested.notify_one();
    }

    /// Wait for a shutdown signal or request
    pub async fn wait(&self) -> Result<()> {
        let mut sigterm =
            signal(SignalKind::terminate()).context("failed to register SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("failed to register SIGINT handler")?;

        tokio::select! {
            _ = sigterm.recv() => {
                debug!("received SIGTERM");
            }
            _ = sigint.recv() => {
                debug!("received SIGINT");
            }
            _ = self.requested.notified() => {
                debug!("shutdown requested");
            }
        }
        Ok(())
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_trigger_before_wait() {
        let shutdown = ShutdownSignal::new();
        shutdown.clone().trigger();
        let result = tokio::time::timeout(Duration::from_secs(1), shutdown.wait()).await;
        assert!(matches!(result, Ok(Ok(()))));
    }
}
