//! Call admission and graceful shutdown.
//!
//! [`CallTracker`] counts in-flight streaming calls and owns the
//! [`CancellationToken`] that stream tasks watch. Shutdown runs in three
//! phases: refuse new calls, let in-flight streams drain for up to the
//! configured timeout, then cancel whatever is still running.

use crate::server::telemetry::{decrement_streams_inflight, increment_streams_inflight};
use core::time::Duration;
use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use userbase_tonic_core::Error;

pub struct CallTracker {
    accepting: AtomicBool,
    inflight: AtomicUsize,
    shutdown_token: CancellationToken,
    shutdown_timeout: Duration,
}

/// Keeps a streaming call counted as in flight until dropped.
pub struct StreamGuard {
    tracker: Arc<CallTracker>,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.tracker.inflight.fetch_sub(1, Ordering::AcqRel);
        decrement_streams_inflight();
    }
}

impl CallTracker {
    pub fn new(shutdown_timeout: Duration) -> Self {
        Self {
            accepting: AtomicBool::new(true),
            inflight: AtomicUsize::new(0),
            shutdown_token: CancellationToken::new(),
            shutdown_timeout,
        }
    }

    /// Fails with [`Error::ServiceShutdown`] once shutdown has begun.
    pub fn ensure_accepting(&self) -> Result<(), Error> {
        if self.accepting.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(Error::ServiceShutdown)
        }
    }

    /// Registers a new streaming call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ServiceShutdown`] once shutdown has begun.
    pub fn admit_stream(self: &Arc<Self>) -> Result<StreamGuard, Error> {
        self.ensure_accepting()?;
        self.inflight.fetch_add(1, Ordering::AcqRel);
        increment_streams_inflight();
        Ok(StreamGuard {
            tracker: Arc::clone(self),
        })
    }

    pub fn inflight(&self) -> usize {
        self.inflight.load(Ordering::Acquire)
    }

    /// Token cancelled in the last phase of shutdown.
    pub fn cancelled(&self) -> CancellationToken {
        self.shutdown_token.child_token()
    }

    pub async fn shutdown(&self) {
        // === Phase 0: Stop accepting new calls ===
        tracing::info!("Refusing new calls");
        self.accepting.store(false, Ordering::Release);

        // === Phase 1: Wait for in-flight streams to drain ===
        tracing::info!("Draining in-flight streams ({} active)", self.inflight());
        let drained = timeout(self.shutdown_timeout, async {
            while self.inflight() > 0 {
                sleep(Duration::from_millis(50)).await;
            }
        })
        .await;

        match drained {
            Ok(()) => tracing::debug!("All in-flight streams drained"),
            Err(_) => tracing::warn!(
                "Graceful drain timed out ({} streams still active)",
                self.inflight()
            ),
        }

        // === Phase 2: Cancel anything still running ===
        self.shutdown_token.cancel();
        tracing::info!("Call tracker shutdown complete");
    }
}
