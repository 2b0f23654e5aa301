//! Context implementation for request cancellation
//!
//! This module provides the Context type which carries the cancellation
//! signal raised by `StopProvider` across async boundaries.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

/// Context carries the cancellation signal for in-flight requests
/// CRITICAL: Pass this as first parameter to ALL async trait methods
/// Clones share the same signal
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    done: watch::Receiver<bool>,
    done_tx: watch::Sender<bool>,
}

impl Context {
    pub fn new() -> Self {
        let (done_tx, done_rx) = watch::channel(false);

        Self {
            inner: Arc::new(ContextInner {
                done: done_rx,
                done_tx,
            }),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.done.borrow()
    }

    /// Returns a channel that flips to true when work done on behalf of
    /// this context should be cancelled
    pub fn done(&self) -> watch::Receiver<bool> {
        self.inner.done.clone()
    }

    pub fn cancel(&self) {
        let _ = self.inner.done_tx.send(true);
    }

    /// Resolves once the context is cancelled
    pub async fn cancelled(&self) {
        let mut done = self.done();
        while !*done.borrow_and_update() {
            if done.changed().await.is_err() {
                // the sender lives in `inner`, so this only happens on teardown
                std::future::pending::<()>().await;
            }
        }
    }

    /// Drive `future` to completion unless the context is cancelled first
    pub async fn run<F: Future>(&self, future: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.cancelled() => None,
            output = future => Some(output),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
