//! Abstraction for sleeping/waiting between attempts
//!
//! Enables fast, deterministic tests without real time delays. Every sleeper observes the
//! cancellation token it is handed and resolves to `Err(Cancelled)` as soon as the token
//! fires.

use crate::error::Cancelled;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Future returned by [`Sleeper::sleep`].
pub type SleepFuture = Pin<Box<dyn Future<Output = Result<(), Cancelled>> + Send>>;

/// Abstraction for sleeping/waiting
pub trait Sleeper: Send + Sync + std::fmt::Debug {
    fn sleep(&self, duration: Duration, cancel: &CancellationToken) -> SleepFuture;
}

/// Production sleeper using the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration, cancel: &CancellationToken) -> SleepFuture {
        let cancel = cancel.clone();
        Box::pin(async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(Cancelled),
                _ = tokio::time::sleep(duration) => Ok(()),
            }
        })
    }
}

/// Test sleeper that doesn't actually sleep
#[derive(Debug, Default, Clone, Copy)]
pub struct InstantSleeper;

impl Sleeper for InstantSleeper {
    fn sleep(&self, _duration: Duration, cancel: &CancellationToken) -> SleepFuture {
        let outcome = if cancel.is_cancelled() { Err(Cancelled) } else { Ok(()) };
        Box::pin(async move { outcome })
    }
}

/// Test sleeper that records every requested delay without waiting
#[derive(Debug, Clone, Default)]
pub struct TrackingSleeper {
    calls: Arc<Mutex<Vec<Duration>>>,
}

impl TrackingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every delay requested so far, in order.
    pub fn calls(&self) -> Vec<Duration> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Sum of every delay requested so far.
    pub fn total(&self) -> Duration {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).iter().sum()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl Sleeper for TrackingSleeper {
    fn sleep(&self, duration: Duration, cancel: &CancellationToken) -> SleepFuture {
        if cancel.is_cancelled() {
            return Box::pin(async { Err(Cancelled) });
        }
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(duration);
        Box::pin(async { Ok(()) })
    }
}
