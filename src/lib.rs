#![forbid(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # retrier
//!
//! Configurable retry executor with exponential or randomized backoff and per-failure-kind
//! handling policies.
//!
//! ## Features
//!
//! - **Backoff strategies**: fixed-multiplier exponential, stochastic (random factor per step),
//!   or any custom function
//! - **Policy table** mapping failure kinds to `Stop`, `Throw` or `Continue`, matched against
//!   the failure and its immediate cause
//! - **Aggregated failures** when every attempt fails
//! - **Cancellation** via `tokio_util::sync::CancellationToken`
//! - **Sync and async** entry points, plus a tower layer
//!
//! ## Quick Start
//!
//! ```rust
//! use retrier::{Classify, FailureKind, RetryAction, RetryPolicy};
//! use std::time::Duration;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! enum Kind { Any, Io, NotFound }
//!
//! impl FailureKind for Kind {
//!     fn parent(self) -> Option<Self> {
//!         match self {
//!             Kind::Any => None,
//!             Kind::Io | Kind::NotFound => Some(Kind::Any),
//!         }
//!     }
//! }
//!
//! #[derive(Debug)]
//! struct AppError(Kind);
//!
//! impl Classify for AppError {
//!     type Kind = Kind;
//!     fn kind(&self) -> Kind { self.0 }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let policy = RetryPolicy::<AppError>::builder()
//!         .max_attempts(5).unwrap()
//!         .initial_delay(Duration::from_millis(1)).unwrap()
//!         .handle(Kind::NotFound, RetryAction::Stop)
//!         .build();
//!
//!     let result = policy.execute(|| async {
//!         // Your async operation here
//!         Ok::<_, AppError>(42)
//!     }).await;
//!     assert_eq!(result.unwrap(), Some(42));
//! }
//! ```

pub mod backoff;
pub mod error;
pub mod handle;
pub mod layer;
pub mod policy;
pub mod prelude;
pub mod random;
pub mod retry;
pub mod settings;
pub mod sleeper;

// Re-exports
pub use backoff::{Backoff, BackoffStrategy};
pub use error::{Cancelled, ConfigError, RetryError, UsageError};
pub use handle::{BuilderHandle, PolicyHandle};
pub use layer::{RetryLayer, RetryService};
pub use policy::{Classify, FailureKind, PolicyTable, RetryAction, Subject, Verdict};
pub use random::{RandomFactory, RandomSource};
pub use retry::{RetryPolicy, RetryPolicyBuilder};
pub use settings::{BackoffSettings, RetrySettings};
pub use sleeper::{InstantSleeper, SleepFuture, Sleeper, TokioSleeper, TrackingSleeper};
pub use tokio_util::sync::CancellationToken;
