//! Convenient re-exports for common retrier types.
pub use crate::{
    backoff::{
        Backoff, BackoffStrategy, DEFAULT_MAX_MULTIPLIER, DEFAULT_MIN_MULTIPLIER,
        DEFAULT_MULTIPLIER,
    },
    error::{ConfigError, RetryError, UsageError},
    handle::{BuilderHandle, PolicyHandle},
    layer::{RetryLayer, RetryService},
    policy::{Classify, FailureKind, RetryAction},
    retry::{
        RetryPolicy, RetryPolicyBuilder, DEFAULT_INITIAL_DELAY, DEFAULT_MAX_ATTEMPTS,
        DEFAULT_MAX_DELAY,
    },
    settings::{BackoffSettings, RetrySettings},
    CancellationToken,
};
