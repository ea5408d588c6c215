//! Error types for the retrier.
//!
//! Three categories are kept apart so callers can branch on them:
//! - [`ConfigError`]: a builder call received a bad value (returned by that call).
//! - [`UsageError`]: the API was misused, e.g. an operation on an absent handle.
//! - [`RetryError`]: what an execution ends with when it does not succeed.
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A builder argument failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The named argument is out of range.
    #[error("invalid argument `{argument}`: {reason}")]
    InvalidArgument { argument: &'static str, reason: String },
    /// The builder operation itself was misused.
    #[error(transparent)]
    Usage(#[from] UsageError),
}

impl ConfigError {
    pub(crate) fn invalid(argument: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidArgument { argument, reason: reason.into() }
    }

    /// Check if this error is an argument-validation failure.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }

    /// Check if this error reports an operation on an absent handle.
    pub fn is_missing_receiver(&self) -> bool {
        matches!(self, Self::Usage(UsageError::MissingReceiver { .. }))
    }
}

/// Programmer misuse of the API, as opposed to a bad configuration value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    /// An operation was invoked on a handle that holds no retrier.
    #[error("`{operation}` called on an absent retrier")]
    MissingReceiver { operation: &'static str },
    /// The private runtime backing a blocking entry point could not start.
    #[error("failed to start runtime for blocking execution: {reason}")]
    RuntimeUnavailable { reason: String },
}

/// Returned by a [`Sleeper`](crate::Sleeper) whose wait was interrupted by cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("sleep cancelled")]
pub struct Cancelled;

/// Terminal failure of an execution.
#[derive(Debug, Clone)]
pub enum RetryError<E> {
    /// A `Throw` decision selected this failure; retry history is not attached.
    Inner(E),
    /// Cancellation was observed before the execution could finish.
    Cancelled { attempts: usize },
    /// Every attempt failed; `failures` holds one entry per attempt, in attempt order.
    RetryExhausted { attempts: usize, failures: Arc<Vec<E>> },
    /// The execution operation was misused.
    Usage(UsageError),
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inner(e) => write!(f, "{}", e),
            Self::Cancelled { attempts } => {
                write!(f, "retry cancelled after {} attempts", attempts)
            }
            Self::RetryExhausted { attempts, failures } => {
                if let Some(last) = failures.last() {
                    write!(f, "retry exhausted after {} attempts; last error: {}", attempts, last)
                } else {
                    write!(f, "retry exhausted after {} attempts; no recorded failures", attempts)
                }
            }
            Self::Usage(e) => write!(f, "{}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Inner(e) => Some(e),
            Self::RetryExhausted { failures, .. } => {
                failures.last().map(|e| e as &dyn std::error::Error)
            }
            Self::Usage(e) => Some(e),
            Self::Cancelled { .. } => None,
        }
    }
}

impl<E> From<UsageError> for RetryError<E> {
    fn from(err: UsageError) -> Self {
        RetryError::Usage(err)
    }
}

impl<E> RetryError<E> {
    pub(crate) fn retry_exhausted(attempts: usize, failures: Vec<E>) -> Self {
        RetryError::RetryExhausted { attempts, failures: Arc::new(failures) }
    }

    /// Check if every attempt was used up.
    pub fn is_retry_exhausted(&self) -> bool {
        matches!(self, Self::RetryExhausted { .. })
    }

    /// Check if the execution was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Check if this error carries a failure selected by a `Throw` decision.
    pub fn is_inner(&self) -> bool {
        matches!(self, Self::Inner(_))
    }

    /// Check if this error reports API misuse.
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage(_))
    }

    /// Get the thrown failure if this is an `Inner` variant.
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Inner(e) => Some(e),
            _ => None,
        }
    }

    /// Borrow the thrown failure if present.
    pub fn as_inner(&self) -> Option<&E> {
        match self {
            Self::Inner(e) => Some(e),
            _ => None,
        }
    }

    /// Access every recorded failure of an exhausted execution.
    pub fn failures(&self) -> Option<&[E]> {
        match self {
            Self::RetryExhausted { failures, .. } => Some(failures.as_slice()),
            _ => None,
        }
    }

    /// Borrow the usage error if present.
    pub fn as_usage(&self) -> Option<&UsageError> {
        match self {
            Self::Usage(e) => Some(e),
            _ => None,
        }
    }
}
