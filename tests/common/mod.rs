#![allow(dead_code)]

use retrier::{Classify, FailureKind, InstantSleeper, RetryPolicy, RetryPolicyBuilder};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Small exception-style hierarchy used across the integration tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Any,
    Io,
    EndOfStream,
    FileNotFound,
    InvalidOperation,
}

impl FailureKind for Kind {
    fn parent(self) -> Option<Self> {
        match self {
            Kind::Any => None,
            Kind::Io | Kind::InvalidOperation => Some(Kind::Any),
            Kind::EndOfStream | Kind::FileNotFound => Some(Kind::Io),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct Failure {
    pub kind: Kind,
    pub message: String,
    pub cause: Option<Box<Failure>>,
}

impl Failure {
    pub fn new(kind: Kind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), cause: None }
    }

    pub fn wrapping(kind: Kind, cause: Failure) -> Self {
        Self { kind, message: format!("wraps {}", cause.message), cause: Some(Box::new(cause)) }
    }
}

impl Classify for Failure {
    type Kind = Kind;

    fn kind(&self) -> Kind {
        self.kind
    }

    fn cause(&self) -> Option<&Self> {
        self.cause.as_deref()
    }

    fn into_cause(self) -> Result<Self, Self> {
        let Failure { kind, message, cause } = self;
        match cause {
            Some(cause) => Ok(*cause),
            None => Err(Failure { kind, message, cause: None }),
        }
    }
}

/// Builder that never actually sleeps.
pub fn instant() -> RetryPolicyBuilder<Failure> {
    RetryPolicy::builder().with_sleeper(InstantSleeper)
}

/// Invocation counter shared between a test and its work closure.
#[derive(Debug, Clone, Default)]
pub struct Calls(Arc<AtomicUsize>);

impl Calls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an invocation, returning its zero-based index.
    pub fn hit(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst)
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}
