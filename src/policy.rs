//! Failure classification and the ordered policy table.
//!
//! Failures are matched by *kind*, not by exact type. A [`FailureKind`] declares its parent,
//! so a handler registered for a parent kind also matches every descendant. A failure exposes
//! its kind and, optionally, the immediate cause it wraps through [`Classify`].
//!
//! Dispatch rules:
//! - The outer failure is inspected first, then its immediate cause (skipped when the cause
//!   is the failure itself).
//! - For each inspected value the first registered entry whose kind it is a kind of decides.
//! - `Stop` and `Throw` end the inspection; `Continue` moves on to the next inspected value.
//! - With no matching entry the failure is retried.
//!
//! Example
//! ```rust
//! use retrier::{Classify, FailureKind, PolicyTable, RetryAction};
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! enum Kind { Io, Timeout }
//!
//! impl FailureKind for Kind {
//!     fn parent(self) -> Option<Self> {
//!         match self {
//!             Kind::Timeout => Some(Kind::Io),
//!             Kind::Io => None,
//!         }
//!     }
//! }
//!
//! struct Failure(Kind);
//! impl Classify for Failure {
//!     type Kind = Kind;
//!     fn kind(&self) -> Kind { self.0 }
//! }
//!
//! let mut table = PolicyTable::<Failure>::new();
//! table.push(Kind::Io, |_: &Failure| RetryAction::Throw);
//! assert!(table.decide(&Failure(Kind::Timeout)).is_throw());
//! ```

use std::fmt;
use std::sync::Arc;

/// Decision returned by a policy entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RetryAction {
    /// Abort the execution without propagating the failure.
    Stop,
    /// Abort the execution, propagating the failure.
    Throw,
    /// Record the failure and proceed to the next attempt.
    Continue,
}

/// A category in a caller-defined failure taxonomy.
///
/// Parent chains must be finite and acyclic.
pub trait FailureKind: Copy + Eq + fmt::Debug + Send + Sync + 'static {
    /// The kind this kind specializes, if any.
    fn parent(self) -> Option<Self>;

    /// Check whether `self` is `ancestor` or descends from it.
    fn is_kind_of(self, ancestor: Self) -> bool {
        let mut current = Some(self);
        while let Some(kind) = current {
            if kind == ancestor {
                return true;
            }
            current = kind.parent();
        }
        false
    }
}

/// Exposes a failure's kind and the immediate cause it wraps.
pub trait Classify {
    type Kind: FailureKind;

    fn kind(&self) -> Self::Kind;

    /// Immediate cause of this failure. May return `self`.
    fn cause(&self) -> Option<&Self> {
        None
    }

    /// Take ownership of the immediate cause, or hand `self` back when there is none.
    /// Must agree with [`Classify::cause`].
    fn into_cause(self) -> Result<Self, Self>
    where
        Self: Sized,
    {
        Err(self)
    }
}

/// Which inspected value a decision was reached for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject {
    /// The failure returned by the work.
    Failure,
    /// The immediate cause wrapped by that failure.
    Cause,
}

/// Result of running a failure through a [`PolicyTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Record the failure and retry.
    Continue,
    /// End the execution successfully without a value.
    Stop,
    /// End the execution with the inspected value named by `Subject`.
    Throw(Subject),
}

impl Verdict {
    pub fn is_continue(&self) -> bool {
        matches!(self, Verdict::Continue)
    }

    pub fn is_stop(&self) -> bool {
        matches!(self, Verdict::Stop)
    }

    pub fn is_throw(&self) -> bool {
        matches!(self, Verdict::Throw(_))
    }
}

type Decide<E> = Arc<dyn Fn(&E) -> RetryAction + Send + Sync>;

struct PolicyEntry<E: Classify> {
    kind: E::Kind,
    decide: Decide<E>,
}

impl<E: Classify> Clone for PolicyEntry<E> {
    fn clone(&self) -> Self {
        Self { kind: self.kind, decide: self.decide.clone() }
    }
}

/// Ordered `(kind, decision)` entries; registration order is significant.
pub struct PolicyTable<E: Classify> {
    entries: Vec<PolicyEntry<E>>,
}

impl<E: Classify> PolicyTable<E> {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Append an entry. Earlier entries take precedence.
    pub fn push<F>(&mut self, kind: E::Kind, decide: F)
    where
        F: Fn(&E) -> RetryAction + Send + Sync + 'static,
    {
        self.entries.push(PolicyEntry { kind, decide: Arc::new(decide) });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn first_match(&self, inspected: &E) -> Option<RetryAction> {
        let kind = inspected.kind();
        self.entries
            .iter()
            .find(|entry| kind.is_kind_of(entry.kind))
            .map(|entry| (entry.decide)(inspected))
    }

    /// Classify a failure according to the table.
    pub fn decide(&self, failure: &E) -> Verdict {
        let cause = failure.cause().filter(|cause| !std::ptr::eq(*cause, failure));
        let inspected = std::iter::once((Subject::Failure, failure))
            .chain(cause.map(|cause| (Subject::Cause, cause)));

        for (subject, value) in inspected {
            match self.first_match(value) {
                Some(RetryAction::Stop) => return Verdict::Stop,
                Some(RetryAction::Throw) => return Verdict::Throw(subject),
                Some(RetryAction::Continue) | None => {}
            }
        }
        Verdict::Continue
    }
}

impl<E: Classify> Default for PolicyTable<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Classify> Clone for PolicyTable<E> {
    fn clone(&self) -> Self {
        Self { entries: self.entries.clone() }
    }
}

impl<E: Classify> fmt::Debug for PolicyTable<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.iter().map(|entry| entry.kind)).finish()
    }
}
