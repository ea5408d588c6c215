//! Operations on possibly-absent retrier handles.
//!
//! A retrier is often held as an `Option` (lazily configured, injected, or taken out of a
//! larger struct). Calling a builder or execution operation through an empty handle fails
//! with [`UsageError::MissingReceiver`], never with a panic, and is distinguishable from a
//! rejected argument.
//!
//! ```rust
//! use retrier::{BuilderHandle, Classify, ConfigError, FailureKind, RetryPolicyBuilder};
//!
//! # #[derive(Debug, Clone, Copy, PartialEq, Eq)] struct K;
//! # impl FailureKind for K { fn parent(self) -> Option<Self> { None } }
//! # struct Failure;
//! # impl Classify for Failure { type Kind = K; fn kind(&self) -> K { K } }
//! let handle: Option<RetryPolicyBuilder<Failure>> = None;
//! let err = handle.max_attempts(3).unwrap_err();
//! assert!(err.is_missing_receiver());
//! ```

use crate::backoff::Backoff;
use crate::error::{ConfigError, RetryError, UsageError};
use crate::policy::{Classify, RetryAction};
use crate::random::RandomFactory;
use crate::retry::{RetryPolicy, RetryPolicyBuilder};
use crate::sleeper::Sleeper;
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn missing(operation: &'static str) -> UsageError {
    UsageError::MissingReceiver { operation }
}

/// Builder operations on an optional [`RetryPolicyBuilder`].
pub trait BuilderHandle<E: Classify> {
    /// Return the builder, or `MissingReceiver` naming `operation`.
    fn receiver(self, operation: &'static str) -> Result<RetryPolicyBuilder<E>, ConfigError>;

    fn max_attempts<N>(self, attempts: N) -> Result<RetryPolicyBuilder<E>, ConfigError>
    where
        Self: Sized,
        N: TryInto<usize> + fmt::Display + Copy,
    {
        self.receiver("max_attempts")?.max_attempts(attempts)
    }

    fn initial_delay(self, delay: Duration) -> Result<RetryPolicyBuilder<E>, ConfigError>
    where
        Self: Sized,
    {
        self.receiver("initial_delay")?.initial_delay(delay)
    }

    fn initial_delay_secs(self, secs: f64) -> Result<RetryPolicyBuilder<E>, ConfigError>
    where
        Self: Sized,
    {
        self.receiver("initial_delay_secs")?.initial_delay_secs(secs)
    }

    fn max_delay(self, delay: Duration) -> Result<RetryPolicyBuilder<E>, ConfigError>
    where
        Self: Sized,
    {
        self.receiver("max_delay")?.max_delay(delay)
    }

    fn max_delay_secs(self, secs: f64) -> Result<RetryPolicyBuilder<E>, ConfigError>
    where
        Self: Sized,
    {
        self.receiver("max_delay_secs")?.max_delay_secs(secs)
    }

    fn exponential_backoff(self, multiplier: f64) -> Result<RetryPolicyBuilder<E>, ConfigError>
    where
        Self: Sized,
    {
        self.receiver("exponential_backoff")?.exponential_backoff(multiplier)
    }

    fn stochastic_backoff(self, min: f64, max: f64) -> Result<RetryPolicyBuilder<E>, ConfigError>
    where
        Self: Sized,
    {
        self.receiver("stochastic_backoff")?.stochastic_backoff(min, max)
    }

    fn backoff(self, backoff: Backoff) -> Result<RetryPolicyBuilder<E>, ConfigError>
    where
        Self: Sized,
    {
        Ok(self.receiver("backoff")?.backoff(backoff))
    }

    fn with_sleeper<S>(self, sleeper: S) -> Result<RetryPolicyBuilder<E>, ConfigError>
    where
        Self: Sized,
        S: Sleeper + 'static,
    {
        Ok(self.receiver("with_sleeper")?.with_sleeper(sleeper))
    }

    fn with_random_factory(
        self,
        factory: RandomFactory,
    ) -> Result<RetryPolicyBuilder<E>, ConfigError>
    where
        Self: Sized,
    {
        Ok(self.receiver("with_random_factory")?.with_random_factory(factory))
    }

    fn handle(
        self,
        kind: E::Kind,
        action: RetryAction,
    ) -> Result<RetryPolicyBuilder<E>, ConfigError>
    where
        Self: Sized,
    {
        Ok(self.receiver("handle")?.handle(kind, action))
    }

    fn handle_with<F>(self, kind: E::Kind, decide: F) -> Result<RetryPolicyBuilder<E>, ConfigError>
    where
        Self: Sized,
        F: Fn(&E) -> RetryAction + Send + Sync + 'static,
    {
        Ok(self.receiver("handle_with")?.handle_with(kind, decide))
    }

    fn fail_on(self, kind: E::Kind) -> Result<RetryPolicyBuilder<E>, ConfigError>
    where
        Self: Sized,
    {
        Ok(self.receiver("fail_on")?.fail_on(kind))
    }

    fn build(self) -> Result<RetryPolicy<E>, ConfigError>
    where
        Self: Sized,
    {
        Ok(self.receiver("build")?.build())
    }
}

impl<E: Classify> BuilderHandle<E> for Option<RetryPolicyBuilder<E>> {
    fn receiver(self, operation: &'static str) -> Result<RetryPolicyBuilder<E>, ConfigError> {
        self.ok_or_else(|| missing(operation).into())
    }
}

/// Execution operations on an optional [`RetryPolicy`] reference.
pub trait PolicyHandle<'a, E: Classify + 'a> {
    /// Return the policy, or `MissingReceiver` naming `operation`.
    fn receiver(self, operation: &'static str) -> Result<&'a RetryPolicy<E>, UsageError>;

    fn execute<T, Fut, Op>(self, operation: Op) -> BoxFuture<'a, Result<Option<T>, RetryError<E>>>
    where
        Self: Sized,
        E: Send + Sync + 'a,
        T: Send + 'a,
        Fut: Future<Output = Result<T, E>> + Send + 'a,
        Op: FnMut() -> Fut + Send + 'a,
    {
        match self.receiver("execute") {
            Ok(policy) => Box::pin(policy.execute(operation)),
            Err(e) => Box::pin(futures::future::ready(Err(e.into()))),
        }
    }

    fn execute_with_cancel<T, Fut, Op>(
        self,
        operation: Op,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Option<T>, RetryError<E>>>
    where
        Self: Sized,
        E: Send + Sync + 'a,
        T: Send + 'a,
        Fut: Future<Output = Result<T, E>> + Send + 'a,
        Op: FnMut(CancellationToken) -> Fut + Send + 'a,
    {
        match self.receiver("execute_with_cancel") {
            Ok(policy) => Box::pin(policy.execute_with_cancel(operation, cancel)),
            Err(e) => Box::pin(futures::future::ready(Err(e.into()))),
        }
    }

    fn run<Fut, Op>(self, operation: Op) -> BoxFuture<'a, Result<(), RetryError<E>>>
    where
        Self: Sized,
        E: Send + Sync + 'a,
        Fut: Future<Output = Result<(), E>> + Send + 'a,
        Op: FnMut() -> Fut + Send + 'a,
    {
        match self.receiver("run") {
            Ok(policy) => Box::pin(policy.run(operation)),
            Err(e) => Box::pin(futures::future::ready(Err(e.into()))),
        }
    }

    fn run_with_cancel<Fut, Op>(
        self,
        operation: Op,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<(), RetryError<E>>>
    where
        Self: Sized,
        E: Send + Sync + 'a,
        Fut: Future<Output = Result<(), E>> + Send + 'a,
        Op: FnMut(CancellationToken) -> Fut + Send + 'a,
    {
        match self.receiver("run_with_cancel") {
            Ok(policy) => Box::pin(policy.run_with_cancel(operation, cancel)),
            Err(e) => Box::pin(futures::future::ready(Err(e.into()))),
        }
    }

    fn execute_blocking<T, Op>(self, operation: Op) -> Result<Option<T>, RetryError<E>>
    where
        Self: Sized,
        T: Send,
        E: Send + Sync,
        Op: FnMut() -> Result<T, E> + Send,
    {
        self.receiver("execute_blocking")?.execute_blocking(operation)
    }

    fn execute_blocking_with_cancel<T, Op>(
        self,
        operation: Op,
        cancel: &CancellationToken,
    ) -> Result<Option<T>, RetryError<E>>
    where
        Self: Sized,
        T: Send,
        E: Send + Sync,
        Op: FnMut(&CancellationToken) -> Result<T, E> + Send,
    {
        self.receiver("execute_blocking_with_cancel")?
            .execute_blocking_with_cancel(operation, cancel)
    }

    fn run_blocking<Op>(self, operation: Op) -> Result<(), RetryError<E>>
    where
        Self: Sized,
        E: Send + Sync,
        Op: FnMut() -> Result<(), E> + Send,
    {
        self.receiver("run_blocking")?.run_blocking(operation)
    }
}

impl<'a, E: Classify + 'a> PolicyHandle<'a, E> for Option<&'a RetryPolicy<E>> {
    fn receiver(self, operation: &'static str) -> Result<&'a RetryPolicy<E>, UsageError> {
        self.ok_or_else(|| missing(operation))
    }
}
