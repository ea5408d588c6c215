//! Retry policy implementation
//!
//! Retry executor for fallible work, sync or async.
//!
//! Semantics:
//! - `max_attempts` counts total attempts (initial try + retries); `0` never runs the work.
//! - Before every attempt but the first the executor sleeps for the current delay, then
//!   advances the delay with the backoff strategy and clamps it to `max_delay`. The first
//!   sleep is always `initial_delay`, unclamped.
//! - Each failure goes through the [`PolicyTable`]: `Stop` ends successfully without a value,
//!   `Throw` ends with that failure (or its cause), `Continue` records it and retries.
//! - Cancellation is checked while sleeping and right before each attempt.
//!
//! Invariants:
//! - Attempts never exceed `max_attempts`.
//! - `RetryExhausted` holds exactly one failure per attempt, in attempt order.
//! - Configuration is immutable once `build()` returns.
//!
//! Example
//! ```rust
//! use std::time::Duration;
//! use retrier::{Classify, FailureKind, RetryAction, RetryPolicy, RetryError};
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! enum Kind { Transient, Fatal }
//! impl FailureKind for Kind {
//!     fn parent(self) -> Option<Self> { None }
//! }
//!
//! #[derive(Debug)]
//! struct MyErr(Kind);
//! impl Classify for MyErr {
//!     type Kind = Kind;
//!     fn kind(&self) -> Kind { self.0 }
//! }
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let policy = RetryPolicy::<MyErr>::builder()
//!     .max_attempts(3).unwrap()
//!     .initial_delay(Duration::from_millis(10)).unwrap()
//!     .fail_on(Kind::Fatal)
//!     .build();
//! let result: Result<Option<()>, RetryError<MyErr>> =
//!     policy.execute(|| async { Err(MyErr(Kind::Fatal)) }).await;
//! assert!(result.unwrap_err().is_inner());
//! # });
//! ```

use crate::backoff::Backoff;
use crate::error::{ConfigError, RetryError, UsageError};
use crate::policy::{Classify, PolicyTable, RetryAction, Subject, Verdict};
use crate::random::RandomFactory;
use crate::sleeper::{Sleeper, TokioSleeper};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Attempts made when `max_attempts` is not configured.
pub const DEFAULT_MAX_ATTEMPTS: usize = 10;

/// Delay before the second attempt when `initial_delay` is not configured.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(250);

/// Cap on computed delays when `max_delay` is not configured.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

struct RetryConfig<E: Classify> {
    max_attempts: usize,
    initial_delay: Duration,
    max_delay: Duration,
    backoff: Backoff,
    sleeper: Arc<dyn Sleeper>,
    random: RandomFactory,
    policies: PolicyTable<E>,
}

impl<E: Classify> fmt::Debug for RetryConfig<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryConfig")
            .field("max_attempts", &self.max_attempts)
            .field("initial_delay", &self.initial_delay)
            .field("max_delay", &self.max_delay)
            .field("backoff", &self.backoff)
            .field("sleeper", &self.sleeper)
            .field("policies", &self.policies)
            .finish()
    }
}

fn positive_delay(argument: &'static str, delay: Duration) -> Result<Duration, ConfigError> {
    if delay.is_zero() {
        return Err(ConfigError::invalid(argument, "must be greater than zero"));
    }
    Ok(delay)
}

fn delay_from_secs(argument: &'static str, secs: f64) -> Result<Duration, ConfigError> {
    if !(secs.is_finite() && secs > 0.0) {
        return Err(ConfigError::invalid(
            argument,
            format!("must be a finite number of seconds > 0 (got {})", secs),
        ));
    }
    let delay = Duration::try_from_secs_f64(secs)
        .map_err(|e| ConfigError::invalid(argument, e.to_string()))?;
    positive_delay(argument, delay)
}

/// Frozen retry configuration; cheap to clone and safe to share across tasks.
pub struct RetryPolicy<E: Classify> {
    config: Arc<RetryConfig<E>>,
}

impl<E: Classify> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self { config: self.config.clone() }
    }
}

impl<E: Classify> fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy").field("config", &self.config).finish()
    }
}

impl<E> RetryPolicy<E>
where
    E: Classify,
{
    /// Construct a new builder with defaults.
    pub fn builder() -> RetryPolicyBuilder<E> {
        RetryPolicyBuilder::new()
    }

    pub fn max_attempts(&self) -> usize {
        self.config.max_attempts
    }

    pub fn initial_delay(&self) -> Duration {
        self.config.initial_delay
    }

    pub fn max_delay(&self) -> Duration {
        self.config.max_delay
    }

    /// Execute async work, returning its value. `Ok(None)` means a `Stop` decision ended the
    /// execution.
    pub async fn execute<T, Fut, Op>(&self, mut operation: Op) -> Result<Option<T>, RetryError<E>>
    where
        Fut: Future<Output = Result<T, E>>,
        Op: FnMut() -> Fut,
    {
        let cancel = CancellationToken::new();
        self.execute_with_cancel(move |_| operation(), &cancel).await
    }

    /// Execute async work that produces no value.
    pub async fn run<Fut, Op>(&self, operation: Op) -> Result<(), RetryError<E>>
    where
        Fut: Future<Output = Result<(), E>>,
        Op: FnMut() -> Fut,
    {
        self.execute(operation).await.map(|_| ())
    }

    /// Execute async no-value work under a cancellation token.
    pub async fn run_with_cancel<Fut, Op>(
        &self,
        operation: Op,
        cancel: &CancellationToken,
    ) -> Result<(), RetryError<E>>
    where
        Fut: Future<Output = Result<(), E>>,
        Op: FnMut(CancellationToken) -> Fut,
    {
        self.execute_with_cancel(operation, cancel).await.map(|_| ())
    }

    /// Execute async work under a cancellation token. The work receives a clone of the token
    /// on every attempt.
    pub async fn execute_with_cancel<T, Fut, Op>(
        &self,
        mut operation: Op,
        cancel: &CancellationToken,
    ) -> Result<Option<T>, RetryError<E>>
    where
        Fut: Future<Output = Result<T, E>>,
        Op: FnMut(CancellationToken) -> Fut,
    {
        let config = &*self.config;
        let mut failures: Vec<E> = Vec::new();
        let mut delay = config.initial_delay;

        for attempt in 0..config.max_attempts {
            if attempt > 0 {
                if config.sleeper.sleep(delay, cancel).await.is_err() {
                    tracing::info!(attempts = attempt, "retry cancelled while waiting");
                    return Err(RetryError::Cancelled { attempts: attempt });
                }
                delay = config.backoff.next_delay(delay).min(config.max_delay);
            }

            if cancel.is_cancelled() {
                tracing::info!(attempts = attempt, "retry cancelled before attempt");
                return Err(RetryError::Cancelled { attempts: attempt });
            }

            let failure = match operation(cancel.clone()).await {
                Ok(value) => return Ok(Some(value)),
                Err(failure) => failure,
            };

            match config.policies.decide(&failure) {
                Verdict::Continue => {
                    tracing::debug!(
                        attempt = attempt + 1,
                        max_attempts = config.max_attempts,
                        kind = ?failure.kind(),
                        next_delay = ?delay,
                        "attempt failed"
                    );
                    failures.push(failure);
                }
                Verdict::Stop => {
                    tracing::info!(
                        attempt = attempt + 1,
                        kind = ?failure.kind(),
                        "retry stopped by policy"
                    );
                    return Ok(None);
                }
                Verdict::Throw(subject) => {
                    let thrown = match subject {
                        Subject::Failure => failure,
                        Subject::Cause => failure.into_cause().unwrap_or_else(|outer| outer),
                    };
                    tracing::warn!(
                        attempt = attempt + 1,
                        kind = ?thrown.kind(),
                        "retry aborted by policy"
                    );
                    return Err(RetryError::Inner(thrown));
                }
            }
        }

        tracing::warn!(attempts = config.max_attempts, "retry exhausted");
        Err(RetryError::retry_exhausted(config.max_attempts, failures))
    }

    /// Execute synchronous work, blocking the caller, and return its value.
    ///
    /// Sleeps run on a private single-threaded runtime. When the calling thread is already
    /// inside a runtime context the loop is driven on a scoped helper thread instead, and the
    /// caller blocks until it finishes.
    pub fn execute_blocking<T, Op>(&self, mut operation: Op) -> Result<Option<T>, RetryError<E>>
    where
        T: Send,
        E: Send + Sync,
        Op: FnMut() -> Result<T, E> + Send,
    {
        self.execute_blocking_with_cancel(move |_| operation(), &CancellationToken::new())
    }

    /// Execute synchronous no-value work, blocking the caller.
    pub fn run_blocking<Op>(&self, operation: Op) -> Result<(), RetryError<E>>
    where
        E: Send + Sync,
        Op: FnMut() -> Result<(), E> + Send,
    {
        self.execute_blocking(operation).map(|_| ())
    }

    /// Execute synchronous work under a cancellation token, blocking the caller.
    pub fn execute_blocking_with_cancel<T, Op>(
        &self,
        mut operation: Op,
        cancel: &CancellationToken,
    ) -> Result<Option<T>, RetryError<E>>
    where
        T: Send,
        E: Send + Sync,
        Op: FnMut(&CancellationToken) -> Result<T, E> + Send,
    {
        let mut drive = || -> Result<Option<T>, RetryError<E>> {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .map_err(|e| UsageError::RuntimeUnavailable { reason: e.to_string() })?;
            runtime.block_on(self.execute_with_cancel(
                |token| {
                    let outcome = operation(&token);
                    async move { outcome }
                },
                cancel,
            ))
        };

        if tokio::runtime::Handle::try_current().is_err() {
            return drive();
        }
        // Runtime worker threads cannot start a nested runtime.
        std::thread::scope(|scope| match scope.spawn(drive).join() {
            Ok(outcome) => outcome,
            Err(panic) => std::panic::resume_unwind(panic),
        })
    }
}

/// Builder for `RetryPolicy`.
///
/// Setters that take a value validate it immediately and return `Err` on a bad one.
/// Handler registrations append to the policy table; everything else is last-write-wins.
pub struct RetryPolicyBuilder<E: Classify> {
    config: RetryConfig<E>,
}

impl<E: Classify> fmt::Debug for RetryPolicyBuilder<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicyBuilder").field("config", &self.config).finish()
    }
}

impl<E> RetryPolicyBuilder<E>
where
    E: Classify,
{
    /// Create a builder with defaults: 10 attempts, 250ms initial delay, 30s cap, doubling.
    pub fn new() -> Self {
        Self {
            config: RetryConfig {
                max_attempts: DEFAULT_MAX_ATTEMPTS,
                initial_delay: DEFAULT_INITIAL_DELAY,
                max_delay: DEFAULT_MAX_DELAY,
                backoff: Backoff::default(),
                sleeper: Arc::new(TokioSleeper),
                random: RandomFactory::default(),
                policies: PolicyTable::new(),
            },
        }
    }

    /// Set total attempts (initial + retries). Negative counts are rejected.
    pub fn max_attempts<N>(mut self, attempts: N) -> Result<Self, ConfigError>
    where
        N: TryInto<usize> + fmt::Display + Copy,
    {
        self.config.max_attempts = attempts.try_into().map_err(|_| {
            ConfigError::invalid(
                "max_attempts",
                format!("must be greater than or equal to zero (got {})", attempts),
            )
        })?;
        Ok(self)
    }

    /// Set the delay slept before the second attempt.
    pub fn initial_delay(mut self, delay: Duration) -> Result<Self, ConfigError> {
        self.config.initial_delay = positive_delay("initial_delay", delay)?;
        Ok(self)
    }

    /// Set the initial delay in (fractional) seconds.
    pub fn initial_delay_secs(mut self, secs: f64) -> Result<Self, ConfigError> {
        self.config.initial_delay = delay_from_secs("initial_delay", secs)?;
        Ok(self)
    }

    /// Set the cap applied to every computed delay after the first.
    pub fn max_delay(mut self, delay: Duration) -> Result<Self, ConfigError> {
        self.config.max_delay = positive_delay("max_delay", delay)?;
        Ok(self)
    }

    /// Set the maximum delay in (fractional) seconds.
    pub fn max_delay_secs(mut self, secs: f64) -> Result<Self, ConfigError> {
        self.config.max_delay = delay_from_secs("max_delay", secs)?;
        Ok(self)
    }

    /// Grow the delay by a fixed `multiplier`.
    ///
    /// The default strategy uses [`DEFAULT_MULTIPLIER`](crate::backoff::DEFAULT_MULTIPLIER).
    pub fn exponential_backoff(mut self, multiplier: f64) -> Result<Self, ConfigError> {
        self.config.backoff = Backoff::exponential(multiplier)?;
        Ok(self)
    }

    /// Grow the delay by a factor drawn from `[min, max)` on every computation.
    ///
    /// A random source is requested from the configured [`RandomFactory`] once, here; call
    /// [`with_random_factory`](Self::with_random_factory) first to control it.
    pub fn stochastic_backoff(mut self, min: f64, max: f64) -> Result<Self, ConfigError> {
        self.config.backoff = Backoff::stochastic(min, max, self.config.random.create())?;
        Ok(self)
    }

    /// Install any backoff strategy.
    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.config.backoff = backoff;
        self
    }

    /// Provide a custom sleeper implementation.
    pub fn with_sleeper<S>(mut self, sleeper: S) -> Self
    where
        S: Sleeper + 'static,
    {
        self.config.sleeper = Arc::new(sleeper);
        self
    }

    /// Provide the factory used by later [`stochastic_backoff`](Self::stochastic_backoff) calls.
    pub fn with_random_factory(mut self, factory: RandomFactory) -> Self {
        self.config.random = factory;
        self
    }

    /// Decide `action` for every failure of `kind` (or a descendant kind).
    pub fn handle(self, kind: E::Kind, action: RetryAction) -> Self {
        self.handle_with(kind, move |_| action)
    }

    /// Decide per failure of `kind` (or a descendant kind) with a callback.
    pub fn handle_with<F>(mut self, kind: E::Kind, decide: F) -> Self
    where
        F: Fn(&E) -> RetryAction + Send + Sync + 'static,
    {
        self.config.policies.push(kind, decide);
        self
    }

    /// Abort and propagate on any failure of `kind` (or a descendant kind).
    pub fn fail_on(self, kind: E::Kind) -> Self {
        self.handle(kind, RetryAction::Throw)
    }

    /// Freeze the configuration.
    pub fn build(self) -> RetryPolicy<E> {
        RetryPolicy { config: Arc::new(self.config) }
    }
}

impl<E: Classify> Default for RetryPolicyBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}
