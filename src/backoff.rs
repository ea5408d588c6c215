//! Backoff strategies for retry policies.
//!
//! A strategy maps the delay just slept to the delay before the next attempt. The retry loop
//! owns the cap: it clamps whatever a strategy returns to the configured maximum delay.
//!
//! - Exponential: `next = current × multiplier` (default multiplier 2).
//! - Stochastic: `next = current × (min + r × (max − min))`, with `r ∈ [0, 1)` drawn anew for
//!   every computation from a random source fixed when the strategy is created.
//! - Custom: any `Fn(Duration) -> Duration`.
//!
//! Example
//! ```rust
//! use std::time::Duration;
//! use retrier::Backoff;
//!
//! let backoff = Backoff::exponential(3.0).unwrap();
//! assert_eq!(backoff.next_delay(Duration::from_secs(1)), Duration::from_secs(3));
//! assert_eq!(backoff.next_delay(Duration::from_secs(3)), Duration::from_secs(9));
//! ```
//!
//! Overflow behavior: products that do not fit a `Duration` saturate to `Duration::MAX`.

use crate::error::ConfigError;
use crate::random::RandomSource;
use rand::Rng;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Multiplier of the default exponential strategy.
pub const DEFAULT_MULTIPLIER: f64 = 2.0;

/// Default lower bound of the stochastic multiplier range.
pub const DEFAULT_MIN_MULTIPLIER: f64 = 1.5;

/// Default upper bound (exclusive) of the stochastic multiplier range.
pub const DEFAULT_MAX_MULTIPLIER: f64 = 2.5;

/// Trait implemented by all backoff strategies.
pub trait BackoffStrategy: Send + Sync + fmt::Debug {
    fn next_delay(&self, current: Duration) -> Duration;
}

fn scale(current: Duration, factor: f64) -> Duration {
    Duration::try_from_secs_f64(current.as_secs_f64() * factor).unwrap_or(Duration::MAX)
}

fn check_multiplier(argument: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(argument, format!("must be finite and > 0 (got {})", value)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ExponentialBackoff {
    multiplier: f64,
}

impl BackoffStrategy for ExponentialBackoff {
    fn next_delay(&self, current: Duration) -> Duration {
        scale(current, self.multiplier)
    }
}

struct StochasticBackoff {
    min: f64,
    max: f64,
    source: Mutex<RandomSource>,
}

impl fmt::Debug for StochasticBackoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StochasticBackoff")
            .field("min", &self.min)
            .field("max", &self.max)
            .field("source", &"<rng>")
            .finish()
    }
}

impl BackoffStrategy for StochasticBackoff {
    fn next_delay(&self, current: Duration) -> Duration {
        let r: f64 = self.source.lock().unwrap_or_else(PoisonError::into_inner).random();
        scale(current, self.min + r * (self.max - self.min))
    }
}

#[derive(Clone)]
struct CustomBackoff(Arc<dyn Fn(Duration) -> Duration + Send + Sync>);

impl fmt::Debug for CustomBackoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomBackoff(<fn>)")
    }
}

impl BackoffStrategy for CustomBackoff {
    fn next_delay(&self, current: Duration) -> Duration {
        (self.0)(current)
    }
}

#[derive(Debug, Clone)]
enum BackoffKind {
    Exponential(ExponentialBackoff),
    // Shared so every clone of a policy draws from the one source.
    Stochastic(Arc<StochasticBackoff>),
    Custom(CustomBackoff),
}

impl BackoffStrategy for BackoffKind {
    fn next_delay(&self, current: Duration) -> Duration {
        match self {
            BackoffKind::Exponential(e) => e.next_delay(current),
            BackoffKind::Stochastic(s) => s.next_delay(current),
            BackoffKind::Custom(c) => c.next_delay(current),
        }
    }
}

/// Delay-growth strategy used between attempts.
#[derive(Debug, Clone)]
pub struct Backoff {
    kind: BackoffKind,
}

impl Backoff {
    /// Double the delay after every attempt. This is the default.
    pub fn doubling() -> Self {
        let exponential = ExponentialBackoff { multiplier: DEFAULT_MULTIPLIER };
        Self { kind: BackoffKind::Exponential(exponential) }
    }

    /// Multiply the delay by a fixed `multiplier` after every attempt.
    pub fn exponential(multiplier: f64) -> Result<Self, ConfigError> {
        check_multiplier("multiplier", multiplier)?;
        Ok(Self { kind: BackoffKind::Exponential(ExponentialBackoff { multiplier }) })
    }

    /// Multiply the delay by a factor drawn uniformly from `[min, max)` after every attempt.
    ///
    /// `source` is kept for the lifetime of the strategy and consulted once per delay.
    pub fn stochastic(min: f64, max: f64, source: RandomSource) -> Result<Self, ConfigError> {
        check_multiplier("min_multiplier", min)?;
        check_multiplier("max_multiplier", max)?;
        if min > max {
            return Err(ConfigError::invalid(
                "min_multiplier",
                format!("must not exceed max_multiplier ({} > {})", min, max),
            ));
        }
        Ok(Self {
            kind: BackoffKind::Stochastic(Arc::new(StochasticBackoff {
                min,
                max,
                source: Mutex::new(source),
            })),
        })
    }

    /// Compute the next delay with an arbitrary function.
    pub fn custom<F>(next: F) -> Self
    where
        F: Fn(Duration) -> Duration + Send + Sync + 'static,
    {
        Self { kind: BackoffKind::Custom(CustomBackoff(Arc::new(next))) }
    }

    /// Delay to use after `current`, before any maximum-delay clamp.
    pub fn next_delay(&self, current: Duration) -> Duration {
        self.kind.next_delay(current)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::doubling()
    }
}

impl BackoffStrategy for Backoff {
    fn next_delay(&self, current: Duration) -> Duration {
        self.kind.next_delay(current)
    }
}
