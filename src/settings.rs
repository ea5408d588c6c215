//! Declarative retry settings.
//!
//! `RetrySettings` describes the value-typed part of a retry configuration so it can live in a
//! config file. Converting it to a builder runs every builder validation, so a bad file fails
//! the same way a bad builder call does. Handlers, sleepers and random factories stay in
//! code and are added to the returned builder.
//!
//! With the `serde` feature enabled the settings (de)serialize, e.g. from JSON:
//!
//! ```json
//! { "max_attempts": 5, "initial_delay_secs": 0.1, "max_delay_secs": 10.0,
//!   "backoff": { "strategy": "stochastic", "min_multiplier": 1.5, "max_multiplier": 2.5 } }
//! ```

use crate::backoff::{DEFAULT_MAX_MULTIPLIER, DEFAULT_MIN_MULTIPLIER, DEFAULT_MULTIPLIER};
use crate::error::ConfigError;
use crate::policy::Classify;
use crate::retry::{
    RetryPolicyBuilder, DEFAULT_INITIAL_DELAY, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY,
};

/// Delay-growth strategy selection.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "strategy", rename_all = "snake_case")
)]
pub enum BackoffSettings {
    Exponential { multiplier: f64 },
    Stochastic { min_multiplier: f64, max_multiplier: f64 },
}

impl Default for BackoffSettings {
    fn default() -> Self {
        BackoffSettings::Exponential { multiplier: DEFAULT_MULTIPLIER }
    }
}

impl BackoffSettings {
    /// Stochastic strategy over the default `[1.5, 2.5)` range.
    pub fn stochastic() -> Self {
        BackoffSettings::Stochastic {
            min_multiplier: DEFAULT_MIN_MULTIPLIER,
            max_multiplier: DEFAULT_MAX_MULTIPLIER,
        }
    }
}

/// Value-typed retry configuration.
///
/// `max_attempts` is signed so a negative value from a config source is reported as a
/// configuration error rather than failing to parse.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(default))]
pub struct RetrySettings {
    pub max_attempts: i64,
    pub initial_delay_secs: f64,
    pub max_delay_secs: f64,
    pub backoff: BackoffSettings,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS as i64,
            initial_delay_secs: DEFAULT_INITIAL_DELAY.as_secs_f64(),
            max_delay_secs: DEFAULT_MAX_DELAY.as_secs_f64(),
            backoff: BackoffSettings::default(),
        }
    }
}

impl RetrySettings {
    /// Apply the settings to an existing builder.
    ///
    /// Configure the random factory on `builder` beforehand if the stochastic strategy must be
    /// reproducible.
    pub fn apply<E: Classify>(
        &self,
        builder: RetryPolicyBuilder<E>,
    ) -> Result<RetryPolicyBuilder<E>, ConfigError> {
        let builder = builder
            .max_attempts(self.max_attempts)?
            .initial_delay_secs(self.initial_delay_secs)?
            .max_delay_secs(self.max_delay_secs)?;
        match self.backoff {
            BackoffSettings::Exponential { multiplier } => builder.exponential_backoff(multiplier),
            BackoffSettings::Stochastic { min_multiplier, max_multiplier } => {
                builder.stochastic_backoff(min_multiplier, max_multiplier)
            }
        }
    }

    /// Build a fresh builder from the settings.
    pub fn into_builder<E: Classify>(self) -> Result<RetryPolicyBuilder<E>, ConfigError> {
        self.apply(RetryPolicyBuilder::new())
    }
}
