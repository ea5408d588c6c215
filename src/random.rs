//! Pluggable source of randomness for stochastic backoff.
//!
//! The factory is asked for a new source once per stochastic strategy registration; that
//! source then serves every delay computation of the strategy. Injecting
//! [`RandomFactory::seeded`] makes delay sequences reproducible.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::fmt;
use std::sync::Arc;

/// A random-number source handed out by a [`RandomFactory`].
pub type RandomSource = Box<dyn RngCore + Send>;

/// Produces fresh random sources on demand.
#[derive(Clone)]
pub struct RandomFactory {
    make: Arc<dyn Fn() -> RandomSource + Send + Sync>,
}

impl RandomFactory {
    /// Wrap a closure producing random sources.
    pub fn new<F>(make: F) -> Self
    where
        F: Fn() -> RandomSource + Send + Sync + 'static,
    {
        Self { make: Arc::new(make) }
    }

    /// Sources seeded from the operating system; every source differs.
    pub fn os_seeded() -> Self {
        Self::new(|| Box::new(StdRng::from_os_rng()))
    }

    /// Sources that all start from `seed`, so each yields the same sequence.
    pub fn seeded(seed: u64) -> Self {
        Self::new(move || Box::new(StdRng::seed_from_u64(seed)))
    }

    /// Create a new source.
    pub fn create(&self) -> RandomSource {
        (self.make)()
    }
}

impl Default for RandomFactory {
    fn default() -> Self {
        Self::os_seeded()
    }
}

impl fmt::Debug for RandomFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomFactory").field("make", &"<factory>").finish()
    }
}
