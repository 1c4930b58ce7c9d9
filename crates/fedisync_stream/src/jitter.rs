//! Randomized delay policies.
//!
//! Backoff and fallback polling both spread their timers with a random
//! offset. The source of randomness is a [`Jitter`] so that tests can pin it.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

/// Produces a random duration in `[0, max]`.
pub trait Jitter: Send {
    /// Returns a duration in `[0, max]`.
    fn sample(&mut self, max: Duration) -> Duration;
}

/// Uniform jitter backed by a seedable `StdRng`.
#[derive(Debug, Clone)]
pub struct SeededJitter {
    rng: StdRng,
}

impl SeededJitter {
    /// Creates a jitter source with a fixed seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Creates a jitter source seeded from the operating system.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl Jitter for SeededJitter {
    fn sample(&mut self, max: Duration) -> Duration {
        if max.is_zero() {
            return Duration::ZERO;
        }
        let millis = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(self.rng.gen_range(0..=millis))
    }
}

/// Always returns zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoJitter;

impl Jitter for NoJitter {
    fn sample(&mut self, _max: Duration) -> Duration {
        Duration::ZERO
    }
}

/// Always returns the same fraction of `max`.
#[derive(Debug, Clone, Copy)]
pub struct FixedJitter {
    fraction: f64,
}

impl FixedJitter {
    /// Creates a jitter that returns `fraction * max`, clamped to `[0, 1]`.
    pub fn new(fraction: f64) -> Self {
        Self {
            fraction: fraction.clamp(0.0, 1.0),
        }
    }
}

impl Jitter for FixedJitter {
    fn sample(&mut self, max: Duration) -> Duration {
        max.mul_f64(self.fraction)
    }
}

/// Which jitter source each connection gets.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum JitterPolicy {
    /// Uniform random, seeded from the operating system.
    #[default]
    Random,
    /// Uniform random from a fixed seed.
    Seeded(u64),
    /// A constant fraction of the maximum.
    Fixed(f64),
    /// No jitter.
    None,
}

impl JitterPolicy {
    /// Builds a fresh jitter source.
    pub fn build(&self) -> Box<dyn Jitter> {
        match *self {
            JitterPolicy::Random => Box::new(SeededJitter::from_entropy()),
            JitterPolicy::Seeded(seed) => Box::new(SeededJitter::new(seed)),
            JitterPolicy::Fixed(fraction) => Box::new(FixedJitter::new(fraction)),
            JitterPolicy::None => Box::new(NoJitter),
        }
    }
}
