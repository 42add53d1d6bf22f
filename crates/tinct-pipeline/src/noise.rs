//! Normally distributed noise for the grain filter.
//!
//! Grain draws one standard-normal sample per pixel. The source is a
//! trait object held by the pipeline so callers (and tests) can inject
//! their own: the default shapes uniform draws from a `rand` RNG with
//! the Box–Muller transform, and [`FixedNoise`] replays a constant for
//! reproducible output.

use std::f64::consts::TAU;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// A source of standard-normal samples.
pub trait NoiseSource: std::fmt::Debug {
    /// Draw one sample from a standard normal distribution.
    fn standard_normal(&mut self) -> f64;
}

/// Box–Muller transform over two independent uniform draws in (0, 1].
///
/// Equivalent in distribution to a standard normal; no particular
/// sample stream is guaranteed, so grain output differs run to run
/// unless the RNG is seeded.
#[derive(Debug, Clone)]
pub struct BoxMullerNoise<R> {
    rng: R,
}

impl BoxMullerNoise<SmallRng> {
    /// A source seeded from operating-system entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::new(SmallRng::from_os_rng())
    }

    /// A source with a fixed seed, for reproducible renders.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::new(SmallRng::seed_from_u64(seed))
    }
}

impl<R: Rng> BoxMullerNoise<R> {
    /// Wrap an arbitrary RNG.
    pub const fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng + std::fmt::Debug> NoiseSource for BoxMullerNoise<R> {
    fn standard_normal(&mut self) -> f64 {
        // `random::<f64>()` is uniform on [0, 1); flipping to (0, 1]
        // keeps the log argument away from zero.
        let u = 1.0 - self.rng.random::<f64>();
        let v = 1.0 - self.rng.random::<f64>();
        (-2.0 * u.ln()).sqrt() * (TAU * v).cos()
    }
}

/// Replays one fixed sample for every draw.
///
/// Makes grain deterministic in tests and degenerate renders (every
/// pixel shifted by the same amount).
#[derive(Debug, Clone, Copy)]
pub struct FixedNoise(pub f64);

impl NoiseSource for FixedNoise {
    fn standard_normal(&mut self) -> f64 {
        self.0
    }
}
