//! Random sources for the weather simulation.
//!
//! The simulation never touches global random state; it draws from whatever
//! source it was handed, which lets tests script exact values.

use std::collections::VecDeque;

use rand::rngs::{StdRng, ThreadRng};
use rand::{Rng, SeedableRng};

use crate::config::FloatRange;

/// Uniform sampling capability
pub trait RandomSource {
    /// Sample uniformly from `[low, high)`. Returns `low` for an empty range.
    fn uniform(&mut self, low: f32, high: f32) -> f32;

    fn sample(&mut self, range: FloatRange) -> f32 {
        self.uniform(range.min, range.max)
    }
}

fn sample_rng<R: Rng>(rng: &mut R, low: f32, high: f32) -> f32 {
    if high <= low {
        return low;
    }
    rng.gen_range(low..high)
}

impl RandomSource for StdRng {
    fn uniform(&mut self, low: f32, high: f32) -> f32 {
        sample_rng(self, low, high)
    }
}

impl RandomSource for ThreadRng {
    fn uniform(&mut self, low: f32, high: f32) -> f32 {
        sample_rng(self, low, high)
    }
}

/// Seeded source for reproducible runs
pub fn seeded(seed: u64) -> Box<dyn RandomSource> {
    Box::new(StdRng::seed_from_u64(seed))
}

/// Entropy-seeded source for normal runs
pub fn from_entropy() -> Box<dyn RandomSource> {
    Box::new(StdRng::from_entropy())
}

/// Replays a fixed list of values, clamped into the requested range.
///
/// Once the script runs out every call returns the lower bound.
#[derive(Debug, Clone, Default)]
pub struct SequenceSource {
    values: VecDeque<f32>,
}

impl SequenceSource {
    pub fn new(values: impl IntoIterator<Item = f32>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

impl RandomSource for SequenceSource {
    fn uniform(&mut self, low: f32, high: f32) -> f32 {
        match self.values.pop_front() {
            Some(value) if high > low => value.clamp(low, high),
            _ => low,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_std_rng_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let v = rng.uniform(7.0, 12.0);
            assert!((7.0..12.0).contains(&v));
        }
    }

    #[test]
    fn test_empty_range_returns_low() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(rng.uniform(120.0, 120.0), 120.0);
    }

    #[test]
    fn test_sequence_replays_then_falls_back() {
        let mut source = SequenceSource::new([0.5, 100.0]);
        assert_eq!(source.uniform(0.0, 3.0), 0.5);
        assert_eq!(source.uniform(60.0, 121.0), 100.0);
        assert_eq!(source.remaining(), 0);
        assert_eq!(source.uniform(-300.0, 700.0), -300.0);
    }
}
