//! Sources of randomness for the kernels.
//!
//! Every [`rand::Rng`] is a [`RandomSource`]. [`FixedSequence`] replays pre-recorded
//! draws, which makes a single transition computable by hand.

use rand::Rng;
use rand_distr::StandardNormal;
use std::collections::VecDeque;

/// The two kinds of draws an HMC transition consumes.
pub trait RandomSource {
    /// One draw from `N(0, 1)`.
    fn draw_standard_normal(&mut self) -> f64;

    /// One draw from `U[0, 1)`.
    fn draw_uniform(&mut self) -> f64;
}

impl<R: Rng> RandomSource for R {
    fn draw_standard_normal(&mut self) -> f64 {
        self.sample(StandardNormal)
    }

    fn draw_uniform(&mut self) -> f64 {
        self.gen::<f64>()
    }
}

/// Replays fixed normal and uniform draws in order.
///
/// Panics when a queue runs dry: a transition asked for more randomness than was
/// recorded for it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixedSequence {
    normals: VecDeque<f64>,
    uniforms: VecDeque<f64>,
}

impl FixedSequence {
    pub fn new(normals: &[f64], uniforms: &[f64]) -> Self {
        Self {
            normals: normals.iter().copied().collect(),
            uniforms: uniforms.iter().copied().collect(),
        }
    }

    /// Draws not yet consumed, as `(normals, uniforms)`.
    pub fn remaining(&self) -> (usize, usize) {
        (self.normals.len(), self.uniforms.len())
    }
}

impl RandomSource for FixedSequence {
    fn draw_standard_normal(&mut self) -> f64 {
        self.normals
            .pop_front()
            .expect("FixedSequence ran out of normal draws")
    }

    fn draw_uniform(&mut self) -> f64 {
        self.uniforms
            .pop_front()
            .expect("FixedSequence ran out of uniform draws")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn fixed_sequence_replays_in_order() {
        let mut src = FixedSequence::new(&[1.0, -1.0], &[0.3]);
        assert_eq!(src.draw_standard_normal(), 1.0);
        assert_eq!(src.remaining(), (1, 1));
        assert_eq!(src.draw_uniform(), 0.3);
        assert_eq!(src.draw_standard_normal(), -1.0);
        assert_eq!(src.remaining(), (0, 0));
    }

    #[test]
    fn rng_uniforms_stay_in_unit_interval() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..1000 {
            let u = rng.draw_uniform();
            assert!((0.0..1.0).contains(&u));
        }
    }
}
