//! Hamiltonians over [`PsPoint`]s.
//!
//! The kernel only talks to the [`Hamiltonian`] trait: resample momentum from exogenous
//! standard-normal draws, prepare the point, and report energies and their gradients.
//! [`UnitMetric`] is the identity-mass-matrix case used by the static HMC kernels.

use crate::model::Model;
use crate::point::PsPoint;

/// Energy function `H(q, p) = tau(q, p) + phi(q)` with its partial derivatives.
pub trait Hamiltonian {
    /// Number of continuous coordinates.
    fn dim(&self) -> usize;

    /// Number of inert discrete coordinates.
    fn num_discrete(&self) -> usize;

    /// Sets `z.p` from `u`, a vector of independent standard-normal draws.
    fn sample_p(&self, z: &mut PsPoint, u: &[f64]);

    /// Metric-dependent setup before a trajectory starts.
    fn init(&self, z: &mut PsPoint) {
        self.update(z);
    }

    /// Recomputes the cached potential `z.v` and gradient `z.g` at `z.q`.
    fn update(&self, z: &mut PsPoint);

    /// Kinetic energy.
    fn tau(&self, z: &PsPoint) -> f64;

    /// Potential energy, as cached by the last [`update`](Self::update).
    fn phi(&self, z: &PsPoint) -> f64 {
        z.v
    }

    /// Total energy.
    fn h(&self, z: &PsPoint) -> f64 {
        self.tau(z) + self.phi(z)
    }

    /// Writes `d tau / d p` into `out`.
    fn dtau_dp(&self, z: &PsPoint, out: &mut [f64]);

    /// Writes `d phi / d q` into `out`.
    fn dphi_dq(&self, z: &PsPoint, out: &mut [f64]);
}

/// Hamiltonian with an identity mass matrix: `tau = |p|^2 / 2`, `phi = -log pi(q)`.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitMetric<M> {
    model: M,
}

impl<M: Model> UnitMetric<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &M {
        &self.model
    }
}

impl<M: Model> Hamiltonian for UnitMetric<M> {
    fn dim(&self) -> usize {
        self.model.dim()
    }

    fn num_discrete(&self) -> usize {
        self.model.num_discrete()
    }

    fn sample_p(&self, z: &mut PsPoint, u: &[f64]) {
        z.p.copy_from_slice(u);
    }

    fn update(&self, z: &mut PsPoint) {
        z.v = -self.model.log_prob_grad(&z.q, &z.r, &mut z.g);
    }

    fn tau(&self, z: &PsPoint) -> f64 {
        0.5 * z.p.iter().map(|p| p * p).sum::<f64>()
    }

    fn dtau_dp(&self, z: &PsPoint, out: &mut [f64]) {
        out.copy_from_slice(&z.p);
    }

    fn dphi_dq(&self, z: &PsPoint, out: &mut [f64]) {
        for (o, g) in out.iter_mut().zip(&z.g) {
            *o = -g;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StandardNormal;
    use approx::assert_abs_diff_eq;

    #[test]
    fn unit_metric_energies() {
        let ham = UnitMetric::new(StandardNormal::new(2));
        let mut z = PsPoint::from_state(&[1.0, -2.0], &[]);
        ham.sample_p(&mut z, &[0.5, 1.5]);
        ham.init(&mut z);

        assert_eq!(z.p, vec![0.5, 1.5]);
        assert_abs_diff_eq!(ham.tau(&z), 0.5 * (0.25 + 2.25), epsilon = 1e-12);
        // The normalizing constant of the model shows up in phi.
        let log_norm = (2.0 * std::f64::consts::PI).ln();
        assert_abs_diff_eq!(ham.phi(&z), 2.5 + log_norm, epsilon = 1e-12);
        assert_abs_diff_eq!(ham.h(&z), 1.25 + 2.5 + log_norm, epsilon = 1e-12);

        let mut dphi = [0.0; 2];
        ham.dphi_dq(&z, &mut dphi);
        assert_eq!(dphi, [1.0, -2.0]);

        let mut dtau = [0.0; 2];
        ham.dtau_dp(&z, &mut dtau);
        assert_eq!(dtau, [0.5, 1.5]);
    }
}
