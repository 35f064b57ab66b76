//! Symplectic integrators advancing a [`PsPoint`] by one step.

use crate::hamiltonian::Hamiltonian;
use crate::point::PsPoint;

/// Advances a phase-space point by one discretized time step under `H`.
pub trait Integrator<H: Hamiltonian> {
    /// Mutates `z` in place. On return `z.v` and `z.g` describe the new position.
    fn evolve(&mut self, z: &mut PsPoint, hamiltonian: &H, epsilon: f64);
}

/// The explicit (kick-drift-kick) leapfrog scheme.
///
/// Keeps a scratch buffer so that repeated steps do not allocate.
#[derive(Debug, Clone, Default)]
pub struct ExplicitLeapfrog {
    scratch: Vec<f64>,
}

impl ExplicitLeapfrog {
    pub fn new() -> Self {
        Self::default()
    }

    fn half_kick<H: Hamiltonian>(&mut self, z: &mut PsPoint, hamiltonian: &H, epsilon: f64) {
        hamiltonian.dphi_dq(z, &mut self.scratch);
        let half = 0.5 * epsilon;
        for (p, d) in z.p.iter_mut().zip(&self.scratch) {
            *p -= half * d;
        }
    }

    fn drift<H: Hamiltonian>(&mut self, z: &mut PsPoint, hamiltonian: &H, epsilon: f64) {
        hamiltonian.dtau_dp(z, &mut self.scratch);
        for (q, d) in z.q.iter_mut().zip(&self.scratch) {
            *q += epsilon * d;
        }
        hamiltonian.update(z);
    }
}

impl<H: Hamiltonian> Integrator<H> for ExplicitLeapfrog {
    fn evolve(&mut self, z: &mut PsPoint, hamiltonian: &H, epsilon: f64) {
        self.scratch.resize(z.dim(), 0.0);
        self.half_kick(z, hamiltonian, epsilon);
        self.drift(z, hamiltonian, epsilon);
        self.half_kick(z, hamiltonian, epsilon);
    }
}
