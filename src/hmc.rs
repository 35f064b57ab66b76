//! Hamiltonian Monte Carlo with a static integration path length.
//!
//! One call to [`StaticHmc::sample`] is one complete Markov transition:
//!
//! 1. resample the momentum from `dim` standard-normal draws,
//! 2. run the integrator exactly `L` times with step size `epsilon`,
//! 3. accept the end point with probability `min(1, exp(H0 - H))`.
//!
//! The random stream is consumed in a fixed order (`dim` normals, then one uniform) so a
//! seeded kernel reproduces its chain bit for bit. [`UnitMetricHmc`] is the identity-mass,
//! explicit-leapfrog instance used throughout the crate.

use crate::core::{SeedableKernel, TransitionKernel};
use crate::error::{check_len, HmcError};
use crate::hamiltonian::{Hamiltonian, UnitMetric};
use crate::integrator::{ExplicitLeapfrog, Integrator};
use crate::model::Model;
use crate::point::PsPoint;
use crate::rng::RandomSource;
use crate::step_size::StepSizeState;
use log::{trace, warn};
use rand::rngs::SmallRng;
use rand::{thread_rng, Rng, SeedableRng};

/// Outcome of one HMC transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    /// Whether the proposal was accepted and written back to the caller's position.
    pub accepted: bool,
    /// `exp(H0 - H)`, not clipped at one.
    pub accept_prob: f64,
    /// Energy at the start of the trajectory.
    pub h0: f64,
    /// Energy at the end of the trajectory; `+inf` for a divergent trajectory.
    pub h: f64,
}

impl Transition {
    /// `min(1, accept_prob)`, with NaN mapped to zero.
    pub fn accept_stat(&self) -> f64 {
        if self.accept_prob.is_nan() {
            0.0
        } else {
            self.accept_prob.min(1.0)
        }
    }

    /// The 0/1 acceptance indicator.
    pub fn indicator(&self) -> f64 {
        if self.accepted {
            1.0
        } else {
            0.0
        }
    }

    /// `H - H0`.
    pub fn energy_error(&self) -> f64 {
        self.h - self.h0
    }

    pub fn is_divergent(&self) -> bool {
        !self.h.is_finite()
    }
}

/// Static-path HMC kernel over a Hamiltonian `H`, an integrator `I` and a random source `R`.
///
/// The kernel owns its step-size triple and its random stream. It keeps no other state
/// between calls: the phase-space point is rebuilt on every transition.
#[derive(Debug, Clone)]
pub struct StaticHmc<H, I, R> {
    hamiltonian: H,
    integrator: I,
    step_size: StepSizeState,
    rng: R,
    /// Buffer for the standard-normal draws behind the momentum.
    u: Vec<f64>,
}

/// HMC with an identity mass matrix and the explicit leapfrog integrator.
pub type UnitMetricHmc<M, R = SmallRng> = StaticHmc<UnitMetric<M>, ExplicitLeapfrog, R>;

impl<M: Model> StaticHmc<UnitMetric<M>, ExplicitLeapfrog, SmallRng> {
    /// A unit-metric kernel with `epsilon = 0.1`, `T = 1` and a random seed.
    pub fn new(model: M) -> Self {
        let rng = SmallRng::seed_from_u64(thread_rng().gen::<u64>());
        Self::with_rng(model, rng)
    }

    /// Reseeds the random stream.
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }
}

impl<M: Model, R: RandomSource> StaticHmc<UnitMetric<M>, ExplicitLeapfrog, R> {
    /// A unit-metric kernel drawing from `rng`.
    pub fn with_rng(model: M, rng: R) -> Self {
        Self::from_parts(UnitMetric::new(model), ExplicitLeapfrog::new(), rng)
    }

    pub fn model(&self) -> &M {
        self.hamiltonian.model()
    }
}

impl<H, I, R> StaticHmc<H, I, R>
where
    H: Hamiltonian,
    I: Integrator<H>,
    R: RandomSource,
{
    /// Assembles a kernel from its collaborators, with the default step-size triple.
    pub fn from_parts(hamiltonian: H, integrator: I, rng: R) -> Self {
        let dim = hamiltonian.dim();
        Self {
            hamiltonian,
            integrator,
            step_size: StepSizeState::default(),
            rng,
            u: Vec::with_capacity(dim),
        }
    }

    /// Builder form of [`set_stepsize_and_t`](Self::set_stepsize_and_t).
    pub fn with_stepsize_and_t(mut self, epsilon: f64, t: f64) -> Result<Self, HmcError> {
        self.set_stepsize_and_t(epsilon, t)?;
        Ok(self)
    }

    /// Performs one transition starting from `q`.
    ///
    /// On acceptance the end point of the trajectory is written into `q`; otherwise `q`
    /// is left as it was. The discrete state `r` is passed through and never modified.
    ///
    /// Fails only if `q` or `r` disagree with the model's dimensions, in which case no
    /// random numbers are drawn.
    pub fn sample(&mut self, q: &mut [f64], r: &[i32]) -> Result<Transition, HmcError> {
        check_len("position", self.hamiltonian.dim(), q.len())?;
        check_len("discrete state", self.hamiltonian.num_discrete(), r.len())?;

        let mut z = PsPoint::from_state(q, r);

        self.u.clear();
        for _ in 0..q.len() {
            let draw = self.rng.draw_standard_normal();
            self.u.push(draw);
        }
        self.hamiltonian.sample_p(&mut z, &self.u);
        self.hamiltonian.init(&mut z);

        let h0 = self.hamiltonian.h(&z);

        let epsilon = self.step_size.stepsize();
        for _ in 0..self.step_size.l() {
            self.integrator.evolve(&mut z, &self.hamiltonian, epsilon);
        }

        let mut h = self.hamiltonian.h(&z);
        if h.is_nan() {
            h = f64::INFINITY;
        }
        if !h.is_finite() {
            warn!(
                "divergent trajectory: epsilon={epsilon}, L={}, H0={h0}",
                self.step_size.l()
            );
        }

        // exp(-inf) = 0 never beats a uniform draw; exp(+inf) = inf always does.
        let accept_prob = (h0 - h).exp();
        let u = self.rng.draw_uniform();
        let accepted = accept_prob > 1.0 || u < accept_prob;
        if accepted {
            q.copy_from_slice(&z.q);
        }
        trace!("H0={h0:.6} H={h:.6} accept_prob={accept_prob:.4} accepted={accepted}");

        Ok(Transition {
            accepted,
            accept_prob,
            h0,
            h,
        })
    }

    pub fn stepsize(&self) -> f64 {
        self.step_size.stepsize()
    }

    pub fn l(&self) -> usize {
        self.step_size.l()
    }

    pub fn t(&self) -> f64 {
        self.step_size.t()
    }

    pub fn step_size_state(&self) -> &StepSizeState {
        &self.step_size
    }

    pub fn set_stepsize_and_t(&mut self, epsilon: f64, t: f64) -> Result<(), HmcError> {
        self.step_size.set_stepsize_and_t(epsilon, t)
    }

    pub fn set_stepsize_and_l(&mut self, epsilon: f64, l: usize) -> Result<(), HmcError> {
        self.step_size.set_stepsize_and_l(epsilon, l)
    }

    pub fn set_t(&mut self, t: f64) -> Result<(), HmcError> {
        self.step_size.set_t(t)
    }

    pub fn set_stepsize(&mut self, epsilon: f64) -> Result<(), HmcError> {
        self.step_size.set_stepsize(epsilon)
    }

    pub fn hamiltonian(&self) -> &H {
        &self.hamiltonian
    }

    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }
}

impl<H, I, R> TransitionKernel for StaticHmc<H, I, R>
where
    H: Hamiltonian,
    I: Integrator<H>,
    R: RandomSource,
{
    fn transition(&mut self, q: &mut [f64], r: &[i32]) -> Result<Transition, HmcError> {
        self.sample(q, r)
    }

    fn dim(&self) -> usize {
        self.hamiltonian.dim()
    }

    fn num_discrete(&self) -> usize {
        self.hamiltonian.num_discrete()
    }
}

impl<H, I> SeedableKernel for StaticHmc<H, I, SmallRng> {
    fn reseed(&mut self, seed: u64) {
        self.rng = SmallRng::seed_from_u64(seed);
    }
}
