/*!
HMC with an online-adapted step size.

[`AdaptiveHmc`] decorates a [`StaticHmc`] kernel. Each transition runs the base kernel
unchanged, then, while the adapter is engaged, feeds the observed acceptance statistic to
the [`StepSizeAdapter`] and installs the step size it returns. `T` stays fixed, so `L` is
re-derived on every change.

Learned step sizes are clamped to `[T / MAX_ADAPTED_STEPS, T]` before they reach the base
kernel, so `L` stays between one and [`MAX_ADAPTED_STEPS`] no matter how far the adapter
overshoots. The adapter's own iterate is not clamped.
*/

use crate::adapt::{DualAveraging, StepSizeAdapter};
use crate::config::SamplerConfig;
use crate::core::{SeedableKernel, TransitionKernel};
use crate::error::HmcError;
use crate::hamiltonian::{Hamiltonian, UnitMetric};
use crate::hmc::{StaticHmc, Transition};
use crate::integrator::{ExplicitLeapfrog, Integrator};
use crate::model::Model;
use crate::rng::RandomSource;
use log::debug;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

/// Largest number of leapfrog steps an adapted step size may imply.
pub const MAX_ADAPTED_STEPS: usize = 1 << 16;

/// The quantity fed back to the step-size adapter after each transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceptStatistic {
    /// `min(1, exp(H0 - H))`. Low variance; the usual choice.
    #[default]
    Probability,
    /// 1 if the proposal was accepted, 0 otherwise.
    Indicator,
}

impl AcceptStatistic {
    pub fn of(self, transition: &Transition) -> f64 {
        match self {
            AcceptStatistic::Probability => transition.accept_stat(),
            AcceptStatistic::Indicator => transition.indicator(),
        }
    }
}

/// A static HMC kernel whose step size is tuned by `A` during warm-up.
#[derive(Debug, Clone)]
pub struct AdaptiveHmc<H, I, R, A> {
    base: StaticHmc<H, I, R>,
    adapter: A,
    accept_statistic: AcceptStatistic,
}

/// Unit-metric HMC with dual-averaging step-size adaptation.
pub type AdaptiveUnitMetricHmc<M, R = SmallRng> =
    AdaptiveHmc<UnitMetric<M>, ExplicitLeapfrog, R, DualAveraging>;

impl<M: Model, R: RandomSource> AdaptiveHmc<UnitMetric<M>, ExplicitLeapfrog, R, DualAveraging> {
    /// Builds a dual-averaging kernel from a validated configuration.
    ///
    /// The adapter is centred on `log(10 * step_size)`.
    pub fn from_config(model: M, rng: R, config: &SamplerConfig) -> Result<Self, HmcError> {
        config.validate()?;
        let base = StaticHmc::with_rng(model, rng)
            .with_stepsize_and_t(config.step_size, config.integration_time)?;
        let adapter = DualAveraging::from_config(&config.adapt, config.step_size)?;
        Ok(Self::new(base, adapter).with_accept_statistic(config.adapt.accept_statistic))
    }
}

impl<H, I, R, A> AdaptiveHmc<H, I, R, A>
where
    H: Hamiltonian,
    I: Integrator<H>,
    R: RandomSource,
    A: StepSizeAdapter,
{
    pub fn new(base: StaticHmc<H, I, R>, adapter: A) -> Self {
        Self {
            base,
            adapter,
            accept_statistic: AcceptStatistic::default(),
        }
    }

    pub fn with_accept_statistic(mut self, accept_statistic: AcceptStatistic) -> Self {
        self.accept_statistic = accept_statistic;
        self
    }

    pub fn set_accept_statistic(&mut self, accept_statistic: AcceptStatistic) {
        self.accept_statistic = accept_statistic;
    }

    pub fn accept_statistic(&self) -> AcceptStatistic {
        self.accept_statistic
    }

    /// One base transition followed, while adapting, by one step-size update.
    ///
    /// The step size used for this transition is the one installed by the previous call.
    pub fn sample(&mut self, q: &mut [f64], r: &[i32]) -> Result<Transition, HmcError> {
        let transition = self.base.sample(q, r)?;
        if self.adapter.adapting() {
            let stat = self.accept_statistic.of(&transition);
            let learned = self.adapter.learn_stepsize(self.base.stepsize(), stat);
            self.install(learned)?;
        }
        Ok(transition)
    }

    /// Disengages the adapter and installs its final averaged step size.
    ///
    /// An adapter that never learned anything leaves the current step size in place.
    pub fn finish_adaptation(&mut self) -> Result<(), HmcError> {
        self.adapter.disengage();
        if let Some(epsilon) = self.adapter.final_stepsize() {
            self.install(epsilon)?;
        }
        debug!(
            "adaptation finished: epsilon={:.5}, L={}",
            self.base.stepsize(),
            self.base.l()
        );
        Ok(())
    }

    fn install(&mut self, learned: f64) -> Result<(), HmcError> {
        let t = self.base.t();
        let epsilon = if learned.is_nan() {
            self.base.stepsize()
        } else {
            learned.clamp(t / MAX_ADAPTED_STEPS as f64, t)
        };
        if epsilon != learned {
            debug!("learned step size {learned} clamped to {epsilon}");
        }
        self.base.set_stepsize(epsilon)
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    pub fn base(&self) -> &StaticHmc<H, I, R> {
        &self.base
    }

    pub fn stepsize(&self) -> f64 {
        self.base.stepsize()
    }

    pub fn l(&self) -> usize {
        self.base.l()
    }

    pub fn t(&self) -> f64 {
        self.base.t()
    }
}

impl<H, I, R, A> TransitionKernel for AdaptiveHmc<H, I, R, A>
where
    H: Hamiltonian,
    I: Integrator<H>,
    R: RandomSource,
    A: StepSizeAdapter,
{
    fn transition(&mut self, q: &mut [f64], r: &[i32]) -> Result<Transition, HmcError> {
        self.sample(q, r)
    }

    fn end_warmup(&mut self) -> Result<(), HmcError> {
        self.finish_adaptation()
    }

    fn dim(&self) -> usize {
        self.base.hamiltonian().dim()
    }

    fn num_discrete(&self) -> usize {
        self.base.hamiltonian().num_discrete()
    }
}

impl<H, I, A> SeedableKernel for AdaptiveHmc<H, I, SmallRng, A> {
    fn reseed(&mut self, seed: u64) {
        self.base.reseed(seed);
    }
}
