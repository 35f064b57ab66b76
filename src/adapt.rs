//! Online step-size adaptation.
//!
//! [`StepSizeAdapter`] is the capability the adaptive kernel needs: turn the current step
//! size and an observed acceptance statistic into the next step size. [`DualAveraging`]
//! is the scheme of Hoffman & Gelman (2014), Algorithm 5, with Stan's default constants.

use crate::config::AdaptConfig;
use crate::error::HmcError;

/// Learns a step size from acceptance feedback.
pub trait StepSizeAdapter {
    /// Returns the step size to use for the next transition.
    fn learn_stepsize(&mut self, epsilon: f64, accept_stat: f64) -> f64;

    /// Whether [`learn_stepsize`](Self::learn_stepsize) should currently be called.
    fn adapting(&self) -> bool;

    fn engage(&mut self);

    fn disengage(&mut self);

    /// Forgets all accumulated statistics.
    fn restart(&mut self);

    /// The step size to keep once adaptation has ended, or `None` before the first update.
    fn final_stepsize(&self) -> Option<f64>;
}

/// Dual-averaging step-size adaptation.
///
/// Drives the running mean of the acceptance statistic towards `delta` while shrinking
/// `log(epsilon)` towards `mu`.
#[derive(Debug, Clone, PartialEq)]
pub struct DualAveraging {
    counter: f64,
    s_bar: f64,
    x_bar: f64,
    mu: f64,
    delta: f64,
    gamma: f64,
    kappa: f64,
    t0: f64,
    adapting: bool,
}

impl Default for DualAveraging {
    fn default() -> Self {
        Self {
            counter: 0.0,
            s_bar: 0.0,
            x_bar: 0.0,
            mu: 1.0_f64.ln(),
            delta: 0.65,
            gamma: 0.05,
            kappa: 0.75,
            t0: 10.0,
            adapting: true,
        }
    }
}

impl DualAveraging {
    /// Dual averaging towards the target acceptance rate `delta`.
    pub fn new(delta: f64) -> Result<Self, HmcError> {
        if !(delta > 0.0 && delta < 1.0) {
            return Err(HmcError::InvalidTarget(delta));
        }
        Ok(Self {
            delta,
            ..Self::default()
        })
    }

    /// Builds an adapter from configuration, centred on `10 * epsilon0`.
    pub fn from_config(config: &AdaptConfig, epsilon0: f64) -> Result<Self, HmcError> {
        config.validate()?;
        let mut adapter = Self::new(config.target_accept)?;
        adapter.gamma = config.gamma;
        adapter.kappa = config.kappa;
        adapter.t0 = config.t0;
        adapter.set_initial_stepsize(epsilon0)?;
        Ok(adapter)
    }

    /// Sets the shrinkage point `mu = log(10 * epsilon0)`.
    pub fn set_initial_stepsize(&mut self, epsilon0: f64) -> Result<(), HmcError> {
        if !(epsilon0.is_finite() && epsilon0 > 0.0) {
            return Err(HmcError::InvalidStepSize(epsilon0));
        }
        self.mu = (10.0 * epsilon0).ln();
        Ok(())
    }

    pub fn with_initial_stepsize(mut self, epsilon0: f64) -> Result<Self, HmcError> {
        self.set_initial_stepsize(epsilon0)?;
        Ok(self)
    }

    pub fn set_mu(&mut self, mu: f64) {
        self.mu = mu;
    }

    pub fn mu(&self) -> f64 {
        self.mu
    }

    pub fn target_accept(&self) -> f64 {
        self.delta
    }

    /// Number of updates since the last restart.
    pub fn n_updates(&self) -> usize {
        self.counter as usize
    }
}

impl StepSizeAdapter for DualAveraging {
    fn learn_stepsize(&mut self, _epsilon: f64, accept_stat: f64) -> f64 {
        let accept_stat = if accept_stat.is_nan() {
            0.0
        } else {
            accept_stat.clamp(0.0, 1.0)
        };
        self.counter += 1.0;

        let eta = 1.0 / (self.counter + self.t0);
        self.s_bar = (1.0 - eta) * self.s_bar + eta * (self.delta - accept_stat);

        let x = self.mu - self.s_bar * self.counter.sqrt() / self.gamma;
        let x_eta = self.counter.powf(-self.kappa);
        self.x_bar = (1.0 - x_eta) * self.x_bar + x_eta * x;

        x.exp()
    }

    fn adapting(&self) -> bool {
        self.adapting
    }

    fn engage(&mut self) {
        self.adapting = true;
    }

    fn disengage(&mut self) {
        self.adapting = false;
    }

    fn restart(&mut self) {
        self.counter = 0.0;
        self.s_bar = 0.0;
        self.x_bar = 0.0;
    }

    fn final_stepsize(&self) -> Option<f64> {
        (self.counter > 0.0).then(|| self.x_bar.exp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn first_update_by_hand() {
        let mut da = DualAveraging::new(0.65)
            .unwrap()
            .with_initial_stepsize(0.1)
            .unwrap();
        assert_abs_diff_eq!(da.mu(), 0.0, epsilon = 1e-15);

        // eta = 1 / 11, s_bar = (0.65 - 1.0) / 11, x = -s_bar / 0.05.
        let eps = da.learn_stepsize(0.1, 1.0);
        let s_bar: f64 = -0.35 / 11.0;
        let x = -s_bar / 0.05;
        assert_abs_diff_eq!(eps, x.exp(), epsilon = 1e-12);
        // x_eta = 1 on the first update, so x_bar = x.
        assert_abs_diff_eq!(da.final_stepsize().unwrap(), x.exp(), epsilon = 1e-12);
        assert_eq!(da.n_updates(), 1);
    }

    #[test]
    fn first_update_is_pulled_towards_mu() {
        let mut da = DualAveraging::new(0.65).unwrap();
        da.set_mu(2.0);
        assert_eq!(da.mu(), 2.0);
        // With accept_stat == delta, s_bar stays 0 and x = mu.
        let eps = da.learn_stepsize(0.1, 0.65);
        assert_abs_diff_eq!(eps, 2.0f64.exp(), epsilon = 1e-12);
        assert_abs_diff_eq!(da.final_stepsize().unwrap(), 2.0f64.exp(), epsilon = 1e-12);
    }

    #[test]
    fn low_acceptance_shrinks_step_size() {
        let mut da = DualAveraging::new(0.8).unwrap();
        let mut eps = 1.0;
        for _ in 0..50 {
            eps = da.learn_stepsize(eps, 0.0);
        }
        assert!(eps < 1.0);
        let mut da = DualAveraging::new(0.8).unwrap();
        let mut eps = 1.0;
        for _ in 0..50 {
            eps = da.learn_stepsize(eps, 1.0);
        }
        assert!(eps > 1.0);
    }

    #[test]
    fn nan_statistic_counts_as_rejection() {
        let mut a = DualAveraging::new(0.65).unwrap();
        let mut b = DualAveraging::new(0.65).unwrap();
        assert_eq!(a.learn_stepsize(0.1, f64::NAN), b.learn_stepsize(0.1, 0.0));
    }

    #[test]
    fn restart_and_engagement() {
        let mut da = DualAveraging::default();
        da.learn_stepsize(0.1, 0.3);
        da.restart();
        assert_eq!(da.n_updates(), 0);
        assert_eq!(da.final_stepsize(), None);
        assert!(da.adapting());
        da.disengage();
        assert!(!da.adapting());
        da.engage();
        assert!(da.adapting());
    }

    #[test]
    fn rejects_bad_targets() {
        assert!(matches!(
            DualAveraging::new(1.0),
            Err(HmcError::InvalidTarget(_))
        ));
        assert!(DualAveraging::new(0.0).is_err());
        assert!(DualAveraging::new(f64::NAN).is_err());
        assert!(DualAveraging::default().with_initial_stepsize(-1.0).is_err());
    }
}
