//! The `(epsilon, T, L)` triple of a static HMC kernel.
//!
//! `L` is always derived: after every successful setter `L == floor(T / epsilon)` and
//! `L >= 1`. Setters validate first and leave the state untouched on error.

use crate::error::HmcError;

/// Integrator step size, total integration time and the derived number of steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepSizeState {
    epsilon: f64,
    t: f64,
    l: usize,
}

impl Default for StepSizeState {
    fn default() -> Self {
        Self {
            epsilon: 0.1,
            t: 1.0,
            l: 10,
        }
    }
}

impl StepSizeState {
    /// Builds a state from a step size and an integration time.
    pub fn new(epsilon: f64, t: f64) -> Result<Self, HmcError> {
        let mut state = Self::default();
        state.set_stepsize_and_t(epsilon, t)?;
        Ok(state)
    }

    pub fn stepsize(&self) -> f64 {
        self.epsilon
    }

    pub fn t(&self) -> f64 {
        self.t
    }

    pub fn l(&self) -> usize {
        self.l
    }

    /// Sets `epsilon` and `T`, recomputing `L`.
    pub fn set_stepsize_and_t(&mut self, epsilon: f64, t: f64) -> Result<(), HmcError> {
        check_stepsize(epsilon)?;
        check_t(t)?;
        self.l = n_steps(epsilon, t)?;
        self.epsilon = epsilon;
        self.t = t;
        Ok(())
    }

    /// Sets `epsilon` and `L`, recomputing `T = epsilon * L`.
    ///
    /// When rounding in the product would make `floor(T / epsilon)` fall short of `L`,
    /// `T` is raised by the smallest representable amount until it does not.
    pub fn set_stepsize_and_l(&mut self, epsilon: f64, l: usize) -> Result<(), HmcError> {
        check_stepsize(epsilon)?;
        if l == 0 {
            return Err(HmcError::InvalidStepCount);
        }
        let mut t = epsilon * l as f64;
        check_t(t)?;
        while ((t / epsilon).floor() as usize) < l {
            t = next_up(t);
        }
        self.epsilon = epsilon;
        self.l = l;
        self.t = t;
        Ok(())
    }

    /// Sets `T`, recomputing `L` from the current `epsilon`.
    pub fn set_t(&mut self, t: f64) -> Result<(), HmcError> {
        let epsilon = self.epsilon;
        self.set_stepsize_and_t(epsilon, t)
    }

    /// Sets `epsilon`, recomputing `L` from the current `T`.
    pub fn set_stepsize(&mut self, epsilon: f64) -> Result<(), HmcError> {
        let t = self.t;
        self.set_stepsize_and_t(epsilon, t)
    }

    /// Whether `L == floor(T / epsilon)` and `L >= 1`.
    pub fn is_consistent(&self) -> bool {
        self.l >= 1 && (self.t / self.epsilon).floor() == self.l as f64
    }
}

fn check_stepsize(epsilon: f64) -> Result<(), HmcError> {
    if epsilon.is_finite() && epsilon > 0.0 {
        Ok(())
    } else {
        Err(HmcError::InvalidStepSize(epsilon))
    }
}

fn check_t(t: f64) -> Result<(), HmcError> {
    if t.is_finite() && t > 0.0 {
        Ok(())
    } else {
        Err(HmcError::InvalidIntegrationTime(t))
    }
}

fn n_steps(epsilon: f64, t: f64) -> Result<usize, HmcError> {
    let ratio = (t / epsilon).floor();
    if ratio < 1.0 {
        return Err(HmcError::ZeroSteps { epsilon, t });
    }
    if ratio >= usize::MAX as f64 {
        return Err(HmcError::InvalidStepSize(epsilon));
    }
    Ok(ratio as usize)
}

/// Smallest `f64` greater than a finite positive `x`.
fn next_up(x: f64) -> f64 {
    f64::from_bits(x.to_bits() + 1)
}
