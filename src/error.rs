//! Error type shared by the kernels, the chain runner and the I/O helpers.

use thiserror::Error;

/// Everything that can go wrong before or around an HMC transition.
///
/// A divergent trajectory is *not* an error: it is a rejected proposal and shows up
/// as a [`Transition`](crate::hmc::Transition) with `accepted == false`.
#[derive(Debug, Error)]
pub enum HmcError {
    /// The integrator step size must be finite and strictly positive.
    #[error("invalid step size {0}: expected a finite value > 0")]
    InvalidStepSize(f64),

    /// The total integration time must be finite and strictly positive.
    #[error("invalid integration time {0}: expected a finite value > 0")]
    InvalidIntegrationTime(f64),

    /// `floor(t / epsilon)` would be zero, i.e. the trajectory would be empty.
    #[error("step size {epsilon} exceeds integration time {t}, giving zero leapfrog steps")]
    ZeroSteps { epsilon: f64, t: f64 },

    /// The number of leapfrog steps must be at least one.
    #[error("number of leapfrog steps must be >= 1")]
    InvalidStepCount,

    /// Target acceptance rates live strictly inside (0, 1).
    #[error("invalid target acceptance rate {0}: expected a value in (0, 1)")]
    InvalidTarget(f64),

    /// Dual-averaging constants outside their valid range.
    #[error("invalid adaptation settings: {0}")]
    InvalidAdaptConfig(String),

    /// A buffer handed to the sampler disagrees with the model's dimensions.
    #[error("{what} has length {found}, but the model expects {expected}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    /// A built-in model was given parameters that do not define a density.
    #[error("invalid model: {0}")]
    InvalidModel(String),

    /// A sampler was built without any chains.
    #[error("expected at least one chain")]
    EmptyChains,

    /// A diagnostic could not be computed.
    #[error("statistics error: {0}")]
    Stats(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[cfg(feature = "csv")]
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl From<ndarray::ShapeError> for HmcError {
    fn from(err: ndarray::ShapeError) -> Self {
        HmcError::Stats(err.to_string())
    }
}

/// Fails with [`HmcError::DimensionMismatch`] unless `found == expected`.
pub(crate) fn check_len(what: &'static str, expected: usize, found: usize) -> Result<(), HmcError> {
    if expected == found {
        Ok(())
    } else {
        Err(HmcError::DimensionMismatch {
            what,
            expected,
            found,
        })
    }
}
