/*!
Target models for the HMC kernels.

A [`Model`] reports its continuous and discrete dimensions and evaluates the
log-density together with its gradient. The kernels never look inside a model beyond
that. A handful of concrete targets are provided for tests, benchmarks and the demo.

# Examples

```rust
use static_hmc::model::{Gaussian2D, Model};

let gauss = Gaussian2D::new([0.0, 1.0], [[4.0, 2.0], [2.0, 3.0]]).unwrap();
let mut grad = [0.0; 2];
let logp = gauss.log_prob_grad(&[0.0, 1.0], &[], &mut grad);
assert!(logp.is_finite());
assert_eq!(grad, [0.0, 0.0]);
```
*/

use crate::error::HmcError;
use ndarray::{arr1, arr2, Array1, Array2};
use std::f64::consts::PI;

/// A differentiable log-density over a continuous position plus an inert discrete state.
pub trait Model {
    /// Number of continuous coordinates.
    fn dim(&self) -> usize;

    /// Number of discrete coordinates. These are passed through the sampler unchanged.
    fn num_discrete(&self) -> usize {
        0
    }

    /// Returns `log pi(q | r)` (up to a constant) and writes its gradient w.r.t. `q`
    /// into `grad`.
    ///
    /// Non-finite return values are allowed and make the kernel reject the proposal.
    fn log_prob_grad(&self, q: &[f64], r: &[i32], grad: &mut [f64]) -> f64;

    /// Log-density without the gradient.
    fn log_prob(&self, q: &[f64], r: &[i32]) -> f64 {
        let mut grad = vec![0.0; q.len()];
        self.log_prob_grad(q, r, &mut grad)
    }
}

/// The `dim`-dimensional standard normal distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StandardNormal {
    pub dim: usize,
}

impl StandardNormal {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl Model for StandardNormal {
    fn dim(&self) -> usize {
        self.dim
    }

    fn log_prob_grad(&self, q: &[f64], _r: &[i32], grad: &mut [f64]) -> f64 {
        let mut sq = 0.0;
        for (g, x) in grad.iter_mut().zip(q) {
            *g = -x;
            sq += x * x;
        }
        -0.5 * sq - 0.5 * self.dim as f64 * (2.0 * PI).ln()
    }
}

/// An isotropic Gaussian `N(mean, std^2 I)`.
#[derive(Debug, Clone, PartialEq)]
pub struct IsotropicGaussian {
    pub mean: Vec<f64>,
    pub std: f64,
}

impl IsotropicGaussian {
    pub fn new(mean: Vec<f64>, std: f64) -> Result<Self, HmcError> {
        if !(std.is_finite() && std > 0.0) {
            return Err(HmcError::InvalidModel(format!(
                "standard deviation must be positive, got {std}"
            )));
        }
        Ok(Self { mean, std })
    }
}

impl Model for IsotropicGaussian {
    fn dim(&self) -> usize {
        self.mean.len()
    }

    fn log_prob_grad(&self, q: &[f64], _r: &[i32], grad: &mut [f64]) -> f64 {
        let var = self.std * self.std;
        let d = self.mean.len() as f64;
        let mut sq = 0.0;
        for ((g, x), m) in grad.iter_mut().zip(q).zip(&self.mean) {
            let diff = x - m;
            *g = -diff / var;
            sq += diff * diff;
        }
        -0.5 * sq / var - 0.5 * d * (2.0 * PI * var).ln()
    }
}

/**
A 2D Gaussian distribution parameterized by a mean vector and a 2×2 covariance matrix.

The precision matrix and the log-normalizer are computed once at construction.
*/
#[derive(Debug, Clone, PartialEq)]
pub struct Gaussian2D {
    pub mean: Array1<f64>,
    pub cov: Array2<f64>,
    precision: Array2<f64>,
    log_norm: f64,
}

impl Gaussian2D {
    /// Fails unless `cov` is symmetric positive definite.
    pub fn new(mean: [f64; 2], cov: [[f64; 2]; 2]) -> Result<Self, HmcError> {
        let [[a, b], [c, d]] = cov;
        let det = a * d - b * c;
        if (b - c).abs() > 1e-12 || a <= 0.0 || det <= 0.0 {
            return Err(HmcError::InvalidModel(format!(
                "covariance {cov:?} is not symmetric positive definite"
            )));
        }
        let precision = arr2(&[[d / det, -b / det], [-c / det, a / det]]);
        Ok(Self {
            mean: arr1(&mean),
            cov: arr2(&cov),
            precision,
            log_norm: -(2.0 * PI).ln() - 0.5 * det.ln(),
        })
    }
}

impl Model for Gaussian2D {
    fn dim(&self) -> usize {
        2
    }

    fn log_prob_grad(&self, q: &[f64], _r: &[i32], grad: &mut [f64]) -> f64 {
        let diff = arr1(&[q[0] - self.mean[0], q[1] - self.mean[1]]);
        let pd = self.precision.dot(&diff);
        grad[0] = -pd[0];
        grad[1] = -pd[1];
        -0.5 * diff.dot(&pd) + self.log_norm
    }
}

/// The banana-shaped Rosenbrock density `exp(-((a - x)^2 + b (y - x^2)^2))`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rosenbrock2D {
    pub a: f64,
    pub b: f64,
}

impl Model for Rosenbrock2D {
    fn dim(&self) -> usize {
        2
    }

    fn log_prob_grad(&self, q: &[f64], _r: &[i32], grad: &mut [f64]) -> f64 {
        let (x, y) = (q[0], q[1]);
        let inner = y - x * x;
        grad[0] = 2.0 * (self.a - x) + 4.0 * self.b * x * inner;
        grad[1] = -2.0 * self.b * inner;
        -((self.a - x).powi(2) + self.b * inner * inner)
    }
}
