//! Running chain statistics and post-run split-R-hat / ESS summaries.

use crate::error::HmcError;
use core::fmt;
use ndarray::{concatenate, prelude::*};
use ndarray_stats::QuantileExt;
use rayon::prelude::*;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use std::collections::VecDeque;

/// Number of recent transitions the running acceptance rate is computed over.
const ACCEPT_WINDOW: usize = 100;

/// Fewest draws per chain the split diagnostics accept.
pub const MIN_SPLIT_DRAWS: usize = 4;

/// Chains longer than this get their autocovariance through the FFT.
const FFT_THRESHOLD: usize = 100;

/// Tracks the running moments and recent acceptance rate of a single chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainTracker {
    n_params: usize,
    n: u64,
    p_accept: f64,
    mean: Array1<f64>,    // n_params
    mean_sq: Array1<f64>, // n_params
    accept_queue: VecDeque<bool>,
}

impl ChainTracker {
    pub fn new(n_params: usize) -> Self {
        Self {
            n_params,
            n: 0,
            p_accept: 0.0,
            mean: Array1::zeros(n_params),
            mean_sq: Array1::zeros(n_params),
            accept_queue: VecDeque::with_capacity(ACCEPT_WINDOW + 1),
        }
    }

    /// Records the state `x` reached by a transition and whether it was accepted.
    pub fn step(&mut self, x: &[f64], accepted: bool) -> Result<(), HmcError> {
        let x_arr = ArrayView1::from_shape(self.n_params, x)?;
        self.n += 1;

        self.accept_queue.push_back(accepted);
        if self.accept_queue.len() > ACCEPT_WINDOW {
            self.accept_queue.pop_front();
        }
        self.p_accept = self.accept_queue.iter().filter(|&&a| a).count() as f64
            / self.accept_queue.len() as f64;

        let n = self.n as f64;
        self.mean = (&self.mean * (n - 1.0) + x_arr) / n;
        self.mean_sq = (&self.mean_sq * (n - 1.0) + x_arr.pow2()) / n;
        Ok(())
    }

    /// Acceptance rate over the last transitions.
    pub fn p_accept(&self) -> f64 {
        self.p_accept
    }

    pub fn n(&self) -> u64 {
        self.n
    }

    pub fn mean(&self) -> ArrayView1<f64> {
        self.mean.view()
    }

    /// Unbiased sample variance of each parameter.
    pub fn sm2(&self) -> Array1<f64> {
        let n = self.n as f64;
        (&self.mean_sq - &self.mean.pow2()) * n / (n - 1.0)
    }
}

/// Summary of one diagnostic across parameters.
#[derive(Clone, Debug, PartialEq, PartialOrd)]
pub struct BasicStats {
    pub name: String,
    pub min: f64,
    pub median: f64,
    pub max: f64,
    pub mean: f64,
    pub std: f64,
}

impl fmt::Display for BasicStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} in [{:.2}, {:.2}], median: {:.2}, mean: {:.2} ± {:.2}",
            self.name, self.min, self.max, self.median, self.mean, self.std
        )
    }
}

fn basic_stats(name: &str, mut data: Array1<f64>) -> Result<BasicStats, HmcError> {
    if data.is_empty() {
        return Err(HmcError::Stats(format!("no values to summarize for {name}")));
    }
    let min = *data.min_skipnan();
    let max = *data.max_skipnan();
    let mean = data
        .mean()
        .ok_or_else(|| HmcError::Stats(format!("empty {name}")))?;
    let std = if data.len() > 1 { data.std(1.0) } else { 0.0 };
    data.as_slice_mut()
        .ok_or_else(|| HmcError::Stats(format!("non-contiguous {name}")))?
        .sort_by(|a, b| a.total_cmp(b));
    let mid = data.len() / 2;
    let median = if data.len() % 2 == 0 {
        (data[mid - 1] + data[mid]) / 2.0
    } else {
        data[mid]
    };
    Ok(BasicStats {
        name: name.to_string(),
        min,
        median,
        max,
        mean,
        std,
    })
}

/// Post-run diagnostics of a `(chains, draws, params)` sample.
#[derive(Clone, Debug, PartialEq, PartialOrd)]
pub struct RunStats {
    pub ess: BasicStats,
    pub rhat: BasicStats,
    /// Fraction of accepted transitions, averaged over chains.
    pub p_accept: f64,
}

impl RunStats {
    pub fn new(sample: ArrayView3<f64>, p_accept: f64) -> Result<Self, HmcError> {
        let (rhat, ess) = split_rhat_mean_ess(sample)?;
        Ok(RunStats {
            ess: basic_stats("ESS", ess)?,
            rhat: basic_stats("Split R-hat", rhat)?,
            p_accept,
        })
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n{}\np(accept): {:.3}",
            self.ess, self.rhat, self.p_accept
        )
    }
}

pub(crate) fn check_split_draws(n_draws: usize) -> Result<(), HmcError> {
    if n_draws < MIN_SPLIT_DRAWS {
        return Err(HmcError::Stats(format!(
            "split diagnostics need at least {MIN_SPLIT_DRAWS} draws per chain, got {n_draws}"
        )));
    }
    Ok(())
}

/// Splits every chain in half, turning `(c, n, p)` into `(2c, n/2, p)`.
fn splitcat(sample: ArrayView3<f64>) -> Result<Array3<f64>, HmcError> {
    let n = sample.shape()[1];
    let half = n / 2;
    let first = sample.slice(s![.., ..half, ..]);
    let second = sample.slice(s![.., n - half.., ..]);
    Ok(concatenate(Axis(0), &[first, second])?)
}

/// Split R-hat and bulk ESS per parameter, following Stan's reference manual.
///
/// Needs at least [`MIN_SPLIT_DRAWS`] draws per chain.
pub fn split_rhat_mean_ess(sample: ArrayView3<f64>) -> Result<(Array1<f64>, Array1<f64>), HmcError> {
    check_split_draws(sample.shape()[1])?;
    let splitted = splitcat(sample)?;
    let (within, var) = withinvar(splitted.view());
    let rhat = (&var / &within).sqrt();
    let ess = ess(splitted.view(), within.view(), var.view())?;
    Ok((rhat, ess))
}

/// Within-chain variance `W` and pooled variance estimate per parameter.
fn withinvar(sample: ArrayView3<f64>) -> (Array1<f64>, Array1<f64>) {
    let c = sample.shape()[0] as f64;
    let n = sample.shape()[1] as f64;
    let p = sample.shape()[2];

    let (within, var): (Vec<f64>, Vec<f64>) = (0..p)
        .into_par_iter()
        .map(|param| {
            let data = sample.slice(s![.., .., param]);
            let chain_means = data.sum_axis(Axis(1)) / n;
            let overall = chain_means.sum() / c;

            let b = if c > 1.0 {
                (&chain_means - overall).pow2().sum() * n / (c - 1.0)
            } else {
                0.0
            };
            let w = data
                .outer_iter()
                .zip(chain_means.iter())
                .map(|(row, cm)| row.iter().map(|v| (v - cm).powi(2)).sum::<f64>() / n)
                .sum::<f64>()
                / c;
            let v = (n - 1.0) / n * w + b / n;
            (w, v)
        })
        .unzip();
    (Array1::from_vec(within), Array1::from_vec(var))
}

fn ess(
    sample: ArrayView3<f64>,
    within: ArrayView1<f64>,
    var: ArrayView1<f64>,
) -> Result<Array1<f64>, HmcError> {
    let (n_chains, n_steps, n_params) = sample.dim();
    let chain_acov: Vec<Array2<f64>> = sample.outer_iter().map(autocov).collect();
    let views: Vec<ArrayView2<f64>> = chain_acov.iter().map(|a| a.view()).collect();
    let avg_acov = ndarray::stack(Axis(0), &views)?
        .mean_axis(Axis(0))
        .ok_or_else(|| HmcError::Stats("no chains for ESS".to_string()))?;

    // rho_t = 1 - (W - mean autocov_t) / var
    let rho = 1.0 - (&within.broadcast((n_steps, n_params)).ok_or_else(broadcast_err)? - &avg_acov)
        / &var.broadcast((n_steps, n_params)).ok_or_else(broadcast_err)?;

    let tau: Vec<f64> = (0..n_params)
        .into_par_iter()
        .map(|d| {
            let rho_d = rho.index_axis(Axis(1), d);
            // Geyer's initial monotone sequence over pairs of lags.
            let mut min = f64::INFINITY;
            let mut out = 0.0;
            for pair in rho_d.exact_chunks(2) {
                let mut p_t = pair[0] + pair[1];
                if p_t.is_nan() || p_t <= 0.0 {
                    break;
                }
                if p_t > min {
                    p_t = min;
                }
                min = p_t;
                out += p_t;
            }
            (-1.0 + 2.0 * out).max(1.0 / (n_chains * n_steps) as f64)
        })
        .collect();
    Ok(Array1::from_vec(tau).mapv(|t| (n_chains * n_steps) as f64 / t))
}

fn broadcast_err() -> HmcError {
    HmcError::Stats("variance broadcast failed".to_string())
}

fn autocov(sample: ArrayView2<f64>) -> Array2<f64> {
    if sample.nrows() <= FFT_THRESHOLD {
        autocov_bf(sample)
    } else {
        autocov_fft(sample)
    }
}

/// Biased autocovariance of every column of an `(n, d)` chain for lags `0..n`, via the FFT.
///
/// Columns are zero-padded to the next power of two at or above `2n - 1` so the circular
/// correlation does not wrap around. `rustfft` leaves the inverse unnormalized, hence the
/// explicit division by the padded length.
fn autocov_fft(sample: ArrayView2<f64>) -> Array2<f64> {
    let (n, d) = sample.dim();
    let n_padded = (2 * n - 1).next_power_of_two();
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n_padded);
    let ffti = planner.plan_fft_inverse(n_padded);

    let columns: Vec<Vec<f64>> = (0..d)
        .into_par_iter()
        .map(|j| {
            let col = sample.column(j);
            let mean = col.sum() / n as f64;
            let mut x: Vec<Complex<f64>> = col
                .iter()
                .map(|xi| Complex::new(xi - mean, 0.0))
                .chain(std::iter::repeat(Complex::new(0.0, 0.0)).take(n_padded - n))
                .collect();
            fft.process(&mut x);
            x.iter_mut().for_each(|xi| *xi *= xi.conj());
            ffti.process(&mut x);
            x.iter()
                .take(n)
                .map(|xi| xi.re / n_padded as f64 / n as f64)
                .collect()
        })
        .collect();

    let mut out = Array2::zeros((n, d));
    for (j, col) in columns.into_iter().enumerate() {
        out.column_mut(j).assign(&Array1::from_vec(col));
    }
    out
}

/// Biased autocovariance of every column of an `(n, d)` chain, lags `0..n`, by direct sums.
fn autocov_bf(sample: ArrayView2<f64>) -> Array2<f64> {
    let (n, d) = sample.dim();
    let mut out = Array2::zeros((n, d));
    for (j, col) in sample.axis_iter(Axis(1)).enumerate() {
        let mean = col.sum() / n as f64;
        let centered: Vec<f64> = col.iter().map(|x| x - mean).collect();
        for lag in 0..n {
            let s: f64 = centered[..n - lag]
                .iter()
                .zip(&centered[lag..])
                .map(|(a, b)| a * b)
                .sum();
            out[[lag, j]] = s / n as f64;
        }
    }
    out
}
