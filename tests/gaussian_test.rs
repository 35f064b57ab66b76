//! Tests verifying that HMC samples Gaussian targets correctly.
//!
//! 1. `standard_normal_marginals_pass_ks`: each marginal of a 3D standard normal passes a
//!    two-sample KS test against exact draws.
//! 2. `wrong_distribution_is_rejected`: the same KS test rejects a mismatched target.
//! 3. `two_d_gaussian_moments`: mean, covariance and log-density distribution of a
//!    correlated 2D Gaussian.

use ndarray::{s, Array2, Axis};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal as Normal01;
use static_hmc::config::SamplerConfig;
use static_hmc::core::{init_with_seed, ChainRunner};
use static_hmc::model::{Gaussian2D, IsotropicGaussian, Model, StandardNormal};
use static_hmc::sampler::HmcSampler;

const SEED: u64 = 42;
const THIN: usize = 5;

fn config(step_size: f64, integration_time: f64) -> SamplerConfig {
    SamplerConfig {
        step_size,
        integration_time,
        seed: Some(SEED),
        ..SamplerConfig::default()
    }
}

fn exact_normals(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..n).map(|_| rng.sample(Normal01)).collect()
}

#[test]
fn standard_normal_marginals_pass_ks() {
    const N_COLLECT: usize = 2_000;
    let mut sampler = HmcSampler::new(
        StandardNormal::new(3),
        init_with_seed(2, 3, SEED),
        &config(0.2, 1.4),
    )
    .unwrap();
    let sample = sampler.run(N_COLLECT, 500).unwrap();

    for d in 0..3 {
        let marginal: Vec<f64> = sample
            .slice(s![.., ..;THIN, d])
            .iter()
            .copied()
            .collect();
        assert_eq!(marginal.len(), 2 * N_COLLECT / THIN);
        let reference = exact_normals(marginal.len(), 100 + d as u64);
        let result = kolmogorov_smirnov::test_f64(&marginal, &reference, 0.99);
        assert!(
            !result.is_rejected,
            "KS rejected marginal {d}: statistic {}, critical value {}",
            result.statistic,
            result.critical_value
        );
    }
}

#[test]
fn wrong_distribution_is_rejected() {
    let model = IsotropicGaussian::new(vec![0.0], 2.0).unwrap();
    let mut sampler = HmcSampler::new(model, init_with_seed(1, 1, SEED), &config(0.3, 3.0)).unwrap();
    let sample = sampler.run(4_000, 500).unwrap();
    let draws: Vec<f64> = sample.slice(s![0, ..;THIN, 0]).iter().copied().collect();
    let reference = exact_normals(draws.len(), 7);
    let result = kolmogorov_smirnov::test_f64(&draws, &reference, 0.99);
    assert!(result.is_rejected, "KS failed to tell N(0, 4) from N(0, 1)");
}

#[test]
fn two_d_gaussian_moments() {
    const N_COLLECT: usize = 5_000;
    const N_CHAINS: usize = 4;
    const SUBSAMPLE_SIZE: usize = 1_000;

    let target = Gaussian2D::new([1.0, -2.0], [[4.0, 2.0], [2.0, 3.0]]).unwrap();
    let mut sampler = HmcSampler::adaptive(
        target.clone(),
        init_with_seed(N_CHAINS, 2, SEED),
        &config(0.1, 2.5),
    )
    .unwrap();
    let sample = sampler.run(N_COLLECT, 1_000).unwrap();
    let flat = sample
        .to_shape((N_CHAINS * N_COLLECT, 2))
        .unwrap()
        .to_owned();

    let mean = flat.mean_axis(Axis(0)).unwrap();
    assert!(
        (mean[0] - 1.0).abs() < 0.2 && (mean[1] + 2.0).abs() < 0.2,
        "Mean deviation too large from target: {mean}"
    );

    let centered = &flat - &mean;
    let cov: Array2<f64> = centered.t().dot(&centered) / (flat.nrows() - 1) as f64;
    let cov_err = (&cov - &target.cov).mapv(f64::abs);
    assert!(
        cov_err.iter().all(|&e| e < 0.5),
        "Covariance deviation too large: {cov}"
    );

    // Exact draws through the Cholesky factor [[2, 0], [1, sqrt(2)]].
    let mut rng = SmallRng::seed_from_u64(SEED);
    let log_prob_target: Vec<f64> = (0..SUBSAMPLE_SIZE)
        .map(|_| {
            let z0: f64 = rng.sample(Normal01);
            let z1: f64 = rng.sample(Normal01);
            let x = [1.0 + 2.0 * z0, -2.0 + z0 + 2f64.sqrt() * z1];
            target.log_prob(&x, &[])
        })
        .collect();

    let mut rows: Vec<usize> = (0..flat.nrows()).collect();
    rows.shuffle(&mut SmallRng::seed_from_u64(SEED));
    let log_prob_mcmc: Vec<f64> = rows[..SUBSAMPLE_SIZE]
        .iter()
        .map(|&i| target.log_prob(&[flat[[i, 0]], flat[[i, 1]]], &[]))
        .collect();

    assert!(
        !log_prob_mcmc
            .iter()
            .chain(log_prob_target.iter())
            .any(|x| !x.is_finite()),
        "Found infinite/NaN in log probabilities."
    );
    let result = kolmogorov_smirnov::test_f64(&log_prob_mcmc, &log_prob_target, 0.99);
    assert!(
        !result.is_rejected,
        "KS rejected log-density distribution: statistic {}",
        result.statistic
    );
}
