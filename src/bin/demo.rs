//! Samples a correlated 2D Gaussian with adaptive HMC and prints summary statistics.

use ndarray::Axis;
use static_hmc::config::SamplerConfig;
use static_hmc::core::{init_with_seed, ProgressRunner};
use static_hmc::model::{Gaussian2D, Model};
use static_hmc::sampler::HmcSampler;
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    const N_COLLECT: usize = 5_000;
    const N_DISCARD: usize = 1_000;
    const N_CHAINS: usize = 4;
    const SEED: u64 = 42;

    let target = Gaussian2D::new([0.0, 0.0], [[2.0, 1.0], [1.0, 2.0]])?;
    let config = SamplerConfig {
        step_size: 0.1,
        integration_time: 2.0,
        seed: Some(SEED),
        ..SamplerConfig::default()
    };

    // Overdispersed starting points.
    let initial_positions: Vec<Vec<f64>> = init_with_seed(N_CHAINS, target.dim(), SEED)
        .into_iter()
        .map(|x| x.into_iter().map(|xi| 5.0 * xi).collect())
        .collect();

    let mut sampler = HmcSampler::adaptive(target.clone(), initial_positions, &config)?;
    let (sample, stats) = sampler.run_progress(N_COLLECT, N_DISCARD)?;

    println!("{stats}");
    for (i, chain) in sampler.chains.iter().enumerate() {
        let kernel = chain.kernel();
        println!(
            "chain {i}: adapted epsilon = {:.4}, L = {}",
            kernel.stepsize(),
            kernel.l()
        );
    }

    let flat = sample.to_shape((N_CHAINS * N_COLLECT, 2))?;
    let mean = flat
        .mean_axis(Axis(0))
        .ok_or("empty sample, cannot compute mean")?;
    let centered = &flat - &mean;
    let cov = centered.t().dot(&centered) / (flat.nrows() - 1) as f64;
    println!("Mean: [{:.3}, {:.3}]  (true {:?})", mean[0], mean[1], target.mean.to_vec());
    println!("Covariance:\n{cov:.3}\n(true)\n{:.3}", target.cov);

    #[cfg(feature = "csv")]
    {
        static_hmc::io::csv::save_csv(sample.view(), "hmc_samples.csv")?;
        println!("Saved sample to hmc_samples.csv");
    }

    Ok(())
}
