/*!
# Multi-chain HMC sampler

[`HmcSampler`] runs several independent HMC chains over one model. Every chain owns its own
kernel and random stream; a global seed is spread over the chains by giving chain `i` the
seed `seed + i`, which makes a whole run reproducible.

## Example

```rust
use static_hmc::config::SamplerConfig;
use static_hmc::core::{init_with_seed, ChainRunner};
use static_hmc::model::StandardNormal;
use static_hmc::sampler::HmcSampler;

let config = SamplerConfig {
    step_size: 0.2,
    integration_time: 2.0,
    seed: Some(42),
    ..SamplerConfig::default()
};
let mut sampler =
    HmcSampler::adaptive(StandardNormal::new(3), init_with_seed(4, 3, 1), &config).unwrap();
let sample = sampler.run(100, 100).unwrap();
assert_eq!(sample.shape(), &[4, 100, 3]);
```
*/

use crate::adapt::DualAveraging;
use crate::adaptive::{AdaptiveHmc, AdaptiveUnitMetricHmc};
use crate::config::SamplerConfig;
use crate::core::{HasChains, HmcChain, SeedableKernel, TransitionKernel};
use crate::error::HmcError;
use crate::hmc::UnitMetricHmc;
use crate::model::Model;
use log::debug;
use rand::rngs::SmallRng;
use rand::{thread_rng, Rng, SeedableRng};

/// Independent HMC chains driven by kernels of type `K`.
#[derive(Debug, Clone)]
pub struct HmcSampler<K> {
    /// The chains, in the order of their initial positions.
    pub chains: Vec<HmcChain<K>>,
    /// The global seed; chain `i` uses `seed + i`.
    pub seed: u64,
}

impl<M: Model + Clone> HmcSampler<UnitMetricHmc<M>> {
    /// One static unit-metric kernel per initial position.
    pub fn new(
        model: M,
        initial_positions: Vec<Vec<f64>>,
        config: &SamplerConfig,
    ) -> Result<Self, HmcError> {
        config.validate()?;
        Self::build(initial_positions, config, |rng| {
            UnitMetricHmc::with_rng(model.clone(), rng)
                .with_stepsize_and_t(config.step_size, config.integration_time)
        })
    }
}

impl<M: Model + Clone> HmcSampler<AdaptiveUnitMetricHmc<M>> {
    /// One dual-averaging kernel per initial position.
    ///
    /// Step sizes adapt during the warm-up iterations of a run and are frozen when warm-up ends.
    pub fn adaptive(
        model: M,
        initial_positions: Vec<Vec<f64>>,
        config: &SamplerConfig,
    ) -> Result<Self, HmcError> {
        Self::build(initial_positions, config, |rng| {
            AdaptiveHmc::from_config(model.clone(), rng, config)
        })
    }

    pub fn adapters(&self) -> impl Iterator<Item = &DualAveraging> {
        self.chains.iter().map(|c| c.kernel().adapter())
    }
}

impl<K: TransitionKernel + SeedableKernel> HmcSampler<K> {
    fn build<F>(
        initial_positions: Vec<Vec<f64>>,
        config: &SamplerConfig,
        mut make_kernel: F,
    ) -> Result<Self, HmcError>
    where
        F: FnMut(SmallRng) -> Result<K, HmcError>,
    {
        if initial_positions.is_empty() {
            return Err(HmcError::EmptyChains);
        }
        let seed = config.seed.unwrap_or_else(|| thread_rng().gen::<u64>());
        let chains = initial_positions
            .into_iter()
            .enumerate()
            .map(|(i, position)| {
                let kernel = make_kernel(SmallRng::seed_from_u64(seed.wrapping_add(i as u64)))?;
                HmcChain::new(kernel, position)
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!("built {} chains with seed {seed}", chains.len());
        Ok(Self { chains, seed })
    }

    /// Reseeds every chain: chain `i` gets `seed + i`.
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        for (i, chain) in self.chains.iter_mut().enumerate() {
            chain.kernel_mut().reseed(seed.wrapping_add(i as u64));
        }
        self
    }

    /// Sets the discrete state passed through to the model by every chain.
    pub fn with_discrete_state(mut self, r: Vec<i32>) -> Result<Self, HmcError> {
        for chain in self.chains.iter_mut() {
            chain.set_discrete_state(r.clone())?;
        }
        Ok(self)
    }

    /// Current positions of all chains.
    pub fn positions(&self) -> Vec<Vec<f64>> {
        self.chains.iter().map(|c| c.position().to_vec()).collect()
    }
}

impl<K: TransitionKernel + Send> HasChains<f64> for HmcSampler<K> {
    type Chain = HmcChain<K>;

    fn chains_mut(&mut self) -> &mut Vec<Self::Chain> {
        &mut self.chains
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapt::StepSizeAdapter;
    use crate::core::{init_with_seed, ChainRunner, ProgressRunner};
    use crate::model::{IsotropicGaussian, StandardNormal};
    use approx::assert_abs_diff_eq;
    use ndarray::Axis;

    fn config() -> SamplerConfig {
        SamplerConfig {
            step_size: 0.25,
            integration_time: 2.0,
            seed: Some(42),
            ..SamplerConfig::default()
        }
    }

    #[test]
    fn same_seed_same_sample() {
        let run = |seed| {
            let mut sampler = HmcSampler::new(StandardNormal::new(2), init_with_seed(3, 2, 0), &config())
                .unwrap()
                .set_seed(seed);
            sampler.run(50, 10).unwrap()
        };
        assert_eq!(run(7), run(7));
        assert_ne!(run(7), run(8));
    }

    #[test]
    fn config_seed_matches_set_seed() {
        let a = HmcSampler::new(StandardNormal::new(2), init_with_seed(2, 2, 0), &config())
            .unwrap()
            .run(20, 0)
            .unwrap();
        let b = HmcSampler::new(StandardNormal::new(2), init_with_seed(2, 2, 0), &config())
            .unwrap()
            .set_seed(42)
            .run(20, 0)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_bad_inputs() {
        assert!(matches!(
            HmcSampler::new(StandardNormal::new(2), Vec::new(), &config()),
            Err(HmcError::EmptyChains)
        ));
        assert!(matches!(
            HmcSampler::new(StandardNormal::new(2), vec![vec![0.0; 3]], &config()),
            Err(HmcError::DimensionMismatch { .. })
        ));
        let bad = SamplerConfig {
            step_size: 5.0,
            ..config()
        };
        assert!(HmcSampler::adaptive(StandardNormal::new(2), init_with_seed(1, 2, 0), &bad).is_err());
        let sampler = HmcSampler::new(StandardNormal::new(2), init_with_seed(1, 2, 0), &config()).unwrap();
        assert!(sampler.with_discrete_state(vec![1]).is_err());
    }

    #[test]
    fn adaptive_sampler_recovers_moments() {
        let model = IsotropicGaussian::new(vec![2.0, -1.0, 0.5], 1.5).unwrap();
        let mut sampler = HmcSampler::adaptive(model, init_with_seed(4, 3, 9), &config()).unwrap();
        let sample = sampler.run(1000, 500).unwrap();
        assert_eq!(sample.shape(), &[4, 1000, 3]);

        let flat = sample.to_shape((4000, 3)).unwrap();
        let mean = flat.mean_axis(Axis(0)).unwrap();
        let std = flat.std_axis(Axis(0), 1.0);
        for (d, m) in [2.0, -1.0, 0.5].iter().enumerate() {
            assert_abs_diff_eq!(mean[d], *m, epsilon = 0.2);
            assert_abs_diff_eq!(std[d], 1.5, epsilon = 0.2);
        }
        for adapter in sampler.adapters() {
            assert!(!adapter.adapting());
            assert_eq!(adapter.n_updates(), 500);
        }
    }

    #[test]
    fn adaptive_run_without_warmup_keeps_configured_step_size() {
        let config = SamplerConfig {
            step_size: 0.1,
            integration_time: 2.0,
            seed: Some(1),
            ..SamplerConfig::default()
        };
        let mut sampler =
            HmcSampler::adaptive(StandardNormal::new(2), init_with_seed(2, 2, 1), &config).unwrap();
        sampler.run(10, 0).unwrap();
        for chain in &sampler.chains {
            assert_eq!(chain.kernel().stepsize(), 0.1);
            assert_eq!(chain.kernel().l(), 20);
            assert!(!chain.kernel().adapter().adapting());
        }
    }

    #[test]
    fn run_progress_reports_stats() {
        let mut sampler =
            HmcSampler::new(StandardNormal::new(2), init_with_seed(2, 2, 3), &config()).unwrap();
        let (sample, stats) = sampler.run_progress(200, 50).unwrap();
        assert_eq!(sample.shape(), &[2, 200, 2]);
        assert!(stats.p_accept > 0.5 && stats.p_accept <= 1.0);
        assert!(stats.rhat.max < 1.2, "{stats}");
    }
}
