/*!
Chains, kernels and the parallel chain runner.

A [`TransitionKernel`] advances a position by one Markov transition. An [`HmcChain`] owns one
kernel together with the chain's current state, and anything that owns several chains gets
[`ChainRunner::run`] (and, for `f64` chains, [`ProgressRunner::run_progress`]) for free by
implementing [`HasChains`]. Chains are independent and run on the rayon thread pool.
*/

use crate::error::{check_len, HmcError};
use crate::hmc::Transition;
use crate::stats::{check_split_draws, ChainTracker, RunStats};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use ndarray::{s, Array2, Array3, ArrayView1};
use rand::rngs::SmallRng;
use rand::{thread_rng, Rng, SeedableRng};
use rand_distr::StandardNormal;
use rayon::prelude::*;

/// One Markov transition on a continuous position `q` with a pass-through discrete state `r`.
pub trait TransitionKernel {
    fn transition(&mut self, q: &mut [f64], r: &[i32]) -> Result<Transition, HmcError>;

    /// Called once when warm-up ends.
    fn end_warmup(&mut self) -> Result<(), HmcError> {
        Ok(())
    }

    fn dim(&self) -> usize;

    fn num_discrete(&self) -> usize;
}

/// Kernels whose random stream can be reset from a `u64` seed.
pub trait SeedableKernel {
    fn reseed(&mut self, seed: u64);
}

pub trait MarkovChain<S> {
    /// Does one iteration of the chain, returning the new current state.
    fn step(&mut self) -> Result<&[S], HmcError>;

    fn current_state(&self) -> &[S];

    /// Called once between warm-up and collection.
    fn end_warmup(&mut self) -> Result<(), HmcError> {
        Ok(())
    }

    /// Recent acceptance rate, if the chain keeps track of one.
    fn p_accept(&self) -> Option<f64> {
        None
    }

    /// Acceptance rate since warm-up ended, if the chain keeps track of one.
    fn accept_rate(&self) -> Option<f64> {
        None
    }
}

/// A single chain driven by a [`TransitionKernel`].
#[derive(Debug, Clone)]
pub struct HmcChain<K> {
    kernel: K,
    position: Vec<f64>,
    discrete: Vec<i32>,
    tracker: ChainTracker,
    n_accepted: u64,
    n_transitions: u64,
    last: Option<Transition>,
}

impl<K: TransitionKernel> HmcChain<K> {
    pub fn new(kernel: K, initial_position: Vec<f64>) -> Result<Self, HmcError> {
        Self::with_discrete_state(kernel, initial_position, Vec::new())
    }

    pub fn with_discrete_state(
        kernel: K,
        initial_position: Vec<f64>,
        discrete: Vec<i32>,
    ) -> Result<Self, HmcError> {
        check_len("initial position", kernel.dim(), initial_position.len())?;
        check_len("discrete state", kernel.num_discrete(), discrete.len())?;
        Ok(Self {
            tracker: ChainTracker::new(initial_position.len()),
            kernel,
            position: initial_position,
            discrete,
            n_accepted: 0,
            n_transitions: 0,
            last: None,
        })
    }

    pub fn set_discrete_state(&mut self, discrete: Vec<i32>) -> Result<(), HmcError> {
        check_len("discrete state", self.kernel.num_discrete(), discrete.len())?;
        self.discrete = discrete;
        Ok(())
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    pub fn kernel_mut(&mut self) -> &mut K {
        &mut self.kernel
    }

    pub fn position(&self) -> &[f64] {
        &self.position
    }

    pub fn discrete_state(&self) -> &[i32] {
        &self.discrete
    }

    pub fn tracker(&self) -> &ChainTracker {
        &self.tracker
    }

    pub fn last_transition(&self) -> Option<&Transition> {
        self.last.as_ref()
    }
}

impl<K: TransitionKernel> MarkovChain<f64> for HmcChain<K> {
    fn step(&mut self) -> Result<&[f64], HmcError> {
        let transition = self.kernel.transition(&mut self.position, &self.discrete)?;
        self.n_transitions += 1;
        if transition.accepted {
            self.n_accepted += 1;
        }
        self.tracker.step(&self.position, transition.accepted)?;
        self.last = Some(transition);
        Ok(&self.position)
    }

    fn current_state(&self) -> &[f64] {
        &self.position
    }

    fn end_warmup(&mut self) -> Result<(), HmcError> {
        self.kernel.end_warmup()?;
        self.n_accepted = 0;
        self.n_transitions = 0;
        self.tracker = ChainTracker::new(self.position.len());
        Ok(())
    }

    fn p_accept(&self) -> Option<f64> {
        (self.tracker.n() > 0).then(|| self.tracker.p_accept())
    }

    fn accept_rate(&self) -> Option<f64> {
        (self.n_transitions > 0).then(|| self.n_accepted as f64 / self.n_transitions as f64)
    }
}

/// Runs `n_discard` warm-up iterations, ends warm-up, then records `n_collect` states.
pub fn run_chain<S, M>(
    chain: &mut M,
    n_collect: usize,
    n_discard: usize,
) -> Result<Array2<S>, HmcError>
where
    M: MarkovChain<S>,
    S: Clone + Default,
{
    run_chain_inner(chain, n_collect, n_discard, None)
}

/// Like [`run_chain`], advancing `pb` once per iteration.
pub fn run_chain_with_progress<S, M>(
    chain: &mut M,
    n_collect: usize,
    n_discard: usize,
    pb: &ProgressBar,
) -> Result<Array2<S>, HmcError>
where
    M: MarkovChain<S>,
    S: Clone + Default,
{
    run_chain_inner(chain, n_collect, n_discard, Some(pb))
}

fn run_chain_inner<S, M>(
    chain: &mut M,
    n_collect: usize,
    n_discard: usize,
    pb: Option<&ProgressBar>,
) -> Result<Array2<S>, HmcError>
where
    M: MarkovChain<S>,
    S: Clone + Default,
{
    let dim = chain.current_state().len();
    let mut out = Array2::<S>::default((n_collect, dim));

    if let Some(pb) = pb {
        pb.set_length((n_discard + n_collect) as u64);
    }

    for _ in 0..n_discard {
        chain.step()?;
        if let Some(pb) = pb {
            pb.inc(1);
        }
    }
    chain.end_warmup()?;

    for i in 0..n_collect {
        let state = chain.step()?;
        out.row_mut(i).assign(&ArrayView1::from(state));
        if let Some(pb) = pb {
            pb.inc(1);
            if i % 50 == 0 {
                if let Some(p) = chain.p_accept() {
                    pb.set_message(format!("p(accept)≈{p:.2}"));
                }
            }
        }
    }

    Ok(out)
}

/// Anything that owns multiple Markov chains.
pub trait HasChains<S> {
    type Chain: MarkovChain<S> + Send;

    fn chains_mut(&mut self) -> &mut Vec<Self::Chain>;
}

pub trait ChainRunner<S>: HasChains<S>
where
    S: Clone + Default + Send + Sync + 'static,
{
    /// Runs every chain in parallel; returns a `(chains, n_collect, dim)` array.
    fn run(&mut self, n_collect: usize, n_discard: usize) -> Result<Array3<S>, HmcError> {
        let chains = self.chains_mut();
        if chains.is_empty() {
            return Err(HmcError::EmptyChains);
        }
        let results: Vec<Array2<S>> = chains
            .par_iter_mut()
            .map(|chain| run_chain(chain, n_collect, n_discard))
            .collect::<Result<_, _>>()?;
        stack_chains(results, n_collect)
    }
}

impl<S, T> ChainRunner<S> for T
where
    S: Clone + Default + Send + Sync + 'static,
    T: HasChains<S>,
{
}

/// Parallel run with one progress bar per chain, followed by split-R-hat and ESS diagnostics.
pub trait ProgressRunner: HasChains<f64> {
    /// Needs [`MIN_SPLIT_DRAWS`](crate::stats::MIN_SPLIT_DRAWS) collected draws for the
    /// diagnostics; shorter runs are refused before any chain moves.
    fn run_progress(
        &mut self,
        n_collect: usize,
        n_discard: usize,
    ) -> Result<(Array3<f64>, RunStats), HmcError> {
        check_split_draws(n_collect)?;
        let chains = self.chains_mut();
        if chains.is_empty() {
            return Err(HmcError::EmptyChains);
        }
        let multi = MultiProgress::new();
        let pb_style = ProgressStyle::default_bar()
            .template("{prefix} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .map_err(|e| HmcError::Stats(e.to_string()))?
            .progress_chars("##-");

        let results: Vec<(Array2<f64>, f64)> = chains
            .par_iter_mut()
            .enumerate()
            .map(|(i, chain)| -> Result<(Array2<f64>, f64), HmcError> {
                let pb = multi.add(ProgressBar::new((n_discard + n_collect) as u64));
                pb.set_prefix(format!("Chain {i}"));
                pb.set_style(pb_style.clone());

                let sample = run_chain_with_progress(chain, n_collect, n_discard, &pb)?;
                let rate = chain.accept_rate().unwrap_or(0.0);
                pb.finish_with_message(format!("p(accept)≈{rate:.2} Done!"));
                Ok((sample, rate))
            })
            .collect::<Result<_, _>>()?;

        let p_accept = results.iter().map(|(_, r)| r).sum::<f64>() / results.len() as f64;
        let sample = stack_chains(results.into_iter().map(|(s, _)| s).collect(), n_collect)?;
        let stats = RunStats::new(sample.view(), p_accept)?;
        Ok((sample, stats))
    }
}

impl<T: HasChains<f64>> ProgressRunner for T {}

fn stack_chains<S: Clone + Default>(
    results: Vec<Array2<S>>,
    n_collect: usize,
) -> Result<Array3<S>, HmcError> {
    let dim = results.first().map_or(0, |r| r.ncols());
    let mut out = Array3::<S>::default((results.len(), n_collect, dim));
    for (i, chain_sample) in results.iter().enumerate() {
        out.slice_mut(s![i, .., ..]).assign(chain_sample);
    }
    Ok(out)
}

/// `n` positions drawn from the `d`-dimensional standard normal, randomly seeded.
pub fn init(n: usize, d: usize) -> Vec<Vec<f64>> {
    init_with_seed(n, d, thread_rng().gen::<u64>())
}

/// `n` positions drawn from the `d`-dimensional standard normal with a fixed seed.
pub fn init_with_seed(n: usize, d: usize, seed: u64) -> Vec<Vec<f64>> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..n)
        .map(|_| (0..d).map(|_| rng.sample(StandardNormal)).collect())
        .collect()
}
