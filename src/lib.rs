/*!
# static-hmc

Hamiltonian Monte Carlo with a static integration path length, an identity mass matrix and
the explicit leapfrog integrator, plus dual-averaging step-size adaptation.

The building blocks are small and composable:

- [`model::Model`]: log density and gradient of the target, with an optional discrete
  state that is passed through untouched.
- [`hamiltonian::UnitMetric`]: `H(q, p) = ½‖p‖² - log π(q)`.
- [`integrator::ExplicitLeapfrog`]: half kick, drift, half kick.
- [`hmc::UnitMetricHmc`]: one Metropolis-corrected transition per call.
- [`adaptive::AdaptiveHmc`]: the same kernel with its step size learned online.
- [`sampler::HmcSampler`]: many independent chains on the rayon pool.

## Example

```rust
use static_hmc::hmc::UnitMetricHmc;
use static_hmc::model::StandardNormal;

let mut hmc = UnitMetricHmc::new(StandardNormal::new(2))
    .set_seed(42)
    .with_stepsize_and_t(0.25, 1.0)?;
let mut q = vec![1.0, -1.0];
for _ in 0..100 {
    let transition = hmc.sample(&mut q, &[])?;
    assert!(transition.accept_prob >= 0.0);
}
# Ok::<(), static_hmc::error::HmcError>(())
```
*/

pub mod adapt;
pub mod adaptive;
pub mod config;
pub mod core;
pub mod error;
pub mod hamiltonian;
pub mod hmc;
pub mod integrator;
pub mod io;
pub mod model;
pub mod point;
pub mod rng;
pub mod sampler;
pub mod stats;
pub mod step_size;
