//! Serializable sampler configuration.
//!
//! Every field has a default, so a partial JSON/YAML document deserializes into a
//! complete configuration.

use crate::adaptive::AcceptStatistic;
use crate::error::HmcError;
use crate::step_size::StepSizeState;
use serde::{Deserialize, Serialize};

/// Parameters shared by every chain of an [`HmcSampler`](crate::sampler::HmcSampler).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Initial integrator step size `epsilon`.
    #[serde(default = "default_step_size")]
    pub step_size: f64,
    /// Total integration time `T` of one trajectory.
    #[serde(default = "default_integration_time")]
    pub integration_time: f64,
    /// Master seed. Chain `i` is seeded with `seed + i`; `None` draws a seed from entropy.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Step-size adaptation, used by adaptive samplers.
    #[serde(default)]
    pub adapt: AdaptConfig,
}

fn default_step_size() -> f64 {
    0.1
}

fn default_integration_time() -> f64 {
    1.0
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            step_size: default_step_size(),
            integration_time: default_integration_time(),
            seed: None,
            adapt: AdaptConfig::default(),
        }
    }
}

impl SamplerConfig {
    /// The step-size triple this configuration describes.
    pub fn step_size_state(&self) -> Result<StepSizeState, HmcError> {
        StepSizeState::new(self.step_size, self.integration_time)
    }

    pub fn validate(&self) -> Result<(), HmcError> {
        self.step_size_state()?;
        self.adapt.validate()
    }
}

/// Dual-averaging constants. The defaults are Stan's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptConfig {
    /// Target mean acceptance statistic `delta`.
    #[serde(default = "default_target_accept")]
    pub target_accept: f64,
    /// Shrinkage strength.
    #[serde(default = "default_gamma")]
    pub gamma: f64,
    /// Decay exponent of the averaged iterate.
    #[serde(default = "default_kappa")]
    pub kappa: f64,
    /// Offset that damps the first iterations.
    #[serde(default = "default_t0")]
    pub t0: f64,
    /// Which statistic is fed back to the adapter.
    #[serde(default)]
    pub accept_statistic: AcceptStatistic,
}

fn default_target_accept() -> f64 {
    0.65
}

fn default_gamma() -> f64 {
    0.05
}

fn default_kappa() -> f64 {
    0.75
}

fn default_t0() -> f64 {
    10.0
}

impl Default for AdaptConfig {
    fn default() -> Self {
        Self {
            target_accept: default_target_accept(),
            gamma: default_gamma(),
            kappa: default_kappa(),
            t0: default_t0(),
            accept_statistic: AcceptStatistic::default(),
        }
    }
}

impl AdaptConfig {
    pub fn validate(&self) -> Result<(), HmcError> {
        if !(self.target_accept > 0.0 && self.target_accept < 1.0) {
            return Err(HmcError::InvalidTarget(self.target_accept));
        }
        let positive = |x: f64| x.is_finite() && x > 0.0;
        if !(positive(self.gamma) && positive(self.kappa) && self.t0.is_finite() && self.t0 >= 0.0)
        {
            return Err(HmcError::InvalidAdaptConfig(format!(
                "gamma={}, kappa={}, t0={}",
                self.gamma, self.kappa, self.t0
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let config: SamplerConfig =
            serde_json::from_str(r#"{"step_size": 0.25, "seed": 7}"#).unwrap();
        assert_eq!(config.step_size, 0.25);
        assert_eq!(config.integration_time, 1.0);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.adapt, AdaptConfig::default());
        assert_eq!(config.step_size_state().unwrap().l(), 4);
    }

    #[test]
    fn round_trip() {
        let config = SamplerConfig {
            step_size: 0.2,
            integration_time: 3.0,
            seed: Some(1),
            adapt: AdaptConfig {
                target_accept: 0.8,
                accept_statistic: AcceptStatistic::Indicator,
                ..AdaptConfig::default()
            },
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: SamplerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn validate_catches_bad_values() {
        let mut config = SamplerConfig {
            step_size: 2.0,
            ..SamplerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(HmcError::ZeroSteps { .. })
        ));
        config.step_size = 0.1;
        config.adapt.target_accept = 1.5;
        assert!(matches!(
            config.validate(),
            Err(HmcError::InvalidTarget(_))
        ));
        config.adapt.target_accept = 0.65;
        config.adapt.gamma = 0.0;
        assert!(config.validate().is_err());
        assert!(SamplerConfig::default().validate().is_ok());
    }
}
