use crate::error::ConfigError;
use crate::types::{PatchConfig, SimulationConfig};
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Discrete-time logistic update in exponential (Ricker) form:
/// N' = N · exp(r · (1 − N/K)).
///
/// Non-positive populations are absorbing and stay at zero. An overflowing
/// product saturates at `f64::MAX` instead of becoming infinite.
pub fn logistic_step(population: f64, growth_rate: f64, carrying_capacity: f64) -> f64 {
    if population <= 0.0 {
        return 0.0;
    }
    let factor = (growth_rate * (1.0 - population / carrying_capacity)).exp();
    (population * factor).min(f64::MAX)
}

/// One-patch growth update with optional environmental noise
#[derive(Clone, Debug)]
pub struct GrowthKernel {
    growth_rate: f64,
    carrying_capacity: f64,
    /// Distribution of the realized growth rate; None when variance is zero
    environment: Option<Normal<f64>>,
}

impl GrowthKernel {
    /// Kernel drawing r_t ~ Normal(r, σ) each step
    ///
    /// Only a variance of exactly zero disables the noise; any variance that
    /// does not give a usable standard deviation is an error.
    pub fn stochastic(config: &SimulationConfig) -> Result<Self, ConfigError> {
        let variance = config.environmental_variance;
        let environment = if variance == 0.0 {
            None
        } else {
            if !variance.is_finite() {
                return Err(ConfigError::NonFinite { field: "environmental_variance" });
            }
            if variance < 0.0 {
                return Err(ConfigError::NegativeVariance(variance));
            }
            let normal = Normal::new(config.growth_rate, config.environmental_std())
                .map_err(|_| ConfigError::NonFinite { field: "growth_rate" })?;
            Some(normal)
        };
        Ok(Self {
            growth_rate: config.growth_rate,
            carrying_capacity: config.carrying_capacity,
            environment,
        })
    }

    /// Noise-free kernel for a single patch
    pub fn deterministic(patch: &PatchConfig) -> Self {
        Self {
            growth_rate: patch.growth_rate,
            carrying_capacity: patch.carrying_capacity,
            environment: None,
        }
    }

    /// Growth rate realized this step; one draw is shared by the whole patch
    pub fn realized_growth_rate(&self, rng: &mut impl Rng) -> f64 {
        match &self.environment {
            Some(normal) => normal.sample(rng),
            None => self.growth_rate,
        }
    }

    /// Advance the population one year
    pub fn step(&self, population: f64, rng: &mut impl Rng) -> f64 {
        if population <= 0.0 {
            return 0.0;
        }
        let realized = self.realized_growth_rate(rng);
        logistic_step(population, realized, self.carrying_capacity)
    }

    /// Advance the population one year without consuming randomness
    pub fn step_deterministic(&self, population: f64) -> f64 {
        logistic_step(population, self.growth_rate, self.carrying_capacity)
    }
}
