//! Closed-form population projections without noise.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Request for a noise-free growth curve
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GrowthProjectionConfig {
    pub initial_population: i64,
    pub growth_rate: f64,
    pub years: usize,
    /// Logistic curve when set, exponential otherwise
    #[serde(default)]
    pub carrying_capacity: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GrowthProjection {
    pub years: Vec<usize>,
    pub population: Vec<f64>,
    pub growth_rate: f64,
    pub carrying_capacity: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EffectivePopulation {
    pub effective_population_size: f64,
    pub breeding_males: u64,
    pub breeding_females: u64,
}

/// Population at time `t` under continuous exponential or logistic growth
pub fn population_at(initial: f64, growth_rate: f64, t: f64, carrying_capacity: Option<f64>) -> f64 {
    let growth = (growth_rate * t).exp();
    match carrying_capacity {
        Some(k) => k * initial * growth / (k + initial * (growth - 1.0)),
        None => initial * growth,
    }
}

/// Project a population over years 0..=T
pub fn project_growth(config: &GrowthProjectionConfig) -> Result<GrowthProjection, ConfigError> {
    if config.initial_population <= 0 {
        return Err(ConfigError::NonPositivePopulation(config.initial_population));
    }
    if !config.growth_rate.is_finite() {
        return Err(ConfigError::NonFinite { field: "growth_rate" });
    }
    if let Some(k) = config.carrying_capacity {
        if !k.is_finite() {
            return Err(ConfigError::NonFinite { field: "carrying_capacity" });
        }
        if k <= 0.0 {
            return Err(ConfigError::NonPositiveCapacity(k));
        }
    }
    if config.years == 0 {
        return Err(ConfigError::ZeroYears);
    }

    let initial = config.initial_population as f64;
    let years: Vec<usize> = (0..=config.years).collect();
    let population = years
        .iter()
        .map(|&year| population_at(initial, config.growth_rate, year as f64, config.carrying_capacity))
        .collect();

    Ok(GrowthProjection {
        years,
        population,
        growth_rate: config.growth_rate,
        carrying_capacity: config.carrying_capacity,
    })
}

/// Effective population size from the breeding sex ratio: Ne = 4·Nm·Nf / (Nm + Nf)
pub fn effective_population_size(breeding_males: u64, breeding_females: u64) -> Result<EffectivePopulation, ConfigError> {
    if breeding_males == 0 && breeding_females == 0 {
        return Err(ConfigError::EmptyBreedingPopulation);
    }
    let males = breeding_males as f64;
    let females = breeding_females as f64;
    Ok(EffectivePopulation {
        effective_population_size: 4.0 * males * females / (males + females),
        breeding_males,
        breeding_females,
    })
}
