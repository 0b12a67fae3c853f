use crate::demographic::apply_demographic_noise;
use crate::error::{ConfigError, EngineError};
use crate::growth::GrowthKernel;
use crate::types::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

/// Derive an independent generator seed for one replicate.
///
/// SplitMix64 finalizer over (base seed, index), so that runs whose base
/// seeds differ by a small amount do not share replicate streams.
pub fn replicate_seed(base_seed: u64, index: usize) -> u64 {
    let mut z = base_seed.wrapping_add((index as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Result of simulating one replicate trajectory
#[derive(Clone, Debug)]
pub struct ReplicateOutcome {
    pub record: ExtinctionRecord,
    pub final_population: f64,
    /// Full trajectory, only kept for sampled replicates
    pub trajectory: Option<PopulationTrajectory>,
}

/// Monte Carlo population viability run
pub struct ViabilitySimulation {
    config: SimulationConfig,
    kernel: GrowthKernel,
    seed: u64,
}

impl ViabilitySimulation {
    pub fn new(config: SimulationConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        let kernel = GrowthKernel::stochastic(&config)?;
        Ok(Self { config, kernel, seed })
    }

    /// Simulate replicate `index` with its own generator
    pub fn run_replicate(&self, index: usize, keep_trajectory: bool) -> ReplicateOutcome {
        let mut rng = StdRng::seed_from_u64(replicate_seed(self.seed, index));
        let years = self.config.years;
        let initial = self.config.initial_population as f64;

        let mut record = ExtinctionRecord::new(initial);
        let mut trajectory = keep_trajectory.then(|| {
            let mut t = Vec::with_capacity(years + 1);
            t.push(initial);
            t
        });

        let mut population = initial;
        for year in 1..=years {
            // 1. Logistic growth under this year's shared environment
            let grown = self.kernel.step(population, &mut rng);

            // 2. Demographic noise once the population is small
            population = apply_demographic_noise(grown, &mut rng);
            record.observe(year, population);
            if let Some(t) = trajectory.as_mut() {
                t.push(population);
            }

            // Extinction is absorbing: the remaining years are all zero
            if population <= 0.0 {
                if let Some(t) = trajectory.as_mut() {
                    t.resize(years + 1, 0.0);
                }
                break;
            }
        }

        ReplicateOutcome {
            record,
            final_population: population,
            trajectory,
        }
    }

    /// Run every replicate and aggregate
    pub fn run(&self) -> ViabilityResult {
        let simulations = self.config.simulations;
        let sample_size = self.config.trajectory_sample_size.min(simulations);

        log::debug!(
            "viability run: N0={} r={} var={} K={} years={} simulations={}",
            self.config.initial_population,
            self.config.growth_rate,
            self.config.environmental_variance,
            self.config.carrying_capacity,
            self.config.years,
            simulations
        );

        // Replicates share nothing but the read-only config; collecting in
        // index order keeps the result independent of the worker count
        let outcomes: Vec<ReplicateOutcome> = (0..simulations)
            .into_par_iter()
            .map(|index| self.run_replicate(index, index < sample_size))
            .collect();

        let result = summarize(outcomes, self.config.quasi_extinction_threshold);
        log::debug!(
            "viability run finished: P(extinct)={:.4} P(quasi)={:.4} mean final={:.2}",
            result.extinction_probability,
            result.quasi_extinction_probability,
            result.mean_final_population
        );
        result
    }
}

/// Reduce replicate outcomes to the aggregate statistics
pub fn summarize(outcomes: Vec<ReplicateOutcome>, quasi_extinction_threshold: u32) -> ViabilityResult {
    let total = outcomes.len();
    let threshold = quasi_extinction_threshold as f64;

    let mut extinct = 0usize;
    let mut quasi_extinct = 0usize;
    let mut survivors = 0usize;
    let mut survivor_total = 0.0;
    let mut population_trajectories = Vec::new();
    let mut years_to_extinction = Vec::new();

    for outcome in outcomes {
        if outcome.record.is_extinct() {
            extinct += 1;
        }
        if outcome.record.is_quasi_extinct(threshold) {
            quasi_extinct += 1;
        }
        if outcome.final_population > 0.0 {
            survivors += 1;
            survivor_total += outcome.final_population;
        }
        if let Some(trajectory) = outcome.trajectory {
            population_trajectories.push(trajectory);
            years_to_extinction.push(outcome.record.extinction_year);
        }
    }

    let fraction = |count: usize| {
        if total == 0 {
            0.0
        } else {
            count as f64 / total as f64
        }
    };

    ViabilityResult {
        extinction_probability: fraction(extinct),
        mean_final_population: if survivors > 0 {
            survivor_total / survivors as f64
        } else {
            0.0
        },
        population_trajectories,
        years_to_extinction,
        quasi_extinction_probability: fraction(quasi_extinct),
        quasi_extinction_threshold,
    }
}

/// Validate a configuration and run the viability analysis
pub fn run_population_viability(config: &SimulationConfig, seed: u64) -> Result<ViabilityResult, ConfigError> {
    Ok(ViabilitySimulation::new(config.clone(), seed)?.run())
}

/// Largest magnitude at which every integer is exactly representable as f64
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Accept `value` only if it is an integer inside [min, max]
fn whole_number(value: f64, field: &'static str, min: f64, max: f64) -> Result<f64, ConfigError> {
    if !value.is_finite() || value.fract() != 0.0 || value < min || value > max {
        return Err(ConfigError::InvalidInteger { field, value, min, max });
    }
    Ok(value)
}

/// Run the viability analysis once per value of a single parameter
pub fn run_sensitivity_sweep(
    base_config: &SimulationConfig,
    parameter: &str,
    values: &[f64],
    seed: u64,
) -> Result<Vec<SweepPoint>, EngineError> {
    let mut results = Vec::with_capacity(values.len());

    for (i, &value) in values.iter().enumerate() {
        let mut config = base_config.clone();

        // Update the specified parameter; integer fields take only exact whole values
        let applied = match parameter {
            "growth_rate" => {
                config.growth_rate = value;
                config.growth_rate
            }
            "environmental_variance" => {
                config.environmental_variance = value;
                config.environmental_variance
            }
            "carrying_capacity" => {
                config.carrying_capacity = value;
                config.carrying_capacity
            }
            "initial_population" => {
                let n = whole_number(value, "initial_population", -MAX_EXACT_INTEGER, MAX_EXACT_INTEGER)?;
                config.initial_population = n as i64;
                config.initial_population as f64
            }
            "quasi_extinction_threshold" => {
                let n = whole_number(value, "quasi_extinction_threshold", 0.0, u32::MAX as f64)?;
                config.quasi_extinction_threshold = n as u32;
                config.quasi_extinction_threshold as f64
            }
            _ => return Err(EngineError::UnknownParameter(parameter.to_string())),
        };

        let result = run_population_viability(&config, seed.wrapping_add(i as u64))?;
        results.push(SweepPoint {
            parameter_value: applied,
            extinction_probability: result.extinction_probability,
            quasi_extinction_probability: result.quasi_extinction_probability,
            mean_final_population: result.mean_final_population,
        });
    }

    Ok(results)
}
