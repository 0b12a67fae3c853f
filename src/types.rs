use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Largest trajectory sample a viability request may ask for
pub const MAX_TRAJECTORY_SAMPLE: usize = 100;
/// Upper bound on simulated steps per request (years x replicates, or years x patches²)
pub const MAX_SIMULATION_STEPS: u64 = 50_000_000;

fn default_simulations() -> usize {
    1000
}

fn default_quasi_extinction_threshold() -> u32 {
    50
}

fn default_trajectory_sample_size() -> usize {
    10
}

fn require_finite(value: f64, field: &'static str) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonFinite { field })
    }
}

fn check_workload(steps: u64) -> Result<(), ConfigError> {
    if steps > MAX_SIMULATION_STEPS {
        return Err(ConfigError::WorkloadTooLarge {
            steps,
            max: MAX_SIMULATION_STEPS,
        });
    }
    Ok(())
}

/// Population viability request for a single population
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Starting number of individuals
    pub initial_population: i64,
    /// Mean intrinsic growth rate r (may be negative)
    pub growth_rate: f64,
    /// Variance σ² of the yearly realized growth rate
    pub environmental_variance: f64,
    /// Carrying capacity K
    pub carrying_capacity: f64,
    /// Projection horizon T
    pub years: usize,
    /// Number of Monte Carlo replicates S
    #[serde(default = "default_simulations")]
    pub simulations: usize,
    /// A replicate whose minimum falls to or below this size counts as quasi-extinct
    #[serde(default = "default_quasi_extinction_threshold")]
    pub quasi_extinction_threshold: u32,
    /// How many raw trajectories to return alongside the aggregates
    #[serde(default = "default_trajectory_sample_size")]
    pub trajectory_sample_size: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            initial_population: 50,
            growth_rate: 0.05,
            environmental_variance: 0.1,
            carrying_capacity: 200.0,
            years: 20,
            simulations: default_simulations(),
            quasi_extinction_threshold: default_quasi_extinction_threshold(),
            trajectory_sample_size: default_trajectory_sample_size(),
        }
    }
}

impl SimulationConfig {
    /// Reject configurations that cannot be simulated
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_population <= 0 {
            return Err(ConfigError::NonPositivePopulation(self.initial_population));
        }
        require_finite(self.growth_rate, "growth_rate")?;
        require_finite(self.environmental_variance, "environmental_variance")?;
        require_finite(self.carrying_capacity, "carrying_capacity")?;
        if self.environmental_variance < 0.0 {
            return Err(ConfigError::NegativeVariance(self.environmental_variance));
        }
        if self.carrying_capacity <= 0.0 {
            return Err(ConfigError::NonPositiveCapacity(self.carrying_capacity));
        }
        if self.years == 0 {
            return Err(ConfigError::ZeroYears);
        }
        if self.simulations == 0 {
            return Err(ConfigError::ZeroSimulations);
        }
        if self.trajectory_sample_size > MAX_TRAJECTORY_SAMPLE {
            return Err(ConfigError::SampleTooLarge {
                requested: self.trajectory_sample_size,
                max: MAX_TRAJECTORY_SAMPLE,
            });
        }
        check_workload((self.years as u64).saturating_mul(self.simulations as u64))
    }

    /// Standard deviation of the realized growth rate
    pub fn environmental_std(&self) -> f64 {
        self.environmental_variance.sqrt()
    }
}

/// Per-patch growth parameters
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatchConfig {
    pub carrying_capacity: f64,
    pub growth_rate: f64,
}

/// Per-year emigration rates between patches, indexed [from][to]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MigrationMatrix(pub Vec<Vec<f64>>);

impl MigrationMatrix {
    /// Matrix with no movement between any pair of patches
    pub fn zeros(patches: usize) -> Self {
        Self(vec![vec![0.0; patches]; patches])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Emigration rate from `from` to `to`; the diagonal is always zero
    pub fn rate(&self, from: usize, to: usize) -> f64 {
        if from == to {
            0.0
        } else {
            self.0[from][to]
        }
    }

    /// Total fraction of a patch that leaves each year
    pub fn outflow(&self, from: usize) -> f64 {
        (0..self.len()).map(|to| self.rate(from, to)).sum()
    }

    /// Check the matrix is square with `patches` rows and holds finite non-negative rates
    pub fn validate(&self, patches: usize) -> Result<(), ConfigError> {
        if self.len() != patches {
            return Err(ConfigError::PatchCountMismatch {
                field: "migration_matrix",
                expected: patches,
                actual: self.len(),
            });
        }
        for (from, row) in self.0.iter().enumerate() {
            if row.len() != patches {
                return Err(ConfigError::MatrixNotSquare {
                    row: from,
                    len: row.len(),
                    expected: patches,
                });
            }
            for (to, &rate) in row.iter().enumerate() {
                // Diagonal entries are ignored, but garbage there is still rejected
                if !rate.is_finite() || rate < 0.0 {
                    return Err(ConfigError::InvalidMigrationRate { from, to, rate });
                }
            }
        }
        Ok(())
    }
}

/// Metapopulation request: one entry per patch in every list
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetapopulationConfig {
    pub patch_populations: Vec<i64>,
    pub patch_capacities: Vec<f64>,
    pub growth_rates: Vec<f64>,
    pub migration_matrix: MigrationMatrix,
    pub years: usize,
}

impl MetapopulationConfig {
    pub fn patch_count(&self) -> usize {
        self.patch_populations.len()
    }

    /// Reject mismatched dimensions and invalid patch parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        let patches = self.patch_count();
        if patches == 0 {
            return Err(ConfigError::NoPatches);
        }
        for (field, actual) in [
            ("patch_capacities", self.patch_capacities.len()),
            ("growth_rates", self.growth_rates.len()),
        ] {
            if actual != patches {
                return Err(ConfigError::PatchCountMismatch {
                    field,
                    expected: patches,
                    actual,
                });
            }
        }
        for (patch, &value) in self.patch_populations.iter().enumerate() {
            if value < 0 {
                return Err(ConfigError::NegativePatchPopulation { patch, value });
            }
        }
        for &capacity in &self.patch_capacities {
            require_finite(capacity, "patch_capacities")?;
            if capacity <= 0.0 {
                return Err(ConfigError::NonPositiveCapacity(capacity));
            }
        }
        for &rate in &self.growth_rates {
            require_finite(rate, "growth_rates")?;
        }
        self.migration_matrix.validate(patches)?;
        if self.years == 0 {
            return Err(ConfigError::ZeroYears);
        }
        let per_year = (patches as u64).saturating_mul(patches as u64);
        check_workload((self.years as u64).saturating_mul(per_year))
    }

    pub fn patches(&self) -> Vec<PatchConfig> {
        self.patch_capacities
            .iter()
            .zip(&self.growth_rates)
            .map(|(&carrying_capacity, &growth_rate)| PatchConfig {
                carrying_capacity,
                growth_rate,
            })
            .collect()
    }
}

/// Population sizes for years 0..=T of one replicate
pub type PopulationTrajectory = Vec<f64>;

/// Extinction bookkeeping for one replicate
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExtinctionRecord {
    /// First year the population reached zero, if it did
    pub extinction_year: Option<usize>,
    /// Smallest population seen anywhere in the trajectory
    pub minimum_population: f64,
}

impl ExtinctionRecord {
    pub fn new(initial_population: f64) -> Self {
        Self {
            extinction_year: None,
            minimum_population: initial_population,
        }
    }

    /// Fold one year's population into the record
    pub fn observe(&mut self, year: usize, population: f64) {
        if population <= 0.0 && self.extinction_year.is_none() {
            self.extinction_year = Some(year);
        }
        self.minimum_population = self.minimum_population.min(population);
    }

    pub fn is_extinct(&self) -> bool {
        self.extinction_year.is_some()
    }

    pub fn is_quasi_extinct(&self, threshold: f64) -> bool {
        self.minimum_population <= threshold
    }
}

/// Aggregated outcome of a viability run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ViabilityResult {
    pub extinction_probability: f64,
    /// Mean final size over replicates still alive at the horizon (0 if none)
    pub mean_final_population: f64,
    /// First N replicate trajectories, for display
    pub population_trajectories: Vec<PopulationTrajectory>,
    /// Extinction year of each sampled trajectory
    pub years_to_extinction: Vec<Option<usize>>,
    pub quasi_extinction_probability: f64,
    pub quasi_extinction_threshold: u32,
}

/// Yearly state of every patch plus network-level series
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MetapopulationResult {
    pub years: Vec<usize>,
    /// patch_populations[year][patch]
    pub patch_populations: Vec<Vec<f64>>,
    pub total_population: Vec<f64>,
    /// Fraction of patches holding fewer than one individual
    pub extinction_risk: Vec<f64>,
}

/// One row of a sensitivity sweep
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SweepPoint {
    pub parameter_value: f64,
    pub extinction_probability: f64,
    pub quasi_extinction_probability: f64,
    pub mean_final_population: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_patch_config() -> MetapopulationConfig {
        MetapopulationConfig {
            patch_populations: vec![100, 100],
            patch_capacities: vec![200.0, 200.0],
            growth_rates: vec![0.1, 0.1],
            migration_matrix: MigrationMatrix::zeros(2),
            years: 5,
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.simulations, 1000);
        assert_eq!(config.quasi_extinction_threshold, 50);
        assert_eq!(config.trajectory_sample_size, 10);
    }

    #[test]
    fn test_optional_fields_default_when_missing() {
        let json = r#"{
            "initial_population": 50,
            "growth_rate": 0.05,
            "environmental_variance": 0.1,
            "carrying_capacity": 200,
            "years": 20
        }"#;
        let config: SimulationConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.simulations, 1000);
        assert_eq!(config.quasi_extinction_threshold, 50);
        assert_eq!(config.trajectory_sample_size, 10);
    }

    #[test]
    fn test_rejects_bad_simulation_config() {
        let base = SimulationConfig::default();

        let config = SimulationConfig { initial_population: 0, ..base.clone() };
        assert_eq!(config.validate(), Err(ConfigError::NonPositivePopulation(0)));

        let config = SimulationConfig { carrying_capacity: 0.0, ..base.clone() };
        assert_eq!(config.validate(), Err(ConfigError::NonPositiveCapacity(0.0)));

        let config = SimulationConfig { environmental_variance: -0.1, ..base.clone() };
        assert_eq!(config.validate(), Err(ConfigError::NegativeVariance(-0.1)));

        let config = SimulationConfig { growth_rate: f64::NAN, ..base.clone() };
        assert!(matches!(config.validate(), Err(ConfigError::NonFinite { .. })));

        let config = SimulationConfig { years: 0, ..base.clone() };
        assert_eq!(config.validate(), Err(ConfigError::ZeroYears));

        let config = SimulationConfig { simulations: 0, ..base.clone() };
        assert_eq!(config.validate(), Err(ConfigError::ZeroSimulations));

        let config = SimulationConfig { trajectory_sample_size: 101, ..base.clone() };
        assert!(matches!(config.validate(), Err(ConfigError::SampleTooLarge { .. })));

        let config = SimulationConfig { years: 100_000, simulations: 1_000, ..base };
        assert!(matches!(config.validate(), Err(ConfigError::WorkloadTooLarge { .. })));
    }

    #[test]
    fn test_migration_matrix_ignores_diagonal() {
        let matrix = MigrationMatrix(vec![vec![0.9, 0.1], vec![0.2, 0.5]]);
        assert_eq!(matrix.rate(0, 0), 0.0);
        assert_eq!(matrix.rate(0, 1), 0.1);
        assert!((matrix.outflow(0) - 0.1).abs() < 1e-12);
        assert!((matrix.outflow(1) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_malformed_metapopulation() {
        assert!(two_patch_config().validate().is_ok());

        let mut config = two_patch_config();
        config.patch_capacities.push(10.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::PatchCountMismatch { field: "patch_capacities", .. })
        ));

        let mut config = two_patch_config();
        config.migration_matrix = MigrationMatrix(vec![vec![0.0, 0.1], vec![0.1]]);
        assert!(matches!(config.validate(), Err(ConfigError::MatrixNotSquare { row: 1, .. })));

        let mut config = two_patch_config();
        config.migration_matrix = MigrationMatrix::zeros(3);
        assert!(matches!(config.validate(), Err(ConfigError::PatchCountMismatch { .. })));

        let mut config = two_patch_config();
        config.migration_matrix.0[0][1] = -0.1;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidMigrationRate { .. })));

        let mut config = two_patch_config();
        config.patch_capacities[1] = -5.0;
        assert_eq!(config.validate(), Err(ConfigError::NonPositiveCapacity(-5.0)));

        let mut config = two_patch_config();
        config.patch_populations[0] = -1;
        assert!(matches!(config.validate(), Err(ConfigError::NegativePatchPopulation { .. })));

        let config = MetapopulationConfig {
            patch_populations: vec![],
            patch_capacities: vec![],
            growth_rates: vec![],
            migration_matrix: MigrationMatrix::default(),
            years: 5,
        };
        assert_eq!(config.validate(), Err(ConfigError::NoPatches));
    }

    #[test]
    fn test_extinction_record_tracks_first_zero_and_minimum() {
        let mut record = ExtinctionRecord::new(40.0);
        for (year, population) in [(1, 12.0), (2, 30.0), (3, 0.0), (4, 0.0)] {
            record.observe(year, population);
        }
        assert_eq!(record.extinction_year, Some(3));
        assert_eq!(record.minimum_population, 0.0);
        assert!(record.is_extinct());
        assert!(record.is_quasi_extinct(50.0));

        let mut record = ExtinctionRecord::new(200.0);
        record.observe(1, 80.0);
        record.observe(2, 150.0);
        assert!(!record.is_extinct());
        assert!(!record.is_quasi_extinct(50.0));
        assert_eq!(record.minimum_population, 80.0);
    }
}
