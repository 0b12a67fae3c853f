use crate::error::ConfigError;
use crate::growth::GrowthKernel;
use crate::types::*;

/// Patches below this size count towards the extinction risk
const OCCUPANCY_THRESHOLD: f64 = 1.0;

/// Move individuals between patches as a single batch.
///
/// Every flow is computed from the pre-migration sizes, so the outcome does
/// not depend on patch order and the total is unchanged. The result is not
/// clamped: an outflow rate above 1 leaves the source patch negative.
pub fn migrate(populations: &[f64], matrix: &MigrationMatrix) -> Vec<f64> {
    let n = populations.len();
    let mut next = populations.to_vec();
    for from in 0..n {
        for to in 0..n {
            if from == to {
                continue;
            }
            let emigrants = populations[from] * matrix.rate(from, to);
            next[from] -= emigrants;
            next[to] += emigrants;
        }
    }
    next
}

/// Share of patches holding fewer than one individual
pub fn extinction_risk(populations: &[f64]) -> f64 {
    if populations.is_empty() {
        return 0.0;
    }
    let empty = populations.iter().filter(|&&n| n < OCCUPANCY_THRESHOLD).count();
    empty as f64 / populations.len() as f64
}

/// Deterministic growth on a network of patches coupled by migration
pub struct MetapopulationSimulation {
    kernels: Vec<GrowthKernel>,
    migration: MigrationMatrix,
    initial: Vec<f64>,
    years: usize,
}

impl MetapopulationSimulation {
    pub fn new(config: &MetapopulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let kernels = config.patches().iter().map(GrowthKernel::deterministic).collect();
        Ok(Self {
            kernels,
            migration: config.migration_matrix.clone(),
            initial: config.patch_populations.iter().map(|&n| n as f64).collect(),
            years: config.years,
        })
    }

    /// Growth then migration for one year; returns the new sizes and whether clamping was needed
    pub fn step(&self, populations: &[f64]) -> (Vec<f64>, bool) {
        // 1. Independent growth in every patch
        let grown: Vec<f64> = self
            .kernels
            .iter()
            .zip(populations)
            .map(|(kernel, &n)| kernel.step_deterministic(n))
            .collect();

        // 2. Simultaneous emigration and immigration
        let mut migrated = migrate(&grown, &self.migration);

        // 3. Outflow above 1 can push a patch negative, or to NaN once flows overflow
        let mut clamped = false;
        for n in migrated.iter_mut() {
            if n.is_nan() || *n < 0.0 {
                *n = 0.0;
                clamped = true;
            }
        }
        (migrated, clamped)
    }

    pub fn run(&self) -> MetapopulationResult {
        let (result, clamp_events) = self.run_with_clamp_count();
        if clamp_events > 0 {
            log::warn!(
                "migration outflow exceeded patch size in {} of {} years; negative patches were clamped to zero",
                clamp_events,
                self.years
            );
        }
        result
    }

    /// Run the projection and also report in how many years a patch was clamped
    pub fn run_with_clamp_count(&self) -> (MetapopulationResult, usize) {
        log::debug!(
            "metapopulation run: patches={} years={}",
            self.initial.len(),
            self.years
        );

        let mut result = MetapopulationResult::default();
        let mut populations = self.initial.clone();
        let mut clamp_events = 0usize;
        record_year(&mut result, 0, &populations);

        for year in 1..=self.years {
            let (next, clamped) = self.step(&populations);
            if clamped {
                clamp_events += 1;
            }
            populations = next;
            record_year(&mut result, year, &populations);
        }
        (result, clamp_events)
    }
}

fn record_year(result: &mut MetapopulationResult, year: usize, populations: &[f64]) {
    result.years.push(year);
    result.total_population.push(populations.iter().sum());
    result.extinction_risk.push(extinction_risk(populations));
    result.patch_populations.push(populations.to_vec());
}

/// Validate a configuration and run the metapopulation projection
pub fn run_metapopulation(config: &MetapopulationConfig) -> Result<MetapopulationResult, ConfigError> {
    Ok(MetapopulationSimulation::new(config)?.run())
}
