use thiserror::Error;

/// Reasons a simulation request is rejected before any step runs
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("initial population must be positive, got {0}")]
    NonPositivePopulation(i64),
    #[error("carrying capacity must be positive, got {0}")]
    NonPositiveCapacity(f64),
    #[error("environmental variance must be non-negative, got {0}")]
    NegativeVariance(f64),
    #[error("{field} must be a finite number")]
    NonFinite { field: &'static str },
    #[error("years must be at least 1")]
    ZeroYears,
    #[error("simulations must be at least 1")]
    ZeroSimulations,
    #[error("trajectory sample size {requested} exceeds the maximum of {max}")]
    SampleTooLarge { requested: usize, max: usize },
    #[error("years x simulations = {steps} exceeds the limit of {max} steps")]
    WorkloadTooLarge { steps: u64, max: u64 },
    #[error("at least one patch is required")]
    NoPatches,
    #[error("patch {patch} has negative population {value}")]
    NegativePatchPopulation { patch: usize, value: i64 },
    #[error("{field} has {actual} entries but there are {expected} patches")]
    PatchCountMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("migration matrix row {row} has {len} entries, expected {expected}")]
    MatrixNotSquare { row: usize, len: usize, expected: usize },
    #[error("migration rate from patch {from} to patch {to} is invalid: {rate}")]
    InvalidMigrationRate { from: usize, to: usize, rate: f64 },
    #[error("{field} must be a whole number in [{min}, {max}], got {value}")]
    InvalidInteger {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("breeding population must contain at least one individual")]
    EmptyBreedingPopulation,
}

/// Errors surfaced by the JSON entry points
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unknown parameter: {0}")]
    UnknownParameter(String),
}
