pub mod demographic;
pub mod error;
pub mod growth;
pub mod metapopulation;
pub mod projection;
pub mod simulation;
pub mod types;

use error::EngineError;
use types::*;
use wasm_bindgen::prelude::*;

/// Initialize panic hook and console logging
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    init_logging();
}

/// Install the log backend: browser console on wasm, env_logger elsewhere.
/// Later calls are no-ops.
pub fn init_logging() {
    #[cfg(target_arch = "wasm32")]
    let _ = console_log::init_with_level(log::Level::Info);
    #[cfg(not(target_arch = "wasm32"))]
    let _ = env_logger::try_init();
}

fn to_js(err: EngineError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Monte Carlo viability analysis from a JSON `SimulationConfig`
pub fn run_population_viability_json(config_json: &str, seed: u64) -> Result<String, EngineError> {
    let config: SimulationConfig = serde_json::from_str(config_json)?;
    let result = simulation::run_population_viability(&config, seed)?;
    Ok(serde_json::to_string(&result)?)
}

/// Metapopulation projection from a JSON `MetapopulationConfig`
pub fn run_metapopulation_json(config_json: &str) -> Result<String, EngineError> {
    let config: MetapopulationConfig = serde_json::from_str(config_json)?;
    let result = metapopulation::run_metapopulation(&config)?;
    Ok(serde_json::to_string(&result)?)
}

/// Deterministic growth curve from a JSON `GrowthProjectionConfig`
pub fn project_population_growth_json(config_json: &str) -> Result<String, EngineError> {
    let config: projection::GrowthProjectionConfig = serde_json::from_str(config_json)?;
    let result = projection::project_growth(&config)?;
    Ok(serde_json::to_string(&result)?)
}

pub fn effective_population_size_json(breeding_males: u64, breeding_females: u64) -> Result<String, EngineError> {
    let result = projection::effective_population_size(breeding_males, breeding_females)?;
    Ok(serde_json::to_string(&result)?)
}

/// Parameter sweep over one `SimulationConfig` field
pub fn run_sensitivity_sweep_json(
    base_config_json: &str,
    parameter: &str,
    values_json: &str,
    seed: u64,
) -> Result<String, EngineError> {
    let base_config: SimulationConfig = serde_json::from_str(base_config_json)?;
    let values: Vec<f64> = serde_json::from_str(values_json)?;
    let rows = simulation::run_sensitivity_sweep(&base_config, parameter, &values, seed)?;
    Ok(serde_json::to_string(&rows)?)
}

/// Run a population viability analysis
#[wasm_bindgen]
pub fn run_population_viability(config_json: &str, seed: u64) -> Result<String, JsValue> {
    run_population_viability_json(config_json, seed).map_err(to_js)
}

/// Run a metapopulation projection
#[wasm_bindgen]
pub fn run_metapopulation(config_json: &str) -> Result<String, JsValue> {
    run_metapopulation_json(config_json).map_err(to_js)
}

/// Project deterministic exponential or logistic growth
#[wasm_bindgen]
pub fn project_population_growth(config_json: &str) -> Result<String, JsValue> {
    project_population_growth_json(config_json).map_err(to_js)
}

/// Effective population size from breeding males and females
#[wasm_bindgen]
pub fn effective_population_size(breeding_males: u64, breeding_females: u64) -> Result<String, JsValue> {
    effective_population_size_json(breeding_males, breeding_females).map_err(to_js)
}

/// Run a parameter sweep experiment
#[wasm_bindgen]
pub fn run_sensitivity_sweep(
    base_config_json: &str,
    parameter: &str,
    values_json: &str,
    seed: u64,
) -> Result<String, JsValue> {
    run_sensitivity_sweep_json(base_config_json, parameter, values_json, seed).map_err(to_js)
}

/// Get default viability config as JSON
#[wasm_bindgen]
pub fn get_default_config() -> String {
    serde_json::to_string(&SimulationConfig::default()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_viability_json_round() {
        let json = r#"{
            "initial_population": 50,
            "growth_rate": 0.05,
            "environmental_variance": 0.1,
            "carrying_capacity": 200,
            "years": 20,
            "simulations": 100
        }"#;
        let out: Value = serde_json::from_str(&run_population_viability_json(json, 42).unwrap()).unwrap();
        for key in [
            "extinction_probability",
            "mean_final_population",
            "population_trajectories",
            "years_to_extinction",
            "quasi_extinction_probability",
            "quasi_extinction_threshold",
        ] {
            assert!(out.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(out["quasi_extinction_threshold"], 50);
        assert!(out["population_trajectories"].as_array().unwrap().len() <= 10);
    }

    #[test]
    fn test_viability_json_rejects_bad_input() {
        let json = r#"{
            "initial_population": 50,
            "growth_rate": 0.05,
            "environmental_variance": 0.1,
            "carrying_capacity": 0,
            "years": 20
        }"#;
        assert!(matches!(run_population_viability_json(json, 1), Err(EngineError::Config(_))));
        assert!(matches!(run_population_viability_json("{", 1), Err(EngineError::Parse(_))));
    }

    #[test]
    fn test_metapopulation_json() {
        let json = r#"{
            "patch_populations": [50, 50],
            "patch_capacities": [100, 100],
            "growth_rates": [0.1, 0.1],
            "migration_matrix": [[0, 0], [0, 0]],
            "years": 5
        }"#;
        let out: Value = serde_json::from_str(&run_metapopulation_json(json).unwrap()).unwrap();
        let patches = out["patch_populations"].as_array().unwrap();
        assert_eq!(patches.len(), 6);
        let last = patches.last().unwrap().as_array().unwrap();
        assert_eq!(last[0], last[1]);
        assert_eq!(out["total_population"][0], 100.0);
    }

    #[test]
    fn test_metapopulation_json_rejects_mismatch() {
        let json = r#"{
            "patch_populations": [50, 50],
            "patch_capacities": [100],
            "growth_rates": [0.1, 0.1],
            "migration_matrix": [[0, 0], [0, 0]],
            "years": 5
        }"#;
        assert!(matches!(run_metapopulation_json(json), Err(EngineError::Config(_))));
    }

    #[test]
    fn test_projection_json_without_capacity() {
        let json = r#"{"initial_population": 100, "growth_rate": 0.05, "years": 10}"#;
        let out: Value = serde_json::from_str(&project_population_growth_json(json).unwrap()).unwrap();
        assert!(out["carrying_capacity"].is_null());
        assert_eq!(out["years"].as_array().unwrap().len(), 11);
        let last = out["population"][10].as_f64().unwrap();
        assert!((last - 100.0 * 0.5_f64.exp()).abs() < 0.01);
    }

    #[test]
    fn test_effective_population_json() {
        let out: Value = serde_json::from_str(&effective_population_size_json(25, 25).unwrap()).unwrap();
        assert_eq!(out["effective_population_size"], 50.0);
    }

    #[test]
    fn test_sweep_json() {
        let base = get_default_config();
        let out: Value =
            serde_json::from_str(&run_sensitivity_sweep_json(&base, "carrying_capacity", "[100, 400]", 9).unwrap())
                .unwrap();
        assert_eq!(out.as_array().unwrap().len(), 2);
        assert!(matches!(
            run_sensitivity_sweep_json(&base, "years", "[1]", 9),
            Err(EngineError::UnknownParameter(_))
        ));
    }

    #[test]
    fn test_init_logging_twice() {
        init_logging();
        init_logging();
        log::info!("logger installed");
    }

    #[test]
    fn test_default_config_round_trips() {
        let config: SimulationConfig = serde_json::from_str(&get_default_config()).unwrap();
        assert!(config.validate().is_ok());
    }
}
