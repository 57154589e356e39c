//! Scenario configuration
//!
//! Everything an engine needs before its first step. Deserialises from JSON
//! with every field optional:
//!
//! ```json
//! {
//!   "name": "Barrier search",
//!   "start_time": 100,
//!   "scenario_step_ms": 1000,
//!   "step_delay_ms": 0,
//!   "seed": 42
//! }
//! ```

use super::engine::ScenarioError;
use crate::core::clock::SimTime;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete scenario configuration
///
/// # Fields
///
/// * `name` - Scenario name (defaults to "Scenario")
/// * `case_id` - Permutation id used by batch generators (defaults to `Case_<n>`)
/// * `start_time` - Simulated start time and restart target (millis)
/// * `scenario_step_ms` - Simulated millis per step, must be positive
/// * `step_delay_ms` - Wall-clock millis between auto-steps (0 = run flat out)
/// * `seed` - Seed applied to the engine's RNG on every `start()`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub name: Option<String>,
    pub case_id: Option<String>,
    pub start_time: SimTime,
    pub scenario_step_ms: i64,
    pub step_delay_ms: u64,
    pub seed: Option<u64>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            name: None,
            case_id: None,
            start_time: 0,
            scenario_step_ms: 1000,
            step_delay_ms: 0,
            seed: None,
        }
    }
}

impl ScenarioConfig {
    /// Parse a configuration from JSON text
    pub fn from_json_str(json: &str) -> Result<Self, ScenarioError> {
        let config: ScenarioConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON configuration file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let text = std::fs::read_to_string(path).map_err(ScenarioError::ConfigIo)?;
        Self::from_json_str(&text)
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.scenario_step_ms <= 0 {
            return Err(ScenarioError::InvalidConfig(format!(
                "scenario_step_ms must be > 0, got {}",
                self.scenario_step_ms
            )));
        }

        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(ScenarioError::InvalidConfig(
                    "name must not be blank".to_string(),
                ));
            }
        }

        Ok(())
    }
}
