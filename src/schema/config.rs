//! Engine configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

fn default_population_size() -> usize {
    3
}
fn default_mutation_rate() -> f64 {
    0.2
}
fn default_simulation_seconds() -> f64 {
    // 300 animation frames at 24 fps in the original rig.
    12.5
}

/// Top-level configuration for the evolution engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Creatures per generation.
    #[serde(default = "default_population_size")]
    pub population_size: usize,
    /// Per-field mutation probability applied to bred children.
    #[serde(default = "default_mutation_rate")]
    pub mutation_rate: f64,
    /// Blocking simulation run length per evaluation cycle.
    #[serde(default = "default_simulation_seconds")]
    pub simulation_seconds: f64,
    /// Population database path. `None` keeps the population in memory.
    #[serde(default)]
    pub store_path: Option<PathBuf>,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            population_size: default_population_size(),
            mutation_rate: default_mutation_rate(),
            simulation_seconds: default_simulation_seconds(),
            store_path: None,
            random_seed: None,
        }
    }
}

impl EngineConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size < 2 {
            return Err(ConfigError::PopulationTooSmall {
                size: self.population_size,
            });
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(ConfigError::InvalidMutationRate(self.mutation_rate));
        }
        if !(self.simulation_seconds > 0.0 && self.simulation_seconds.is_finite()) {
            return Err(ConfigError::InvalidDuration(self.simulation_seconds));
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("population size must be at least 2, got {size}")]
    PopulationTooSmall { size: usize },
    #[error("mutation rate must be within [0, 1], got {0}")]
    InvalidMutationRate(f64),
    #[error("simulation duration must be positive, got {0}")]
    InvalidDuration(f64),
}
