//! Configuration parsing and validation for lattice simulations

use lbm_kernel::{Field, LatticeConfig, Scenario};
use serde::{Deserialize, Serialize};
use std::fs;

/// Main simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Human-readable simulation name
    pub name: String,
    /// Lattice width (sites)
    pub width: usize,
    /// Lattice height (sites)
    pub height: usize,
    /// Total worker count, calling thread included
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Flow setup
    #[serde(default)]
    pub scenario: ConfigScenario,
    /// Stop after this many timesteps
    pub max_timesteps: Option<u64>,
    /// Publish a snapshot every this many timesteps
    #[serde(default = "default_output_interval")]
    pub output_interval: u64,
    /// Scalar field written by text output
    #[serde(default)]
    pub output_field: Field,
}

/// Flow scenario configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConfigScenario {
    /// Fully periodic box
    Periodic {
        /// Initial uniform velocity (lattice units)
        #[serde(default)]
        initial_velocity: [f64; 2],
    },
    /// Periodic in x with wall rows top and bottom
    Pipe,
    /// Walled channel with parabolic inlet/outlet
    Channel {
        /// Centerline velocity (lattice units)
        max_velocity: f64,
        /// Reynolds number
        reynolds: f64,
    },
}

impl Default for ConfigScenario {
    fn default() -> Self {
        Self::Periodic { initial_velocity: [0.0, 0.0] }
    }
}

impl From<&ConfigScenario> for Scenario {
    fn from(scenario: &ConfigScenario) -> Self {
        match *scenario {
            ConfigScenario::Periodic { initial_velocity } => {
                Scenario::Periodic { initial_velocity }
            }
            ConfigScenario::Pipe => Scenario::Pipe,
            ConfigScenario::Channel { max_velocity, reynolds } => {
                Scenario::Channel { max_velocity, reynolds }
            }
        }
    }
}

// Default values
fn default_workers() -> usize {
    1
}

fn default_output_interval() -> u64 {
    100
}

impl SimulationConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &str) -> Result<Self, String> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path, e))?;

        let config: SimulationConfig = serde_json::from_str(&contents)
            .map_err(|e| format!("Failed to parse config JSON: {}", e))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        // Check lattice dimensions
        if self.width == 0 || self.height == 0 {
            return Err("Lattice width and height must be positive".to_string());
        }

        // Check worker count
        if self.workers == 0 {
            return Err("workers must be at least 1".to_string());
        }

        // Check scenario parameters
        match self.scenario {
            ConfigScenario::Periodic { initial_velocity } => {
                if initial_velocity.iter().any(|u| !u.is_finite()) {
                    return Err("Initial velocity must be finite".to_string());
                }
            }
            ConfigScenario::Pipe => {
                if self.height < 3 {
                    return Err("Pipe flow needs a height of at least 3".to_string());
                }
            }
            ConfigScenario::Channel { max_velocity, reynolds } => {
                if self.width < 2 || self.height < 3 {
                    return Err("Channel flow needs at least 2x3 sites".to_string());
                }
                if max_velocity <= 0.0 || max_velocity >= 1.0 {
                    return Err("Channel max_velocity must be in range (0, 1)".to_string());
                }
                if reynolds <= 0.0 {
                    return Err("Reynolds number must be positive".to_string());
                }
            }
        }

        // Check max_timesteps
        if let Some(max_timesteps) = self.max_timesteps {
            if max_timesteps == 0 {
                return Err("max_timesteps must be at least 1".to_string());
            }
        }

        // Check output interval
        if self.output_interval == 0 {
            return Err("output_interval must be at least 1".to_string());
        }

        Ok(())
    }

    /// Kernel-side lattice configuration
    pub fn lattice_config(&self) -> LatticeConfig {
        LatticeConfig::new(self.width, self.height)
            .with_workers(self.workers)
            .with_scenario(Scenario::from(&self.scenario))
    }
}
