//! Orchestration Layer
//!
//! This crate wires the lattice kernel into runnable simulations:
//! - JSON configuration loading and validation
//! - Lattice construction from a configuration
//! - Simulation runner with lifecycle management and snapshot publication

#![warn(missing_docs)]

pub mod config;
pub mod runner;

pub use config::{ConfigScenario, SimulationConfig};
pub use runner::{RunnerQuery, RunnerState, SimulationRunner};

use lbm_kernel::{Lattice, LatticeError};

/// Create a complete simulation from a configuration file
///
/// This function performs the full simulation setup pipeline:
/// 1. Load and validate the configuration
/// 2. Build the lattice and its worker pool
/// 3. Wrap in a SimulationRunner for lifecycle management
///
/// # Arguments
/// * `config_path` - Path to the JSON configuration file
///
/// # Returns
/// A `SimulationRunner` ready to be started, or an error if setup fails
///
/// # Example
/// ```no_run
/// use lbm_orchestrator::create_simulation;
///
/// let runner = create_simulation("configs/channel-re10.json")?;
/// runner.start();
/// // ... query status, pause, resume, etc.
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn create_simulation(
    config_path: &str,
) -> Result<SimulationRunner, Box<dyn std::error::Error>> {
    tracing::info!("Creating simulation from config: {}", config_path);

    // 1. Load and validate configuration
    let config = SimulationConfig::load(config_path)?;
    tracing::info!("Configuration loaded: {}", config.name);

    // 2. Build the lattice
    let lattice = build_lattice(&config)?;

    // 3. Wrap in SimulationRunner
    tracing::info!("Creating simulation runner...");
    let runner = SimulationRunner::new(
        Box::new(lattice),
        config.max_timesteps,
        config.output_interval,
    );

    tracing::info!("Simulation ready to start");
    Ok(runner)
}

/// Build the lattice described by `config`.
pub fn build_lattice(config: &SimulationConfig) -> Result<Lattice, LatticeError> {
    let lattice = Lattice::new(config.lattice_config())?;
    tracing::info!(
        "Lattice built: {}x{} sites, {} workers, tau={:.4}",
        lattice.width(),
        lattice.height(),
        lattice.workers(),
        lattice.relaxation_time()
    );
    Ok(lattice)
}
