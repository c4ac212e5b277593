//! Command-line driver
//!
//! Builds a lattice from a JSON configuration or from flags, advances it and
//! writes the selected field as comma-separated rows (highest row first)
//! every `--interval` steps. Logs go to stderr, field data to stdout or
//! `--output`.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use lbm_kernel::{Field, Lattice, LatticeConfig, Scenario};
use lbm_orchestrator::{build_lattice, SimulationConfig};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// D2Q9 lattice Boltzmann driver
#[derive(Parser)]
#[command(name = "lbm-driver")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "D2Q9 lattice Boltzmann flow driver", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error); RUST_LOG overrides
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// JSON configuration; flags below are ignored except --steps/--output
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Lattice width
    #[arg(long, default_value = "101")]
    width: usize,

    /// Lattice height
    #[arg(long, default_value = "21")]
    height: usize,

    /// Worker threads, calling thread included (default: available cores)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Flow setup
    #[arg(long, value_enum, default_value = "channel")]
    scenario: ScenarioArg,

    /// Channel centerline velocity
    #[arg(long, default_value = "0.05")]
    max_velocity: f64,

    /// Channel Reynolds number
    #[arg(long, default_value = "10.0")]
    reynolds: f64,

    /// Steps to run (overrides the configuration's max_timesteps)
    #[arg(short, long)]
    steps: Option<u64>,

    /// Write the field every this many steps
    #[arg(short, long, default_value = "100")]
    interval: u64,

    /// Field to write
    #[arg(short, long, value_enum, default_value = "density")]
    field: FieldArg,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ScenarioArg {
    Periodic,
    Pipe,
    Channel,
}

#[derive(Clone, Copy, ValueEnum)]
enum FieldArg {
    Density,
    VelocityX,
    VelocityY,
    Speed,
}

impl From<FieldArg> for Field {
    fn from(arg: FieldArg) -> Self {
        match arg {
            FieldArg::Density => Field::Density,
            FieldArg::VelocityX => Field::VelocityX,
            FieldArg::VelocityY => Field::VelocityY,
            FieldArg::Speed => Field::Speed,
        }
    }
}

/// What to run, after merging the configuration file and flags
struct Plan {
    lattice: Lattice,
    steps: u64,
    interval: u64,
    field: Field,
}

fn plan(cli: &Cli) -> Result<Plan> {
    if let Some(path) = &cli.config {
        let path = path.to_str().context("configuration path is not valid UTF-8")?;
        let config = SimulationConfig::load(path).map_err(anyhow::Error::msg)?;
        info!("Configuration loaded: {}", config.name);
        let lattice = build_lattice(&config).context("failed to build lattice")?;
        return Ok(Plan {
            lattice,
            steps: cli.steps.or(config.max_timesteps).unwrap_or(1000),
            interval: config.output_interval,
            field: config.output_field,
        });
    }

    let workers = match cli.workers {
        Some(workers) => workers,
        None => std::thread::available_parallelism().map_or(1, |n| n.get()),
    };
    let scenario = match cli.scenario {
        ScenarioArg::Periodic => Scenario::default(),
        ScenarioArg::Pipe => Scenario::Pipe,
        ScenarioArg::Channel => Scenario::Channel {
            max_velocity: cli.max_velocity,
            reynolds: cli.reynolds,
        },
    };
    let config = LatticeConfig::new(cli.width, cli.height)
        .with_workers(workers)
        .with_scenario(scenario);
    let lattice = Lattice::new(config).context("failed to build lattice")?;

    Ok(Plan {
        lattice,
        steps: cli.steps.unwrap_or(1000),
        interval: cli.interval,
        field: cli.field.into(),
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs on stderr, field data on stdout
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let Plan {
        mut lattice,
        steps,
        interval,
        field,
    } = plan(&cli)?;
    anyhow::ensure!(interval > 0, "--interval must be at least 1");

    info!(
        "Lattice {}x{}, {} workers, tau={:.4}, nu={:.4}",
        lattice.width(),
        lattice.height(),
        lattice.workers(),
        lattice.relaxation_time(),
        lattice.viscosity()
    );

    let sink: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    let mut sink = BufWriter::new(sink);

    let start = Instant::now();
    for _ in 0..steps {
        lattice.advance();

        if lattice.steps() % interval == 0 {
            let metrics = lattice.metrics();
            info!(
                "step {}: last step {:?}, mass={:.6}, max_speed={:.4e}",
                lattice.steps(),
                lattice.last_step_duration(),
                metrics.total_mass,
                metrics.max_speed
            );
            if !metrics.is_stable() {
                tracing::warn!("flow diverged at step {}", lattice.steps());
            }
            lattice.write_field(&mut sink, field)?;
            writeln!(sink)?;
        }
    }
    sink.flush()?;

    let elapsed = start.elapsed().as_secs_f64();
    let updates = (lattice.width() * lattice.height()) as f64 * steps as f64;
    info!(
        "Done: {} steps in {:.2}s ({:.2} MLUPS)",
        steps,
        elapsed,
        updates / elapsed.max(f64::EPSILON) / 1.0e6
    );
    Ok(())
}
