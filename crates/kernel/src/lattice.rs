//! The public lattice: construction, time stepping and field access.

use std::io::{self, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::direction::{VelocitySet, Q};
use crate::engine::{Engine, Phase};
use crate::field::{write_rows, Field, FieldSnapshot};
use crate::pool::WorkerPool;
use crate::scenario::Scenario;
use crate::site::{Site, SiteKind};
use crate::topology::Topology;
use crate::{FlowMetrics, SimulationKernel};

/// Errors raised while constructing a lattice.
#[derive(Debug, thiserror::Error)]
pub enum LatticeError {
    /// Width or height is zero.
    #[error("lattice dimensions must be positive, got {width}x{height}")]
    InvalidDimensions {
        /// Requested width
        width: usize,
        /// Requested height
        height: usize,
    },
    /// Worker count is zero.
    #[error("worker count must be at least 1")]
    InvalidWorkerCount,
    /// Walled scenarios need two wall rows and a fluid row; channels also
    /// need distinct inlet and outlet columns.
    #[error("walled scenario needs at least 2x3 sites, got {width}x{height}")]
    TooNarrow {
        /// Requested width
        width: usize,
        /// Requested height
        height: usize,
    },
    /// Velocity or Reynolds number outside the usable range.
    #[error("invalid flow parameters: {0}")]
    InvalidFlowParameters(String),
    /// A worker thread could not be started.
    #[error("failed to spawn lattice worker: {0}")]
    WorkerSpawn(#[from] io::Error),
}

/// Everything needed to build a [`Lattice`].
#[derive(Debug, Clone, PartialEq)]
pub struct LatticeConfig {
    /// Number of columns
    pub width: usize,
    /// Number of rows
    pub height: usize,
    /// Total concurrency including the calling thread
    pub workers: usize,
    /// Edge classification, initial state and relaxation time
    pub scenario: Scenario,
    /// Direction/weight table
    pub velocities: VelocitySet,
}

impl LatticeConfig {
    /// Fully periodic `width x height` lattice at rest, single-threaded.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            workers: 1,
            scenario: Scenario::default(),
            velocities: VelocitySet::d2q9(),
        }
    }

    /// Set the total worker count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the flow scenario.
    pub fn with_scenario(mut self, scenario: Scenario) -> Self {
        self.scenario = scenario;
        self
    }

    /// Walled channel with Zou/He inlet and outlet.
    pub fn with_channel_flow(self, max_velocity: f64, reynolds: f64) -> Self {
        self.with_scenario(Scenario::Channel { max_velocity, reynolds })
    }

    /// Check dimensions, worker count and flow parameters.
    pub fn validate(&self) -> Result<(), LatticeError> {
        if self.width == 0 || self.height == 0 {
            return Err(LatticeError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if self.workers == 0 {
            return Err(LatticeError::InvalidWorkerCount);
        }
        match self.scenario {
            Scenario::Channel { max_velocity, reynolds } => {
                if self.width < 2 || self.height < 3 {
                    return Err(LatticeError::TooNarrow {
                        width: self.width,
                        height: self.height,
                    });
                }
                if !(max_velocity > 0.0 && max_velocity < 1.0) {
                    return Err(LatticeError::InvalidFlowParameters(format!(
                        "max velocity must lie in (0, 1), got {max_velocity}"
                    )));
                }
                if !(reynolds > 0.0 && reynolds.is_finite()) {
                    return Err(LatticeError::InvalidFlowParameters(format!(
                        "Reynolds number must be positive, got {reynolds}"
                    )));
                }
            }
            Scenario::Periodic { initial_velocity } => {
                if !initial_velocity.iter().all(|u| u.is_finite()) {
                    return Err(LatticeError::InvalidFlowParameters(
                        "initial velocity must be finite".to_string(),
                    ));
                }
            }
            Scenario::Pipe => {
                if self.height < 3 {
                    return Err(LatticeError::TooNarrow {
                        width: self.width,
                        height: self.height,
                    });
                }
            }
        }
        Ok(())
    }
}

/// D2Q9 lattice Boltzmann solver.
///
/// Sites are stored row-major; `(0, 0)` is the lower-left corner. Each
/// [`advance`](Lattice::advance) runs streaming (with bounce-back), the
/// Zou/He correction and BGK collision across the worker pool.
///
/// # Example
/// ```
/// use lbm_kernel::{Lattice, LatticeConfig};
///
/// let mut lattice = Lattice::new(LatticeConfig::new(5, 5)).unwrap();
/// lattice.advance();
/// assert!((lattice.density(2, 2) - 1.0).abs() < 1e-12);
/// ```
#[derive(Debug)]
pub struct Lattice {
    engine: Arc<Engine>,
    pool: WorkerPool,
    scenario: Scenario,
    steps: u64,
    last_step: Duration,
    /// Start of a [`stream`](Lattice::stream) still waiting for its collision.
    streamed_at: Option<Instant>,
}

impl Lattice {
    /// Build the topology, initialise every site to its scenario equilibrium
    /// and start the worker pool.
    pub fn new(config: LatticeConfig) -> Result<Self, LatticeError> {
        config.validate()?;
        let LatticeConfig {
            width,
            height,
            workers,
            scenario,
            velocities,
        } = config;

        let topology = Topology::build(width, height, &velocities);
        let kinds = topology.classify(&scenario);
        let sites = kinds
            .into_iter()
            .enumerate()
            .map(|(s, kind)| {
                let (_, y) = topology.coord(s);
                Site::new(kind, initial_populations(&velocities, &scenario, kind, y, height))
            })
            .collect();

        let tau = scenario.relaxation_time(height);
        let engine = Arc::new(Engine::new(sites, topology, velocities, tau));
        let pool = WorkerPool::spawn(&engine, workers)?;

        tracing::info!(
            "Lattice ready: {}x{} sites, {} worker(s), scenario {:?}, tau={:.4}, u_char={:.4}",
            width,
            height,
            pool.workers(),
            scenario,
            tau,
            scenario.characteristic_velocity()
        );

        Ok(Self {
            engine,
            pool,
            scenario,
            steps: 0,
            last_step: Duration::ZERO,
            streamed_at: None,
        })
    }

    /// Lattice width.
    pub fn width(&self) -> usize {
        self.engine.topology().width()
    }

    /// Lattice height.
    pub fn height(&self) -> usize {
        self.engine.topology().height()
    }

    /// Total concurrency, calling thread included.
    pub fn workers(&self) -> usize {
        self.pool.workers()
    }

    /// Flow scenario chosen at construction.
    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    /// Direction/weight table in use.
    pub fn velocities(&self) -> &VelocitySet {
        self.engine.velocities()
    }

    /// Kinematic viscosity (lattice units).
    pub fn viscosity(&self) -> f64 {
        (self.engine.tau() - 0.5) / 3.0
    }

    /// Characteristic velocity of the scenario (lattice units).
    pub fn characteristic_velocity(&self) -> f64 {
        self.scenario.characteristic_velocity()
    }

    /// BGK relaxation time.
    pub fn relaxation_time(&self) -> f64 {
        self.engine.tau()
    }

    /// Completed time steps.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Wall-clock duration of the most recent completed step, either an
    /// [`advance`](Lattice::advance) or a `stream()`/`collide()` pair.
    pub fn last_step_duration(&self) -> Duration {
        self.last_step
    }

    /// Advance the whole lattice by one time step.
    pub fn advance(&mut self) {
        let start = Instant::now();
        self.pool.run(&self.engine, Phase::Stream);
        self.pool.run(&self.engine, Phase::SettleAndCollide);
        self.streamed_at = None;
        self.finish_step(start);
    }

    fn finish_step(&mut self, start: Instant) {
        self.steps += 1;
        self.last_step = start.elapsed();
        tracing::trace!("Step {} took {:?}", self.steps, self.last_step);
    }

    /// Streaming half of a step: push, promote scratch buffers and apply
    /// the velocity-boundary correction. Leaves the lattice in its
    /// post-streaming, pre-collision state.
    pub fn stream(&mut self) {
        let start = Instant::now();
        self.pool.run(&self.engine, Phase::Stream);
        self.pool.run(&self.engine, Phase::Settle);
        self.streamed_at.get_or_insert(start);
    }

    /// Collision half of a step. `stream()` followed by `collide()` is one
    /// [`advance`](Lattice::advance) and counts as one step; a collision
    /// with no pending stream relaxes the sites but does not.
    pub fn collide(&mut self) {
        self.pool.run(&self.engine, Phase::Collide);
        match self.streamed_at.take() {
            Some(start) => self.finish_step(start),
            None => {
                tracing::debug!("Collision without a preceding stream, step count unchanged")
            }
        }
    }

    /// Site at `(x, y)`.
    ///
    /// # Panics
    /// If the coordinate lies outside the lattice.
    pub fn site(&self, x: usize, y: usize) -> &Site {
        let s = self.engine.topology().index(x, y);
        &self.engine.sites()[s]
    }

    /// Classification of the site at `(x, y)`.
    pub fn kind(&self, x: usize, y: usize) -> SiteKind {
        self.site(x, y).kind()
    }

    /// Density at `(x, y)`.
    pub fn density(&self, x: usize, y: usize) -> f64 {
        self.site(x, y).density()
    }

    /// Velocity at `(x, y)`; zero where the density vanishes.
    pub fn velocity(&self, x: usize, y: usize) -> [f64; 2] {
        self.site(x, y).velocity(self.engine.velocities())
    }

    /// Current populations at `(x, y)`.
    pub fn populations(&self, x: usize, y: usize) -> [f64; Q] {
        self.site(x, y).populations()
    }

    /// Overwrite the populations at `(x, y)`.
    ///
    /// Walls are left untouched.
    pub fn set_populations(&mut self, x: usize, y: usize, f: [f64; Q]) {
        let site = self.site(x, y);
        if site.kind().is_wall() {
            return;
        }
        site.set_populations(&f);
    }

    /// Reset the site at `(x, y)` to the rest equilibrium for `rho`.
    ///
    /// Walls are left untouched.
    pub fn set_density(&mut self, x: usize, y: usize, rho: f64) {
        let site = self.site(x, y);
        if site.kind().is_wall() {
            return;
        }
        site.set_populations(&self.engine.velocities().equilibria(rho, [0.0, 0.0]));
    }

    /// Restore the construction-time state and the step counter.
    pub fn reset(&mut self) {
        let topology = self.engine.topology();
        let vs = self.engine.velocities();
        let height = topology.height();
        for (s, site) in self.engine.sites().iter().enumerate() {
            let (_, y) = topology.coord(s);
            site.set_populations(&initial_populations(vs, &self.scenario, site.kind(), y, height));
        }
        self.steps = 0;
        self.last_step = Duration::ZERO;
        self.streamed_at = None;
        tracing::debug!("Lattice reset to initial state");
    }

    /// Write the density field, highest row first, comma-separated.
    pub fn serialize<W: Write + ?Sized>(&self, sink: &mut W) -> io::Result<()> {
        self.write_field(sink, Field::Density)
    }

    /// Write `field` in the same layout as [`serialize`](Lattice::serialize).
    pub fn write_field<W: Write + ?Sized>(&self, sink: &mut W, field: Field) -> io::Result<()> {
        let vs = *self.engine.velocities();
        let sites = self.engine.sites();
        let width = self.width();
        write_rows(sink, width, self.height(), |x, y| {
            let f = sites[x + y * width].populations();
            field.select(vs.density(&f), vs.velocity(&f))
        })
    }

    /// Owned copy of density and velocity.
    pub fn snapshot(&self) -> FieldSnapshot {
        let vs = self.engine.velocities();
        let (density, velocity): (Vec<f64>, Vec<[f64; 2]>) = self
            .engine
            .sites()
            .iter()
            .map(|site| {
                let f = site.populations();
                (vs.density(&f), vs.velocity(&f))
            })
            .unzip();
        FieldSnapshot {
            width: self.width(),
            height: self.height(),
            step: self.steps,
            density,
            velocity,
        }
    }

    /// Aggregate flow diagnostics over the non-wall sites.
    pub fn metrics(&self) -> FlowMetrics {
        let vs = self.engine.velocities();
        let mut metrics = FlowMetrics {
            total_mass: 0.0,
            min_density: f64::INFINITY,
            max_density: f64::NEG_INFINITY,
            max_speed: 0.0,
            kinetic_energy: 0.0,
        };
        for site in self.engine.sites().iter().filter(|s| !s.kind().is_wall()) {
            let f = site.populations();
            let rho = vs.density(&f);
            let u = vs.velocity(&f);
            let uu = u[0] * u[0] + u[1] * u[1];
            metrics.total_mass += rho;
            metrics.min_density = metrics.min_density.min(rho);
            metrics.max_density = metrics.max_density.max(rho);
            metrics.max_speed = metrics.max_speed.max(uu.sqrt());
            metrics.kinetic_energy += 0.5 * rho * uu;
        }
        metrics
    }
}

impl SimulationKernel for Lattice {
    fn advance(&mut self) {
        Lattice::advance(self);
    }

    fn dimensions(&self) -> (usize, usize) {
        (self.width(), self.height())
    }

    fn density(&self, x: usize, y: usize) -> f64 {
        Lattice::density(self, x, y)
    }

    fn velocity(&self, x: usize, y: usize) -> [f64; 2] {
        Lattice::velocity(self, x, y)
    }

    fn steps(&self) -> u64 {
        self.steps
    }

    fn metrics(&self) -> FlowMetrics {
        Lattice::metrics(self)
    }

    fn snapshot(&self) -> FieldSnapshot {
        Lattice::snapshot(self)
    }
}

/// Construction-time populations of one site.
fn initial_populations(
    vs: &VelocitySet,
    scenario: &Scenario,
    kind: SiteKind,
    y: usize,
    height: usize,
) -> [f64; Q] {
    match kind {
        SiteKind::Wall => [0.0; Q],
        _ => vs.equilibria(1.0, scenario.initial_velocity(y, height)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_dimensions() {
        let err = Lattice::new(LatticeConfig::new(0, 4)).unwrap_err();
        assert!(matches!(err, LatticeError::InvalidDimensions { width: 0, height: 4 }));
    }

    #[test]
    fn rejects_zero_workers() {
        let err = Lattice::new(LatticeConfig::new(4, 4).with_workers(0)).unwrap_err();
        assert!(matches!(err, LatticeError::InvalidWorkerCount));
    }

    #[test]
    fn rejects_bad_channel_parameters() {
        let narrow = LatticeConfig::new(5, 2).with_channel_flow(0.05, 10.0);
        assert!(matches!(
            Lattice::new(narrow).unwrap_err(),
            LatticeError::TooNarrow { .. }
        ));
        let fast = LatticeConfig::new(5, 5).with_channel_flow(1.0, 10.0);
        assert!(matches!(
            Lattice::new(fast).unwrap_err(),
            LatticeError::InvalidFlowParameters(_)
        ));
        let viscous = LatticeConfig::new(5, 5).with_channel_flow(0.05, 0.0);
        assert!(matches!(
            Lattice::new(viscous).unwrap_err(),
            LatticeError::InvalidFlowParameters(_)
        ));
    }

    #[test]
    fn initial_state_is_rest_equilibrium() {
        let lattice = Lattice::new(LatticeConfig::new(3, 3)).unwrap();
        let w = *lattice.velocities().weights();
        assert_eq!(lattice.populations(1, 1), w);
        assert_eq!(lattice.velocity(0, 2), [0.0, 0.0]);
    }

    #[test]
    fn walls_start_empty() {
        let lattice = Lattice::new(LatticeConfig::new(4, 4).with_scenario(Scenario::Pipe)).unwrap();
        assert_eq!(lattice.kind(2, 0), SiteKind::Wall);
        assert_eq!(lattice.density(2, 0), 0.0);
        assert!((lattice.density(2, 1) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn set_density_and_reset() {
        let mut lattice = Lattice::new(LatticeConfig::new(4, 4)).unwrap();
        lattice.set_density(1, 2, 5.0);
        assert!((lattice.density(1, 2) - 5.0).abs() < 1e-12);
        lattice.advance();
        assert_eq!(lattice.steps(), 1);
        lattice.reset();
        assert_eq!(lattice.steps(), 0);
        assert!((lattice.density(1, 2) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn set_density_ignores_walls() {
        let mut lattice =
            Lattice::new(LatticeConfig::new(4, 4).with_scenario(Scenario::Pipe)).unwrap();
        lattice.set_density(0, 3, 2.0);
        assert_eq!(lattice.density(0, 3), 0.0);
    }

    #[test]
    fn set_populations_ignores_walls() {
        let mut lattice =
            Lattice::new(LatticeConfig::new(4, 4).with_scenario(Scenario::Pipe)).unwrap();
        lattice.set_populations(1, 0, [0.5; Q]);
        assert_eq!(lattice.populations(1, 0), [0.0; Q]);
        lattice.set_populations(1, 1, [0.5; Q]);
        assert!((lattice.density(1, 1) - 4.5).abs() < 1e-12);
    }

    #[test]
    fn split_step_counts_once() {
        let mut lattice = Lattice::new(LatticeConfig::new(4, 4)).unwrap();
        lattice.collide();
        assert_eq!(lattice.steps(), 0);
        assert_eq!(lattice.last_step_duration(), Duration::ZERO);

        lattice.stream();
        assert_eq!(lattice.steps(), 0);
        lattice.collide();
        assert_eq!(lattice.steps(), 1);
        assert!(lattice.last_step_duration() > Duration::ZERO);

        lattice.collide();
        assert_eq!(lattice.steps(), 1);
    }

    #[test]
    fn characteristic_velocity_follows_scenario() {
        let channel =
            Lattice::new(LatticeConfig::new(10, 7).with_channel_flow(0.04, 10.0)).unwrap();
        assert_eq!(channel.characteristic_velocity(), 0.04);
        let drift = LatticeConfig::new(4, 4).with_scenario(Scenario::Periodic {
            initial_velocity: [0.0, -0.02],
        });
        assert!((Lattice::new(drift).unwrap().characteristic_velocity() - 0.02).abs() < 1e-15);
    }

    #[test]
    fn channel_viscosity_matches_reynolds() {
        let lattice =
            Lattice::new(LatticeConfig::new(10, 21).with_channel_flow(0.05, 10.0)).unwrap();
        assert!((lattice.viscosity() - 0.21).abs() < 1e-12);
        assert!((lattice.relaxation_time() - 1.13).abs() < 1e-12);
    }

    #[test]
    fn serialize_layout() {
        let lattice = Lattice::new(LatticeConfig::new(3, 2)).unwrap();
        let mut out = Vec::new();
        lattice.serialize(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows.len(), 2);
        for row in rows {
            let values: Vec<f64> = row.split(',').map(|v| v.parse().unwrap()).collect();
            assert_eq!(values.len(), 3);
            assert!(values.iter().all(|v| (v - 1.0).abs() < 1e-12));
        }
    }

    #[test]
    fn serialize_puts_highest_row_first() {
        let mut lattice = Lattice::new(LatticeConfig::new(2, 3)).unwrap();
        lattice.set_density(1, 2, 3.0);
        let mut out = Vec::new();
        lattice.serialize(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let first: Vec<f64> = text
            .lines()
            .next()
            .unwrap()
            .split(',')
            .map(|v| v.parse().unwrap())
            .collect();
        assert!((first[1] - 3.0).abs() < 1e-12);
    }
}
