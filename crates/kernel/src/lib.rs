//! D2Q9 Lattice Boltzmann Kernel
//!
//! This crate provides the core solver for 2D incompressible flow on a
//! lattice Boltzmann (BGK) lattice. It is designed to be separable and
//! compute-focused: front ends only need the per-step advance operation and
//! the read accessors.
//!
//! # Modules
//! - [`direction`] -- D2Q9 velocity set, weights, reverse table, equilibrium.
//! - [`topology`] -- Periodic neighbor table and edge classification.
//! - [`site`] -- Per-site populations and the `SiteKind` tag.
//! - [`scenario`] -- Flow setups (periodic box, pipe, Zou/He channel).
//! - [`engine`] -- Streaming, settle and collision phases over site ranges.
//! - [`boundary`] -- Zou/He velocity boundaries (bounce-back lives in streaming).
//! - [`pool`] -- Fixed worker pool and the reusable phase barrier.
//! - [`field`] -- Field snapshots and the plain-text field layout.

#![warn(missing_docs)]

pub mod boundary;
pub mod direction;
pub mod engine;
pub mod field;
pub mod lattice;
pub mod pool;
pub mod scenario;
pub mod site;
pub mod topology;

pub use direction::{VelocitySet, Q};
pub use field::{Field, FieldSnapshot};
pub use lattice::{Lattice, LatticeConfig, LatticeError};
pub use scenario::Scenario;
pub use site::{Site, SiteKind, VelocityProfile};

// ---------------------------------------------------------------------------
// SimulationKernel trait
// ---------------------------------------------------------------------------

/// Aggregate flow diagnostics over all non-wall sites.
///
/// The kernel never acts on these; a diverging run shows up as negative or
/// runaway densities here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowMetrics {
    /// Sum of density over non-wall sites.
    pub total_mass: f64,
    /// Smallest site density.
    pub min_density: f64,
    /// Largest site density.
    pub max_density: f64,
    /// Largest velocity magnitude.
    pub max_speed: f64,
    /// Total kinetic energy `sum 1/2 rho |u|^2`.
    pub kinetic_energy: f64,
}

impl FlowMetrics {
    /// Whether every aggregate is finite and densities stayed positive.
    pub fn is_stable(&self) -> bool {
        self.total_mass.is_finite()
            && self.kinetic_energy.is_finite()
            && self.min_density > 0.0
    }
}

/// Trait that solver back-ends expose to drivers and runners.
///
/// One [`advance`](SimulationKernel::advance) is a full time step:
///
/// 1. Streaming with bounce-back
/// 2. Velocity-boundary correction
/// 3. BGK collision
pub trait SimulationKernel {
    /// Execute one time step.
    fn advance(&mut self);

    /// Lattice `(width, height)`.
    fn dimensions(&self) -> (usize, usize);

    /// Density at `(x, y)`.
    fn density(&self, x: usize, y: usize) -> f64;

    /// Velocity at `(x, y)`.
    fn velocity(&self, x: usize, y: usize) -> [f64; 2];

    /// Completed time steps.
    fn steps(&self) -> u64;

    /// Current flow diagnostics.
    fn metrics(&self) -> FlowMetrics;

    /// Owned copy of the macroscopic fields.
    fn snapshot(&self) -> FieldSnapshot;
}
