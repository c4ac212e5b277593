//! Update engine: the streaming and collision phases over a range of sites.
//!
//! The engine is shared between the calling thread and the worker pool.
//! Each phase method touches only its own partition except
//! [`Engine::stream_range`], which pushes into the scratch buffers of
//! neighboring sites. Every scratch slot of every non-wall site has exactly
//! one writer per streaming phase:
//!
//! - slot `i` of site `s` is written by `s - e_i` when that site is not a wall,
//! - otherwise by `s` itself, bouncing its population `reverse(i)` back.
//!
//! No scratch buffer may be read until the whole streaming phase has
//! drained, which is what the phase barrier in [`crate::pool`] guarantees.

use std::ops::Range;

use crate::boundary::apply_velocity_boundary;
use crate::direction::{VelocitySet, Q};
use crate::site::Site;
use crate::topology::Topology;

/// Partition-local unit of work dispatched to every worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Push populations into neighbor scratch slots (with bounce-back).
    Stream,
    /// Swap scratch into current and apply the Zou/He correction.
    Settle,
    /// BGK relaxation toward equilibrium.
    Collide,
    /// `Settle` followed by `Collide`; both are site-local so they share one
    /// barrier interval.
    SettleAndCollide,
}

/// Shared lattice state and the per-partition phase kernels.
#[derive(Debug)]
pub struct Engine {
    sites: Vec<Site>,
    topology: Topology,
    velocities: VelocitySet,
    /// BGK relaxation time.
    tau: f64,
}

impl Engine {
    /// Assemble an engine from prebuilt sites and topology.
    pub fn new(sites: Vec<Site>, topology: Topology, velocities: VelocitySet, tau: f64) -> Self {
        debug_assert_eq!(sites.len(), topology.len());
        Self {
            sites,
            topology,
            velocities,
            tau,
        }
    }

    /// All sites, row-major.
    #[inline]
    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    /// Lattice connectivity.
    #[inline]
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Direction table.
    #[inline]
    pub fn velocities(&self) -> &VelocitySet {
        &self.velocities
    }

    /// BGK relaxation time.
    #[inline]
    pub fn tau(&self) -> f64 {
        self.tau
    }

    /// Run `phase` over the sites in `range`.
    pub fn run(&self, phase: Phase, range: Range<usize>) {
        match phase {
            Phase::Stream => self.stream_range(range),
            Phase::Settle => self.settle_range(range),
            Phase::Collide => self.collide_range(range),
            Phase::SettleAndCollide => {
                self.settle_range(range.clone());
                self.collide_range(range);
            }
        }
    }

    /// Push every population of the non-wall sites in `range` one step
    /// along its direction.
    pub fn stream_range(&self, range: Range<usize>) {
        for s in range {
            let site = &self.sites[s];
            if site.kind().is_wall() {
                continue;
            }
            let neighbors = self.topology.neighbors(s);
            for (i, &n) in neighbors.iter().enumerate() {
                let value = site.get(i);
                if self.sites[n].kind().is_wall() {
                    site.push_temp(self.velocities.reverse(i), value);
                } else {
                    self.sites[n].push_temp(i, value);
                }
            }
        }
    }

    /// Promote the scratch buffer of every non-wall site in `range` and apply
    /// the velocity-boundary correction.
    pub fn settle_range(&self, range: Range<usize>) {
        for s in range {
            let site = &self.sites[s];
            let kind = site.kind();
            if kind.is_wall() {
                continue;
            }
            let mut f = site.scratch();
            let (_, y) = self.topology.coord(s);
            apply_velocity_boundary(kind, y, &mut f);
            site.set_populations(&f);
        }
    }

    /// Relax every non-wall site in `range` toward its local equilibrium.
    pub fn collide_range(&self, range: Range<usize>) {
        let omega = 1.0 / self.tau;
        for s in range {
            let site = &self.sites[s];
            if site.kind().is_wall() {
                continue;
            }
            let mut f = site.populations();
            let rho = self.velocities.density(&f);
            let u = self.velocities.velocity(&f);
            let feq = self.velocities.equilibria(rho, u);
            for i in 0..Q {
                f[i] -= (f[i] - feq[i]) * omega;
            }
            site.set_populations(&f);
        }
    }
}
