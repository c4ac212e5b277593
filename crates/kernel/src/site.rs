//! Per-site population storage and boundary classification.
//!
//! Populations live in relaxed atomics so that a site owned by one worker
//! can receive streamed values from a neighbouring partition. Ordering
//! between phases is provided by the phase barrier, never by the atomics
//! themselves.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::direction::{VelocitySet, Q};

/// `f64` stored as raw bits in an `AtomicU64`.
#[derive(Debug, Default)]
#[repr(transparent)]
pub struct AtomicF64(AtomicU64);

impl AtomicF64 {
    /// Create a new atomic holding `value`.
    pub fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    /// Relaxed load.
    #[inline]
    pub fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    /// Relaxed store.
    #[inline]
    pub fn store(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Prescribed normal velocity across an inlet or outlet column.
///
/// Poiseuille profile peaking at `max_velocity` in the middle of a channel
/// of `width` lattice units, zero at both half-way walls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityProfile {
    /// Centerline velocity (lattice units)
    pub max_velocity: f64,
    /// Distance between the two walls (lattice units)
    pub width: f64,
}

impl VelocityProfile {
    /// Velocity at transverse coordinate `s`, measured from the lower wall.
    pub fn at(&self, s: f64) -> f64 {
        if s <= 0.0 || s >= self.width {
            return 0.0;
        }
        4.0 * self.max_velocity * s * (self.width - s) / (self.width * self.width)
    }
}

/// Boundary classification of a site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SiteKind {
    /// Ordinary fluid site.
    Fluid,
    /// Solid no-slip wall. Populations stay at zero.
    Wall,
    /// Western velocity inlet carrying its profile.
    Inlet(VelocityProfile),
    /// Eastern velocity outlet carrying its profile.
    Outlet(VelocityProfile),
}

impl SiteKind {
    /// Whether the site is solid.
    #[inline]
    pub fn is_wall(&self) -> bool {
        matches!(self, Self::Wall)
    }
}

/// One lattice site: current populations, streaming scratch and its kind.
#[derive(Debug)]
pub struct Site {
    f: [AtomicF64; Q],
    temp: [AtomicF64; Q],
    kind: SiteKind,
}

impl Site {
    /// Create a site with the given populations and an empty scratch buffer.
    pub fn new(kind: SiteKind, f: [f64; Q]) -> Self {
        Self {
            f: std::array::from_fn(|i| AtomicF64::new(f[i])),
            temp: std::array::from_fn(|_| AtomicF64::new(0.0)),
            kind,
        }
    }

    /// Boundary classification.
    #[inline]
    pub fn kind(&self) -> SiteKind {
        self.kind
    }

    /// Copy of the current population vector.
    #[inline]
    pub fn populations(&self) -> [f64; Q] {
        std::array::from_fn(|i| self.f[i].load())
    }

    /// Overwrite the current population vector.
    #[inline]
    pub fn set_populations(&self, f: &[f64; Q]) {
        for (slot, &value) in self.f.iter().zip(f.iter()) {
            slot.store(value);
        }
    }

    /// Current population in direction `i`.
    #[inline]
    pub fn get(&self, i: usize) -> f64 {
        self.f[i].load()
    }

    /// Write `value` into scratch slot `i`.
    #[inline]
    pub(crate) fn push_temp(&self, i: usize, value: f64) {
        self.temp[i].store(value);
    }

    /// Copy of the scratch buffer.
    #[inline]
    pub(crate) fn scratch(&self) -> [f64; Q] {
        std::array::from_fn(|i| self.temp[i].load())
    }

    /// Density `sum f_i`.
    pub fn density(&self) -> f64 {
        self.populations().iter().sum()
    }

    /// Momentum `sum f_i e_i`.
    pub fn momentum(&self, vs: &VelocitySet) -> [f64; 2] {
        vs.momentum(&self.populations())
    }

    /// Velocity `m / rho`; zero for an empty site.
    pub fn velocity(&self, vs: &VelocitySet) -> [f64; 2] {
        vs.velocity(&self.populations())
    }
}
