//! Macroscopic field snapshots and their plain-text layout.
//!
//! The text layout is shared by [`crate::Lattice::serialize`] and
//! [`FieldSnapshot::write_field`]: one line per row starting with the
//! highest row, values within a row separated by commas.

use std::io::{self, Write};

/// Scalar field selectable for text output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// Density rho.
    #[default]
    Density,
    /// x component of velocity.
    VelocityX,
    /// y component of velocity.
    VelocityY,
    /// Velocity magnitude.
    Speed,
}

impl Field {
    /// Pick this field out of a site's density and velocity.
    #[inline]
    pub fn select(self, rho: f64, u: [f64; 2]) -> f64 {
        match self {
            Self::Density => rho,
            Self::VelocityX => u[0],
            Self::VelocityY => u[1],
            Self::Speed => (u[0] * u[0] + u[1] * u[1]).sqrt(),
        }
    }
}

/// Write a `width x height` scalar field, highest row first.
pub fn write_rows<W, F>(sink: &mut W, width: usize, height: usize, mut value: F) -> io::Result<()>
where
    W: Write + ?Sized,
    F: FnMut(usize, usize) -> f64,
{
    for y in (0..height).rev() {
        for x in 0..width {
            if x > 0 {
                sink.write_all(b",")?;
            }
            write!(sink, "{}", value(x, y))?;
        }
        sink.write_all(b"\n")?;
    }
    Ok(())
}

/// Owned copy of the macroscopic fields at one step.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSnapshot {
    /// Lattice width
    pub width: usize,
    /// Lattice height
    pub height: usize,
    /// Completed time steps when the snapshot was taken
    pub step: u64,
    /// Density per site, row-major
    pub density: Vec<f64>,
    /// Velocity per site, row-major
    pub velocity: Vec<[f64; 2]>,
}

impl FieldSnapshot {
    /// Density at `(x, y)`.
    pub fn density_at(&self, x: usize, y: usize) -> f64 {
        self.density[x + y * self.width]
    }

    /// Velocity at `(x, y)`.
    pub fn velocity_at(&self, x: usize, y: usize) -> [f64; 2] {
        self.velocity[x + y * self.width]
    }

    /// Sum of density over all sites.
    pub fn total_mass(&self) -> f64 {
        self.density.iter().sum()
    }

    /// Write `field` in the shared text layout.
    pub fn write_field<W: Write + ?Sized>(&self, sink: &mut W, field: Field) -> io::Result<()> {
        write_rows(sink, self.width, self.height, |x, y| {
            let s = x + y * self.width;
            field.select(self.density[s], self.velocity[s])
        })
    }
}
