//! Analytical reference solutions for lattice validation.
//!
//! Provides closed-form solutions against which lattice results can be
//! compared for quantitative accuracy assessment.

/// Analytical solution for plane Poiseuille flow in a walled lattice channel.
///
/// With half-way bounce-back the no-slip planes sit half a site inside the
/// wall rows, at `y = 0.5` and `y = H - 1.5`, so the flow width is `H - 2`.
/// Measured from the lower plane (`s = y - 0.5`):
///
/// ```text
/// u(s) = 4 * U * s * (w - s) / w^2
/// ```
///
/// where:
/// - `w = H - 2` is the flow width (lattice units)
/// - `U` is the centerline velocity
///
/// In steady state this is driven by a pressure gradient
/// `dp/dx = -8 * rho * nu * U / w^2`.
pub struct PoiseuilleFlow {
    /// Distance between the no-slip planes
    pub channel_width: f64,
    /// Centerline velocity U
    pub max_velocity: f64,
}

impl PoiseuilleFlow {
    /// Create a new Poiseuille flow analytical solution.
    ///
    /// # Arguments
    /// * `channel_width` - Distance between the two no-slip planes
    /// * `max_velocity` - Centerline velocity
    pub fn new(channel_width: f64, max_velocity: f64) -> Self {
        Self {
            channel_width,
            max_velocity,
        }
    }

    /// Solution for a lattice of `height` rows with wall rows top and bottom.
    pub fn for_lattice(height: usize, max_velocity: f64) -> Self {
        Self::new(height as f64 - 2.0, max_velocity)
    }

    /// Analytical velocity at distance `s` from the lower no-slip plane.
    pub fn velocity_at(&self, s: f64) -> f64 {
        poiseuille_velocity(s, self.channel_width, self.max_velocity)
    }

    /// Analytical velocity at lattice row `y`.
    pub fn velocity_at_row(&self, y: usize) -> f64 {
        self.velocity_at(y as f64 - 0.5)
    }

    /// Pressure gradient magnitude sustaining the profile at viscosity `nu`.
    pub fn pressure_gradient(&self, density: f64, viscosity: f64) -> f64 {
        8.0 * density * viscosity * self.max_velocity / (self.channel_width * self.channel_width)
    }

    /// Compare simulated row velocities against the analytical solution.
    ///
    /// # Arguments
    /// * `rows` - Lattice rows that were sampled
    /// * `velocities` - Corresponding x-velocities
    ///
    /// # Returns
    /// RMS error normalized by the centerline velocity
    pub fn rms_error(&self, rows: &[usize], velocities: &[f64]) -> f64 {
        assert_eq!(rows.len(), velocities.len());
        if rows.is_empty() || self.max_velocity.abs() < 1e-15 {
            return f64::MAX;
        }

        let sum_sq_error: f64 = rows
            .iter()
            .zip(velocities)
            .map(|(&y, &u_sim)| {
                let error = (u_sim - self.velocity_at_row(y)) / self.max_velocity;
                error * error
            })
            .sum();

        (sum_sq_error / rows.len() as f64).sqrt()
    }
}

/// Poiseuille velocity at distance `s` from the lower plane; zero outside.
pub fn poiseuille_velocity(s: f64, channel_width: f64, max_velocity: f64) -> f64 {
    if s <= 0.0 || s >= channel_width {
        return 0.0;
    }
    4.0 * max_velocity * s * (channel_width - s) / (channel_width * channel_width)
}
