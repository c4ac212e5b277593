//! Boundary handlers.
//!
//! Walls are no-slip bounce-back and are folded into the streaming phase
//! (see [`crate::engine`]): a population that would enter a wall site is
//! written into the reverse slot of the site it came from.
//!
//! Velocity boundaries follow Zou & He (1997). After streaming, the
//! populations pointing into the domain from outside are unknown. Mass and
//! normal-momentum conservation give the boundary density, and the unknown
//! populations are set from the known ones plus a transverse correction so
//! the site carries exactly the prescribed velocity.
//!
//! All index arithmetic assumes the canonical D2Q9 ordering of
//! [`crate::direction`].

use crate::direction::Q;
use crate::site::SiteKind;

/// Apply the Zou/He correction for a western inlet with normal velocity `u`
/// (positive into the domain, transverse velocity zero).
///
/// Unknowns: f1 (+x), f5 (+x+y), f8 (+x-y).
/// ```text
/// rho = (f0 + f2 + f4 + 2 (f3 + f6 + f7)) / (1 - u)
/// f1  = f3 + 2/3 rho u
/// f5  = f7 - 1/2 (f2 - f4) + 1/6 rho u
/// f8  = f6 + 1/2 (f2 - f4) + 1/6 rho u
/// ```
/// Returns the boundary density.
pub fn zou_he_west(f: &mut [f64; Q], u: f64) -> f64 {
    let rho = (f[0] + f[2] + f[4] + 2.0 * (f[3] + f[6] + f[7])) / (1.0 - u);
    let transverse = 0.5 * (f[2] - f[4]);
    f[1] = f[3] + (2.0 / 3.0) * rho * u;
    f[5] = f[7] - transverse + (1.0 / 6.0) * rho * u;
    f[8] = f[6] + transverse + (1.0 / 6.0) * rho * u;
    rho
}

/// Apply the Zou/He correction for an eastern outlet with normal velocity `u`
/// (positive leaving the domain, transverse velocity zero).
///
/// Unknowns: f3 (-x), f6 (-x+y), f7 (-x-y).
/// ```text
/// rho = (f0 + f2 + f4 + 2 (f1 + f5 + f8)) / (1 + u)
/// f3  = f1 - 2/3 rho u
/// f7  = f5 + 1/2 (f2 - f4) - 1/6 rho u
/// f6  = f8 - 1/2 (f2 - f4) - 1/6 rho u
/// ```
/// Returns the boundary density.
pub fn zou_he_east(f: &mut [f64; Q], u: f64) -> f64 {
    let rho = (f[0] + f[2] + f[4] + 2.0 * (f[1] + f[5] + f[8])) / (1.0 + u);
    let transverse = 0.5 * (f[2] - f[4]);
    f[3] = f[1] - (2.0 / 3.0) * rho * u;
    f[7] = f[5] + transverse - (1.0 / 6.0) * rho * u;
    f[6] = f[8] - transverse - (1.0 / 6.0) * rho * u;
    rho
}

/// Correct freshly streamed populations of a site at row `y`.
///
/// Fluid and wall sites are left unchanged. The profile is evaluated at the
/// distance from the lower half-way wall, `y - 0.5`.
pub fn apply_velocity_boundary(kind: SiteKind, y: usize, f: &mut [f64; Q]) {
    let s = y as f64 - 0.5;
    match kind {
        SiteKind::Inlet(profile) => {
            zou_he_west(f, profile.at(s));
        }
        SiteKind::Outlet(profile) => {
            zou_he_east(f, profile.at(s));
        }
        SiteKind::Fluid | SiteKind::Wall => {}
    }
}
