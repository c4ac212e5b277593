//! D2Q9 velocity set: discrete directions, equilibrium weights and the
//! reverse-direction table.
//!
//! Canonical ordering used throughout the kernel:
//! ```text
//!   6   2   5
//!    \  |  /
//!   3 - 0 - 1
//!    /  |  \
//!   7   4   8
//! ```
//! i.e. rest, +x, +y, -x, -y, +x+y, -x+y, -x-y, +x-y.

/// Number of discrete directions per site.
pub const Q: usize = 9;

/// Canonical D2Q9 offsets `[dx, dy]`.
const D2Q9_OFFSETS: [[i32; 2]; Q] = [
    [0, 0],   // 0: rest
    [1, 0],   // 1: east
    [0, 1],   // 2: north
    [-1, 0],  // 3: west
    [0, -1],  // 4: south
    [1, 1],   // 5: northeast
    [-1, 1],  // 6: northwest
    [-1, -1], // 7: southwest
    [1, -1],  // 8: southeast
];

/// Canonical D2Q9 equilibrium weights (sum to one).
const D2Q9_WEIGHTS: [f64; Q] = [
    4.0 / 9.0,
    1.0 / 9.0,
    1.0 / 9.0,
    1.0 / 9.0,
    1.0 / 9.0,
    1.0 / 36.0,
    1.0 / 36.0,
    1.0 / 36.0,
    1.0 / 36.0,
];

/// Opposite direction indices for bounce-back.
const D2Q9_REVERSE: [usize; Q] = [0, 3, 4, 1, 2, 7, 8, 5, 6];

/// Immutable direction/weight table handed to a lattice at construction.
///
/// Kept as a plain `Copy` value so every worker holds its own copy and no
/// global table has to be initialised before use.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocitySet {
    offsets: [[i32; 2]; Q],
    weights: [f64; Q],
    reverse: [usize; Q],
}

impl VelocitySet {
    /// The canonical D2Q9 velocity set.
    pub const fn d2q9() -> Self {
        Self {
            offsets: D2Q9_OFFSETS,
            weights: D2Q9_WEIGHTS,
            reverse: D2Q9_REVERSE,
        }
    }

    /// Lattice offset `[dx, dy]` of direction `i`.
    ///
    /// # Panics
    /// If `i` is not in `0..9`.
    #[inline]
    pub fn offset(&self, i: usize) -> [i32; 2] {
        assert!(i < Q, "direction index {i} out of range 0..{Q}");
        self.offsets[i]
    }

    /// Equilibrium weight of direction `i`.
    ///
    /// # Panics
    /// If `i` is not in `0..9`.
    #[inline]
    pub fn weight(&self, i: usize) -> f64 {
        assert!(i < Q, "direction index {i} out of range 0..{Q}");
        self.weights[i]
    }

    /// Index of the direction pointing opposite to `i`.
    ///
    /// # Panics
    /// If `i` is not in `0..9`.
    #[inline]
    pub fn reverse(&self, i: usize) -> usize {
        assert!(i < Q, "direction index {i} out of range 0..{Q}");
        self.reverse[i]
    }

    /// All nine weights, in canonical order.
    pub fn weights(&self) -> &[f64; Q] {
        &self.weights
    }

    /// Equilibrium population for direction `i`.
    ///
    /// ```text
    /// f_eq_i = w_i rho [1 + 3(e_i.u) + 4.5(e_i.u)^2 - 1.5|u|^2]
    /// ```
    #[inline]
    pub fn equilibrium(&self, i: usize, rho: f64, u: [f64; 2]) -> f64 {
        let [ex, ey] = self.offset(i);
        let eu = ex as f64 * u[0] + ey as f64 * u[1];
        let uu = u[0] * u[0] + u[1] * u[1];
        self.weights[i] * rho * (1.0 + 3.0 * eu + 4.5 * eu * eu - 1.5 * uu)
    }

    /// Equilibrium populations for all nine directions.
    pub fn equilibria(&self, rho: f64, u: [f64; 2]) -> [f64; Q] {
        std::array::from_fn(|i| self.equilibrium(i, rho, u))
    }

    /// Density (zeroth moment) of a population vector.
    #[inline]
    pub fn density(&self, f: &[f64; Q]) -> f64 {
        f.iter().sum()
    }

    /// Momentum (first moment) of a population vector.
    #[inline]
    pub fn momentum(&self, f: &[f64; Q]) -> [f64; 2] {
        let mut m = [0.0, 0.0];
        for (fi, e) in f.iter().zip(self.offsets.iter()) {
            m[0] += fi * e[0] as f64;
            m[1] += fi * e[1] as f64;
        }
        m
    }

    /// Velocity `m / rho`, defined as zero when the density is zero.
    #[inline]
    pub fn velocity(&self, f: &[f64; Q]) -> [f64; 2] {
        let rho = self.density(f);
        if rho == 0.0 {
            return [0.0, 0.0];
        }
        let m = self.momentum(f);
        [m[0] / rho, m[1] / rho]
    }
}

impl Default for VelocitySet {
    fn default() -> Self {
        Self::d2q9()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_sum_to_one() {
        let vs = VelocitySet::d2q9();
        let sum: f64 = vs.weights().iter().sum();
        assert!((sum - 1.0).abs() < 1e-15, "weights sum to {sum}");
    }

    #[test]
    fn reverse_is_involution_and_opposite() {
        let vs = VelocitySet::d2q9();
        for d in 0..Q {
            let r = vs.reverse(d);
            assert_eq!(vs.reverse(r), d);
            let [ex, ey] = vs.offset(d);
            let [rx, ry] = vs.offset(r);
            assert_eq!((ex + rx, ey + ry), (0, 0), "direction {d} vs reverse {r}");
        }
    }

    #[test]
    fn equilibrium_at_rest_equals_weights() {
        let vs = VelocitySet::d2q9();
        let feq = vs.equilibria(1.0, [0.0, 0.0]);
        for i in 0..Q {
            assert!((feq[i] - vs.weight(i)).abs() < 1e-15);
        }
    }

    #[test]
    fn equilibrium_recovers_moments() {
        let vs = VelocitySet::d2q9();
        let rho = 1.3;
        let u = [0.04, -0.02];
        let feq = vs.equilibria(rho, u);
        assert!((vs.density(&feq) - rho).abs() < 1e-12);
        let v = vs.velocity(&feq);
        assert!((v[0] - u[0]).abs() < 1e-12);
        assert!((v[1] - u[1]).abs() < 1e-12);
    }

    #[test]
    fn equilibrium_coefficients() {
        let vs = VelocitySet::d2q9();
        let u = [0.1, 0.0];
        // e_1 = (1, 0): eu = 0.1
        let expected = (1.0 / 9.0) * (1.0 + 0.3 + 4.5 * 0.01 - 1.5 * 0.01);
        assert!((vs.equilibrium(1, 1.0, u) - expected).abs() < 1e-15);
    }

    #[test]
    fn zero_density_has_zero_velocity() {
        let vs = VelocitySet::d2q9();
        assert_eq!(vs.velocity(&[0.0; Q]), [0.0, 0.0]);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn out_of_range_direction_panics() {
        VelocitySet::d2q9().offset(9);
    }
}
