//! Periodic neighbor table and edge classification.
//!
//! Sites are stored row-major, `index = x + y * width`. Every conversion
//! between coordinates and indices goes through [`Topology::index`] and
//! [`Topology::coord`].

use crate::direction::{VelocitySet, Q};
use crate::scenario::Scenario;
use crate::site::SiteKind;

/// Immutable lattice connectivity built once at construction.
#[derive(Debug, Clone)]
pub struct Topology {
    width: usize,
    height: usize,
    /// `neighbors[s][i]` is the site reached from `s` along direction `i`.
    neighbors: Vec<[usize; Q]>,
}

impl Topology {
    /// Build the neighbor table for a `width x height` lattice with periodic
    /// wrap on both axes.
    pub fn build(width: usize, height: usize, vs: &VelocitySet) -> Self {
        debug_assert!(width > 0 && height > 0);
        let w = width as i64;
        let h = height as i64;
        let n = width * height;

        let mut neighbors = Vec::with_capacity(n);
        for s in 0..n {
            let (x, y) = (s % width, s / width);
            let row: [usize; Q] = std::array::from_fn(|i| {
                let [dx, dy] = vs.offset(i);
                let xp = (x as i64 + dx as i64).rem_euclid(w) as usize;
                let yp = (y as i64 + dy as i64).rem_euclid(h) as usize;
                xp + yp * width
            });
            neighbors.push(row);
        }

        Self { width, height, neighbors }
    }

    /// Lattice width.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Lattice height.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of sites.
    #[inline]
    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    /// Always false for a built topology; present for API symmetry.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    /// Linear index of `(x, y)`.
    ///
    /// # Panics
    /// If the coordinate lies outside the lattice.
    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        assert!(
            x < self.width && y < self.height,
            "coordinate ({x}, {y}) outside {}x{} lattice",
            self.width,
            self.height
        );
        x + y * self.width
    }

    /// Coordinate `(x, y)` of linear index `s`.
    #[inline]
    pub fn coord(&self, s: usize) -> (usize, usize) {
        (s % self.width, s / self.width)
    }

    /// Neighbor of site `s` along direction `i`.
    #[inline]
    pub fn neighbor(&self, s: usize, i: usize) -> usize {
        self.neighbors[s][i]
    }

    /// All nine neighbors of site `s`.
    #[inline]
    pub fn neighbors(&self, s: usize) -> &[usize; Q] {
        &self.neighbors[s]
    }

    /// Classify every site for `scenario`.
    ///
    /// Wall rows win over the inlet/outlet columns at the corners. The
    /// neighbor table is not touched: streaming branches on the kind of the
    /// destination at use time.
    pub fn classify(&self, scenario: &Scenario) -> Vec<SiteKind> {
        let profile = scenario.profile(self.height);
        (0..self.len())
            .map(|s| {
                let (x, y) = self.coord(s);
                let wall_row = y == 0 || y == self.height - 1;
                if scenario.has_walls() && wall_row {
                    return SiteKind::Wall;
                }
                match profile {
                    Some(p) if x == 0 => SiteKind::Inlet(p),
                    Some(p) if x == self.width - 1 => SiteKind::Outlet(p),
                    _ => SiteKind::Fluid,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_and_coord_are_inverse() {
        let t = Topology::build(7, 4, &VelocitySet::d2q9());
        for s in 0..t.len() {
            let (x, y) = t.coord(s);
            assert_eq!(t.index(x, y), s);
        }
        assert_eq!(t.index(3, 2), 3 + 2 * 7);
    }

    #[test]
    fn neighbors_wrap_periodically() {
        let vs = VelocitySet::d2q9();
        let t = Topology::build(5, 3, &vs);
        let corner = t.index(0, 0);
        assert_eq!(t.neighbor(corner, 0), corner);
        assert_eq!(t.neighbor(corner, 3), t.index(4, 0));
        assert_eq!(t.neighbor(corner, 4), t.index(0, 2));
        assert_eq!(t.neighbor(corner, 7), t.index(4, 2));
        assert_eq!(t.neighbor(t.index(4, 2), 5), corner);
    }

    #[test]
    fn neighbor_along_reverse_comes_back() {
        let vs = VelocitySet::d2q9();
        let t = Topology::build(6, 5, &vs);
        for s in 0..t.len() {
            for i in 0..Q {
                let n = t.neighbor(s, i);
                assert_eq!(t.neighbor(n, vs.reverse(i)), s);
            }
        }
    }

    #[test]
    fn channel_classification() {
        let t = Topology::build(6, 5, &VelocitySet::d2q9());
        let kinds = t.classify(&Scenario::Channel { max_velocity: 0.05, reynolds: 10.0 });
        assert!(kinds[t.index(0, 0)].is_wall());
        assert!(kinds[t.index(5, 4)].is_wall());
        assert!(matches!(kinds[t.index(0, 2)], SiteKind::Inlet(_)));
        assert!(matches!(kinds[t.index(5, 2)], SiteKind::Outlet(_)));
        assert_eq!(kinds[t.index(3, 2)], SiteKind::Fluid);
    }

    #[test]
    fn periodic_classification_is_all_fluid() {
        let t = Topology::build(4, 4, &VelocitySet::d2q9());
        let kinds = t.classify(&Scenario::default());
        assert!(kinds.iter().all(|k| *k == SiteKind::Fluid));
    }
}
