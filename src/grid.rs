// src/grid.rs

/// Finite-difference grid of the simulated volume.
///
/// Cell counts are what mumax3 gets through `SetGridsize`. Steps keep the unit of
/// their source: metres when read from OVF, nm when built from a cell size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid3D {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
}

impl Grid3D {
    pub fn new(nx: usize, ny: usize, nz: usize, dx: f64, dy: f64, dz: f64) -> Self {
        Self { nx, ny, nz, dx, dy, dz }
    }

    /// Cubic cells of edge `cell_size`.
    pub fn cubic(nx: usize, ny: usize, nz: usize, cell_size: f64) -> Self {
        Self::new(nx, ny, nz, cell_size, cell_size, cell_size)
    }

    /// Total number of cells.
    pub fn n_cells(&self) -> usize {
        self.nx * self.ny * self.nz
    }

    /// Flat index, x fastest then y then z (OVF sample order).
    #[inline]
    pub fn idx(&self, i: usize, j: usize, k: usize) -> usize {
        debug_assert!(i < self.nx && j < self.ny && k < self.nz);
        (k * self.ny + j) * self.nx + i
    }
}

/// Number of cells spanning `size`, rounded to the nearest integer.
pub fn cells_for(size: f64, cell_size: f64) -> usize {
    (size / cell_size).round().max(0.0) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_indexing_is_consistent() {
        let g = Grid3D::cubic(4, 3, 2, 5.0);
        assert_eq!(g.idx(0, 0, 0), 0);
        assert_eq!(g.idx(1, 0, 0), 1);
        assert_eq!(g.idx(0, 1, 0), 4);
        assert_eq!(g.idx(3, 2, 0), 11);
        assert_eq!(g.idx(0, 0, 1), 12);
        assert_eq!(g.idx(3, 2, 1), 23);
        assert_eq!(g.n_cells(), 24);
    }

    #[test]
    fn cell_counts_round_to_nearest() {
        assert_eq!(cells_for(800.0, 5.0), 160);
        assert_eq!(cells_for(400.0, 5.0), 80);
        assert_eq!(cells_for(52.4, 5.0), 10);
        assert_eq!(cells_for(52.6, 5.0), 11);
    }
}
