// src/vector_field.rs

use std::path::Path;

use ndarray::Array4;
use ndarray_npy::{read_npy, write_npy};

use crate::error::{Result, ScripterError};
use crate::grid::Grid3D;

/// Vector quantity (m, m_full, B_demag) sampled on a 3D grid.
/// Stored as an (nx, ny, nz, 3) array, the layout of the converted `.npy` files.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorField3D {
    pub grid: Grid3D,
    pub data: Array4<f64>,
}

impl VectorField3D {
    /// All-zero field on the given grid.
    pub fn zeros(grid: Grid3D) -> Self {
        Self {
            grid,
            data: Array4::zeros((grid.nx, grid.ny, grid.nz, 3)),
        }
    }

    /// Wrap an (nx, ny, nz, 3) array. Cell steps are not stored in `.npy`, so the
    /// caller supplies the cell size.
    pub fn from_array(data: Array4<f64>, cell_size: f64) -> std::result::Result<Self, String> {
        let (nx, ny, nz, dim) = data.dim();
        if dim != 3 {
            return Err(format!("expected 3 vector components, got {}", dim));
        }
        Ok(Self {
            grid: Grid3D::cubic(nx, ny, nz, cell_size),
            data,
        })
    }

    pub fn vector(&self, i: usize, j: usize, k: usize) -> [f64; 3] {
        [
            self.data[[i, j, k, 0]],
            self.data[[i, j, k, 1]],
            self.data[[i, j, k, 2]],
        ]
    }

    pub fn set_vector(&mut self, i: usize, j: usize, k: usize, v: [f64; 3]) {
        for c in 0..3 {
            self.data[[i, j, k, c]] = v[c];
        }
    }

    /// Largest vector magnitude over the whole field.
    pub fn max_norm(&self) -> f64 {
        let g = self.grid;
        let mut max = 0.0_f64;
        for k in 0..g.nz {
            for j in 0..g.ny {
                for i in 0..g.nx {
                    max = max.max(crate::vec3::norm(self.vector(i, j, k)));
                }
            }
        }
        max
    }

    pub fn load_npy(path: &Path, cell_size: f64) -> Result<Self> {
        let data: Array4<f64> = read_npy(path)?;
        Self::from_array(data, cell_size).map_err(|reason| ScripterError::decode(path, reason))
    }

    pub fn save_npy(&self, path: &Path) -> Result<()> {
        write_npy(path, &self.data)?;
        Ok(())
    }
}
