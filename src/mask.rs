// src/mask.rs
//
// Device masks. A mask is one bool per in-plane cell (true = magnetic material),
// indexed like Grid3D::idx with k = 0. Two sources:
// - the contact image handed to mumax3's ImageShape (nonzero pixel = device),
// - the converted magnetization itself (zero vector = vacuum).

use std::path::Path;

use image::imageops::FilterType;
use image::GenericImageView;

use crate::error::Result;
use crate::vector_field::VectorField3D;

/// Boolean in-plane mask (length = nx*ny), x fastest.
pub type Mask2D = Vec<bool>;

#[inline]
fn idx(i: usize, j: usize, nx: usize) -> usize {
    j * nx + i
}

/// Pixel resolution (width, height) of a mask image.
pub fn image_resolution(path: &Path) -> Result<(u32, u32)> {
    Ok(image::open(path)?.dimensions())
}

/// Load a mask image and resample it onto an nx × ny cell grid.
///
/// Image rows run top to bottom while cell j runs along +y, matching how
/// mumax3 maps ImageShape pixels onto the grid.
pub fn mask_from_image(path: &Path, nx: usize, ny: usize) -> Result<Mask2D> {
    let img = image::open(path)?
        .resize_exact(nx as u32, ny as u32, FilterType::Nearest)
        .to_rgba8();

    let mut mask = vec![false; nx * ny];
    for j in 0..ny {
        for i in 0..nx {
            let px = img.get_pixel(i as u32, (ny - 1 - j) as u32);
            mask[idx(i, j, nx)] = px.0[..3].iter().any(|&c| c != 0);
        }
    }
    Ok(mask)
}

/// Device cells of layer `k`: every cell whose vector is not exactly zero.
pub fn mask_from_field(field: &VectorField3D, k: usize) -> Mask2D {
    let g = field.grid;
    let mut mask = vec![false; g.nx * g.ny];
    for j in 0..g.ny {
        for i in 0..g.nx {
            mask[idx(i, j, g.nx)] = !crate::vec3::is_zero(field.vector(i, j, k));
        }
    }
    mask
}

/// Count "true" cells.
pub fn mask_count(mask: &[bool]) -> usize {
    mask.iter().filter(|&&v| v).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid3D;

    #[test]
    fn image_mask_keeps_nonzero_pixels_and_flips_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.png");

        // 4x2 image: only the top-left pixel is lit.
        let mut img = image::RgbImage::new(4, 2);
        img.put_pixel(0, 0, image::Rgb([255, 255, 255]));
        img.save(&path).unwrap();

        assert_eq!(image_resolution(&path).unwrap(), (4, 2));

        let mask = mask_from_image(&path, 4, 2).unwrap();
        assert_eq!(mask_count(&mask), 1);
        // top image row is the highest y cell
        assert!(mask[idx(0, 1, 4)]);
    }

    #[test]
    fn field_mask_marks_nonzero_vectors() {
        let grid = Grid3D::cubic(3, 2, 1, 5.0);
        let mut f = VectorField3D::zeros(grid);
        f.set_vector(1, 0, 0, [0.0, 0.0, 1.0]);
        f.set_vector(2, 1, 0, [0.5, 0.0, 0.0]);

        let mask = mask_from_field(&f, 0);
        assert_eq!(mask_count(&mask), 2);
        assert!(mask[idx(1, 0, 3)]);
        assert!(mask[idx(2, 1, 3)]);
        assert!(!mask[idx(0, 0, 3)]);
    }
}
