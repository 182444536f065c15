// src/visualisation/stray_field.rs
//
// Out-of-plane stray field just above the device, averaged over a window that
// slides along x (a "trench" of given width plus penetration depth on both sides).
// Only ever run on explicit request.

use std::path::{Path, PathBuf};

use log::{info, warn};
use plotters::prelude::*;

use super::{legend_line, PALETTE};
use crate::error::{Result, ScripterError};
use crate::mask::{mask_count, mask_from_field, mask_from_image, Mask2D};
use crate::vector_field::VectorField3D;

pub const FLUX_PLOT: &str = "flux.png";

#[derive(Debug, Clone)]
pub struct FluxRequest {
    /// `(label, B_demag*.npy)` pairs, one curve each.
    pub states: Vec<(String, PathBuf)>,
    /// Device height in cells; inferred from an `m_full` reference when absent.
    pub device_height: Option<usize>,
    /// Cells at the left belonging to contacts rather than the device.
    pub device_start_x: usize,
    /// Cell edge (nm).
    pub cell_size: f64,
    /// Physical trench width (nm).
    pub trench_width: f64,
    /// Penetration depth of the material (nm).
    pub penetration_depth: f64,
    pub mask_image: Option<PathBuf>,
    /// Highlighted trench position (nm).
    pub trench_location: Option<f64>,
}

impl Default for FluxRequest {
    fn default() -> Self {
        Self {
            states: Vec::new(),
            device_height: None,
            device_start_x: 0,
            cell_size: 5.0,
            trench_width: 15.0,
            penetration_depth: 150.0,
            mask_image: None,
            trench_location: None,
        }
    }
}

impl FluxRequest {
    /// Half-width of the averaging window in cells.
    pub fn window_cells(&self) -> usize {
        let total = self.trench_width + 2.0 * self.penetration_depth;
        (total / 2.0 / self.cell_size).ceil() as usize
    }
}

/// Unnormalised `m_full` files keep vacuum at exactly zero; normalised `m` files do not.
fn is_full_magnetization(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map_or(false, |n| n.starts_with("m_full"))
}

/// First layer above the device.
///
/// With a known device height that is `height + 1`; otherwise the layer where
/// |m_z| at the in-plane centre is smallest.
pub fn interface_layer(mag: &VectorField3D, device_height: Option<usize>) -> Result<usize> {
    let g = mag.grid;
    let layer = match device_height {
        Some(h) => h + 1,
        None => {
            let (ci, cj) = (g.nx / 2, g.ny / 2);
            (0..g.nz)
                .map(|k| (k, mag.vector(ci, cj, k)[2].abs()))
                .fold((0, f64::INFINITY), |best, (k, v)| if v < best.1 { (k, v) } else { best })
                .0
        }
    };
    if layer == 0 || layer >= g.nz {
        return Err(ScripterError::InvalidArgument(format!(
            "interface layer {} is not above the device inside a grid of {} layers",
            layer, g.nz
        )));
    }
    Ok(layer)
}

/// `(position nm, mean B_z mT)` along x. Windows that would leave the grid are
/// skipped, as are windows without any device cell.
pub fn flux_profile(
    stray: &VectorField3D,
    mask: &[bool],
    interface: usize,
    window: usize,
    device_start_x: usize,
    cell_size: f64,
) -> Vec<(f64, f64)> {
    let g = stray.grid;
    let mut out = Vec::new();
    for x in 0..g.nx {
        if x < window {
            continue;
        }
        let (begin, end) = (x - window, x + window + 1);
        if end > g.nx {
            break;
        }
        let mut sum = 0.0;
        let mut area = 0usize;
        for j in 0..g.ny {
            for i in begin..end {
                if mask[j * g.nx + i] {
                    sum += stray.vector(i, j, interface)[2];
                    area += 1;
                }
            }
        }
        if area == 0 {
            continue;
        }
        let pos = (x as f64 - device_start_x as f64) * cell_size;
        out.push((pos, sum / area as f64 * 1000.0));
    }
    out
}

pub fn flux_plot(reference: &Path, req: &FluxRequest, out_dir: &Path) -> Result<PathBuf> {
    if req.states.is_empty() {
        return Err(ScripterError::InvalidArgument(
            "no stray-field states given".into(),
        ));
    }
    let full = is_full_magnetization(reference);
    if !full && req.mask_image.is_none() {
        return Err(ScripterError::InvalidArgument(
            "normalised magnetization needs a mask image to locate the device".into(),
        ));
    }
    if !full && req.device_height.is_none() {
        return Err(ScripterError::InvalidArgument(
            "normalised magnetization needs device_height to locate the interface".into(),
        ));
    }

    info!("Plotting stray fields.");
    let mag = VectorField3D::load_npy(reference, req.cell_size)?;
    let g = mag.grid;
    let interface = interface_layer(&mag, req.device_height)?;
    let mask: Mask2D = match &req.mask_image {
        Some(img) => mask_from_image(img, g.nx, g.ny)?,
        None => mask_from_field(&mag, interface - 1),
    };
    if mask_count(&mask) == 0 {
        warn!("Device mask is empty; no stray field can be averaged.");
    }

    let window = req.window_cells();
    let mut curves = Vec::with_capacity(req.states.len());
    let mut max = 0.0_f64;
    for (label, file) in &req.states {
        let stray = VectorField3D::load_npy(file, req.cell_size)?;
        if stray.grid.nx != g.nx || stray.grid.ny != g.ny || interface >= stray.grid.nz {
            return Err(ScripterError::decode(
                file,
                "stray-field grid does not match the reference magnetization",
            ));
        }
        let profile = flux_profile(
            &stray,
            &mask,
            interface,
            window,
            req.device_start_x,
            req.cell_size,
        );
        max = profile.iter().fold(max, |m, &(_, v)| m.max(v.abs()));
        curves.push((label.clone(), profile));
    }
    if max == 0.0 {
        max = 1.0;
    }

    let c = req.cell_size;
    let x_start = -20.0 * c;
    let x_end = (g.nx as f64 - 2.0 * req.device_start_x as f64 + 20.0) * c;
    let path = out_dir.join(FLUX_PLOT);
    {
        let root = BitMapBackend::new(&path, (1000, 700)).into_drawing_area();
        root.fill(&WHITE)?;
        let mut chart = ChartBuilder::on(&root)
            .margin(20)
            .caption("Demagnetizing field in junction area", ("sans-serif", 24))
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d(x_start..x_end, -1.1 * max..1.1 * max)?;
        chart
            .configure_mesh()
            .x_desc("Trench position on device (nm)")
            .y_desc("Change in magnetic field (mT)")
            .draw()?;

        for (k, (label, profile)) in curves.iter().enumerate() {
            let color = PALETTE[k % PALETTE.len()];
            chart
                .draw_series(LineSeries::new(profile.iter().copied(), color.stroke_width(2)))?
                .label(label.as_str())
                .legend(legend_line(color));
        }

        if let Some(t) = req.trench_location {
            let (lo, hi) = (-1.1 * max, 1.1 * max);
            let dash = (hi - lo) / 40.0;
            chart
                .draw_series((0..20).map(|d| {
                    let y0 = lo + 2.0 * d as f64 * dash;
                    PathElement::new(vec![(t, y0), (t, y0 + dash)], BLACK.stroke_width(2))
                }))?
                .label("Approx. Trench Location")
                .legend(legend_line(BLACK));
        }

        chart
            .configure_series_labels()
            .border_style(BLACK)
            .background_style(WHITE.mix(0.8))
            .draw()?;
        root.present()?;
    }
    info!("Figure saved as '{}'.", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid3D;

    #[test]
    fn window_average_over_masked_cells() {
        // 6 x 2 x 3 grid, stray B_z = i * 0.001 T at the interface layer 2
        let grid = Grid3D::cubic(6, 2, 3, 5.0);
        let mut stray = VectorField3D::zeros(grid);
        for j in 0..2 {
            for i in 0..6 {
                stray.set_vector(i, j, 2, [0.0, 0.0, i as f64 * 0.001]);
            }
        }
        // only row j = 0 is device
        let mut mask = vec![false; 12];
        for i in 0..6 {
            mask[i] = true;
        }

        let profile = flux_profile(&stray, &mask, 2, 1, 1, 5.0);
        // windows centred at x = 1..=4
        let xs: Vec<f64> = profile.iter().map(|p| p.0).collect();
        assert_eq!(xs, vec![0.0, 5.0, 10.0, 15.0]);
        // mean of i over [x-1, x+1] = x, in mT
        for (k, &(_, v)) in profile.iter().enumerate() {
            assert!((v - (k + 1) as f64).abs() < 1e-9, "window {}: {}", k, v);
        }
    }

    #[test]
    fn interface_from_height_or_centre_minimum() {
        let grid = Grid3D::cubic(4, 4, 5, 5.0);
        let mut mag = VectorField3D::zeros(grid);
        for k in 0..3 {
            mag.set_vector(2, 2, k, [0.0, 0.0, 1.4e6]);
        }
        // layers 3 and 4 are vacuum; the first one wins
        assert_eq!(interface_layer(&mag, None).unwrap(), 3);
        assert_eq!(interface_layer(&mag, Some(1)).unwrap(), 2);
        assert!(interface_layer(&mag, Some(4)).is_err());

        // no vacuum above the device
        let full = VectorField3D::zeros(Grid3D::cubic(2, 2, 2, 5.0));
        assert!(interface_layer(&full, None).is_err());
    }

    #[test]
    fn window_uses_trench_and_penetration_depth() {
        let req = FluxRequest::default();
        // (15 + 300) / 2 / 5 = 31.5 -> 32
        assert_eq!(req.window_cells(), 32);
        let req = FluxRequest {
            penetration_depth: 0.0,
            ..FluxRequest::default()
        };
        assert_eq!(req.window_cells(), 2);
    }

    #[test]
    fn normalised_reference_needs_mask_and_height() {
        let dir = tempfile::tempdir().unwrap();
        let req = FluxRequest {
            states: vec![("a".into(), dir.path().join("B_demag000000.npy"))],
            ..FluxRequest::default()
        };
        let err = flux_plot(&dir.path().join("m000000.npy"), &req, dir.path()).unwrap_err();
        assert!(matches!(err, ScripterError::InvalidArgument(_)));
    }
}
