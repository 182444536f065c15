// src/visualisation/magnetization.rs
//
// One figure per converted magnetization file: m_z as a colour map under a
// quiver of the in-plane components, for a single z slice.

use std::path::{Path, PathBuf};

use log::info;
use plotters::prelude::*;

use super::mz_to_color;
use crate::error::{Result, ScripterError};
use crate::mask::{mask_from_field, mask_from_image};
use crate::vec3::{norm, scale};
use crate::vector_field::VectorField3D;

/// Roughly this many arrows along x.
const ARROWS_ACROSS: usize = 30;

#[derive(Debug, Clone)]
pub struct MagPlotOptions {
    pub zslice: usize,
    /// Cell edge in nm.
    pub cell_size: f64,
    /// Applied field in mT, shown in the title.
    pub field_mt: Option<[f64; 3]>,
    /// Device mask image; without one, zero vectors mark vacuum.
    pub mask_image: Option<PathBuf>,
}

impl Default for MagPlotOptions {
    fn default() -> Self {
        Self {
            zslice: 0,
            cell_size: 5.0,
            field_mt: None,
            mask_image: None,
        }
    }
}

/// A z slice ready to draw: `None` outside the device, otherwise the vector
/// scaled by the largest magnitude in the slice.
#[derive(Debug, Clone)]
pub struct Frame {
    pub nx: usize,
    pub ny: usize,
    pub cells: Vec<Option<[f64; 3]>>,
}

impl Frame {
    pub fn get(&self, i: usize, j: usize) -> Option<[f64; 3]> {
        self.cells[j * self.nx + i]
    }

    /// Arrow stride: about `ARROWS_ACROSS` arrows along x, at least every cell.
    pub fn skip(&self) -> usize {
        (self.nx / ARROWS_ACROSS).max(1)
    }

    fn mz_range(&self) -> (f64, f64) {
        self.cells
            .iter()
            .flatten()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v[2]), hi.max(v[2]))
            })
    }
}

pub fn prepare_frame(field: &VectorField3D, k: usize, mask: &[bool]) -> Result<Frame> {
    let g = field.grid;
    if k >= g.nz {
        return Err(ScripterError::InvalidArgument(format!(
            "z slice {} is outside the grid (nz = {})",
            k, g.nz
        )));
    }

    let mut max = 0.0_f64;
    for j in 0..g.ny {
        for i in 0..g.nx {
            max = max.max(norm(field.vector(i, j, k)));
        }
    }
    let factor = if max > 0.0 { 1.0 / max } else { 1.0 };

    let mut cells = Vec::with_capacity(g.nx * g.ny);
    for j in 0..g.ny {
        for i in 0..g.nx {
            let inside = mask.get(j * g.nx + i).copied().unwrap_or(false);
            let v = field.vector(i, j, k);
            cells.push(inside.then(|| scale(v, factor)));
        }
    }
    Ok(Frame {
        nx: g.nx,
        ny: g.ny,
        cells,
    })
}

/// `<stem>.png` next to the data file.
pub fn output_path(datafile: &Path) -> PathBuf {
    datafile.with_extension("png")
}

pub fn magplot(datafile: &Path, opts: &MagPlotOptions) -> Result<PathBuf> {
    let field = VectorField3D::load_npy(datafile, opts.cell_size)?;
    let g = field.grid;
    let mask = match &opts.mask_image {
        Some(img) => mask_from_image(img, g.nx, g.ny)?,
        None => mask_from_field(&field, opts.zslice.min(g.nz.saturating_sub(1))),
    };
    let frame = prepare_frame(&field, opts.zslice, &mask)?;

    let path = output_path(datafile);
    render(&frame, opts, &path)?;
    Ok(path)
}

fn render(frame: &Frame, opts: &MagPlotOptions, path: &Path) -> Result<()> {
    let c = opts.cell_size;
    let x_max = c * frame.nx as f64 - c / 2.0;
    let y_max = c * frame.ny as f64 - c / 2.0;

    let width = 1000u32;
    let height = ((width as f64 * frame.ny as f64 / frame.nx as f64) as u32 + 120).clamp(300, 1400);
    let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut builder = ChartBuilder::on(&root);
    builder
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60);
    if let Some(b) = opts.field_mt {
        builder.caption(
            format!("B_ext = [{}, {}, {}] (mT)", b[0].round(), b[1].round(), b[2].round()),
            ("sans-serif", 22),
        );
    }
    let mut chart = builder.build_cartesian_2d(
        -0.05 * x_max..1.05 * x_max,
        -0.05 * y_max..1.05 * y_max,
    )?;
    chart
        .configure_mesh()
        .x_desc("x (nm)")
        .y_desc("y (nm)")
        .disable_mesh()
        .draw()?;

    let (lo, hi) = frame.mz_range();
    chart.draw_series((0..frame.ny).flat_map(|j| {
        (0..frame.nx).filter_map(move |i| {
            frame.get(i, j).map(|v| {
                let (x, y) = (i as f64 * c, j as f64 * c);
                Rectangle::new(
                    [(x - c / 2.0, y - c / 2.0), (x + c / 2.0, y + c / 2.0)],
                    mz_to_color(v[2], lo, hi).filled(),
                )
            })
        })
    }))?;

    // Quiver, pivot at the cell centre, length scaled to the arrow spacing.
    let skip = frame.skip();
    let arm = 0.4 * skip as f64 * c;
    for j in (0..frame.ny).step_by(skip) {
        for i in (0..frame.nx).step_by(skip) {
            let Some(v) = frame.get(i, j) else { continue };
            let (x, y) = (i as f64 * c, j as f64 * c);
            let (ux, uy) = (v[0] * arm, v[1] * arm);
            if ux == 0.0 && uy == 0.0 {
                continue;
            }
            let tail = (x - ux, y - uy);
            let tip = (x + ux, y + uy);
            let head = 0.35;
            let left = (tip.0 - head * (ux - uy * 0.6), tip.1 - head * (uy + ux * 0.6));
            let right = (tip.0 - head * (ux + uy * 0.6), tip.1 - head * (uy - ux * 0.6));
            chart.draw_series(std::iter::once(PathElement::new(
                vec![tail, tip],
                BLACK.stroke_width(1),
            )))?;
            chart.draw_series(std::iter::once(Polygon::new(
                vec![tip, left, right],
                BLACK.filled(),
            )))?;
        }
    }

    root.present()?;
    Ok(())
}

/// Plot every file in `datafiles`. Row `i` of `fields_mt` (when given) labels file `i`.
pub fn magplot_all(
    datafiles: &[PathBuf],
    base: &MagPlotOptions,
    fields_mt: Option<&[[f64; 3]]>,
) -> Result<Vec<PathBuf>> {
    info!(
        "{} files found. Starting image creation.",
        datafiles.len()
    );
    let mut out = Vec::with_capacity(datafiles.len());
    for (i, file) in datafiles.iter().enumerate() {
        let opts = MagPlotOptions {
            field_mt: fields_mt.and_then(|f| f.get(i).copied()),
            ..base.clone()
        };
        out.push(magplot(file, &opts)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid3D;

    fn field() -> VectorField3D {
        let mut f = VectorField3D::zeros(Grid3D::cubic(4, 2, 2, 5.0));
        f.set_vector(0, 0, 0, [2.0, 0.0, 0.0]);
        f.set_vector(1, 0, 0, [0.0, 0.0, -1.0]);
        f.set_vector(3, 1, 1, [0.0, 4.0, 0.0]);
        f
    }

    #[test]
    fn frame_is_masked_and_normalised() {
        let f = field();
        let mask = mask_from_field(&f, 0);
        let frame = prepare_frame(&f, 0, &mask).unwrap();
        assert_eq!(frame.get(0, 0), Some([1.0, 0.0, 0.0]));
        assert_eq!(frame.get(1, 0), Some([0.0, 0.0, -0.5]));
        assert_eq!(frame.get(2, 0), None);
        assert_eq!(frame.mz_range(), (-0.5, 0.0));
    }

    #[test]
    fn slice_outside_grid_is_rejected() {
        let f = field();
        let mask = vec![true; 8];
        assert!(matches!(
            prepare_frame(&f, 2, &mask),
            Err(ScripterError::InvalidArgument(_))
        ));
    }

    #[test]
    fn arrow_stride_and_output_name() {
        let frame = Frame {
            nx: 200,
            ny: 100,
            cells: vec![None; 200 * 100],
        };
        assert_eq!(frame.skip(), 6);
        let small = Frame {
            nx: 10,
            ny: 1,
            cells: vec![None; 10],
        };
        assert_eq!(small.skip(), 1);
        assert_eq!(
            output_path(Path::new("out/m_full000003.npy")),
            PathBuf::from("out/m_full000003.png")
        );
    }
}
