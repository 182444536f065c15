// src/visualisation/sweep.rs
//
// Total energy against applied field, one curve per detected sweep, with
// arrows marking the direction of travel and an inset of the field per row.

use std::path::{Path, PathBuf};

use log::info;
use plotters::prelude::*;

use super::{legend_line, padded_range, PALETTE};
use crate::error::{Result, ScripterError};
use crate::segment::{segment_sweeps, SweepSegment};
use crate::table::Table;

pub const SWEEP_PLOT: &str = "sweepplot.png";

const ARROW_PX: f64 = 22.0;

/// Rows that get a direction arrow: `trunc(1.5 * n_segments)` evenly spaced
/// rows in `[3, n_rows - 3]`.
pub fn arrow_rows(n_rows: usize, n_segments: usize) -> Vec<usize> {
    let count = (n_segments as f64 * 1.5) as usize;
    if count == 0 || n_rows < 6 {
        return Vec::new();
    }
    let (lo, hi) = (3.0, (n_rows - 3) as f64);
    if count == 1 {
        return vec![3];
    }
    (0..count)
        .map(|k| (lo + (hi - lo) * k as f64 / (count - 1) as f64) as usize)
        .collect()
}

/// Sum of the field components per row, in mT.
pub fn total_field_mt(b: &[[f64; 3]]) -> Vec<f64> {
    b.iter().map(|v| (v[0] + v[1] + v[2]) * 1e3).collect()
}

fn arrow_head(tip: (i32, i32), dir: (f64, f64)) -> [Vec<(i32, i32)>; 2] {
    let (c, s) = (0.9063, 0.4226); // cos/sin 25°
    let back = (-dir.0, -dir.1);
    let wing = |sign: f64| {
        let rx = back.0 * c - sign * back.1 * s;
        let ry = sign * back.0 * s + back.1 * c;
        (tip.0 + (rx * 8.0) as i32, tip.1 + (ry * 8.0) as i32)
    };
    [vec![wing(1.0), tip], vec![wing(-1.0), tip]]
}

pub fn sweep_plot(table: &Table, out_dir: &Path) -> Result<PathBuf> {
    info!("Plotting magnetization and energy figures.");
    info!("Slicing data into different sweeps...");

    let field = total_field_mt(&table.field());
    let energy: Vec<f64> = table.absolute_energy().iter().map(|e| e * 1e15).collect();
    let segments: Vec<SweepSegment> = segment_sweeps(&table.magnetization(), &table.field());
    if segments.is_empty() {
        return Err(ScripterError::missing("field sweeps in table.txt", out_dir));
    }

    info!("Plotting...");
    let n = field.len();
    let path = out_dir.join(SWEEP_PLOT);
    let (f_lo, f_hi) = padded_range(field.iter().copied());
    let (e_lo, e_hi) = padded_range(energy.iter().copied());

    {
        let root = BitMapBackend::new(&path, (1000, 750)).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .margin(20)
            .caption("Field sweep energy", ("sans-serif", 26))
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d(f_lo..f_hi, e_lo..e_hi)?;

        chart
            .configure_mesh()
            .x_desc("B_ext (mT)")
            .y_desc("Energy (fJ)")
            .draw()?;

        for (k, seg) in segments.iter().enumerate() {
            let color = PALETTE[k % PALETTE.len()];
            let pts: Vec<(f64, f64)> = seg.rows().map(|r| (field[r], energy[r])).collect();
            chart
                .draw_series(LineSeries::new(pts.clone(), color.mix(0.6).stroke_width(2)))?
                .label(format!("{} sweep", seg.axis))
                .legend(legend_line(color));
            chart.draw_series(
                pts.into_iter()
                    .map(|p| Circle::new(p, 3, color.mix(0.6).filled())),
            )?;
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::LowerRight)
            .border_style(BLACK)
            .background_style(WHITE.mix(0.8))
            .draw()?;

        // Direction arrows, fixed length in pixels.
        let area = chart.plotting_area();
        for r in arrow_rows(n, segments.len()) {
            let p0 = area.map_coordinate(&(field[r], energy[r]));
            let p1 = area.map_coordinate(&(field[r + 1], energy[r + 1]));
            let (dx, dy) = ((p1.0 - p0.0) as f64, (p1.1 - p0.1) as f64);
            let len = (dx * dx + dy * dy).sqrt();
            if len == 0.0 {
                continue;
            }
            let dir = (dx / len, dy / len);
            let tip = (
                p0.0 + (dir.0 * ARROW_PX) as i32,
                p0.1 + (dir.1 * ARROW_PX) as i32,
            );
            root.draw(&PathElement::new(vec![p0, tip], BLACK.stroke_width(2)))?;
            for wing in arrow_head(tip, dir) {
                root.draw(&PathElement::new(wing, BLACK.stroke_width(2)))?;
            }
        }

        // Inset: field against row index.
        let width = (0.2 * (n as f64 / 20.0).sqrt()).min(0.5);
        let inset = root.clone().shrink((150, 70), ((width * 1000.0) as u32 + 60, 170));
        inset.fill(&WHITE.mix(0.9))?;
        let mut small = ChartBuilder::on(&inset)
            .margin(5)
            .x_label_area_size(30)
            .y_label_area_size(45)
            .build_cartesian_2d(0f64..(n.max(2) - 1) as f64, f_lo..f_hi)?;
        small
            .configure_mesh()
            .x_desc("Simulation steps")
            .y_desc("B_ext (mT)")
            .label_style(("sans-serif", 11))
            .axis_desc_style(("sans-serif", 12))
            .disable_mesh()
            .draw()?;
        for (k, seg) in segments.iter().enumerate() {
            let color = PALETTE[k % PALETTE.len()];
            small.draw_series(LineSeries::new(
                seg.rows().map(|r| (r as f64, field[r])),
                color.stroke_width(1),
            ))?;
        }

        root.present()?;
    }
    info!("Figure saved as '{}'.", path.display());
    Ok(path)
}
