// src/visualisation/time_series.rs
//
// Magnetization and energy against simulation time, with the applied field
// shaded behind both panels.

use std::path::{Path, PathBuf};

use log::{info, warn};
use plotters::prelude::*;

use super::{axis_span, legend_line, log_range, padded_range, AXIS_COLORS, PALETTE};
use crate::error::{Result, ScripterError};
use crate::table::Table;

pub const STATIC_FIELD_PLOT: &str = "static_field_plot.png";

/// x values for the plot: time in ns, or step numbers 1..n when the table
/// carries no time information.
pub fn time_axis(t_s: &[f64]) -> (Vec<f64>, &'static str) {
    if t_s.iter().sum::<f64>() > 0.0 {
        (t_s.iter().map(|t| t * 1e9).collect(), "Time (ns)")
    } else {
        warn!("Data file does not contain time information! Plotting against simulation steps.");
        ((1..=t_s.len()).map(|i| i as f64).collect(), "Simulation steps")
    }
}

/// `(x0, x1, B in mT)` for every row where field component `axis` is nonzero.
pub fn field_bands(x: &[f64], field_t: &[[f64; 3]], axis: usize) -> Vec<(f64, f64, f64)> {
    let mut out = Vec::new();
    for (i, b) in field_t.iter().enumerate().take(x.len()) {
        let mt = b[axis] * 1e3;
        if mt != 0.0 {
            let x1 = x.get(i + 1).copied().unwrap_or(x[i]);
            out.push((x[i], x1, mt));
        }
    }
    out
}

pub fn static_field_plot(table: &Table, out_dir: &Path) -> Result<PathBuf> {
    if table.is_empty() {
        return Err(ScripterError::missing("table rows", out_dir));
    }
    info!("Making static field plot.....");

    let path = out_dir.join(STATIC_FIELD_PLOT);
    let (x, x_desc) = time_axis(&table.time());
    let (x0, x1) = axis_span(&x);

    let m = table.magnetization();
    let b = table.field();
    let bands: Vec<Vec<(f64, f64, f64)>> = (0..3).map(|a| field_bands(&x, &b, a)).collect();
    let (b_lo, b_hi) = padded_range(
        b.iter()
            .flat_map(|v| v.iter().map(|c| c * 1e3))
            .chain(std::iter::once(0.0)),
    );

    let energies: Vec<(&str, Vec<f64>)> = ["E_exch", "E_demag", "E_Zeeman"]
        .iter()
        .map(|name| {
            let col = table.column(name).unwrap_or_default();
            (*name, col.into_iter().map(f64::abs).collect())
        })
        .collect();
    let total = table.absolute_energy();
    let (e_lo, e_hi) = log_range(
        energies
            .iter()
            .flat_map(|(_, v)| v.iter().copied())
            .chain(total.iter().copied()),
    );

    // the backend borrows `path` until it is dropped
    {
        let root = BitMapBackend::new(&path, (1400, 1000)).into_drawing_area();
        root.fill(&WHITE)?;
        let titled = root.titled(
            "Total magnetization and system energy as function of time.",
            ("sans-serif", 26),
        )?;
        let panels = titled.split_evenly((2, 1));

        // magnetization
        {
            let mut chart = ChartBuilder::on(&panels[0])
                .margin(15)
                .caption("Magnetization", ("sans-serif", 20))
                .x_label_area_size(40)
                .y_label_area_size(60)
                .right_y_label_area_size(70)
                .build_cartesian_2d(x0..x1, -1.1f64..1.1f64)?
                .set_secondary_coord(x0..x1, b_lo..b_hi);

            chart
                .configure_mesh()
                .x_desc(x_desc)
                .y_desc("Normalised Magnetization")
                .draw()?;
            chart
                .configure_secondary_axes()
                .y_desc("(Shaded) External field strength (mT)")
                .draw()?;

            for (a, axis_bands) in bands.iter().enumerate() {
                let style = AXIS_COLORS[a].mix(0.2).filled();
                chart.draw_secondary_series(
                    axis_bands
                        .iter()
                        .map(|&(xa, xb, mt)| Rectangle::new([(xa, 0.0), (xb, mt)], style)),
                )?;
            }

            for (c, name) in ["mx ()", "my ()", "mz ()"].into_iter().enumerate() {
                chart
                    .draw_series(LineSeries::new(
                        x.iter().zip(&m).map(|(&t, v)| (t, v[c])),
                        PALETTE[c].stroke_width(2),
                    ))?
                    .label(name)
                    .legend(legend_line(PALETTE[c]));
            }

            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperRight)
                .border_style(BLACK)
                .background_style(WHITE.mix(0.8))
                .draw()?;
        }

        // energy, log scale
        {
            let mut chart = ChartBuilder::on(&panels[1])
                .margin(15)
                .caption("Energy", ("sans-serif", 20))
                .x_label_area_size(40)
                .y_label_area_size(80)
                .right_y_label_area_size(70)
                .build_cartesian_2d(x0..x1, (e_lo..e_hi).log_scale())?
                .set_secondary_coord(x0..x1, b_lo..b_hi);

            chart
                .configure_mesh()
                .x_desc(x_desc)
                .y_desc("Energy (J)")
                .y_label_formatter(&|v| format!("{:.0e}", v))
                .draw()?;
            chart
                .configure_secondary_axes()
                .y_desc("(Shaded) External field strength (mT)")
                .draw()?;

            for (a, axis_bands) in bands.iter().enumerate() {
                let style = AXIS_COLORS[a].mix(0.2).filled();
                chart.draw_secondary_series(
                    axis_bands
                        .iter()
                        .map(|&(xa, xb, mt)| Rectangle::new([(xa, 0.0), (xb, mt)], style)),
                )?;
            }

            let series = energies
                .iter()
                .map(|(name, v)| (format!("{} (J)", name), v))
                .chain(std::iter::once(("E_total (J)".to_string(), &total)));
            for (k, (label, values)) in series.enumerate() {
                let color = PALETTE[k % PALETTE.len()];
                chart
                    .draw_series(LineSeries::new(
                        x.iter()
                            .zip(values.iter())
                            .filter(|(_, &e)| e > 0.0)
                            .map(|(&t, &e)| (t, e)),
                        color.stroke_width(2),
                    ))?
                    .label(label)
                    .legend(legend_line(color));
            }

            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperRight)
                .border_style(BLACK)
                .background_style(WHITE.mix(0.8))
                .draw()?;
        }

        root.present()?;
    }
    info!("Figure saved as '{}'.", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_axis_falls_back_to_steps() {
        let (x, label) = time_axis(&[0.0, 1e-9, 2e-9]);
        assert_eq!(label, "Time (ns)");
        assert!((x[2] - 2.0).abs() < 1e-12);

        let (x, label) = time_axis(&[0.0, 0.0, 0.0]);
        assert_eq!(label, "Simulation steps");
        assert_eq!(x, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn bands_follow_nonzero_components() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let b = [
            [0.0, 0.0, 0.0],
            [0.01, 0.0, 0.0],
            [0.01, 0.0, -0.005],
            [0.0, 0.0, 0.0],
        ];
        assert_eq!(
            field_bands(&x, &b, 0),
            vec![(1.0, 2.0, 10.0), (2.0, 3.0, 10.0)]
        );
        assert_eq!(field_bands(&x, &b, 1), vec![]);
        assert_eq!(field_bands(&x, &b, 2), vec![(2.0, 3.0, -5.0)]);
    }
}
