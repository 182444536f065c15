// src/visualisation/mod.rs
//
// PNG figures for a mumax3 output directory, drawn with plotters' bitmap backend.

pub mod magnetization;
pub mod stray_field;
pub mod sweep;
pub mod time_series;

use plotters::prelude::*;

/// Per-axis colours shared by the field shading and the sweep legend.
pub const AXIS_COLORS: [RGBColor; 3] = [
    RGBColor(31, 119, 180),  // x: blue
    RGBColor(255, 127, 14),  // y: orange
    RGBColor(44, 160, 44),   // z: green
];

/// Series colours for line plots with more curves than axes.
pub const PALETTE: [RGBColor; 6] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
];

/// Map m_z to a blue-white-red colour using the frame's own min/max,
/// so small variations are still visible.
pub(crate) fn mz_to_color(mz: f64, min_mz: f64, max_mz: f64) -> RGBColor {
    let mut lo = min_mz;
    let mut hi = max_mz;
    if !lo.is_finite() || !hi.is_finite() || (hi - lo).abs() < 1e-9 {
        lo = -1.0;
        hi = 1.0;
    }

    let x = ((mz - lo) / (hi - lo)).clamp(0.0, 1.0);

    // x=0 -> blue, x=0.5 -> white, x=1 -> red
    let r = (255.0 * (2.0 * x).min(1.0)) as u8;
    let b = (255.0 * (2.0 * (1.0 - x)).min(1.0)) as u8;
    let g = (255.0 * (1.0 - (2.0 * (x - 0.5).abs()))).clamp(0.0, 255.0) as u8;

    RGBColor(r, g, b)
}

/// Finite min/max of `values`, widened so the curve does not touch the frame.
/// Falls back to [-1, 1] when nothing finite is present.
pub(crate) fn padded_range<I: IntoIterator<Item = f64>>(values: I) -> (f64, f64) {
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for v in values {
        if v.is_finite() {
            y_min = y_min.min(v);
            y_max = y_max.max(v);
        }
    }

    if !y_min.is_finite() || !y_max.is_finite() {
        (-1.0, 1.0)
    } else if (y_max - y_min).abs() < 1e-30 {
        let delta = if y_max.abs() < 1e-30 {
            1.0
        } else {
            0.1 * y_max.abs()
        };
        (y_min - delta, y_max + delta)
    } else {
        let margin = 0.1 * (y_max - y_min);
        (y_min - margin, y_max + margin)
    }
}

/// Plot range covering `x`; a single sample gets a unit-wide window.
pub(crate) fn axis_span(x: &[f64]) -> (f64, f64) {
    let lo = x.iter().cloned().fold(f64::INFINITY, f64::min);
    let hi = x.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if !lo.is_finite() || !hi.is_finite() {
        (0.0, 1.0)
    } else if hi - lo <= 0.0 {
        (lo - 0.5, hi + 0.5)
    } else {
        (lo, hi)
    }
}

/// Positive finite range for a log axis, padded by half a decade.
pub(crate) fn log_range<I: IntoIterator<Item = f64>>(values: I) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for v in values {
        if v.is_finite() && v > 0.0 {
            lo = lo.min(v);
            hi = hi.max(v);
        }
    }
    if !lo.is_finite() {
        return (1e-16, 1e-13);
    }
    (lo / 10f64.sqrt(), hi * 10f64.sqrt())
}

/// Short horizontal legend swatch.
pub(crate) fn legend_line(color: RGBColor) -> impl Fn((i32, i32)) -> PathElement<(i32, i32)> {
    move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
}
