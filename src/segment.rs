// src/segment.rs
//
// Splitting a table of field-sweep rows into individual sweeps.
//
// A sweep boundary shows up in two ways:
//  - a relaxation at zero field between sweeps: the rounded magnetization sum
//    stops changing and the field is zero, so the next sweep starts at that row;
//  - the field jumps to another axis without a zero-field pause, in which case the
//    previous row (the last one of the old sweep) also starts the new one.

use log::debug;

use crate::script::Axis;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepSegment {
    /// First row (inclusive).
    pub start: usize,
    /// Last row (inclusive); shared with the next segment's `start`.
    pub end: usize,
    pub axis: Axis,
}

impl SweepSegment {
    pub fn rows(&self) -> std::ops::RangeInclusive<usize> {
        self.start..=self.end
    }
}

/// First axis with a nonzero component, in x, y, z order.
pub fn dominant_axis(b: [f64; 3]) -> Option<Axis> {
    Axis::ALL.into_iter().find(|a| b[a.index()] != 0.0)
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

/// Segment rows of reduced magnetization `m` and applied field `b` into sweeps.
pub fn segment_sweeps(m: &[[f64; 3]], b: &[[f64; 3]]) -> Vec<SweepSegment> {
    let n = m.len().min(b.len());
    let mut starts: Vec<(usize, Axis)> = Vec::new();
    let mut active: Option<Axis> = None;

    for i in 1..n {
        let sum = |r: usize| round3(m[r][0] + m[r][1] + m[r][2]);
        let settled = sum(i) == sum(i - 1);
        let zero_field = b[i].iter().all(|&c| c == 0.0);

        if settled && zero_field {
            let next = if i + 1 < n { dominant_axis(b[i + 1]) } else { None };
            if let Some(axis) = next {
                debug!("New {} sweep detected at i={}", axis, i + 1);
                starts.push((i, axis));
            }
            active = next;
        } else if let Some(axis) = dominant_axis(b[i]) {
            if active != Some(axis) {
                debug!("New {} sweep detected at i={}", axis, i);
                starts.push((i - 1, axis));
                active = Some(axis);
            }
        }
    }

    let mut segments = Vec::with_capacity(starts.len());
    for (k, &(start, axis)) in starts.iter().enumerate() {
        let end = starts.get(k + 1).map(|&(s, _)| s).unwrap_or(n - 1);
        segments.push(SweepSegment { start, end, axis });
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(fields_mt: &[[f64; 3]]) -> (Vec<[f64; 3]>, Vec<[f64; 3]>) {
        // magnetization follows the field loosely so consecutive rows differ
        let m = fields_mt
            .iter()
            .enumerate()
            .map(|(i, _)| [0.01 * i as f64, 0.0, 0.0])
            .collect();
        let b = fields_mt.iter().map(|f| [f[0] / 1e3, f[1] / 1e3, f[2] / 1e3]).collect();
        (m, b)
    }

    #[test]
    fn ramp_then_axis_change() {
        let mut f: Vec<[f64; 3]> = Vec::new();
        for v in [0., 10., 20., 30., 40., 50., 40., 30., 20., 10., 0.] {
            f.push([v, 0., 0.]);
        }
        for v in [10., 20., 30., 40., 50.] {
            f.push([0., v, 0.]);
        }
        let (m, b) = rows(&f);

        let segs = segment_sweeps(&m, &b);
        assert_eq!(
            segs,
            vec![
                SweepSegment { start: 0, end: 10, axis: Axis::X },
                SweepSegment { start: 10, end: 15, axis: Axis::Y },
            ]
        );
    }

    #[test]
    fn zero_field_relaxation_starts_next_sweep() {
        // x sweep, then two zero-field rows with a settled magnetization, then z
        let b = vec![
            [0.0, 0.0, 0.0],
            [0.01, 0.0, 0.0],
            [0.02, 0.0, 0.0],
            [0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0],
            [0.0, 0.0, 0.01],
            [0.0, 0.0, 0.02],
        ];
        let m = vec![
            [0.1, 0.0, 0.0],
            [0.5, 0.0, 0.0],
            [0.9, 0.0, 0.0],
            [0.7, 0.1, 0.0],
            [0.7, 0.1, 0.0],
            [0.6, 0.1, 0.1],
            [0.4, 0.1, 0.3],
        ];
        let segs = segment_sweeps(&m, &b);
        assert_eq!(
            segs,
            vec![
                SweepSegment { start: 0, end: 4, axis: Axis::X },
                SweepSegment { start: 4, end: 6, axis: Axis::Z },
            ]
        );
    }

    #[test]
    fn trailing_zero_rows_open_nothing() {
        let b = vec![[0.01, 0.0, 0.0], [0.02, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 0.0, 0.0]];
        let m = vec![[0.1, 0.0, 0.0], [0.2, 0.0, 0.0], [0.3, 0.0, 0.0], [0.3, 0.0, 0.0]];
        let segs = segment_sweeps(&m, &b);
        assert_eq!(segs, vec![SweepSegment { start: 0, end: 3, axis: Axis::X }]);
    }

    #[test]
    fn tie_break_prefers_x_then_y() {
        assert_eq!(dominant_axis([0.0, 1.0, 1.0]), Some(Axis::Y));
        assert_eq!(dominant_axis([1.0, 1.0, 0.0]), Some(Axis::X));
        assert_eq!(dominant_axis([0.0, 0.0, 0.0]), None);
    }

    #[test]
    fn tiny_tables_produce_no_segments() {
        assert!(segment_sweeps(&[], &[]).is_empty());
        assert!(segment_sweeps(&[[1.0, 0.0, 0.0]], &[[0.0, 0.0, 0.0]]).is_empty());
    }
}
