// tests/analysis_pipeline.rs
//
// Output-directory analysis without a simulator: OVF files written here stand in
// for mumax3 output. Plots are not checked, only the data that feeds them.
// Run only these: cargo test --test analysis_pipeline

use std::fs;
use std::path::Path;

use mumax_scripter::analysis::Analysis;
use mumax_scripter::grid::Grid3D;
use mumax_scripter::ovf::{read_ovf, write_ovf2_binary4};
use mumax_scripter::script::Axis;
use mumax_scripter::segment::segment_sweeps;
use mumax_scripter::table::{Table, TABLE_HEADER};
use mumax_scripter::vector_field::VectorField3D;
use mumax_scripter::visualisation::stray_field::{flux_profile, interface_layer};
use mumax_scripter::visualisation::sweep::arrow_rows;

const MSAT: f64 = 1_400_000.0;

/// 8 x 4 x 4 grid, device in the lower two layers magnetized along +z.
fn magnetization() -> VectorField3D {
    let mut m = VectorField3D::zeros(Grid3D::cubic(8, 4, 4, 5.0));
    for k in 0..2 {
        for j in 0..4 {
            for i in 0..8 {
                m.set_vector(i, j, k, [0.0, 0.0, MSAT]);
            }
        }
    }
    m
}

/// B_z grows along x, in tesla.
fn stray_field() -> VectorField3D {
    let mut b = VectorField3D::zeros(Grid3D::cubic(8, 4, 4, 5.0));
    for k in 0..4 {
        for j in 0..4 {
            for i in 0..8 {
                b.set_vector(i, j, k, [0.0, 0.0, 0.001 * i as f64]);
            }
        }
    }
    b
}

fn output_dir(root: &Path) -> std::path::PathBuf {
    let out = root.join("run.out");
    fs::create_dir(&out).unwrap();
    fs::write(
        out.join("log.txt"),
        "//mumax 3.10\nHeight := 10\ncell_size := 5\ngeometry := Ellipse(40*nm,20*nm)\n",
    )
    .unwrap();
    write_ovf2_binary4(&out.join("m_full000000.ovf"), &magnetization(), "m_full").unwrap();
    write_ovf2_binary4(&out.join("B_demag000000.ovf"), &stray_field(), "B_demag").unwrap();
    out
}

#[test]
fn conversion_unlocks_magnetization_and_flux() {
    let root = tempfile::tempdir().unwrap();
    let out = output_dir(root.path());

    let mut analysis = Analysis::open(&out).unwrap();
    assert!(analysis.artifacts().can_convert());
    assert!(!analysis.artifacts().can_plot_magnetization());
    assert_eq!(analysis.cell_size(), 5.0);
    assert_eq!(analysis.params().and_then(|p| p.mid_slice()), Some(1));

    let report = analysis.convert_ovf(true).unwrap();
    assert!(report.all_ok());
    assert_eq!(report.converted.len(), 2);
    assert!(!out.join("m_full000000.ovf").exists());
    assert!(!out.join("B_demag000000.ovf").exists());

    let a = analysis.artifacts();
    assert!(!a.can_convert());
    assert!(a.can_plot_magnetization());
    assert!(a.can_plot_flux());
    assert_eq!(
        analysis.magnetization_files().unwrap(),
        vec![out.join("m_full000000.npy")]
    );
    assert_eq!(analysis.flux_reference().unwrap(), out.join("m_full000000.npy"));

    // the arrays carry the same data the OVF did
    let m = VectorField3D::load_npy(&out.join("m_full000000.npy"), 5.0).unwrap();
    assert_eq!(m.data.shape(), &[8, 4, 4, 3]);
    assert_eq!(m.vector(3, 2, 1), [0.0, 0.0, MSAT]);
    assert_eq!(m.vector(3, 2, 2), [0.0, 0.0, 0.0]);

    // stray field just above the device, averaged over +-1 cell
    let b = VectorField3D::load_npy(&out.join("B_demag000000.npy"), 5.0).unwrap();
    let layer = interface_layer(&m, None).unwrap();
    assert_eq!(layer, 2);
    let mask = vec![true; 8 * 4];
    let profile = flux_profile(&b, &mask, layer, 1, 0, 5.0);
    assert_eq!(profile.len(), 6);
    for &(pos, mt) in &profile {
        // window centre i = pos / 5, mean B_z = i mT
        assert!((mt - pos / 5.0).abs() < 1e-4, "{} nm: {} mT", pos, mt);
    }
}

#[test]
fn corrupt_ovf_is_skipped_and_kept() {
    let root = tempfile::tempdir().unwrap();
    let out = output_dir(root.path());
    fs::write(out.join("m000001.ovf"), "# OOMMF OVF 2.0\n# Begin: Segment\n").unwrap();

    let mut analysis = Analysis::open(&out).unwrap();
    let report = analysis.convert_ovf(true).unwrap();
    assert_eq!(report.converted.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert!(out.join("m000001.ovf").exists());
    assert!(read_ovf(&out.join("m000001.ovf")).is_err());
}

fn table_text(fields_mt: &[[f64; 3]], settled_rows: &[usize]) -> String {
    let mut raw = String::from(TABLE_HEADER);
    raw.push('\n');
    let mut mx = 0.0;
    for (i, b) in fields_mt.iter().enumerate() {
        if !settled_rows.contains(&i) {
            mx += 0.01;
        }
        let e = 1e-16 * (i + 1) as f64;
        raw.push_str(&format!(
            "{}\t{}\t0\t0\t{}\t{}\t{}\t{}\t0\t0\t0\t{}\t{}\t{}\n",
            i as f64 * 1e-10,
            mx,
            3.0 * e,
            e,
            -e,
            e,
            b[0] * 1e-3,
            b[1] * 1e-3,
            b[2] * 1e-3
        ));
    }
    raw
}

#[test]
fn table_sweeps_are_segmented_by_axis() {
    let fields = [
        [0.0, 0.0, 0.0],
        [10.0, 0.0, 0.0],
        [20.0, 0.0, 0.0],
        [30.0, 0.0, 0.0],
        [20.0, 0.0, 0.0],
        [10.0, 0.0, 0.0],
        [0.0, 0.0, 0.0],
        [0.0, 10.0, 0.0],
        [0.0, 20.0, 0.0],
        [0.0, 10.0, 0.0],
    ];
    // row 6 relaxed to the same state as row 5 at zero field
    let raw = table_text(&fields, &[6]);
    let table = Table::parse(Path::new("table.txt"), &raw).unwrap();
    assert_eq!(table.len(), 10);

    let e = table.absolute_energy();
    assert!((e[0] - 3e-16).abs() < 1e-28);

    let segments = segment_sweeps(&table.magnetization(), &table.field());
    let summary: Vec<(usize, usize, Axis)> =
        segments.iter().map(|s| (s.start, s.end, s.axis)).collect();
    assert_eq!(summary, vec![(0, 6, Axis::X), (6, 9, Axis::Y)]);

    // arrows never point past the last row
    assert!(arrow_rows(table.len(), segments.len())
        .iter()
        .all(|&r| r + 1 < table.len()));
}
