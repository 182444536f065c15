// src/convert.rs
//
// Batch OVF -> .npy conversion. Each `<stem>.ovf` becomes `<stem>.npy` next to it,
// an (Nx, Ny, Nz, 3) f64 array. A file that fails to decode is reported and
// skipped; the rest of the batch still converts.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::error::ScripterError;
use crate::ovf::read_ovf;

#[derive(Debug, Default)]
pub struct ConversionReport {
    /// Written `.npy` files.
    pub converted: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, ScripterError)>,
}

impl ConversionReport {
    pub fn all_ok(&self) -> bool {
        self.failed.is_empty()
    }
}

pub fn npy_path_for(ovf: &Path) -> PathBuf {
    ovf.with_extension("npy")
}

fn convert_one(ovf: &Path) -> crate::error::Result<PathBuf> {
    let (_, field) = read_ovf(ovf)?;
    let out = npy_path_for(ovf);
    field.save_npy(&out)?;
    Ok(out)
}

/// Convert every file in `files`. With `delete`, sources that converted are removed
/// afterwards; failed ones are always kept.
pub fn convert_ovf_to_npy(files: &[PathBuf], delete: bool) -> ConversionReport {
    info!(
        "Converting {} ovf files to npy files.{}",
        files.len(),
        if delete { " Will delete files after." } else { "" }
    );

    let mut report = ConversionReport::default();
    let mut done_sources = Vec::new();
    for file in files {
        match convert_one(file) {
            Ok(out) => {
                report.converted.push(out);
                done_sources.push(file);
            }
            Err(e) => {
                warn!("Skipping {}: {}", file.display(), e);
                report.failed.push((file.clone(), e));
            }
        }
    }

    if delete {
        for file in done_sources {
            if let Err(e) = fs::remove_file(file) {
                warn!("File {} cannot be removed: {}", file.display(), e);
            }
        }
        info!("Done removing files.");
    }

    info!(
        "Converted {} of {} files.",
        report.converted.len(),
        files.len()
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid3D;
    use crate::ovf::write_ovf2_binary4;
    use crate::vector_field::VectorField3D;

    #[test]
    fn corrupt_file_is_skipped_and_the_rest_convert() {
        let dir = tempfile::tempdir().unwrap();
        let d = dir.path();

        let mut f = VectorField3D::zeros(Grid3D::cubic(2, 2, 1, 5e-9));
        f.set_vector(1, 1, 0, [0.0, 1.0, 0.0]);
        let good = d.join("m000000.ovf");
        write_ovf2_binary4(&good, &f, "m").unwrap();
        let bad = d.join("m000001.ovf");
        fs::write(&bad, "# OOMMF OVF 2.0\n# Begin: Data Binary 4\n\x01\x02").unwrap();

        let report = convert_ovf_to_npy(&[good.clone(), bad.clone()], true);
        assert_eq!(report.converted, vec![d.join("m000000.npy")]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, bad);
        assert!(!report.all_ok());

        // converted source removed, failed one kept
        assert!(!good.exists());
        assert!(bad.exists());

        let back = VectorField3D::load_npy(&d.join("m000000.npy"), 5.0).unwrap();
        assert_eq!(back.vector(1, 1, 0), [0.0, 1.0, 0.0]);
        assert_eq!(back.vector(0, 0, 0), [0.0, 0.0, 0.0]);
    }
}
