// src/discover.rs
//
// What a mumax3 output directory (`<name>.out`) contains, and therefore which
// post-processing steps can run on it.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

pub const LOG_FILE: &str = "log.txt";
pub const TABLE_FILE: &str = "table.txt";

/// An animation is only worth making from more than this many snapshots.
pub const MIN_MOVIE_FRAMES: usize = 20;

/// Sorted files in `dir` whose name starts with `prefix` and has extension `ext`
/// (the `prefix*.ext` glob).
pub fn find(dir: &Path, prefix: &str, ext: &str) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let ext_ok = path.extension().and_then(|e| e.to_str()) == Some(ext);
        if ext_ok && name.starts_with(prefix) {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

/// File counts per category for one output directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactSet {
    pub dir: PathBuf,
    pub has_log: bool,
    pub has_table: bool,
    /// `m*.jpg`
    pub snapshots: usize,
    /// `*.ovf`
    pub ovf: usize,
    /// `m*.npy` (includes `m_full*.npy`)
    pub magnetization: usize,
    /// `B_demag*.npy`
    pub stray_field: usize,
}

impl ArtifactSet {
    pub fn discover(dir: &Path) -> Result<Self> {
        Ok(Self {
            dir: dir.to_path_buf(),
            has_log: dir.join(LOG_FILE).is_file(),
            has_table: dir.join(TABLE_FILE).is_file(),
            snapshots: find(dir, "m", "jpg")?.len(),
            ovf: find(dir, "", "ovf")?.len(),
            magnetization: find(dir, "m", "npy")?.len(),
            stray_field: find(dir, "B_demag", "npy")?.len(),
        })
    }

    pub fn log_path(&self) -> PathBuf {
        self.dir.join(LOG_FILE)
    }

    pub fn table_path(&self) -> PathBuf {
        self.dir.join(TABLE_FILE)
    }

    pub fn can_read_params(&self) -> bool {
        self.has_log
    }

    /// Time-series and sweep plots.
    pub fn can_plot_table(&self) -> bool {
        self.has_table
    }

    pub fn can_animate(&self) -> bool {
        self.snapshots > MIN_MOVIE_FRAMES
    }

    /// Conversion is only offered while nothing has been converted yet.
    pub fn can_convert(&self) -> bool {
        self.ovf > 0 && self.magnetization == 0
    }

    pub fn can_plot_magnetization(&self) -> bool {
        self.magnetization > 0
    }

    /// Available, but only ever run on explicit request.
    pub fn can_plot_flux(&self) -> bool {
        self.stray_field > 0
    }

    pub fn report(&self) -> AvailabilityReport<'_> {
        AvailabilityReport(self)
    }
}

/// Human-readable list of available / unavailable actions.
pub struct AvailabilityReport<'a>(&'a ArtifactSet);

impl fmt::Display for AvailabilityReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let a = self.0;
        let state = |ok: bool| if ok { "available" } else { "unavailable" };
        let rows = [
            ("Able to read simulation parameters:", state(a.can_read_params())),
            ("convert_ovf_to_npy:", state(a.can_convert())),
            ("static_field_plot:", state(a.can_plot_table())),
            ("sweepplot:", state(a.can_plot_table())),
            ("magplot:", state(a.can_plot_magnetization())),
            ("snapshot_animation:", state(a.can_animate())),
        ];
        for (name, s) in rows {
            writeln!(f, "{:<40}{}", name, s)?;
        }
        if a.can_plot_flux() {
            write!(f, "{:<40}available, but needs to be called explicitly", "fluxplot:")
        } else {
            write!(f, "{:<40}unavailable", "fluxplot:")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"").unwrap();
    }

    #[test]
    fn counts_and_flags() {
        let dir = tempfile::tempdir().unwrap();
        let d = dir.path();
        touch(d, LOG_FILE);
        touch(d, TABLE_FILE);
        for i in 0..21 {
            touch(d, &format!("m{:06}.jpg", i));
        }
        touch(d, "m000000.ovf");
        touch(d, "B_demag000000.ovf");
        touch(d, "notes.jpg");

        let a = ArtifactSet::discover(d).unwrap();
        assert_eq!(a.snapshots, 21);
        assert_eq!(a.ovf, 2);
        assert!(a.can_read_params());
        assert!(a.can_plot_table());
        assert!(a.can_animate());
        assert!(a.can_convert());
        assert!(!a.can_plot_magnetization());
        assert!(!a.can_plot_flux());
    }

    #[test]
    fn converted_arrays_supersede_conversion() {
        let dir = tempfile::tempdir().unwrap();
        let d = dir.path();
        touch(d, "m_full000000.ovf");
        assert!(ArtifactSet::discover(d).unwrap().can_convert());

        touch(d, "m_full000000.npy");
        touch(d, "B_demag000000.npy");
        let a = ArtifactSet::discover(d).unwrap();
        assert!(!a.can_convert());
        assert!(a.can_plot_magnetization());
        assert!(a.can_plot_flux());
        assert_eq!(a.magnetization, 1);
        assert!(!a.can_animate());

        let text = a.report().to_string();
        assert!(text.contains("magplot:"));
        assert!(text.contains("needs to be called explicitly"));
    }

    #[test]
    fn find_is_sorted_and_prefix_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let d = dir.path();
        for n in ["m000002.npy", "m_full000001.npy", "m000001.npy", "B_demag000000.npy"] {
            touch(d, n);
        }
        let names: Vec<String> = find(d, "m", "npy")
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["m000001.npy", "m000002.npy", "m_full000001.npy"]);
    }
}
