// src/config.rs
//
// Parameter resolution: defaults + overrides -> SimulationConfig with its grid
// dimensions fixed once. The resolved set is logged and can be written as JSON
// next to the generated script.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Serialize;

use crate::error::{Result, ScripterError};
use crate::grid::cells_for;
use crate::mask::image_resolution;
use crate::params::{
    fmt_num, ExtraValue, ParamOverrides, DEFAULT_AEX, DEFAULT_ALPHA, DEFAULT_AXES_RATIO,
    DEFAULT_CELL_SIZE_NM, DEFAULT_DIAMETER_NM, DEFAULT_EXCHANGE_LENGTH_NM, DEFAULT_HEIGHT_NM,
    DEFAULT_MSAT, REFERENCE_MASK, REFERENCE_MASK_DIAMETER_NM, STRAY_FIELD_HEADROOM_NM,
};

/// Cell count above which a run is flagged as slow.
pub const LARGE_GRID_CELLS: usize = 1_000_000;

#[derive(Debug, Clone, Serialize)]
pub struct SimulationConfig {
    pub name: String,
    /// True when the name came from the user rather than from the geometry.
    pub custom_name: bool,
    pub project_dir: PathBuf,

    pub geometry: GeometryConfig,
    pub material: MaterialConfig,

    pub contacts: bool,
    /// Mask image as it will appear in the script (relative to `project_dir`).
    pub mask: Option<PathBuf>,
    pub stray_fields: bool,

    pub extra: BTreeMap<String, ExtraValue>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct GeometryConfig {
    /// Height (nm).
    pub h: f64,
    /// Long-axis diameter (nm).
    pub diameter: f64,
    pub axes_ratio: f64,
    /// Cubic cell edge (nm).
    pub cell_size: f64,
    /// Device footprint (nm) the in-plane cell counts derive from.
    pub size_x: f64,
    pub size_y: f64,
    pub nx: usize,
    pub ny: usize,
    /// Layers occupied by the device (headroom for stray fields not included).
    pub nz: usize,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct MaterialConfig {
    pub msat: f64,
    pub aex: f64,
    pub alpha: f64,
    pub exchange_length: f64,
}

impl GeometryConfig {
    pub fn n_cells(&self) -> usize {
        self.nx * self.ny * self.nz
    }

    /// Vacuum layers added above the device to record the stray field.
    pub fn headroom_layers(&self) -> usize {
        (STRAY_FIELD_HEADROOM_NM / self.cell_size).trunc() as usize
    }
}

impl SimulationConfig {
    /// Resolve `overrides` against the defaults for a project rooted at `project_dir`.
    ///
    /// The project directory must already exist; there is no fallback location.
    pub fn resolve(project_dir: &Path, overrides: ParamOverrides) -> Result<Self> {
        if !project_dir.is_dir() {
            return Err(ScripterError::Config(format!(
                "project directory {} does not exist or is not a directory",
                project_dir.display()
            )));
        }

        let h = overrides.h.unwrap_or(DEFAULT_HEIGHT_NM);
        let diameter = overrides.diameter.unwrap_or(DEFAULT_DIAMETER_NM);
        let axes_ratio = overrides.axes_ratio.unwrap_or(DEFAULT_AXES_RATIO);
        let cell_size = overrides.cell_size.unwrap_or(DEFAULT_CELL_SIZE_NM);

        for (key, v) in [
            ("h", h),
            ("D", diameter),
            ("axes_ratio", axes_ratio),
            ("cell_size", cell_size),
        ] {
            if !(v.is_finite() && v > 0.0) {
                return Err(ScripterError::Config(format!(
                    "{} must be a positive number, got {}",
                    key, v
                )));
            }
        }

        let material = MaterialConfig {
            msat: overrides.msat.unwrap_or(DEFAULT_MSAT),
            aex: overrides.aex.unwrap_or(DEFAULT_AEX),
            alpha: overrides.alpha.unwrap_or(DEFAULT_ALPHA),
            exchange_length: overrides
                .exchange_length
                .unwrap_or(DEFAULT_EXCHANGE_LENGTH_NM),
        };

        // A custom mask implies contacts.
        let contacts = overrides.custom_mask.is_some() || overrides.contacts.unwrap_or(false);
        let stray_fields = overrides.stray_fields.unwrap_or(false);

        let (mask, size_x, size_y) = if let Some(mask) = overrides.custom_mask {
            let (px, py) = read_mask_resolution(project_dir, &mask)?;
            info!("Loaded custom mask file: {}", mask.display());
            (Some(mask), px as f64, py as f64)
        } else if contacts {
            info!("No mask file given. Using default mask file.");
            let mask = PathBuf::from(REFERENCE_MASK);
            let (px, py) = read_mask_resolution(project_dir, &mask)?;
            // Scale the reference mask to the requested diameter and aspect.
            let scale = diameter / REFERENCE_MASK_DIAMETER_NM;
            (
                Some(mask),
                px as f64 * scale,
                py as f64 * scale * (2.0 / axes_ratio),
            )
        } else {
            (None, diameter, diameter / axes_ratio)
        };

        let geometry = GeometryConfig {
            h,
            diameter,
            axes_ratio,
            cell_size,
            size_x,
            size_y,
            nx: cells_for(size_x, cell_size),
            ny: cells_for(size_y, cell_size),
            nz: cells_for(h, cell_size),
        };

        if geometry.nx == 0 || geometry.ny == 0 || geometry.nz == 0 {
            return Err(ScripterError::Config(format!(
                "grid {}x{}x{} has an empty dimension; cell size {} nm is too coarse",
                geometry.nx, geometry.ny, geometry.nz, cell_size
            )));
        }

        let (name, custom_name) = match overrides.name {
            Some(n) => (n, true),
            None => (default_name(&geometry, contacts), false),
        };

        let config = Self {
            name,
            custom_name,
            project_dir: project_dir.to_path_buf(),
            geometry,
            material,
            contacts,
            mask,
            stray_fields,
            extra: overrides.extra,
        };

        config.log_summary();
        Ok(config)
    }

    fn log_summary(&self) {
        let g = &self.geometry;
        let m = &self.material;
        info!("Simulation name: {}", self.name);
        info!("Chosen parameters:");
        info!("  alpha: {}", m.alpha);
        info!("  exchange_length: {} nm", m.exchange_length);
        info!("  Msat: {:e} A/m", m.msat);
        info!("  Aex: {:e} J/m", m.aex);
        info!("  h: {} nm", g.h);
        info!("  D: {} nm", g.diameter);
        info!("  axes_ratio: {}", g.axes_ratio);
        info!("  cell_size: {} nm", g.cell_size);
        info!("  contacts: {}", self.contacts);
        info!("  stray_fields: {}", self.stray_fields);
        for (k, v) in &self.extra {
            info!("  {}: {}", k, v);
        }
        info!("  grid: {} x {} x {}", g.nx, g.ny, g.nz);

        let n = g.n_cells();
        if n > LARGE_GRID_CELLS {
            warn!(
                "The simulation contains more than a million cells ({}). This will take a while.",
                n
            );
        }
    }

    /// Write the resolved parameters as `<name>.params.json` into `out_dir`.
    pub fn write_to_dir(&self, out_dir: &Path) -> Result<PathBuf> {
        let path = out_dir.join(format!("{}.params.json", self.name));
        let file = File::create(&path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(path)
    }
}

fn read_mask_resolution(project_dir: &Path, mask: &Path) -> Result<(u32, u32)> {
    let full = project_dir.join(mask);
    image_resolution(&full).map_err(|e| {
        ScripterError::Config(format!("cannot read mask image {}: {}", full.display(), e))
    })
}

fn default_name(g: &GeometryConfig, contacts: bool) -> String {
    format!(
        "Co(h{},d{}{},ratio{})",
        fmt_num(g.h),
        fmt_num(g.diameter),
        if contacts { ",contacts" } else { "" },
        fmt_num(g.axes_ratio)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve_to_ellipse_grid() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = SimulationConfig::resolve(dir.path(), ParamOverrides::new()).unwrap();
        assert_eq!(cfg.geometry.nx, 200);
        assert_eq!(cfg.geometry.ny, 100);
        assert_eq!(cfg.geometry.nz, 10);
        assert!(!cfg.contacts);
        assert!(!cfg.custom_name);
        assert_eq!(cfg.name, "Co(h50,d1000,ratio2)");
        assert_eq!(cfg.material.msat, 1.44e6);
    }

    #[test]
    fn missing_project_dir_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("nope");
        let err = SimulationConfig::resolve(&gone, ParamOverrides::new()).unwrap_err();
        assert!(matches!(err, ScripterError::Config(_)), "got {:?}", err);
    }

    #[test]
    fn custom_mask_forces_contacts_and_sets_footprint() {
        let dir = tempfile::tempdir().unwrap();
        image::RgbImage::new(300, 150)
            .save(dir.path().join("mask.png"))
            .unwrap();

        let cfg = SimulationConfig::resolve(
            dir.path(),
            ParamOverrides::new().custom_mask("mask.png").cell_size(5.0),
        )
        .unwrap();
        assert!(cfg.contacts);
        assert_eq!(cfg.geometry.nx, 60);
        assert_eq!(cfg.geometry.ny, 30);
    }

    #[test]
    fn contacts_without_mask_scale_the_reference_mask() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("Masks")).unwrap();
        image::RgbImage::new(800, 400)
            .save(dir.path().join(REFERENCE_MASK))
            .unwrap();

        let cfg = SimulationConfig::resolve(
            dir.path(),
            ParamOverrides::new()
                .contacts(true)
                .diameter(1600.0)
                .axes_ratio(4.0),
        )
        .unwrap();
        // x: 800 px * 2, y: 400 px * 2 * (2/4)
        assert_eq!(cfg.geometry.size_x, 1600.0);
        assert_eq!(cfg.geometry.size_y, 400.0);
        assert_eq!(cfg.geometry.nx, 320);
        assert_eq!(cfg.geometry.ny, 80);
        assert!(cfg.name.contains(",contacts"));
    }

    #[test]
    fn resolved_config_is_written_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let cfg =
            SimulationConfig::resolve(dir.path(), ParamOverrides::new().name("run1")).unwrap();
        let path = cfg.write_to_dir(dir.path()).unwrap();
        let raw = std::fs::read_to_string(path).unwrap();
        let v: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(v["name"], "run1");
        assert_eq!(v["geometry"]["nx"], 200);
    }
}
