// src/analysis.rs
//
// Post-processing of one mumax3 output directory. `run_all` attempts every step
// the directory supports, each on its own: a failing step is logged and the
// others still run. The stray-field plot is never part of the batch.

use std::fmt;
use std::path::{Path, PathBuf};

use log::{error, info, warn};

use crate::convert::{convert_ovf_to_npy, ConversionReport};
use crate::discover::{find, ArtifactSet};
use crate::error::{Result, ScripterError};
use crate::log_params::{read_log_params, LogParams};
use crate::movie::{make_movie, MovieOptions, MovieReport};
use crate::table::Table;
use crate::visualisation::magnetization::{magplot_all, MagPlotOptions};
use crate::visualisation::stray_field::{flux_plot, FluxRequest};
use crate::visualisation::sweep::sweep_plot;
use crate::visualisation::time_series::static_field_plot;

const DEFAULT_CELL_SIZE_NM: f64 = 5.0;

#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    pub movie: MovieOptions,
    /// Remove `.ovf` files once converted.
    pub delete_ovf: bool,
    /// z slice for the magnetization plots; defaults to the middle of the device.
    pub zslice: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    StaticFieldPlot,
    SweepPlot,
    Movie,
    ConvertOvf,
    MagPlot,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Step::StaticFieldPlot => "static_field_plot",
            Step::SweepPlot => "sweepplot",
            Step::Movie => "snapshot_animation",
            Step::ConvertOvf => "convert_ovf_to_npy",
            Step::MagPlot => "magplot",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub completed: Vec<Step>,
    pub failed: Vec<(Step, ScripterError)>,
}

impl BatchReport {
    fn record<T>(&mut self, step: Step, result: Result<T>) -> Option<T> {
        match result {
            Ok(v) => {
                self.completed.push(step);
                Some(v)
            }
            Err(e) => {
                error!("{} failed: {}", step, e);
                self.failed.push((step, e));
                None
            }
        }
    }

    pub fn attempted(&self) -> usize {
        self.completed.len() + self.failed.len()
    }
}

#[derive(Debug)]
pub struct Analysis {
    dir: PathBuf,
    artifacts: ArtifactSet,
    params: Option<LogParams>,
}

impl Analysis {
    /// Open an output directory. It must exist; there is no fallback location.
    pub fn open(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(ScripterError::Config(format!(
                "data directory {} does not exist or is not a directory",
                dir.display()
            )));
        }
        info!("Analysing {}", dir.display());

        let artifacts = ArtifactSet::discover(dir)?;
        let params = if artifacts.can_read_params() {
            match read_log_params(&artifacts.log_path()) {
                Ok(p) => Some(p),
                Err(e) => {
                    warn!("Cannot read parameters from log file: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let analysis = Self {
            dir: dir.to_path_buf(),
            artifacts,
            params,
        };
        info!("\n{}", analysis.artifacts.report());
        Ok(analysis)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn artifacts(&self) -> &ArtifactSet {
        &self.artifacts
    }

    pub fn params(&self) -> Option<&LogParams> {
        self.params.as_ref()
    }

    /// Re-scan the directory, e.g. after conversion wrote new files.
    pub fn refresh(&mut self) -> Result<()> {
        self.artifacts = ArtifactSet::discover(&self.dir)?;
        Ok(())
    }

    pub fn cell_size(&self) -> f64 {
        self.params
            .as_ref()
            .and_then(|p| p.cell_size)
            .unwrap_or(DEFAULT_CELL_SIZE_NM)
    }

    /// Mask image named by the script's `ImageShape`, resolved against the
    /// project directory (the parent of `<name>.out`).
    pub fn mask_image(&self) -> Option<PathBuf> {
        let rel = self.params.as_ref()?.mask_image()?;
        let project = self.dir.parent().unwrap_or(self.dir.as_path());
        let full = project.join(rel);
        if full.is_file() {
            Some(full)
        } else {
            warn!(
                "Mask image {} not found; using the magnetization as mask.",
                full.display()
            );
            None
        }
    }

    fn table(&self) -> Result<Table> {
        if !self.artifacts.can_plot_table() {
            return Err(ScripterError::missing("table.txt", &self.dir));
        }
        Table::load(&self.artifacts.table_path())
    }

    pub fn static_field_plot(&self) -> Result<PathBuf> {
        static_field_plot(&self.table()?, &self.dir)
    }

    pub fn sweep_plot(&self) -> Result<PathBuf> {
        sweep_plot(&self.table()?, &self.dir)
    }

    pub fn make_movie(&self, opts: &MovieOptions) -> Result<MovieReport> {
        info!("Finding images for movie.");
        let images = find(&self.dir, "m", "jpg")?;
        if images.is_empty() {
            return Err(ScripterError::missing("m*.jpg snapshots", &self.dir));
        }
        info!("{} images found. Starting movie creation.", images.len());
        make_movie(&images, &self.dir, opts)
    }

    pub fn convert_ovf(&mut self, delete: bool) -> Result<ConversionReport> {
        info!("Finding .ovf files to convert.");
        let files = find(&self.dir, "", "ovf")?;
        if files.is_empty() {
            return Err(ScripterError::missing(".ovf files", &self.dir));
        }
        info!("{} .ovf files found.", files.len());
        let report = convert_ovf_to_npy(&files, delete);
        self.refresh()?;
        Ok(report)
    }

    /// Magnetization files to plot: `m_full*.npy`, or `m*.npy` when there are none.
    pub fn magnetization_files(&self) -> Result<Vec<PathBuf>> {
        let full = find(&self.dir, "m_full", "npy")?;
        if !full.is_empty() {
            return Ok(full);
        }
        find(&self.dir, "m", "npy")
    }

    pub fn magplot(&self, zslice: Option<usize>) -> Result<Vec<PathBuf>> {
        info!("Plotting magnetic spins for all files in folder.");
        let files = self.magnetization_files()?;
        if files.is_empty() {
            return Err(ScripterError::missing("m*.npy files", &self.dir));
        }

        // Row i of the table labels file i.
        let fields_mt: Option<Vec<[f64; 3]>> = match self.table() {
            Ok(t) => Some(
                t.field()
                    .iter()
                    .map(|b| [(b[0] * 1e3).round(), (b[1] * 1e3).round(), (b[2] * 1e3).round()])
                    .collect(),
            ),
            Err(_) => None,
        };

        let opts = MagPlotOptions {
            zslice: zslice
                .or_else(|| self.params.as_ref().and_then(LogParams::mid_slice))
                .unwrap_or(0),
            cell_size: self.cell_size(),
            field_mt: None,
            mask_image: self.mask_image(),
        };
        magplot_all(&files, &opts, fields_mt.as_deref())
    }

    /// Reference magnetization for the stray-field plot: the second `m_full`
    /// file when there is one (the first is usually the random start), else the
    /// first; plain `m*.npy` only when no `m_full` exists.
    pub fn flux_reference(&self) -> Result<PathBuf> {
        let full = find(&self.dir, "m_full", "npy")?;
        if let Some(p) = full.get(1).or_else(|| full.first()) {
            return Ok(p.clone());
        }
        find(&self.dir, "m", "npy")?
            .into_iter()
            .next()
            .ok_or_else(|| ScripterError::missing("m*.npy reference magnetization", &self.dir))
    }

    /// Stray-field line plot. With no states given, every `B_demag*.npy` becomes
    /// a curve labelled by its file stem. The cell size read from the log wins
    /// over the request's.
    pub fn flux(&self, mut req: FluxRequest) -> Result<PathBuf> {
        if req.states.is_empty() {
            req.states = find(&self.dir, "B_demag", "npy")?
                .into_iter()
                .map(|p| {
                    let label = p
                        .file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    (label, p)
                })
                .collect();
        }
        if req.states.is_empty() {
            return Err(ScripterError::missing("B_demag*.npy files", &self.dir));
        }
        if let Some(c) = self.params.as_ref().and_then(|p| p.cell_size) {
            req.cell_size = c;
        }
        if req.mask_image.is_none() {
            req.mask_image = self.mask_image();
        }
        let reference = self.flux_reference()?;
        flux_plot(&reference, &req, &self.dir)
    }

    /// Every applicable step, in order: table plots, animation, conversion, then
    /// magnetization plots on whatever the conversion produced.
    pub fn run_all(&mut self, opts: &BatchOptions) -> BatchReport {
        let mut report = BatchReport::default();

        if self.artifacts.can_plot_table() {
            report.record(Step::StaticFieldPlot, self.static_field_plot());
            report.record(Step::SweepPlot, self.sweep_plot());
        }
        if self.artifacts.can_animate() {
            report.record(Step::Movie, self.make_movie(&opts.movie));
        }
        if self.artifacts.can_convert() {
            let converted = self.convert_ovf(opts.delete_ovf);
            if let Some(conv) = report.record(Step::ConvertOvf, converted) {
                for (file, e) in &conv.failed {
                    warn!("Not converted: {} ({})", file.display(), e);
                }
            }
            if let Err(e) = self.refresh() {
                warn!("Cannot re-scan {}: {}", self.dir.display(), e);
            }
        }
        if self.artifacts.can_plot_magnetization() {
            report.record(Step::MagPlot, self.magplot(opts.zslice));
        }

        if self.artifacts.can_plot_flux() {
            info!("fluxplot is available, but needs to be called explicitly.");
        }
        info!(
            "Analysis finished: {} of {} steps succeeded.",
            report.completed.len(),
            report.attempted()
        );
        report
    }
}
