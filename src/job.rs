// src/job.rs
//
// TOML job files: one simulation = parameters + an ordered list of field operations.
//
//   project_dir = "Examples"
//   overwrite = false
//
//   [params]
//   name = "Two-state switch"
//   D = 800
//   custom_mask = "d1500ratio2_DecoupledContactsV2.png"
//   stray_fields = true
//
//   [[operation]]
//   type = "sweep"
//   axis = "y"
//   start_mag = "x"
//   start = 0
//   end = 100
//   step = 10
//
// Axis tokens and vector lengths are checked when the operation is built, so a bad
// job reports a typed error rather than a generic parse failure.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::SimulationConfig;
use crate::error::Result;
use crate::params::ParamOverrides;
use crate::runner::{write_script, ScriptFile};
use crate::script::{FieldOperation, FieldSweep, RunMode, ScriptBuilder, StaticField};

#[derive(Debug, Clone, Deserialize)]
pub struct Job {
    pub project_dir: PathBuf,
    #[serde(default)]
    pub overwrite: bool,
    #[serde(default)]
    pub params: ParamOverrides,
    #[serde(default, rename = "operation")]
    pub operations: Vec<OperationSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperationSpec {
    Static {
        field: Vec<f64>,
        #[serde(default)]
        relax: bool,
        #[serde(default = "default_runtime")]
        runtime: f64,
        autosave: Option<f64>,
        #[serde(default = "yes")]
        remove_afterwards: bool,
        #[serde(default = "yes")]
        snapshots: bool,
    },
    Sweep {
        axis: String,
        start_mag: Option<String>,
        #[serde(default)]
        start: f64,
        #[serde(default = "default_sweep_end")]
        end: f64,
        #[serde(default = "default_sweep_step")]
        step: f64,
        #[serde(default = "yes")]
        snapshots: bool,
        #[serde(default = "yes")]
        sweep_back: bool,
        #[serde(default)]
        relax_zero: bool,
    },
}

fn default_runtime() -> f64 {
    2.0
}

fn default_sweep_end() -> f64 {
    50.0
}

fn default_sweep_step() -> f64 {
    5.0
}

fn yes() -> bool {
    true
}

impl OperationSpec {
    pub fn to_operation(&self) -> Result<FieldOperation> {
        match self {
            OperationSpec::Static {
                field,
                relax,
                runtime,
                autosave,
                remove_afterwards,
                snapshots,
            } => {
                let (mode, autosave_ns) = if *relax {
                    (RunMode::Relax, *autosave)
                } else {
                    (
                        RunMode::Run {
                            duration_ns: *runtime,
                        },
                        Some(autosave.unwrap_or(0.05)),
                    )
                };
                Ok(FieldOperation::Static(StaticField {
                    field: field.clone(),
                    mode,
                    remove_afterwards: *remove_afterwards,
                    snapshots: *snapshots,
                    autosave_ns,
                }))
            }
            OperationSpec::Sweep {
                axis,
                start_mag,
                start,
                end,
                step,
                snapshots,
                sweep_back,
                relax_zero,
            } => {
                let start_magnetization = match start_mag {
                    Some(s) => Some(s.parse()?),
                    None => None,
                };
                Ok(FieldOperation::Sweep(FieldSweep {
                    axis: axis.parse()?,
                    start_magnetization,
                    start: *start,
                    end: *end,
                    step: *step,
                    snapshots: *snapshots,
                    sweep_back: *sweep_back,
                    relax_zero: *relax_zero,
                }))
            }
        }
    }
}

impl Job {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let mut job = Self::from_toml_str(&raw)?;
        // Relative project directories are taken relative to the job file.
        if job.project_dir.is_relative() {
            if let Some(parent) = path.parent() {
                job.project_dir = parent.join(&job.project_dir);
            }
        }
        Ok(job)
    }

    /// Resolve the parameters and append every operation, in order.
    pub fn build(&self) -> Result<ScriptBuilder> {
        let config = SimulationConfig::resolve(&self.project_dir, self.params.clone())?;
        let mut builder = ScriptBuilder::new(&config);
        for spec in &self.operations {
            builder.apply(&spec.to_operation()?)?;
        }
        Ok(builder)
    }

    /// Build the script and write it into the project directory, next to a
    /// `<name>.params.json` holding the resolved parameters.
    pub fn write(&self) -> Result<ScriptFile> {
        let builder = self.build()?;
        let mut config = builder.config().clone();
        let file = write_script(&config.project_dir, &config.name, &builder.text(), self.overwrite)?;
        config.name = file.name.clone();
        config.write_to_dir(&config.project_dir)?;
        Ok(file)
    }
}
