// src/bin/sequence_template.rs
//
// Template for a batch of simulations: build two scripts in code, run them one
// after another, then analyse each output directory.
//
//   cargo run --release --bin sequence_template -- [project_dir] [--dry-run]
//
// With --dry-run the scripts are only written. The project directory defaults
// to `Examples/` and is created if needed. Put a mask image named
// `d1500ratio2_DecoupledContactsV2.png` in it to use the mask for the sweep.

use std::fs::create_dir_all;
use std::path::{Path, PathBuf};

use log::{error, info, warn};

use mumax_scripter::analysis::{Analysis, BatchOptions};
use mumax_scripter::config::SimulationConfig;
use mumax_scripter::logging::init_logging;
use mumax_scripter::params::ParamOverrides;
use mumax_scripter::runner::{write_script, Simulator};
use mumax_scripter::script::{Axis, FieldSweep, ScriptBuilder, StaticField};
use mumax_scripter::visualisation::stray_field::FluxRequest;
use mumax_scripter::Result;

const CUSTOM_MASK: &str = "d1500ratio2_DecoupledContactsV2.png";

fn animation_example(project: &Path) -> Result<ScriptBuilder> {
    let params = ParamOverrides::new()
        .name("Animation Example")
        .height(50.0)
        .diameter(800.0)
        .axes_ratio(2.0)
        .cell_size(5.0)
        .contacts(false)
        .stray_fields(false);
    let mut b = ScriptBuilder::new(&SimulationConfig::resolve(project, params)?);
    b.apply_static_field(&StaticField::new([1000.0, 0.0, 0.0]).runtime(0.25))?;
    b.apply_static_field(&StaticField::new([0.0, 100.0, 0.0]).runtime(5.0))?;
    b.apply_static_field(&StaticField::new([100.0, 0.0, 0.0]).runtime(5.0))?;
    Ok(b)
}

fn sweep_example(project: &Path) -> Result<ScriptBuilder> {
    let mut params = ParamOverrides::new()
        .name("Two-state switch")
        .height(50.0)
        .diameter(800.0)
        .axes_ratio(2.0)
        .cell_size(5.0)
        .stray_fields(true);
    if project.join(CUSTOM_MASK).is_file() {
        params = params.custom_mask(CUSTOM_MASK);
    } else {
        warn!("{} not found in {}; using the ellipse.", CUSTOM_MASK, project.display());
    }
    let mut b = ScriptBuilder::new(&SimulationConfig::resolve(project, params)?);
    b.apply_field_sweep(
        &FieldSweep::new(Axis::Y)
            .start_magnetization(Axis::X.into())
            .range(0.0, 100.0, 10.0),
    )?;
    b.apply_field_sweep(&FieldSweep::new(Axis::X).range(0.0, 100.0, 10.0))?;
    Ok(b)
}

fn run(project: &Path, dry_run: bool) -> Result<()> {
    let simulator = Simulator::default();
    let mut outputs = Vec::new();
    for builder in [animation_example(project)?, sweep_example(project)?] {
        let cfg = builder.config();
        let file = write_script(project, &cfg.name, &builder.text(), false)?;
        cfg.write_to_dir(project)?;
        if dry_run {
            continue;
        }
        simulator.run(&file.path)?;
        outputs.push(file.output_dir());
    }

    for dir in &outputs {
        let mut analysis = Analysis::open(dir)?;
        let report = analysis.run_all(&BatchOptions::default());
        info!(
            "{}: {} steps done, {} failed",
            dir.display(),
            report.completed.len(),
            report.failed.len()
        );
    }

    // Stray field of two states of the sweep, when the mask is in place.
    if let Some(sweep_dir) = outputs.last() {
        let mask = project.join(CUSTOM_MASK);
        if mask.is_file() {
            let req = FluxRequest {
                states: vec![
                    ("Zero Vortex".into(), sweep_dir.join("B_demag000000.npy")),
                    ("Two Vortex".into(), sweep_dir.join("B_demag000025.npy")),
                ],
                device_start_x: 100,
                trench_location: Some(220.0),
                mask_image: Some(mask),
                ..FluxRequest::default()
            };
            Analysis::open(sweep_dir)?.flux(req)?;
        }
    }
    Ok(())
}

fn main() {
    init_logging(None);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let dry_run = args.iter().any(|a| a == "--dry-run");
    let project = args
        .iter()
        .find(|a| !a.starts_with("--"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("Examples"));

    if let Err(e) = create_dir_all(&project) {
        error!("Cannot create {}: {}", project.display(), e);
        std::process::exit(1);
    }
    if let Err(e) = run(&project, dry_run) {
        error!("{}", e);
        std::process::exit(1);
    }
}
