// src/main.rs
//
// Command-line front end.
//
//   mumax-scripter script jobs/switch.toml      -> <project>/<name>.mx3 + <name>.params.json
//   mumax-scripter run jobs/switch.toml         -> same, then runs mumax3 on it
//   mumax-scripter status  Examples/run.out     -> which analyses the output supports
//   mumax-scripter analyze Examples/run.out     -> every applicable plot / movie / conversion
//   mumax-scripter flux Examples/run.out --state "up=B_demag000001.npy" --trench-location 400

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use log::{error, info};

use mumax_scripter::analysis::{Analysis, BatchOptions};
use mumax_scripter::error::{Result, ScripterError};
use mumax_scripter::job::Job;
use mumax_scripter::logging::init_logging;
use mumax_scripter::movie::MovieOptions;
use mumax_scripter::runner::Simulator;
use mumax_scripter::visualisation::stray_field::FluxRequest;

#[derive(Parser)]
#[command(name = "mumax-scripter", version, about = "Generate, run and analyse mumax3 simulations")]
struct Cli {
    /// Log level (trace, debug, info, warn, error); overrides RUST_LOG.
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write the .mx3 script described by a TOML job file.
    Script {
        job: PathBuf,
        /// Print the script to stdout as well.
        #[arg(long)]
        print: bool,
    },
    /// Write the script and run mumax3 on it.
    Run {
        job: PathBuf,
        #[arg(long, default_value = "mumax3")]
        mumax: PathBuf,
    },
    /// Report which analyses an output directory supports.
    Status { dir: PathBuf },
    /// Run every applicable analysis on an output directory.
    Analyze(AnalyzeArgs),
    /// Plot the stray field above the device.
    Flux(FluxArgs),
}

#[derive(Args)]
struct AnalyzeArgs {
    dir: PathBuf,
    #[arg(long, default_value_t = 10)]
    fps: u32,
    /// Delete the jpg snapshots once the movie is made.
    #[arg(long)]
    delete_frames: bool,
    /// Delete .ovf files once converted.
    #[arg(long)]
    delete_ovf: bool,
    /// z slice for magnetization plots (default: middle of the device).
    #[arg(long)]
    zslice: Option<usize>,
    #[arg(long, default_value = "ffmpeg")]
    ffmpeg: PathBuf,
}

#[derive(Args)]
struct FluxArgs {
    dir: PathBuf,
    /// `label=file.npy`, repeatable; default is every B_demag*.npy in the directory.
    #[arg(long = "state", value_parser = parse_state)]
    states: Vec<(String, PathBuf)>,
    /// Device height in cells.
    #[arg(long)]
    device_height: Option<usize>,
    #[arg(long, default_value_t = 0)]
    device_start_x: usize,
    /// nm
    #[arg(long, default_value_t = 15.0)]
    trench_width: f64,
    /// nm
    #[arg(long, default_value_t = 150.0)]
    penetration_depth: f64,
    #[arg(long)]
    mask: Option<PathBuf>,
    /// nm
    #[arg(long)]
    trench_location: Option<f64>,
}

fn parse_state(raw: &str) -> std::result::Result<(String, PathBuf), String> {
    raw.split_once('=')
        .map(|(label, file)| (label.trim().to_string(), PathBuf::from(file.trim())))
        .ok_or_else(|| format!("expected label=file, got '{}'", raw))
}

fn execute(command: Command) -> Result<()> {
    match command {
        Command::Script { job, print } => {
            let job = Job::load(&job)?;
            if print {
                println!("{}", job.build()?.text());
            }
            job.write()?;
        }
        Command::Run { job, mumax } => {
            let file = Job::load(&job)?.write()?;
            Simulator::default().with_executable(mumax).run(&file.path)?;
            info!("Output in {}", file.output_dir().display());
        }
        Command::Status { dir } => {
            let analysis = Analysis::open(&dir)?;
            println!("{}", analysis.artifacts().report());
        }
        Command::Analyze(args) => {
            let mut analysis = Analysis::open(&args.dir)?;
            let opts = BatchOptions {
                movie: MovieOptions {
                    fps: args.fps,
                    delete_frames: args.delete_frames,
                    ffmpeg: args.ffmpeg,
                },
                delete_ovf: args.delete_ovf,
                zslice: args.zslice,
            };
            let report = analysis.run_all(&opts);
            if !report.failed.is_empty() {
                return Err(ScripterError::Config(format!(
                    "{} of {} analysis steps failed",
                    report.failed.len(),
                    report.attempted()
                )));
            }
        }
        Command::Flux(args) => {
            let analysis = Analysis::open(&args.dir)?;
            let states = args
                .states
                .into_iter()
                .map(|(label, file)| {
                    let file = if file.is_relative() { args.dir.join(file) } else { file };
                    (label, file)
                })
                .collect();
            let req = FluxRequest {
                states,
                device_height: args.device_height,
                device_start_x: args.device_start_x,
                trench_width: args.trench_width,
                penetration_depth: args.penetration_depth,
                mask_image: args.mask,
                trench_location: args.trench_location,
                ..FluxRequest::default()
            };
            analysis.flux(req)?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    match execute(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
