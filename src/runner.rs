// src/runner.rs
//
// Writing scripts to disk and running them through mumax3.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use log::{info, warn};

use crate::error::{Result, ScripterError};

pub const SCRIPT_EXTENSION: &str = "mx3";

/// Highest numeric suffix tried before giving up on a free script name.
pub const MAX_NAME_SUFFIX: u32 = 10_000;

/// Runs shorter than this usually mean mumax3 stopped on a script error.
pub const SUSPICIOUSLY_SHORT_RUN: Duration = Duration::from_secs(30);

/// A script written to disk. `name` may carry a collision suffix (`name2`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptFile {
    pub name: String,
    pub path: PathBuf,
}

impl ScriptFile {
    /// Directory mumax3 writes its output to: `<name>.out` next to the script.
    pub fn output_dir(&self) -> PathBuf {
        self.path.with_extension("out")
    }
}

fn script_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.{}", name, SCRIPT_EXTENSION))
}

/// Write `text` to `<dir>/<name>.mx3`.
///
/// Without `overwrite`, an existing file is never replaced: the lowest free
/// suffix starting at 2 is appended to the name instead.
pub fn write_script(dir: &Path, name: &str, text: &str, overwrite: bool) -> Result<ScriptFile> {
    let mut final_name = name.to_string();
    let mut path = script_path(dir, name);

    if !overwrite && path.exists() {
        let mut suffix = 2u32;
        loop {
            if suffix > MAX_NAME_SUFFIX {
                return Err(ScripterError::NameExhausted(name.to_string()));
            }
            let candidate = format!("{}{}", name, suffix);
            let candidate_path = script_path(dir, &candidate);
            if !candidate_path.exists() {
                final_name = candidate;
                path = candidate_path;
                break;
            }
            suffix += 1;
        }
    }

    fs::write(&path, text)?;
    info!("File '{}' generated.", path.display());
    Ok(ScriptFile {
        name: final_name,
        path,
    })
}

/// Captured result of a finished simulation.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub elapsed: Duration,
    pub stdout: String,
    pub stderr: String,
}

/// How to invoke the simulator.
#[derive(Debug, Clone)]
pub struct Simulator {
    pub executable: PathBuf,
    /// Values of `std::env::consts::OS` mumax3 is known to run on.
    pub supported_os: Vec<String>,
}

impl Default for Simulator {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("mumax3"),
            supported_os: vec!["windows".into(), "linux".into()],
        }
    }
}

impl Simulator {
    pub fn with_executable<P: Into<PathBuf>>(mut self, exe: P) -> Self {
        self.executable = exe.into();
        self
    }

    pub fn with_supported_os<I, S>(mut self, os: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supported_os = os.into_iter().map(Into::into).collect();
        self
    }

    /// Run `script` to completion. Blocks until the simulator exits.
    ///
    /// Failure is judged from the exit status and from error lines on stderr.
    /// A very short run only produces a warning with the captured output.
    pub fn run(&self, script: &Path) -> Result<RunReport> {
        let os = std::env::consts::OS;
        if !self.supported_os.iter().any(|s| s == os) {
            warn!("Refusing to start mumax3 on unsupported platform '{}'.", os);
            return Err(ScripterError::UnsupportedPlatform(os.to_string()));
        }

        info!("Starting mumax3 simulation of {}.", script.display());

        let mut cmd = Command::new(&self.executable);
        match (script.parent(), script.file_name()) {
            (Some(parent), Some(file)) if !parent.as_os_str().is_empty() => {
                cmd.current_dir(parent).arg(file);
            }
            _ => {
                cmd.arg(script);
            }
        }

        let start = Instant::now();
        let output = cmd.output()?;
        let elapsed = start.elapsed();

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() || stderr_reports_error(&stderr) {
            warn!("Simulation failed ({}). Here is the simulation output.", output.status);
            warn!("Non-error output:\n{}", stdout);
            warn!("Error output:\n{}", stderr);
            return Err(ScripterError::Simulation {
                script: script.to_path_buf(),
                status: output.status,
                stdout,
                stderr,
            });
        }

        if elapsed < SUSPICIOUSLY_SHORT_RUN {
            warn!(
                "Simulation took less than {} seconds. Something may have gone wrong.",
                SUSPICIOUSLY_SHORT_RUN.as_secs()
            );
            warn!("Non-error output:\n{}", stdout);
            warn!("Error output:\n{}", stderr);
        }

        info!("Simulation ran successfully.");
        info!("The simulation took {}.", format_elapsed(elapsed));
        Ok(RunReport {
            elapsed,
            stdout,
            stderr,
        })
    }
}

/// mumax3 logs to stderr; only lines that start with an error marker count.
fn stderr_reports_error(stderr: &str) -> bool {
    stderr.lines().any(|line| {
        let l = line.trim_start().to_ascii_lowercase();
        l.starts_with("error") || l.starts_with("panic")
    })
}

/// "H hours, M minutes, and S seconds".
pub fn format_elapsed(d: Duration) -> String {
    let secs = d.as_secs();
    format!(
        "{} hours, {} minutes, and {} seconds",
        secs / 3600,
        secs % 3600 / 60,
        secs % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collisions_get_the_lowest_free_suffix() {
        let dir = tempfile::tempdir().unwrap();
        for existing in ["name.mx3", "name2.mx3", "name3.mx3"] {
            fs::write(dir.path().join(existing), "").unwrap();
        }
        let f = write_script(dir.path(), "name", "B := 0.0\n", false).unwrap();
        assert_eq!(f.name, "name4");
        assert_eq!(f.path, dir.path().join("name4.mx3"));
        assert_eq!(fs::read_to_string(&f.path).unwrap(), "B := 0.0\n");
        assert_eq!(f.output_dir(), dir.path().join("name4.out"));
    }

    #[test]
    fn overwrite_replaces_in_place() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("name.mx3"), "old").unwrap();
        let f = write_script(dir.path(), "name", "new", true).unwrap();
        assert_eq!(f.name, "name");
        assert_eq!(fs::read_to_string(&f.path).unwrap(), "new");
    }

    #[test]
    fn elapsed_time_is_split_into_units() {
        assert_eq!(
            format_elapsed(Duration::from_secs(3 * 3600 + 25 * 60 + 7)),
            "3 hours, 25 minutes, and 7 seconds"
        );
    }

    #[test]
    fn stderr_error_lines_are_detected() {
        assert!(stderr_reports_error("//starting\nerror: line 3: undefined: Foo\n"));
        assert!(!stderr_reports_error("//output directory: x.out/\n//MaxErr: 1e-5\n"));
    }

    #[test]
    fn unsupported_platform_fails_without_spawning() {
        let sim = Simulator::default()
            .with_executable("/definitely/not/here/mumax3")
            .with_supported_os(["plan9"]);
        let err = sim.run(Path::new("whatever.mx3")).unwrap_err();
        assert!(matches!(err, ScripterError::UnsupportedPlatform(_)), "got {:?}", err);
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_a_simulation_error() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("a.mx3");
        fs::write(&script, "").unwrap();
        let sim = Simulator::default()
            .with_executable("false")
            .with_supported_os([std::env::consts::OS]);
        match sim.run(&script) {
            Err(ScripterError::Simulation { status, .. }) => assert!(!status.success()),
            other => panic!("expected a simulation error, got {:?}", other),
        }
    }
}
