// src/error.rs
//
// Error taxonomy shared by the scripting and post-processing halves.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScripterError>;

#[derive(Error, Debug)]
pub enum ScripterError {
    /// Unusable project/data directory or unresolvable parameters. Fatal for the run.
    #[error("configuration error: {0}")]
    Config(String),

    /// A post-processing step found nothing to work on.
    #[error("no {what} found in {}", dir.display())]
    MissingInput { what: String, dir: PathBuf },

    #[error("field {0:?} is not a valid vector (expected exactly 3 components)")]
    InvalidVector(Vec<f64>),

    #[error("unrecognised axis '{0}' (expected x, y or z)")]
    InvalidAxis(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("mumax3 is not supported on platform '{0}'")]
    UnsupportedPlatform(String),

    #[error("simulation {} failed ({status})", script.display())]
    Simulation {
        script: PathBuf,
        status: ExitStatus,
        stdout: String,
        stderr: String,
    },

    #[error("{program} exited with {status}")]
    Tool { program: String, status: ExitStatus },

    #[error("no free script name for '{0}' after 10000 attempts")]
    NameExhausted(String),

    #[error("cannot decode {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    #[error("malformed table {}:{line}: {reason}", path.display())]
    Table {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("npy read error: {0}")]
    NpyRead(#[from] ndarray_npy::ReadNpyError),

    #[error("npy write error: {0}")]
    NpyWrite(#[from] ndarray_npy::WriteNpyError),

    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("plotting error: {0}")]
    Plot(String),
}

impl ScripterError {
    pub fn missing<S: Into<String>>(what: S, dir: &std::path::Path) -> Self {
        Self::MissingInput {
            what: what.into(),
            dir: dir.to_path_buf(),
        }
    }

    pub fn decode<S: Into<String>>(path: &std::path::Path, reason: S) -> Self {
        Self::Decode {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

// plotters errors are generic over the backend; keep only the message.
impl<E: std::error::Error + Send + Sync> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for ScripterError
{
    fn from(err: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        Self::Plot(err.to_string())
    }
}
