// src/lib.rs

pub mod analysis;
pub mod config;
pub mod convert;
pub mod discover;
pub mod error;
pub mod grid;
pub mod job;
pub mod log_params;
pub mod logging;
pub mod mask;
pub mod movie;
pub mod ovf;
pub mod params;
pub mod runner;
pub mod script;
pub mod segment;
pub mod table;
pub mod vec3;
pub mod vector_field;
pub mod visualisation;

pub use error::{Result, ScripterError};
