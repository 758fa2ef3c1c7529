//! Structured CLI errors with meaningful exit codes.
//!
//! Exit code scheme:
//! - 0:  success
//! - 2:  clap arg parse error (automatic, before our code runs)
//! - 10: field error (invalid config, unknown palette, bad colors)
//! - 11: I/O error (event script read, PNG write)
//! - 12: input error (bad JSON params, bad event script, bad dimensions)
//! - 13: serialization error

use starfield_core::FieldError;
use starfield_raster::RasterError;
use std::fmt;

/// Errors produced by CLI operations, each mapped to a distinct exit code.
#[derive(Debug)]
pub enum CliError {
    /// The field refused its configuration.
    Field(FieldError),
    /// Reading or writing a file failed.
    Io(String),
    /// A user input error (bad JSON params, bad event script).
    Input(String),
    /// A serialization error (JSON output failure).
    Serialization(String),
}

impl CliError {
    /// Returns the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Field(_) => 10,
            CliError::Io(_) => 11,
            CliError::Input(_) => 12,
            CliError::Serialization(_) => 13,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Field(e) => write!(f, "{e}"),
            CliError::Io(msg) => write!(f, "{msg}"),
            CliError::Input(msg) => write!(f, "{msg}"),
            CliError::Serialization(msg) => write!(f, "{msg}"),
        }
    }
}

impl From<FieldError> for CliError {
    fn from(e: FieldError) -> Self {
        CliError::Field(e)
    }
}

impl From<RasterError> for CliError {
    fn from(e: RasterError) -> Self {
        match e {
            RasterError::Io(msg) => CliError::Io(msg),
            dims @ RasterError::InvalidDimensions { .. } => CliError::Input(dims.to_string()),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Serialization(e.to_string())
    }
}
