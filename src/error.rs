//! Error types for the xl command line

use thiserror::Error;

/// Problems with the command line itself. Reported together with the usage text.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CliError {
    #[error("{0} requires a value")]
    MissingValue(&'static str),

    #[error("Unknown option: {0}")]
    UnknownOption(String),

    #[error("--config and --no-config cannot be combined")]
    ConflictingConfig,

    #[error("Invalid assignment {0:?}: expected [Sheet!]A1=value")]
    InvalidAssignment(String),
}
