//! Error types for the inbox engine.
//!
//! Uses `thiserror` for ergonomic error definitions. Access denials are not
//! errors; they are reported as `Decision` values by the arbiter.

use crate::types::Position;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by a container capability implemented by the host.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    #[error("{capability} capability unavailable at {pos}")]
    Unavailable {
        pos: Position,
        capability: &'static str,
    },

    #[error("host rejected {operation} at {pos}: {reason}")]
    Rejected {
        pos: Position,
        operation: &'static str,
        reason: String,
    },

    #[error("container state at {0} is poisoned")]
    Poisoned(Position),
}

/// Errors for distribution start/cancel operations.
#[derive(Error, Debug)]
pub enum DistributionError {
    #[error("a scan is already active for source {0}")]
    AlreadyScanning(Position),

    #[error(transparent)]
    Capability(#[from] CapabilityError),
}

/// Errors for the settings layer.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine configuration directory")]
    DirectoryNotFound,

    #[error("failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("failed to write {path}: {reason}")]
    WriteFailed { path: PathBuf, reason: String },

    #[error("invalid settings format: {0}")]
    InvalidFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors surfaced by the reference host commands.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Distribution(#[from] DistributionError),

    #[error("failed to load scenario {path}: {reason}")]
    Scenario { path: PathBuf, reason: String },

    #[error("scenario event {index} is invalid: {reason}")]
    InvalidEvent { index: usize, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for capability calls.
pub type CapabilityResult<T> = Result<T, CapabilityError>;

/// Result type alias for distribution operations.
pub type DistributionResult<T> = Result<T, DistributionError>;

/// Result type alias for settings operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type alias for reference host commands.
pub type CliResult<T> = Result<T, CliError>;
