//! CLI error types.

use thiserror::Error;
use valuation_engine::EngineError;

use crate::config::ConfigError;

/// Errors surfaced by the `valuation` binary.
#[derive(Debug, Error)]
pub enum CliError {
    /// Input file does not exist
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Configuration could not be loaded or validated
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Valuation, scenario or ingest failure
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Request or response (de)serialisation failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;
