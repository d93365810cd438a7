//! CLI command implementations
//!
//! Each submodule implements a specific CLI command. Request loading and
//! output are shared here.

pub mod check;
pub mod evaluate;
pub mod scenario;
pub mod sensitivity;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use tracing::info;

use crate::{CliError, Result};

/// Reads and parses a JSON request file.
pub(crate) fn read_request<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(CliError::FileNotFound(path.display().to_string()));
    }
    let content = std::fs::read_to_string(path)?;
    let request = serde_json::from_str(&content)?;
    info!(path = %path.display(), "Loaded request");
    Ok(request)
}

/// Pretty-prints a response as JSON.
pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
