//! Evaluate command implementation
//!
//! Builds the forecast table for a request and runs the DCF valuation.

use std::path::Path;
use tracing::info;
use valuation_engine::EvaluateRequest;

use super::{read_request, to_json};
use crate::config::{CliConfig, OutputFormat};
use crate::{render, Result};

/// Evaluates the request and returns the formatted output.
pub fn execute(request_path: &Path, config: &CliConfig) -> Result<String> {
    let request: EvaluateRequest = read_request(request_path)?;
    info!(symbol = %request.symbol, rows = request.historical_line_items.len(), "Starting evaluation");

    let response = config.engine()?.evaluate(&request)?;
    match config.output_format {
        OutputFormat::Json => to_json(&response),
        OutputFormat::Table => Ok(render::evaluation(&response)),
    }
}

/// Run the evaluate command
pub fn run(request_path: &Path, config: &CliConfig) -> Result<()> {
    println!("{}", execute(request_path, config)?);
    info!("Evaluation complete");
    Ok(())
}
