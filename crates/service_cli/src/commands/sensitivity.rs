//! Sensitivity command implementation
//!
//! Re-values the request's base case across two axes of deltas.

use std::path::Path;
use tracing::{info, warn};
use valuation_engine::SensitivityRequest;

use super::{read_request, to_json};
use crate::config::{CliConfig, OutputFormat};
use crate::{render, Result};

/// Computes the grid and returns the formatted output.
pub fn execute(request_path: &Path, config: &CliConfig) -> Result<String> {
    let request: SensitivityRequest = read_request(request_path)?;
    info!(
        symbol = %request.symbol,
        x = %request.axis_x.variable,
        y = %request.axis_y.variable,
        cells = request.axis_x.len() * request.axis_y.len(),
        "Starting sensitivity analysis"
    );

    let response = config.engine()?.analyze_sensitivity(&request)?;
    if response.grid.sentinel_count() > 0 {
        warn!(
            sentinels = response.grid.sentinel_count(),
            "Some cells have no value"
        );
    }
    match config.output_format {
        OutputFormat::Json => to_json(&response),
        OutputFormat::Table => Ok(render::sensitivity(&response)),
    }
}

/// Run the sensitivity command
pub fn run(request_path: &Path, config: &CliConfig) -> Result<()> {
    println!("{}", execute(request_path, config)?);
    info!("Sensitivity analysis complete");
    Ok(())
}
