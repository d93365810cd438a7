//! Scenario command implementation
//!
//! Validates a manual scenario or derives one from historical trends.

use std::path::Path;
use tracing::{info, warn};
use valuation_engine::ScenarioRequest;

use super::{read_request, to_json};
use crate::config::{CliConfig, OutputFormat};
use crate::{render, Result};

/// Generates the scenario and returns the formatted output.
pub fn execute(request_path: &Path, config: &CliConfig) -> Result<String> {
    let request: ScenarioRequest = read_request(request_path)?;
    info!(symbol = %request.symbol, mode = %request.mode, "Generating scenario");

    let response = config.engine()?.generate_scenario(&request)?;
    if response.used_fallback {
        warn!(symbol = %response.symbol, "Scenario uses flat carry-forward");
    }
    match config.output_format {
        OutputFormat::Json => to_json(&response),
        OutputFormat::Table => Ok(render::scenario(&response)),
    }
}

/// Run the scenario command
pub fn run(request_path: &Path, config: &CliConfig) -> Result<()> {
    println!("{}", execute(request_path, config)?);
    info!("Scenario generation complete");
    Ok(())
}
