//! Check command implementation
//!
//! Prints the effective configuration after file, environment and flag
//! overrides have been applied.

use tracing::info;

use crate::config::{CliConfig, OutputFormat};
use crate::{render, Result};

/// Run the check command
pub fn run(config: &CliConfig) -> Result<()> {
    info!("Checking configuration...");
    config.engine()?;

    match config.output_format {
        OutputFormat::Table => println!("{}", render::config(config)),
        OutputFormat::Json => {
            let generator = config.generator_config();
            let summary = serde_json::json!({
                "logLevel": config.log_level.to_string(),
                "outputFormat": config.output_format.to_string(),
                "parallelThreshold": config.parallel_threshold,
                "numThreads": config.num_threads,
                "effectiveThreads": config.effective_threads(),
                "availableCpus": num_cpus::get(),
                "cellTimeoutMs": config.cell_timeout_ms,
                "generator": generator,
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    info!("Configuration OK");
    Ok(())
}
