//! CLI configuration management
//!
//! Loads settings from a TOML file, `VALUATION_*` environment variables
//! and command-line flags, then maps them onto the engine's configuration
//! structs.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use valuation_engine::parallel::{ParallelConfig, DEFAULT_PARALLEL_THRESHOLD};
use valuation_engine::scenario::{GeneratorConfig, ScenarioGenerator};
use valuation_engine::sensitivity::SensitivityConfig;
use valuation_engine::ValuationEngine;

/// Configuration file read when `--config` is not given and it exists.
pub const DEFAULT_CONFIG_FILE: &str = "valuation.toml";

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Unknown log level
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    /// Unknown output format
    #[error("Invalid output format: {0}. Must be one of: json, table")]
    InvalidOutputFormat(String),

    /// A setting failed validation
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue {
        /// Setting name
        key: String,
        /// Why it was rejected
        reason: String,
    },

    /// Configuration file could not be read or parsed
    #[error("Configuration file error: {0}")]
    FileError(String),

    /// Environment variable could not be parsed
    #[error("Environment variable error: {0}")]
    EnvError(String),
}

/// Log levels accepted by the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Everything, including per-cell traces
    Trace,
    /// Per-year projection detail
    Debug,
    /// One line per evaluation
    #[default]
    Info,
    /// Fallbacks and sentinel cells
    Warn,
    /// Errors only
    Error,
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ConfigError::InvalidLogLevel(s.to_string())),
        }
    }
}

impl LogLevel {
    /// Convert log level to tracing filter string
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_filter_str())
    }
}

/// How command results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Pretty-printed JSON response
    #[default]
    Json,
    /// Box-drawn tables
    Table,
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "table" => Ok(OutputFormat::Table),
            _ => Err(ConfigError::InvalidOutputFormat(s.to_string())),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Table => f.write_str("table"),
        }
    }
}

fn deserialize_from_str<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: FromStr<Err = ConfigError>,
{
    let s = String::deserialize(deserializer)?;
    T::from_str(&s).map_err(serde::de::Error::custom)
}

/// Effective CLI configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Log level used when `RUST_LOG` is unset
    #[serde(deserialize_with = "deserialize_from_str")]
    pub log_level: LogLevel,
    /// Output format
    #[serde(deserialize_with = "deserialize_from_str")]
    pub output_format: OutputFormat,
    /// Grid cells before fanning out to rayon
    pub parallel_threshold: usize,
    /// Dedicated thread pool size; global pool when absent
    pub num_threads: Option<usize>,
    /// Per-cell timeout in milliseconds
    pub cell_timeout_ms: Option<u64>,
    /// Minimum contiguous history for a heuristic trend
    pub min_trend_years: usize,
    /// Trailing trend window
    pub max_trend_years: usize,
    /// Long-run revenue growth prior
    pub long_run_revenue_growth: f64,
    /// Long-run invested capital growth prior
    pub long_run_ic_growth: f64,
    /// Fraction of the gap to the prior closed each year
    pub mean_reversion: f64,
    /// Lower clamp on growth trends
    pub growth_floor: f64,
    /// Upper clamp on growth trends
    pub growth_cap: f64,
}

impl Default for CliConfig {
    fn default() -> Self {
        let generator = GeneratorConfig::default();
        Self {
            log_level: LogLevel::Info,
            output_format: OutputFormat::Json,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            num_threads: None,
            cell_timeout_ms: None,
            min_trend_years: generator.min_trend_years,
            max_trend_years: generator.max_trend_years,
            long_run_revenue_growth: generator.long_run_revenue_growth,
            long_run_ic_growth: generator.long_run_ic_growth,
            mean_reversion: generator.mean_reversion,
            growth_floor: generator.growth_floor,
            growth_cap: generator.growth_cap,
        }
    }
}

fn parse_env<T: FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::EnvError(format!("{key}: cannot parse '{raw}'")))
}

impl CliConfig {
    /// Applies `VALUATION_*` overrides found by `lookup`.
    ///
    /// `lookup` is `std::env::var` in production; tests pass a map.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("VALUATION_LOG_LEVEL") {
            self.log_level = v.parse()?;
        }
        if let Some(v) = lookup("VALUATION_OUTPUT_FORMAT") {
            self.output_format = v.parse()?;
        }
        if let Some(v) = lookup("VALUATION_PARALLEL_THRESHOLD") {
            self.parallel_threshold = parse_env("VALUATION_PARALLEL_THRESHOLD", &v)?;
        }
        if let Some(v) = lookup("VALUATION_NUM_THREADS") {
            self.num_threads = Some(parse_env("VALUATION_NUM_THREADS", &v)?);
        }
        if let Some(v) = lookup("VALUATION_CELL_TIMEOUT_MS") {
            self.cell_timeout_ms = Some(parse_env("VALUATION_CELL_TIMEOUT_MS", &v)?);
        }
        if let Some(v) = lookup("VALUATION_MIN_TREND_YEARS") {
            self.min_trend_years = parse_env("VALUATION_MIN_TREND_YEARS", &v)?;
        }
        if let Some(v) = lookup("VALUATION_MAX_TREND_YEARS") {
            self.max_trend_years = parse_env("VALUATION_MAX_TREND_YEARS", &v)?;
        }
        if let Some(v) = lookup("VALUATION_LONG_RUN_REVENUE_GROWTH") {
            self.long_run_revenue_growth = parse_env("VALUATION_LONG_RUN_REVENUE_GROWTH", &v)?;
        }
        if let Some(v) = lookup("VALUATION_LONG_RUN_IC_GROWTH") {
            self.long_run_ic_growth = parse_env("VALUATION_LONG_RUN_IC_GROWTH", &v)?;
        }
        if let Some(v) = lookup("VALUATION_MEAN_REVERSION") {
            self.mean_reversion = parse_env("VALUATION_MEAN_REVERSION", &v)?;
        }
        if let Some(v) = lookup("VALUATION_GROWTH_FLOOR") {
            self.growth_floor = parse_env("VALUATION_GROWTH_FLOOR", &v)?;
        }
        if let Some(v) = lookup("VALUATION_GROWTH_CAP") {
            self.growth_cap = parse_env("VALUATION_GROWTH_CAP", &v)?;
        }
        Ok(())
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::FileError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e| ConfigError::FileError(format!("Failed to parse TOML: {}", e)))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_threads == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "num_threads".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.cell_timeout_ms == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "cell_timeout_ms".into(),
                reason: "must be at least 1".into(),
            });
        }
        self.generator_config()
            .validate()
            .map_err(|err| ConfigError::InvalidValue {
                key: "generator".into(),
                reason: err.to_string(),
            })
    }

    /// Merge with CLI arguments (CLI takes precedence)
    pub fn merge_with_cli(&mut self, cli: &CliArgs) -> Result<(), ConfigError> {
        if let Some(level) = &cli.log_level {
            self.log_level = level.parse()?;
        }
        if let Some(format) = &cli.format {
            self.output_format = format.parse()?;
        }
        if let Some(threads) = cli.threads {
            self.num_threads = Some(threads);
        }
        if let Some(threshold) = cli.parallel_threshold {
            self.parallel_threshold = threshold;
        }
        if let Some(timeout) = cli.cell_timeout_ms {
            self.cell_timeout_ms = Some(timeout);
        }
        Ok(())
    }

    /// Threads the sensitivity grid will use.
    pub fn effective_threads(&self) -> usize {
        self.num_threads.unwrap_or_else(num_cpus::get)
    }

    /// Heuristic generator tunables.
    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            min_trend_years: self.min_trend_years,
            max_trend_years: self.max_trend_years,
            long_run_revenue_growth: self.long_run_revenue_growth,
            long_run_ic_growth: self.long_run_ic_growth,
            mean_reversion: self.mean_reversion,
            growth_floor: self.growth_floor,
            growth_cap: self.growth_cap,
        }
    }

    /// Sensitivity analyzer settings.
    pub fn sensitivity_config(&self) -> SensitivityConfig {
        let config = SensitivityConfig::default().with_parallel(ParallelConfig::new(
            self.parallel_threshold,
            self.num_threads,
        ));
        match self.cell_timeout_ms {
            Some(ms) => config.with_cell_timeout(Duration::from_millis(ms)),
            None => config,
        }
    }

    /// Engine configured from these settings.
    pub fn engine(&self) -> Result<ValuationEngine, ConfigError> {
        let generator =
            ScenarioGenerator::new(self.generator_config()).map_err(|err| {
                ConfigError::InvalidValue {
                    key: "generator".into(),
                    reason: err.to_string(),
                }
            })?;
        Ok(ValuationEngine::new()
            .with_sensitivity_config(self.sensitivity_config())
            .with_generator(generator))
    }
}

/// Overrides taken from command-line flags
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Config file path
    pub config_file: Option<PathBuf>,
    /// Log level override
    pub log_level: Option<String>,
    /// Output format override
    pub format: Option<String>,
    /// Thread pool size override
    pub threads: Option<usize>,
    /// Parallel threshold override
    pub parallel_threshold: Option<usize>,
    /// Per-cell timeout override
    pub cell_timeout_ms: Option<u64>,
}

/// Build configuration from all sources
///
/// Priority (highest to lowest):
/// 1. CLI arguments
/// 2. Environment variables
/// 3. Config file
/// 4. Default values
pub fn build_config(cli: &CliArgs) -> Result<CliConfig, ConfigError> {
    build_config_with(cli, |key| std::env::var(key).ok())
}

/// [`build_config`] with an explicit environment lookup.
pub fn build_config_with<F>(cli: &CliArgs, lookup: F) -> Result<CliConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match &cli.config_file {
        Some(path) => CliConfig::from_file(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            CliConfig::from_file(Path::new(DEFAULT_CONFIG_FILE))?
        }
        None => CliConfig::default(),
    };

    config.apply_env(lookup)?;
    config.merge_with_cli(cli)?;
    config.validate()?;

    Ok(config)
}
