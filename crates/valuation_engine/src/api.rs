//! Request/response facade.
//!
//! Payloads are camelCase; the scenario keeps the dashboard keys
//! `revenue_gr`, `earnings_margin` and `ic_gr`, and the evaluate response
//! exposes `tableData` and `valuationVars`. Every request is validated
//! here before any computation starts.

use crate::error::EngineResult;
use crate::forecast::{ForecastTable, ForecastTableBuilder, LineDriver};
use crate::scenario::{GenerationMode, ScenarioGenerator, ScenarioMode};
use crate::sensitivity::{
    CancellationToken, OutputField, SensitivityAnalyzer, SensitivityAxis, SensitivityBase,
    SensitivityConfig, SensitivityGrid,
};
use crate::valuation::{ValuationCalculator, ValuationResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;
use valuation_core::traits::HistoricalSource;
use valuation_core::types::{
    FinancialLineItem, ScenarioAssumptions, ValuationError, ValuationParameters, Year,
};

/// Evaluate request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateRequest {
    /// Company identifier
    pub symbol: String,
    /// Reported rows
    pub historical_line_items: Vec<FinancialLineItem>,
    /// Forecast assumptions
    pub scenario: ScenarioAssumptions,
    /// Discounting assumptions
    pub valuation_parameters: ValuationParameters,
    /// Share count
    pub shares_outstanding: f64,
    /// Forecast horizon; defaults to the years the scenario covers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forecast_years: Option<Vec<Year>>,
    /// Drivers for rows other than revenue, earnings and invested capital
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub line_drivers: BTreeMap<String, LineDriver>,
}

impl EvaluateRequest {
    /// Creates a request whose horizon is the scenario's years.
    pub fn new(
        symbol: impl Into<String>,
        historical_line_items: Vec<FinancialLineItem>,
        scenario: ScenarioAssumptions,
        valuation_parameters: ValuationParameters,
        shares_outstanding: f64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            historical_line_items,
            scenario,
            valuation_parameters,
            shares_outstanding,
            forecast_years: None,
            line_drivers: BTreeMap::new(),
        }
    }

    /// Explicit horizon, or the union of scenario years.
    pub fn resolved_forecast_years(&self) -> Vec<Year> {
        self.forecast_years
            .clone()
            .unwrap_or_else(|| self.scenario.years())
    }
}

/// Evaluate response: the valuation plus the table it was computed from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResponse {
    /// Company identifier
    pub symbol: String,
    /// Historical + forecast table, for display and audit
    pub table_data: ForecastTable,
    /// Valuation outputs
    pub valuation_vars: ValuationResult,
}

/// Sensitivity request: an evaluate request plus two axes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensitivityRequest {
    /// Company identifier
    pub symbol: String,
    /// Reported rows
    pub historical_line_items: Vec<FinancialLineItem>,
    /// Base scenario
    pub scenario: ScenarioAssumptions,
    /// Base discounting assumptions
    pub valuation_parameters: ValuationParameters,
    /// Share count
    pub shares_outstanding: f64,
    /// Forecast horizon; defaults to the years the scenario covers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forecast_years: Option<Vec<Year>>,
    /// Auxiliary row drivers
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub line_drivers: BTreeMap<String, LineDriver>,
    /// Row axis
    pub axis_x: SensitivityAxis,
    /// Column axis
    pub axis_y: SensitivityAxis,
    /// Output field; the engine default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputField>,
}

impl SensitivityRequest {
    /// Creates a request around an evaluate request's base case.
    pub fn new(base: EvaluateRequest, axis_x: SensitivityAxis, axis_y: SensitivityAxis) -> Self {
        Self {
            symbol: base.symbol,
            historical_line_items: base.historical_line_items,
            scenario: base.scenario,
            valuation_parameters: base.valuation_parameters,
            shares_outstanding: base.shares_outstanding,
            forecast_years: base.forecast_years,
            line_drivers: base.line_drivers,
            axis_x,
            axis_y,
            output: None,
        }
    }

    /// Explicit horizon, or the union of scenario years.
    pub fn resolved_forecast_years(&self) -> Vec<Year> {
        self.forecast_years
            .clone()
            .unwrap_or_else(|| self.scenario.years())
    }
}

/// Sensitivity response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensitivityResponse {
    /// Company identifier
    pub symbol: String,
    /// Base-case output the grid is centred on
    pub base_value: f64,
    /// Cell outcomes
    pub grid: SensitivityGrid,
}

/// Scenario-generate request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioRequest {
    /// Company identifier
    pub symbol: String,
    /// Reported rows
    #[serde(default)]
    pub historical_line_items: Vec<FinancialLineItem>,
    /// Years to cover
    pub forecast_years: Vec<Year>,
    /// `manual` or `heuristic`
    pub mode: GenerationMode,
    /// Caller-supplied scenario, required in manual mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario: Option<ScenarioAssumptions>,
}

impl ScenarioRequest {
    fn scenario_mode(&self) -> Result<ScenarioMode, ValuationError> {
        match (self.mode, &self.scenario) {
            (GenerationMode::Manual, Some(scenario)) => Ok(ScenarioMode::Manual(scenario.clone())),
            (GenerationMode::Manual, None) => Err(ValuationError::invalid_input(
                "scenario",
                "manual mode requires a scenario",
            )),
            (GenerationMode::Heuristic, _) => Ok(ScenarioMode::Heuristic),
        }
    }
}

/// Scenario-generate response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioResponse {
    /// Company identifier
    pub symbol: String,
    /// Mode used
    pub mode: GenerationMode,
    /// Generated or validated assumptions
    pub scenario: ScenarioAssumptions,
    /// Explanation of the heuristic; absent in manual mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    /// Whether flat carry-forward was used
    #[serde(default)]
    pub used_fallback: bool,
}

/// Entry point tying the builder, calculator, analyzer and generator together.
///
/// Holds configuration only. Each call builds fresh tables and results,
/// so one engine may serve concurrent callers.
///
/// # Examples
/// ```
/// use valuation_engine::{EvaluateRequest, ValuationEngine};
/// use valuation_core::types::{FinancialLineItem, ScenarioAssumptions, ValuationParameters};
///
/// let request = EvaluateRequest::new(
///     "ACME",
///     vec![
///         FinancialLineItem::from_pairs("Revenue", false, [(2023, 1000.0)]),
///         FinancialLineItem::from_pairs("Earnings", false, [(2023, 200.0)]),
///         FinancialLineItem::from_pairs("Invested Capital", false, [(2023, 500.0)]),
///     ],
///     ScenarioAssumptions::constant(&[2024, 2025], 0.10, 0.20, 0.05),
///     ValuationParameters::new(0.10, 0.03),
///     100.0,
/// );
/// let response = ValuationEngine::new().evaluate(&request).unwrap();
/// assert!(response.valuation_vars.enterprise_value > 0.0);
/// ```
#[derive(Clone, Debug, Default)]
pub struct ValuationEngine {
    calculator: ValuationCalculator,
    analyzer: SensitivityAnalyzer,
    generator: ScenarioGenerator,
}

impl ValuationEngine {
    /// Creates an engine with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the sensitivity settings.
    pub fn with_sensitivity_config(mut self, config: SensitivityConfig) -> Self {
        self.analyzer = SensitivityAnalyzer::new(config);
        self
    }

    /// Replaces the scenario generator.
    pub fn with_generator(mut self, generator: ScenarioGenerator) -> Self {
        self.generator = generator;
        self
    }

    /// Sensitivity analyzer in use.
    pub fn analyzer(&self) -> &SensitivityAnalyzer {
        &self.analyzer
    }

    /// Scenario generator in use.
    pub fn generator(&self) -> &ScenarioGenerator {
        &self.generator
    }

    /// Builds the forecast table and values it.
    ///
    /// # Errors
    ///
    /// Any `ValuationError` from the builder or calculator, unchanged.
    pub fn evaluate(&self, request: &EvaluateRequest) -> EngineResult<EvaluateResponse> {
        let forecast_years = request.resolved_forecast_years();
        let builder = builder_for(&request.line_drivers);
        let table = builder.build(
            &request.historical_line_items,
            &request.scenario,
            &forecast_years,
        )?;
        let result = self.calculator.evaluate(
            &table,
            &request.valuation_parameters,
            request.shares_outstanding,
        )?;

        info!(
            symbol = %request.symbol,
            years = forecast_years.len(),
            enterprise_value = result.enterprise_value,
            per_share_value = result.per_share_value,
            "Evaluated scenario"
        );
        Ok(EvaluateResponse {
            symbol: request.symbol.clone(),
            table_data: table,
            valuation_vars: result,
        })
    }

    /// Computes a sensitivity grid around the request's base case.
    ///
    /// The base case itself must evaluate; per-cell failures become sentinels.
    ///
    /// # Errors
    ///
    /// Base-case errors and invalid axes.
    pub fn analyze_sensitivity(
        &self,
        request: &SensitivityRequest,
    ) -> EngineResult<SensitivityResponse> {
        self.analyze_sensitivity_with_cancellation(request, &CancellationToken::new())
    }

    /// As [`analyze_sensitivity`](Self::analyze_sensitivity), honouring `token`.
    pub fn analyze_sensitivity_with_cancellation(
        &self,
        request: &SensitivityRequest,
        token: &CancellationToken,
    ) -> EngineResult<SensitivityResponse> {
        let forecast_years = request.resolved_forecast_years();
        let builder = builder_for(&request.line_drivers);
        let analyzer = match request.output {
            Some(output) => {
                SensitivityAnalyzer::new(self.analyzer.config().clone().with_output(output))
            }
            None => self.analyzer.clone(),
        };

        let table = builder.build(
            &request.historical_line_items,
            &request.scenario,
            &forecast_years,
        )?;
        let base_result = self.calculator.evaluate(
            &table,
            &request.valuation_parameters,
            request.shares_outstanding,
        )?;

        let base = SensitivityBase {
            historical: &request.historical_line_items,
            scenario: &request.scenario,
            params: &request.valuation_parameters,
            forecast_years: &forecast_years,
            shares_outstanding: request.shares_outstanding,
        };
        let grid = analyzer.analyze_with_cancellation(
            &base,
            &builder,
            &self.calculator,
            &request.axis_x,
            &request.axis_y,
            token,
        )?;

        Ok(SensitivityResponse {
            symbol: request.symbol.clone(),
            base_value: analyzer.config().output.extract(&base_result),
            grid,
        })
    }

    /// Generates or validates a scenario.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for manual mode without a scenario, plus generator errors.
    pub fn generate_scenario(&self, request: &ScenarioRequest) -> EngineResult<ScenarioResponse> {
        let mode = request.scenario_mode()?;
        let generated = self.generator.generate(
            &request.symbol,
            &request.historical_line_items,
            &request.forecast_years,
            mode,
        )?;
        Ok(ScenarioResponse {
            symbol: request.symbol.clone(),
            mode: request.mode,
            scenario: generated.scenario,
            rationale: generated.rationale,
            used_fallback: generated.used_fallback,
        })
    }

    /// Fetches history for `symbol` from `source`, then evaluates.
    ///
    /// The source is called exactly once, before any computation.
    ///
    /// # Errors
    ///
    /// `EngineError::Ingest` when the source fails, otherwise as [`evaluate`](Self::evaluate).
    pub fn evaluate_symbol<S: HistoricalSource + ?Sized>(
        &self,
        source: &S,
        symbol: &str,
        scenario: ScenarioAssumptions,
        valuation_parameters: ValuationParameters,
        shares_outstanding: f64,
    ) -> EngineResult<EvaluateResponse> {
        let historical = source.get_historical_line_items(symbol)?;
        info!(symbol, rows = historical.len(), "Loaded historical line items");
        let request = EvaluateRequest::new(
            symbol,
            historical,
            scenario,
            valuation_parameters,
            shares_outstanding,
        );
        self.evaluate(&request)
    }
}

fn builder_for(drivers: &BTreeMap<String, LineDriver>) -> ForecastTableBuilder {
    ForecastTableBuilder::new().with_drivers(
        drivers
            .iter()
            .map(|(line, driver)| (line.as_str(), driver.clone())),
    )
}
