//! Scenario Generator.

use super::config::GeneratorConfig;
use super::trend::{observations, HistoricalTrend, Observation, TrendEstimate, TrendSource};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};
use valuation_core::types::year::ensure_contiguous;
use valuation_core::types::{
    AssumptionSeries, FinancialLineItem, ScenarioAssumptions, ValuationError, Year,
};

/// How a scenario is produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    /// Caller supplies the scenario
    Manual,
    /// Derived from the historical trend
    #[default]
    Heuristic,
}

impl GenerationMode {
    /// Lower-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationMode::Manual => "manual",
            GenerationMode::Heuristic => "heuristic",
        }
    }
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerationMode {
    type Err = ValuationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "manual" => Ok(GenerationMode::Manual),
            "heuristic" => Ok(GenerationMode::Heuristic),
            other => Err(ValuationError::invalid_input(
                "mode",
                format!("expected 'manual' or 'heuristic', got '{other}'"),
            )),
        }
    }
}

/// Generation request mode with its payload.
#[derive(Clone, Debug, PartialEq)]
pub enum ScenarioMode {
    /// Validate and return the supplied scenario
    Manual(ScenarioAssumptions),
    /// Derive assumptions from history
    Heuristic,
}

impl ScenarioMode {
    /// Mode without payload.
    pub fn kind(&self) -> GenerationMode {
        match self {
            ScenarioMode::Manual(_) => GenerationMode::Manual,
            ScenarioMode::Heuristic => GenerationMode::Heuristic,
        }
    }
}

/// A generated scenario with its documentation.
///
/// `rationale` is descriptive text only. Nothing downstream reads it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedScenario {
    /// Assumptions covering every forecast year
    pub scenario: ScenarioAssumptions,
    /// Human-readable explanation, heuristic mode only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    /// Whether history was too short and flat carry-forward was used
    #[serde(default)]
    pub used_fallback: bool,
}

/// Produces scenario assumptions, manually or from historical trends.
#[derive(Clone, Debug, Default)]
pub struct ScenarioGenerator {
    config: GeneratorConfig,
}

impl ScenarioGenerator {
    /// Creates a generator.
    ///
    /// # Errors
    ///
    /// `InvalidInput` when the configuration fails validation.
    pub fn new(config: GeneratorConfig) -> Result<Self, ValuationError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Current configuration.
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generates assumptions for `forecast_years`.
    ///
    /// # Arguments
    ///
    /// * `symbol` - Company identifier, used in logs and rationale
    /// * `historical` - Reported rows including revenue, earnings and invested capital
    /// * `forecast_years` - Contiguous, strictly increasing years to cover
    /// * `mode` - Manual scenario or heuristic derivation
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for a broken forecast axis
    /// - `ScenarioIncomplete` when a manual scenario misses a year
    /// - `MissingLineItem` when heuristic mode lacks a required row
    ///
    /// Too little history is not an error: the generator falls back to
    /// flat carry-forward and says so in the rationale.
    pub fn generate(
        &self,
        symbol: &str,
        historical: &[FinancialLineItem],
        forecast_years: &[Year],
        mode: ScenarioMode,
    ) -> Result<GeneratedScenario, ValuationError> {
        ensure_contiguous(forecast_years, "forecast_years")?;

        match mode {
            ScenarioMode::Manual(scenario) => {
                scenario.validate_for(forecast_years)?;
                info!(symbol, years = forecast_years.len(), "Accepted manual scenario");
                Ok(GeneratedScenario {
                    scenario,
                    rationale: None,
                    used_fallback: false,
                })
            }
            ScenarioMode::Heuristic => {
                let observed = observations(historical)?;
                match HistoricalTrend::measure(&observed, &self.config) {
                    Some(trend) => {
                        info!(
                            symbol,
                            window = trend.window.len(),
                            revenue_growth = trend.revenue_growth.value,
                            earnings_margin = trend.earnings_margin.value,
                            invested_capital_growth = trend.invested_capital_growth.value,
                            "Derived heuristic scenario"
                        );
                        Ok(self.trend_scenario(symbol, &trend, forecast_years))
                    }
                    None => {
                        warn!(
                            symbol,
                            available = super::trend::trailing_run(&observed).len(),
                            required = self.config.min_trend_years,
                            "Insufficient history, using flat carry-forward"
                        );
                        Ok(self.flat_carry_forward(symbol, &observed, forecast_years))
                    }
                }
            }
        }
    }

    fn trend_scenario(
        &self,
        symbol: &str,
        trend: &HistoricalTrend,
        forecast_years: &[Year],
    ) -> GeneratedScenario {
        let priors = [
            (
                AssumptionSeries::RevenueGrowth,
                trend.revenue_growth,
                self.config.long_run_revenue_growth,
            ),
            (
                AssumptionSeries::EarningsMargin,
                trend.earnings_margin,
                trend.margin_prior,
            ),
            (
                AssumptionSeries::InvestedCapitalGrowth,
                trend.invested_capital_growth,
                self.config.long_run_ic_growth,
            ),
        ];

        let mut scenario = ScenarioAssumptions::new();
        for (series, estimate, prior) in priors {
            for (k, &year) in forecast_years.iter().enumerate() {
                scenario.set(series, year, self.config.smooth(estimate.value, prior, k + 1));
            }
        }

        let (first, last) = match (trend.window.first(), trend.window.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => (0, 0),
        };
        let mut lines = vec![format!(
            "{symbol}: heuristic scenario from the {}-year trailing window {first}-{last}.",
            trend.window.len()
        )];
        lines.extend(
            priors
                .iter()
                .map(|(series, estimate, prior)| format!("- {}", describe(*series, estimate, *prior))),
        );
        lines.push(format!(
            "Each year closes {:.0}% of the remaining gap to the long-run prior.",
            self.config.mean_reversion * 100.0
        ));
        let rationale = lines.join("\n");

        GeneratedScenario {
            scenario,
            rationale: Some(rationale),
            used_fallback: false,
        }
    }

    fn flat_carry_forward(
        &self,
        symbol: &str,
        observed: &[Observation],
        forecast_years: &[Year],
    ) -> GeneratedScenario {
        let last_margin = observed
            .iter()
            .rev()
            .find_map(|o| o.margin().map(|m| (o.year, m)));
        let margin = last_margin.map_or(0.0, |(_, m)| m);
        let scenario = ScenarioAssumptions::constant(forecast_years, 0.0, margin, 0.0);

        let rationale = [
            format!(
                "{symbol}: FALLBACK flat carry-forward. Only {} contiguous year(s) of history, \
                 fewer than the {} required to measure a trend.",
                super::trend::trailing_run(observed).len(),
                self.config.min_trend_years
            ),
            "- revenue and invested capital held flat (0% growth)".to_string(),
            match last_margin {
                Some((year, m)) => format!(
                    "- earnings margin held at the {year} level of {:.2}%",
                    m * 100.0
                ),
                None => "- no usable earnings margin on record; margin set to 0%".to_string(),
            },
        ]
        .join("\n");

        GeneratedScenario {
            scenario,
            rationale: Some(rationale),
            used_fallback: true,
        }
    }
}

fn describe(series: AssumptionSeries, estimate: &TrendEstimate, prior: f64) -> String {
    let measure = match series {
        AssumptionSeries::RevenueGrowth => "revenue compound annual growth",
        AssumptionSeries::EarningsMargin => "average earnings margin",
        AssumptionSeries::InvestedCapitalGrowth => "average invested capital growth",
    };
    let origin = match estimate.source {
        TrendSource::Measured => format!("{measure} of {:.2}%", estimate.value * 100.0),
        TrendSource::Clamped { raw } => format!(
            "{measure} of {:.2}%, clamped to {:.2}%",
            raw * 100.0,
            estimate.value * 100.0
        ),
        TrendSource::Prior => format!("{measure} not measurable, using the prior"),
    };
    format!(
        "{}: {origin}, reverting toward {:.2}%",
        series.boundary_key(),
        prior * 100.0
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn history(years: std::ops::RangeInclusive<Year>) -> Vec<FinancialLineItem> {
        let revenue: Vec<(Year, f64)> = years
            .clone()
            .enumerate()
            .map(|(i, y)| (y, 100.0 * 1.1f64.powi(i as i32)))
            .collect();
        vec![
            FinancialLineItem::from_pairs("Revenue", false, revenue.iter().copied()),
            FinancialLineItem::from_pairs("EBIT", false, revenue.iter().map(|&(y, r)| (y, r * 0.2))),
            FinancialLineItem::from_pairs("Invested Capital", false, years.map(|y| (y, 500.0))),
        ]
    }

    // ========================================
    // Manual mode
    // ========================================

    #[test]
    fn test_manual_returns_scenario_unchanged() {
        let scenario = ScenarioAssumptions::constant(&[2024, 2025], 0.1, 0.2, 0.05);
        let generated = ScenarioGenerator::default()
            .generate("ACME", &[], &[2024, 2025], ScenarioMode::Manual(scenario.clone()))
            .unwrap();
        assert_eq!(generated.scenario, scenario);
        assert!(generated.rationale.is_none());
        assert!(!generated.used_fallback);
    }

    #[test]
    fn test_manual_incomplete_is_error() {
        let mut scenario = ScenarioAssumptions::constant(&[2024, 2025], 0.1, 0.2, 0.05);
        scenario.earnings_margin.remove(&2025);
        let err = ScenarioGenerator::default()
            .generate("ACME", &[], &[2024, 2025], ScenarioMode::Manual(scenario))
            .unwrap_err();
        assert_eq!(
            err,
            ValuationError::ScenarioIncomplete {
                series: AssumptionSeries::EarningsMargin,
                year: 2025
            }
        );
    }

    #[test]
    fn test_non_contiguous_years_rejected() {
        let err = ScenarioGenerator::default()
            .generate("ACME", &history(2019..=2023), &[2024, 2026], ScenarioMode::Heuristic)
            .unwrap_err();
        assert!(matches!(err, ValuationError::InvalidInput { ref field, .. } if field == "forecast_years"));
    }

    // ========================================
    // Heuristic mode
    // ========================================

    #[test]
    fn test_heuristic_covers_every_year() {
        let years = [2024, 2025, 2026, 2027, 2028];
        let generated = ScenarioGenerator::default()
            .generate("ACME", &history(2019..=2023), &years, ScenarioMode::Heuristic)
            .unwrap();
        assert!(generated.scenario.validate_for(&years).is_ok());
        assert!(!generated.used_fallback);
        let rationale = generated.rationale.unwrap();
        assert!(rationale.contains("revenue_gr"));
        assert!(rationale.contains("2019-2023"));
    }

    #[test]
    fn test_heuristic_reverts_toward_prior() {
        let config = GeneratorConfig::default();
        let generated = ScenarioGenerator::new(config.clone())
            .unwrap()
            .generate("ACME", &history(2019..=2023), &[2024, 2025, 2026], ScenarioMode::Heuristic)
            .unwrap();
        let growth = &generated.scenario.revenue_growth;

        assert_relative_eq!(
            growth[&2024],
            0.03 + (0.10 - 0.03) * 0.8,
            epsilon = 1e-9
        );
        assert!(growth[&2024] > growth[&2025]);
        assert!(growth[&2025] > growth[&2026]);
        assert!(growth[&2026] > config.long_run_revenue_growth);

        // Margin trend equals its full-history prior, so it stays flat.
        for margin in generated.scenario.earnings_margin.values() {
            assert_relative_eq!(*margin, 0.2, epsilon = 1e-12);
        }
        // Flat capital: trend 0 reverting up toward 3%.
        assert!(generated.scenario.invested_capital_growth[&2024] > 0.0);
    }

    #[test]
    fn test_short_history_falls_back() {
        let generated = ScenarioGenerator::default()
            .generate("ACME", &history(2022..=2023), &[2024, 2025], ScenarioMode::Heuristic)
            .unwrap();
        assert!(generated.used_fallback);
        assert_eq!(generated.scenario.revenue_growth[&2025], 0.0);
        assert_eq!(generated.scenario.invested_capital_growth[&2024], 0.0);
        assert_relative_eq!(generated.scenario.earnings_margin[&2025], 0.2, epsilon = 1e-12);
        assert!(generated.rationale.unwrap().contains("FALLBACK"));
    }

    #[test]
    fn test_rationale_lines() {
        let generator = ScenarioGenerator::default();
        let trend = generator
            .generate("ACME", &history(2019..=2023), &[2024, 2025], ScenarioMode::Heuristic)
            .unwrap()
            .rationale
            .unwrap();
        let lines: Vec<&str> = trend.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("ACME: heuristic scenario"));
        assert!(lines[1..4].iter().all(|l| l.starts_with("- ")));
        assert!(lines[4].contains("closes 20%"));

        let fallback = generator
            .generate("ACME", &history(2023..=2023), &[2024], ScenarioMode::Heuristic)
            .unwrap()
            .rationale
            .unwrap();
        let lines: Vec<&str> = fallback.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("Only 1 contiguous year(s)"));
        assert!(lines[2].contains("2023 level of 20.00%"));
    }

    #[test]
    fn test_missing_row_is_error() {
        let mut rows = history(2019..=2023);
        rows.truncate(2);
        let err = ScenarioGenerator::default()
            .generate("ACME", &rows, &[2024], ScenarioMode::Heuristic)
            .unwrap_err();
        assert!(matches!(err, ValuationError::MissingLineItem { .. }));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = GeneratorConfig {
            mean_reversion: -0.1,
            ..Default::default()
        };
        assert!(ScenarioGenerator::new(config).is_err());
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("Manual".parse::<GenerationMode>().unwrap(), GenerationMode::Manual);
        assert_eq!(" heuristic ".parse::<GenerationMode>().unwrap(), GenerationMode::Heuristic);
        assert!("auto".parse::<GenerationMode>().is_err());
        assert_eq!(ScenarioMode::Heuristic.kind(), GenerationMode::Heuristic);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            #[test]
            fn test_heuristic_bounded_for_any_history(
                revenue in proptest::collection::vec(1.0f64..1e6, 3..8),
                margin in -0.5f64..0.5,
                horizon in 1usize..15
            ) {
                let first = 2000;
                let rows = vec![
                    FinancialLineItem::from_pairs(
                        "Revenue",
                        false,
                        revenue.iter().enumerate().map(|(i, &r)| (first + i as Year, r)),
                    ),
                    FinancialLineItem::from_pairs(
                        "Earnings",
                        false,
                        revenue.iter().enumerate().map(|(i, &r)| (first + i as Year, r * margin)),
                    ),
                    FinancialLineItem::from_pairs(
                        "IC",
                        false,
                        revenue.iter().enumerate().map(|(i, &r)| (first + i as Year, r * 2.0)),
                    ),
                ];
                let last = first + revenue.len() as Year - 1;
                let years: Vec<Year> = (1..=horizon as Year).map(|k| last + k).collect();
                let config = GeneratorConfig::default();
                let generated = ScenarioGenerator::default()
                    .generate("PROP", &rows, &years, ScenarioMode::Heuristic)
                    .unwrap();

                prop_assert!(generated.scenario.validate_for(&years).is_ok());
                for g in generated.scenario.revenue_growth.values()
                    .chain(generated.scenario.invested_capital_growth.values())
                {
                    prop_assert!(*g >= config.growth_floor - 1e-12);
                    prop_assert!(*g <= config.growth_cap + 1e-12);
                }
                for m in generated.scenario.earnings_margin.values() {
                    prop_assert!((-1.0..=1.0).contains(m));
                }
            }
        }
    }
}
