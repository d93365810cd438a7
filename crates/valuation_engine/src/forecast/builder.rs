//! Forecast Table Builder.
//!
//! Projects revenue, earnings and invested capital year by year from the
//! scenario, and every other row by its `LineDriver` (hold-flat by default).
//!
//! ```text
//! Revenue[y]         = Revenue[y-1] * (1 + revenueGrowth[y])
//! Earnings[y]        = Revenue[y] * earningsMargin[y]
//! InvestedCapital[y] = InvestedCapital[y-1] * (1 + investedCapitalGrowth[y])
//! ```

use super::driver::{LineDriver, ProjectionPolicy};
use super::table::{ForecastTable, TableRow};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;
use valuation_core::types::year::{ensure_contiguous, ensure_forecast_boundary};
use valuation_core::types::{
    AssumptionSeries, FinancialLineItem, LineRole, ScenarioAssumptions, ValuationError, Year,
};

/// Builds `ForecastTable`s from historical rows and a scenario.
///
/// Holds only the per-row driver configuration, so one builder can be
/// shared across threads and reused for every sensitivity cell.
///
/// # Examples
/// ```
/// use valuation_core::types::{FinancialLineItem, ScenarioAssumptions, LineRole};
/// use valuation_engine::forecast::ForecastTableBuilder;
///
/// let historical = vec![
///     FinancialLineItem::from_pairs("Revenue", false, [(2023, 1000.0)]),
///     FinancialLineItem::from_pairs("EBIT", false, [(2023, 200.0)]),
///     FinancialLineItem::from_pairs("Invested Capital", false, [(2023, 500.0)]),
/// ];
/// let scenario = ScenarioAssumptions::constant(&[2024, 2025], 0.10, 0.20, 0.05);
///
/// let table = ForecastTableBuilder::new()
///     .build(&historical, &scenario, &[2024, 2025])
///     .unwrap();
/// assert!((table.role_value(LineRole::Revenue, 2025).unwrap() - 1210.0).abs() < 1e-9);
/// ```
#[derive(Clone, Debug, Default)]
pub struct ForecastTableBuilder {
    drivers: HashMap<String, LineDriver>,
}

impl ForecastTableBuilder {
    /// Creates a builder with no custom drivers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a driver for the row named `line` (case-insensitive).
    pub fn with_driver(mut self, line: impl AsRef<str>, driver: LineDriver) -> Self {
        self.drivers.insert(normalise(line.as_ref()), driver);
        self
    }

    /// Registers several drivers.
    pub fn with_drivers<K: AsRef<str>>(
        mut self,
        drivers: impl IntoIterator<Item = (K, LineDriver)>,
    ) -> Self {
        for (line, driver) in drivers {
            self.drivers.insert(normalise(line.as_ref()), driver);
        }
        self
    }

    /// Number of custom drivers.
    pub fn driver_count(&self) -> usize {
        self.drivers.len()
    }

    /// Builds the unified historical + forecast table.
    ///
    /// # Arguments
    ///
    /// * `historical` - Reported rows; must include revenue, earnings and invested capital
    /// * `scenario` - Assumptions covering every forecast year
    /// * `forecast_years` - Contiguous years starting right after the last historical year
    ///
    /// # Errors
    ///
    /// - `MissingLineItem` naming the first absent required row
    /// - `ScenarioIncomplete` naming the first missing `(series, year)`
    /// - `InvalidInput` for a broken year axis, a missing base value, or a bad driver
    pub fn build(
        &self,
        historical: &[FinancialLineItem],
        scenario: &ScenarioAssumptions,
        forecast_years: &[Year],
    ) -> Result<ForecastTable, ValuationError> {
        let required = RequiredRows::locate(historical)?;

        let historical_years: Vec<Year> = historical
            .iter()
            .flat_map(|item| item.years())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        ensure_contiguous(&historical_years, "historical_years")?;

        if forecast_years.is_empty() {
            let rows = historical
                .iter()
                .map(|item| TableRow {
                    item: item.clone(),
                    policy: ProjectionPolicy::HistoricalOnly,
                })
                .collect();
            return Ok(ForecastTable::new(historical_years, Vec::new(), rows));
        }

        let last_historical = *historical_years.last().ok_or_else(|| {
            ValuationError::invalid_input("historical_years", "no historical values supplied")
        })?;
        ensure_forecast_boundary(last_historical, forecast_years)?;
        scenario.validate_for(forecast_years)?;
        self.check_drivers(&required, historical)?;

        let base_revenue = base_value(&historical[required.revenue], last_historical)?;
        let base_capital = base_value(&historical[required.invested_capital], last_historical)?;

        let mut revenue = Vec::with_capacity(forecast_years.len());
        let mut earnings = Vec::with_capacity(forecast_years.len());
        let mut capital = Vec::with_capacity(forecast_years.len());
        let (mut prev_revenue, mut prev_capital) = (base_revenue, base_capital);

        for &year in forecast_years {
            let growth = scenario.get(AssumptionSeries::RevenueGrowth, year)?;
            let margin = scenario.get(AssumptionSeries::EarningsMargin, year)?;
            let capital_growth = scenario.get(AssumptionSeries::InvestedCapitalGrowth, year)?;

            let r = prev_revenue * (1.0 + growth);
            let e = r * margin;
            let ic = prev_capital * (1.0 + capital_growth);
            debug!(year, revenue = r, earnings = e, invested_capital = ic, "Projected year");

            revenue.push((year, r));
            earnings.push((year, e));
            capital.push((year, ic));
            prev_revenue = r;
            prev_capital = ic;
        }

        let mut rows = Vec::with_capacity(historical.len());
        for (index, item) in historical.iter().enumerate() {
            let row = if index == required.revenue {
                TableRow {
                    item: item.extended(revenue.iter().copied()),
                    policy: ProjectionPolicy::Growth {
                        series: AssumptionSeries::RevenueGrowth,
                    },
                }
            } else if index == required.earnings {
                TableRow {
                    item: item.extended(earnings.iter().copied()),
                    policy: ProjectionPolicy::Margin {
                        series: AssumptionSeries::EarningsMargin,
                    },
                }
            } else if index == required.invested_capital {
                TableRow {
                    item: item.extended(capital.iter().copied()),
                    policy: ProjectionPolicy::Growth {
                        series: AssumptionSeries::InvestedCapitalGrowth,
                    },
                }
            } else {
                self.project_auxiliary(item, &revenue, base_revenue, forecast_years)?
            };
            rows.push(row);
        }

        Ok(ForecastTable::new(
            historical_years,
            forecast_years.to_vec(),
            rows,
        ))
    }

    fn check_drivers(
        &self,
        required: &RequiredRows,
        historical: &[FinancialLineItem],
    ) -> Result<(), ValuationError> {
        for index in [required.revenue, required.earnings, required.invested_capital] {
            let name = historical[index].name();
            if self.drivers.contains_key(&normalise(name)) {
                return Err(ValuationError::invalid_input(
                    format!("line_drivers.{name}"),
                    "row is driven by the scenario and cannot take a custom driver",
                ));
            }
        }
        for name in self.drivers.keys() {
            if !historical.iter().any(|item| normalise(item.name()) == *name) {
                return Err(ValuationError::invalid_input(
                    format!("line_drivers.{name}"),
                    "no historical row with this name",
                ));
            }
        }
        Ok(())
    }

    fn project_auxiliary(
        &self,
        item: &FinancialLineItem,
        revenue: &[(Year, f64)],
        base_revenue: f64,
        forecast_years: &[Year],
    ) -> Result<TableRow, ValuationError> {
        let driver = self.drivers.get(&normalise(item.name()));
        let (last_year, last) = item.last_value().ok_or_else(|| {
            ValuationError::invalid_input(item.name(), "row has no historical values to project")
        })?;

        let (values, policy): (Vec<(Year, f64)>, ProjectionPolicy) = match driver {
            None | Some(LineDriver::HoldFlat) => (
                forecast_years.iter().map(|&y| (y, last)).collect(),
                ProjectionPolicy::HoldFlat {
                    from_year: last_year,
                },
            ),
            Some(LineDriver::ConstantGrowth { rate }) => {
                if !rate.is_finite() {
                    return Err(ValuationError::invalid_input(
                        format!("line_drivers.{}", item.name()),
                        format!("growth rate must be finite, got {rate}"),
                    ));
                }
                let mut value = last;
                let values = forecast_years
                    .iter()
                    .map(|&y| {
                        value *= 1.0 + rate;
                        (y, value)
                    })
                    .collect();
                (values, ProjectionPolicy::ConstantGrowth { rate: *rate })
            }
            Some(LineDriver::PercentOfRevenue) => {
                if base_revenue == 0.0 {
                    return Err(ValuationError::invalid_input(
                        format!("line_drivers.{}", item.name()),
                        "percent-of-revenue needs non-zero base revenue",
                    ));
                }
                let ratio = last / base_revenue;
                (
                    revenue.iter().map(|&(y, r)| (y, r * ratio)).collect(),
                    ProjectionPolicy::PercentOfRevenue { ratio },
                )
            }
            Some(LineDriver::Explicit { values }) => {
                let mut projected = Vec::with_capacity(forecast_years.len());
                for &year in forecast_years {
                    let value = values.get(&year).copied().ok_or_else(|| {
                        ValuationError::invalid_input(
                            format!("line_drivers.{}@{}", item.name(), year),
                            "explicit driver has no value for forecast year",
                        )
                    })?;
                    projected.push((year, value));
                }
                (projected, ProjectionPolicy::Explicit)
            }
        };

        Ok(TableRow {
            item: item.extended(values),
            policy,
        })
    }
}

/// Indices of the three scenario-driven rows within the historical slice.
struct RequiredRows {
    revenue: usize,
    earnings: usize,
    invested_capital: usize,
}

impl RequiredRows {
    fn locate(historical: &[FinancialLineItem]) -> Result<Self, ValuationError> {
        let find = |role: LineRole| {
            historical
                .iter()
                .position(|item| item.role() == Some(role))
                .ok_or_else(|| ValuationError::missing_line(role.canonical_name()))
        };
        Ok(Self {
            revenue: find(LineRole::Revenue)?,
            earnings: find(LineRole::Earnings)?,
            invested_capital: find(LineRole::InvestedCapital)?,
        })
    }
}

fn base_value(item: &FinancialLineItem, year: Year) -> Result<f64, ValuationError> {
    match item.value(year) {
        Some(v) if v.is_finite() => Ok(v),
        Some(v) => Err(ValuationError::invalid_input(
            format!("{}@{}", item.name(), year),
            format!("base value must be finite, got {v}"),
        )),
        None => Err(ValuationError::invalid_input(
            format!("{}@{}", item.name(), year),
            "no value for the last historical year",
        )),
    }
}

fn normalise(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn historical() -> Vec<FinancialLineItem> {
        vec![
            FinancialLineItem::from_pairs("Revenue", false, [(2022, 900.0), (2023, 1000.0)]),
            FinancialLineItem::from_pairs("EBIT", true, [(2022, 180.0), (2023, 200.0)]),
            FinancialLineItem::from_pairs("Invested Capital", false, [(2022, 480.0), (2023, 500.0)]),
            FinancialLineItem::from_pairs("Cash", false, [(2022, 40.0), (2023, 50.0)]),
            FinancialLineItem::from_pairs("SG&A", false, [(2022, 90.0), (2023, 100.0)]),
        ]
    }

    fn scenario() -> ScenarioAssumptions {
        ScenarioAssumptions::constant(&[2024, 2025], 0.10, 0.20, 0.05)
    }

    #[test]
    fn test_projection_formulas() {
        let table = ForecastTableBuilder::new()
            .build(&historical(), &scenario(), &[2024, 2025])
            .unwrap();

        assert_relative_eq!(table.role_value(LineRole::Revenue, 2024).unwrap(), 1100.0, epsilon = 1e-9);
        assert_relative_eq!(table.role_value(LineRole::Revenue, 2025).unwrap(), 1210.0, epsilon = 1e-9);
        assert_relative_eq!(table.role_value(LineRole::Earnings, 2024).unwrap(), 220.0, epsilon = 1e-9);
        assert_relative_eq!(table.role_value(LineRole::Earnings, 2025).unwrap(), 242.0, epsilon = 1e-9);
        assert_relative_eq!(
            table.role_value(LineRole::InvestedCapital, 2025).unwrap(),
            551.25,
            epsilon = 1e-9
        );
        assert_eq!(table.historical_years(), &[2022, 2023]);
        assert_eq!(table.forecast_years(), &[2024, 2025]);
    }

    #[test]
    fn test_historical_values_untouched() {
        let table = ForecastTableBuilder::new()
            .build(&historical(), &scenario(), &[2024, 2025])
            .unwrap();
        assert_eq!(table.role_value(LineRole::Earnings, 2022).unwrap(), 180.0);
        assert!(table.line("EBIT").unwrap().item.is_subtotal());
    }

    #[test]
    fn test_undriven_rows_held_flat() {
        let table = ForecastTableBuilder::new()
            .build(&historical(), &scenario(), &[2024, 2025])
            .unwrap();
        let cash = table.line("Cash").unwrap();
        assert_eq!(cash.item.value(2024), Some(50.0));
        assert_eq!(cash.item.value(2025), Some(50.0));
        assert_eq!(cash.policy, ProjectionPolicy::HoldFlat { from_year: 2023 });
    }

    #[test]
    fn test_custom_drivers() {
        let table = ForecastTableBuilder::new()
            .with_driver("cash", LineDriver::ConstantGrowth { rate: 0.10 })
            .with_driver("SG&A", LineDriver::PercentOfRevenue)
            .build(&historical(), &scenario(), &[2024, 2025])
            .unwrap();

        let cash = table.line("Cash").unwrap();
        assert_relative_eq!(cash.item.value(2025).unwrap(), 60.5, epsilon = 1e-9);

        let sga = table.line("SG&A").unwrap();
        assert_relative_eq!(sga.item.value(2025).unwrap(), 121.0, epsilon = 1e-9);
        assert_eq!(sga.policy, ProjectionPolicy::PercentOfRevenue { ratio: 0.1 });
    }

    #[test]
    fn test_explicit_driver_requires_every_year() {
        let values = [(2024, 1.0)].into_iter().collect();
        let err = ForecastTableBuilder::new()
            .with_driver("Cash", LineDriver::Explicit { values })
            .build(&historical(), &scenario(), &[2024, 2025])
            .unwrap_err();
        match err {
            ValuationError::InvalidInput { field, .. } => assert_eq!(field, "line_drivers.Cash@2025"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_driver_on_required_row_rejected() {
        let err = ForecastTableBuilder::new()
            .with_driver("Revenue", LineDriver::HoldFlat)
            .build(&historical(), &scenario(), &[2024, 2025])
            .unwrap_err();
        assert!(matches!(err, ValuationError::InvalidInput { .. }));
    }

    #[test]
    fn test_driver_for_unknown_row_rejected() {
        let err = ForecastTableBuilder::new()
            .with_driver("Goodwill", LineDriver::HoldFlat)
            .build(&historical(), &scenario(), &[2024, 2025])
            .unwrap_err();
        assert!(matches!(err, ValuationError::InvalidInput { .. }));
    }

    #[test]
    fn test_missing_required_line() {
        let mut rows = historical();
        rows.retain(|item| item.name() != "Invested Capital");
        let err = ForecastTableBuilder::new()
            .build(&rows, &scenario(), &[2024, 2025])
            .unwrap_err();
        assert_eq!(err, ValuationError::missing_line("Invested Capital"));
    }

    #[test]
    fn test_incomplete_scenario_names_series_and_year() {
        let mut scenario = scenario();
        scenario.earnings_margin.remove(&2025);
        let err = ForecastTableBuilder::new()
            .build(&historical(), &scenario, &[2024, 2025])
            .unwrap_err();
        assert_eq!(
            err,
            ValuationError::ScenarioIncomplete {
                series: AssumptionSeries::EarningsMargin,
                year: 2025,
            }
        );
    }

    #[test]
    fn test_empty_forecast_returns_historical_table() {
        let table = ForecastTableBuilder::new()
            .build(&historical(), &ScenarioAssumptions::new(), &[])
            .unwrap();
        assert!(table.forecast_years().is_empty());
        assert_eq!(table.rows().len(), 5);
        for (row, item) in table.rows().iter().zip(historical()) {
            assert_eq!(row.item, item);
            assert_eq!(row.policy, ProjectionPolicy::HistoricalOnly);
        }
    }

    #[test]
    fn test_forecast_years_must_follow_history() {
        let err = ForecastTableBuilder::new()
            .build(&historical(), &scenario(), &[2025, 2026])
            .unwrap_err();
        assert!(matches!(err, ValuationError::InvalidInput { .. }));

        let err = ForecastTableBuilder::new()
            .build(&historical(), &scenario(), &[2024, 2026])
            .unwrap_err();
        assert!(matches!(err, ValuationError::InvalidInput { .. }));
    }

    #[test]
    fn test_gapped_history_rejected() {
        let rows = vec![
            FinancialLineItem::from_pairs("Revenue", false, [(2020, 1.0), (2023, 1.0)]),
            FinancialLineItem::from_pairs("EBIT", false, [(2023, 1.0)]),
            FinancialLineItem::from_pairs("Invested Capital", false, [(2023, 1.0)]),
        ];
        let err = ForecastTableBuilder::new()
            .build(&rows, &scenario(), &[2024, 2025])
            .unwrap_err();
        match err {
            ValuationError::InvalidInput { field, .. } => assert_eq!(field, "historical_years"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_base_value() {
        let rows = vec![
            FinancialLineItem::from_pairs("Revenue", false, [(2022, 1.0), (2023, 1.0)]),
            FinancialLineItem::from_pairs("EBIT", false, [(2023, 1.0)]),
            FinancialLineItem::from_pairs("Invested Capital", false, [(2022, 1.0)]),
        ];
        let err = ForecastTableBuilder::new()
            .build(&rows, &scenario(), &[2024, 2025])
            .unwrap_err();
        match err {
            ValuationError::InvalidInput { field, .. } => assert_eq!(field, "Invested Capital@2023"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(256))]

            #[test]
            fn test_constant_growth_compounds(
                base in 1.0f64..1e6,
                growth in -0.5f64..0.5,
                years in 1usize..15
            ) {
                let forecast: Vec<Year> = (1..=years as Year).map(|k| 2023 + k).collect();
                let rows = vec![
                    FinancialLineItem::from_pairs("Revenue", false, [(2023, base)]),
                    FinancialLineItem::from_pairs("Earnings", false, [(2023, 0.0)]),
                    FinancialLineItem::from_pairs("Invested Capital", false, [(2023, 1.0)]),
                ];
                let scenario = ScenarioAssumptions::constant(&forecast, growth, 0.1, 0.0);
                let table = ForecastTableBuilder::new().build(&rows, &scenario, &forecast).unwrap();

                let last = *forecast.last().unwrap();
                let expected = base * (1.0 + growth).powi(years as i32);
                let actual = table.role_value(LineRole::Revenue, last).unwrap();
                prop_assert!((actual - expected).abs() <= 1e-9 * expected.abs().max(1.0));
            }
        }
    }
}
