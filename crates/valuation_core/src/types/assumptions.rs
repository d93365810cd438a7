//! Scenario assumptions and valuation parameters.
//!
//! All percentages are decimal fractions (0.05 = 5%).
//!
//! At the serialisation boundary the three assumption series keep the
//! dashboard field names `revenue_gr`, `earnings_margin` and `ic_gr`.

use super::error::ValuationError;
use super::year::Year;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// One of the three year-indexed assumption series.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssumptionSeries {
    /// Year-on-year revenue growth
    RevenueGrowth,
    /// Earnings as a fraction of revenue
    EarningsMargin,
    /// Year-on-year invested capital growth
    InvestedCapitalGrowth,
}

impl AssumptionSeries {
    /// All series, in validation order.
    pub const ALL: [AssumptionSeries; 3] = [
        AssumptionSeries::RevenueGrowth,
        AssumptionSeries::EarningsMargin,
        AssumptionSeries::InvestedCapitalGrowth,
    ];

    /// Camel-case identifier used in messages and sensitivity variables.
    pub fn as_str(&self) -> &'static str {
        match self {
            AssumptionSeries::RevenueGrowth => "revenueGrowth",
            AssumptionSeries::EarningsMargin => "earningsMargin",
            AssumptionSeries::InvestedCapitalGrowth => "investedCapitalGrowth",
        }
    }

    /// Field name used by the dashboard payloads.
    pub fn boundary_key(&self) -> &'static str {
        match self {
            AssumptionSeries::RevenueGrowth => "revenue_gr",
            AssumptionSeries::EarningsMargin => "earnings_margin",
            AssumptionSeries::InvestedCapitalGrowth => "ic_gr",
        }
    }
}

impl fmt::Display for AssumptionSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssumptionSeries {
    type Err = ValuationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        AssumptionSeries::ALL
            .into_iter()
            .find(|series| {
                series.as_str().eq_ignore_ascii_case(trimmed)
                    || series.boundary_key().eq_ignore_ascii_case(trimmed)
            })
            .ok_or_else(|| {
                ValuationError::invalid_input("series", format!("unknown assumption series '{s}'"))
            })
    }
}

/// Year-indexed forecast assumptions.
///
/// Every forecast year must carry an entry in all three series; a missing
/// entry is reported, never defaulted.
///
/// # Examples
/// ```
/// use valuation_core::types::{AssumptionSeries, ScenarioAssumptions};
///
/// let scenario = ScenarioAssumptions::constant(&[2024, 2025], 0.10, 0.20, 0.05);
/// assert_eq!(scenario.get(AssumptionSeries::RevenueGrowth, 2025).unwrap(), 0.10);
/// assert!(scenario.validate_for(&[2024, 2025, 2026]).is_err());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioAssumptions {
    /// Revenue growth by year
    #[serde(rename = "revenue_gr", default)]
    pub revenue_growth: BTreeMap<Year, f64>,
    /// Earnings margin by year
    #[serde(rename = "earnings_margin", default)]
    pub earnings_margin: BTreeMap<Year, f64>,
    /// Invested capital growth by year
    #[serde(rename = "ic_gr", default)]
    pub invested_capital_growth: BTreeMap<Year, f64>,
}

impl ScenarioAssumptions {
    /// Creates an empty scenario.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a scenario holding the same three values in every year.
    pub fn constant(
        years: &[Year],
        revenue_growth: f64,
        earnings_margin: f64,
        invested_capital_growth: f64,
    ) -> Self {
        let fill = |value: f64| years.iter().map(|&y| (y, value)).collect();
        Self {
            revenue_growth: fill(revenue_growth),
            earnings_margin: fill(earnings_margin),
            invested_capital_growth: fill(invested_capital_growth),
        }
    }

    /// Borrows one series.
    pub fn series(&self, series: AssumptionSeries) -> &BTreeMap<Year, f64> {
        match series {
            AssumptionSeries::RevenueGrowth => &self.revenue_growth,
            AssumptionSeries::EarningsMargin => &self.earnings_margin,
            AssumptionSeries::InvestedCapitalGrowth => &self.invested_capital_growth,
        }
    }

    /// Mutably borrows one series.
    pub fn series_mut(&mut self, series: AssumptionSeries) -> &mut BTreeMap<Year, f64> {
        match series {
            AssumptionSeries::RevenueGrowth => &mut self.revenue_growth,
            AssumptionSeries::EarningsMargin => &mut self.earnings_margin,
            AssumptionSeries::InvestedCapitalGrowth => &mut self.invested_capital_growth,
        }
    }

    /// Value of `series` in `year`.
    ///
    /// # Errors
    ///
    /// `ScenarioIncomplete` naming the series and year when absent.
    #[inline]
    pub fn get(&self, series: AssumptionSeries, year: Year) -> Result<f64, ValuationError> {
        self.series(series)
            .get(&year)
            .copied()
            .ok_or(ValuationError::ScenarioIncomplete { series, year })
    }

    /// Sets the value of `series` in `year`.
    pub fn set(&mut self, series: AssumptionSeries, year: Year, value: f64) {
        self.series_mut(series).insert(year, value);
    }

    /// Union of years mentioned by any series, ascending.
    pub fn years(&self) -> Vec<Year> {
        let years: BTreeSet<Year> = AssumptionSeries::ALL
            .into_iter()
            .flat_map(|s| self.series(s).keys().copied())
            .collect();
        years.into_iter().collect()
    }

    /// Checks that every forecast year is covered by every series with a finite value.
    ///
    /// Years are checked in ascending order and, within a year, series in
    /// `AssumptionSeries::ALL` order, so the first gap reported is stable.
    ///
    /// # Errors
    ///
    /// - `ScenarioIncomplete` for the first missing `(series, year)`
    /// - `InvalidInput` for a non-finite value
    pub fn validate_for(&self, forecast_years: &[Year]) -> Result<(), ValuationError> {
        for &year in forecast_years {
            for series in AssumptionSeries::ALL {
                let value = self.get(series, year)?;
                if !value.is_finite() {
                    return Err(ValuationError::invalid_input(
                        format!("{series}@{year}"),
                        format!("assumption must be finite, got {value}"),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Discounting assumptions for the valuation.
///
/// Invariant: `discount_rate > terminal_growth_rate`, enforced by
/// [`ValuationParameters::validate`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationParameters {
    /// Annual discount rate
    pub discount_rate: f64,
    /// Perpetual growth after the explicit horizon
    pub terminal_growth_rate: f64,
    /// Exit multiple applied to final-year FCF instead of perpetuity growth
    #[serde(default)]
    pub terminal_year_multiple: Option<f64>,
    /// Net debt deducted from enterprise value; zero when absent
    #[serde(default)]
    pub net_debt: Option<f64>,
}

impl ValuationParameters {
    /// Creates parameters using perpetuity growth and no net debt.
    pub fn new(discount_rate: f64, terminal_growth_rate: f64) -> Self {
        Self {
            discount_rate,
            terminal_growth_rate,
            terminal_year_multiple: None,
            net_debt: None,
        }
    }

    /// Sets an exit multiple.
    pub fn with_terminal_multiple(mut self, multiple: f64) -> Self {
        self.terminal_year_multiple = Some(multiple);
        self
    }

    /// Sets net debt.
    pub fn with_net_debt(mut self, net_debt: f64) -> Self {
        self.net_debt = Some(net_debt);
        self
    }

    /// Validates the parameter set.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for non-finite values or a discount rate at or below -100%
    /// - `DivergentTerminalValue` when `discount_rate <= terminal_growth_rate`
    pub fn validate(&self) -> Result<(), ValuationError> {
        let checks = [
            ("discount_rate", Some(self.discount_rate)),
            ("terminal_growth_rate", Some(self.terminal_growth_rate)),
            ("terminal_year_multiple", self.terminal_year_multiple),
            ("net_debt", self.net_debt),
        ];
        for (field, value) in checks {
            if let Some(v) = value {
                if !v.is_finite() {
                    return Err(ValuationError::invalid_input(
                        field,
                        format!("must be finite, got {v}"),
                    ));
                }
            }
        }
        if self.discount_rate <= -1.0 {
            return Err(ValuationError::invalid_input(
                "discount_rate",
                format!("must exceed -1, got {}", self.discount_rate),
            ));
        }
        if self.discount_rate <= self.terminal_growth_rate {
            return Err(ValuationError::DivergentTerminalValue {
                discount_rate: self.discount_rate,
                terminal_growth_rate: self.terminal_growth_rate,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_from_str() {
        assert_eq!(
            "revenueGrowth".parse::<AssumptionSeries>().unwrap(),
            AssumptionSeries::RevenueGrowth
        );
        assert_eq!(
            "ic_gr".parse::<AssumptionSeries>().unwrap(),
            AssumptionSeries::InvestedCapitalGrowth
        );
        assert_eq!(
            "EARNINGSMARGIN".parse::<AssumptionSeries>().unwrap(),
            AssumptionSeries::EarningsMargin
        );
        assert!("ebitda".parse::<AssumptionSeries>().is_err());
    }

    #[test]
    fn test_constant_scenario() {
        let scenario = ScenarioAssumptions::constant(&[2024, 2025], 0.1, 0.2, 0.05);
        assert_eq!(scenario.years(), vec![2024, 2025]);
        assert_eq!(scenario.get(AssumptionSeries::EarningsMargin, 2024).unwrap(), 0.2);
        assert!(scenario.validate_for(&[2024, 2025]).is_ok());
    }

    #[test]
    fn test_validate_reports_first_gap() {
        let mut scenario = ScenarioAssumptions::constant(&[2024, 2025, 2026], 0.1, 0.2, 0.05);
        scenario.invested_capital_growth.remove(&2025);
        scenario.earnings_margin.remove(&2026);

        let err = scenario.validate_for(&[2024, 2025, 2026]).unwrap_err();
        assert_eq!(
            err,
            ValuationError::ScenarioIncomplete {
                series: AssumptionSeries::InvestedCapitalGrowth,
                year: 2025,
            }
        );
    }

    #[test]
    fn test_validate_rejects_nan() {
        let mut scenario = ScenarioAssumptions::constant(&[2024], 0.1, 0.2, 0.05);
        scenario.set(AssumptionSeries::RevenueGrowth, 2024, f64::NAN);
        match scenario.validate_for(&[2024]).unwrap_err() {
            ValuationError::InvalidInput { field, .. } => assert_eq!(field, "revenueGrowth@2024"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_scenario_boundary_names() {
        let scenario = ScenarioAssumptions::constant(&[2024], 0.1, 0.2, 0.05);
        let json = serde_json::to_value(&scenario).unwrap();
        assert!(json.get("revenue_gr").is_some());
        assert!(json.get("earnings_margin").is_some());
        assert!(json.get("ic_gr").is_some());

        let parsed: ScenarioAssumptions = serde_json::from_str(
            r#"{"revenue_gr":{"2024":0.1},"earnings_margin":{"2024":0.2},"ic_gr":{"2024":0.05}}"#,
        )
        .unwrap();
        assert_eq!(parsed, scenario);
    }

    #[test]
    fn test_parameters_validate() {
        assert!(ValuationParameters::new(0.10, 0.03).validate().is_ok());

        let err = ValuationParameters::new(0.03, 0.03).validate().unwrap_err();
        assert!(err.is_divergent());

        let err = ValuationParameters::new(0.02, 0.03).validate().unwrap_err();
        assert_eq!(
            err,
            ValuationError::DivergentTerminalValue {
                discount_rate: 0.02,
                terminal_growth_rate: 0.03,
            }
        );

        assert!(ValuationParameters::new(f64::INFINITY, 0.03).validate().is_err());
        assert!(ValuationParameters::new(0.10, 0.03)
            .with_terminal_multiple(f64::NAN)
            .validate()
            .is_err());
    }

    #[test]
    fn test_parameters_serde_defaults() {
        let params: ValuationParameters =
            serde_json::from_str(r#"{"discountRate":0.1,"terminalGrowthRate":0.03}"#).unwrap();
        assert_eq!(params, ValuationParameters::new(0.1, 0.03));
        assert!(params.terminal_year_multiple.is_none());
        assert!(params.net_debt.is_none());
    }
}
