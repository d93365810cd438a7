//! Sensitivity knobs and axes.
//!
//! A variable names one scalar knob:
//!
//! | Text | Knob |
//! |------|------|
//! | `revenueGrowth@allYears` | every year of a series |
//! | `earningsMargin@2025` | one year of a series |
//! | `discountRate` | a valuation parameter |
//! | `terminalGrowthRate` | a valuation parameter |
//! | `terminalYearMultiple` | a valuation parameter |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use valuation_core::types::{
    AssumptionSeries, ScenarioAssumptions, ValuationError, ValuationParameters, Year,
};

/// Which years of a series an axis perturbs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum YearScope {
    /// Every forecast year
    AllYears,
    /// A single forecast year
    Year(Year),
}

/// One scalar knob of the valuation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SensitivityVariable {
    /// A scenario series, whole or one year
    Assumption {
        /// Series perturbed
        series: AssumptionSeries,
        /// Years perturbed
        scope: YearScope,
    },
    /// `ValuationParameters::discount_rate`
    DiscountRate,
    /// `ValuationParameters::terminal_growth_rate`
    TerminalGrowthRate,
    /// `ValuationParameters::terminal_year_multiple`
    TerminalYearMultiple,
}

impl SensitivityVariable {
    /// Whole-series knob.
    pub fn all_years(series: AssumptionSeries) -> Self {
        SensitivityVariable::Assumption {
            series,
            scope: YearScope::AllYears,
        }
    }

    /// Single-year knob.
    pub fn single_year(series: AssumptionSeries, year: Year) -> Self {
        SensitivityVariable::Assumption {
            series,
            scope: YearScope::Year(year),
        }
    }

    /// Checks that the knob exists for this base case.
    ///
    /// # Errors
    ///
    /// `InvalidInput` when a year scope lies outside the forecast horizon or
    /// the exit multiple is perturbed without one being set.
    pub fn validate(
        &self,
        forecast_years: &[Year],
        params: &ValuationParameters,
    ) -> Result<(), ValuationError> {
        match self {
            SensitivityVariable::Assumption {
                scope: YearScope::Year(year),
                ..
            } if !forecast_years.contains(year) => Err(ValuationError::invalid_input(
                self.to_string(),
                format!("year {year} is not a forecast year"),
            )),
            SensitivityVariable::TerminalYearMultiple if params.terminal_year_multiple.is_none() => {
                Err(ValuationError::invalid_input(
                    self.to_string(),
                    "base case has no terminal multiple to perturb",
                ))
            }
            _ => Ok(()),
        }
    }

    /// Adds `delta` to this knob in the given scenario and parameters.
    ///
    /// # Errors
    ///
    /// `ScenarioIncomplete` if a single-year knob targets a missing entry,
    /// `InvalidInput` if the exit multiple is absent.
    pub fn apply(
        &self,
        scenario: &mut ScenarioAssumptions,
        params: &mut ValuationParameters,
        delta: f64,
    ) -> Result<(), ValuationError> {
        match *self {
            SensitivityVariable::Assumption {
                series,
                scope: YearScope::AllYears,
            } => {
                for value in scenario.series_mut(series).values_mut() {
                    *value += delta;
                }
            }
            SensitivityVariable::Assumption {
                series,
                scope: YearScope::Year(year),
            } => {
                let base = scenario.get(series, year)?;
                scenario.set(series, year, base + delta);
            }
            SensitivityVariable::DiscountRate => params.discount_rate += delta,
            SensitivityVariable::TerminalGrowthRate => params.terminal_growth_rate += delta,
            SensitivityVariable::TerminalYearMultiple => match params.terminal_year_multiple.as_mut() {
                Some(multiple) => *multiple += delta,
                None => {
                    return Err(ValuationError::invalid_input(
                        self.to_string(),
                        "base case has no terminal multiple to perturb",
                    ))
                }
            },
        }
        Ok(())
    }

    /// Base value of a scalar knob; `None` for whole-series knobs.
    pub fn base_value(
        &self,
        scenario: &ScenarioAssumptions,
        params: &ValuationParameters,
    ) -> Option<f64> {
        match *self {
            SensitivityVariable::Assumption {
                scope: YearScope::AllYears,
                ..
            } => None,
            SensitivityVariable::Assumption {
                series,
                scope: YearScope::Year(year),
            } => scenario.get(series, year).ok(),
            SensitivityVariable::DiscountRate => Some(params.discount_rate),
            SensitivityVariable::TerminalGrowthRate => Some(params.terminal_growth_rate),
            SensitivityVariable::TerminalYearMultiple => params.terminal_year_multiple,
        }
    }
}

impl fmt::Display for SensitivityVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensitivityVariable::Assumption {
                series,
                scope: YearScope::AllYears,
            } => write!(f, "{series}@allYears"),
            SensitivityVariable::Assumption {
                series,
                scope: YearScope::Year(year),
            } => write!(f, "{series}@{year}"),
            SensitivityVariable::DiscountRate => f.write_str("discountRate"),
            SensitivityVariable::TerminalGrowthRate => f.write_str("terminalGrowthRate"),
            SensitivityVariable::TerminalYearMultiple => f.write_str("terminalYearMultiple"),
        }
    }
}

impl FromStr for SensitivityVariable {
    type Err = ValuationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed {
            "discountRate" => return Ok(SensitivityVariable::DiscountRate),
            "terminalGrowthRate" => return Ok(SensitivityVariable::TerminalGrowthRate),
            "terminalYearMultiple" => return Ok(SensitivityVariable::TerminalYearMultiple),
            _ => {}
        }

        let (name, scope) = match trimmed.split_once('@') {
            Some((name, scope)) => (name, Some(scope)),
            None => (trimmed, None),
        };
        let series: AssumptionSeries = name.parse().map_err(|_| {
            ValuationError::invalid_input("variable", format!("unknown sensitivity variable '{s}'"))
        })?;
        let scope = match scope {
            None | Some("allYears") => YearScope::AllYears,
            Some(year) => YearScope::Year(year.parse().map_err(|_| {
                ValuationError::invalid_input(
                    "variable",
                    format!("invalid year scope '{year}' in '{s}'"),
                )
            })?),
        };
        Ok(SensitivityVariable::Assumption { series, scope })
    }
}

impl TryFrom<String> for SensitivityVariable {
    type Error = ValuationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SensitivityVariable> for String {
    fn from(value: SensitivityVariable) -> Self {
        value.to_string()
    }
}

/// A knob plus the deltas to apply, in caller order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensitivityAxis {
    /// Knob perturbed along this axis
    pub variable: SensitivityVariable,
    /// Additive perturbations, not reordered or deduplicated
    pub deltas: Vec<f64>,
}

impl SensitivityAxis {
    /// Creates an axis.
    pub fn new(variable: SensitivityVariable, deltas: impl Into<Vec<f64>>) -> Self {
        Self {
            variable,
            deltas: deltas.into(),
        }
    }

    /// Number of points on the axis.
    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    /// Whether the axis has no points.
    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    pub(crate) fn validate(
        &self,
        forecast_years: &[Year],
        params: &ValuationParameters,
    ) -> Result<(), ValuationError> {
        self.variable.validate(forecast_years, params)?;
        if let Some(bad) = self.deltas.iter().find(|d| !d.is_finite()) {
            return Err(ValuationError::invalid_input(
                format!("{}.deltas", self.variable),
                format!("deltas must be finite, got {bad}"),
            ));
        }
        Ok(())
    }
}
