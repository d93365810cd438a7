//! Unified historical + forecast table.

use super::driver::ProjectionPolicy;
use serde::{Deserialize, Serialize};
use valuation_core::types::year::{ensure_contiguous, ensure_forecast_boundary};
use valuation_core::types::{FinancialLineItem, LineRole, ValuationError, Year};

/// One table row: the line item plus the policy that produced its forecast values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    /// Historical values followed by forecast values
    pub item: FinancialLineItem,
    /// How the forecast values were produced
    pub policy: ProjectionPolicy,
}

/// Ordered line items sharing one year axis.
///
/// Historical years come first, then forecast years. A table is never
/// mutated after construction; recomputation builds a new table.
///
/// Deserialisation re-checks the year axis, so a table read back from JSON
/// holds the same invariants as one from `ForecastTableBuilder`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "TableParts")]
pub struct ForecastTable {
    historical_years: Vec<Year>,
    forecast_years: Vec<Year>,
    rows: Vec<TableRow>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableParts {
    historical_years: Vec<Year>,
    forecast_years: Vec<Year>,
    rows: Vec<TableRow>,
}

impl TryFrom<TableParts> for ForecastTable {
    type Error = ValuationError;

    fn try_from(parts: TableParts) -> Result<Self, Self::Error> {
        ensure_contiguous(&parts.historical_years, "historical_years")?;
        match parts.historical_years.last() {
            Some(&last) => ensure_forecast_boundary(last, &parts.forecast_years)?,
            None if !parts.forecast_years.is_empty() => {
                return Err(ValuationError::invalid_input(
                    "historical_years",
                    "forecast years need at least one historical year",
                ))
            }
            None => {}
        }
        Ok(Self::new(parts.historical_years, parts.forecast_years, parts.rows))
    }
}

impl ForecastTable {
    pub(crate) fn new(
        historical_years: Vec<Year>,
        forecast_years: Vec<Year>,
        rows: Vec<TableRow>,
    ) -> Self {
        Self {
            historical_years,
            forecast_years,
            rows,
        }
    }

    /// Reported years, ascending.
    pub fn historical_years(&self) -> &[Year] {
        &self.historical_years
    }

    /// Projected years, ascending.
    pub fn forecast_years(&self) -> &[Year] {
        &self.forecast_years
    }

    /// Full year axis.
    pub fn years(&self) -> impl Iterator<Item = Year> + '_ {
        self.historical_years
            .iter()
            .chain(self.forecast_years.iter())
            .copied()
    }

    /// Last reported year.
    pub fn last_historical_year(&self) -> Option<Year> {
        self.historical_years.last().copied()
    }

    /// First projected year.
    pub fn first_forecast_year(&self) -> Option<Year> {
        self.forecast_years.first().copied()
    }

    /// Whether `year` is a projected year.
    pub fn is_forecast_year(&self, year: Year) -> bool {
        self.forecast_years.binary_search(&year).is_ok()
    }

    /// All rows in input order.
    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    /// Row by exact (case-insensitive) name.
    pub fn line(&self, name: &str) -> Option<&TableRow> {
        self.rows
            .iter()
            .find(|row| row.item.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Projection policy applied to the named row.
    pub fn policy(&self, name: &str) -> Option<&ProjectionPolicy> {
        self.line(name).map(|row| &row.policy)
    }

    /// First row playing `role`.
    pub fn role_line(&self, role: LineRole) -> Option<&TableRow> {
        self.rows.iter().find(|row| row.item.role() == Some(role))
    }

    /// Value of the row playing `role` in `year`.
    ///
    /// # Errors
    ///
    /// - `MissingLineItem` if no row plays the role
    /// - `InvalidInput` if the row has no value for the year
    pub fn role_value(&self, role: LineRole, year: Year) -> Result<f64, ValuationError> {
        let row = self
            .role_line(role)
            .ok_or_else(|| ValuationError::missing_line(role.canonical_name()))?;
        row.item.value(year).ok_or_else(|| {
            ValuationError::invalid_input(
                format!("{}@{}", row.item.name(), year),
                "no value in table",
            )
        })
    }
}
