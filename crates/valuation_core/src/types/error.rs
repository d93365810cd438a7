//! Error types for structured error handling.
//!
//! This module provides:
//! - `ValuationError`: Errors from forecasting, valuation and scenario validation
//! - `IngestError`: Errors from the historical ingest boundary
//!
//! Every variant carries the offending line, series, year or field so a
//! caller can correct its input without guessing.

use super::assumptions::AssumptionSeries;
use super::year::Year;
use thiserror::Error;

/// Categorised valuation errors.
///
/// # Variants
/// - `MissingLineItem`: A required historical line is absent
/// - `ScenarioIncomplete`: An assumption series lacks a forecast year
/// - `InvalidInput`: Malformed input (non-positive shares, broken year axis, ...)
/// - `DivergentTerminalValue`: Discount rate does not exceed terminal growth
///
/// # Examples
/// ```
/// use valuation_core::types::{AssumptionSeries, ValuationError};
///
/// let err = ValuationError::ScenarioIncomplete {
///     series: AssumptionSeries::EarningsMargin,
///     year: 2025,
/// };
/// assert_eq!(
///     format!("{}", err),
///     "Scenario incomplete: earningsMargin has no entry for 2025"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValuationError {
    /// A required line item could not be found in the historical data.
    #[error("Missing line item: {line}")]
    MissingLineItem {
        /// Conventional name of the missing line
        line: String,
    },

    /// An assumption series has no value for a forecast year.
    #[error("Scenario incomplete: {series} has no entry for {year}")]
    ScenarioIncomplete {
        /// Series lacking the entry
        series: AssumptionSeries,
        /// Forecast year without a value
        year: Year,
    },

    /// Invalid input data or parameters.
    #[error("Invalid input: {field}: {reason}")]
    InvalidInput {
        /// Offending field
        field: String,
        /// Why the value was rejected
        reason: String,
    },

    /// Terminal value would diverge (discount rate <= terminal growth rate).
    #[error(
        "Divergent terminal value: discount rate {discount_rate} must exceed terminal growth rate {terminal_growth_rate}"
    )]
    DivergentTerminalValue {
        /// Discount rate supplied
        discount_rate: f64,
        /// Terminal growth rate supplied
        terminal_growth_rate: f64,
    },
}

impl ValuationError {
    /// Creates an `InvalidInput` error.
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValuationError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `MissingLineItem` error.
    pub fn missing_line(line: impl Into<String>) -> Self {
        ValuationError::MissingLineItem { line: line.into() }
    }

    /// Returns true if the error is a divergent terminal value.
    #[inline]
    pub fn is_divergent(&self) -> bool {
        matches!(self, ValuationError::DivergentTerminalValue { .. })
    }
}

/// Errors raised by a historical data source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    /// The source has no data for the symbol.
    #[error("No historical data for symbol: {0}")]
    SymbolNotFound(String),

    /// The source failed to produce data.
    #[error("Historical source error: {0}")]
    Source(String),
}
