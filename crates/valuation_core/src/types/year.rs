//! Fiscal year axis helpers.
//!
//! A forecast table shares one year axis: contiguous historical years
//! followed by contiguous forecast years, with the first forecast year
//! immediately after the last historical year.

use super::error::ValuationError;

/// Integer fiscal year label.
pub type Year = i32;

/// Checks that `years` is strictly increasing in steps of one.
///
/// An empty or single-element slice is contiguous.
///
/// # Errors
///
/// Returns `ValuationError::InvalidInput` naming `field` and the first
/// offending pair.
///
/// # Examples
/// ```
/// use valuation_core::types::year::ensure_contiguous;
///
/// assert!(ensure_contiguous(&[2024, 2025, 2026], "forecast_years").is_ok());
/// assert!(ensure_contiguous(&[2024, 2026], "forecast_years").is_err());
/// ```
pub fn ensure_contiguous(years: &[Year], field: &str) -> Result<(), ValuationError> {
    for pair in years.windows(2) {
        if pair[1] != pair[0] + 1 {
            return Err(ValuationError::invalid_input(
                field,
                format!(
                    "years must be contiguous and strictly increasing, found {} followed by {}",
                    pair[0], pair[1]
                ),
            ));
        }
    }
    Ok(())
}

/// Checks that the forecast horizon starts right after the last historical year.
///
/// The years must equal `forecast_horizon(last_historical, forecast_years.len())`.
///
/// # Errors
///
/// Returns `ValuationError::InvalidInput` when the forecast years are not
/// contiguous or do not begin at `last_historical + 1`.
pub fn ensure_forecast_boundary(
    last_historical: Year,
    forecast_years: &[Year],
) -> Result<(), ValuationError> {
    ensure_contiguous(forecast_years, "forecast_years")?;
    if forecast_years == forecast_horizon(last_historical, forecast_years.len()).as_slice() {
        return Ok(());
    }
    let first = forecast_years.first().copied().unwrap_or_default();
    Err(ValuationError::invalid_input(
        "forecast_years",
        format!(
            "first forecast year {} must follow last historical year {}",
            first, last_historical
        ),
    ))
}

/// Builds `count` consecutive forecast years following `last_historical`.
///
/// # Examples
/// ```
/// use valuation_core::types::year::forecast_horizon;
///
/// assert_eq!(forecast_horizon(2023, 2), vec![2024, 2025]);
/// ```
pub fn forecast_horizon(last_historical: Year, count: usize) -> Vec<Year> {
    (1..=count as Year).map(|k| last_historical + k).collect()
}
