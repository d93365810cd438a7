//! Valuation Calculator.
//!
//! Discounted free cash flow over the explicit forecast period plus a
//! terminal value:
//!
//! ```text
//! FCF[y] = Earnings[y] - (InvestedCapital[y] - InvestedCapital[y-1])
//! PV     = sum FCF[y] / (1 + r)^(y - first + 1)
//! TV     = FCF[last] * multiple                    (exit multiple)
//!        | FCF[last] * (1 + g) / (r - g)           (perpetuity growth)
//! EV     = PV + TV / (1 + r)^n
//! ```

use super::result::{CashFlowEntry, ImpliedMultiples, TerminalValueMethod, ValuationResult};
use crate::forecast::ForecastTable;
use tracing::debug;
use valuation_core::types::{LineRole, ValuationError, ValuationParameters};

/// Stateless DCF calculator.
///
/// `evaluate` is a pure function of its inputs.
#[derive(Clone, Copy, Debug, Default)]
pub struct ValuationCalculator;

impl ValuationCalculator {
    /// Creates a calculator.
    pub fn new() -> Self {
        Self
    }

    /// Values the forecast table.
    ///
    /// # Arguments
    ///
    /// * `table` - Table with at least one forecast year
    /// * `params` - Discounting assumptions
    /// * `shares_outstanding` - Positive share count
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for non-positive shares, a table without forecast years,
    ///   or a non-finite outcome
    /// - `DivergentTerminalValue` when `discount_rate <= terminal_growth_rate`
    /// - `MissingLineItem` when the table lacks earnings or invested capital
    pub fn evaluate(
        &self,
        table: &ForecastTable,
        params: &ValuationParameters,
        shares_outstanding: f64,
    ) -> Result<ValuationResult, ValuationError> {
        if !(shares_outstanding.is_finite() && shares_outstanding > 0.0) {
            return Err(ValuationError::invalid_input(
                "shares_outstanding",
                format!("must be positive, got {shares_outstanding}"),
            ));
        }
        params.validate()?;

        let forecast_years = table.forecast_years();
        let (base_year, first) = match (table.last_historical_year(), table.first_forecast_year()) {
            (Some(base_year), Some(first)) => (base_year, first),
            _ => {
                return Err(ValuationError::invalid_input(
                    "forecast_years",
                    "table needs historical and forecast years to value",
                ))
            }
        };

        let rate = params.discount_rate;
        let mut cash_flows = Vec::with_capacity(forecast_years.len());
        let mut prev_capital = table.role_value(LineRole::InvestedCapital, base_year)?;
        for &year in forecast_years {
            let earnings = table.role_value(LineRole::Earnings, year)?;
            let capital = table.role_value(LineRole::InvestedCapital, year)?;
            let net_reinvestment = capital - prev_capital;
            let free_cash_flow = earnings - net_reinvestment;
            let periods = year - first + 1;
            let discount_factor = 1.0 / (1.0 + rate).powi(periods);
            cash_flows.push(CashFlowEntry {
                year,
                earnings,
                net_reinvestment,
                free_cash_flow,
                discount_factor,
                present_value: free_cash_flow * discount_factor,
            });
            prev_capital = capital;
        }

        let present_value_of_explicit_period: f64 =
            cash_flows.iter().map(|cf| cf.present_value).sum();
        let final_flow = cash_flows
            .last()
            .map(|cf| (cf.free_cash_flow, cf.discount_factor))
            .ok_or_else(|| ValuationError::invalid_input("forecast_years", "empty cash flow schedule"))?;
        let (final_fcf, final_discount) = final_flow;

        let (terminal_value, terminal_method) = match params.terminal_year_multiple {
            Some(multiple) => (final_fcf * multiple, TerminalValueMethod::ExitMultiple),
            None => (
                final_fcf * (1.0 + params.terminal_growth_rate)
                    / (rate - params.terminal_growth_rate),
                TerminalValueMethod::PerpetuityGrowth,
            ),
        };
        let present_value_of_terminal_value = terminal_value * final_discount;

        let enterprise_value = present_value_of_explicit_period + present_value_of_terminal_value;
        let net_debt = params.net_debt.unwrap_or(0.0);
        let equity_value = enterprise_value - net_debt;
        let per_share_value = equity_value / shares_outstanding;

        for (field, value) in [
            ("enterprise_value", enterprise_value),
            ("equity_value", equity_value),
            ("per_share_value", per_share_value),
        ] {
            if !value.is_finite() {
                return Err(ValuationError::invalid_input(
                    field,
                    format!("valuation produced a non-finite result ({value})"),
                ));
            }
        }

        let implied_multiples = ImpliedMultiples {
            ev_to_revenue: table
                .role_value(LineRole::Revenue, first)
                .ok()
                .and_then(|r| ratio(enterprise_value, r)),
            ev_to_earnings: ratio(enterprise_value, cash_flows[0].earnings),
            ev_to_invested_capital: table
                .role_value(LineRole::InvestedCapital, first)
                .ok()
                .and_then(|ic| ratio(enterprise_value, ic)),
            terminal_value_share: ratio(present_value_of_terminal_value, enterprise_value),
            implied_exit_multiple: ratio(terminal_value, final_fcf),
            implied_terminal_growth: ratio(terminal_value * rate - final_fcf, terminal_value + final_fcf),
        };

        debug!(
            base_year,
            first_year = first,
            years = forecast_years.len(),
            enterprise_value,
            per_share_value,
            "Valuation computed"
        );

        Ok(ValuationResult {
            enterprise_value,
            equity_value,
            per_share_value,
            present_value_of_explicit_period,
            present_value_of_terminal_value,
            terminal_value,
            terminal_method,
            net_debt,
            net_debt_supplied: params.net_debt.is_some(),
            shares_outstanding,
            cash_flows,
            implied_multiples,
        })
    }
}

#[inline]
fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        return None;
    }
    let value = numerator / denominator;
    value.is_finite().then_some(value)
}
