//! Valuation outputs.

use serde::{Deserialize, Serialize};
use valuation_core::types::Year;

/// How the terminal value was computed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TerminalValueMethod {
    /// `FCF * (1 + g) / (r - g)`
    PerpetuityGrowth,
    /// `FCF * multiple`
    ExitMultiple,
}

/// One explicit-period cash flow.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashFlowEntry {
    /// Forecast year
    pub year: Year,
    /// Projected earnings
    pub earnings: f64,
    /// Change in invested capital over the prior year
    pub net_reinvestment: f64,
    /// Earnings minus net reinvestment
    pub free_cash_flow: f64,
    /// `1 / (1 + r)^t`
    pub discount_factor: f64,
    /// `free_cash_flow * discount_factor`
    pub present_value: f64,
}

/// Ratios implied by the valuation. `None` where a denominator is zero.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpliedMultiples {
    /// EV / first-forecast-year revenue
    pub ev_to_revenue: Option<f64>,
    /// EV / first-forecast-year earnings
    pub ev_to_earnings: Option<f64>,
    /// EV / first-forecast-year invested capital
    pub ev_to_invested_capital: Option<f64>,
    /// Share of EV contributed by the terminal value
    pub terminal_value_share: Option<f64>,
    /// Terminal value / final-year FCF
    pub implied_exit_multiple: Option<f64>,
    /// Perpetuity growth consistent with the terminal value
    pub implied_terminal_growth: Option<f64>,
}

/// Result of one valuation.
///
/// Purely derived from a `(ForecastTable, ValuationParameters, shares)` triple.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationResult {
    /// PV of explicit period plus PV of terminal value
    pub enterprise_value: f64,
    /// Enterprise value less net debt
    pub equity_value: f64,
    /// Equity value per share
    pub per_share_value: f64,
    /// Sum of discounted explicit-period cash flows
    pub present_value_of_explicit_period: f64,
    /// Discounted terminal value
    pub present_value_of_terminal_value: f64,
    /// Undiscounted terminal value
    pub terminal_value: f64,
    /// Terminal value method applied
    pub terminal_method: TerminalValueMethod,
    /// Net debt deducted (zero when not supplied)
    pub net_debt: f64,
    /// Whether net debt was supplied by the caller
    pub net_debt_supplied: bool,
    /// Share count used for `per_share_value`
    pub shares_outstanding: f64,
    /// Explicit-period schedule
    pub cash_flows: Vec<CashFlowEntry>,
    /// Derived ratios
    pub implied_multiples: ImpliedMultiples,
}
