//! Discounted-cash-flow valuation of a forecast table.

mod calculator;
mod result;

pub use calculator::ValuationCalculator;
pub use result::{CashFlowEntry, ImpliedMultiples, TerminalValueMethod, ValuationResult};
