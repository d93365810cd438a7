//! Value types shared by every layer.
//!
//! This module provides:
//! - `Year` and year-axis validation (`year`)
//! - `FinancialLineItem` and `LineRole` (`line_item`)
//! - `ScenarioAssumptions` and `ValuationParameters` (`assumptions`)
//! - `ValuationError` and `IngestError` (`error`)

pub mod assumptions;
pub mod error;
pub mod line_item;
pub mod year;

pub use assumptions::{AssumptionSeries, ScenarioAssumptions, ValuationParameters};
pub use error::{IngestError, ValuationError};
pub use line_item::{FinancialLineItem, LineRole};
pub use year::Year;
