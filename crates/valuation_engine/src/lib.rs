//! # valuation_engine (L2: Engine)
//!
//! Scenario-driven DCF valuation of a single company.
//!
//! This crate provides:
//! - Forecast table construction from history plus scenario assumptions
//! - Free-cash-flow valuation with perpetuity-growth or exit-multiple terminal value
//! - Two-axis sensitivity grids with per-cell failure isolation
//! - Manual and heuristic scenario generation
//! - A request/response facade (`ValuationEngine`)
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          valuation_engine (L2)          │
//! ├─────────────────────────────────────────┤
//! │  api/         - ValuationEngine facade  │
//! │  forecast/    - ForecastTableBuilder    │
//! │  valuation/   - ValuationCalculator     │
//! │  sensitivity/ - SensitivityAnalyzer     │
//! │  scenario/    - ScenarioGenerator       │
//! │  parallel     - Rayon utilities         │
//! └─────────────────────────────────────────┘
//!          ↓
//! ┌─────────────────────────────────────────┐
//! │           valuation_core (L1)           │
//! │  Line items, assumptions, errors        │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Pipeline
//!
//! ```text
//! HistoricalSource ─► FinancialLineItem[] ─┐
//!                                           ├─► ForecastTable ─► ValuationResult
//! ScenarioGenerator ─► ScenarioAssumptions ─┘          ▲
//!                                                      │ per cell
//!                              SensitivityAnalyzer ────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use valuation_engine::forecast::ForecastTableBuilder;
//! use valuation_engine::valuation::ValuationCalculator;
//! use valuation_core::types::{FinancialLineItem, ScenarioAssumptions, ValuationParameters};
//!
//! let history = vec![
//!     FinancialLineItem::from_pairs("Revenue", false, [(2023, 1000.0)]),
//!     FinancialLineItem::from_pairs("EBIT", false, [(2023, 200.0)]),
//!     FinancialLineItem::from_pairs("Invested Capital", false, [(2023, 500.0)]),
//! ];
//! let scenario = ScenarioAssumptions::constant(&[2024, 2025], 0.10, 0.20, 0.05);
//!
//! let table = ForecastTableBuilder::new()
//!     .build(&history, &scenario, &[2024, 2025])
//!     .unwrap();
//! let result = ValuationCalculator::new()
//!     .evaluate(&table, &ValuationParameters::new(0.10, 0.03), 100.0)
//!     .unwrap();
//! assert!((result.per_share_value - result.equity_value / 100.0).abs() < 1e-12);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod api;
pub mod error;
pub mod forecast;
pub mod parallel;
pub mod scenario;
pub mod sensitivity;
pub mod valuation;

pub use api::{
    EvaluateRequest, EvaluateResponse, ScenarioRequest, ScenarioResponse, SensitivityRequest,
    SensitivityResponse, ValuationEngine,
};
pub use error::{EngineError, EngineResult};
