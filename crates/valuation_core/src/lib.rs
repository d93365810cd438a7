//! # valuation_core: Foundation Types for Scenario Valuation
//!
//! ## Layer 1 (Foundation) Role
//!
//! valuation_core is the bottom layer of the valuation workspace, providing:
//! - Year axis helpers: `Year`, contiguity checks (`types::year`)
//! - Statement rows: `FinancialLineItem`, `LineRole` (`types::line_item`)
//! - Forecast inputs: `ScenarioAssumptions`, `ValuationParameters` (`types::assumptions`)
//! - Error types: `ValuationError`, `IngestError` (`types::error`)
//! - The Historical Ingest Adapter seam: `HistoricalSource` (`traits`)
//!
//! ## Zero Dependency Principle
//!
//! Layer 1 has no dependencies on other workspace crates, with minimal external dependencies:
//! - thiserror: Structured error derivation
//! - serde: Serialisation at the request/response boundary
//!
//! ## Usage Examples
//!
//! ```rust
//! use valuation_core::types::{FinancialLineItem, LineRole, ScenarioAssumptions, ValuationParameters};
//!
//! let revenue = FinancialLineItem::from_pairs("Revenue", false, [(2023, 1000.0)]);
//! assert_eq!(revenue.role(), Some(LineRole::Revenue));
//!
//! let scenario = ScenarioAssumptions::constant(&[2024, 2025], 0.10, 0.20, 0.05);
//! assert!(scenario.validate_for(&[2024, 2025]).is_ok());
//!
//! let params = ValuationParameters::new(0.10, 0.03);
//! assert!(params.validate().is_ok());
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod traits;
pub mod types;
