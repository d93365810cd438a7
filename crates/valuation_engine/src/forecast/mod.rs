//! Forecast table construction.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │            Forecast Table Builder            │
//! ├──────────────────────────────────────────────┤
//! │  LineDriver        - Auxiliary row drivers   │
//! │  ProjectionPolicy  - Policy applied per row  │
//! │  ForecastTable     - Historical + forecast   │
//! │  ForecastTableBuilder - Year-by-year project │
//! └──────────────────────────────────────────────┘
//! ```

mod builder;
mod driver;
mod table;

pub use builder::ForecastTableBuilder;
pub use driver::{LineDriver, ProjectionPolicy};
pub use table::{ForecastTable, TableRow};
