//! Sensitivity analysis over two assumption axes.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │             Sensitivity Analyzer             │
//! ├──────────────────────────────────────────────┤
//! │  SensitivityVariable - One scalar knob       │
//! │  SensitivityAxis     - Knob + deltas         │
//! │  SensitivityAnalyzer - Per-cell re-valuation │
//! │  SensitivityGrid     - rows x cols outcomes  │
//! └──────────────────────────────────────────────┘
//! ```

mod analyzer;
mod grid;
mod variable;

pub use analyzer::{CancellationToken, SensitivityAnalyzer, SensitivityBase, SensitivityConfig};
pub use grid::{DivergenceCause, GridAxis, OutputField, SensitivityCell, SensitivityGrid};
pub use variable::{SensitivityAxis, SensitivityVariable, YearScope};
