//! Sensitivity grid results.

use super::variable::SensitivityVariable;
use crate::valuation::ValuationResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Valuation output reported in each cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutputField {
    /// Equity value per share
    #[default]
    PerShareValue,
    /// Equity value
    EquityValue,
    /// Enterprise value
    EnterpriseValue,
}

impl OutputField {
    /// Reads this field from a valuation result.
    #[inline]
    pub fn extract(&self, result: &ValuationResult) -> f64 {
        match self {
            OutputField::PerShareValue => result.per_share_value,
            OutputField::EquityValue => result.equity_value,
            OutputField::EnterpriseValue => result.enterprise_value,
        }
    }
}

/// Why a cell carries the divergent sentinel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DivergenceCause {
    /// Discount rate at or below terminal growth
    #[default]
    TerminalValue,
    /// Cell did not resolve before the timeout deadline
    Timeout,
}

/// Outcome of one grid cell.
///
/// Non-value variants are sentinels: a failure in one cell never
/// invalidates the rest of the grid. Timed-out cells share the divergent
/// sentinel and differ only in `cause`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SensitivityCell {
    /// Computed output value
    Value {
        /// Output field value
        value: f64,
    },
    /// No finite value: divergent terminal value or timeout
    Divergent {
        /// What made the cell divergent
        #[serde(default)]
        cause: DivergenceCause,
    },
    /// Any other evaluation error
    Failed {
        /// Error message from the failed evaluation
        reason: String,
    },
    /// Skipped because the analysis was cancelled
    NotComputed,
}

impl SensitivityCell {
    /// Sentinel for a divergent terminal value.
    pub fn divergent() -> Self {
        SensitivityCell::Divergent {
            cause: DivergenceCause::TerminalValue,
        }
    }

    /// Sentinel for a cell cut off by the timeout.
    pub fn timed_out() -> Self {
        SensitivityCell::Divergent {
            cause: DivergenceCause::Timeout,
        }
    }

    /// Whether the cell carries the divergent sentinel, whatever the cause.
    pub fn is_divergent(&self) -> bool {
        matches!(self, SensitivityCell::Divergent { .. })
    }

    /// Output value, if computed.
    #[inline]
    pub fn value(&self) -> Option<f64> {
        match self {
            SensitivityCell::Value { value } => Some(*value),
            _ => None,
        }
    }

    /// Whether the cell holds a value.
    pub fn is_value(&self) -> bool {
        matches!(self, SensitivityCell::Value { .. })
    }
}

impl fmt::Display for SensitivityCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensitivityCell::Value { value } => write!(f, "{value:.2}"),
            SensitivityCell::Divergent {
                cause: DivergenceCause::TerminalValue,
            } => f.write_str("divergent"),
            SensitivityCell::Divergent {
                cause: DivergenceCause::Timeout,
            } => f.write_str("divergent (timeout)"),
            SensitivityCell::Failed { .. } => f.write_str("failed"),
            SensitivityCell::NotComputed => f.write_str("-"),
        }
    }
}

/// One rendered axis of a grid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridAxis {
    /// Knob perturbed
    pub variable: SensitivityVariable,
    /// Deltas in caller order
    pub deltas: Vec<f64>,
    /// `base + delta` for scalar knobs; `None` for whole-series knobs
    pub values: Option<Vec<f64>>,
}

/// Two-dimensional valuation outcomes.
///
/// `cells[i][j]` is the output for `row_axis.deltas[i]` combined with
/// `col_axis.deltas[j]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensitivityGrid {
    /// First (x) axis
    pub row_axis: GridAxis,
    /// Second (y) axis
    pub col_axis: GridAxis,
    /// Output field reported
    pub output: OutputField,
    /// Cell outcomes, `rows x cols`
    pub cells: Vec<Vec<SensitivityCell>>,
}

impl SensitivityGrid {
    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.col_axis.deltas.len()
    }

    /// Cell at `(row, col)`.
    pub fn cell(&self, row: usize, col: usize) -> Option<&SensitivityCell> {
        self.cells.get(row).and_then(|r| r.get(col))
    }

    /// Iterates every cell in row-major order.
    pub fn iter_cells(&self) -> impl Iterator<Item = &SensitivityCell> {
        self.cells.iter().flatten()
    }

    /// Number of cells holding a value.
    pub fn computed_count(&self) -> usize {
        self.iter_cells().filter(|c| c.is_value()).count()
    }

    /// Number of cells holding a sentinel.
    pub fn sentinel_count(&self) -> usize {
        self.iter_cells().filter(|c| !c.is_value()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(variable: SensitivityVariable, deltas: Vec<f64>) -> GridAxis {
        GridAxis {
            variable,
            deltas,
            values: None,
        }
    }

    #[test]
    fn test_grid_counts() {
        let grid = SensitivityGrid {
            row_axis: axis(SensitivityVariable::DiscountRate, vec![0.0, 0.01]),
            col_axis: axis(SensitivityVariable::TerminalGrowthRate, vec![0.0]),
            output: OutputField::PerShareValue,
            cells: vec![
                vec![SensitivityCell::Value { value: 10.0 }],
                vec![SensitivityCell::divergent()],
            ],
        };
        assert_eq!(grid.rows(), 2);
        assert_eq!(grid.cols(), 1);
        assert_eq!(grid.computed_count(), 1);
        assert_eq!(grid.sentinel_count(), 1);
        assert_eq!(grid.cell(0, 0).and_then(|c| c.value()), Some(10.0));
        assert!(grid.cell(2, 0).is_none());
    }

    #[test]
    fn test_cell_serialisation_markers() {
        let json = serde_json::to_value(SensitivityCell::divergent()).unwrap();
        assert_eq!(json["status"], "divergent");
        assert_eq!(json["cause"], "terminalValue");

        let json = serde_json::to_value(SensitivityCell::timed_out()).unwrap();
        assert_eq!(json["status"], "divergent");
        assert_eq!(json["cause"], "timeout");

        let json = serde_json::to_value(SensitivityCell::Value { value: 1.5 }).unwrap();
        assert_eq!(json["status"], "value");
        assert_eq!(json["value"], 1.5);
    }

    #[test]
    fn test_divergent_marker_without_cause_deserialises() {
        let cell: SensitivityCell = serde_json::from_str(r#"{"status":"divergent"}"#).unwrap();
        assert_eq!(cell, SensitivityCell::divergent());
        assert!(SensitivityCell::timed_out().is_divergent());
        assert!(!SensitivityCell::NotComputed.is_divergent());
    }

    #[test]
    fn test_cell_display() {
        assert_eq!(SensitivityCell::Value { value: 12.3456 }.to_string(), "12.35");
        assert_eq!(SensitivityCell::timed_out().to_string(), "divergent (timeout)");
        assert_eq!(SensitivityCell::NotComputed.to_string(), "-");
    }
}
