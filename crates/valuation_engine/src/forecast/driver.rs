//! Projection policies for rows not driven by scenario assumptions.
//!
//! Revenue, earnings and invested capital always follow the scenario.
//! Every other row follows a `LineDriver`; without one it is held flat
//! at its last historical value. The policy actually applied to each row
//! is recorded on the built table as a `ProjectionPolicy`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use valuation_core::types::{AssumptionSeries, Year};

/// Caller-supplied driver for an auxiliary row.
///
/// Externally tagged: `"holdFlat"`, `{"constantGrowth": {"rate": 0.02}}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LineDriver {
    /// Carry the last historical value into every forecast year
    HoldFlat,
    /// Compound the last historical value at a fixed rate
    ConstantGrowth {
        /// Annual growth as a decimal fraction
        rate: f64,
    },
    /// Keep the last historical ratio to revenue
    PercentOfRevenue,
    /// Use caller-provided values for every forecast year
    Explicit {
        /// Values by forecast year
        values: BTreeMap<Year, f64>,
    },
}

/// Policy recorded for each row of a built table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ProjectionPolicy {
    /// No forecast years were requested
    HistoricalOnly,
    /// Compounded by a scenario growth series
    Growth {
        /// Driving series
        series: AssumptionSeries,
    },
    /// Revenue multiplied by the scenario margin series
    Margin {
        /// Driving series
        series: AssumptionSeries,
    },
    /// Held at the last historical value
    HoldFlat {
        /// Year the carried value was taken from
        from_year: Year,
    },
    /// Compounded at a caller-supplied rate
    ConstantGrowth {
        /// Annual growth
        rate: f64,
    },
    /// Fixed ratio to projected revenue
    PercentOfRevenue {
        /// Ratio taken at the last historical year
        ratio: f64,
    },
    /// Caller-supplied values
    Explicit,
}

impl ProjectionPolicy {
    /// Short human-readable description.
    pub fn describe(&self) -> String {
        match self {
            ProjectionPolicy::HistoricalOnly => "historical only".to_string(),
            ProjectionPolicy::Growth { series } => format!("compounded by {series}"),
            ProjectionPolicy::Margin { series } => format!("revenue x {series}"),
            ProjectionPolicy::HoldFlat { from_year } => format!("held flat at {from_year} value"),
            ProjectionPolicy::ConstantGrowth { rate } => {
                format!("constant growth {:.2}%", rate * 100.0)
            }
            ProjectionPolicy::PercentOfRevenue { ratio } => {
                format!("{:.2}% of revenue", ratio * 100.0)
            }
            ProjectionPolicy::Explicit => "explicit values".to_string(),
        }
    }
}
