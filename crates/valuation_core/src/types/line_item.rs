//! Financial statement rows.
//!
//! Provides:
//! - `FinancialLineItem`: One named row with values keyed by fiscal year
//! - `LineRole`: The three rows the projection requires, found by name convention

use super::year::Year;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One row of a financial statement (e.g. Revenue, EBIT, Invested Capital).
///
/// Values are ordered by year. A line item is immutable once built; a
/// projection produces a new row rather than editing an existing one.
///
/// # Examples
/// ```
/// use valuation_core::types::FinancialLineItem;
///
/// let revenue = FinancialLineItem::from_pairs("Revenue", false, [(2022, 900.0), (2023, 1000.0)]);
/// assert_eq!(revenue.value(2023), Some(1000.0));
/// assert_eq!(revenue.last_value(), Some((2023, 1000.0)));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialLineItem {
    name: String,
    #[serde(default)]
    is_subtotal: bool,
    values_by_year: BTreeMap<Year, f64>,
}

impl FinancialLineItem {
    /// Creates a line item from an ordered map of values.
    pub fn new(
        name: impl Into<String>,
        is_subtotal: bool,
        values_by_year: BTreeMap<Year, f64>,
    ) -> Self {
        Self {
            name: name.into(),
            is_subtotal,
            values_by_year,
        }
    }

    /// Creates a line item from `(year, value)` pairs.
    pub fn from_pairs(
        name: impl Into<String>,
        is_subtotal: bool,
        pairs: impl IntoIterator<Item = (Year, f64)>,
    ) -> Self {
        Self::new(name, is_subtotal, pairs.into_iter().collect())
    }

    /// Row name as reported.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the row is a subtotal of other rows.
    pub fn is_subtotal(&self) -> bool {
        self.is_subtotal
    }

    /// Value for a year, if present.
    #[inline]
    pub fn value(&self, year: Year) -> Option<f64> {
        self.values_by_year.get(&year).copied()
    }

    /// All values ordered by year.
    pub fn values_by_year(&self) -> &BTreeMap<Year, f64> {
        &self.values_by_year
    }

    /// Years carrying a value, ascending.
    pub fn years(&self) -> impl Iterator<Item = Year> + '_ {
        self.values_by_year.keys().copied()
    }

    /// Most recent `(year, value)` pair.
    pub fn last_value(&self) -> Option<(Year, f64)> {
        self.values_by_year
            .iter()
            .next_back()
            .map(|(&y, &v)| (y, v))
    }

    /// Role of this row under the naming convention, if any.
    pub fn role(&self) -> Option<LineRole> {
        LineRole::classify(&self.name)
    }

    /// Returns a copy of this row extended with `extra` values.
    ///
    /// Existing years are left untouched.
    pub fn extended(&self, extra: impl IntoIterator<Item = (Year, f64)>) -> Self {
        let mut values_by_year = self.values_by_year.clone();
        for (year, value) in extra {
            values_by_year.entry(year).or_insert(value);
        }
        Self {
            name: self.name.clone(),
            is_subtotal: self.is_subtotal,
            values_by_year,
        }
    }
}

/// Rows the projection cannot proceed without.
///
/// Rows are matched by name: case-insensitive, trimmed, against a fixed
/// alias list per role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LineRole {
    /// Top-line revenue
    Revenue,
    /// Operating earnings (EBIT, NOPAT, net income, ...)
    Earnings,
    /// Capital base whose growth drives reinvestment
    InvestedCapital,
}

impl LineRole {
    /// All required roles, in projection order.
    pub const ALL: [LineRole; 3] = [
        LineRole::Revenue,
        LineRole::Earnings,
        LineRole::InvestedCapital,
    ];

    /// Accepted row names for this role (lower case).
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            LineRole::Revenue => &["revenue", "revenues", "total revenue", "sales", "net sales"],
            LineRole::Earnings => &[
                "earnings",
                "ebit",
                "operating income",
                "nopat",
                "net income",
            ],
            LineRole::InvestedCapital => &["invested capital", "ic", "total invested capital"],
        }
    }

    /// Name used in errors and for rows the builder creates.
    pub fn canonical_name(&self) -> &'static str {
        match self {
            LineRole::Revenue => "Revenue",
            LineRole::Earnings => "Earnings",
            LineRole::InvestedCapital => "Invested Capital",
        }
    }

    /// Classifies a row name.
    pub fn classify(name: &str) -> Option<LineRole> {
        let normalised = name.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|role| role.aliases().contains(&normalised.as_str()))
    }

    /// Finds the first row in `items` playing this role.
    pub fn find<'a>(&self, items: &'a [FinancialLineItem]) -> Option<&'a FinancialLineItem> {
        items.iter().find(|item| item.role() == Some(*self))
    }
}

impl fmt::Display for LineRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical_name())
    }
}
