//! Historical Ingest Adapter abstraction.
//!
//! Provides:
//! - `HistoricalSource`: supplies normalised historical line items per symbol
//! - `InMemoryHistoricalSource`: map-backed implementation for tests and file loaders

use crate::types::{FinancialLineItem, IngestError};
use std::collections::HashMap;

/// Supplier of normalised historical financial line items.
///
/// # Examples
/// ```
/// use valuation_core::traits::{HistoricalSource, InMemoryHistoricalSource};
/// use valuation_core::types::FinancialLineItem;
///
/// let source = InMemoryHistoricalSource::new().with_symbol(
///     "ACME",
///     vec![FinancialLineItem::from_pairs("Revenue", false, [(2023, 1000.0)])],
/// );
/// let items = source.get_historical_line_items("ACME").unwrap();
/// assert_eq!(items.len(), 1);
/// assert!(source.get_historical_line_items("NOPE").is_err());
/// ```
pub trait HistoricalSource {
    /// Returns the historical rows for `symbol`.
    ///
    /// # Errors
    ///
    /// `IngestError::SymbolNotFound` when the symbol is unknown, or
    /// `IngestError::Source` when the underlying store fails.
    fn get_historical_line_items(&self, symbol: &str) -> Result<Vec<FinancialLineItem>, IngestError>;
}

/// Map-backed historical source.
///
/// Symbols are matched case-insensitively.
#[derive(Clone, Debug, Default)]
pub struct InMemoryHistoricalSource {
    items: HashMap<String, Vec<FinancialLineItem>>,
}

impl InMemoryHistoricalSource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the rows for `symbol`.
    pub fn insert(&mut self, symbol: impl AsRef<str>, items: Vec<FinancialLineItem>) {
        self.items.insert(symbol.as_ref().to_uppercase(), items);
    }

    /// Builder-style `insert`.
    pub fn with_symbol(mut self, symbol: impl AsRef<str>, items: Vec<FinancialLineItem>) -> Self {
        self.insert(symbol, items);
        self
    }

    /// Number of symbols held.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the source holds no symbols.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl HistoricalSource for InMemoryHistoricalSource {
    fn get_historical_line_items(&self, symbol: &str) -> Result<Vec<FinancialLineItem>, IngestError> {
        self.items
            .get(&symbol.to_uppercase())
            .cloned()
            .ok_or_else(|| IngestError::SymbolNotFound(symbol.to_string()))
    }
}
