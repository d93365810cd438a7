//! Engine error type.
//!
//! Wraps the foundation taxonomy with the ingest boundary so the facade
//! has a single error type. Variant payloads are never flattened into
//! strings: callers can still match on the field, series or year.

use thiserror::Error;
use valuation_core::types::{IngestError, ValuationError};

/// Errors surfaced by [`crate::ValuationEngine`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Forecast, valuation or scenario validation failed
    #[error(transparent)]
    Valuation(#[from] ValuationError),

    /// The historical source could not supply data
    #[error(transparent)]
    Ingest(#[from] IngestError),
}

impl EngineError {
    /// The wrapped valuation error, if any.
    pub fn as_valuation(&self) -> Option<&ValuationError> {
        match self {
            EngineError::Valuation(err) => Some(err),
            EngineError::Ingest(_) => None,
        }
    }
}

/// Result alias for facade operations.
pub type EngineResult<T> = Result<T, EngineError>;
