//! Collaborator traits at the edge of the valuation pipeline.
//!
//! This module defines:
//! - Historical data ingestion (`HistoricalSource` trait)
//!
//! The ingest boundary is the only place that may perform I/O. It is
//! called once, synchronously, before any projection begins.

pub mod historical;

pub use historical::{HistoricalSource, InMemoryHistoricalSource};
