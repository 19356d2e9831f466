//! Rates Core Domain
//!
//! Pure domain types for the rates ingestion service: the quote snapshot
//! (`Depth`), its legs, the history rows written per leg, and the
//! normalizer that turns an upstream depth payload into a snapshot.
//! This crate contains no async and no I/O.

pub mod entities;
pub mod error;
pub mod normalizer;

pub use entities::{Depth, DepthEnvelope, HistoryRow, Leg, Order};
pub use error::ParseError;
pub use normalizer::normalize;
