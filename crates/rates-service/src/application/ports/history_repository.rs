use async_trait::async_trait;
use rates_core::{Depth, Leg};
use std::time::Duration;
use thiserror::Error;

use super::BoxError;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("failed to begin transaction for {leg}")]
    Begin {
        leg: Leg,
        #[source]
        source: BoxError,
    },

    #[error("failed to insert {leg} row")]
    Insert {
        leg: Leg,
        #[source]
        source: BoxError,
    },

    #[error("failed to commit {leg} transaction")]
    Commit {
        leg: Leg,
        #[source]
        source: BoxError,
    },

    #[error("{leg} transaction did not finish within {timeout:?}")]
    Timeout { leg: Leg, timeout: Duration },

    #[error("failed to connect to database")]
    Connect(#[source] BoxError),

    #[error("failed to run migrations")]
    Migrate(#[source] BoxError),
}

/// Persistence gateway for snapshot legs.
///
/// Each method runs in its own transaction. A failure of the bid leg does
/// not undo an ask leg that has already committed.
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    async fn insert_asks(&self, depth: &Depth) -> Result<(), DbError>;

    async fn insert_bids(&self, depth: &Depth) -> Result<(), DbError>;
}
