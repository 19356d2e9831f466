use async_trait::async_trait;
use rates_core::HistoryRow;

use super::BoxError;

/// Transactional append-only store for history rows.
///
/// Errors are returned raw; the history repository attaches the leg and
/// phase before they leave the persistence layer.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    type Transaction: LedgerTransaction;

    async fn begin(&self) -> Result<Self::Transaction, BoxError>;
}

/// An open ledger transaction.
///
/// Rows written through `insert` become visible only after `commit`.
/// Dropping a transaction without committing discards its rows.
#[async_trait]
pub trait LedgerTransaction: Send {
    async fn insert(&mut self, row: &HistoryRow) -> Result<(), BoxError>;

    async fn commit(self) -> Result<(), BoxError>;

    async fn rollback(self) -> Result<(), BoxError>;
}
