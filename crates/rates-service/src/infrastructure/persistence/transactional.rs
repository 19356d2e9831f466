use async_trait::async_trait;
use rates_core::{Depth, HistoryRow, Leg};
use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, error, info, info_span, warn};

use crate::application::ports::{
    DbError, DbOperation, HistoryRepository, LedgerStore, LedgerTransaction, Observability,
    Outcome,
};

/// History repository that writes each leg in its own ledger transaction.
///
/// begin -> insert -> commit, with a rollback on insert failure. Every phase
/// reports its outcome to the observability sink. The whole transaction is
/// bounded by `timeout`; a transaction abandoned on timeout is dropped
/// uncommitted.
pub struct TransactionalHistory<L: LedgerStore> {
    ledger: L,
    observability: Arc<dyn Observability>,
    timeout: Duration,
}

impl<L: LedgerStore> TransactionalHistory<L> {
    pub fn new(ledger: L, observability: Arc<dyn Observability>, timeout: Duration) -> Self {
        Self {
            ledger,
            observability,
            timeout,
        }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    async fn insert_leg(&self, depth: &Depth, leg: Leg) -> Result<(), DbError> {
        let row = HistoryRow::from_depth(depth, leg);
        let span = info_span!("persist_leg", leg = %leg);

        match tokio::time::timeout(self.timeout, self.write(&row, leg))
            .instrument(span)
            .await
        {
            Ok(result) => result,
            Err(_) => {
                error!(leg = %leg, timeout_ms = self.timeout.as_millis() as u64, "Transaction timed out");
                Err(DbError::Timeout {
                    leg,
                    timeout: self.timeout,
                })
            }
        }
    }

    async fn write(&self, row: &HistoryRow, leg: Leg) -> Result<(), DbError> {
        let mut phase = PhaseTracker::new(self.observability.as_ref(), leg);

        phase.start(DbOperation::BeginTransaction);
        let mut tx = match self.ledger.begin().await {
            Ok(tx) => tx,
            Err(source) => {
                phase.finish(Outcome::Error);
                error!(leg = %leg, error = %source, "Failed to begin transaction");
                return Err(DbError::Begin { leg, source });
            }
        };
        phase.finish(Outcome::Success);
        info!(leg = %leg, "Transaction started");

        phase.start(DbOperation::InsertOrder);
        if let Err(source) = tx.insert(row).await {
            phase.finish(Outcome::Error);
            error!(leg = %leg, error = %source, "Failed to insert order data");
            if let Err(rollback) = tx.rollback().await {
                warn!(leg = %leg, error = %rollback, "Rollback failed");
            }
            return Err(DbError::Insert { leg, source });
        }
        phase.finish(Outcome::Success);

        phase.start(DbOperation::CommitTransaction);
        if let Err(source) = tx.commit().await {
            phase.finish(Outcome::Error);
            error!(leg = %leg, error = %source, "Failed to commit transaction");
            return Err(DbError::Commit { leg, source });
        }
        phase.finish(Outcome::Success);
        info!(leg = %leg, "Transaction committed");

        Ok(())
    }
}

/// Reports the outcome of each transaction phase.
///
/// A phase still open when the tracker is dropped was abandoned (a timeout
/// or the caller going away) and counts as an error.
struct PhaseTracker<'a> {
    observability: &'a dyn Observability,
    leg: Leg,
    current: Option<DbOperation>,
}

impl<'a> PhaseTracker<'a> {
    fn new(observability: &'a dyn Observability, leg: Leg) -> Self {
        Self {
            observability,
            leg,
            current: None,
        }
    }

    fn start(&mut self, operation: DbOperation) {
        self.current = Some(operation);
    }

    fn finish(&mut self, outcome: Outcome) {
        if let Some(operation) = self.current.take() {
            self.observability.db_operation(operation, outcome);
        }
    }
}

impl Drop for PhaseTracker<'_> {
    fn drop(&mut self) {
        if let Some(operation) = self.current.take() {
            self.observability.db_operation(operation, Outcome::Error);
            warn!(leg = %self.leg, operation = operation.as_str(), "Transaction abandoned mid-phase");
        }
    }
}

#[async_trait]
impl<L: LedgerStore> HistoryRepository for TransactionalHistory<L> {
    async fn insert_asks(&self, depth: &Depth) -> Result<(), DbError> {
        self.insert_leg(depth, Leg::Asks).await
    }

    async fn insert_bids(&self, depth: &Depth) -> Result<(), DbError> {
        self.insert_leg(depth, Leg::Bids).await
    }
}
