use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use rates_core::{HistoryRow, Leg};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

use crate::application::ports::{BoxError, LedgerStore, LedgerTransaction};

/// Phase of a ledger transaction, used to target injected faults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerPhase {
    Begin,
    Insert,
    Commit,
}

impl fmt::Display for LedgerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerPhase::Begin => write!(f, "begin"),
            LedgerPhase::Insert => write!(f, "insert"),
            LedgerPhase::Commit => write!(f, "commit"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("injected {phase} failure")]
pub struct InjectedFault {
    pub phase: LedgerPhase,
}

#[derive(Default)]
struct LedgerState {
    rows: RwLock<Vec<HistoryRow>>,
    faults: Mutex<Vec<(LedgerPhase, Option<Leg>)>>,
    stalled: Mutex<Option<LedgerPhase>>,
    begun: AtomicUsize,
    rollbacks: AtomicUsize,
}

impl LedgerState {
    fn take_fault(&self, phase: LedgerPhase, leg: Option<Leg>) -> bool {
        let mut faults = self.faults.lock();
        let hit = faults
            .iter()
            .position(|(p, l)| *p == phase && (l.is_none() || *l == leg));
        match hit {
            Some(pos) => {
                faults.remove(pos);
                true
            }
            None => false,
        }
    }

    async fn checkpoint(&self, phase: LedgerPhase, leg: Option<Leg>) -> Result<(), BoxError> {
        if *self.stalled.lock() == Some(phase) {
            std::future::pending::<()>().await;
        }
        if self.take_fault(phase, leg) {
            return Err(Box::new(InjectedFault { phase }));
        }
        Ok(())
    }
}

/// In-memory append-only ledger.
///
/// Rows are staged per transaction and appended on commit, so readers never
/// see uncommitted rows. Used when no database is configured and as the
/// store behind persistence tests, where faults can be injected per phase.
#[derive(Clone, Default)]
pub struct InMemoryLedger {
    state: Arc<LedgerState>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next matching phase once.
    ///
    /// `leg = None` matches any leg. Begin happens before a leg is known,
    /// so Begin faults only match with `None`.
    pub fn inject_fault(&self, phase: LedgerPhase, leg: Option<Leg>) {
        self.state.faults.lock().push((phase, leg));
    }

    /// Make every future `phase` hang forever
    pub fn stall(&self, phase: LedgerPhase) {
        *self.state.stalled.lock() = Some(phase);
    }

    /// Committed rows in commit order
    pub fn rows(&self) -> Vec<HistoryRow> {
        self.state.rows.read().clone()
    }

    pub fn len(&self) -> usize {
        self.state.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn transactions_begun(&self) -> usize {
        self.state.begun.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> usize {
        self.state.rollbacks.load(Ordering::SeqCst)
    }
}

pub struct InMemoryTransaction {
    state: Arc<LedgerState>,
    staged: Vec<HistoryRow>,
}

#[async_trait]
impl LedgerStore for InMemoryLedger {
    type Transaction = InMemoryTransaction;

    async fn begin(&self) -> Result<InMemoryTransaction, BoxError> {
        self.state.checkpoint(LedgerPhase::Begin, None).await?;
        self.state.begun.fetch_add(1, Ordering::SeqCst);
        Ok(InMemoryTransaction {
            state: Arc::clone(&self.state),
            staged: Vec::new(),
        })
    }
}

#[async_trait]
impl LedgerTransaction for InMemoryTransaction {
    async fn insert(&mut self, row: &HistoryRow) -> Result<(), BoxError> {
        self.state
            .checkpoint(LedgerPhase::Insert, Some(row.transcription_type))
            .await?;
        self.staged.push(row.clone());
        Ok(())
    }

    async fn commit(self) -> Result<(), BoxError> {
        let Self { state, staged } = self;
        let leg = staged.first().map(|row| row.transcription_type);
        state.checkpoint(LedgerPhase::Commit, leg).await?;
        state.rows.write().extend(staged);
        Ok(())
    }

    async fn rollback(self) -> Result<(), BoxError> {
        self.state.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
