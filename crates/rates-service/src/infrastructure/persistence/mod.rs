mod in_memory;
mod postgres;
mod transactional;

pub use in_memory::{InMemoryLedger, InMemoryTransaction, InjectedFault, LedgerPhase};
pub use postgres::{INSERT_HISTORY_ROW, PostgresLedger, PostgresTransaction};
pub use transactional::TransactionalHistory;
