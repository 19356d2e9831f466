mod history_repository;
mod ledger;
mod observability;
mod quote_source;

pub use history_repository::{DbError, HistoryRepository};
pub use ledger::{LedgerStore, LedgerTransaction};
pub use observability::{DbOperation, NoopObservability, Observability, Outcome};
pub use quote_source::{FetchError, QuoteSource};

use std::error::Error;
use std::fmt;

/// Type-erased error carried as the source of port-level errors
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Displays an error followed by each of its sources, `: `-separated.
///
/// Error types here never repeat their source in their own message, so
/// this is the one place the full cause is spelled out.
pub struct ErrorChain<'a>(pub &'a (dyn Error + 'static));

impl fmt::Display for ErrorChain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)?;
        let mut source = self.0.source();
        while let Some(cause) = source {
            write!(f, ": {}", cause)?;
            source = cause.source();
        }
        Ok(())
    }
}
