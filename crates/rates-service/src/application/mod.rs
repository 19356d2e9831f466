pub mod ports;
pub mod use_cases;

pub use ports::{
    BoxError, DbError, DbOperation, ErrorChain, FetchError, HistoryRepository, LedgerStore, LedgerTransaction,
    NoopObservability, Observability, Outcome, QuoteSource,
};
pub use use_cases::{CallContext, GetRatesUseCase, RatesError, RatesService};
