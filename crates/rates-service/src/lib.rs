//! Rates Service
//!
//! Fetches the top of the USDT/RUB order book from an upstream depth API,
//! records the best ask and best bid in a history ledger and returns the
//! snapshot to the caller.
//!
//! # Architecture
//!
//! - **Application**: port traits (`QuoteSource`, `HistoryRepository`,
//!   `LedgerStore`, `Observability`) and the `GetRatesUseCase`
//! - **Infrastructure**: reqwest quote source, sqlx and in-memory ledgers,
//!   metrics registry, tracing setup, configuration
//! - **Presentation**: GetRates RPC over HTTP/JSON, health and metrics routes
//! - **Lifecycle**: listener startup and bounded graceful shutdown
//!
//! # Example
//!
//! ```ignore
//! use rates_service::{LifecycleConfig, Lifecycle, shutdown_signal};
//!
//! let controller = rates_service::build_controller(source, ledger, metrics, db_timeout);
//! let outcome = Lifecycle::new(LifecycleConfig::default(), Arc::new(controller))
//!     .run_until(shutdown_signal())
//!     .await?;
//! ```

pub mod application;
pub mod infrastructure;
pub mod lifecycle;
pub mod presentation;

use std::sync::Arc;
use std::time::Duration;

pub use application::{
    CallContext, GetRatesUseCase, HistoryRepository, LedgerStore, NoopObservability,
    Observability, QuoteSource, RatesError, RatesService,
};
pub use infrastructure::{
    HttpQuoteSource, InMemoryLedger, MetricsRegistry, PostgresLedger, ServiceConfig,
    TransactionalHistory,
};
pub use lifecycle::{
    Lifecycle, LifecycleConfig, LifecycleError, LifecycleState, Running, SHUTDOWN_TIMEOUT,
    ShutdownOutcome, shutdown_signal,
};
pub use presentation::{RatesController, RatesResponse, create_router};

/// Wire the GetRates stack over `ledger`
pub fn build_controller<Q, L>(
    quote_source: Q,
    ledger: L,
    metrics: Arc<MetricsRegistry>,
    db_timeout: Duration,
) -> RatesController
where
    Q: QuoteSource + 'static,
    L: LedgerStore + 'static,
{
    let observability: Arc<dyn Observability> = metrics;
    let history = TransactionalHistory::new(ledger, Arc::clone(&observability), db_timeout);
    let use_case = GetRatesUseCase::new(
        Arc::new(quote_source),
        Arc::new(history),
        Arc::clone(&observability),
    );
    RatesController::new(Arc::new(use_case), observability)
}
