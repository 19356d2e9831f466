pub mod config;
pub mod observability;
pub mod persistence;
pub mod quote_source;

pub use config::{CliArgs, ConfigError, DatabaseConfig, LogFormat, LogLevel, ServiceConfig};
pub use observability::{MetricsRegistry, TelemetryError, TelemetryGuard};
pub use persistence::{InMemoryLedger, LedgerPhase, PostgresLedger, TransactionalHistory};
pub use quote_source::HttpQuoteSource;
