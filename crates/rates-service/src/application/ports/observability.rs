use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Success,
    Error,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Error => "error",
        }
    }
}

/// Phases of a leg transaction that report an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DbOperation {
    BeginTransaction,
    InsertOrder,
    CommitTransaction,
}

impl DbOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            DbOperation::BeginTransaction => "begin_transaction",
            DbOperation::InsertOrder => "insert_order",
            DbOperation::CommitTransaction => "commit_transaction",
        }
    }
}

/// Sink for counters and durations emitted along the request path.
///
/// Injected into each component instead of living in process globals so
/// tests can substitute a recorder. Implementations must tolerate
/// concurrent calls.
pub trait Observability: Send + Sync {
    /// Outcome of one upstream fetch
    fn upstream_request(&self, outcome: Outcome);

    /// Duration of a named step of the GetRates flow
    fn observe_step(&self, step: &'static str, elapsed: Duration);

    /// Outcome of one phase of a leg transaction
    fn db_operation(&self, operation: DbOperation, outcome: Outcome);

    /// Duration of a named database stage
    fn observe_db(&self, operation: &'static str, elapsed: Duration);

    /// The use case accepted a call
    fn rates_request_received(&self);

    /// The use case returned a persisted snapshot
    fn rates_request_succeeded(&self);

    /// The RPC surface received a call
    fn rpc_request(&self);

    /// The RPC surface answered successfully
    fn rpc_response(&self);
}

/// Observability that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObservability;

impl Observability for NoopObservability {
    fn upstream_request(&self, _outcome: Outcome) {}
    fn observe_step(&self, _step: &'static str, _elapsed: Duration) {}
    fn db_operation(&self, _operation: DbOperation, _outcome: Outcome) {}
    fn observe_db(&self, _operation: &'static str, _elapsed: Duration) {}
    fn rates_request_received(&self) {}
    fn rates_request_succeeded(&self) {}
    fn rpc_request(&self) {}
    fn rpc_response(&self) {}
}
