use crate::application::ports::{
    DbError, ErrorChain, FetchError, HistoryRepository, Observability, Outcome, QuoteSource,
};
use async_trait::async_trait;
use rates_core::{Depth, ParseError, normalize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{Instrument, debug, error, info_span, warn};
use uuid::Uuid;

/// Per-call context inherited from the caller.
///
/// Carries the request id used in spans and an optional deadline that
/// bounds every suspension point of the call.
#[derive(Debug, Clone)]
pub struct CallContext {
    pub request_id: Uuid,
    pub deadline: Option<Instant>,
}

impl CallContext {
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            deadline: None,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Run `fut` until it completes or the deadline passes
    async fn bound<F: Future>(&self, stage: &'static str, fut: F) -> Result<F::Output, RatesError> {
        match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, fut)
                .await
                .map_err(|_| RatesError::DeadlineExceeded { stage }),
            None => Ok(fut.await),
        }
    }
}

impl Default for CallContext {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Error, Debug)]
pub enum RatesError {
    #[error("fetching depth")]
    Fetch(#[from] FetchError),

    #[error("decoding depth")]
    Parse(#[from] ParseError),

    #[error("persisting depth")]
    Db(#[from] DbError),

    #[error("deadline exceeded during {stage}")]
    DeadlineExceeded { stage: &'static str },
}

/// The GetRates use case as seen by the RPC surface
#[async_trait]
pub trait RatesService: Send + Sync {
    async fn get_rates(&self, ctx: &CallContext) -> Result<Depth, RatesError>;
}

/// Fetch, normalize, persist both legs, return the snapshot.
///
/// Strictly sequential and short-circuiting: the caller gets either a
/// snapshot whose two legs are both committed, or an error and no snapshot.
/// The ask leg is always written before the bid leg, each in its own
/// transaction, so a bid failure can leave a committed ask row behind.
pub struct GetRatesUseCase<Q, H>
where
    Q: QuoteSource,
    H: HistoryRepository,
{
    quote_source: Arc<Q>,
    history: Arc<H>,
    observability: Arc<dyn Observability>,
}

impl<Q, H> GetRatesUseCase<Q, H>
where
    Q: QuoteSource,
    H: HistoryRepository,
{
    pub fn new(
        quote_source: Arc<Q>,
        history: Arc<H>,
        observability: Arc<dyn Observability>,
    ) -> Self {
        Self {
            quote_source,
            history,
            observability,
        }
    }

    pub async fn execute(&self, ctx: &CallContext) -> Result<Depth, RatesError> {
        let span = info_span!("get_rates", request_id = %ctx.request_id);
        self.run(ctx).instrument(span).await
    }

    async fn run(&self, ctx: &CallContext) -> Result<Depth, RatesError> {
        debug!("Starting GetRates request");
        self.observability.rates_request_received();

        let fetch_started = Instant::now();
        let fetched = ctx.bound("fetch", self.quote_source.fetch()).await;
        let raw = match fetched {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                self.observability.upstream_request(Outcome::Error);
                error!(error = %ErrorChain(&e), "Upstream depth request failed");
                return Err(e.into());
            }
            Err(e) => {
                self.observability.upstream_request(Outcome::Error);
                error!(error = %e, "Upstream depth request abandoned");
                return Err(e);
            }
        };
        self.observability
            .observe_step("http_request", fetch_started.elapsed());
        self.observability.upstream_request(Outcome::Success);

        let depth = normalize(&raw).inspect_err(|e| {
            error!(error = %ErrorChain(e), bytes = raw.len(), "Failed to decode depth payload");
        })?;
        if depth.is_empty() {
            warn!("Upstream depth had no usable top of book, recording empty snapshot");
        }

        let persist_started = Instant::now();
        ctx.bound("insert_asks", self.history.insert_asks(&depth))
            .await?
            .inspect_err(|e| error!(error = %ErrorChain(e), "Failed to persist asks"))?;
        ctx.bound("insert_bids", self.history.insert_bids(&depth))
            .await?
            .inspect_err(|e| error!(error = %ErrorChain(e), "Failed to persist bids"))?;
        self.observability
            .observe_db("insert_to_db", persist_started.elapsed());

        self.observability.rates_request_succeeded();
        debug!(
            timestamp = depth.timestamp,
            ask = %depth.asks.price,
            bid = %depth.bids.price,
            "GetRates request completed"
        );
        Ok(depth)
    }
}

#[async_trait]
impl<Q, H> RatesService for GetRatesUseCase<Q, H>
where
    Q: QuoteSource,
    H: HistoryRepository,
{
    async fn get_rates(&self, ctx: &CallContext) -> Result<Depth, RatesError> {
        self.execute(ctx).await
    }
}
