use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use super::BoxError;

/// Failure to obtain a payload from the upstream market-data endpoint.
///
/// Implementations convert their transport errors into this type so the
/// use case never sees a concrete HTTP client.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("upstream request failed")]
    Transport {
        #[source]
        source: BoxError,
    },

    #[error("upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("upstream request timed out after {0:?}")]
    Timeout(Duration),
}

/// Source of raw depth payloads.
///
/// One call is one outbound request; retries are not this port's concern.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<u8>, FetchError>;
}
