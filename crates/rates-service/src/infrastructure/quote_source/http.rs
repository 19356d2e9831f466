use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use crate::application::ports::{FetchError, QuoteSource};

/// Longest slice of a non-2xx body kept in the error
const ERROR_BODY_LIMIT: usize = 256;

/// Depth source backed by a single HTTP GET.
/// Infrastructure component - converts reqwest errors to the port's FetchError
#[derive(Clone)]
pub struct HttpQuoteSource {
    client: Client,
    url: String,
    timeout: Duration,
}

impl HttpQuoteSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport {
                source: Box::new(e),
            })?;

        Ok(Self::with_client(client, url, timeout))
    }

    pub fn with_client(client: Client, url: impl Into<String>, timeout: Duration) -> Self {
        let url = url.into();
        info!(url = %url, timeout_ms = timeout.as_millis() as u64, "Quote source configured");
        HttpQuoteSource {
            client,
            url,
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Transport {
                source: Box::new(err),
            }
        }
    }
}

#[async_trait]
impl QuoteSource for HttpQuoteSource {
    async fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = resp.status();
        let body = resp.bytes().await.map_err(|e| self.classify(e))?;
        debug!(status = status.as_u16(), bytes = body.len(), "Upstream depth response");

        if !status.is_success() {
            let text = String::from_utf8_lossy(&body);
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: text.chars().take(ERROR_BODY_LIMIT).collect(),
            });
        }

        Ok(body.to_vec())
    }
}
