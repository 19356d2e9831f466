use opentelemetry::KeyValue;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::{Resource, runtime, trace::TracerProvider};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt as log_fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::infrastructure::config::{LogFormat, LogLevel};

/// Resource `service.name` attached to every exported span
pub const SERVICE_NAME: &str = "GetRates";

/// Upper bound for one span export
pub const EXPORT_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("Invalid OTLP endpoint {endpoint:?}: {reason}")]
    Exporter { endpoint: String, reason: String },

    #[error("Failed to install tracing subscriber: {0}")]
    Install(String),
}

/// Handle on the installed subscriber and span exporter
#[must_use = "dropping the guard skips the final span export"]
pub struct TelemetryGuard {
    format: LogFormat,
    provider: TracerProvider,
}

impl fmt::Debug for TelemetryGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelemetryGuard")
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

impl TelemetryGuard {
    pub fn format(&self) -> LogFormat {
        self.format
    }

    /// Export buffered spans and stop the exporter. Runs after the
    /// listeners have stopped.
    pub async fn shutdown(self) {
        tracing::info!("Tracing subsystem shutting down");

        // Provider shutdown blocks until the batch task drains, and that
        // task runs on this runtime.
        let provider = self.provider;
        match tokio::task::spawn_blocking(move || provider.shutdown()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "Failed to flush spans"),
            Err(e) => tracing::warn!(error = %e, "Span flush task failed"),
        }
    }
}

/// Build the filter: `RUST_LOG` when set, else the level's directives
pub fn build_filter(level: LogLevel) -> Result<EnvFilter, TelemetryError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level.directives())
            .map_err(|e| TelemetryError::Filter(e.to_string())),
    }
}

/// `{endpoint}/v1/traces`, for an absolute http(s) base URL
pub fn traces_url(endpoint: &str) -> Result<String, TelemetryError> {
    let invalid = |reason: String| TelemetryError::Exporter {
        endpoint: endpoint.to_string(),
        reason,
    };

    let url = reqwest::Url::parse(endpoint.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }
    Ok(format!("{}/v1/traces", url.as_str().trim_end_matches('/')))
}

fn build_provider(endpoint: &str) -> Result<TracerProvider, TelemetryError> {
    let url = traces_url(endpoint)?;
    let exporter = SpanExporter::builder()
        .with_http()
        .with_endpoint(url)
        .with_timeout(EXPORT_TIMEOUT)
        .build()
        .map_err(|e| TelemetryError::Exporter {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;

    Ok(TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_resource(Resource::new(vec![KeyValue::new(
            "service.name",
            SERVICE_NAME,
        )]))
        .build())
}

/// Install the global subscriber with an OTLP span exporter.
///
/// Must run inside a tokio runtime. Fails if the endpoint is unusable or a
/// subscriber is already installed; callers treat both as fatal.
pub fn init(
    level: LogLevel,
    format: LogFormat,
    otlp_endpoint: &str,
) -> Result<TelemetryGuard, TelemetryError> {
    let filter = build_filter(level)?;
    let provider = build_provider(otlp_endpoint)?;
    let spans = tracing_opentelemetry::layer().with_tracer(provider.tracer("rates-service"));
    let registry = tracing_subscriber::registry().with(filter).with(spans);

    let installed = match format {
        LogFormat::Json => registry
            .with(
                log_fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .try_init(),
        LogFormat::Pretty => registry.with(log_fmt::layer().pretty()).try_init(),
    };
    if let Err(e) = installed {
        let _ = provider.shutdown();
        return Err(TelemetryError::Install(e.to_string()));
    }

    tracing::debug!(
        level = level.as_str(),
        ?format,
        endpoint = otlp_endpoint,
        "Tracing initialized"
    );
    Ok(TelemetryGuard { format, provider })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_second_init_fails() {
        // Only one global subscriber can exist per process
        let first = init(LogLevel::Debug, LogFormat::Json, "http://127.0.0.1:4318");
        let second = init(LogLevel::Info, LogFormat::Pretty, "http://127.0.0.1:4318");

        assert!(matches!(second, Err(TelemetryError::Install(_))));
        if let Ok(guard) = first {
            assert_eq!(guard.format(), LogFormat::Json);
            tracing::info_span!("get_rates").in_scope(|| tracing::info!("buffered"));
            // Collector is absent; shutdown still returns
            guard.shutdown().await;
        }
    }

    #[test]
    fn test_unusable_endpoint_is_fatal() {
        for endpoint in ["", "localhost:4318", "ftp://collector:21"] {
            let err = init(LogLevel::Info, LogFormat::Json, endpoint).unwrap_err();
            assert!(
                matches!(err, TelemetryError::Exporter { .. }),
                "{endpoint:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_traces_url() {
        assert_eq!(
            traces_url("http://localhost:4318").unwrap(),
            "http://localhost:4318/v1/traces"
        );
        assert_eq!(
            traces_url("https://otel.internal:4318/").unwrap(),
            "https://otel.internal:4318/v1/traces"
        );
    }

    #[test]
    fn test_level_directives_build_a_filter() {
        for level in [LogLevel::Debug, LogLevel::Info, LogLevel::Warn, LogLevel::Error] {
            assert!(EnvFilter::try_new(level.directives()).is_ok());
        }
    }
}
