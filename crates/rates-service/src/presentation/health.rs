//! Health checks
//!
//! Per-service serving status, shaped like the standard RPC health
//! protocol: the empty name is the overall status of the process.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServingStatus {
    Unknown,
    Serving,
    NotServing,
    /// Queried name was never registered
    ServiceUnknown,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: ServingStatus,
}

/// Shared, cloneable view of every registered service's status
#[derive(Debug, Clone)]
pub struct HealthReporter {
    statuses: Arc<DashMap<String, ServingStatus>>,
}

impl Default for HealthReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthReporter {
    pub fn new() -> Self {
        let statuses = DashMap::new();
        statuses.insert(String::new(), ServingStatus::Unknown);
        Self {
            statuses: Arc::new(statuses),
        }
    }

    pub fn set_status(&self, service: &str, status: ServingStatus) {
        self.statuses.insert(service.to_string(), status);
    }

    /// Mark `service` and the process as serving
    pub fn set_serving(&self, service: &str) {
        self.set_status(service, ServingStatus::Serving);
        self.set_status("", ServingStatus::Serving);
    }

    /// Mark `service` and the process as not serving
    pub fn set_not_serving(&self, service: &str) {
        self.set_status(service, ServingStatus::NotServing);
        self.set_status("", ServingStatus::NotServing);
    }

    pub fn status(&self, service: &str) -> ServingStatus {
        self.statuses
            .get(service)
            .map(|entry| *entry.value())
            .unwrap_or(ServingStatus::ServiceUnknown)
    }

    pub fn overall(&self) -> ServingStatus {
        self.status("")
    }
}

/// `GET /health` and `GET /health/{service}`
pub fn health_routes(reporter: HealthReporter) -> Router {
    Router::new()
        .route("/health", get(overall))
        .route("/health/{service}", get(service))
        .with_state(reporter)
}

async fn overall(State(reporter): State<HealthReporter>) -> (StatusCode, Json<HealthResponse>) {
    respond(reporter.overall())
}

async fn service(
    State(reporter): State<HealthReporter>,
    Path(service): Path<String>,
) -> (StatusCode, Json<HealthResponse>) {
    respond(reporter.status(&service))
}

fn respond(status: ServingStatus) -> (StatusCode, Json<HealthResponse>) {
    let code = match status {
        ServingStatus::Serving => StatusCode::OK,
        ServingStatus::ServiceUnknown => StatusCode::NOT_FOUND,
        ServingStatus::Unknown | ServingStatus::NotServing => StatusCode::SERVICE_UNAVAILABLE,
    };
    (code, Json(HealthResponse { status }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    async fn get_health(reporter: &HealthReporter, uri: &str) -> (StatusCode, String) {
        let response = health_routes(reporter.clone())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[test]
    fn test_status_transitions() {
        let reporter = HealthReporter::new();
        assert_eq!(reporter.overall(), ServingStatus::Unknown);
        assert_eq!(reporter.status("GetRatesUSDT"), ServingStatus::ServiceUnknown);

        reporter.set_serving("GetRatesUSDT");
        assert_eq!(reporter.status("GetRatesUSDT"), ServingStatus::Serving);
        assert_eq!(reporter.overall(), ServingStatus::Serving);

        reporter.set_not_serving("GetRatesUSDT");
        assert_eq!(reporter.status("GetRatesUSDT"), ServingStatus::NotServing);
        assert_eq!(reporter.overall(), ServingStatus::NotServing);
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let reporter = HealthReporter::new();

        let (code, body) = get_health(&reporter, "/health").await;
        assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, r#"{"status":"UNKNOWN"}"#);

        reporter.set_serving("GetRatesUSDT");
        let (code, body) = get_health(&reporter, "/health/GetRatesUSDT").await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body, r#"{"status":"SERVING"}"#);

        let (code, body) = get_health(&reporter, "/health/Other").await;
        assert_eq!(code, StatusCode::NOT_FOUND);
        assert_eq!(body, r#"{"status":"SERVICE_UNKNOWN"}"#);
    }
}
