use axum::{Router, routing::post};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handler::{self, RatesController};
use crate::presentation::health::{HealthReporter, health_routes};

/// Fully qualified method path of GetRates
pub const GET_RATES_PATH: &str = "/rates.v1.Rates/GetRates";

/// Create the RPC router: GetRates plus health checks
pub fn create_router(controller: Arc<RatesController>, health: HealthReporter) -> Router {
    Router::new()
        .route(GET_RATES_PATH, post(handler::get_rates))
        .with_state(controller)
        .merge(health_routes(health))
        // Middleware
        .layer(TraceLayer::new_for_http())
}
