use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use super::dto::{RatesRequest, RatesResponse};
use super::error::RpcStatus;
use crate::application::{CallContext, ErrorChain, Observability, RatesService};

/// Optional per-call deadline, in milliseconds
pub const TIMEOUT_HEADER: &str = "x-request-timeout-ms";

/// RPC handler for GetRates.
///
/// Delegates to the use case and translates its result into the wire
/// response or an error status.
pub struct RatesController {
    service: Arc<dyn RatesService>,
    observability: Arc<dyn Observability>,
}

impl RatesController {
    pub fn new(service: Arc<dyn RatesService>, observability: Arc<dyn Observability>) -> Self {
        Self {
            service,
            observability,
        }
    }

    pub async fn get_rates(
        &self,
        ctx: &CallContext,
        _request: RatesRequest,
    ) -> Result<RatesResponse, RpcStatus> {
        self.observability.rpc_request();
        info!(request_id = %ctx.request_id, "Received GetRates request");

        let depth = self.service.get_rates(ctx).await.map_err(|e| {
            error!(request_id = %ctx.request_id, error = %ErrorChain(&e), "GetRates failed");
            RpcStatus::from(e)
        })?;

        info!(
            request_id = %ctx.request_id,
            ask = %depth.asks.price,
            bid = %depth.bids.price,
            "Returning rates"
        );
        self.observability.rpc_response();

        Ok(RatesResponse::from(&depth))
    }
}

/// POST /rates.v1.Rates/GetRates
pub async fn get_rates(
    State(controller): State<Arc<RatesController>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<RatesResponse>, RpcStatus> {
    let ctx = call_context(&headers)?;
    let request = decode_request(&body)?;

    controller.get_rates(&ctx, request).await.map(Json)
}

fn call_context(headers: &HeaderMap) -> Result<CallContext, RpcStatus> {
    let Some(value) = headers.get(TIMEOUT_HEADER) else {
        return Ok(CallContext::new());
    };

    let millis: u64 = value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .ok_or_else(|| {
            RpcStatus::invalid_argument(format!("{} must be an integer", TIMEOUT_HEADER))
        })?;

    Ok(CallContext::with_timeout(Duration::from_millis(millis)))
}

/// An empty body is the empty request
fn decode_request(body: &[u8]) -> Result<RatesRequest, RpcStatus> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(RatesRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| RpcStatus::invalid_argument(format!("invalid request body: {}", e)))
}
