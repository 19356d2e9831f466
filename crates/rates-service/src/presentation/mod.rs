pub mod health;
pub mod metrics;
pub mod rpc;

pub use health::{HealthReporter, ServingStatus, health_routes};
pub use metrics::metrics_router;
pub use rpc::{
    GET_RATES_PATH, OrderMessage, RatesController, RatesRequest, RatesResponse, RpcCode,
    RpcStatus, TIMEOUT_HEADER, create_router,
};
