mod metrics;
mod telemetry;

pub use metrics::{DEFAULT_BUCKETS, MetricsRegistry};
pub use telemetry::{
    EXPORT_TIMEOUT, SERVICE_NAME, TelemetryError, TelemetryGuard, build_filter, init, traces_url,
};
