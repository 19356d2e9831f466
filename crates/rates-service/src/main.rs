use anyhow::Context;
use std::sync::Arc;
use tracing::{info, warn};

use rates_service::infrastructure::{CliArgs, observability};
use rates_service::{
    HttpQuoteSource, InMemoryLedger, Lifecycle, LifecycleConfig, MetricsRegistry, PostgresLedger,
    ServiceConfig, build_controller, shutdown_signal,
};

fn print_help() {
    eprintln!(
        r#"Rates Service - records and serves USDT/RUB top of book

USAGE:
    rates-service [OPTIONS]

OPTIONS:
    --config <PATH>       Load configuration from JSON file
    --host <HOST>         Database host
    --port <PORT>         Database port
    --user <USER>         Database user
    --dbname <NAME>       Database name
    --password <PASS>     Database password
    --help                Print this help message

ENVIRONMENT VARIABLES:
    LOG_LEVEL             DEBUG, INFO, WARN or ERROR (default: DEBUG)
    LOG_FORMAT            json or pretty (default: json)
    APP_HOST / APP_PORT   RPC listener (default: 0.0.0.0:8080)
    PROMETHEUS_HOST / PROMETHEUS_PORT
                          Metrics listener (default: 0.0.0.0:8081)
    POSTGRES_HOST, POSTGRES_PORT, POSTGRES_USER, POSTGRES_DB, POSTGRES_PASSWORD
    DATABASE_URL          Overrides the POSTGRES_* parts
    QUOTE_SOURCE_URL      Upstream depth endpoint
    FETCH_TIMEOUT_MS      Upstream request timeout (default: 10000)
    DB_TIMEOUT_MS         Per-leg transaction timeout (default: 5000)
    SHUTDOWN_TIMEOUT_MS   Graceful shutdown window (default: 5000)
    HEALTH_SERVICE_NAME   Health check name (default: GetRatesUSDT)
    OTEL_EXPORTER_OTLP_ENDPOINT
                          Span collector (default: http://localhost:4318)
    RUST_LOG              Log filter, overrides LOG_LEVEL

EXAMPLES:
    # Run against a local database
    POSTGRES_HOST=localhost POSTGRES_USER=rates POSTGRES_DB=rates rates-service

    # Run with config file
    rates-service --config rates.json
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = match CliArgs::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_help();
            std::process::exit(1);
        }
    };
    if args.help {
        print_help();
        return Ok(());
    }

    let config = ServiceConfig::from_process_env(&args).context("invalid configuration")?;

    let telemetry =
        observability::init(config.log_level, config.log_format, &config.otlp_endpoint)
            .context("failed to initialize tracing")?;
    info!(config = ?config, "Starting rates service");

    let metrics = Arc::new(MetricsRegistry::new());
    let quote_source = HttpQuoteSource::new(&config.quote_source.url, config.fetch_timeout())
        .context("failed to build HTTP client")?;

    let controller = if config.database.is_configured() {
        let ledger = PostgresLedger::connect(&config.database, config.db_timeout())
            .await
            .context("failed to connect to database")?;
        ledger.migrate().await.context("failed to run migrations")?;
        build_controller(quote_source, ledger, Arc::clone(&metrics), config.db_timeout())
    } else {
        warn!("No database configured, recording history in memory only");
        build_controller(
            quote_source,
            InMemoryLedger::new(),
            Arc::clone(&metrics),
            config.db_timeout(),
        )
    };

    let lifecycle = Lifecycle::new(
        LifecycleConfig {
            rpc_addr: config.server.addr(),
            metrics_addr: config.metrics.addr(),
            health_service_name: config.health_service_name.clone(),
            shutdown_timeout: config.shutdown_timeout(),
        },
        Arc::new(controller),
    )
    .with_metrics(metrics)
    .with_telemetry(telemetry);

    lifecycle.run_until(shutdown_signal()).await?;
    Ok(())
}
