//! Integration test: upstream -> GetRates RPC -> ledger
//!
//! A fake depth API and the RPC router both listen on loopback; the ledger
//! is the in-memory one so partial failures can be injected.

use axum::{Router, http::StatusCode, routing::get};
use rates_core::{HistoryRow, Leg};
use rates_service::infrastructure::LedgerPhase;
use rates_service::presentation::HealthReporter;
use rates_service::{
    HttpQuoteSource, InMemoryLedger, MetricsRegistry, RatesResponse, build_controller,
    create_router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

const SAMPLE: &str = r#"{"timestamp":1234567890,"asks":[{"price":"100","volume":"1","amount":"100","factor":"2","type":"ask"}],"bids":[{"price":"90","volume":"1","amount":"90","factor":"2","type":"bid"}]}"#;

async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

async fn upstream(status: StatusCode, body: &'static str) -> String {
    let addr = serve(Router::new().route(
        "/api/v2/depth",
        get(move || async move { (status, body) }),
    ))
    .await;
    format!("http://{}/api/v2/depth?market=usdtrub", addr)
}

async fn slow_upstream(delay: Duration) -> String {
    let addr = serve(Router::new().route(
        "/api/v2/depth",
        get(move || async move {
            tokio::time::sleep(delay).await;
            SAMPLE
        }),
    ))
    .await;
    format!("http://{}/api/v2/depth?market=usdtrub", addr)
}

struct Service {
    addr: SocketAddr,
    ledger: InMemoryLedger,
    metrics: Arc<MetricsRegistry>,
}

impl Service {
    async fn start(upstream_url: String) -> Self {
        let ledger = InMemoryLedger::new();
        let metrics = Arc::new(MetricsRegistry::new());
        let source = HttpQuoteSource::new(upstream_url, Duration::from_secs(2)).unwrap();
        let controller = build_controller(
            source,
            ledger.clone(),
            Arc::clone(&metrics),
            Duration::from_secs(2),
        );

        let router = create_router(Arc::new(controller), HealthReporter::new());
        let addr = serve(router).await;
        Service {
            addr,
            ledger,
            metrics,
        }
    }

    async fn get_rates(&self) -> reqwest::Response {
        reqwest::Client::new()
            .post(format!("http://{}/rates.v1.Rates/GetRates", self.addr))
            .json(&serde_json::json!({}))
            .send()
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn test_get_rates_persists_both_legs() {
    let service = Service::start(upstream(StatusCode::OK, SAMPLE).await).await;

    let response = service.get_rates().await;
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let rates: RatesResponse = response.json().await.unwrap();
    assert_eq!(rates.timestamp, 1234567890);
    assert_eq!(rates.ask.price, "100");
    assert_eq!(rates.ask.order_type, "ask");
    assert_eq!(rates.bid.price, "90");
    assert_eq!(rates.bid.factor, "2");

    let rows = service.ledger.rows();
    assert_eq!(
        rows,
        vec![
            HistoryRow {
                type_price: "ask".to_string(),
                price: "100".to_string(),
                volume: "1".to_string(),
                amount: "100".to_string(),
                time_stamp_order: 1234567890,
                transcription_type: Leg::Asks,
            },
            HistoryRow {
                type_price: "bid".to_string(),
                price: "90".to_string(),
                volume: "1".to_string(),
                amount: "90".to_string(),
                time_stamp_order: 1234567890,
                transcription_type: Leg::Bids,
            },
        ]
    );

    assert_eq!(service.metrics.counter_value("requests_total", &[]), 1);
    assert_eq!(service.metrics.counter_value("requests_processed_total", &[]), 1);
    assert_eq!(
        service.metrics.counter_value(
            "db_operations_total",
            &[("operation", "commit_transaction"), ("status", "success")]
        ),
        2
    );
}

#[tokio::test]
async fn test_unreachable_upstream_persists_nothing() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead = format!("http://{}/api/v2/depth", listener.local_addr().unwrap());
    drop(listener);

    let service = Service::start(dead).await;

    let response = service.get_rates().await;
    assert_eq!(response.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);
    assert!(service.ledger.is_empty());
    assert_eq!(service.ledger.transactions_begun(), 0);
    assert_eq!(
        service
            .metrics
            .counter_value("http_requests_total", &[("status", "error")]),
        1
    );
    assert_eq!(service.metrics.counter_value("requests_processed_total", &[]), 0);
}

#[tokio::test]
async fn test_upstream_error_status_persists_nothing() {
    let service =
        Service::start(upstream(StatusCode::BAD_GATEWAY, "upstream exploded").await).await;

    let response = service.get_rates().await;
    assert_eq!(response.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);
    let message = response.text().await.unwrap();
    assert!(message.contains("502"));
    assert!(service.ledger.is_empty());
}

#[tokio::test]
async fn test_undecodable_payload_persists_nothing() {
    let service = Service::start(upstream(StatusCode::OK, "<html>maintenance</html>").await).await;

    let response = service.get_rates().await;
    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    assert!(service.ledger.is_empty());
}

#[tokio::test]
async fn test_bid_failure_keeps_committed_ask() {
    let service = Service::start(upstream(StatusCode::OK, SAMPLE).await).await;
    service
        .ledger
        .inject_fault(LedgerPhase::Insert, Some(Leg::Bids));

    let response = service.get_rates().await;
    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);

    let rows = service.ledger.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].transcription_type, Leg::Asks);
    assert_eq!(service.ledger.rollbacks(), 1);
}

#[tokio::test]
async fn test_ask_failure_never_begins_bid_transaction() {
    let service = Service::start(upstream(StatusCode::OK, SAMPLE).await).await;
    service
        .ledger
        .inject_fault(LedgerPhase::Commit, Some(Leg::Asks));

    let response = service.get_rates().await;
    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    assert!(service.ledger.is_empty());
    assert_eq!(service.ledger.transactions_begun(), 1);
}

#[tokio::test]
async fn test_empty_book_records_sentinel_rows() {
    let service = Service::start(
        upstream(StatusCode::OK, r#"{"timestamp":1234567890,"asks":[],"bids":[]}"#).await,
    )
    .await;

    let response = service.get_rates().await;
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let rates: RatesResponse = response.json().await.unwrap();
    assert_eq!(rates.timestamp, 0);
    assert!(rates.ask.price.is_empty());

    let rows = service.ledger.rows();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|row| row.time_stamp_order == 0));
}

#[tokio::test]
async fn test_concurrent_calls_each_write_two_rows() {
    let service = Arc::new(Service::start(upstream(StatusCode::OK, SAMPLE).await).await);

    let calls: Vec<_> = (0..8)
        .map(|_| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.get_rates().await.status() })
        })
        .collect();
    for call in calls {
        assert_eq!(call.await.unwrap(), reqwest::StatusCode::OK);
    }

    let rows = service.ledger.rows();
    assert_eq!(rows.len(), 16);
    assert_eq!(
        rows.iter().filter(|r| r.transcription_type == Leg::Asks).count(),
        8
    );
}

#[tokio::test]
async fn test_client_disconnect_abandons_call() {
    // Answers well inside the fetch timeout, but after the caller has gone
    let service = Service::start(slow_upstream(Duration::from_millis(1500)).await).await;

    let result = reqwest::Client::builder()
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap()
        .post(format!("http://{}/rates.v1.Rates/GetRates", service.addr))
        .json(&serde_json::json!({}))
        .send()
        .await;
    assert!(result.unwrap_err().is_timeout());

    tokio::time::sleep(Duration::from_millis(2500)).await;

    assert_eq!(service.ledger.len(), 0);
    assert_eq!(service.ledger.transactions_begun(), 0);
    assert_eq!(service.metrics.counter_value("requests_processed_total", &[]), 0);
}
