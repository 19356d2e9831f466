//! Process lifecycle: bind, serve, drain, stop.
//!
//! `Starting -> Serving -> Draining -> Stopped`. A shutdown signal starts a
//! graceful drain bounded by the shutdown timeout; calls still running when
//! it expires are aborted with `UNAVAILABLE` and the server task is killed.

use axum::{
    Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::infrastructure::{MetricsRegistry, TelemetryGuard};
use crate::presentation::{HealthReporter, RatesController, RpcStatus, create_router, metrics_router};

/// Grace period for in-flight calls once shutdown starts
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Starting,
    Serving,
    Draining,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every in-flight call finished within the grace period
    Graceful,
    /// The grace period expired and remaining calls were aborted
    Forced,
}

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("failed to bind {addr}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    pub rpc_addr: String,
    pub metrics_addr: String,
    pub health_service_name: String,
    pub shutdown_timeout: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            rpc_addr: "0.0.0.0:8080".to_string(),
            metrics_addr: "0.0.0.0:8081".to_string(),
            health_service_name: "GetRatesUSDT".to_string(),
            shutdown_timeout: SHUTDOWN_TIMEOUT,
        }
    }
}

/// Owns the listeners and drives the state machine
pub struct Lifecycle {
    config: LifecycleConfig,
    controller: Arc<RatesController>,
    health: HealthReporter,
    metrics: Option<Arc<MetricsRegistry>>,
    telemetry: Option<TelemetryGuard>,
    state: watch::Sender<LifecycleState>,
}

impl Lifecycle {
    pub fn new(config: LifecycleConfig, controller: Arc<RatesController>) -> Self {
        let (state, _) = watch::channel(LifecycleState::Starting);
        Self {
            config,
            controller,
            health: HealthReporter::new(),
            metrics: None,
            telemetry: None,
            state,
        }
    }

    /// Serve `/metrics` from this registry on the metrics listener
    pub fn with_metrics(mut self, registry: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(registry);
        self
    }

    /// Flush this guard once the listeners have stopped
    pub fn with_telemetry(mut self, guard: TelemetryGuard) -> Self {
        self.telemetry = Some(guard);
        self
    }

    pub fn health(&self) -> HealthReporter {
        self.health.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Bind both listeners and start serving.
    ///
    /// An RPC bind failure is fatal. The metrics listener is best effort.
    pub async fn start(self) -> Result<Running, LifecycleError> {
        let Lifecycle {
            config,
            controller,
            health,
            metrics,
            telemetry,
            state,
        } = self;

        let listener =
            TcpListener::bind(&config.rpc_addr)
                .await
                .map_err(|source| LifecycleError::Bind {
                    addr: config.rpc_addr.clone(),
                    source,
                })?;
        let local_addr = listener.local_addr().map_err(|source| LifecycleError::Bind {
            addr: config.rpc_addr.clone(),
            source,
        })?;

        let (metrics_task, metrics_addr) = match metrics {
            Some(registry) => match spawn_metrics(&config.metrics_addr, registry).await {
                Some((task, addr)) => (Some(task), Some(addr)),
                None => (None, None),
            },
            None => (None, None),
        };

        let (force_tx, force_rx) = watch::channel(false);
        let (drain_tx, drain_rx) = oneshot::channel::<()>();

        let router: Router = create_router(controller, health.clone()).layer(
            middleware::from_fn_with_state(force_rx, abort_on_force_stop),
        );
        let server = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = drain_rx.await;
                })
                .await
        });

        health.set_serving(&config.health_service_name);
        state.send_replace(LifecycleState::Serving);
        info!(addr = %local_addr, "RPC server listening");

        Ok(Running {
            config,
            local_addr,
            metrics_addr,
            health,
            state,
            telemetry,
            drain_tx,
            force_tx,
            server,
            metrics_task,
        })
    }

    /// Start, serve until `shutdown` resolves, then stop
    pub async fn run_until<F>(self, shutdown: F) -> Result<ShutdownOutcome, LifecycleError>
    where
        F: Future<Output = ()>,
    {
        let running = self.start().await?;
        Ok(running.shutdown_on(shutdown).await)
    }
}

async fn spawn_metrics(
    addr: &str,
    registry: Arc<MetricsRegistry>,
) -> Option<(JoinHandle<()>, SocketAddr)> {
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = %addr, error = %e, "Metrics listener failed to bind");
            return None;
        }
    };
    let local_addr = listener.local_addr().ok()?;

    let task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, metrics_router(registry)).await {
            error!(error = %e, "Metrics server stopped");
        }
    });
    info!(addr = %local_addr, "Metrics server listening");
    Some((task, local_addr))
}

/// Race each call against the force-stop flag
async fn abort_on_force_stop(
    State(mut force): State<watch::Receiver<bool>>,
    request: Request,
    next: Next,
) -> Response {
    tokio::select! {
        response = next.run(request) => response,
        _ = forced(&mut force) => {
            warn!("Aborting in-flight call on forced stop");
            RpcStatus::unavailable("server is shutting down").into_response()
        }
    }
}

async fn forced(force: &mut watch::Receiver<bool>) {
    loop {
        if *force.borrow_and_update() {
            return;
        }
        if force.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// A started lifecycle
pub struct Running {
    config: LifecycleConfig,
    local_addr: SocketAddr,
    metrics_addr: Option<SocketAddr>,
    health: HealthReporter,
    state: watch::Sender<LifecycleState>,
    telemetry: Option<TelemetryGuard>,
    drain_tx: oneshot::Sender<()>,
    force_tx: watch::Sender<bool>,
    server: JoinHandle<std::io::Result<()>>,
    metrics_task: Option<JoinHandle<()>>,
}

impl Running {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// None when the metrics listener is disabled or failed to bind
    pub fn metrics_addr(&self) -> Option<SocketAddr> {
        self.metrics_addr
    }

    pub fn health(&self) -> HealthReporter {
        self.health.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Wait for `signal`, drain, and stop
    pub async fn shutdown_on<F>(self, signal: F) -> ShutdownOutcome
    where
        F: Future<Output = ()>,
    {
        signal.await;
        self.shutdown().await
    }

    /// Drain now
    pub async fn shutdown(self) -> ShutdownOutcome {
        let Running {
            config,
            health,
            state,
            telemetry,
            drain_tx,
            force_tx,
            mut server,
            metrics_task,
            ..
        } = self;

        info!(
            timeout_ms = config.shutdown_timeout.as_millis() as u64,
            "Shutting down"
        );
        state.send_replace(LifecycleState::Draining);
        health.set_not_serving(&config.health_service_name);
        let _ = drain_tx.send(());

        let outcome = tokio::select! {
            result = &mut server => {
                match result {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => error!(error = %e, "RPC server failed"),
                    Err(e) => error!(error = %e, "RPC server task failed"),
                }
                ShutdownOutcome::Graceful
            }
            _ = tokio::time::sleep(config.shutdown_timeout) => {
                warn!("Graceful shutdown timed out, forcing stop");
                let _ = force_tx.send(true);
                server.abort();
                ShutdownOutcome::Forced
            }
        };
        if outcome == ShutdownOutcome::Forced {
            let _ = server.await;
        }

        if let Some(task) = metrics_task {
            task.abort();
            let _ = task.await;
        }

        state.send_replace(LifecycleState::Stopped);
        info!(?outcome, "Server stopped");

        if let Some(guard) = telemetry {
            guard.shutdown().await;
        }
        outcome
    }
}

/// Resolves on SIGINT or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
