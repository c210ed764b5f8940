//! optuna-dashboard HTTP Server
//!
//! Serves the notebook-extension API routes of optuna-dashboard over Axum.
//!
//! The Jupyter server mounts extension handlers under a configurable base URL,
//! so every route can be nested under a prefix given at startup.
//!
//! # Endpoints
//!
//! - `GET {base}/optuna-dashboard/hello`
//!   - Returns the fixed extension greeting as JSON.
//! - `GET {base}/api/status`
//!   - Returns JSON runtime statistics (uptime, requests served).
//! - `GET {base}/`
//!   - Returns a JSON service descriptor.

use axum::{extract::State, routing::get, Json, Router};
use clap::Parser;
use serde::Serialize;
use std::net::{IpAddr, SocketAddr};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Body of the hello endpoint, fixed by the extension protocol.
const HELLO_MESSAGE: &str = "This is /optuna-dashboard/hello endpoint!";

/// Command-line arguments for the server.
#[derive(Parser)]
#[command(name = "dashboard-server", version, about = "optuna-dashboard HTTP API Server")]
struct Args {
    /// Port to listen on.
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    host: IpAddr,

    /// Base URL the notebook server mounts the extension under.
    #[arg(long, default_value = "/")]
    base_url: String,
}

/// Shared application state.
///
/// Cloned into every handler; counters use lock-free atomic increments.
#[derive(Clone)]
struct AppState {
    /// Boot time, for uptime reporting.
    started_at: Instant,
    /// Number of hello responses served since boot.
    hello_requests: Arc<AtomicU64>,
}

/// Response payload of the hello endpoint.
#[derive(Serialize)]
struct HelloResponse {
    data: &'static str,
}

/// Handler for the extension greeting.
///
/// Route: `GET {base}/optuna-dashboard/hello`
async fn get_hello(State(state): State<AppState>) -> Json<HelloResponse> {
    state.hello_requests.fetch_add(1, Ordering::Relaxed);
    Json(HelloResponse {
        data: HELLO_MESSAGE,
    })
}

/// Runtime statistics reported by the status endpoint.
#[derive(Serialize)]
struct ServerStatus {
    version: &'static str,
    uptime_seconds: u64,
    hello_requests: u64,
}

/// Handler for server statistics.
///
/// Route: `GET {base}/api/status`
async fn server_status(State(state): State<AppState>) -> Json<ServerStatus> {
    Json(ServerStatus {
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        hello_requests: state.hello_requests.load(Ordering::Relaxed),
    })
}

/// Identity of the service, returned from the root path.
#[derive(Serialize)]
struct ServiceInfo {
    name: &'static str,
    version: &'static str,
}

/// Handler for the root path.
///
/// Route: `GET {base}/`
async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: "optuna-dashboard",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Creates the Axum router with all routes configured.
///
/// This function is separated from `main` to enable integration testing
/// without requiring a live server.
///
/// # Arguments
/// * `base_url` - Prefix the notebook server mounts the extension under.
///   `"/"` (or `""`) means no prefix.
///
/// # Returns
/// A configured `Router` with all endpoints and shared state.
pub fn create_app(base_url: &str) -> Router {
    let state = AppState {
        started_at: Instant::now(),
        hello_requests: Arc::new(AtomicU64::new(0)),
    };

    let routes = Router::new()
        .route("/", get(root))
        .route("/optuna-dashboard/hello", get(get_hello))
        .route("/api/status", get(server_status))
        .with_state(state);

    // Nesting at "/" is rejected by axum, so the unprefixed case is special.
    match base_url.trim_end_matches('/') {
        "" => routes,
        base if base.starts_with('/') => Router::new().nest(base, routes),
        base => Router::new().nest(&format!("/{base}"), routes),
    }
}

/// Installs the global tracing subscriber.
///
/// Verbosity is controlled through `RUST_LOG`; without it the server logs
/// at `info` with per-request traces from `tower_http` at `debug`.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Resolves when ctrl-c is received, triggering graceful shutdown.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        return;
    }
    info!("shutdown signal received");
}

/// Main server entry point.
///
/// Parses CLI arguments, initializes tracing, and starts the HTTP server.
pub async fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing();

    let app = create_app(&args.base_url).layer(TraceLayer::new_for_http());

    let addr = SocketAddr::new(args.host, args.port);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        base_url = %args.base_url,
        "listening on http://{addr}"
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", addr, e))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
