//! Axum server wiring and lifecycle

use anyhow::{anyhow, Context, Result};
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use std::future::Future;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::config::DaemonConfig;
use crate::connection;
use crate::routes;
use crate::state::AppState;

/// Build the application router
pub fn build_router(state: AppState, config: &DaemonConfig) -> Router {
    let mut app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(routes::health))
        .nest("/api", routes::api_routes());

    if config.relay.enabled {
        app = app.route("/relay", get(relay_handler));
    }

    let app = app.with_state(state);

    if config.cors_permissive {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

/// Bind the listen socket
pub async fn bind(addr: &str) -> Result<TcpListener> {
    TcpListener::bind(addr).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::AddrInUse => anyhow!(
            "Failed to bind to {}: address already in use (is another resq-daemon running?)",
            addr
        ),
        std::io::ErrorKind::PermissionDenied => anyhow!(
            "Failed to bind to {}: permission denied (use a port above 1024)",
            addr
        ),
        _ => anyhow!("Failed to bind to {}: {}", addr, e),
    })
}

/// Serve until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr().context("Listener has no local address")?;
    tracing::info!("Listening on http://{} (map clients: ws://{}/ws)", addr, addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| connection::handle_connection(socket, state))
}

async fn relay_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| connection::handle_relay(socket, state))
}
