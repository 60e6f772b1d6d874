//! API Module
//!
//! HTTP layer of the healthcheck stub: a single probe route plus request
//! logging.

pub mod health;

use std::net::SocketAddr;

use axum::{
    Router,
    extract::{ConnectInfo, Request},
    middleware::{self, Next},
    response::Response,
    routing::any,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Route path for a configured probe URI (`healthcheck` -> `/healthcheck`)
pub fn probe_path(uri: &str) -> String {
    format!("/{}", uri.trim_start_matches('/'))
}

/// Create the router serving the probe on `/{uri}`
pub fn create_router(uri: &str) -> Router {
    Router::new()
        .route(&probe_path(uri), any(health::health_check))
        .layer(middleware::from_fn(log_request))
        .layer(TraceLayer::new_for_http())
}

/// Logs remote address, method and URI of every request
async fn log_request(request: Request, next: Next) -> Response {
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "-".to_string());

    tracing::info!("{} {} {}", remote, request.method(), request.uri());
    next.run(request).await
}

/// Serves the probe on `listener` until the process ends
pub async fn serve(listener: TcpListener, uri: &str) -> std::io::Result<()> {
    let app = create_router(uri);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}
