mod extract;
mod handlers;
mod routes;

use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::AuthService;
use crate::store::Store;

pub use extract::{BearerToken, CurrentUser};

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub auth: AuthService,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .merge(routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let purged = state.auth.purge_expired_sessions().await?;
    tracing::debug!(purged, "startup session cleanup");

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
    }
}
