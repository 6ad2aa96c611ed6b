use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use tasktrack_store::Database;

use crate::handlers;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 4000 }
    }
}

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
}

/// Build the Axum router with all routes.
///
/// `/tasks/insights` is registered alongside `/tasks/{id}`; the static
/// segment wins over the capture, so insights is never parsed as an id.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::liveness))
        .route("/test-db", get(handlers::test_db))
        .route("/tasks", post(handlers::create_task).get(handlers::list_tasks))
        .route("/tasks/insights", get(handlers::insights))
        .route(
            "/tasks/{id}",
            patch(handlers::update_task).delete(handlers::delete_task),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Create and start the server. Returns a handle holding the bound port.
pub async fn start(config: ServerConfig, db: Database) -> Result<ServerHandle, std::io::Error> {
    let router = build_router(AppState { db });

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(port = local_addr.port(), "task tracker server started");

    let server = tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        _server: server,
    })
}

/// Handle returned by `start()` — keeps the serve task alive.
pub struct ServerHandle {
    pub port: u16,
    _server: tokio::task::JoinHandle<()>,
}
