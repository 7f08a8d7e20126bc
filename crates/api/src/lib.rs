//! `api` crate: HTTP REST API layer.
//!
//! Exposes:
//!   GET    /health
//!   POST   /api/incidents
//!   GET    /api/incidents
//!   GET    /api/incidents/:id
//!   PATCH  /api/incidents/:id/status
//!   GET    /api/incidents/:id/crew
//!   POST   /api/incidents/:id/crew

pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, patch},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use db::IncidentStore;
use engine::IncidentCreator;

pub use error::ApiError;

/// Shared, cheaply cloneable handler state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn IncidentStore>,
    pub creator: Arc<IncidentCreator>,
}

impl AppState {
    pub fn new(store: Arc<dyn IncidentStore>, creator: IncidentCreator) -> Self {
        Self { store, creator: Arc::new(creator) }
    }
}

/// Build the full router with tracing and CORS layers applied.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/incidents",
            get(handlers::incidents::list).post(handlers::incidents::create),
        )
        .route("/incidents/:id", get(handlers::incidents::get))
        .route("/incidents/:id/status", patch(handlers::incidents::update_status))
        .route(
            "/incidents/:id/crew",
            get(handlers::crew::list).post(handlers::crew::add),
        );

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `bind` and serve until Ctrl-C.
pub async fn serve(bind: &str, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("API listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}
