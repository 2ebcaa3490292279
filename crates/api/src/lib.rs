//! `api` crate — the operator HTTP surface over the dataflow engine.
//!
//! Exposes:
//!   POST   /api/v1/executions                       create an execution
//!   GET    /api/v1/executions/:id                    fetch an execution
//!   POST   /api/v1/executions/:id/archive            archive an execution
//!   POST   /api/v1/executions/:id/retry/:node        force a retry
//!   POST   /api/v1/executions/:id/values             set_many
//!   DELETE /api/v1/executions/:id/values             unset_many
//!   GET    /api/v1/executions/:id/values/:node       get (with wait/timeout)

pub mod handlers;

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    routing::{delete, get, post},
    Router,
};
use db::DbPool;
use engine::GraphCatalog;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub catalog: GraphCatalog,
    pub hub: queue::KickHub,
}

pub(crate) fn now_seconds() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).expect("system clock is before the unix epoch").as_secs() as i64
}

pub async fn serve(bind: &str, pool: DbPool, catalog: GraphCatalog, hub: queue::KickHub) -> Result<(), std::io::Error> {
    let state = AppState { pool, catalog, hub };

    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    let api_router = Router::new()
        .route("/executions", post(handlers::executions::create))
        .route("/executions/:id", get(handlers::executions::get))
        .route("/executions/:id/archive", post(handlers::executions::archive))
        .route("/executions/:id/retry/:node_name", post(handlers::executions::force_retry))
        .route("/executions/:id/values", post(handlers::values::set_many).delete(handlers::values::unset_many))
        .route("/executions/:id/values/:node_name", get(handlers::values::get));

    let app = Router::new()
        .nest("/api/v1", api_router)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await
}
