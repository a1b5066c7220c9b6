//! HTTP surface for the presentation layer.

pub mod clients;
pub mod error;
pub mod invoices;
pub mod reports;


use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::Json,
    routing::{get, patch},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::jwt_middleware;
use crate::snapshot::Snapshot;
use crate::store::{OwnerContext, RecordStore};

pub use error::{ApiError, ApiResult};

/// Application state shared with route handlers.
#[derive(Clone)]
pub struct AppState {
    /// Record store every request reads from
    pub store: Arc<dyn RecordStore>,

    /// Secret for validating session tokens
    pub jwt_secret: Arc<str>,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, jwt_secret: &str) -> Self {
        Self {
            store,
            jwt_secret: Arc::from(jwt_secret),
        }
    }

    /// Fresh snapshot of the owner's records for one request.
    pub(crate) async fn snapshot(&self, ctx: OwnerContext) -> ApiResult<Snapshot> {
        Ok(Snapshot::load(self.store.clone(), ctx).await?)
    }
}

/// Health check endpoint.
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "invoicely-core",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Record store health check endpoint.
async fn db_health_check(State(state): State<AppState>) -> Result<Json<serde_json::Value>, StatusCode> {
    state.store.ping().await.map_err(|e| {
        tracing::error!("Record store health check failed: {}", e);
        StatusCode::SERVICE_UNAVAILABLE
    })?;

    Ok(Json(serde_json::json!({
        "status": "ok",
        "database": "connected"
    })))
}

/// Creates the application router.
///
/// Health routes are public; everything under `/api` requires a session
/// token and is scoped to its owner.
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/clients", get(clients::list_clients).post(clients::create_client))
        .route("/clients/overview", get(clients::client_overview))
        .route(
            "/clients/:key",
            get(clients::get_client).put(clients::update_client),
        )
        .route(
            "/invoices",
            get(invoices::list_invoices).post(invoices::create_invoice),
        )
        .route(
            "/invoices/:id",
            get(invoices::get_invoice).delete(invoices::delete_invoice),
        )
        .route("/invoices/:id/status", patch(invoices::update_status))
        .route("/reports/dashboard", get(reports::dashboard))
        .route("/reports/years", get(reports::years))
        .route_layer(middleware::from_fn_with_state(state.clone(), jwt_middleware));

    Router::new()
        .route("/health", get(health_check))
        .route("/health/db", get(db_health_check))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
