//! HTTP surface of the service.
//!
//! Public storefront routes live under `/api`; back office routes live under
//! `/api/admin` and go through [`middleware::require_admin`]. Handlers are thin:
//! they extract input, call into [`crate::core`] and serialize the result.

mod auth;
mod catalog;
pub mod error;
mod maintenance;
pub mod middleware;
mod orders;
mod payments;
mod settings;
mod shipping;

use crate::{
    core::{auth::JwtService, device_lock::DeviceLockCipher, maintenance::TransitionPolicy},
    errors::Result,
};
use axum::{
    Json, Router,
    extract::State,
    middleware::from_fn_with_state,
    routing::{get, post, put},
};
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub jwt: JwtService,
    pub cipher: DeviceLockCipher,
    pub policy: TransitionPolicy,
}

async fn health(State(state): State<AppState>) -> Result<Json<Value>> {
    state.db.ping().await?;
    Ok(Json(json!({ "status": "ok" })))
}

fn admin_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/products",
            get(catalog::admin_list).post(catalog::create),
        )
        .route(
            "/products/:id",
            get(catalog::admin_get)
                .put(catalog::update)
                .delete(catalog::delete),
        )
        .route("/orders", get(orders::list))
        .route("/orders/:id", get(orders::get))
        .route("/orders/:id/status", put(orders::update_status))
        .route("/settings", get(settings::get).put(settings::update))
        .route(
            "/providers",
            get(shipping::admin_list).post(shipping::create_provider),
        )
        .route(
            "/providers/:id",
            get(shipping::get_provider)
                .put(shipping::update_provider)
                .delete(shipping::delete_provider),
        )
        .route(
            "/providers/:id/rates",
            get(shipping::list_rates).put(shipping::upsert_rate),
        )
        .route(
            "/providers/:id/weight-brackets",
            get(settings::list_brackets).put(settings::set_bracket),
        )
        .route(
            "/rates/:id",
            put(shipping::toggle_rate).delete(shipping::delete_rate),
        )
        .route(
            "/weight-brackets/:id",
            axum::routing::delete(settings::delete_bracket),
        )
        .route(
            "/payments/:provider/settings",
            get(payments::get_settings).put(payments::update_settings),
        )
        .route("/maintenance", get(maintenance::list))
        .route(
            "/maintenance/:id",
            get(maintenance::get).delete(maintenance::delete),
        )
        .route(
            "/maintenance/number/:number",
            get(maintenance::get_by_number),
        )
        .route("/maintenance/:id/status", put(maintenance::change_status))
        .route(
            "/maintenance/:id/diagnosis",
            put(maintenance::record_diagnosis),
        )
        .route("/maintenance/:id/costs", put(maintenance::update_costs))
        .route(
            "/maintenance/:id/request-approval",
            post(maintenance::request_approval),
        )
        .route("/maintenance/:id/lock", get(maintenance::reveal_lock))
        .route_layer(from_fn_with_state(state.clone(), middleware::require_admin))
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/products", get(catalog::list))
        .route("/products/:id", get(catalog::get))
        .route("/orders", post(orders::create))
        .route("/shipping/providers", get(shipping::list_active))
        .route("/shipping/calculate", post(shipping::calculate))
        .route("/shipping/quotes", get(shipping::quotes))
        .route("/payments/options", get(payments::options))
        .route("/payments/:provider/commission", post(payments::commission))
        .route("/maintenance", post(maintenance::create))
        .route("/maintenance/track/:number", get(maintenance::track))
        .route("/maintenance/:number/approval", post(maintenance::respond))
        .nest("/admin", admin_routes(&state));

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
