use super::{
    AppState,
    error::{ApiJson, ApiQuery},
};
use crate::{
    core::shipping::{self, ProviderPatch, ProviderWithRates, ResolvedRate},
    entities::{shipping_provider, shipping_rate},
    errors::Result,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

const fn default_weight() -> f64 {
    1.0
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateRequest {
    city: String,
    provider_id: i64,
    #[serde(default = "default_weight")]
    weight: f64,
}

#[derive(Debug, Deserialize)]
pub struct QuoteQuery {
    city: String,
    #[serde(default = "default_weight")]
    weight: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProviderInput {
    name: String,
    #[serde(default)]
    display_name: String,
    #[serde(default = "default_estimated_days")]
    estimated_days: i32,
}

const fn default_estimated_days() -> i32 {
    3
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateInput {
    city: String,
    price: f64,
    #[serde(default)]
    estimated_days: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateToggle {
    is_active: bool,
}

/// Providers a customer can pick at checkout.
pub async fn list_active(
    State(state): State<AppState>,
) -> Result<Json<Vec<shipping_provider::Model>>> {
    shipping::list_providers(&state.db, true).await.map(Json)
}

pub async fn calculate(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CalculateRequest>,
) -> Result<Json<ResolvedRate>> {
    shipping::resolve_rate(&state.db, &request.city, request.provider_id, request.weight)
        .await
        .map(Json)
}

pub async fn quotes(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<QuoteQuery>,
) -> Result<Json<Vec<ResolvedRate>>> {
    shipping::quote_all(&state.db, &query.city, query.weight)
        .await
        .map(Json)
}

pub async fn admin_list(
    State(state): State<AppState>,
) -> Result<Json<Vec<shipping_provider::Model>>> {
    shipping::list_providers(&state.db, false).await.map(Json)
}

pub async fn create_provider(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewProviderInput>,
) -> Result<(StatusCode, Json<shipping_provider::Model>)> {
    let provider = shipping::create_provider(
        &state.db,
        &input.name,
        &input.display_name,
        input.estimated_days,
    )
    .await?;
    tracing::info!(provider_id = provider.id, name = %provider.name, "Created shipping provider");
    Ok((StatusCode::CREATED, Json(provider)))
}

pub async fn get_provider(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ProviderWithRates>> {
    shipping::get_provider_with_rates(&state.db, id)
        .await
        .map(Json)
}

pub async fn update_provider(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ApiJson(patch): ApiJson<ProviderPatch>,
) -> Result<Json<shipping_provider::Model>> {
    shipping::update_provider(&state.db, id, patch)
        .await
        .map(Json)
}

pub async fn delete_provider(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    shipping::delete_provider(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_rates(
    State(state): State<AppState>,
    Path(provider_id): Path<i64>,
) -> Result<Json<Vec<shipping_rate::Model>>> {
    shipping::list_rates(&state.db, provider_id).await.map(Json)
}

pub async fn upsert_rate(
    State(state): State<AppState>,
    Path(provider_id): Path<i64>,
    ApiJson(input): ApiJson<RateInput>,
) -> Result<Json<shipping_rate::Model>> {
    shipping::upsert_rate(
        &state.db,
        provider_id,
        &input.city,
        input.price,
        input.estimated_days,
    )
    .await
    .map(Json)
}

pub async fn toggle_rate(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ApiJson(toggle): ApiJson<RateToggle>,
) -> Result<Json<shipping_rate::Model>> {
    shipping::set_rate_active(&state.db, id, toggle.is_active)
        .await
        .map(Json)
}

pub async fn delete_rate(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode> {
    shipping::delete_rate(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
