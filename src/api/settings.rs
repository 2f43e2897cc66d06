use super::{AppState, error::ApiJson};
use crate::{
    core::{
        settings::{self, SettingsPatch},
        shipping,
    },
    entities::{settings_shipping_price, store_settings},
    errors::{Error, Result},
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightBracketInput {
    max_weight: f64,
    price: f64,
}

pub async fn get(State(state): State<AppState>) -> Result<Json<store_settings::Model>> {
    settings::get_or_create_settings(&state.db).await.map(Json)
}

pub async fn update(
    State(state): State<AppState>,
    ApiJson(patch): ApiJson<SettingsPatch>,
) -> Result<Json<store_settings::Model>> {
    settings::update_settings(&state.db, patch).await.map(Json)
}

pub async fn list_brackets(
    State(state): State<AppState>,
    Path(provider_id): Path<i64>,
) -> Result<Json<Vec<settings_shipping_price::Model>>> {
    settings::list_weight_brackets(&state.db, provider_id)
        .await
        .map(Json)
}

pub async fn set_bracket(
    State(state): State<AppState>,
    Path(provider_id): Path<i64>,
    ApiJson(input): ApiJson<WeightBracketInput>,
) -> Result<Json<settings_shipping_price::Model>> {
    if shipping::get_provider(&state.db, provider_id).await?.is_none() {
        return Err(Error::not_found("Shipping provider", provider_id));
    }
    settings::set_weight_bracket(&state.db, provider_id, input.max_weight, input.price)
        .await
        .map(Json)
}

pub async fn delete_bracket(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    settings::delete_weight_bracket(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
