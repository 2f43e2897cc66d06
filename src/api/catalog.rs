use super::{
    AppState,
    error::{ApiJson, ApiQuery},
};
use crate::{
    core::catalog::{self, NewProduct, ProductFilter, ProductPatch},
    entities::product,
    errors::{Error, Result},
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

/// Storefront listing; hidden products never show up here.
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(mut filter): ApiQuery<ProductFilter>,
) -> Result<Json<Vec<product::Model>>> {
    filter.include_inactive = false;
    catalog::list_products(&state.db, &filter).await.map(Json)
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<product::Model>> {
    catalog::get_product(&state.db, id)
        .await?
        .filter(|p| p.is_active)
        .map(Json)
        .ok_or_else(|| Error::not_found("Product", id))
}

pub async fn admin_list(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<ProductFilter>,
) -> Result<Json<Vec<product::Model>>> {
    catalog::list_products(&state.db, &filter).await.map(Json)
}

pub async fn admin_get(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<product::Model>> {
    catalog::get_product(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::not_found("Product", id))
}

pub async fn create(
    State(state): State<AppState>,
    ApiJson(new): ApiJson<NewProduct>,
) -> Result<(StatusCode, Json<product::Model>)> {
    let product = catalog::create_product(&state.db, new).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ApiJson(patch): ApiJson<ProductPatch>,
) -> Result<Json<product::Model>> {
    catalog::update_product(&state.db, id, patch).await.map(Json)
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode> {
    catalog::delete_product(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
