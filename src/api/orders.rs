use super::{
    AppState,
    error::{ApiJson, ApiQuery},
};
use crate::{
    core::orders::{self, NewOrder, OrderStatus, OrderStatusUpdate, OrderView},
    entities::order,
    errors::Result,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct OrderListQuery {
    status: Option<OrderStatus>,
}

pub async fn create(
    State(state): State<AppState>,
    ApiJson(new): ApiJson<NewOrder>,
) -> Result<(StatusCode, Json<OrderView>)> {
    let order = orders::create_order(&state.db, new).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<OrderListQuery>,
) -> Result<Json<Vec<order::Model>>> {
    orders::list_orders(&state.db, query.status).await.map(Json)
}

pub async fn get(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<OrderView>> {
    orders::get_order(&state.db, id).await.map(Json)
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ApiJson(update): ApiJson<OrderStatusUpdate>,
) -> Result<Json<OrderView>> {
    orders::update_order_status(&state.db, id, update)
        .await
        .map(Json)
}
