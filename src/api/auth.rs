use super::{AppState, error::ApiJson};
use crate::{
    core::auth::{self, LoginInput, LoginResponse, RegisterInput},
    entities::user,
    errors::Result,
};
use axum::{Json, extract::State, http::StatusCode};

pub async fn register(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<RegisterInput>,
) -> Result<(StatusCode, Json<user::Model>)> {
    let user = auth::register(&state.db, input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<LoginInput>,
) -> Result<Json<LoginResponse>> {
    auth::login(&state.db, &state.jwt, input).await.map(Json)
}
