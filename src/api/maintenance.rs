use super::{
    AppState,
    error::{ApiJson, ApiQuery},
};
use crate::{
    core::{
        auth::CurrentUser,
        maintenance::{
            self, ApprovalResponse, CostPatch, DiagnosisInput, LockSecretView,
            MaintenanceRequestView, MaintenanceStatus, MaintenanceSummary, NewMaintenanceRequest,
            RequestFilter,
        },
    },
    errors::Result,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct TrackQuery {
    phone: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    status: MaintenanceStatus,
    #[serde(default)]
    note: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    ApiJson(new): ApiJson<NewMaintenanceRequest>,
) -> Result<(StatusCode, Json<MaintenanceRequestView>)> {
    let request = maintenance::create_request(&state.db, &state.cipher, new).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn track(
    State(state): State<AppState>,
    Path(number): Path<String>,
    ApiQuery(query): ApiQuery<TrackQuery>,
) -> Result<Json<MaintenanceRequestView>> {
    maintenance::track_request(&state.db, &number, &query.phone)
        .await
        .map(Json)
}

pub async fn respond(
    State(state): State<AppState>,
    Path(number): Path<String>,
    ApiJson(response): ApiJson<ApprovalResponse>,
) -> Result<Json<MaintenanceRequestView>> {
    maintenance::respond_to_approval(&state.db, &number, response, state.policy)
        .await
        .map(Json)
}

pub async fn list(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<RequestFilter>,
) -> Result<Json<Vec<MaintenanceSummary>>> {
    maintenance::list_requests(&state.db, &filter)
        .await
        .map(Json)
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MaintenanceRequestView>> {
    maintenance::get_request(&state.db, id).await.map(Json)
}

pub async fn get_by_number(
    State(state): State<AppState>,
    Path(number): Path<String>,
) -> Result<Json<MaintenanceRequestView>> {
    maintenance::get_request_by_number(&state.db, &number)
        .await
        .map(Json)
}

pub async fn change_status(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    ApiJson(change): ApiJson<StatusChange>,
) -> Result<Json<MaintenanceRequestView>> {
    maintenance::change_status(
        &state.db,
        id,
        change.status,
        change.note,
        &user.name,
        state.policy,
    )
    .await
    .map(Json)
}

pub async fn record_diagnosis(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    ApiJson(diagnosis): ApiJson<DiagnosisInput>,
) -> Result<Json<MaintenanceRequestView>> {
    maintenance::record_diagnosis(&state.db, id, diagnosis, &user.name, state.policy)
        .await
        .map(Json)
}

pub async fn update_costs(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ApiJson(patch): ApiJson<CostPatch>,
) -> Result<Json<MaintenanceRequestView>> {
    maintenance::update_costs(&state.db, id, patch)
        .await
        .map(Json)
}

pub async fn request_approval(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<MaintenanceRequestView>> {
    maintenance::request_approval(&state.db, id, &user.name, state.policy)
        .await
        .map(Json)
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode> {
    maintenance::delete_request(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Decrypts the device unlock code for the technician.
pub async fn reveal_lock(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<LockSecretView>> {
    let view = maintenance::reveal_lock_secret(&state.db, &state.cipher, id).await?;
    tracing::info!(
        request_id = id,
        user_id = user.id,
        user = %user.name,
        "Device lock secret revealed"
    );
    Ok(Json(view))
}
