use super::{
    AppState,
    error::{ApiJson, ApiQuery},
};
use crate::{
    core::commission::{
        self, Commission, PaymentOption, PaymentProvider, PaymentSettingsPatch,
        PaymentSettingsView,
    },
    errors::Result,
};
use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct OptionsQuery {
    total: f64,
}

#[derive(Debug, Deserialize)]
pub struct CommissionRequest {
    subtotal: f64,
}

/// Commission quote together with whether the provider would take the order.
///
/// Eligibility here is checked against the subtotal alone; checkout rechecks
/// it against the full total.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionQuote {
    provider: PaymentProvider,
    #[serde(flatten)]
    commission: Commission,
    eligible: bool,
}

pub async fn options(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<OptionsQuery>,
) -> Result<Json<Vec<PaymentOption>>> {
    commission::payment_options(&state.db, query.total)
        .await
        .map(Json)
}

pub async fn commission(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    ApiJson(request): ApiJson<CommissionRequest>,
) -> Result<Json<CommissionQuote>> {
    let provider: PaymentProvider = provider.parse()?;
    let settings = commission::get_or_create_payment_settings(&state.db, provider).await?;
    let commission = commission::calculate_commission(&settings, request.subtotal)?;
    Ok(Json(CommissionQuote {
        provider,
        eligible: commission::check_eligibility(&settings, request.subtotal),
        commission,
    }))
}

pub async fn get_settings(
    State(state): State<AppState>,
    Path(provider): Path<String>,
) -> Result<Json<PaymentSettingsView>> {
    let provider: PaymentProvider = provider.parse()?;
    let settings = commission::get_or_create_payment_settings(&state.db, provider).await?;
    Ok(Json(PaymentSettingsView::from(&settings)))
}

pub async fn update_settings(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    ApiJson(patch): ApiJson<PaymentSettingsPatch>,
) -> Result<Json<PaymentSettingsView>> {
    let provider: PaymentProvider = provider.parse()?;
    let settings = commission::update_payment_settings(&state.db, provider, patch).await?;
    Ok(Json(PaymentSettingsView::from(&settings)))
}
