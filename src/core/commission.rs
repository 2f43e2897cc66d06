//! Deferred-payment providers - settings singletons, commission and eligibility.
//!
//! Each provider (Tamara, Tabby, Tap) has one settings row keyed by its name.
//! Two independent rules are read from it:
//!
//! - the commission added on top of an order ([`calculate_commission`]), and
//! - whether an order total may be paid with the provider at all ([`check_eligibility`]).
//!
//! The two are never cross-checked: a provider can charge a commission on orders
//! it would not accept, or accept orders without charging one.

use crate::{
    core::{ensure_amount, round2},
    entities::{PaymentSettings, payment_settings},
    errors::{Error, FieldError, Result},
};
use sea_orm::{Set, SqlErr, prelude::*};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Supported deferred-payment providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentProvider {
    Tamara,
    Tabby,
    Tap,
}

impl PaymentProvider {
    /// Every provider, in display order
    pub const ALL: [Self; 3] = [Self::Tamara, Self::Tabby, Self::Tap];

    /// Key of the provider's settings row
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tamara => "tamara",
            Self::Tabby => "tabby",
            Self::Tap => "tap",
        }
    }

    const fn default_display_name(self) -> &'static str {
        match self {
            Self::Tamara => "Tamara service fee",
            Self::Tabby => "Tabby service fee",
            Self::Tap => "Tap service fee",
        }
    }

    const fn default_api_url(self) -> &'static str {
        match self {
            Self::Tamara => "https://api.tamara.co",
            Self::Tabby => "https://api.tabby.ai",
            Self::Tap => "https://api.tap.company/v2",
        }
    }
}

impl fmt::Display for PaymentProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "tamara" => Ok(Self::Tamara),
            "tabby" => Ok(Self::Tabby),
            "tap" => Ok(Self::Tap),
            other => Err(Error::not_found("Payment provider", other)),
        }
    }
}

/// Commission for one order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Commission {
    pub amount: f64,
    /// Percentage applied; zero when the commission is disabled
    pub rate: f64,
    pub display_name: String,
}

/// Checkout view of one provider for a given order total
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOption {
    pub provider: PaymentProvider,
    pub eligible: bool,
    pub min_order_amount: f64,
    pub max_order_amount: f64,
    pub commission: Commission,
}

/// Settings as shown to the admin UI, with credentials masked
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSettingsView {
    pub provider: String,
    pub enabled: bool,
    pub commission_enabled: bool,
    pub commission_rate: f64,
    pub commission_display_name: String,
    pub min_order_amount: f64,
    pub max_order_amount: f64,
    pub api_url: String,
    pub api_token: Option<String>,
    pub public_key: Option<String>,
    pub notification_token: Option<String>,
    pub test_mode: bool,
    pub updated_at: DateTimeUtc,
}

/// Credentials shorter than this are masked whole.
const MASK_MIN_LEN: usize = 8;

fn mask(secret: Option<&String>) -> Option<String> {
    secret.map(|s| {
        let len = s.chars().count();
        if len < MASK_MIN_LEN {
            return "****".to_string();
        }
        let tail: String = s.chars().skip(len - 4).collect();
        format!("****{tail}")
    })
}

impl From<&payment_settings::Model> for PaymentSettingsView {
    fn from(model: &payment_settings::Model) -> Self {
        Self {
            provider: model.provider.clone(),
            enabled: model.enabled,
            commission_enabled: model.commission_enabled,
            commission_rate: model.commission_rate,
            commission_display_name: model.commission_display_name.clone(),
            min_order_amount: model.min_order_amount,
            max_order_amount: model.max_order_amount,
            api_url: model.api_url.clone(),
            api_token: mask(model.api_token.as_ref()),
            public_key: model.public_key.clone(),
            notification_token: mask(model.notification_token.as_ref()),
            test_mode: model.test_mode,
            updated_at: model.updated_at,
        }
    }
}

/// Partial update of a provider's settings. Absent fields are left unchanged.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSettingsPatch {
    pub enabled: Option<bool>,
    pub commission_enabled: Option<bool>,
    pub commission_rate: Option<f64>,
    pub commission_display_name: Option<String>,
    pub min_order_amount: Option<f64>,
    pub max_order_amount: Option<f64>,
    pub api_url: Option<String>,
    pub api_token: Option<String>,
    pub public_key: Option<String>,
    pub notification_token: Option<String>,
    pub test_mode: Option<bool>,
}

/// Returns the provider's settings row, creating it with defaults if absent.
pub async fn get_or_create_payment_settings<C>(
    db: &C,
    provider: PaymentProvider,
) -> Result<payment_settings::Model>
where
    C: ConnectionTrait,
{
    if let Some(existing) = PaymentSettings::find_by_id(provider.as_str()).one(db).await? {
        return Ok(existing);
    }

    let defaults = payment_settings::ActiveModel {
        provider: Set(provider.as_str().to_string()),
        enabled: Set(false),
        commission_enabled: Set(false),
        commission_rate: Set(0.0),
        commission_display_name: Set(provider.default_display_name().to_string()),
        min_order_amount: Set(100.0),
        max_order_amount: Set(5000.0),
        api_url: Set(provider.default_api_url().to_string()),
        api_token: Set(None),
        public_key: Set(None),
        notification_token: Set(None),
        test_mode: Set(true),
        updated_at: Set(chrono::Utc::now()),
    };

    match defaults.insert(db).await {
        Ok(created) => Ok(created),
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            PaymentSettings::find_by_id(provider.as_str())
                .one(db)
                .await?
                .ok_or_else(|| Error::not_found("Payment settings", provider))
        }
        Err(err) => Err(err.into()),
    }
}

/// Applies a partial update to a provider's settings.
///
/// The merged result must satisfy `min_order_amount < max_order_amount` and
/// `0 <= commission_rate <= 100`; otherwise nothing is written and every
/// violated field is reported.
pub async fn update_payment_settings(
    db: &DatabaseConnection,
    provider: PaymentProvider,
    patch: PaymentSettingsPatch,
) -> Result<payment_settings::Model> {
    let current = get_or_create_payment_settings(db, provider).await?;

    let rate = patch.commission_rate.unwrap_or(current.commission_rate);
    let min = patch.min_order_amount.unwrap_or(current.min_order_amount);
    let max = patch.max_order_amount.unwrap_or(current.max_order_amount);

    let mut fields = Vec::new();
    if !rate.is_finite() || !(0.0..=100.0).contains(&rate) {
        fields.push(FieldError::new(
            "commissionRate",
            "Commission rate must be between 0 and 100",
        ));
    }
    if ensure_amount(min).is_err() {
        fields.push(FieldError::new(
            "minOrderAmount",
            "Minimum order amount cannot be negative",
        ));
    }
    if !max.is_finite() || min >= max {
        fields.push(FieldError::new(
            "maxOrderAmount",
            "Maximum order amount must be greater than the minimum",
        ));
    }
    if let Some(name) = &patch.commission_display_name {
        if name.trim().is_empty() {
            fields.push(FieldError::new(
                "commissionDisplayName",
                "Display name cannot be empty",
            ));
        }
    }
    if !fields.is_empty() {
        return Err(Error::Validation { fields });
    }

    let mut settings: payment_settings::ActiveModel = current.into();
    settings.commission_rate = Set(rate);
    settings.min_order_amount = Set(min);
    settings.max_order_amount = Set(max);
    if let Some(enabled) = patch.enabled {
        settings.enabled = Set(enabled);
    }
    if let Some(enabled) = patch.commission_enabled {
        settings.commission_enabled = Set(enabled);
    }
    if let Some(name) = patch.commission_display_name {
        settings.commission_display_name = Set(name.trim().to_string());
    }
    if let Some(url) = patch.api_url {
        settings.api_url = Set(url.trim().to_string());
    }
    if let Some(token) = patch.api_token {
        settings.api_token = Set(Some(token).filter(|t| !t.is_empty()));
    }
    if let Some(key) = patch.public_key {
        settings.public_key = Set(Some(key).filter(|k| !k.is_empty()));
    }
    if let Some(token) = patch.notification_token {
        settings.notification_token = Set(Some(token).filter(|t| !t.is_empty()));
    }
    if let Some(test_mode) = patch.test_mode {
        settings.test_mode = Set(test_mode);
    }
    settings.updated_at = Set(chrono::Utc::now());

    let updated = settings.update(db).await?;
    tracing::info!(
        provider = %provider,
        enabled = updated.enabled,
        commission_enabled = updated.commission_enabled,
        commission_rate = updated.commission_rate,
        "Payment settings updated"
    );
    Ok(updated)
}

/// Computes the commission for an order subtotal.
///
/// A disabled commission is zero with the configured display name; an enabled
/// one is `round2(subtotal * rate / 100)`.
///
/// # Errors
/// Returns `Error::InvalidAmount` if `subtotal` is negative or not finite.
pub fn calculate_commission(
    settings: &payment_settings::Model,
    subtotal: f64,
) -> Result<Commission> {
    let subtotal = ensure_amount(subtotal)?;

    if !settings.commission_enabled {
        return Ok(Commission {
            amount: 0.0,
            rate: 0.0,
            display_name: settings.commission_display_name.clone(),
        });
    }

    Ok(Commission {
        amount: round2(subtotal * settings.commission_rate / 100.0),
        rate: settings.commission_rate,
        display_name: settings.commission_display_name.clone(),
    })
}

/// Whether an order total may be paid with the provider: enabled and within
/// the closed `[min_order_amount, max_order_amount]` window.
#[must_use]
pub fn check_eligibility(settings: &payment_settings::Model, total_amount: f64) -> bool {
    settings.enabled
        && settings.min_order_amount <= total_amount
        && total_amount <= settings.max_order_amount
}

/// Builds the checkout view of every provider for an order total.
pub async fn payment_options(db: &DatabaseConnection, total_amount: f64) -> Result<Vec<PaymentOption>> {
    let total_amount = ensure_amount(total_amount)?;
    let mut options = Vec::with_capacity(PaymentProvider::ALL.len());

    for provider in PaymentProvider::ALL {
        let settings = get_or_create_payment_settings(db, provider).await?;
        options.push(PaymentOption {
            provider,
            eligible: check_eligibility(&settings, total_amount),
            min_order_amount: settings.min_order_amount,
            max_order_amount: settings.max_order_amount,
            commission: calculate_commission(&settings, total_amount)?,
        });
    }

    Ok(options)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_short_credentials_are_masked_whole() {
        assert_eq!(mask(None), None);
        assert_eq!(mask(Some(&"abcd".to_string())).as_deref(), Some("****"));
        assert_eq!(mask(Some(&"abcdefg".to_string())).as_deref(), Some("****"));
        assert_eq!(
            mask(Some(&"sk_live_abcdef".to_string())).as_deref(),
            Some("****cdef")
        );
    }

    fn settings(commission_enabled: bool, rate: f64) -> payment_settings::Model {
        payment_settings::Model {
            provider: "tamara".to_string(),
            enabled: true,
            commission_enabled,
            commission_rate: rate,
            commission_display_name: "Tamara fee".to_string(),
            min_order_amount: 100.0,
            max_order_amount: 5000.0,
            api_url: String::new(),
            api_token: None,
            public_key: None,
            notification_token: None,
            test_mode: true,
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_three_percent_of_one_thousand() {
        let commission = calculate_commission(&settings(true, 3.0), 1000.0).unwrap();
        assert_eq!(commission.amount, 30.0);
        assert_eq!(commission.rate, 3.0);
        assert_eq!(commission.display_name, "Tamara fee");
    }

    #[test]
    fn test_commission_rounds_to_cents() {
        let commission = calculate_commission(&settings(true, 2.5), 99.99).unwrap();
        assert_eq!(commission.amount, 2.5);
    }

    #[test]
    fn test_zero_subtotal_is_zero_commission() {
        assert_eq!(calculate_commission(&settings(true, 3.0), 0.0).unwrap().amount, 0.0);
        assert_eq!(calculate_commission(&settings(false, 3.0), 0.0).unwrap().amount, 0.0);
    }

    #[test]
    fn test_disabled_commission_is_always_zero() {
        let disabled = settings(false, 7.0);
        for subtotal in [1.0, 150.0, 4999.99, 1_000_000.0] {
            let commission = calculate_commission(&disabled, subtotal).unwrap();
            assert_eq!(commission.amount, 0.0);
            assert_eq!(commission.display_name, "Tamara fee");
        }
    }

    #[test]
    fn test_commission_is_monotonic_in_subtotal() {
        let enabled = settings(true, 3.3);
        let mut previous = 0.0;
        for step in 0..500 {
            let subtotal = f64::from(step) * 7.77;
            let amount = calculate_commission(&enabled, subtotal).unwrap().amount;
            assert!(amount >= previous, "commission decreased at {subtotal}");
            previous = amount;
        }
    }

    #[test]
    fn test_negative_subtotal_rejected() {
        let result = calculate_commission(&settings(true, 3.0), -5.0);
        assert!(matches!(result, Err(Error::InvalidAmount { .. })));
    }

    #[test]
    fn test_eligibility_closed_interval() {
        let enabled = settings(false, 0.0);
        assert!(!check_eligibility(&enabled, 99.99));
        assert!(check_eligibility(&enabled, 100.0));
        assert!(check_eligibility(&enabled, 2500.0));
        assert!(check_eligibility(&enabled, 5000.0));
        assert!(!check_eligibility(&enabled, 5000.01));

        let switched_off = payment_settings::Model {
            enabled: false,
            ..settings(true, 3.0)
        };
        assert!(!check_eligibility(&switched_off, 2500.0));
    }

    #[test]
    fn test_provider_parsing() {
        assert_eq!("Tabby".parse::<PaymentProvider>().unwrap(), PaymentProvider::Tabby);
        assert!("klarna".parse::<PaymentProvider>().is_err());
    }

    #[tokio::test]
    async fn test_get_or_create_payment_settings_defaults() -> Result<()> {
        let db = setup_test_db().await?;

        let created = get_or_create_payment_settings(&db, PaymentProvider::Tamara).await?;
        assert_eq!(created.provider, "tamara");
        assert!(!created.enabled);
        assert!(created.min_order_amount < created.max_order_amount);

        let again = get_or_create_payment_settings(&db, PaymentProvider::Tamara).await?;
        assert_eq!(created, again);
        assert_eq!(PaymentSettings::find().count(&db).await?, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_update_payment_settings_enforces_bounds() -> Result<()> {
        let db = setup_test_db().await?;

        let result = update_payment_settings(
            &db,
            PaymentProvider::Tabby,
            PaymentSettingsPatch {
                min_order_amount: Some(6000.0),
                ..PaymentSettingsPatch::default()
            },
        )
        .await;
        match result {
            Err(Error::Validation { fields }) => {
                assert_eq!(fields.len(), 1);
                assert_eq!(fields[0].field, "maxOrderAmount");
            }
            other => panic!("expected validation error, got {other:?}"),
        }

        let result = update_payment_settings(
            &db,
            PaymentProvider::Tabby,
            PaymentSettingsPatch {
                commission_rate: Some(150.0),
                max_order_amount: Some(50.0),
                ..PaymentSettingsPatch::default()
            },
        )
        .await;
        assert!(matches!(result, Err(Error::Validation { fields }) if fields.len() == 2));

        // Nothing was written
        let unchanged = get_or_create_payment_settings(&db, PaymentProvider::Tabby).await?;
        assert_eq!(unchanged.min_order_amount, 100.0);
        assert_eq!(unchanged.commission_rate, 0.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_update_payment_settings_and_options() -> Result<()> {
        let db = setup_test_db().await?;

        let updated = update_payment_settings(
            &db,
            PaymentProvider::Tamara,
            PaymentSettingsPatch {
                enabled: Some(true),
                commission_enabled: Some(true),
                commission_rate: Some(3.0),
                api_token: Some("secret-token-1234".to_string()),
                ..PaymentSettingsPatch::default()
            },
        )
        .await?;
        assert_eq!(updated.commission_rate, 3.0);

        let view = PaymentSettingsView::from(&updated);
        assert_eq!(view.api_token.as_deref(), Some("****1234"));
        assert!(view.notification_token.is_none());

        let options = payment_options(&db, 1000.0).await?;
        assert_eq!(options.len(), 3);
        let tamara = options
            .iter()
            .find(|o| o.provider == PaymentProvider::Tamara)
            .unwrap();
        assert!(tamara.eligible);
        assert_eq!(tamara.commission.amount, 30.0);

        let tabby = options
            .iter()
            .find(|o| o.provider == PaymentProvider::Tabby)
            .unwrap();
        assert!(!tabby.eligible);
        assert_eq!(tabby.commission.amount, 0.0);

        Ok(())
    }
}
