//! Store settings business logic - the keyed singleton and the weight-bracket price table.
//!
//! The settings row is only ever reached through [`get_or_create_settings`], which
//! looks it up by its fixed key and creates it with defaults when absent.

use crate::{
    config::store::StoreDefaults,
    core::ensure_amount,
    entities::{
        SettingsShippingPrice, StoreSettings, settings_shipping_price,
        store_settings::{self, SINGLETON_KEY},
    },
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, SqlErr, prelude::*};
use serde::{Deserialize, Deserializer};

/// Partial update of the store settings. Absent fields are left unchanged.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub currency: Option<String>,
    pub default_shipping_price: Option<f64>,
    pub default_estimated_days: Option<i32>,
    /// `Some(None)` clears the threshold
    #[serde(default, deserialize_with = "explicit_null")]
    pub free_shipping_threshold: Option<Option<f64>>,
    pub maintenance_enabled: Option<bool>,
    pub maintenance_diagnostic_fee: Option<f64>,
    pub maintenance_priority_fee: Option<f64>,
}

fn explicit_null<'de, D>(deserializer: D) -> std::result::Result<Option<Option<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<f64>::deserialize(deserializer).map(Some)
}

/// Returns the settings row, creating it from `defaults` if it does not exist yet.
pub async fn initialize_settings<C>(db: &C, defaults: &StoreDefaults) -> Result<store_settings::Model>
where
    C: ConnectionTrait,
{
    if let Some(existing) = StoreSettings::find_by_id(SINGLETON_KEY).one(db).await? {
        return Ok(existing);
    }

    let settings = store_settings::ActiveModel {
        key: Set(SINGLETON_KEY.to_string()),
        currency: Set(defaults.currency.clone()),
        default_shipping_price: Set(ensure_amount(defaults.default_shipping_price)?),
        default_estimated_days: Set(defaults.default_estimated_days.max(0)),
        free_shipping_threshold: Set(defaults.free_shipping_threshold),
        maintenance_enabled: Set(true),
        maintenance_diagnostic_fee: Set(ensure_amount(defaults.maintenance_diagnostic_fee)?),
        maintenance_priority_fee: Set(ensure_amount(defaults.maintenance_priority_fee)?),
        updated_at: Set(chrono::Utc::now()),
    };

    match settings.insert(db).await {
        Ok(created) => {
            tracing::info!("Created store settings with defaults");
            Ok(created)
        }
        // Another request created it between our read and insert.
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            StoreSettings::find_by_id(SINGLETON_KEY)
                .one(db)
                .await?
                .ok_or_else(|| Error::not_found("Store settings", SINGLETON_KEY))
        }
        Err(err) => Err(err.into()),
    }
}

/// Single accessor for the store settings singleton.
pub async fn get_or_create_settings<C>(db: &C) -> Result<store_settings::Model>
where
    C: ConnectionTrait,
{
    initialize_settings(db, &StoreDefaults::default()).await
}

/// Applies a partial update to the store settings.
///
/// # Errors
/// Returns `Error::InvalidAmount` for negative or non-finite prices and
/// `Error::Validation` for an empty currency or negative delivery estimate.
pub async fn update_settings(
    db: &DatabaseConnection,
    patch: SettingsPatch,
) -> Result<store_settings::Model> {
    let current = get_or_create_settings(db).await?;
    let mut settings: store_settings::ActiveModel = current.into();

    if let Some(currency) = patch.currency {
        let currency = currency.trim().to_uppercase();
        if currency.is_empty() {
            return Err(Error::invalid_field("currency", "Currency cannot be empty"));
        }
        settings.currency = Set(currency);
    }
    if let Some(price) = patch.default_shipping_price {
        settings.default_shipping_price = Set(ensure_amount(price)?);
    }
    if let Some(days) = patch.default_estimated_days {
        if days < 0 {
            return Err(Error::invalid_field(
                "defaultEstimatedDays",
                "Estimated days cannot be negative",
            ));
        }
        settings.default_estimated_days = Set(days);
    }
    if let Some(threshold) = patch.free_shipping_threshold {
        settings.free_shipping_threshold = Set(threshold.map(ensure_amount).transpose()?);
    }
    if let Some(enabled) = patch.maintenance_enabled {
        settings.maintenance_enabled = Set(enabled);
    }
    if let Some(fee) = patch.maintenance_diagnostic_fee {
        settings.maintenance_diagnostic_fee = Set(ensure_amount(fee)?);
    }
    if let Some(fee) = patch.maintenance_priority_fee {
        settings.maintenance_priority_fee = Set(ensure_amount(fee)?);
    }
    settings.updated_at = Set(chrono::Utc::now());

    let updated = settings.update(db).await?;
    tracing::info!("Store settings updated");
    Ok(updated)
}

/// Lists a provider's weight brackets, lightest first.
pub async fn list_weight_brackets<C>(
    db: &C,
    provider_id: i64,
) -> Result<Vec<settings_shipping_price::Model>>
where
    C: ConnectionTrait,
{
    SettingsShippingPrice::find()
        .filter(settings_shipping_price::Column::ProviderId.eq(provider_id))
        .order_by_asc(settings_shipping_price::Column::MaxWeight)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Sets the default price of a provider's weight bracket, creating the bracket if needed.
///
/// # Errors
/// Returns `Error::InvalidAmount` if `max_weight` is not positive or `price` is negative.
pub async fn set_weight_bracket<C>(
    db: &C,
    provider_id: i64,
    max_weight: f64,
    price: f64,
) -> Result<settings_shipping_price::Model>
where
    C: ConnectionTrait,
{
    if !max_weight.is_finite() || max_weight <= 0.0 {
        return Err(Error::InvalidAmount { amount: max_weight });
    }
    let price = ensure_amount(price)?;

    let existing = SettingsShippingPrice::find()
        .filter(settings_shipping_price::Column::ProviderId.eq(provider_id))
        .filter(settings_shipping_price::Column::MaxWeight.eq(max_weight))
        .one(db)
        .await?;

    match existing {
        Some(bracket) => {
            let mut bracket: settings_shipping_price::ActiveModel = bracket.into();
            bracket.price = Set(price);
            bracket.update(db).await.map_err(Into::into)
        }
        None => settings_shipping_price::ActiveModel {
            provider_id: Set(provider_id),
            max_weight: Set(max_weight),
            price: Set(price),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(Into::into),
    }
}

/// Removes a weight bracket.
pub async fn delete_weight_bracket(db: &DatabaseConnection, bracket_id: i64) -> Result<()> {
    let result = SettingsShippingPrice::delete_by_id(bracket_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("Weight bracket", bracket_id));
    }
    Ok(())
}

/// Picks the default price for a parcel from a provider's brackets.
///
/// The lightest bracket that still covers `weight` wins; a parcel heavier than
/// every bracket uses the heaviest one. `None` when there are no brackets.
#[must_use]
pub fn bracket_price(brackets: &[settings_shipping_price::Model], weight: f64) -> Option<f64> {
    brackets
        .iter()
        .filter(|b| b.max_weight >= weight)
        .min_by(|a, b| a.max_weight.total_cmp(&b.max_weight))
        .or_else(|| {
            brackets
                .iter()
                .max_by(|a, b| a.max_weight.total_cmp(&b.max_weight))
        })
        .map(|b| b.price)
}

/// Returns the provider's default price for `weight`, falling back to the store-wide default.
pub async fn default_price_for<C>(db: &C, provider_id: i64, weight: f64) -> Result<f64>
where
    C: ConnectionTrait,
{
    let brackets = list_weight_brackets(db, provider_id).await?;
    match bracket_price(&brackets, weight) {
        Some(price) => Ok(price),
        None => Ok(get_or_create_settings(db).await?.default_shipping_price),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    fn bracket(max_weight: f64, price: f64) -> settings_shipping_price::Model {
        settings_shipping_price::Model {
            id: 0,
            provider_id: 1,
            max_weight,
            price,
        }
    }

    #[test]
    fn test_bracket_price_selection() {
        let brackets = vec![bracket(5.0, 45.0), bracket(1.0, 30.0), bracket(10.0, 60.0)];

        assert_eq!(bracket_price(&brackets, 0.5), Some(30.0));
        assert_eq!(bracket_price(&brackets, 1.0), Some(30.0));
        assert_eq!(bracket_price(&brackets, 1.5), Some(45.0));
        assert_eq!(bracket_price(&brackets, 10.0), Some(60.0));
        // Heavier than every bracket uses the heaviest
        assert_eq!(bracket_price(&brackets, 25.0), Some(60.0));
        assert_eq!(bracket_price(&[], 1.0), None);
    }

    #[tokio::test]
    async fn test_get_or_create_settings_creates_once() -> Result<()> {
        let db = setup_test_db().await?;

        let first = get_or_create_settings(&db).await?;
        assert_eq!(first.key, SINGLETON_KEY);
        assert_eq!(first.currency, "SAR");
        assert_eq!(first.default_shipping_price, 30.0);

        let second = get_or_create_settings(&db).await?;
        assert_eq!(first, second);
        assert_eq!(StoreSettings::find().count(&db).await?, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_initialize_settings_keeps_existing_row() -> Result<()> {
        let db = setup_test_db().await?;
        get_or_create_settings(&db).await?;

        let defaults = StoreDefaults {
            default_shipping_price: 99.0,
            ..StoreDefaults::default()
        };
        let settings = initialize_settings(&db, &defaults).await?;
        assert_eq!(settings.default_shipping_price, 30.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_update_settings_partial() -> Result<()> {
        let db = setup_test_db().await?;

        let updated = update_settings(
            &db,
            SettingsPatch {
                default_shipping_price: Some(25.0),
                free_shipping_threshold: Some(Some(400.0)),
                ..SettingsPatch::default()
            },
        )
        .await?;
        assert_eq!(updated.default_shipping_price, 25.0);
        assert_eq!(updated.free_shipping_threshold, Some(400.0));
        assert_eq!(updated.currency, "SAR");

        let cleared = update_settings(
            &db,
            SettingsPatch {
                free_shipping_threshold: Some(None),
                ..SettingsPatch::default()
            },
        )
        .await?;
        assert_eq!(cleared.free_shipping_threshold, None);
        assert_eq!(cleared.default_shipping_price, 25.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_update_settings_rejects_negative_price() -> Result<()> {
        let db = setup_test_db().await?;

        let result = update_settings(
            &db,
            SettingsPatch {
                default_shipping_price: Some(-1.0),
                ..SettingsPatch::default()
            },
        )
        .await;
        assert!(matches!(result, Err(Error::InvalidAmount { .. })));

        Ok(())
    }

    #[test]
    fn test_settings_patch_distinguishes_null_from_absent() {
        let absent: SettingsPatch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.free_shipping_threshold, None);

        let null: SettingsPatch = serde_json::from_str(r#"{"freeShippingThreshold": null}"#).unwrap();
        assert_eq!(null.free_shipping_threshold, Some(None));
    }

    #[tokio::test]
    async fn test_set_weight_bracket_upserts() -> Result<()> {
        let db = setup_test_db().await?;
        let provider = create_test_provider(&db, "aramex").await?;

        set_weight_bracket(&db, provider.id, 1.0, 30.0).await?;
        set_weight_bracket(&db, provider.id, 1.0, 32.0).await?;
        set_weight_bracket(&db, provider.id, 5.0, 45.0).await?;

        let brackets = list_weight_brackets(&db, provider.id).await?;
        assert_eq!(brackets.len(), 2);
        assert_eq!(brackets[0].price, 32.0);
        assert_eq!(brackets[1].max_weight, 5.0);

        let invalid = set_weight_bracket(&db, provider.id, 0.0, 10.0).await;
        assert!(matches!(invalid, Err(Error::InvalidAmount { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_default_price_falls_back_to_store_default() -> Result<()> {
        let db = setup_test_db().await?;
        let provider = create_test_provider(&db, "smsa").await?;

        assert_eq!(default_price_for(&db, provider.id, 1.0).await?, 30.0);

        set_weight_bracket(&db, provider.id, 2.0, 18.0).await?;
        assert_eq!(default_price_for(&db, provider.id, 1.0).await?, 18.0);

        Ok(())
    }
}
