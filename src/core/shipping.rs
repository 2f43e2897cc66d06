//! Shipping business logic - providers, per-city rates and rate resolution.
//!
//! A price is resolved through two tiers: an active per-city override for the
//! provider, then the provider's weight-bracket default from the store settings
//! (which itself falls back to the store-wide default price). Every resolved
//! price carries a [`RateSource`] tag saying which tier produced it.

use crate::{
    core::{ensure_amount, settings},
    entities::{
        SettingsShippingPrice, ShippingProvider, ShippingRate, settings_shipping_price,
        shipping_provider, shipping_rate,
    },
    errors::{Error, Result, map_unique_violation},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};

/// Which tier produced a resolved shipping price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    /// An active per-city override for the provider
    SpecificRate,
    /// The provider's default from the store settings
    SettingsPrice,
}

impl RateSource {
    /// Wire name of the tag
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SpecificRate => "specific_rate",
            Self::SettingsPrice => "settings_price",
        }
    }
}

/// Result of [`resolve_rate`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedRate {
    pub provider_id: i64,
    pub provider_name: String,
    /// City as matched (whitespace-normalized)
    pub city: String,
    pub price: f64,
    pub source: RateSource,
    pub estimated_days: i32,
}

/// A provider together with its city overrides and weight brackets
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderWithRates {
    #[serde(flatten)]
    pub provider: shipping_provider::Model,
    pub rates: Vec<shipping_rate::Model>,
    pub weight_brackets: Vec<settings_shipping_price::Model>,
}

/// Partial update of a provider
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderPatch {
    pub display_name: Option<String>,
    pub is_active: Option<bool>,
    pub estimated_days: Option<i32>,
}

/// Trims a free-text city name and collapses runs of whitespace.
#[must_use]
pub fn normalize_city(city: &str) -> String {
    city.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn ensure_estimated_days(days: i32) -> Result<i32> {
    if days < 0 {
        return Err(Error::invalid_field(
            "estimatedDays",
            "Estimated days cannot be negative",
        ));
    }
    Ok(days)
}

/// Creates a shipping provider.
///
/// # Errors
/// Returns `Error::Validation` for an empty name and `Error::DuplicateKey`
/// if a provider with the same name exists.
pub async fn create_provider<C>(
    db: &C,
    name: &str,
    display_name: &str,
    estimated_days: i32,
) -> Result<shipping_provider::Model>
where
    C: ConnectionTrait,
{
    let name = name.trim().to_lowercase();
    if name.is_empty() {
        return Err(Error::invalid_field("name", "Provider name cannot be empty"));
    }
    let display_name = display_name.trim();
    let now = chrono::Utc::now();

    let provider = shipping_provider::ActiveModel {
        display_name: Set(if display_name.is_empty() {
            name.clone()
        } else {
            display_name.to_string()
        }),
        name: Set(name),
        is_active: Set(true),
        estimated_days: Set(ensure_estimated_days(estimated_days)?),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    provider
        .insert(db)
        .await
        .map_err(|e| map_unique_violation(e, "name"))
}

/// Finds a provider by its unique name.
pub async fn get_provider_by_name<C>(db: &C, name: &str) -> Result<Option<shipping_provider::Model>>
where
    C: ConnectionTrait,
{
    ShippingProvider::find()
        .filter(shipping_provider::Column::Name.eq(name.trim().to_lowercase()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a provider by id.
pub async fn get_provider<C>(db: &C, provider_id: i64) -> Result<Option<shipping_provider::Model>>
where
    C: ConnectionTrait,
{
    ShippingProvider::find_by_id(provider_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists providers ordered by display name.
pub async fn list_providers(
    db: &DatabaseConnection,
    active_only: bool,
) -> Result<Vec<shipping_provider::Model>> {
    let mut query = ShippingProvider::find().order_by_asc(shipping_provider::Column::DisplayName);
    if active_only {
        query = query.filter(shipping_provider::Column::IsActive.eq(true));
    }
    query.all(db).await.map_err(Into::into)
}

/// Applies a partial update to a provider.
pub async fn update_provider(
    db: &DatabaseConnection,
    provider_id: i64,
    patch: ProviderPatch,
) -> Result<shipping_provider::Model> {
    let mut provider: shipping_provider::ActiveModel = get_provider(db, provider_id)
        .await?
        .ok_or_else(|| Error::not_found("Shipping provider", provider_id))?
        .into();

    if let Some(display_name) = patch.display_name {
        let display_name = display_name.trim().to_string();
        if display_name.is_empty() {
            return Err(Error::invalid_field(
                "displayName",
                "Display name cannot be empty",
            ));
        }
        provider.display_name = Set(display_name);
    }
    if let Some(is_active) = patch.is_active {
        provider.is_active = Set(is_active);
    }
    if let Some(days) = patch.estimated_days {
        provider.estimated_days = Set(ensure_estimated_days(days)?);
    }
    provider.updated_at = Set(chrono::Utc::now());

    provider.update(db).await.map_err(Into::into)
}

/// Returns the provider with its rates and weight brackets, the embedded admin view.
pub async fn get_provider_with_rates(
    db: &DatabaseConnection,
    provider_id: i64,
) -> Result<ProviderWithRates> {
    let provider = get_provider(db, provider_id)
        .await?
        .ok_or_else(|| Error::not_found("Shipping provider", provider_id))?;
    let rates = list_rates(db, provider_id).await?;
    let weight_brackets = settings::list_weight_brackets(db, provider_id).await?;

    Ok(ProviderWithRates {
        provider,
        rates,
        weight_brackets,
    })
}

/// Hard-deletes a provider together with its rates and weight brackets.
pub async fn delete_provider(db: &DatabaseConnection, provider_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    ShippingRate::delete_many()
        .filter(shipping_rate::Column::ProviderId.eq(provider_id))
        .exec(&txn)
        .await?;
    SettingsShippingPrice::delete_many()
        .filter(settings_shipping_price::Column::ProviderId.eq(provider_id))
        .exec(&txn)
        .await?;
    let result = ShippingProvider::delete_by_id(provider_id).exec(&txn).await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("Shipping provider", provider_id));
    }

    txn.commit().await?;
    tracing::info!(provider_id, "Deleted shipping provider");
    Ok(())
}

/// Lists a provider's city overrides ordered by city.
pub async fn list_rates<C>(db: &C, provider_id: i64) -> Result<Vec<shipping_rate::Model>>
where
    C: ConnectionTrait,
{
    ShippingRate::find()
        .filter(shipping_rate::Column::ProviderId.eq(provider_id))
        .order_by_asc(shipping_rate::Column::City)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Sets the override price for `(provider, city)`, creating or reactivating the row.
///
/// # Errors
/// Returns `Error::NotFound` for an unknown provider, `Error::Validation` for
/// an empty city and `Error::InvalidAmount` for a negative price.
pub async fn upsert_rate<C>(
    db: &C,
    provider_id: i64,
    city: &str,
    price: f64,
    estimated_days: Option<i32>,
) -> Result<shipping_rate::Model>
where
    C: ConnectionTrait,
{
    let city = normalize_city(city);
    if city.is_empty() {
        return Err(Error::invalid_field("city", "City cannot be empty"));
    }
    let price = ensure_amount(price)?;
    let estimated_days = estimated_days.map(ensure_estimated_days).transpose()?;

    if get_provider(db, provider_id).await?.is_none() {
        return Err(Error::not_found("Shipping provider", provider_id));
    }

    let existing = ShippingRate::find()
        .filter(shipping_rate::Column::ProviderId.eq(provider_id))
        .filter(shipping_rate::Column::City.eq(city.as_str()))
        .one(db)
        .await?;
    let now = chrono::Utc::now();

    match existing {
        Some(rate) => {
            let mut rate: shipping_rate::ActiveModel = rate.into();
            rate.price = Set(price);
            rate.estimated_days = Set(estimated_days);
            rate.is_active = Set(true);
            rate.updated_at = Set(now);
            rate.update(db).await.map_err(Into::into)
        }
        None => shipping_rate::ActiveModel {
            provider_id: Set(provider_id),
            city: Set(city),
            price: Set(price),
            is_active: Set(true),
            estimated_days: Set(estimated_days),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(|e| map_unique_violation(e, "city")),
    }
}

/// Turns a city override on or off without deleting it.
pub async fn set_rate_active(
    db: &DatabaseConnection,
    rate_id: i64,
    is_active: bool,
) -> Result<shipping_rate::Model> {
    let mut rate: shipping_rate::ActiveModel = ShippingRate::find_by_id(rate_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Shipping rate", rate_id))?
        .into();
    rate.is_active = Set(is_active);
    rate.updated_at = Set(chrono::Utc::now());
    rate.update(db).await.map_err(Into::into)
}

/// Hard-deletes a city override.
pub async fn delete_rate(db: &DatabaseConnection, rate_id: i64) -> Result<()> {
    let result = ShippingRate::delete_by_id(rate_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("Shipping rate", rate_id));
    }
    Ok(())
}

/// Resolves the shipping price for a parcel of `weight` kilograms to `city` with a provider.
///
/// Any city gets a price: without an active override the provider's settings
/// default is used and the result is tagged [`RateSource::SettingsPrice`].
///
/// # Errors
/// - `Error::Validation` on `weight` if it is not a positive number
/// - `Error::NotFound` if the provider does not exist
/// - `Error::ProviderInactive` if the provider is switched off
pub async fn resolve_rate<C>(
    db: &C,
    city: &str,
    provider_id: i64,
    weight: f64,
) -> Result<ResolvedRate>
where
    C: ConnectionTrait,
{
    if !weight.is_finite() || weight <= 0.0 {
        return Err(Error::invalid_field(
            "weight",
            "Weight must be a positive number",
        ));
    }

    let provider = get_provider(db, provider_id)
        .await?
        .ok_or_else(|| Error::not_found("Shipping provider", provider_id))?;
    if !provider.is_active {
        return Err(Error::ProviderInactive {
            name: provider.display_name,
        });
    }

    let city = normalize_city(city);
    let specific = ShippingRate::find()
        .filter(shipping_rate::Column::ProviderId.eq(provider_id))
        .filter(shipping_rate::Column::City.eq(city.as_str()))
        .filter(shipping_rate::Column::IsActive.eq(true))
        .one(db)
        .await?;

    let resolved = match specific {
        Some(rate) => ResolvedRate {
            provider_id,
            provider_name: provider.display_name,
            city,
            price: rate.price,
            source: RateSource::SpecificRate,
            estimated_days: rate.estimated_days.unwrap_or(provider.estimated_days),
        },
        None => ResolvedRate {
            provider_id,
            provider_name: provider.display_name,
            city,
            price: settings::default_price_for(db, provider_id, weight).await?,
            source: RateSource::SettingsPrice,
            estimated_days: provider.estimated_days,
        },
    };

    tracing::debug!(
        provider_id,
        city = %resolved.city,
        price = resolved.price,
        source = resolved.source.as_str(),
        "Resolved shipping rate"
    );
    Ok(resolved)
}

/// Resolves a price with every active provider, cheapest first.
pub async fn quote_all(
    db: &DatabaseConnection,
    city: &str,
    weight: f64,
) -> Result<Vec<ResolvedRate>> {
    let providers = list_providers(db, true).await?;
    let mut quotes = Vec::with_capacity(providers.len());
    for provider in providers {
        quotes.push(resolve_rate(db, city, provider.id, weight).await?);
    }
    quotes.sort_by(|a, b| a.price.total_cmp(&b.price));
    Ok(quotes)
}
