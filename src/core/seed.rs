//! Startup seeding from `config.toml`.
//!
//! Creates what the configuration describes and is missing; anything already
//! present is left as the back office last saved it.

use crate::{
    config::store::{Config, ProviderConfig},
    core::{auth, settings, shipping},
    errors::Result,
};
use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use tracing::{debug, info, instrument};

/// What a seeding run created
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub providers_created: usize,
    pub providers_skipped: usize,
    pub admins: usize,
}

async fn seed_provider<C>(db: &C, provider: &ProviderConfig) -> Result<bool>
where
    C: ConnectionTrait,
{
    if shipping::get_provider_by_name(db, &provider.name.trim().to_lowercase())
        .await?
        .is_some()
    {
        debug!("Shipping provider '{}' already exists. Skipping.", provider.name);
        return Ok(false);
    }

    let created = shipping::create_provider(
        db,
        &provider.name,
        &provider.display_name,
        provider.estimated_days,
    )
    .await?;
    for bracket in &provider.weight_brackets {
        settings::set_weight_bracket(db, created.id, bracket.max_weight, bracket.price).await?;
    }
    for rate in &provider.rates {
        shipping::upsert_rate(db, created.id, &rate.city, rate.price, rate.estimated_days).await?;
    }

    info!(
        "Seeded shipping provider '{}' with {} weight brackets and {} city rates",
        created.name,
        provider.weight_brackets.len(),
        provider.rates.len()
    );
    Ok(true)
}

/// Seeds store settings, shipping providers and admin accounts in one transaction.
#[instrument(skip(db, config))]
pub async fn seed_from_config(db: &DatabaseConnection, config: &Config) -> Result<SeedReport> {
    info!(
        "Seeding store data. Found {} providers and {} admins in configuration.",
        config.providers.len(),
        config.admins.len()
    );
    let txn = db.begin().await?;
    let mut report = SeedReport::default();

    settings::initialize_settings(&txn, &config.store).await?;

    for provider in &config.providers {
        if seed_provider(&txn, provider).await? {
            report.providers_created += 1;
        } else {
            report.providers_skipped += 1;
        }
    }

    for admin in &config.admins {
        auth::ensure_admin(&txn, &admin.name, &admin.phone, &admin.password).await?;
        report.admins += 1;
    }

    txn.commit().await?;
    info!(?report, "Finished seeding store data");
    Ok(report)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    const SEED: &str = r#"
        [store]
        currency = "SAR"
        default_shipping_price = 35.0
        free_shipping_threshold = 500.0

        [[providers]]
        name = "Aramex"
        display_name = "Aramex Express"
        estimated_days = 2

        [[providers.weight_brackets]]
        max_weight = 1.0
        price = 25.0

        [[providers.weight_brackets]]
        max_weight = 5.0
        price = 45.0

        [[providers.rates]]
        city = "Riyadh"
        price = 15.0
        estimated_days = 1

        [[admins]]
        name = "Owner"
        phone = "0500000001"
        password = "change-me-now"
    "#;

    #[tokio::test]
    async fn test_seed_creates_everything_once() -> Result<()> {
        let db = setup_test_db().await?;
        let config: Config = toml::from_str(SEED).unwrap();

        let first = seed_from_config(&db, &config).await?;
        assert_eq!(first.providers_created, 1);
        assert_eq!(first.admins, 1);

        let store = settings::get_or_create_settings(&db).await?;
        assert_eq!(store.default_shipping_price, 35.0);
        assert_eq!(store.free_shipping_threshold, Some(500.0));

        let provider = shipping::get_provider_by_name(&db, "aramex").await?.unwrap();
        let riyadh = shipping::resolve_rate(&db, "Riyadh", provider.id, 1.0).await?;
        assert_eq!(riyadh.price, 15.0);
        assert_eq!(riyadh.estimated_days, 1);
        let jeddah = shipping::resolve_rate(&db, "Jeddah", provider.id, 3.0).await?;
        assert_eq!(jeddah.price, 45.0);
        assert_eq!(jeddah.estimated_days, 2);

        let second = seed_from_config(&db, &config).await?;
        assert_eq!(second.providers_created, 0);
        assert_eq!(second.providers_skipped, 1);
        assert_eq!(shipping::list_providers(&db, false).await?.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_seed_keeps_edited_settings() -> Result<()> {
        let db = setup_test_db().await?;
        let config: Config = toml::from_str(SEED).unwrap();
        seed_from_config(&db, &config).await?;

        settings::update_settings(
            &db,
            settings::SettingsPatch {
                default_shipping_price: Some(40.0),
                ..Default::default()
            },
        )
        .await?;
        seed_from_config(&db, &config).await?;

        let store = settings::get_or_create_settings(&db).await?;
        assert_eq!(store.default_shipping_price, 40.0);

        Ok(())
    }
}
