//! Database configuration module for the storefront service.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the database schema always matches the Rust structs without hand-written SQL.
//! Composite unique indexes that `SeaORM` attributes cannot express are added afterwards.

use crate::entities::{
    Counter, MaintenancePart, MaintenanceRequest, Order, OrderItem, PaymentSettings, Product,
    SettingsShippingPrice, SettingsShippingPriceColumn, ShippingProvider, ShippingRate,
    ShippingRateColumn, StatusHistory, StoreSettings, User,
};
use crate::errors::Result;
use sea_orm::sea_query::{Index, IndexCreateStatement, TableCreateStatement};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/storefront.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns default `SQLite` path.
///
/// This function looks for `DATABASE_URL` in the environment and falls back to
/// a default local `SQLite` file if not found.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by `url`.
///
/// For file-backed `SQLite` URLs the parent directory is created first.
pub async fn create_connection(url: &str) -> Result<DatabaseConnection> {
    if let Some(path) = url.strip_prefix("sqlite://") {
        let file = path.split('?').next().unwrap_or(path);
        if let Some(parent) = std::path::Path::new(file).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }

    tracing::debug!("Connecting to database at {url}");
    Database::connect(url).await.map_err(Into::into)
}

fn table<E: EntityTrait>(schema: &Schema, entity: E) -> TableCreateStatement {
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    statement
}

fn unique_index<E: EntityTrait, C: sea_orm::sea_query::IntoIden>(
    name: &str,
    entity: E,
    columns: [C; 2],
) -> IndexCreateStatement {
    let [first, second] = columns;
    Index::create()
        .name(name)
        .table(entity)
        .col(first)
        .col(second)
        .unique()
        .if_not_exists()
        .to_owned()
}

/// Creates all necessary database tables using `SeaORM`'s schema generation from entity definitions.
///
/// Creation is idempotent, so it runs on every start. Parents are created before
/// the tables that reference them.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let tables = [
        table(&schema, StoreSettings),
        table(&schema, ShippingProvider),
        table(&schema, SettingsShippingPrice),
        table(&schema, ShippingRate),
        table(&schema, Counter),
        table(&schema, MaintenanceRequest),
        table(&schema, StatusHistory),
        table(&schema, MaintenancePart),
        table(&schema, PaymentSettings),
        table(&schema, User),
        table(&schema, Product),
        table(&schema, Order),
        table(&schema, OrderItem),
    ];

    for statement in &tables {
        db.execute(builder.build(statement)).await?;
    }

    let indexes = [
        unique_index(
            "idx_shipping_rates_provider_city",
            ShippingRate,
            [ShippingRateColumn::ProviderId, ShippingRateColumn::City],
        ),
        unique_index(
            "idx_settings_prices_provider_weight",
            SettingsShippingPrice,
            [
                SettingsShippingPriceColumn::ProviderId,
                SettingsShippingPriceColumn::MaxWeight,
            ],
        ),
    ];

    for statement in &indexes {
        db.execute(builder.build(statement)).await?;
    }

    Ok(())
}
