//! Shared test utilities for the storefront service.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    config::server::{DEVICE_LOCK_KEY_LEN, JwtSettings},
    core::{
        auth::JwtService,
        catalog::{self, NewProduct},
        device_lock::DeviceLockCipher,
        maintenance::{CustomerInfo, DeviceInfo, IssueInfo, NewMaintenanceRequest},
        shipping,
    },
    entities,
    errors::Result,
};
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates an active shipping provider with sensible defaults.
///
/// # Defaults
/// * `display_name`: same as `name`
/// * `estimated_days`: 3
pub async fn create_test_provider(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::shipping_provider::Model> {
    shipping::create_provider(db, name, name, 3).await
}

/// Builds a product submission with sensible defaults.
///
/// # Defaults
/// * `stock`: 10
/// * `weight`: 1 kg
/// * `is_active`: true
pub fn new_test_product(name: &str, price: f64) -> NewProduct {
    NewProduct {
        name: name.to_string(),
        slug: None,
        description: None,
        brand: None,
        category: None,
        price,
        compare_at_price: None,
        stock: 10,
        weight: catalog::DEFAULT_WEIGHT_KG,
        is_active: true,
    }
}

/// Creates a test product with the defaults of [`new_test_product`].
pub async fn create_test_product(
    db: &DatabaseConnection,
    name: &str,
    price: f64,
) -> Result<entities::product::Model> {
    catalog::create_product(db, new_test_product(name, price)).await
}

/// A complete drop-off repair ticket for an unlocked phone.
///
/// The customer phone is `0500000000`.
pub fn sample_request() -> NewMaintenanceRequest {
    NewMaintenanceRequest {
        customer_info: CustomerInfo {
            name: "Ahmed Ali".to_string(),
            phone: "0500000000".to_string(),
            email: Some("ahmed@example.com".to_string()),
            address: "Olaya St, Building 12".to_string(),
            city: "Riyadh".to_string(),
        },
        device_info: DeviceInfo {
            device_type: "phone".to_string(),
            brand: "Apple".to_string(),
            model: "iPhone 13".to_string(),
            serial_number: "F2LXK0ABC123".to_string(),
            ..DeviceInfo::default()
        },
        issue: IssueInfo {
            description: "Screen cracked after a fall".to_string(),
            category: Some("screen".to_string()),
            ..IssueInfo::default()
        },
        ..NewMaintenanceRequest::default()
    }
}

/// Device lock cipher with a fixed key.
pub fn test_cipher() -> DeviceLockCipher {
    #[allow(clippy::expect_used)]
    DeviceLockCipher::new(&[42u8; DEVICE_LOCK_KEY_LEN]).expect("fixed-length key")
}

/// Token service with a fixed secret.
pub fn test_jwt() -> JwtService {
    JwtService::new(JwtSettings {
        secret: "test-secret-that-is-long-enough-for-hs256".to_string(),
        expiration_minutes: 60,
        issuer: "storefront-test".to_string(),
    })
}
