//! Store seed configuration loading from config.toml
//!
//! The file describes the initial store defaults, shipping providers with their
//! weight brackets and city overrides, the maintenance transition policy and the
//! bootstrap administrator accounts. Seeding from it is idempotent.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Store-wide defaults applied when the settings row is first created
    #[serde(default)]
    pub store: StoreDefaults,
    /// Maintenance request options
    #[serde(default)]
    pub maintenance: MaintenanceConfig,
    /// Shipping providers to seed
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    /// Administrator accounts to bootstrap
    #[serde(default)]
    pub admins: Vec<AdminConfig>,
}

/// Store-wide defaults
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreDefaults {
    pub currency: String,
    pub default_shipping_price: f64,
    pub default_estimated_days: i32,
    pub free_shipping_threshold: Option<f64>,
    pub maintenance_diagnostic_fee: f64,
    pub maintenance_priority_fee: f64,
}

impl Default for StoreDefaults {
    fn default() -> Self {
        Self {
            currency: "SAR".to_string(),
            default_shipping_price: 30.0,
            default_estimated_days: 3,
            free_shipping_threshold: None,
            maintenance_diagnostic_fee: 0.0,
            maintenance_priority_fee: 50.0,
        }
    }
}

/// Maintenance request options
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    /// Reject status changes outside the transition table instead of flagging them
    pub strict_transitions: bool,
}

/// A shipping provider and its prices
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Unique internal name
    pub name: String,
    /// Name shown to customers
    pub display_name: String,
    /// Default delivery estimate in days
    #[serde(default = "default_estimated_days")]
    pub estimated_days: i32,
    /// Default prices per weight bracket
    #[serde(default)]
    pub weight_brackets: Vec<WeightBracketConfig>,
    /// Per-city overrides
    #[serde(default)]
    pub rates: Vec<CityRateConfig>,
}

const fn default_estimated_days() -> i32 {
    3
}

/// One weight bracket
#[derive(Debug, Clone, Deserialize)]
pub struct WeightBracketConfig {
    /// Upper bound in kilograms (inclusive)
    pub max_weight: f64,
    pub price: f64,
}

/// One city override
#[derive(Debug, Clone, Deserialize)]
pub struct CityRateConfig {
    pub city: String,
    pub price: f64,
    #[serde(default)]
    pub estimated_days: Option<i32>,
}

/// A bootstrap administrator
#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    pub name: String,
    pub phone: String,
    /// Plain password, hashed before it is stored
    pub password: String,
}

/// Loads the seed configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path.as_ref().display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path.as_ref().display()),
    })
}

/// Loads the seed configuration, falling back to built-in defaults when the file is absent.
///
/// A file that exists but cannot be parsed is still an error.
pub fn load_config_or_default<P: AsRef<Path>>(path: P) -> Result<Config> {
    if path.as_ref().exists() {
        load_config(path)
    } else {
        tracing::warn!(
            "Seed config {} not found, using built-in defaults",
            path.as_ref().display()
        );
        Ok(Config::default())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn test_parse_store_config() {
        let toml_str = r#"
            [store]
            currency = "SAR"
            default_shipping_price = 35.0
            free_shipping_threshold = 500.0

            [maintenance]
            strict_transitions = true

            [[providers]]
            name = "aramex"
            display_name = "Aramex"
            estimated_days = 2

            [[providers.weight_brackets]]
            max_weight = 1.0
            price = 30.0

            [[providers.weight_brackets]]
            max_weight = 5.0
            price = 45.0

            [[providers.rates]]
            city = "الرياض"
            price = 20.0

            [[admins]]
            name = "Store Admin"
            phone = "0500000000"
            password = "change-me"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.store.default_shipping_price, 35.0);
        assert_eq!(config.store.free_shipping_threshold, Some(500.0));
        assert_eq!(config.store.default_estimated_days, 3);
        assert!(config.maintenance.strict_transitions);
        assert_eq!(config.providers.len(), 1);
        assert_eq!(config.providers[0].weight_brackets.len(), 2);
        assert_eq!(config.providers[0].rates[0].city, "الرياض");
        assert_eq!(config.providers[0].rates[0].estimated_days, None);
        assert_eq!(config.admins[0].phone, "0500000000");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.store.currency, "SAR");
        assert_eq!(config.store.default_shipping_price, 30.0);
        assert!(!config.maintenance.strict_transitions);
        assert!(config.providers.is_empty());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = load_config_or_default("does/not/exist.toml").unwrap();
        assert!(config.admins.is_empty());
    }
}
