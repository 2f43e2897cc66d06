//! Store settings entity - the keyed configuration singleton.
//!
//! There is exactly one row, stored under [`SINGLETON_KEY`]. It carries the
//! store-wide defaults every shipping calculation and maintenance intake reads.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Fixed lookup key of the singleton row
pub const SINGLETON_KEY: &str = "main";

/// Store settings database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "store_settings")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Stable key, always [`SINGLETON_KEY`]
    #[sea_orm(primary_key, auto_increment = false)]
    pub key: String,
    /// ISO currency code used for every price (e.g. "SAR")
    pub currency: String,
    /// Last-resort shipping price when a provider has no weight brackets
    pub default_shipping_price: f64,
    /// Delivery estimate used when neither rate nor provider specifies one
    pub default_estimated_days: i32,
    /// Order subtotal at or above which shipping is free
    pub free_shipping_threshold: Option<f64>,
    /// Whether new maintenance requests are accepted
    pub maintenance_enabled: bool,
    /// Diagnostic fee charged on every maintenance request
    pub maintenance_diagnostic_fee: f64,
    /// Surcharge for urgent maintenance requests
    pub maintenance_priority_fee: f64,
    /// When the settings were last changed
    pub updated_at: DateTimeUtc,
}

/// Store settings have no relationships
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
