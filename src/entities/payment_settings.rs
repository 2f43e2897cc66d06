//! Deferred-payment provider settings - one keyed singleton per provider.
//!
//! Rows are keyed by provider name (`tamara`, `tabby`, `tap`), so each
//! provider has exactly one settings record.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Payment provider settings database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment_settings")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Provider name, the singleton key
    #[sea_orm(primary_key, auto_increment = false)]
    pub provider: String,
    /// Whether customers may pay with this provider at all
    pub enabled: bool,
    /// Whether a commission is added on top of the order
    pub commission_enabled: bool,
    /// Commission percentage applied to the subtotal
    pub commission_rate: f64,
    /// Label shown next to the commission line
    pub commission_display_name: String,
    /// Smallest order total the provider accepts
    pub min_order_amount: f64,
    /// Largest order total the provider accepts
    pub max_order_amount: f64,
    /// Provider API base URL
    pub api_url: String,
    /// Secret API token
    pub api_token: Option<String>,
    /// Publishable key for the storefront widget
    pub public_key: Option<String>,
    /// Token used to verify provider webhooks
    pub notification_token: Option<String>,
    /// Sandbox mode
    pub test_mode: bool,
    /// When the settings were last changed
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
