//! Shipping provider entity - a carrier the store can hand parcels to.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Shipping provider database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "shipping_providers")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the provider
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Internal name, unique (e.g. "aramex")
    #[sea_orm(unique)]
    pub name: String,
    /// Name shown to customers
    pub display_name: String,
    /// Inactive providers cannot be used to resolve a rate
    pub is_active: bool,
    /// Default delivery estimate in days
    pub estimated_days: i32,
    /// When the provider was created
    pub created_at: DateTimeUtc,
    /// When the provider was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between providers and their prices
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One provider has many per-city rates
    #[sea_orm(has_many = "super::shipping_rate::Entity")]
    Rates,
    /// One provider has many weight-bracket defaults
    #[sea_orm(has_many = "super::settings_shipping_price::Entity")]
    WeightBrackets,
}

impl Related<super::shipping_rate::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rates.def()
    }
}

impl Related<super::settings_shipping_price::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WeightBrackets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
