//! Shipping rate entity - a per-city price override for one provider.
//!
//! This table is the source of truth for city overrides; the provider-with-rates
//! shape served to the admin UI is assembled from it on read.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Shipping rate database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "shipping_rates")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Provider the override belongs to
    pub provider_id: i64,
    /// City name, whitespace-normalized
    pub city: String,
    /// Override price
    pub price: f64,
    /// Inactive overrides are ignored by the resolver
    pub is_active: bool,
    /// Optional per-city delivery estimate
    pub estimated_days: Option<i32>,
    /// When the rate was last modified
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each rate belongs to one provider
    #[sea_orm(
        belongs_to = "super::shipping_provider::Entity",
        from = "Column::ProviderId",
        to = "super::shipping_provider::Column::Id",
        on_delete = "Cascade"
    )]
    Provider,
}

impl Related<super::shipping_provider::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Provider.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
