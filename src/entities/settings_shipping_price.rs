//! Per-provider default shipping prices keyed by weight bracket.
//!
//! A bracket covers every parcel up to and including `max_weight` kilograms.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Weight bracket database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "settings_shipping_prices")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Provider this default applies to
    pub provider_id: i64,
    /// Upper bound of the bracket in kilograms (inclusive)
    pub max_weight: f64,
    /// Price charged for parcels in this bracket
    pub price: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each bracket belongs to one provider
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
