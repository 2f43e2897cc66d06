//! Parts a diagnosis says a repair needs.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Required part database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "maintenance_parts")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    #[serde(skip)]
    pub id: i64,
    #[serde(skip)]
    pub request_id: i64,
    pub name: String,
    /// Unit price
    pub price: f64,
    pub quantity: i32,
    /// Whether the part is in stock
    pub available: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::maintenance_request::Entity",
        from = "Column::RequestId",
        to = "super::maintenance_request::Column::Id",
        on_delete = "Cascade"
    )]
    Request,
}

impl Related<super::maintenance_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Request.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
