//! Append-only status history of a maintenance request.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Status history entry database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "maintenance_status_history")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    #[serde(skip)]
    pub id: i64,
    #[serde(skip)]
    pub request_id: i64,
    /// Status entered by this transition
    pub status: String,
    /// Free-text note
    pub note: Option<String>,
    /// `customer` or the acting admin's display name
    pub updated_by: String,
    /// Transition was outside the allowed table but accepted by a permissive policy
    pub out_of_sequence: bool,
    /// When the transition happened
    #[serde(rename = "date")]
    pub created_at: DateTimeUtc,
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
