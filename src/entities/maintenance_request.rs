//! Maintenance request entity - one repair ticket.
//!
//! Customer, device, issue, diagnosis, cost and approval sub-documents are
//! flattened into columns with a shared prefix. The status history and the
//! required parts list live in their own child tables.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Maintenance request database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "maintenance_requests")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Human-readable ticket number, assigned once at creation
    #[sea_orm(unique)]
    pub request_number: String,

    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub customer_address: String,
    pub customer_city: String,

    pub device_type: String,
    pub device_brand: String,
    pub device_model: String,
    pub device_serial_number: String,
    pub device_color: Option<String>,
    /// `none`, `password` or `pattern`
    pub device_lock_type: String,
    /// Encrypted lock secret (base64 of nonce and ciphertext)
    pub device_lock_secret: Option<String>,

    pub issue_description: String,
    pub issue_category: Option<String>,
    /// `normal` or `urgent`
    pub priority: String,
    /// `drop_off` or `shipping`
    pub delivery_method: String,
    pub shipping_provider_id: Option<i64>,

    pub diagnosis_problem: Option<String>,
    pub diagnosis_root_cause: Option<String>,
    pub diagnosis_solution: Option<String>,
    pub diagnosis_estimated_days: Option<i32>,
    pub diagnosed_at: Option<DateTimeUtc>,

    /// Current lifecycle status (see `core::maintenance::MaintenanceStatus`)
    pub status: String,

    pub cost_diagnostic_fee: f64,
    pub cost_parts: f64,
    pub cost_labor: f64,
    pub cost_priority_fee: f64,
    pub cost_shipping_fee: f64,
    pub cost_total_estimated: f64,
    pub cost_total_final: f64,
    /// Set once an admin overrides the final total by hand
    pub cost_final_overridden: bool,
    /// `pending`, `paid` or `refunded`
    pub payment_status: String,

    /// `pending`, `approved` or `rejected`
    pub approval_status: String,
    pub approval_responded_at: Option<DateTimeUtc>,
    pub approval_note: Option<String>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One request has many status history entries
    #[sea_orm(has_many = "super::maintenance_status_history::Entity")]
    History,
    /// One request has many required parts
    #[sea_orm(has_many = "super::maintenance_part::Entity")]
    Parts,
}

impl Related<super::maintenance_status_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::History.def()
    }
}

impl Related<super::maintenance_part::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Parts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
