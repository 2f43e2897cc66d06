//! Order entity - a placed storefront order.
//!
//! Prices, shipping and commission are captured at checkout time so later
//! catalog or settings edits never change a placed order.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Order database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Human-readable order number (e.g. "ORD-000042")
    #[sea_orm(unique)]
    pub order_number: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub city: String,
    pub address: String,
    /// Sum of line totals
    pub subtotal: f64,
    pub shipping_fee: f64,
    /// `specific_rate`, `settings_price` or `free_shipping`
    pub shipping_source: String,
    pub shipping_provider_id: i64,
    /// `cash_on_delivery`, `card`, `tamara`, `tabby` or `tap`
    pub payment_method: String,
    /// Deferred-payment commission added on top of the order
    pub commission_amount: f64,
    /// Subtotal plus shipping plus commission
    pub total: f64,
    /// `pending`, `confirmed`, `shipped`, `delivered` or `cancelled`
    pub status: String,
    /// `pending`, `paid` or `refunded`
    pub payment_status: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One order has many line items
    #[sea_orm(has_many = "super::order_item::Entity")]
    Items,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
