//! Product entity - an item in the storefront catalog.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the product
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Name of the product (e.g., "iPhone 15 Pro 256GB")
    pub name: String,
    /// URL-safe handle derived from the name, unique
    #[sea_orm(unique)]
    pub slug: String,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    /// Current selling price
    pub price: f64,
    /// Previous price shown struck through
    pub compare_at_price: Option<f64>,
    /// Units in stock
    pub stock: i32,
    /// Shipping weight in kilograms
    pub weight: f64,
    /// Hidden from the storefront when false
    pub is_active: bool,
    /// When the product was created
    pub created_at: DateTimeUtc,
    /// When the product was last modified
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
