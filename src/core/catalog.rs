//! Catalog business logic - products offered in the storefront.
//!
//! Products are addressed by id internally and by slug in storefront URLs.
//! The slug is derived from the name unless one is given, and must be unique.

use crate::{
    core::ensure_amount,
    entities::{Product, product},
    errors::{Error, FieldError, Result, field_errors, map_unique_violation},
};
use sea_orm::{Condition, QueryOrder, Set, prelude::*};
use serde::Deserialize;
use validator::Validate;

/// Shipping weight assumed when none is given
pub const DEFAULT_WEIGHT_KG: f64 = 1.0;

/// A product to add to the catalog
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    #[validate(length(min = 1, message = "Product name is required"))]
    pub name: String,
    /// Derived from the name when absent
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: f64,
    #[serde(default)]
    pub compare_at_price: Option<f64>,
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    #[serde(default)]
    pub stock: i32,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

const fn default_weight() -> f64 {
    DEFAULT_WEIGHT_KG
}

const fn default_active() -> bool {
    true
}

/// Partial update of a product. Absent fields are left unchanged.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub compare_at_price: Option<f64>,
    pub stock: Option<i32>,
    pub weight: Option<f64>,
    pub is_active: Option<bool>,
}

/// Filter for [`list_products`]
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    pub category: Option<String>,
    /// Case-insensitive match on name or brand
    pub search: Option<String>,
    /// Admin listings include hidden products
    #[serde(default)]
    pub include_inactive: bool,
}

/// Turns a product name into a URL handle.
///
/// Letters and digits in any script are kept (lowercased); every other run of
/// characters becomes a single `-`.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn ensure_weight(weight: f64) -> Result<f64> {
    if weight.is_finite() && weight > 0.0 {
        Ok(weight)
    } else {
        Err(Error::InvalidAmount { amount: weight })
    }
}

fn slug_for(name: &str, requested: Option<&str>) -> Result<String> {
    let slug = slugify(requested.unwrap_or(name));
    if slug.is_empty() {
        return Err(Error::invalid_field(
            "slug",
            "Slug must contain at least one letter or digit",
        ));
    }
    Ok(slug)
}

/// Adds a product to the catalog.
///
/// # Errors
/// - `Error::Validation` for a missing name or negative price or stock
/// - `Error::InvalidAmount` for a non-positive weight or negative compare-at price
/// - `Error::DuplicateKey` if the slug is taken
pub async fn create_product(db: &DatabaseConnection, mut new: NewProduct) -> Result<product::Model> {
    new.name = new.name.trim().to_string();
    if let Err(errors) = new.validate() {
        return Err(Error::Validation {
            fields: field_errors(&errors),
        });
    }
    if !new.price.is_finite() {
        return Err(Error::InvalidAmount { amount: new.price });
    }

    let slug = slug_for(&new.name, new.slug.as_deref())?;
    let now = chrono::Utc::now();

    let product = product::ActiveModel {
        name: Set(new.name),
        slug: Set(slug),
        description: Set(clean(new.description)),
        brand: Set(clean(new.brand)),
        category: Set(clean(new.category)),
        price: Set(new.price),
        compare_at_price: Set(new.compare_at_price.map(ensure_amount).transpose()?),
        stock: Set(new.stock),
        weight: Set(ensure_weight(new.weight)?),
        is_active: Set(new.is_active),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let created = product
        .insert(db)
        .await
        .map_err(|e| map_unique_violation(e, "slug"))?;
    tracing::info!(product_id = created.id, slug = %created.slug, "Product created");
    Ok(created)
}

/// Retrieves a product by id, hidden ones included.
pub async fn get_product<C>(db: &C, product_id: i64) -> Result<Option<product::Model>>
where
    C: ConnectionTrait,
{
    Product::find_by_id(product_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a product by slug.
pub async fn get_product_by_slug(
    db: &DatabaseConnection,
    slug: &str,
) -> Result<Option<product::Model>> {
    Product::find()
        .filter(product::Column::Slug.eq(slug.trim().to_lowercase()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists products ordered by name.
pub async fn list_products(
    db: &DatabaseConnection,
    filter: &ProductFilter,
) -> Result<Vec<product::Model>> {
    let mut query = Product::find();
    if !filter.include_inactive {
        query = query.filter(product::Column::IsActive.eq(true));
    }
    if let Some(category) = filter.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        query = query.filter(product::Column::Category.eq(category));
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        query = query.filter(
            Condition::any()
                .add(product::Column::Name.contains(search))
                .add(product::Column::Brand.contains(search)),
        );
    }

    query
        .order_by_asc(product::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Applies a partial update to a product.
///
/// Renaming does not change the slug; pass `slug` explicitly to move it.
pub async fn update_product(
    db: &DatabaseConnection,
    product_id: i64,
    patch: ProductPatch,
) -> Result<product::Model> {
    let current = get_product(db, product_id)
        .await?
        .ok_or_else(|| Error::not_found("Product", product_id))?;

    let mut fields = Vec::new();
    if patch.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        fields.push(FieldError::new("name", "Product name is required"));
    }
    if patch.stock.is_some_and(|s| s < 0) {
        fields.push(FieldError::new("stock", "Stock cannot be negative"));
    }
    if !fields.is_empty() {
        return Err(Error::Validation { fields });
    }

    let mut product: product::ActiveModel = current.into();
    if let Some(name) = patch.name {
        product.name = Set(name.trim().to_string());
    }
    if let Some(slug) = patch.slug {
        product.slug = Set(slug_for("", Some(&slug))?);
    }
    if let Some(description) = patch.description {
        product.description = Set(clean(Some(description)));
    }
    if let Some(brand) = patch.brand {
        product.brand = Set(clean(Some(brand)));
    }
    if let Some(category) = patch.category {
        product.category = Set(clean(Some(category)));
    }
    if let Some(price) = patch.price {
        product.price = Set(ensure_amount(price)?);
    }
    if let Some(compare_at) = patch.compare_at_price {
        product.compare_at_price = Set(Some(ensure_amount(compare_at)?));
    }
    if let Some(stock) = patch.stock {
        product.stock = Set(stock);
    }
    if let Some(weight) = patch.weight {
        product.weight = Set(ensure_weight(weight)?);
    }
    if let Some(active) = patch.is_active {
        product.is_active = Set(active);
    }
    product.updated_at = Set(chrono::Utc::now());

    product
        .update(db)
        .await
        .map_err(|e| map_unique_violation(e, "slug"))
}

/// Removes a product. Placed orders keep their line snapshots.
pub async fn delete_product(db: &DatabaseConnection, product_id: i64) -> Result<()> {
    let result = Product::delete_by_id(product_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("Product", product_id));
    }
    tracing::info!(product_id, "Product deleted");
    Ok(())
}
