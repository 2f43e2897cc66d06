//! Order business logic - checkout and back-office order handling.
//!
//! Checkout prices everything server-side: line prices come from the catalog,
//! shipping from [`shipping::resolve_rate`], and the deferred-payment commission
//! from the provider's settings. Stock is reserved in the same transaction that
//! inserts the order.

use crate::{
    core::{
        PaymentStatus, catalog,
        commission::{self, PaymentProvider},
        round2, sequence, settings, shipping, string_enum,
    },
    entities::{Order, OrderItem, Product, order, order_item, product},
    errors::{Error, FieldError, Result, field_errors},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Shipping source recorded when the free-shipping threshold applies
pub const FREE_SHIPPING: &str = "free_shipping";

string_enum! {
    /// Fulfilment status of an order
    pub enum OrderStatus("status") {
        Pending => "pending",
        Confirmed => "confirmed",
        Shipped => "shipped",
        Delivered => "delivered",
        Cancelled => "cancelled",
    }
}

string_enum! {
    /// How the customer pays
    pub enum PaymentMethod("payment_method") {
        CashOnDelivery => "cash_on_delivery",
        Card => "card",
        Tamara => "tamara",
        Tabby => "tabby",
        Tap => "tap",
    }
}

impl PaymentMethod {
    /// The deferred-payment provider behind this method, if any.
    #[must_use]
    pub const fn deferred_provider(self) -> Option<PaymentProvider> {
        match self {
            Self::Tamara => Some(PaymentProvider::Tamara),
            Self::Tabby => Some(PaymentProvider::Tabby),
            Self::Tap => Some(PaymentProvider::Tap),
            Self::CashOnDelivery | Self::Card => None,
        }
    }
}

/// Who the order ships to
#[derive(Debug, Default, Clone, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct OrderCustomer {
    #[validate(length(min = 1, message = "Customer name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Customer phone is required"))]
    pub phone: String,
    #[validate(email(message = "Customer email is not a valid address"))]
    pub email: Option<String>,
    #[validate(length(min = 1, message = "City is required"))]
    pub city: String,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
}

/// One requested line
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderItem {
    pub product_id: i64,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
}

/// A checkout submission
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    #[validate]
    pub customer: OrderCustomer,
    #[validate]
    pub items: Vec<NewOrderItem>,
    pub shipping_provider_id: i64,
    pub payment_method: PaymentMethod,
}

/// Admin status change of an order
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusUpdate {
    pub status: OrderStatus,
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
}

/// An order together with its lines
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    #[serde(flatten)]
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
}

struct PricedLine {
    product: product::Model,
    quantity: i32,
    line_total: f64,
}

/// Places an order.
///
/// # Errors
/// - `Error::Validation` for missing customer fields, unavailable or
///   out-of-stock products, or a deferred-payment method the total is not
///   eligible for; nothing is written
/// - `Error::NotFound` for an unknown product or shipping provider
/// - `Error::ProviderInactive` for a switched-off shipping provider
pub async fn create_order(db: &DatabaseConnection, mut new: NewOrder) -> Result<OrderView> {
    new.customer.name = new.customer.name.trim().to_string();
    new.customer.phone = new.customer.phone.trim().to_string();
    new.customer.address = new.customer.address.trim().to_string();
    new.customer.city = shipping::normalize_city(&new.customer.city);
    new.customer.email = new
        .customer
        .email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty());
    let mut fields = new
        .validate()
        .map_or_else(|errors| field_errors(&errors), |()| Vec::new());
    if new.items.is_empty() {
        fields.push(FieldError::new("items", "An order needs at least one item"));
    }
    if !fields.is_empty() {
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        return Err(Error::Validation { fields });
    }

    let txn = db.begin().await?;

    let mut lines = Vec::with_capacity(new.items.len());
    for (index, item) in new.items.iter().enumerate() {
        let product = catalog::get_product(&txn, item.product_id)
            .await?
            .ok_or_else(|| Error::not_found("Product", item.product_id))?;

        if !product.is_active {
            fields.push(FieldError::new(
                format!("items[{index}].product_id"),
                format!("{} is not available", product.name),
            ));
            continue;
        }

        let reserved = Product::update_many()
            .col_expr(
                product::Column::Stock,
                Expr::col(product::Column::Stock).sub(item.quantity),
            )
            .filter(product::Column::Id.eq(product.id))
            .filter(product::Column::Stock.gte(item.quantity))
            .exec(&txn)
            .await?;
        if reserved.rows_affected == 0 {
            fields.push(FieldError::new(
                format!("items[{index}].quantity"),
                format!("Not enough stock for {}", product.name),
            ));
            continue;
        }

        lines.push(PricedLine {
            line_total: round2(product.price * f64::from(item.quantity)),
            quantity: item.quantity,
            product,
        });
    }
    if !fields.is_empty() {
        return Err(Error::Validation { fields });
    }

    let subtotal = round2(lines.iter().map(|l| l.line_total).sum());
    let weight: f64 = lines
        .iter()
        .map(|l| l.product.weight * f64::from(l.quantity))
        .sum();

    let rate =
        shipping::resolve_rate(&txn, &new.customer.city, new.shipping_provider_id, weight).await?;
    let store = settings::get_or_create_settings(&txn).await?;
    let (shipping_fee, shipping_source) = match store.free_shipping_threshold {
        Some(threshold) if subtotal >= threshold => (0.0, FREE_SHIPPING),
        _ => (rate.price, rate.source.as_str()),
    };

    let commission_amount = match new.payment_method.deferred_provider() {
        Some(provider) => {
            let provider_settings = commission::get_or_create_payment_settings(&txn, provider).await?;
            if !commission::check_eligibility(&provider_settings, subtotal + shipping_fee) {
                return Err(Error::invalid_field(
                    "payment_method",
                    format!(
                        "{provider} is not available for an order of {:.2}",
                        subtotal + shipping_fee
                    ),
                ));
            }
            commission::calculate_commission(&provider_settings, subtotal)?.amount
        }
        None => 0.0,
    };

    let total = round2(subtotal + shipping_fee + commission_amount);
    let number = sequence::format_order_number(sequence::next_value(&txn, sequence::ORDER).await?);
    let now = chrono::Utc::now();

    let order = order::ActiveModel {
        order_number: Set(number),
        customer_name: Set(new.customer.name),
        customer_phone: Set(new.customer.phone),
        customer_email: Set(new.customer.email),
        city: Set(new.customer.city),
        address: Set(new.customer.address),
        subtotal: Set(subtotal),
        shipping_fee: Set(shipping_fee),
        shipping_source: Set(shipping_source.to_string()),
        shipping_provider_id: Set(new.shipping_provider_id),
        payment_method: Set(new.payment_method.as_str().to_string()),
        commission_amount: Set(commission_amount),
        total: Set(total),
        status: Set(OrderStatus::Pending.as_str().to_string()),
        payment_status: Set(PaymentStatus::Pending.as_str().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut items = Vec::with_capacity(lines.len());
    for line in lines {
        let item = order_item::ActiveModel {
            order_id: Set(order.id),
            product_id: Set(line.product.id),
            name: Set(line.product.name),
            unit_price: Set(line.product.price),
            quantity: Set(line.quantity),
            line_total: Set(line.line_total),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        items.push(item);
    }

    txn.commit().await?;

    tracing::info!(
        order = %order.order_number,
        subtotal,
        shipping_fee,
        shipping_source,
        commission_amount,
        total,
        "Order placed"
    );
    Ok(OrderView { order, items })
}

/// Lists orders, newest first.
pub async fn list_orders(
    db: &DatabaseConnection,
    status: Option<OrderStatus>,
) -> Result<Vec<order::Model>> {
    let mut query = Order::find();
    if let Some(status) = status {
        query = query.filter(order::Column::Status.eq(status.as_str()));
    }
    query
        .order_by_desc(order::Column::CreatedAt)
        .order_by_desc(order::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn load_items<C>(db: &C, order_id: i64) -> Result<Vec<order_item::Model>>
where
    C: ConnectionTrait,
{
    OrderItem::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .order_by_asc(order_item::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Returns an order with its lines.
pub async fn get_order(db: &DatabaseConnection, order_id: i64) -> Result<OrderView> {
    let order = Order::find_by_id(order_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Order", order_id))?;
    let items = load_items(db, order.id).await?;
    Ok(OrderView { order, items })
}

/// Changes an order's status (and optionally its payment status).
///
/// Cancelling returns the reserved stock. A cancelled order cannot be reopened.
pub async fn update_order_status(
    db: &DatabaseConnection,
    order_id: i64,
    update: OrderStatusUpdate,
) -> Result<OrderView> {
    let txn = db.begin().await?;
    let current = Order::find_by_id(order_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Order", order_id))?;
    let from: OrderStatus = current.status.parse()?;

    if from == OrderStatus::Cancelled && update.status != OrderStatus::Cancelled {
        return Err(Error::invalid_field(
            "status",
            "A cancelled order cannot be reopened",
        ));
    }

    let items = load_items(&txn, order_id).await?;
    if update.status == OrderStatus::Cancelled && from != OrderStatus::Cancelled {
        for item in &items {
            Product::update_many()
                .col_expr(
                    product::Column::Stock,
                    Expr::col(product::Column::Stock).add(item.quantity),
                )
                .filter(product::Column::Id.eq(item.product_id))
                .exec(&txn)
                .await?;
        }
    }

    let mut order: order::ActiveModel = current.into();
    order.status = Set(update.status.as_str().to_string());
    if let Some(payment_status) = update.payment_status {
        order.payment_status = Set(payment_status.as_str().to_string());
    }
    order.updated_at = Set(chrono::Utc::now());
    let order = order.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(order = %order.order_number, %from, to = %update.status, "Order status changed");
    Ok(OrderView { order, items })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::{
        core::commission::{PaymentSettingsPatch, update_payment_settings},
        test_utils::*,
    };

    fn checkout(provider_id: i64, items: Vec<NewOrderItem>, method: PaymentMethod) -> NewOrder {
        NewOrder {
            customer: OrderCustomer {
                name: "Sara".to_string(),
                phone: "0500000000".to_string(),
                email: None,
                city: " Riyadh ".to_string(),
                address: "King Fahd Rd".to_string(),
            },
            items,
            shipping_provider_id: provider_id,
            payment_method: method,
        }
    }

    fn line(product_id: i64, quantity: i32) -> NewOrderItem {
        NewOrderItem {
            product_id,
            quantity,
        }
    }

    #[tokio::test]
    async fn test_cash_order_prices_and_reserves_stock() -> Result<()> {
        let db = setup_test_db().await?;
        let provider = create_test_provider(&db, "aramex").await?;
        shipping::upsert_rate(&db, provider.id, "Riyadh", 20.0, None).await?;
        let case = create_test_product(&db, "Phone Case", 45.0).await?;
        let cable = create_test_product(&db, "Cable", 15.5).await?;

        let view = create_order(
            &db,
            checkout(
                provider.id,
                vec![line(case.id, 2), line(cable.id, 1)],
                PaymentMethod::CashOnDelivery,
            ),
        )
        .await?;

        assert_eq!(view.order.order_number, "ORD-000001");
        assert_eq!(view.order.subtotal, 105.5);
        assert_eq!(view.order.shipping_fee, 20.0);
        assert_eq!(view.order.shipping_source, "specific_rate");
        assert_eq!(view.order.total, 125.5);
        assert_eq!(view.order.city, "Riyadh");
        assert_eq!(view.items.len(), 2);

        let case = catalog::get_product(&db, case.id).await?.unwrap();
        assert_eq!(case.stock, 8);

        Ok(())
    }

    #[tokio::test]
    async fn test_free_shipping_threshold() -> Result<()> {
        let db = setup_test_db().await?;
        settings::update_settings(
            &db,
            settings::SettingsPatch {
                free_shipping_threshold: Some(Some(200.0)),
                ..Default::default()
            },
        )
        .await?;
        let provider = create_test_provider(&db, "smsa").await?;
        let watch = create_test_product(&db, "Smart Watch", 250.0).await?;

        let view = create_order(
            &db,
            checkout(provider.id, vec![line(watch.id, 1)], PaymentMethod::Card),
        )
        .await?;
        assert_eq!(view.order.shipping_fee, 0.0);
        assert_eq!(view.order.shipping_source, FREE_SHIPPING);
        assert_eq!(view.order.total, 250.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_deferred_payment_adds_commission() -> Result<()> {
        let db = setup_test_db().await?;
        update_payment_settings(
            &db,
            PaymentProvider::Tamara,
            PaymentSettingsPatch {
                enabled: Some(true),
                commission_enabled: Some(true),
                commission_rate: Some(3.0),
                ..PaymentSettingsPatch::default()
            },
        )
        .await?;
        let provider = create_test_provider(&db, "naqel").await?;
        let phone = create_test_product(&db, "Budget Phone", 1000.0).await?;

        let view = create_order(
            &db,
            checkout(provider.id, vec![line(phone.id, 1)], PaymentMethod::Tamara),
        )
        .await?;
        assert_eq!(view.order.commission_amount, 30.0);
        assert_eq!(view.order.total, 1000.0 + 30.0 + view.order.shipping_fee);

        Ok(())
    }

    #[tokio::test]
    async fn test_ineligible_deferred_payment_writes_nothing() -> Result<()> {
        let db = setup_test_db().await?;
        update_payment_settings(
            &db,
            PaymentProvider::Tabby,
            PaymentSettingsPatch {
                enabled: Some(true),
                ..PaymentSettingsPatch::default()
            },
        )
        .await?;
        let provider = create_test_provider(&db, "zajil").await?;
        let charger = create_test_product(&db, "Charger", 20.0).await?;

        let result = create_order(
            &db,
            checkout(provider.id, vec![line(charger.id, 1)], PaymentMethod::Tabby),
        )
        .await;
        assert!(matches!(result, Err(Error::Validation { ref fields }) if fields[0].field == "payment_method"));

        // Stock reservation was rolled back
        let charger = catalog::get_product(&db, charger.id).await?.unwrap();
        assert_eq!(charger.stock, 10);
        assert!(list_orders(&db, None).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_out_of_stock_and_inactive_products() -> Result<()> {
        let db = setup_test_db().await?;
        let provider = create_test_provider(&db, "aramex").await?;
        let scarce = create_test_product(&db, "Limited Edition", 500.0).await?;
        let hidden = create_test_product(&db, "Discontinued", 10.0).await?;
        catalog::update_product(
            &db,
            hidden.id,
            catalog::ProductPatch {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await?;

        let result = create_order(
            &db,
            checkout(
                provider.id,
                vec![line(scarce.id, 11), line(hidden.id, 1)],
                PaymentMethod::CashOnDelivery,
            ),
        )
        .await;
        let Err(Error::Validation { fields }) = result else {
            panic!("expected validation error");
        };
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].field, "items[0].quantity");
        assert_eq!(fields[1].field, "items[1].product_id");

        let missing = create_order(
            &db,
            checkout(provider.id, vec![line(9999, 1)], PaymentMethod::Card),
        )
        .await;
        assert!(matches!(missing, Err(Error::NotFound { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_empty_order_is_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let result = create_order(&db, checkout(1, Vec::new(), PaymentMethod::Card)).await;
        assert!(matches!(result, Err(Error::Validation { ref fields }) if fields[0].field == "items"));
        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_restores_stock_and_is_final() -> Result<()> {
        let db = setup_test_db().await?;
        let provider = create_test_provider(&db, "aramex").await?;
        let earbuds = create_test_product(&db, "Earbuds", 199.0).await?;
        let view = create_order(
            &db,
            checkout(provider.id, vec![line(earbuds.id, 3)], PaymentMethod::CashOnDelivery),
        )
        .await?;

        let confirmed = update_order_status(
            &db,
            view.order.id,
            OrderStatusUpdate {
                status: OrderStatus::Confirmed,
                payment_status: Some(PaymentStatus::Paid),
            },
        )
        .await?;
        assert_eq!(confirmed.order.status, "confirmed");
        assert_eq!(confirmed.order.payment_status, "paid");

        update_order_status(
            &db,
            view.order.id,
            OrderStatusUpdate {
                status: OrderStatus::Cancelled,
                payment_status: Some(PaymentStatus::Refunded),
            },
        )
        .await?;
        let earbuds = catalog::get_product(&db, earbuds.id).await?.unwrap();
        assert_eq!(earbuds.stock, 10);

        let reopen = update_order_status(
            &db,
            view.order.id,
            OrderStatusUpdate {
                status: OrderStatus::Pending,
                payment_status: None,
            },
        )
        .await;
        assert!(matches!(reopen, Err(Error::Validation { .. })));

        let fetched = get_order(&db, view.order.id).await?;
        assert_eq!(fetched.items.len(), 1);
        assert_eq!(
            list_orders(&db, Some(OrderStatus::Cancelled)).await?.len(),
            1
        );

        Ok(())
    }
}
