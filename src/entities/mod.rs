//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod counter;
pub mod maintenance_part;
pub mod maintenance_request;
pub mod maintenance_status_history;
pub mod order;
pub mod order_item;
pub mod payment_settings;
pub mod product;
pub mod settings_shipping_price;
pub mod shipping_provider;
pub mod shipping_rate;
pub mod store_settings;
pub mod user;

// Re-export specific types to avoid conflicts
pub use counter::{Column as CounterColumn, Entity as Counter, Model as CounterModel};
pub use maintenance_part::{
    Column as MaintenancePartColumn, Entity as MaintenancePart, Model as MaintenancePartModel,
};
pub use maintenance_request::{
    Column as MaintenanceRequestColumn, Entity as MaintenanceRequest,
    Model as MaintenanceRequestModel,
};
pub use maintenance_status_history::{
    Column as StatusHistoryColumn, Entity as StatusHistory, Model as StatusHistoryModel,
};
pub use order::{Column as OrderColumn, Entity as Order, Model as OrderModel};
pub use order_item::{Column as OrderItemColumn, Entity as OrderItem, Model as OrderItemModel};
pub use payment_settings::{
    Column as PaymentSettingsColumn, Entity as PaymentSettings, Model as PaymentSettingsModel,
};
pub use product::{Column as ProductColumn, Entity as Product, Model as ProductModel};
pub use settings_shipping_price::{
    Column as SettingsShippingPriceColumn, Entity as SettingsShippingPrice,
    Model as SettingsShippingPriceModel,
};
pub use shipping_provider::{
    Column as ShippingProviderColumn, Entity as ShippingProvider, Model as ShippingProviderModel,
};
pub use shipping_rate::{
    Column as ShippingRateColumn, Entity as ShippingRate, Model as ShippingRateModel,
};
pub use store_settings::{
    Column as StoreSettingsColumn, Entity as StoreSettings, Model as StoreSettingsModel,
};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
