//! Maintenance request lifecycle - intake, status tracking, diagnosis, costs and
//! customer approval of repair tickets.
//!
//! Every status change goes through one place, which consults the
//! [`TransitionPolicy`] and appends to the request's status history. Multi-row
//! writes (request plus history, diagnosis plus parts) run in one transaction.

pub mod cost;
pub mod status;

pub use cost::{CostBreakdown, CostPatch};
pub use status::{MaintenanceStatus, TransitionPolicy};

use crate::{
    core::{
        device_lock::DeviceLockCipher, ensure_amount, round2, sequence, settings, shipping,
        string_enum,
    },
    entities::{
        MaintenancePart, MaintenanceRequest, StatusHistory, maintenance_part, maintenance_request,
        maintenance_status_history,
    },
    errors::{Error, FieldError, Result, field_errors},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Name recorded in the history for changes made by the customer
pub const CUSTOMER: &str = "customer";

/// Parcel weight used to price shipping a device in for repair
const DEVICE_SHIPPING_WEIGHT: f64 = 1.0;

string_enum! {
    /// How the device is locked
    pub enum LockType("device_info.lock_type") {
        None => "none",
        Password => "password",
        Pattern => "pattern",
    }
}

string_enum! {
    /// Repair urgency
    pub enum Priority("issue.priority") {
        Normal => "normal",
        Urgent => "urgent",
    }
}

string_enum! {
    /// How the device reaches the workshop
    pub enum DeliveryMethod("delivery_method") {
        DropOff => "drop_off",
        Shipping => "shipping",
    }
}

string_enum! {
    /// Customer answer to a quoted repair
    pub enum ApprovalStatus("customer_approval.status") {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
}

impl Default for LockType {
    fn default() -> Self {
        Self::None
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::Normal
    }
}

impl Default for DeliveryMethod {
    fn default() -> Self {
        Self::DropOff
    }
}

// ---------------------------------------------------------------------------
// Intake
// ---------------------------------------------------------------------------

/// Customer contact details
#[derive(Debug, Default, Clone, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct CustomerInfo {
    #[validate(length(min = 1, message = "Customer name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Customer phone is required"))]
    pub phone: String,
    #[validate(email(message = "Customer email is not a valid address"))]
    pub email: Option<String>,
    #[validate(length(min = 1, message = "Customer address is required"))]
    pub address: String,
    pub city: String,
}

/// The device handed in
#[derive(Debug, Default, Clone, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct DeviceInfo {
    pub device_type: String,
    pub brand: String,
    pub model: String,
    #[validate(length(min = 1, message = "Device serial number is required"))]
    pub serial_number: String,
    pub color: Option<String>,
    pub lock_type: LockType,
    /// Passcode or pattern; encrypted before it is stored
    pub lock_secret: Option<String>,
}

/// What the customer reports
#[derive(Debug, Default, Clone, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct IssueInfo {
    #[validate(length(min = 1, message = "Issue description is required"))]
    pub description: String,
    pub category: Option<String>,
    pub priority: Priority,
}

/// A new repair ticket as submitted by the customer
#[derive(Debug, Default, Clone, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct NewMaintenanceRequest {
    #[validate]
    pub customer_info: CustomerInfo,
    #[validate]
    pub device_info: DeviceInfo,
    #[validate]
    pub issue: IssueInfo,
    pub delivery_method: DeliveryMethod,
    pub shipping_provider_id: Option<i64>,
}

fn trim_in_place(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

fn trim_optional(value: &mut Option<String>) {
    *value = value
        .take()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
}

impl NewMaintenanceRequest {
    fn normalize(&mut self) {
        let customer = &mut self.customer_info;
        trim_in_place(&mut customer.name);
        trim_in_place(&mut customer.phone);
        trim_in_place(&mut customer.address);
        customer.city = shipping::normalize_city(&customer.city);
        trim_optional(&mut customer.email);

        let device = &mut self.device_info;
        trim_in_place(&mut device.device_type);
        trim_in_place(&mut device.brand);
        trim_in_place(&mut device.model);
        trim_in_place(&mut device.serial_number);
        trim_optional(&mut device.color);
        trim_optional(&mut device.lock_secret);

        trim_in_place(&mut self.issue.description);
        trim_optional(&mut self.issue.category);
    }

    /// Reports every failing field at once.
    fn check(&self) -> Result<()> {
        let mut fields = self
            .validate()
            .map_or_else(|errors| field_errors(&errors), |()| Vec::new());

        if self.device_info.lock_type != LockType::None && self.device_info.lock_secret.is_none() {
            fields.push(FieldError::new(
                "device_info.lock_secret",
                "Lock secret is required for a locked device",
            ));
        }
        if self.delivery_method == DeliveryMethod::Shipping {
            if self.shipping_provider_id.is_none() {
                fields.push(FieldError::new(
                    "shipping_provider_id",
                    "A shipping provider is required for shipped devices",
                ));
            }
            if self.customer_info.city.is_empty() {
                fields.push(FieldError::new(
                    "customer_info.city",
                    "Customer city is required for shipped devices",
                ));
            }
        }

        if fields.is_empty() {
            Ok(())
        } else {
            fields.sort_by(|a, b| a.field.cmp(&b.field));
            Err(Error::Validation { fields })
        }
    }
}

// ---------------------------------------------------------------------------
// Diagnosis and approval input
// ---------------------------------------------------------------------------

/// One part a repair needs
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PartInput {
    #[validate(length(min = 1, message = "Part name is required"))]
    pub name: String,
    #[validate(range(min = 0.0, message = "Part price cannot be negative"))]
    pub price: f64,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    #[serde(default = "default_true")]
    pub available: bool,
}

const fn default_true() -> bool {
    true
}

/// Technician findings
#[derive(Debug, Default, Clone, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct DiagnosisInput {
    #[validate(length(min = 1, message = "Diagnosed problem is required"))]
    pub problem: String,
    pub root_cause: Option<String>,
    pub solution: Option<String>,
    #[validate(range(min = 0, message = "Estimated days cannot be negative"))]
    pub estimated_days: Option<i32>,
    #[validate]
    pub required_parts: Vec<PartInput>,
}

/// Customer answer to an approval request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalResponse {
    /// Phone on the ticket; must match
    pub phone: String,
    pub approved: bool,
    #[serde(default)]
    pub note: Option<String>,
}

/// Filter for [`list_requests`]
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestFilter {
    pub status: Option<MaintenanceStatus>,
    pub phone: Option<String>,
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// Full detail of a repair ticket. The lock secret never appears here.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceRequestView {
    pub id: i64,
    pub request_number: String,
    pub customer_info: CustomerView,
    pub device_info: DeviceView,
    pub issue: IssueView,
    pub delivery_method: DeliveryMethod,
    pub shipping_provider_id: Option<i64>,
    pub diagnosis: Option<DiagnosisView>,
    pub status: StatusView,
    pub cost: CostBreakdown,
    pub customer_approval: ApprovalView,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerView {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: String,
    pub city: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceView {
    pub device_type: String,
    pub brand: String,
    pub model: String,
    pub serial_number: String,
    pub color: Option<String>,
    pub lock_type: LockType,
    pub has_lock_secret: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueView {
    pub description: String,
    pub category: Option<String>,
    pub priority: Priority,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisView {
    pub problem: Option<String>,
    pub root_cause: Option<String>,
    pub solution: Option<String>,
    pub estimated_days: Option<i32>,
    pub diagnosed_at: Option<DateTime<Utc>>,
    pub required_parts: Vec<maintenance_part::Model>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    pub current: MaintenanceStatus,
    /// Oldest first
    pub history: Vec<maintenance_status_history::Model>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalView {
    pub status: ApprovalStatus,
    pub responded_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
}

/// One row of the admin request list
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceSummary {
    pub id: i64,
    pub request_number: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub device: String,
    pub status: MaintenanceStatus,
    pub priority: Priority,
    pub total_final: f64,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<&maintenance_request::Model> for MaintenanceSummary {
    type Error = Error;

    fn try_from(model: &maintenance_request::Model) -> Result<Self> {
        Ok(Self {
            id: model.id,
            request_number: model.request_number.clone(),
            customer_name: model.customer_name.clone(),
            customer_phone: model.customer_phone.clone(),
            device: format!("{} {}", model.device_brand, model.device_model)
                .trim()
                .to_string(),
            status: model.status.parse()?,
            priority: model.priority.parse()?,
            total_final: model.cost_total_final,
            created_at: model.created_at,
        })
    }
}

/// Decrypted lock details for the technician
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LockSecretView {
    pub lock_type: LockType,
    pub secret: Option<String>,
}

async fn load_view<C>(db: &C, model: maintenance_request::Model) -> Result<MaintenanceRequestView>
where
    C: ConnectionTrait,
{
    let history = StatusHistory::find()
        .filter(maintenance_status_history::Column::RequestId.eq(model.id))
        .order_by_asc(maintenance_status_history::Column::Id)
        .all(db)
        .await?;
    let parts = MaintenancePart::find()
        .filter(maintenance_part::Column::RequestId.eq(model.id))
        .order_by_asc(maintenance_part::Column::Id)
        .all(db)
        .await?;

    let cost = CostBreakdown::from_model(&model)?;
    let diagnosis = model.diagnosed_at.map(|diagnosed_at| DiagnosisView {
        problem: model.diagnosis_problem.clone(),
        root_cause: model.diagnosis_root_cause.clone(),
        solution: model.diagnosis_solution.clone(),
        estimated_days: model.diagnosis_estimated_days,
        diagnosed_at: Some(diagnosed_at),
        required_parts: parts,
    });

    Ok(MaintenanceRequestView {
        id: model.id,
        request_number: model.request_number,
        customer_info: CustomerView {
            name: model.customer_name,
            phone: model.customer_phone,
            email: model.customer_email,
            address: model.customer_address,
            city: model.customer_city,
        },
        device_info: DeviceView {
            device_type: model.device_type,
            brand: model.device_brand,
            model: model.device_model,
            serial_number: model.device_serial_number,
            color: model.device_color,
            lock_type: model.device_lock_type.parse()?,
            has_lock_secret: model.device_lock_secret.is_some(),
        },
        issue: IssueView {
            description: model.issue_description,
            category: model.issue_category,
            priority: model.priority.parse()?,
        },
        delivery_method: model.delivery_method.parse()?,
        shipping_provider_id: model.shipping_provider_id,
        diagnosis,
        status: StatusView {
            current: model.status.parse()?,
            history,
        },
        cost,
        customer_approval: ApprovalView {
            status: model.approval_status.parse()?,
            responded_at: model.approval_responded_at,
            note: model.approval_note,
        },
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

async fn find_request<C>(db: &C, request_id: i64) -> Result<maintenance_request::Model>
where
    C: ConnectionTrait,
{
    MaintenanceRequest::find_by_id(request_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Maintenance request", request_id))
}

async fn find_request_by_number<C>(db: &C, number: &str) -> Result<maintenance_request::Model>
where
    C: ConnectionTrait,
{
    let number = number.trim().to_uppercase();
    MaintenanceRequest::find()
        .filter(maintenance_request::Column::RequestNumber.eq(number.as_str()))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Maintenance request", number))
}

async fn append_history<C>(
    db: &C,
    request_id: i64,
    status: MaintenanceStatus,
    note: Option<String>,
    updated_by: &str,
    out_of_sequence: bool,
) -> Result<()>
where
    C: ConnectionTrait,
{
    maintenance_status_history::ActiveModel {
        request_id: Set(request_id),
        status: Set(status.as_str().to_string()),
        note: Set(note),
        updated_by: Set(updated_by.to_string()),
        out_of_sequence: Set(out_of_sequence),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(())
}

/// Moves a request to `to`, appending one history entry.
///
/// `active` carries any other column changes that should land in the same update.
async fn transition<C>(
    db: &C,
    current: &maintenance_request::Model,
    mut active: maintenance_request::ActiveModel,
    to: MaintenanceStatus,
    note: Option<String>,
    updated_by: &str,
    policy: TransitionPolicy,
) -> Result<maintenance_request::Model>
where
    C: ConnectionTrait,
{
    let from: MaintenanceStatus = current.status.parse()?;
    let out_of_sequence = policy.check(from, to)?;
    if out_of_sequence {
        tracing::warn!(
            request = %current.request_number,
            %from,
            %to,
            updated_by,
            "Maintenance status change outside the transition table"
        );
    }

    active.status = Set(to.as_str().to_string());
    active.updated_at = Set(Utc::now());
    let updated = active.update(db).await?;
    append_history(db, current.id, to, note, updated_by, out_of_sequence).await?;

    tracing::info!(
        request = %updated.request_number,
        %from,
        %to,
        "Maintenance status changed"
    );
    Ok(updated)
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Creates a repair ticket.
///
/// Costs are seeded from the store settings: the diagnostic fee always, the
/// priority fee for urgent tickets, and the shipping fee for a 1 kg parcel to
/// the customer's city when the device is shipped in.
///
/// # Errors
/// - `Error::Validation` naming every missing or malformed field; nothing is written
/// - `Error::NotFound` / `Error::ProviderInactive` for an unusable shipping provider
pub async fn create_request(
    db: &DatabaseConnection,
    cipher: &DeviceLockCipher,
    mut new: NewMaintenanceRequest,
) -> Result<MaintenanceRequestView> {
    new.normalize();
    new.check()?;

    let sealed_secret = match (new.device_info.lock_type, &new.device_info.lock_secret) {
        (LockType::None, _) | (_, None) => None,
        (_, Some(secret)) => Some(cipher.seal(secret)?),
    };

    let txn = db.begin().await?;

    let store = settings::get_or_create_settings(&txn).await?;
    if !store.maintenance_enabled {
        return Err(Error::invalid_field(
            "maintenance",
            "Maintenance requests are not being accepted at the moment",
        ));
    }

    let shipping_fee = match (new.delivery_method, new.shipping_provider_id) {
        (DeliveryMethod::Shipping, Some(provider_id)) => {
            shipping::resolve_rate(
                &txn,
                &new.customer_info.city,
                provider_id,
                DEVICE_SHIPPING_WEIGHT,
            )
            .await?
            .price
        }
        _ => 0.0,
    };

    let mut cost = CostBreakdown {
        diagnostic_fee: store.maintenance_diagnostic_fee,
        priority_fee: if new.issue.priority == Priority::Urgent {
            store.maintenance_priority_fee
        } else {
            0.0
        },
        shipping_fee,
        ..CostBreakdown::default()
    };
    cost.calculate_total();

    let number = sequence::format_request_number(
        sequence::next_value(&txn, sequence::MAINTENANCE_REQUEST).await?,
    );
    let now = Utc::now();
    let customer = new.customer_info;
    let device = new.device_info;

    let mut request = maintenance_request::ActiveModel {
        request_number: Set(number),
        customer_name: Set(customer.name),
        customer_phone: Set(customer.phone),
        customer_email: Set(customer.email),
        customer_address: Set(customer.address),
        customer_city: Set(customer.city),
        device_type: Set(device.device_type),
        device_brand: Set(device.brand),
        device_model: Set(device.model),
        device_serial_number: Set(device.serial_number),
        device_color: Set(device.color),
        device_lock_type: Set(device.lock_type.as_str().to_string()),
        device_lock_secret: Set(sealed_secret),
        issue_description: Set(new.issue.description),
        issue_category: Set(new.issue.category),
        priority: Set(new.issue.priority.as_str().to_string()),
        delivery_method: Set(new.delivery_method.as_str().to_string()),
        shipping_provider_id: Set(new.shipping_provider_id),
        diagnosis_problem: Set(None),
        diagnosis_root_cause: Set(None),
        diagnosis_solution: Set(None),
        diagnosis_estimated_days: Set(None),
        diagnosed_at: Set(None),
        status: Set(MaintenanceStatus::Received.as_str().to_string()),
        approval_status: Set(ApprovalStatus::Pending.as_str().to_string()),
        approval_responded_at: Set(None),
        approval_note: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    cost.apply(&mut request);

    let request = request.insert(&txn).await?;
    append_history(
        &txn,
        request.id,
        MaintenanceStatus::Received,
        None,
        CUSTOMER,
        false,
    )
    .await?;

    let view = load_view(&txn, request).await?;
    txn.commit().await?;

    tracing::info!(
        request = %view.request_number,
        delivery = %view.delivery_method,
        total = view.cost.total_estimated,
        "Maintenance request created"
    );
    Ok(view)
}

/// Returns a request by id.
pub async fn get_request(db: &DatabaseConnection, request_id: i64) -> Result<MaintenanceRequestView> {
    let model = find_request(db, request_id).await?;
    load_view(db, model).await
}

/// Returns a request by its ticket number.
pub async fn get_request_by_number(
    db: &DatabaseConnection,
    number: &str,
) -> Result<MaintenanceRequestView> {
    let model = find_request_by_number(db, number).await?;
    load_view(db, model).await
}

/// Lists requests, newest first.
pub async fn list_requests(
    db: &DatabaseConnection,
    filter: &RequestFilter,
) -> Result<Vec<MaintenanceSummary>> {
    let mut query = MaintenanceRequest::find();
    if let Some(status) = filter.status {
        query = query.filter(maintenance_request::Column::Status.eq(status.as_str()));
    }
    if let Some(phone) = filter.phone.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        query = query.filter(maintenance_request::Column::CustomerPhone.eq(phone));
    }

    query
        .order_by_desc(maintenance_request::Column::CreatedAt)
        .order_by_desc(maintenance_request::Column::Id)
        .all(db)
        .await?
        .iter()
        .map(MaintenanceSummary::try_from)
        .collect()
}

/// Customer lookup of a ticket. Both number and phone must match.
///
/// # Errors
/// Returns `Error::NotFound` when either does not match, without saying which.
pub async fn track_request(
    db: &DatabaseConnection,
    number: &str,
    phone: &str,
) -> Result<MaintenanceRequestView> {
    let model = find_request_by_number(db, number).await?;
    if model.customer_phone != phone.trim() {
        return Err(Error::not_found("Maintenance request", model.request_number));
    }
    load_view(db, model).await
}

/// Changes the status of a request and records it in the history.
///
/// # Errors
/// Returns `Error::IllegalTransition` when the policy is strict and the change
/// is not in the transition table.
pub async fn change_status(
    db: &DatabaseConnection,
    request_id: i64,
    to: MaintenanceStatus,
    note: Option<String>,
    updated_by: &str,
    policy: TransitionPolicy,
) -> Result<MaintenanceRequestView> {
    let txn = db.begin().await?;
    let current = find_request(&txn, request_id).await?;
    let active: maintenance_request::ActiveModel = current.clone().into();
    let updated = transition(&txn, &current, active, to, note, updated_by, policy).await?;
    let view = load_view(&txn, updated).await?;
    txn.commit().await?;
    Ok(view)
}

/// Records a diagnosis and its required parts, then moves the request to `diagnosed`.
///
/// The parts list is replaced and `parts_cost` becomes the sum of price times
/// quantity. A request that is already diagnosed is updated in place without
/// a new history entry.
pub async fn record_diagnosis(
    db: &DatabaseConnection,
    request_id: i64,
    mut diagnosis: DiagnosisInput,
    updated_by: &str,
    policy: TransitionPolicy,
) -> Result<MaintenanceRequestView> {
    trim_in_place(&mut diagnosis.problem);
    trim_optional(&mut diagnosis.root_cause);
    trim_optional(&mut diagnosis.solution);
    for part in &mut diagnosis.required_parts {
        trim_in_place(&mut part.name);
    }
    diagnosis.validate()?;

    let txn = db.begin().await?;
    let current = find_request(&txn, request_id).await?;

    MaintenancePart::delete_many()
        .filter(maintenance_part::Column::RequestId.eq(request_id))
        .exec(&txn)
        .await?;
    let mut parts_cost = 0.0;
    for part in diagnosis.required_parts {
        parts_cost += part.price * f64::from(part.quantity);
        maintenance_part::ActiveModel {
            request_id: Set(request_id),
            name: Set(part.name),
            price: Set(part.price),
            quantity: Set(part.quantity),
            available: Set(part.available),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    let mut cost = CostBreakdown::from_model(&current)?;
    cost.parts_cost = round2(parts_cost);
    cost.calculate_total();

    let mut active: maintenance_request::ActiveModel = current.clone().into();
    active.diagnosis_problem = Set(Some(diagnosis.problem));
    active.diagnosis_root_cause = Set(diagnosis.root_cause);
    active.diagnosis_solution = Set(diagnosis.solution);
    active.diagnosis_estimated_days = Set(diagnosis.estimated_days);
    active.diagnosed_at = Set(Some(Utc::now()));
    cost.apply(&mut active);

    let updated = if current.status == MaintenanceStatus::Diagnosed.as_str() {
        active.updated_at = Set(Utc::now());
        active.update(&txn).await?
    } else {
        transition(
            &txn,
            &current,
            active,
            MaintenanceStatus::Diagnosed,
            Some("Diagnosis recorded".to_string()),
            updated_by,
            policy,
        )
        .await?
    };

    let view = load_view(&txn, updated).await?;
    txn.commit().await?;
    Ok(view)
}

/// Edits fees, the final total or the payment status, then recomputes totals.
pub async fn update_costs(
    db: &DatabaseConnection,
    request_id: i64,
    patch: CostPatch,
) -> Result<MaintenanceRequestView> {
    let current = find_request(db, request_id).await?;
    let mut cost = CostBreakdown::from_model(&current)?;

    if let Some(fee) = patch.diagnostic_fee {
        cost.diagnostic_fee = ensure_amount(fee)?;
    }
    if let Some(labor) = patch.labor_cost {
        cost.labor_cost = ensure_amount(labor)?;
    }
    if let Some(fee) = patch.priority_fee {
        cost.priority_fee = ensure_amount(fee)?;
    }
    if let Some(fee) = patch.shipping_fee {
        cost.shipping_fee = ensure_amount(fee)?;
    }
    if patch.clear_final_override {
        cost.final_overridden = false;
    }
    if let Some(total) = patch.total_final {
        cost.total_final = round2(ensure_amount(total)?);
        cost.final_overridden = true;
    }
    if let Some(payment_status) = patch.payment_status {
        cost.payment_status = payment_status;
    }
    cost.calculate_total();

    let mut active: maintenance_request::ActiveModel = current.into();
    cost.apply(&mut active);
    active.updated_at = Set(Utc::now());
    let updated = active.update(db).await?;

    tracing::info!(
        request = %updated.request_number,
        total_estimated = cost.total_estimated,
        total_final = cost.total_final,
        "Maintenance costs updated"
    );
    load_view(db, updated).await
}

/// Asks the customer to approve the quoted repair.
pub async fn request_approval(
    db: &DatabaseConnection,
    request_id: i64,
    updated_by: &str,
    policy: TransitionPolicy,
) -> Result<MaintenanceRequestView> {
    let txn = db.begin().await?;
    let current = find_request(&txn, request_id).await?;

    let mut active: maintenance_request::ActiveModel = current.clone().into();
    active.approval_status = Set(ApprovalStatus::Pending.as_str().to_string());
    active.approval_responded_at = Set(None);
    active.approval_note = Set(None);

    let updated = transition(
        &txn,
        &current,
        active,
        MaintenanceStatus::WaitingApproval,
        Some("Waiting for customer approval".to_string()),
        updated_by,
        policy,
    )
    .await?;

    let view = load_view(&txn, updated).await?;
    txn.commit().await?;
    Ok(view)
}

/// Records the customer's answer to an approval request.
///
/// Approval moves the request to `approved`; rejection cancels it with the
/// customer's note.
///
/// # Errors
/// Returns `Error::ApprovalConflict` if the phone does not match, or the
/// request is not waiting for an answer.
pub async fn respond_to_approval(
    db: &DatabaseConnection,
    number: &str,
    response: ApprovalResponse,
    policy: TransitionPolicy,
) -> Result<MaintenanceRequestView> {
    let txn = db.begin().await?;
    let current = find_request_by_number(&txn, number).await?;

    if current.customer_phone != response.phone.trim() {
        return Err(Error::ApprovalConflict {
            message: "Phone number does not match this request".to_string(),
        });
    }
    if current.approval_status != ApprovalStatus::Pending.as_str()
        || current.status != MaintenanceStatus::WaitingApproval.as_str()
    {
        return Err(Error::ApprovalConflict {
            message: "This request is not waiting for approval".to_string(),
        });
    }

    let note = response
        .note
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    let (approval, to) = if response.approved {
        (ApprovalStatus::Approved, MaintenanceStatus::Approved)
    } else {
        (ApprovalStatus::Rejected, MaintenanceStatus::Cancelled)
    };

    let mut active: maintenance_request::ActiveModel = current.clone().into();
    active.approval_status = Set(approval.as_str().to_string());
    active.approval_responded_at = Set(Some(Utc::now()));
    active.approval_note = Set(note.clone());

    let updated = transition(&txn, &current, active, to, note, CUSTOMER, policy).await?;
    let view = load_view(&txn, updated).await?;
    txn.commit().await?;

    tracing::info!(
        request = %view.request_number,
        approval = %approval,
        "Customer responded to repair quote"
    );
    Ok(view)
}

/// Deletes a request together with its history and parts.
pub async fn delete_request(db: &DatabaseConnection, request_id: i64) -> Result<()> {
    let txn = db.begin().await?;
    let request = find_request(&txn, request_id).await?;

    StatusHistory::delete_many()
        .filter(maintenance_status_history::Column::RequestId.eq(request_id))
        .exec(&txn)
        .await?;
    MaintenancePart::delete_many()
        .filter(maintenance_part::Column::RequestId.eq(request_id))
        .exec(&txn)
        .await?;
    MaintenanceRequest::delete_by_id(request_id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(request = %request.request_number, "Maintenance request deleted");
    Ok(())
}

/// Decrypts the device lock secret of a request.
pub async fn reveal_lock_secret(
    db: &DatabaseConnection,
    cipher: &DeviceLockCipher,
    request_id: i64,
) -> Result<LockSecretView> {
    let request = find_request(db, request_id).await?;
    let secret = request
        .device_lock_secret
        .as_deref()
        .map(|stored| cipher.open(stored))
        .transpose()?;

    Ok(LockSecretView {
        lock_type: request.device_lock_type.parse()?,
        secret,
    })
}
