//! Domain entities for the storefront.

use crate::domain::tenant::Tenant;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Customer,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Customer => "customer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "customer" => Ok(Role::Customer),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub tenant: Tenant,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: i64,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    /// EUR storefront price.
    pub price: Decimal,
    /// KM storefront price.
    pub price_km: Decimal,
    pub purchase_price: Option<Decimal>,
    pub b2b_price: Option<Decimal>,
    pub retail_price: Option<Decimal>,
    pub category_id: Option<i64>,
    pub region: Option<String>,
    pub platform: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Storefront price in the tenant currency.
    pub fn price_for(&self, tenant: Tenant) -> Decimal {
        match tenant {
            Tenant::Eur => self.price,
            Tenant::Km => self.price_km,
        }
    }
}

/// A product row joined with its derived stock (count of unused keys).
#[derive(Debug, Clone, Serialize)]
pub struct ProductWithStock {
    #[serde(flatten)]
    pub product: Product,
    pub stock: i64,
}

/// Customer-facing product shape: tenant-priced, wholesale fields hidden.
#[derive(Debug, Clone, Serialize)]
pub struct ProductView {
    pub id: i64,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub currency: &'static str,
    pub category_id: Option<i64>,
    pub region: Option<String>,
    pub platform: Option<String>,
    pub stock: i64,
}

impl ProductView {
    pub fn new(p: &ProductWithStock, tenant: Tenant) -> Self {
        ProductView {
            id: p.product.id,
            sku: p.product.sku.clone(),
            name: p.product.name.clone(),
            description: p.product.description.clone(),
            price: p.product.price_for(tenant),
            currency: tenant.currency(),
            category_id: p.product.category_id,
            region: p.product.region.clone(),
            platform: p.product.platform.clone(),
            stock: p.stock,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<i64>,
    /// 1 for roots, up to [`crate::domain::category::MAX_DEPTH`].
    pub level: i32,
    pub path: String,
    pub path_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LicenseKey {
    pub id: i64,
    pub product_id: i64,
    pub key_value: String,
    pub is_used: bool,
    pub used_by: Option<i64>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Availability counters for one product's key pool.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct KeyPool {
    pub product_id: i64,
    pub total: i64,
    pub available: i64,
    pub used: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartItem {
    pub id: i64,
    pub user_id: i64,
    pub tenant: Tenant,
    pub product_id: i64,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Cart row joined with its product for pricing and display.
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub item: CartItem,
    pub product: Product,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "paid" => Ok(PaymentStatus::Paid),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(format!("unknown payment status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: i64,
    pub order_number: String,
    pub user_id: i64,
    pub tenant: Tenant,
    pub total_amount: Decimal,
    pub tax_amount: Decimal,
    pub final_amount: Decimal,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

/// One purchased unit; carries the consumed key and a price/name snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub license_key_id: i64,
    pub product_name: String,
    pub unit_price: Decimal,
    pub key_value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Fixed wallet parameters (per deployment, not per user).
#[derive(Debug, Clone, Copy)]
pub struct WalletLimits {
    pub starting_balance: Decimal,
    pub credit_limit: Decimal,
}

impl WalletLimits {
    /// Headroom left after `spent`, including the credit line.
    pub fn available(&self, spent: Decimal) -> Decimal {
        self.starting_balance - spent + self.credit_limit
    }
}

/// Derived wallet snapshot; nothing here is persisted.
#[derive(Debug, Clone, Serialize)]
pub struct Wallet {
    pub tenant: Tenant,
    pub currency: &'static str,
    pub starting_balance: Decimal,
    pub spent: Decimal,
    /// `starting_balance - spent`, clamped at zero.
    pub balance: Decimal,
    pub credit_limit: Decimal,
    pub available: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct WalletTransaction {
    pub kind: WalletTransactionKind,
    /// Signed: deposits positive, purchases negative.
    pub amount: Decimal,
    pub description: String,
    pub order_number: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletTransactionKind {
    Deposit,
    Purchase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Open,
    Pending,
    Closed,
}

impl TicketStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::Pending => "pending",
            TicketStatus::Closed => "closed",
        }
    }
}

impl FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(TicketStatus::Open),
            "pending" => Ok(TicketStatus::Pending),
            "closed" => Ok(TicketStatus::Closed),
            other => Err(format!("unknown ticket status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SupportTicket {
    pub id: i64,
    pub user_id: i64,
    pub tenant: Tenant,
    pub subject: String,
    pub body: String,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row counts surfaced by `/metrics`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StoreStats {
    pub users: i64,
    pub products: i64,
    pub orders: i64,
    pub open_tickets: i64,
}
