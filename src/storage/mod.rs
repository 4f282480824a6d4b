//! Storage layer: one trait, two backends.
//!
//! [`PgStorage`] is the production backend (PostgreSQL via sqlx);
//! [`MemStorage`] backs tests and demos. Checkout is a single atomic
//! operation on the backend so no partially-fulfilled order can survive a
//! failure, see [`Storage::checkout`].

pub mod memory;
pub mod postgres;

pub use memory::MemStorage;
pub use postgres::PgStorage;

use crate::domain::model::{
    CartItem, CartLine, Category, KeyPool, Order, OrderDetail, Product, ProductWithStock, Role,
    StoreStats, SupportTicket, TicketStatus, User, WalletLimits,
};
use crate::domain::pricing::{OrderTotals, PricedLine};
use crate::domain::tenant::Tenant;
use crate::error::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub role: Role,
    pub tenant: Tenant,
}

/// Partial user update; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub price_km: Decimal,
    pub purchase_price: Option<Decimal>,
    pub b2b_price: Option<Decimal>,
    pub retail_price: Option<Decimal>,
    pub category_id: Option<i64>,
    pub region: Option<String>,
    pub platform: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub price_km: Option<Decimal>,
    pub purchase_price: Option<Decimal>,
    pub b2b_price: Option<Decimal>,
    pub retail_price: Option<Decimal>,
    pub category_id: Option<i64>,
    pub region: Option<String>,
    pub platform: Option<String>,
    pub is_active: Option<bool>,
}

/// Storefront product filter.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Restrict to active products (always set by storefront queries).
    pub active_only: bool,
    /// Restrict to a category subtree by materialized path.
    pub category_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub parent_id: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct NewTicket {
    pub user_id: i64,
    pub tenant: Tenant,
    pub subject: String,
    pub body: String,
}

/// Everything the backend needs to persist one checkout atomically.
///
/// Lines and totals are priced by the order service beforehand; the backend
/// allocates keys, re-derives the wallet headroom inside its transaction,
/// writes order + items, and clears the cart.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub user_id: i64,
    pub tenant: Tenant,
    pub lines: Vec<PricedLine>,
    pub totals: OrderTotals,
    pub wallet: WalletLimits,
}

#[async_trait]
pub trait Storage: Send + Sync {
    // --- users ---
    async fn create_user(&self, new: NewUser) -> Result<User>;
    async fn user_by_id(&self, id: i64) -> Result<Option<User>>;
    async fn user_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn list_users(&self) -> Result<Vec<User>>;
    async fn update_user(&self, id: i64, patch: UserPatch) -> Result<User>;

    // --- products ---
    async fn create_product(&self, new: NewProduct) -> Result<Product>;
    async fn update_product(&self, id: i64, patch: ProductPatch) -> Result<Product>;
    async fn product_by_id(&self, id: i64) -> Result<Option<Product>>;
    async fn product_with_stock(&self, id: i64) -> Result<Option<ProductWithStock>>;
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<ProductWithStock>>;

    // --- categories ---
    async fn create_category(&self, new: NewCategory) -> Result<Category>;
    async fn update_category(&self, id: i64, patch: CategoryPatch) -> Result<Category>;
    async fn category_by_id(&self, id: i64) -> Result<Option<Category>>;
    async fn list_categories(&self) -> Result<Vec<Category>>;
    async fn categories_by_level(&self, level: i32) -> Result<Vec<Category>>;
    async fn categories_by_parent(&self, parent_id: Option<i64>) -> Result<Vec<Category>>;
    /// Root-to-node breadcrumb for a category.
    async fn category_breadcrumb(&self, id: i64) -> Result<Vec<Category>>;

    // --- license keys ---
    /// Bulk-inserts keys; duplicates within the product's pool are skipped.
    /// Returns the number actually inserted.
    async fn add_license_keys(&self, product_id: i64, keys: Vec<String>) -> Result<u64>;
    async fn key_pool(&self, product_id: i64) -> Result<KeyPool>;

    // --- cart ---
    async fn cart(&self, user_id: i64, tenant: Tenant) -> Result<Vec<CartLine>>;
    /// Merge-on-insert: repeat adds increase the row's quantity.
    async fn add_to_cart(
        &self,
        user_id: i64,
        tenant: Tenant,
        product_id: i64,
        quantity: i32,
    ) -> Result<CartItem>;
    async fn remove_from_cart(&self, user_id: i64, tenant: Tenant, product_id: i64) -> Result<()>;
    async fn clear_cart(&self, user_id: i64, tenant: Tenant) -> Result<()>;

    // --- orders & wallet ---
    async fn checkout(&self, req: CheckoutRequest) -> Result<OrderDetail>;
    async fn orders_for_user(&self, user_id: i64, tenant: Tenant) -> Result<Vec<Order>>;
    /// Order with items; `user_scope` restricts to that owner (customers see
    /// only their own orders, admins pass `None`).
    async fn order_detail(&self, id: i64, user_scope: Option<i64>) -> Result<Option<OrderDetail>>;
    /// Sum of completed order totals, the wallet's only input.
    async fn completed_spend(&self, user_id: i64, tenant: Tenant) -> Result<Decimal>;

    // --- support tickets ---
    async fn create_ticket(&self, new: NewTicket) -> Result<SupportTicket>;
    async fn tickets_for_user(&self, user_id: i64, tenant: Tenant) -> Result<Vec<SupportTicket>>;
    async fn list_tickets(&self) -> Result<Vec<SupportTicket>>;
    async fn update_ticket_status(&self, id: i64, status: TicketStatus) -> Result<SupportTicket>;

    // --- health & metrics ---
    async fn ping(&self) -> Result<()>;
    async fn stats(&self) -> Result<StoreStats>;
}
