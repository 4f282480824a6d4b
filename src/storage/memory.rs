//! In-memory storage backend.
//!
//! Backs integration tests and demos. All state lives behind one `RwLock`,
//! so [`Storage::checkout`] is atomic by construction: the write guard is
//! held across key allocation, the wallet check and every row mutation.

use crate::domain::category as cat;
use crate::domain::model::{
    CartItem, CartLine, Category, KeyPool, LicenseKey, Order, OrderDetail, OrderItem, OrderStatus,
    PaymentStatus, Product, ProductWithStock, StoreStats, SupportTicket, TicketStatus, User,
};
use crate::domain::tenant::Tenant;
use crate::error::{Error, Result};
use crate::storage::{
    CategoryPatch, CheckoutRequest, NewCategory, NewProduct, NewTicket, NewUser, ProductFilter,
    ProductPatch, Storage, UserPatch,
};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    products: Vec<Product>,
    categories: Vec<Category>,
    keys: Vec<LicenseKey>,
    cart: Vec<CartItem>,
    orders: Vec<Order>,
    order_items: Vec<OrderItem>,
    tickets: Vec<SupportTicket>,
    next_id: i64,
    order_seq: i64,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn next_order_number(&mut self) -> String {
        self.order_seq += 1;
        format!("ORD-{:06}", self.order_seq)
    }

    fn available_keys(&self, product_id: i64) -> impl Iterator<Item = &LicenseKey> {
        self.keys
            .iter()
            .filter(move |k| k.product_id == product_id && !k.is_used)
    }

    fn stock(&self, product_id: i64) -> i64 {
        self.available_keys(product_id).count() as i64
    }

    fn spent(&self, user_id: i64, tenant: Tenant) -> Decimal {
        self.orders
            .iter()
            .filter(|o| {
                o.user_id == user_id && o.tenant == tenant && o.status == OrderStatus::Completed
            })
            .map(|o| o.final_amount)
            .sum()
    }
}

#[derive(Default)]
pub struct MemStorage {
    inner: RwLock<Inner>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemStorage {
    async fn create_user(&self, new: NewUser) -> Result<User> {
        let mut inner = self.inner.write().await;
        if inner.users.iter().any(|u| u.username == new.username) {
            return Err(Error::Conflict(format!(
                "username '{}' already exists",
                new.username
            )));
        }
        let user = User {
            id: inner.next_id(),
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            role: new.role,
            tenant: new.tenant,
            is_active: true,
            created_at: Utc::now(),
        };
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn user_by_id(&self, id: i64) -> Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.id == id).cloned())
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.username == username).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.clone())
    }

    async fn update_user(&self, id: i64, patch: UserPatch) -> Result<User> {
        let mut inner = self.inner.write().await;
        let user = inner
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(Error::NotFound("user"))?;
        if let Some(email) = patch.email {
            user.email = Some(email);
        }
        if let Some(hash) = patch.password_hash {
            user.password_hash = hash;
        }
        if let Some(role) = patch.role {
            user.role = role;
        }
        if let Some(active) = patch.is_active {
            user.is_active = active;
        }
        Ok(user.clone())
    }

    async fn create_product(&self, new: NewProduct) -> Result<Product> {
        let mut inner = self.inner.write().await;
        if inner.products.iter().any(|p| p.sku == new.sku) {
            return Err(Error::Conflict(format!("sku '{}' already exists", new.sku)));
        }
        if let Some(cid) = new.category_id {
            if !inner.categories.iter().any(|c| c.id == cid) {
                return Err(Error::NotFound("category"));
            }
        }
        let product = Product {
            id: inner.next_id(),
            sku: new.sku,
            name: new.name,
            description: new.description,
            price: new.price,
            price_km: new.price_km,
            purchase_price: new.purchase_price,
            b2b_price: new.b2b_price,
            retail_price: new.retail_price,
            category_id: new.category_id,
            region: new.region,
            platform: new.platform,
            is_active: true,
            created_at: Utc::now(),
        };
        inner.products.push(product.clone());
        Ok(product)
    }

    async fn update_product(&self, id: i64, patch: ProductPatch) -> Result<Product> {
        let mut inner = self.inner.write().await;
        if let Some(cid) = patch.category_id {
            if !inner.categories.iter().any(|c| c.id == cid) {
                return Err(Error::NotFound("category"));
            }
        }
        let product = inner
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(Error::NotFound("product"))?;
        if let Some(v) = patch.name {
            product.name = v;
        }
        if let Some(v) = patch.description {
            product.description = Some(v);
        }
        if let Some(v) = patch.price {
            product.price = v;
        }
        if let Some(v) = patch.price_km {
            product.price_km = v;
        }
        if let Some(v) = patch.purchase_price {
            product.purchase_price = Some(v);
        }
        if let Some(v) = patch.b2b_price {
            product.b2b_price = Some(v);
        }
        if let Some(v) = patch.retail_price {
            product.retail_price = Some(v);
        }
        if let Some(v) = patch.category_id {
            product.category_id = Some(v);
        }
        if let Some(v) = patch.region {
            product.region = Some(v);
        }
        if let Some(v) = patch.platform {
            product.platform = Some(v);
        }
        if let Some(v) = patch.is_active {
            product.is_active = v;
        }
        Ok(product.clone())
    }

    async fn product_by_id(&self, id: i64) -> Result<Option<Product>> {
        let inner = self.inner.read().await;
        Ok(inner.products.iter().find(|p| p.id == id).cloned())
    }

    async fn product_with_stock(&self, id: i64) -> Result<Option<ProductWithStock>> {
        let inner = self.inner.read().await;
        Ok(inner.products.iter().find(|p| p.id == id).map(|p| {
            ProductWithStock {
                product: p.clone(),
                stock: inner.stock(p.id),
            }
        }))
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<ProductWithStock>> {
        let inner = self.inner.read().await;
        let category_ids: Option<Vec<i64>> = filter.category_path.as_deref().map(|path| {
            inner
                .categories
                .iter()
                .filter(|c| cat::in_subtree(path, &c.path))
                .map(|c| c.id)
                .collect()
        });
        Ok(inner
            .products
            .iter()
            .filter(|p| !filter.active_only || p.is_active)
            .filter(|p| match &category_ids {
                Some(ids) => p.category_id.map(|cid| ids.contains(&cid)).unwrap_or(false),
                None => true,
            })
            .map(|p| ProductWithStock {
                product: p.clone(),
                stock: inner.stock(p.id),
            })
            .collect())
    }

    async fn create_category(&self, new: NewCategory) -> Result<Category> {
        let mut inner = self.inner.write().await;
        let parent = match new.parent_id {
            Some(pid) => Some(
                inner
                    .categories
                    .iter()
                    .find(|c| c.id == pid)
                    .cloned()
                    .ok_or(Error::NotFound("parent category"))?,
            ),
            None => None,
        };
        let level = parent.as_ref().map(|p| p.level + 1).unwrap_or(1);
        if level > cat::MAX_DEPTH {
            return Err(Error::Validation(format!(
                "category tree is limited to {} levels",
                cat::MAX_DEPTH
            )));
        }
        let slug = cat::slugify(&new.name);
        if slug.is_empty() {
            return Err(Error::Validation("category name yields an empty slug".into()));
        }
        let path = cat::join_path(parent.as_ref().map(|p| p.path.as_str()), &slug);
        if inner.categories.iter().any(|c| c.path == path) {
            return Err(Error::Conflict(format!("category path '{}' already exists", path)));
        }
        let category = Category {
            id: inner.next_id(),
            name: new.name.clone(),
            slug,
            parent_id: new.parent_id,
            level,
            path,
            path_name: cat::join_path_name(
                parent.as_ref().map(|p| p.path_name.as_str()),
                &new.name,
            ),
            is_active: true,
            created_at: Utc::now(),
        };
        inner.categories.push(category.clone());
        Ok(category)
    }

    async fn update_category(&self, id: i64, patch: CategoryPatch) -> Result<Category> {
        let mut inner = self.inner.write().await;
        let old = inner
            .categories
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or(Error::NotFound("category"))?;

        if let Some(name) = patch.name {
            let slug = cat::slugify(&name);
            if slug.is_empty() {
                return Err(Error::Validation("category name yields an empty slug".into()));
            }
            let parent = old
                .parent_id
                .and_then(|pid| inner.categories.iter().find(|c| c.id == pid).cloned());
            let new_path = cat::join_path(parent.as_ref().map(|p| p.path.as_str()), &slug);
            let new_path_name =
                cat::join_path_name(parent.as_ref().map(|p| p.path_name.as_str()), &name);
            if new_path != old.path && inner.categories.iter().any(|c| c.path == new_path) {
                return Err(Error::Conflict(format!(
                    "category path '{}' already exists",
                    new_path
                )));
            }
            // Rebase the whole subtree onto the renamed node.
            let old_path = old.path.clone();
            let old_path_name = old.path_name.clone();
            for c in inner.categories.iter_mut() {
                if cat::in_subtree(&old_path, &c.path) {
                    c.path = cat::rebase_path(&old_path, &new_path, &c.path);
                    c.path_name =
                        cat::rebase_path_name(&old_path_name, &new_path_name, &c.path_name);
                }
            }
            if let Some(target) = inner.categories.iter_mut().find(|c| c.id == id) {
                target.name = name;
                target.slug = slug;
            }
        }
        if let Some(active) = patch.is_active {
            if let Some(target) = inner.categories.iter_mut().find(|c| c.id == id) {
                target.is_active = active;
            }
        }
        inner
            .categories
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or(Error::NotFound("category"))
    }

    async fn category_by_id(&self, id: i64) -> Result<Option<Category>> {
        let inner = self.inner.read().await;
        Ok(inner.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let inner = self.inner.read().await;
        let mut out = inner.categories.clone();
        out.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(out)
    }

    async fn categories_by_level(&self, level: i32) -> Result<Vec<Category>> {
        let inner = self.inner.read().await;
        Ok(inner
            .categories
            .iter()
            .filter(|c| c.level == level)
            .cloned()
            .collect())
    }

    async fn categories_by_parent(&self, parent_id: Option<i64>) -> Result<Vec<Category>> {
        let inner = self.inner.read().await;
        Ok(inner
            .categories
            .iter()
            .filter(|c| c.parent_id == parent_id)
            .cloned()
            .collect())
    }

    async fn category_breadcrumb(&self, id: i64) -> Result<Vec<Category>> {
        let inner = self.inner.read().await;
        let target = inner
            .categories
            .iter()
            .find(|c| c.id == id)
            .ok_or(Error::NotFound("category"))?;
        let mut crumb = Vec::new();
        let mut prefix = String::new();
        for segment in target.path.split('/') {
            prefix = cat::join_path(
                if prefix.is_empty() { None } else { Some(prefix.as_str()) },
                segment,
            );
            if let Some(c) = inner.categories.iter().find(|c| c.path == prefix) {
                crumb.push(c.clone());
            }
        }
        Ok(crumb)
    }

    async fn add_license_keys(&self, product_id: i64, keys: Vec<String>) -> Result<u64> {
        let mut inner = self.inner.write().await;
        if !inner.products.iter().any(|p| p.id == product_id) {
            return Err(Error::NotFound("product"));
        }
        let mut inserted = 0u64;
        for key_value in keys {
            let exists = inner
                .keys
                .iter()
                .any(|k| k.product_id == product_id && k.key_value == key_value);
            if exists {
                continue;
            }
            let id = inner.next_id();
            inner.keys.push(LicenseKey {
                id,
                product_id,
                key_value,
                is_used: false,
                used_by: None,
                used_at: None,
                created_at: Utc::now(),
            });
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn key_pool(&self, product_id: i64) -> Result<KeyPool> {
        let inner = self.inner.read().await;
        if !inner.products.iter().any(|p| p.id == product_id) {
            return Err(Error::NotFound("product"));
        }
        let total = inner.keys.iter().filter(|k| k.product_id == product_id).count() as i64;
        let available = inner.stock(product_id);
        Ok(KeyPool {
            product_id,
            total,
            available,
            used: total - available,
        })
    }

    async fn cart(&self, user_id: i64, tenant: Tenant) -> Result<Vec<CartLine>> {
        let inner = self.inner.read().await;
        Ok(inner
            .cart
            .iter()
            .filter(|i| i.user_id == user_id && i.tenant == tenant)
            .filter_map(|i| {
                inner
                    .products
                    .iter()
                    .find(|p| p.id == i.product_id)
                    .map(|p| CartLine {
                        item: i.clone(),
                        product: p.clone(),
                    })
            })
            .collect())
    }

    async fn add_to_cart(
        &self,
        user_id: i64,
        tenant: Tenant,
        product_id: i64,
        quantity: i32,
    ) -> Result<CartItem> {
        if quantity < 1 {
            return Err(Error::Validation("quantity must be >= 1".into()));
        }
        let mut inner = self.inner.write().await;
        let product = inner
            .products
            .iter()
            .find(|p| p.id == product_id)
            .ok_or(Error::NotFound("product"))?;
        if !product.is_active {
            return Err(Error::Validation("product is not available".into()));
        }
        if let Some(item) = inner
            .cart
            .iter_mut()
            .find(|i| i.user_id == user_id && i.tenant == tenant && i.product_id == product_id)
        {
            item.quantity += quantity;
            item.updated_at = Utc::now();
            return Ok(item.clone());
        }
        let now = Utc::now();
        let item = CartItem {
            id: inner.next_id(),
            user_id,
            tenant,
            product_id,
            quantity,
            created_at: now,
            updated_at: now,
        };
        inner.cart.push(item.clone());
        Ok(item)
    }

    async fn remove_from_cart(&self, user_id: i64, tenant: Tenant, product_id: i64) -> Result<()> {
        let mut inner = self.inner.write().await;
        let before = inner.cart.len();
        inner
            .cart
            .retain(|i| !(i.user_id == user_id && i.tenant == tenant && i.product_id == product_id));
        if inner.cart.len() == before {
            return Err(Error::NotFound("cart item"));
        }
        Ok(())
    }

    async fn clear_cart(&self, user_id: i64, tenant: Tenant) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner
            .cart
            .retain(|i| !(i.user_id == user_id && i.tenant == tenant));
        Ok(())
    }

    async fn checkout(&self, req: CheckoutRequest) -> Result<OrderDetail> {
        let mut inner = self.inner.write().await;

        // Wallet headroom first: derived from completed orders, so the check
        // and the insert happen under the same write guard.
        let spent = inner.spent(req.user_id, req.tenant);
        let available = req.wallet.available(spent);
        if req.totals.final_amount > available {
            return Err(Error::InsufficientFunds {
                required: req.totals.final_amount,
                available,
            });
        }

        // Reserve keys for every line before mutating anything.
        let mut allocations: Vec<(i64, Vec<i64>)> = Vec::with_capacity(req.lines.len());
        for line in &req.lines {
            let key_ids: Vec<i64> = inner
                .available_keys(line.product_id)
                .take(line.quantity as usize)
                .map(|k| k.id)
                .collect();
            if key_ids.len() < line.quantity as usize {
                return Err(Error::OutOfStock {
                    product_id: line.product_id,
                    requested: i64::from(line.quantity),
                    available: key_ids.len() as i64,
                });
            }
            allocations.push((line.product_id, key_ids));
        }

        let now = Utc::now();
        let order_number = inner.next_order_number();
        let order = Order {
            id: inner.next_id(),
            order_number,
            user_id: req.user_id,
            tenant: req.tenant,
            total_amount: req.totals.total_amount,
            tax_amount: req.totals.tax_amount,
            final_amount: req.totals.final_amount,
            status: OrderStatus::Completed,
            payment_status: PaymentStatus::Paid,
            created_at: now,
        };

        let mut items = Vec::new();
        for (line, (_, key_ids)) in req.lines.iter().zip(&allocations) {
            for key_id in key_ids {
                let item_id = inner.next_id();
                let key = inner
                    .keys
                    .iter_mut()
                    .find(|k| k.id == *key_id)
                    .ok_or(Error::NotFound("license key"))?;
                key.is_used = true;
                key.used_by = Some(req.user_id);
                key.used_at = Some(now);
                items.push(OrderItem {
                    id: item_id,
                    order_id: order.id,
                    product_id: line.product_id,
                    license_key_id: *key_id,
                    product_name: line.product_name.clone(),
                    unit_price: line.unit_price,
                    key_value: key.key_value.clone(),
                });
            }
        }

        inner.orders.push(order.clone());
        inner.order_items.extend(items.iter().cloned());
        inner
            .cart
            .retain(|i| !(i.user_id == req.user_id && i.tenant == req.tenant));

        Ok(OrderDetail { order, items })
    }

    async fn orders_for_user(&self, user_id: i64, tenant: Tenant) -> Result<Vec<Order>> {
        let inner = self.inner.read().await;
        let mut out: Vec<Order> = inner
            .orders
            .iter()
            .filter(|o| o.user_id == user_id && o.tenant == tenant)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn order_detail(&self, id: i64, user_scope: Option<i64>) -> Result<Option<OrderDetail>> {
        let inner = self.inner.read().await;
        let order = match inner.orders.iter().find(|o| o.id == id) {
            Some(o) => o.clone(),
            None => return Ok(None),
        };
        if let Some(uid) = user_scope {
            if order.user_id != uid {
                return Ok(None);
            }
        }
        let items = inner
            .order_items
            .iter()
            .filter(|i| i.order_id == id)
            .cloned()
            .collect();
        Ok(Some(OrderDetail { order, items }))
    }

    async fn completed_spend(&self, user_id: i64, tenant: Tenant) -> Result<Decimal> {
        let inner = self.inner.read().await;
        Ok(inner.spent(user_id, tenant))
    }

    async fn create_ticket(&self, new: NewTicket) -> Result<SupportTicket> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        let ticket = SupportTicket {
            id: inner.next_id(),
            user_id: new.user_id,
            tenant: new.tenant,
            subject: new.subject,
            body: new.body,
            status: TicketStatus::Open,
            created_at: now,
            updated_at: now,
        };
        inner.tickets.push(ticket.clone());
        Ok(ticket)
    }

    async fn tickets_for_user(&self, user_id: i64, tenant: Tenant) -> Result<Vec<SupportTicket>> {
        let inner = self.inner.read().await;
        let mut out: Vec<SupportTicket> = inner
            .tickets
            .iter()
            .filter(|t| t.user_id == user_id && t.tenant == tenant)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn list_tickets(&self) -> Result<Vec<SupportTicket>> {
        let inner = self.inner.read().await;
        let mut out = inner.tickets.clone();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn update_ticket_status(&self, id: i64, status: TicketStatus) -> Result<SupportTicket> {
        let mut inner = self.inner.write().await;
        let ticket = inner
            .tickets
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(Error::NotFound("ticket"))?;
        ticket.status = status;
        ticket.updated_at = Utc::now();
        Ok(ticket.clone())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn stats(&self) -> Result<StoreStats> {
        let inner = self.inner.read().await;
        Ok(StoreStats {
            users: inner.users.len() as i64,
            products: inner.products.len() as i64,
            orders: inner.orders.len() as i64,
            open_tickets: inner
                .tickets
                .iter()
                .filter(|t| t.status != TicketStatus::Closed)
                .count() as i64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::WalletLimits;
    use crate::domain::pricing::{order_totals, PricedLine};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn limits() -> WalletLimits {
        WalletLimits {
            starting_balance: dec("100.00"),
            credit_limit: dec("0.00"),
        }
    }

    async fn seed_product(store: &MemStorage, sku: &str, price: &str, keys: usize) -> Product {
        let product = store
            .create_product(NewProduct {
                sku: sku.to_string(),
                name: format!("Product {}", sku),
                description: None,
                price: dec(price),
                price_km: dec(price),
                purchase_price: None,
                b2b_price: None,
                retail_price: None,
                category_id: None,
                region: None,
                platform: None,
            })
            .await
            .unwrap();
        let key_values: Vec<String> = (0..keys).map(|i| format!("{}-KEY-{}", sku, i)).collect();
        store.add_license_keys(product.id, key_values).await.unwrap();
        product
    }

    fn checkout_req(user_id: i64, product: &Product, qty: i32) -> CheckoutRequest {
        let lines = vec![PricedLine {
            product_id: product.id,
            product_name: product.name.clone(),
            unit_price: product.price,
            quantity: qty,
        }];
        let totals = order_totals(&lines, dec("0.21"));
        CheckoutRequest {
            user_id,
            tenant: Tenant::Eur,
            lines,
            totals,
            wallet: limits(),
        }
    }

    #[tokio::test]
    async fn cart_add_merges_quantity_for_same_product() {
        let store = MemStorage::new();
        let product = seed_product(&store, "SKU1", "10.00", 5).await;
        store.add_to_cart(1, Tenant::Eur, product.id, 1).await.unwrap();
        let merged = store.add_to_cart(1, Tenant::Eur, product.id, 2).await.unwrap();
        assert_eq!(merged.quantity, 3);
        assert_eq!(store.cart(1, Tenant::Eur).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn carts_are_scoped_per_tenant() {
        let store = MemStorage::new();
        let product = seed_product(&store, "SKU1", "10.00", 5).await;
        store.add_to_cart(1, Tenant::Eur, product.id, 1).await.unwrap();
        store.add_to_cart(1, Tenant::Km, product.id, 2).await.unwrap();
        assert_eq!(store.cart(1, Tenant::Eur).await.unwrap()[0].item.quantity, 1);
        assert_eq!(store.cart(1, Tenant::Km).await.unwrap()[0].item.quantity, 2);
    }

    #[tokio::test]
    async fn checkout_consumes_one_key_per_unit() {
        let store = MemStorage::new();
        let product = seed_product(&store, "SKU1", "10.00", 3).await;
        let detail = store.checkout(checkout_req(1, &product, 2)).await.unwrap();

        assert_eq!(detail.items.len(), 2);
        let pool = store.key_pool(product.id).await.unwrap();
        assert_eq!(pool.available, 1);
        assert_eq!(pool.used, 2);

        // Distinct keys per item.
        assert_ne!(detail.items[0].license_key_id, detail.items[1].license_key_id);
    }

    #[tokio::test]
    async fn used_keys_are_never_reallocated() {
        let store = MemStorage::new();
        let product = seed_product(&store, "SKU1", "10.00", 2).await;
        let first = store.checkout(checkout_req(1, &product, 1)).await.unwrap();
        let second = store.checkout(checkout_req(1, &product, 1)).await.unwrap();
        assert_ne!(
            first.items[0].license_key_id,
            second.items[0].license_key_id
        );
        let err = store.checkout(checkout_req(1, &product, 1)).await.unwrap_err();
        assert!(matches!(err, Error::OutOfStock { available: 0, .. }));
    }

    #[tokio::test]
    async fn out_of_stock_rolls_back_everything() {
        let store = MemStorage::new();
        let product = seed_product(&store, "SKU1", "10.00", 1).await;
        let err = store.checkout(checkout_req(1, &product, 2)).await.unwrap_err();
        assert!(matches!(err, Error::OutOfStock { requested: 2, available: 1, .. }));

        // Nothing happened: no order, key still free.
        assert_eq!(store.orders_for_user(1, Tenant::Eur).await.unwrap().len(), 0);
        assert_eq!(store.key_pool(product.id).await.unwrap().available, 1);
    }

    #[tokio::test]
    async fn insufficient_funds_blocks_checkout() {
        let store = MemStorage::new();
        // 10 * 9 = 90.00 + 18.90 VAT = 108.90 > 100.00 wallet.
        let product = seed_product(&store, "SKU1", "10.00", 10).await;
        let err = store.checkout(checkout_req(1, &product, 9)).await.unwrap_err();
        assert!(matches!(err, Error::InsufficientFunds { .. }));
        assert_eq!(store.key_pool(product.id).await.unwrap().available, 10);
    }

    #[tokio::test]
    async fn wallet_spend_derives_from_completed_orders() {
        let store = MemStorage::new();
        let product = seed_product(&store, "SKU1", "10.00", 5).await;
        store.checkout(checkout_req(1, &product, 2)).await.unwrap();
        assert_eq!(
            store.completed_spend(1, Tenant::Eur).await.unwrap(),
            dec("24.20")
        );
        assert_eq!(store.completed_spend(1, Tenant::Km).await.unwrap(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn category_paths_materialize_from_parents() {
        let store = MemStorage::new();
        let root = store
            .create_category(NewCategory { name: "Software".into(), parent_id: None })
            .await
            .unwrap();
        let child = store
            .create_category(NewCategory { name: "Antivirus".into(), parent_id: Some(root.id) })
            .await
            .unwrap();
        let leaf = store
            .create_category(NewCategory { name: "Home Use".into(), parent_id: Some(child.id) })
            .await
            .unwrap();

        assert_eq!(child.path, "software/antivirus");
        assert_eq!(leaf.path, "software/antivirus/home-use");
        assert_eq!(leaf.path_name, "Software > Antivirus > Home Use");
        assert_eq!(leaf.level, 3);

        // Fourth level exceeds the depth limit.
        let err = store
            .create_category(NewCategory { name: "Deeper".into(), parent_id: Some(leaf.id) })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let crumb = store.category_breadcrumb(leaf.id).await.unwrap();
        let names: Vec<&str> = crumb.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Software", "Antivirus", "Home Use"]);
    }

    #[tokio::test]
    async fn renaming_a_category_rebases_its_subtree() {
        let store = MemStorage::new();
        let root = store
            .create_category(NewCategory { name: "Software".into(), parent_id: None })
            .await
            .unwrap();
        let child = store
            .create_category(NewCategory { name: "Antivirus".into(), parent_id: Some(root.id) })
            .await
            .unwrap();

        store
            .update_category(root.id, CategoryPatch { name: Some("Apps".into()), is_active: None })
            .await
            .unwrap();

        let child = store.category_by_id(child.id).await.unwrap().unwrap();
        assert_eq!(child.path, "apps/antivirus");
        assert_eq!(child.path_name, "Apps > Antivirus");
    }

    #[tokio::test]
    async fn duplicate_keys_in_pool_are_skipped() {
        let store = MemStorage::new();
        let product = seed_product(&store, "SKU1", "10.00", 0).await;
        let n = store
            .add_license_keys(product.id, vec!["A".into(), "A".into(), "B".into()])
            .await
            .unwrap();
        assert_eq!(n, 2);
        let n = store.add_license_keys(product.id, vec!["B".into()]).await.unwrap();
        assert_eq!(n, 0);
    }
}
