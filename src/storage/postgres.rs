//! PostgreSQL storage backend (sqlx).
//!
//! Schema is created on connect with `CREATE TABLE IF NOT EXISTS`, so a fresh
//! database bootstraps itself. Checkout runs in a single transaction and
//! allocates license keys with `FOR UPDATE SKIP LOCKED`, so two concurrent
//! checkouts can never consume the same key.

use crate::domain::category as cat;
use crate::domain::model::{
    CartItem, CartLine, Category, KeyPool, Order, OrderDetail, OrderItem, OrderStatus,
    PaymentStatus, Product, ProductWithStock, Role, StoreStats, SupportTicket, TicketStatus, User,
};
use crate::domain::tenant::Tenant;
use crate::error::{Error, Result};
use crate::storage::{
    CategoryPatch, CheckoutRequest, NewCategory, NewProduct, NewTicket, NewUser, ProductFilter,
    ProductPatch, Storage, UserPatch,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::str::FromStr;
use tracing::info;

pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    /// Connects to the database and ensures the schema exists.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        let storage = PgStorage { pool };
        storage.ensure_schema().await?;
        Ok(storage)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn ensure_schema(&self) -> Result<()> {
        let ddl = [
            "CREATE TABLE IF NOT EXISTS users (
                id BIGSERIAL PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                email TEXT,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'customer',
                tenant TEXT NOT NULL DEFAULT 'eur',
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )",
            "CREATE TABLE IF NOT EXISTS categories (
                id BIGSERIAL PRIMARY KEY,
                name TEXT NOT NULL,
                slug TEXT NOT NULL,
                parent_id BIGINT REFERENCES categories(id),
                level INT NOT NULL,
                path TEXT NOT NULL UNIQUE,
                path_name TEXT NOT NULL,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )",
            "CREATE TABLE IF NOT EXISTS products (
                id BIGSERIAL PRIMARY KEY,
                sku TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                description TEXT,
                price NUMERIC(12,2) NOT NULL,
                price_km NUMERIC(12,2) NOT NULL,
                purchase_price NUMERIC(12,2),
                b2b_price NUMERIC(12,2),
                retail_price NUMERIC(12,2),
                category_id BIGINT REFERENCES categories(id),
                region TEXT,
                platform TEXT,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )",
            "CREATE TABLE IF NOT EXISTS license_keys (
                id BIGSERIAL PRIMARY KEY,
                product_id BIGINT NOT NULL REFERENCES products(id),
                key_value TEXT NOT NULL,
                is_used BOOLEAN NOT NULL DEFAULT FALSE,
                used_by BIGINT REFERENCES users(id),
                used_at TIMESTAMPTZ,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                UNIQUE (product_id, key_value)
            )",
            "CREATE INDEX IF NOT EXISTS idx_license_keys_available
                ON license_keys (product_id) WHERE NOT is_used",
            "CREATE TABLE IF NOT EXISTS cart_items (
                id BIGSERIAL PRIMARY KEY,
                user_id BIGINT NOT NULL REFERENCES users(id),
                tenant TEXT NOT NULL,
                product_id BIGINT NOT NULL REFERENCES products(id),
                quantity INT NOT NULL CHECK (quantity >= 1),
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                UNIQUE (user_id, tenant, product_id)
            )",
            "CREATE SEQUENCE IF NOT EXISTS order_numbers",
            "CREATE TABLE IF NOT EXISTS orders (
                id BIGSERIAL PRIMARY KEY,
                order_number TEXT NOT NULL UNIQUE,
                user_id BIGINT NOT NULL REFERENCES users(id),
                tenant TEXT NOT NULL,
                total_amount NUMERIC(12,2) NOT NULL,
                tax_amount NUMERIC(12,2) NOT NULL,
                final_amount NUMERIC(12,2) NOT NULL,
                status TEXT NOT NULL DEFAULT 'completed',
                payment_status TEXT NOT NULL DEFAULT 'paid',
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )",
            "CREATE INDEX IF NOT EXISTS idx_orders_user_tenant
                ON orders (user_id, tenant)",
            "CREATE TABLE IF NOT EXISTS order_items (
                id BIGSERIAL PRIMARY KEY,
                order_id BIGINT NOT NULL REFERENCES orders(id),
                product_id BIGINT NOT NULL REFERENCES products(id),
                license_key_id BIGINT NOT NULL UNIQUE REFERENCES license_keys(id),
                product_name TEXT NOT NULL,
                unit_price NUMERIC(12,2) NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )",
            "CREATE TABLE IF NOT EXISTS support_tickets (
                id BIGSERIAL PRIMARY KEY,
                user_id BIGINT NOT NULL REFERENCES users(id),
                tenant TEXT NOT NULL,
                subject TEXT NOT NULL,
                body TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'open',
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )",
        ];
        for stmt in ddl {
            sqlx::query(stmt).execute(&self.pool).await?;
        }
        info!("database schema ensured");
        Ok(())
    }
}

fn parse_tenant(raw: &str) -> Result<Tenant> {
    Tenant::from_str(raw).map_err(Error::Validation)
}

/// Maps a unique-constraint violation (23505) to `Conflict`.
fn conflict_on_unique(e: sqlx::Error, what: &str) -> Error {
    match &e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            Error::Conflict(format!("{} already exists", what))
        }
        _ => Error::Database(e),
    }
}

fn row_user(row: &PgRow) -> Result<User> {
    let role: String = row.try_get("role")?;
    let tenant: String = row.try_get("tenant")?;
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        role: Role::from_str(&role).map_err(Error::Validation)?,
        tenant: parse_tenant(&tenant)?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_product(row: &PgRow) -> Result<Product> {
    Ok(Product {
        id: row.try_get("id")?,
        sku: row.try_get("sku")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        price: row.try_get("price")?,
        price_km: row.try_get("price_km")?,
        purchase_price: row.try_get("purchase_price")?,
        b2b_price: row.try_get("b2b_price")?,
        retail_price: row.try_get("retail_price")?,
        category_id: row.try_get("category_id")?,
        region: row.try_get("region")?,
        platform: row.try_get("platform")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_category(row: &PgRow) -> Result<Category> {
    Ok(Category {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        parent_id: row.try_get("parent_id")?,
        level: row.try_get("level")?,
        path: row.try_get("path")?,
        path_name: row.try_get("path_name")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_order(row: &PgRow) -> Result<Order> {
    let tenant: String = row.try_get("tenant")?;
    let status: String = row.try_get("status")?;
    let payment_status: String = row.try_get("payment_status")?;
    Ok(Order {
        id: row.try_get("id")?,
        order_number: row.try_get("order_number")?,
        user_id: row.try_get("user_id")?,
        tenant: parse_tenant(&tenant)?,
        total_amount: row.try_get("total_amount")?,
        tax_amount: row.try_get("tax_amount")?,
        final_amount: row.try_get("final_amount")?,
        status: OrderStatus::from_str(&status).map_err(Error::Validation)?,
        payment_status: PaymentStatus::from_str(&payment_status).map_err(Error::Validation)?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_order_item(row: &PgRow) -> Result<OrderItem> {
    Ok(OrderItem {
        id: row.try_get("id")?,
        order_id: row.try_get("order_id")?,
        product_id: row.try_get("product_id")?,
        license_key_id: row.try_get("license_key_id")?,
        product_name: row.try_get("product_name")?,
        unit_price: row.try_get("unit_price")?,
        key_value: row.try_get("key_value")?,
    })
}

fn row_ticket(row: &PgRow) -> Result<SupportTicket> {
    let tenant: String = row.try_get("tenant")?;
    let status: String = row.try_get("status")?;
    Ok(SupportTicket {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        tenant: parse_tenant(&tenant)?,
        subject: row.try_get("subject")?,
        body: row.try_get("body")?,
        status: TicketStatus::from_str(&status).map_err(Error::Validation)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

const PRODUCT_WITH_STOCK: &str = "SELECT p.*, \
    (SELECT COUNT(*) FROM license_keys k WHERE k.product_id = p.id AND NOT k.is_used) AS stock \
    FROM products p";

#[async_trait]
impl Storage for PgStorage {
    async fn create_user(&self, new: NewUser) -> Result<User> {
        let row = sqlx::query(
            "INSERT INTO users (username, email, password_hash, role, tenant)
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(&new.username)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(new.role.as_str())
        .bind(new.tenant.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "username"))?;
        row_user(&row)
    }

    async fn user_by_id(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_user).transpose()
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_user).transpose()
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let rows = sqlx::query("SELECT * FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_user).collect()
    }

    async fn update_user(&self, id: i64, patch: UserPatch) -> Result<User> {
        let row = sqlx::query(
            "UPDATE users SET
                email = COALESCE($2, email),
                password_hash = COALESCE($3, password_hash),
                role = COALESCE($4, role),
                is_active = COALESCE($5, is_active)
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(&patch.email)
        .bind(&patch.password_hash)
        .bind(patch.role.map(Role::as_str))
        .bind(patch.is_active)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => row_user(&row),
            None => Err(Error::NotFound("user")),
        }
    }

    async fn create_product(&self, new: NewProduct) -> Result<Product> {
        let row = sqlx::query(
            "INSERT INTO products
                (sku, name, description, price, price_km, purchase_price,
                 b2b_price, retail_price, category_id, region, platform)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING *",
        )
        .bind(&new.sku)
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.price)
        .bind(new.price_km)
        .bind(new.purchase_price)
        .bind(new.b2b_price)
        .bind(new.retail_price)
        .bind(new.category_id)
        .bind(&new.region)
        .bind(&new.platform)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "sku"))?;
        row_product(&row)
    }

    async fn update_product(&self, id: i64, patch: ProductPatch) -> Result<Product> {
        let row = sqlx::query(
            "UPDATE products SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                price = COALESCE($4, price),
                price_km = COALESCE($5, price_km),
                purchase_price = COALESCE($6, purchase_price),
                b2b_price = COALESCE($7, b2b_price),
                retail_price = COALESCE($8, retail_price),
                category_id = COALESCE($9, category_id),
                region = COALESCE($10, region),
                platform = COALESCE($11, platform),
                is_active = COALESCE($12, is_active)
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(&patch.name)
        .bind(&patch.description)
        .bind(patch.price)
        .bind(patch.price_km)
        .bind(patch.purchase_price)
        .bind(patch.b2b_price)
        .bind(patch.retail_price)
        .bind(patch.category_id)
        .bind(&patch.region)
        .bind(&patch.platform)
        .bind(patch.is_active)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => row_product(&row),
            None => Err(Error::NotFound("product")),
        }
    }

    async fn product_by_id(&self, id: i64) -> Result<Option<Product>> {
        let row = sqlx::query("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_product).transpose()
    }

    async fn product_with_stock(&self, id: i64) -> Result<Option<ProductWithStock>> {
        let sql = format!("{} WHERE p.id = $1", PRODUCT_WITH_STOCK);
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        match row {
            Some(row) => Ok(Some(ProductWithStock {
                product: row_product(&row)?,
                stock: row.try_get("stock")?,
            })),
            None => Ok(None),
        }
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<ProductWithStock>> {
        let mut sql = String::from(PRODUCT_WITH_STOCK);
        if filter.category_path.is_some() {
            sql.push_str(
                " JOIN categories c ON p.category_id = c.id \
                  AND (c.path = $1 OR c.path LIKE $1 || '/%')",
            );
        }
        if filter.active_only {
            sql.push_str(" WHERE p.is_active");
        }
        sql.push_str(" ORDER BY p.id");

        let mut query = sqlx::query(&sql);
        if let Some(path) = &filter.category_path {
            query = query.bind(path);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| {
                Ok(ProductWithStock {
                    product: row_product(row)?,
                    stock: row.try_get("stock")?,
                })
            })
            .collect()
    }

    async fn create_category(&self, new: NewCategory) -> Result<Category> {
        let parent = match new.parent_id {
            Some(pid) => Some(
                self.category_by_id(pid)
                    .await?
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
        let path_name =
            cat::join_path_name(parent.as_ref().map(|p| p.path_name.as_str()), &new.name);

        let row = sqlx::query(
            "INSERT INTO categories (name, slug, parent_id, level, path, path_name)
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(&new.name)
        .bind(&slug)
        .bind(new.parent_id)
        .bind(level)
        .bind(&path)
        .bind(&path_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "category path"))?;
        row_category(&row)
    }

    async fn update_category(&self, id: i64, patch: CategoryPatch) -> Result<Category> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT * FROM categories WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let old = match row {
            Some(row) => row_category(&row)?,
            None => return Err(Error::NotFound("category")),
        };

        if let Some(name) = &patch.name {
            let slug = cat::slugify(name);
            if slug.is_empty() {
                return Err(Error::Validation("category name yields an empty slug".into()));
            }
            let parent = match old.parent_id {
                Some(pid) => {
                    let prow = sqlx::query("SELECT * FROM categories WHERE id = $1")
                        .bind(pid)
                        .fetch_optional(&mut *tx)
                        .await?;
                    prow.as_ref().map(row_category).transpose()?
                }
                None => None,
            };
            let new_path = cat::join_path(parent.as_ref().map(|p| p.path.as_str()), &slug);
            let new_path_name =
                cat::join_path_name(parent.as_ref().map(|p| p.path_name.as_str()), name);

            sqlx::query(
                "UPDATE categories SET name = $2, slug = $3, path = $4, path_name = $5
                 WHERE id = $1",
            )
            .bind(id)
            .bind(name)
            .bind(&slug)
            .bind(&new_path)
            .bind(&new_path_name)
            .execute(&mut *tx)
            .await
            .map_err(|e| conflict_on_unique(e, "category path"))?;

            // Rebase descendants by prefix replacement.
            sqlx::query(
                "UPDATE categories SET
                    path = $2 || substr(path, length($1) + 1),
                    path_name = $4 || substr(path_name, length($3) + 1)
                 WHERE path LIKE $1 || '/%'",
            )
            .bind(&old.path)
            .bind(&new_path)
            .bind(&old.path_name)
            .bind(&new_path_name)
            .execute(&mut *tx)
            .await?;
        }

        if let Some(active) = patch.is_active {
            sqlx::query("UPDATE categories SET is_active = $2 WHERE id = $1")
                .bind(id)
                .bind(active)
                .execute(&mut *tx)
                .await?;
        }

        let row = sqlx::query("SELECT * FROM categories WHERE id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        let updated = row_category(&row)?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn category_by_id(&self, id: i64) -> Result<Option<Category>> {
        let row = sqlx::query("SELECT * FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_category).transpose()
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query("SELECT * FROM categories ORDER BY path")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_category).collect()
    }

    async fn categories_by_level(&self, level: i32) -> Result<Vec<Category>> {
        let rows = sqlx::query("SELECT * FROM categories WHERE level = $1 ORDER BY path")
            .bind(level)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_category).collect()
    }

    async fn categories_by_parent(&self, parent_id: Option<i64>) -> Result<Vec<Category>> {
        let rows = match parent_id {
            Some(pid) => {
                sqlx::query("SELECT * FROM categories WHERE parent_id = $1 ORDER BY path")
                    .bind(pid)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query("SELECT * FROM categories WHERE parent_id IS NULL ORDER BY path")
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        rows.iter().map(row_category).collect()
    }

    async fn category_breadcrumb(&self, id: i64) -> Result<Vec<Category>> {
        let target = self
            .category_by_id(id)
            .await?
            .ok_or(Error::NotFound("category"))?;
        // The materialized path already names every ancestor.
        let mut prefixes: Vec<String> = Vec::new();
        let mut prefix = String::new();
        for segment in target.path.split('/') {
            prefix = cat::join_path(
                if prefix.is_empty() { None } else { Some(prefix.as_str()) },
                segment,
            );
            prefixes.push(prefix.clone());
        }
        let rows = sqlx::query("SELECT * FROM categories WHERE path = ANY($1) ORDER BY level")
            .bind(&prefixes)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_category).collect()
    }

    async fn add_license_keys(&self, product_id: i64, keys: Vec<String>) -> Result<u64> {
        if self.product_by_id(product_id).await?.is_none() {
            return Err(Error::NotFound("product"));
        }
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0u64;
        for key_value in &keys {
            let result = sqlx::query(
                "INSERT INTO license_keys (product_id, key_value)
                 VALUES ($1, $2) ON CONFLICT (product_id, key_value) DO NOTHING",
            )
            .bind(product_id)
            .bind(key_value)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }
        tx.commit().await?;
        info!("imported {} license keys for product {}", inserted, product_id);
        Ok(inserted)
    }

    async fn key_pool(&self, product_id: i64) -> Result<KeyPool> {
        if self.product_by_id(product_id).await?.is_none() {
            return Err(Error::NotFound("product"));
        }
        let row = sqlx::query(
            "SELECT COUNT(*) AS total,
                    COUNT(*) FILTER (WHERE NOT is_used) AS available
             FROM license_keys WHERE product_id = $1",
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;
        let total: i64 = row.try_get("total")?;
        let available: i64 = row.try_get("available")?;
        Ok(KeyPool {
            product_id,
            total,
            available,
            used: total - available,
        })
    }

    async fn cart(&self, user_id: i64, tenant: Tenant) -> Result<Vec<CartLine>> {
        let rows = sqlx::query(
            "SELECT ci.id AS ci_id, ci.user_id AS ci_user_id, ci.tenant AS ci_tenant,
                    ci.product_id AS ci_product_id, ci.quantity AS ci_quantity,
                    ci.created_at AS ci_created_at, ci.updated_at AS ci_updated_at,
                    p.*
             FROM cart_items ci
             JOIN products p ON p.id = ci.product_id
             WHERE ci.user_id = $1 AND ci.tenant = $2
             ORDER BY ci.id",
        )
        .bind(user_id)
        .bind(tenant.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| {
                let raw_tenant: String = row.try_get("ci_tenant")?;
                Ok(CartLine {
                    item: CartItem {
                        id: row.try_get("ci_id")?,
                        user_id: row.try_get("ci_user_id")?,
                        tenant: parse_tenant(&raw_tenant)?,
                        product_id: row.try_get("ci_product_id")?,
                        quantity: row.try_get("ci_quantity")?,
                        created_at: row.try_get("ci_created_at")?,
                        updated_at: row.try_get("ci_updated_at")?,
                    },
                    product: row_product(row)?,
                })
            })
            .collect()
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
        let product = self
            .product_by_id(product_id)
            .await?
            .ok_or(Error::NotFound("product"))?;
        if !product.is_active {
            return Err(Error::Validation("product is not available".into()));
        }
        let row = sqlx::query(
            "INSERT INTO cart_items (user_id, tenant, product_id, quantity)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (user_id, tenant, product_id)
             DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity,
                           updated_at = now()
             RETURNING *",
        )
        .bind(user_id)
        .bind(tenant.as_str())
        .bind(product_id)
        .bind(quantity)
        .fetch_one(&self.pool)
        .await?;
        let raw_tenant: String = row.try_get("tenant")?;
        Ok(CartItem {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            tenant: parse_tenant(&raw_tenant)?,
            product_id: row.try_get("product_id")?,
            quantity: row.try_get("quantity")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    async fn remove_from_cart(&self, user_id: i64, tenant: Tenant, product_id: i64) -> Result<()> {
        let result = sqlx::query(
            "DELETE FROM cart_items WHERE user_id = $1 AND tenant = $2 AND product_id = $3",
        )
        .bind(user_id)
        .bind(tenant.as_str())
        .bind(product_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound("cart item"));
        }
        Ok(())
    }

    async fn clear_cart(&self, user_id: i64, tenant: Tenant) -> Result<()> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND tenant = $2")
            .bind(user_id)
            .bind(tenant.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn checkout(&self, req: CheckoutRequest) -> Result<OrderDetail> {
        let mut tx = self.pool.begin().await?;

        // Wallet headroom is derived from completed orders inside this
        // transaction, so the check and the insert cannot interleave with a
        // concurrent checkout committing in between.
        let spent: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(final_amount), 0) FROM orders
             WHERE user_id = $1 AND tenant = $2 AND status = 'completed'",
        )
        .bind(req.user_id)
        .bind(req.tenant.as_str())
        .fetch_one(&mut *tx)
        .await?;
        let available = req.wallet.available(spent);
        if req.totals.final_amount > available {
            return Err(Error::InsufficientFunds {
                required: req.totals.final_amount,
                available,
            });
        }

        let seq: i64 = sqlx::query_scalar("SELECT nextval('order_numbers')")
            .fetch_one(&mut *tx)
            .await?;
        let order_number = format!("ORD-{:06}", seq);

        let row = sqlx::query(
            "INSERT INTO orders
                (order_number, user_id, tenant, total_amount, tax_amount, final_amount)
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(&order_number)
        .bind(req.user_id)
        .bind(req.tenant.as_str())
        .bind(req.totals.total_amount)
        .bind(req.totals.tax_amount)
        .bind(req.totals.final_amount)
        .fetch_one(&mut *tx)
        .await?;
        let order = row_order(&row)?;

        let mut items = Vec::new();
        for line in &req.lines {
            // Row-locked allocation: concurrent checkouts skip each other's
            // locked keys instead of double-selling the last one.
            let key_rows = sqlx::query(
                "SELECT id, key_value FROM license_keys
                 WHERE product_id = $1 AND NOT is_used
                 ORDER BY id
                 LIMIT $2
                 FOR UPDATE SKIP LOCKED",
            )
            .bind(line.product_id)
            .bind(i64::from(line.quantity))
            .fetch_all(&mut *tx)
            .await?;
            if key_rows.len() < line.quantity as usize {
                return Err(Error::OutOfStock {
                    product_id: line.product_id,
                    requested: i64::from(line.quantity),
                    available: key_rows.len() as i64,
                });
            }

            for key_row in &key_rows {
                let key_id: i64 = key_row.try_get("id")?;
                let key_value: String = key_row.try_get("key_value")?;

                sqlx::query(
                    "UPDATE license_keys SET is_used = TRUE, used_by = $2, used_at = now()
                     WHERE id = $1",
                )
                .bind(key_id)
                .bind(req.user_id)
                .execute(&mut *tx)
                .await?;

                let item_row = sqlx::query(
                    "INSERT INTO order_items
                        (order_id, product_id, license_key_id, product_name, unit_price)
                     VALUES ($1, $2, $3, $4, $5) RETURNING id",
                )
                .bind(order.id)
                .bind(line.product_id)
                .bind(key_id)
                .bind(&line.product_name)
                .bind(line.unit_price)
                .fetch_one(&mut *tx)
                .await?;

                items.push(OrderItem {
                    id: item_row.try_get("id")?,
                    order_id: order.id,
                    product_id: line.product_id,
                    license_key_id: key_id,
                    product_name: line.product_name.clone(),
                    unit_price: line.unit_price,
                    key_value,
                });
            }
        }

        sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND tenant = $2")
            .bind(req.user_id)
            .bind(req.tenant.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!(
            "order {} completed: {} items, total {}",
            order.order_number,
            items.len(),
            order.final_amount
        );
        Ok(OrderDetail { order, items })
    }

    async fn orders_for_user(&self, user_id: i64, tenant: Tenant) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            "SELECT * FROM orders WHERE user_id = $1 AND tenant = $2 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .bind(tenant.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_order).collect()
    }

    async fn order_detail(&self, id: i64, user_scope: Option<i64>) -> Result<Option<OrderDetail>> {
        let row = sqlx::query("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        let order = match row {
            Some(row) => row_order(&row)?,
            None => return Ok(None),
        };
        if let Some(uid) = user_scope {
            if order.user_id != uid {
                return Ok(None);
            }
        }
        let rows = sqlx::query(
            "SELECT oi.*, k.key_value FROM order_items oi
             JOIN license_keys k ON k.id = oi.license_key_id
             WHERE oi.order_id = $1 ORDER BY oi.id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        let items = rows.iter().map(row_order_item).collect::<Result<Vec<_>>>()?;
        Ok(Some(OrderDetail { order, items }))
    }

    async fn completed_spend(&self, user_id: i64, tenant: Tenant) -> Result<Decimal> {
        let spent: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(final_amount), 0) FROM orders
             WHERE user_id = $1 AND tenant = $2 AND status = 'completed'",
        )
        .bind(user_id)
        .bind(tenant.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(spent)
    }

    async fn create_ticket(&self, new: NewTicket) -> Result<SupportTicket> {
        let row = sqlx::query(
            "INSERT INTO support_tickets (user_id, tenant, subject, body)
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(new.user_id)
        .bind(new.tenant.as_str())
        .bind(&new.subject)
        .bind(&new.body)
        .fetch_one(&self.pool)
        .await?;
        row_ticket(&row)
    }

    async fn tickets_for_user(&self, user_id: i64, tenant: Tenant) -> Result<Vec<SupportTicket>> {
        let rows = sqlx::query(
            "SELECT * FROM support_tickets
             WHERE user_id = $1 AND tenant = $2 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .bind(tenant.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_ticket).collect()
    }

    async fn list_tickets(&self) -> Result<Vec<SupportTicket>> {
        let rows = sqlx::query("SELECT * FROM support_tickets ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_ticket).collect()
    }

    async fn update_ticket_status(&self, id: i64, status: TicketStatus) -> Result<SupportTicket> {
        let row = sqlx::query(
            "UPDATE support_tickets SET status = $2, updated_at = now()
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => row_ticket(&row),
            None => Err(Error::NotFound("ticket")),
        }
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn stats(&self) -> Result<StoreStats> {
        let row = sqlx::query(
            "SELECT
                (SELECT COUNT(*) FROM users) AS users,
                (SELECT COUNT(*) FROM products) AS products,
                (SELECT COUNT(*) FROM orders) AS orders,
                (SELECT COUNT(*) FROM support_tickets WHERE status <> 'closed') AS open_tickets",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(StoreStats {
            users: row.try_get("users")?,
            products: row.try_get("products")?,
            orders: row.try_get("orders")?,
            open_tickets: row.try_get("open_tickets")?,
        })
    }
}
