//! Checkout orchestration.
//!
//! Prices the cart in the tenant currency and hands the storage backend one
//! atomic [`CheckoutRequest`]; key allocation and the wallet check happen
//! inside the backend's transaction so a failure leaves nothing behind.

use crate::domain::model::{OrderDetail, WalletLimits};
use crate::domain::pricing::{order_totals, PricedLine};
use crate::domain::tenant::Tenant;
use crate::error::{Error, Result};
use crate::storage::{CheckoutRequest, Storage};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;

pub struct OrderService {
    storage: Arc<dyn Storage>,
    vat_rate: Decimal,
    wallet: WalletLimits,
}

impl OrderService {
    pub fn new(storage: Arc<dyn Storage>, vat_rate: Decimal, wallet: WalletLimits) -> Self {
        OrderService {
            storage,
            vat_rate,
            wallet,
        }
    }

    /// Turns the user's cart into a completed, fully fulfilled order.
    pub async fn checkout(&self, user_id: i64, tenant: Tenant) -> Result<OrderDetail> {
        let cart = self.storage.cart(user_id, tenant).await?;
        if cart.is_empty() {
            return Err(Error::EmptyCart);
        }

        let mut lines = Vec::with_capacity(cart.len());
        for line in &cart {
            if !line.product.is_active {
                return Err(Error::Validation(format!(
                    "product '{}' is no longer available",
                    line.product.name
                )));
            }
            lines.push(PricedLine {
                product_id: line.product.id,
                product_name: line.product.name.clone(),
                unit_price: line.product.price_for(tenant),
                quantity: line.item.quantity,
            });
        }

        let totals = order_totals(&lines, self.vat_rate);
        let detail = self
            .storage
            .checkout(CheckoutRequest {
                user_id,
                tenant,
                lines,
                totals,
                wallet: self.wallet,
            })
            .await?;
        info!(
            "user {} checked out order {} on {} ({} {})",
            user_id,
            detail.order.order_number,
            tenant,
            detail.order.final_amount,
            tenant.currency()
        );
        Ok(detail)
    }
}
