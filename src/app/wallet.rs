//! Derived wallet.
//!
//! There is no wallet table and no ledger: the balance is recomputed on every
//! read from the orders table against fixed deployment constants, and the
//! "transaction history" is synthesized the same way.

use crate::domain::model::{Wallet, WalletLimits, WalletTransaction, WalletTransactionKind};
use crate::domain::tenant::Tenant;
use crate::error::Result;
use crate::storage::Storage;
use rust_decimal::Decimal;
use std::sync::Arc;

pub struct WalletService {
    storage: Arc<dyn Storage>,
    limits: WalletLimits,
}

impl WalletService {
    pub fn new(storage: Arc<dyn Storage>, limits: WalletLimits) -> Self {
        WalletService { storage, limits }
    }

    /// Current snapshot: `starting_balance - spent`, clamped at zero, plus
    /// the credit-limit headroom actually spendable at checkout.
    pub async fn wallet(&self, user_id: i64, tenant: Tenant) -> Result<Wallet> {
        let spent = self.storage.completed_spend(user_id, tenant).await?;
        let balance = (self.limits.starting_balance - spent).max(Decimal::ZERO);
        Ok(Wallet {
            tenant,
            currency: tenant.currency(),
            starting_balance: self.limits.starting_balance,
            spent,
            balance,
            credit_limit: self.limits.credit_limit,
            available: self.limits.available(spent),
        })
    }

    /// Synthesized history: the initial deposit followed by one debit per
    /// completed order, newest first.
    pub async fn transactions(
        &self,
        user_id: i64,
        tenant: Tenant,
    ) -> Result<Vec<WalletTransaction>> {
        let orders = self.storage.orders_for_user(user_id, tenant).await?;
        let mut out: Vec<WalletTransaction> = orders
            .iter()
            .map(|o| WalletTransaction {
                kind: WalletTransactionKind::Purchase,
                amount: -o.final_amount,
                description: format!("Order {}", o.order_number),
                order_number: Some(o.order_number.clone()),
                created_at: Some(o.created_at),
            })
            .collect();
        out.push(WalletTransaction {
            kind: WalletTransactionKind::Deposit,
            amount: self.limits.starting_balance,
            description: "Initial deposit".to_string(),
            order_number: None,
            created_at: None,
        });
        Ok(out)
    }
}
