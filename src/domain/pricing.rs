//! Order pricing: line totals and VAT.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

/// A cart line priced in the tenant currency, ready for checkout.
#[derive(Debug, Clone, Serialize)]
pub struct PricedLine {
    pub product_id: i64,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

impl PricedLine {
    pub fn line_total(&self) -> Decimal {
        round_money(self.unit_price * Decimal::from(self.quantity))
    }
}

/// Monetary totals of one order.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct OrderTotals {
    pub total_amount: Decimal,
    pub tax_amount: Decimal,
    pub final_amount: Decimal,
}

/// Rounds to 2 decimal places, half away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Computes subtotal, VAT and grand total over the priced lines.
///
/// VAT is applied to the order subtotal, not per line, so a 21% rate on
/// 2 x 10.00 yields exactly 20.00 / 4.20 / 24.20.
pub fn order_totals(lines: &[PricedLine], vat_rate: Decimal) -> OrderTotals {
    let subtotal: Decimal = lines.iter().map(PricedLine::line_total).sum();
    let subtotal = round_money(subtotal);
    let tax = round_money(subtotal * vat_rate);
    OrderTotals {
        total_amount: subtotal,
        tax_amount: tax,
        final_amount: subtotal + tax,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn line(id: i64, price: &str, qty: i32) -> PricedLine {
        PricedLine {
            product_id: id,
            product_name: format!("product-{}", id),
            unit_price: dec(price),
            quantity: qty,
        }
    }

    #[test]
    fn two_units_at_ten_with_21_percent_vat() {
        let totals = order_totals(&[line(1, "10.00", 2)], dec("0.21"));
        assert_eq!(totals.total_amount, dec("20.00"));
        assert_eq!(totals.tax_amount, dec("4.20"));
        assert_eq!(totals.final_amount, dec("24.20"));
    }

    #[test]
    fn mixed_lines_sum_before_vat() {
        let totals = order_totals(
            &[line(1, "10.00", 2), line(2, "4.99", 3)],
            dec("0.21"),
        );
        assert_eq!(totals.total_amount, dec("34.97"));
        assert_eq!(totals.tax_amount, dec("7.34")); // 7.3437 rounds down
        assert_eq!(totals.final_amount, dec("42.31"));
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(round_money(dec("1.005")), dec("1.01"));
        assert_eq!(round_money(dec("1.004")), dec("1.00"));
    }

    #[test]
    fn empty_order_is_zero() {
        let totals = order_totals(&[], dec("0.21"));
        assert_eq!(totals.final_amount, Decimal::ZERO);
    }
}
