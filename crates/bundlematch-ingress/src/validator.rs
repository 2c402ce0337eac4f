//! Order validator: structural gate before pricing and matching.
//!
//! The validator checks everything that can be decided from the order alone.
//! It never looks at time, balances, or nonce state.
//!
//! ## Design Principles
//!
//! - **Fail-closed**: the first failing check rejects the order
//! - **No bypass**: settlement runs every order through the validator
//! - **Pure**: no state, same input → same verdict

use std::collections::HashSet;

use bundlematch_types::{BundlematchError, Order, Result, constants};

/// Structural order checks with configurable size limits.
#[derive(Debug, Clone)]
pub struct OrderValidator {
    /// Maximum bundle entries per order.
    max_items_per_order: usize,
    /// Maximum size of `extra_params`.
    max_extra_params_bytes: usize,
}

impl OrderValidator {
    /// Create a validator with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_items_per_order: constants::MAX_ITEMS_PER_ORDER,
            max_extra_params_bytes: constants::MAX_EXTRA_PARAMS_BYTES,
        }
    }

    /// Create a validator with custom limits.
    #[must_use]
    pub fn with_limits(max_items_per_order: usize, max_extra_params_bytes: usize) -> Self {
        Self {
            max_items_per_order,
            max_extra_params_bytes,
        }
    }

    /// Validate an order's shape.
    ///
    /// # Errors
    /// Returns [`BundlematchError::InvalidOrder`] naming the first failed check.
    pub fn validate(&self, order: &Order) -> Result<()> {
        // 1. Time window
        if order.start_time >= order.end_time {
            return Err(invalid(format!(
                "start_time {} must be before end_time {}",
                order.start_time, order.end_time
            )));
        }

        // 2. Basis points
        if order.min_bps_to_seller > constants::BPS_DENOMINATOR {
            return Err(invalid(format!(
                "min_bps_to_seller {} exceeds {}",
                order.min_bps_to_seller,
                constants::BPS_DENOMINATOR
            )));
        }

        // 3. Quantity
        if order.num_items == 0 {
            return Err(invalid("num_items must be positive".to_string()));
        }

        // 4. Prices are whole, non-negative base units
        for (name, price) in [("start_price", order.start_price), ("end_price", order.end_price)] {
            if price.is_sign_negative() && !price.is_zero() {
                return Err(invalid(format!("{name} must not be negative")));
            }
            if !price.fract().is_zero() {
                return Err(invalid(format!("{name} {price} is not a whole base unit")));
            }
        }

        // 5. Size limits
        if order.nfts.len() > self.max_items_per_order {
            return Err(invalid(format!(
                "{} bundle entries exceed maximum {}",
                order.nfts.len(),
                self.max_items_per_order
            )));
        }
        if order.extra_params.len() > self.max_extra_params_bytes {
            return Err(invalid(format!(
                "extra_params of {} bytes exceed maximum {}",
                order.extra_params.len(),
                self.max_extra_params_bytes
            )));
        }

        // 6. Token entries
        for item in &order.nfts {
            let mut seen = HashSet::with_capacity(item.tokens.len());
            for token in &item.tokens {
                if token.num_tokens == 0 {
                    return Err(invalid(format!(
                        "token {} in {} has zero num_tokens",
                        token.token_id, item.collection
                    )));
                }
                if !seen.insert(token.token_id) {
                    return Err(invalid(format!(
                        "token {} listed twice in {}",
                        token.token_id, item.collection
                    )));
                }
            }
        }

        Ok(())
    }
}

impl Default for OrderValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid(reason: String) -> BundlematchError {
    BundlematchError::InvalidOrder { reason }
}

#[cfg(test)]
mod tests {
    use bundlematch_types::{Address, OrderItem, OrderSide, TokenInfo};
    use rust_decimal::Decimal;

    use super::*;

    fn order() -> Order {
        Order::dummy(OrderSide::Sell, Address::repeat(1), Decimal::new(100, 0), 1_000)
    }

    fn assert_invalid(order: &Order, needle: &str) {
        let err = OrderValidator::new().validate(order).unwrap_err();
        match err {
            BundlematchError::InvalidOrder { reason } => {
                assert!(reason.contains(needle), "reason {reason:?} lacks {needle:?}");
            }
            other => panic!("expected InvalidOrder, got {other:?}"),
        }
    }

    #[test]
    fn well_formed_order_passes() {
        assert!(OrderValidator::new().validate(&order()).is_ok());
    }

    #[test]
    fn rejects_empty_or_inverted_window() {
        let mut o = order();
        o.end_time = o.start_time;
        assert_invalid(&o, "start_time");
        o.end_time = o.start_time - 1;
        assert_invalid(&o, "start_time");
    }

    #[test]
    fn rejects_bps_above_denominator() {
        let mut o = order();
        o.min_bps_to_seller = 10_001;
        assert_invalid(&o, "min_bps_to_seller");
        o.min_bps_to_seller = 10_000;
        assert!(OrderValidator::new().validate(&o).is_ok());
    }

    #[test]
    fn rejects_zero_items() {
        let mut o = order();
        o.num_items = 0;
        assert_invalid(&o, "num_items");
    }

    #[test]
    fn rejects_negative_or_fractional_price() {
        let mut o = order();
        o.end_price = Decimal::new(-1, 0);
        assert_invalid(&o, "end_price");

        let mut o = order();
        o.start_price = Decimal::new(15, 1);
        assert_invalid(&o, "whole base unit");
    }

    #[test]
    fn zero_price_is_allowed() {
        let mut o = order();
        o.end_price = Decimal::ZERO;
        assert!(OrderValidator::new().validate(&o).is_ok());
    }

    #[test]
    fn rejects_zero_quantity_token() {
        let mut o = order();
        o.nfts = vec![OrderItem::new(Address::repeat(2), vec![TokenInfo::new(1, 0)])];
        assert_invalid(&o, "zero num_tokens");
    }

    #[test]
    fn rejects_duplicate_token_ids() {
        let mut o = order();
        o.nfts = vec![OrderItem::new(
            Address::repeat(2),
            vec![TokenInfo::new(1, 1), TokenInfo::new(1, 1)],
        )];
        assert_invalid(&o, "listed twice");
    }

    #[test]
    fn custom_limits_apply() {
        let validator = OrderValidator::with_limits(1, 2);
        let mut o = order();
        o.extra_params = vec![0; 3];
        assert!(validator.validate(&o).is_err());

        let mut o = order();
        o.nfts.push(OrderItem::any_of(Address::repeat(3)));
        assert!(validator.validate(&o).is_err());
    }
}
