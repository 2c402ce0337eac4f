//! Settlement results.
//!
//! A [`MatchResult`] is the record of one settled maker/taker pair. It is
//! returned to the caller and logged, never stored by the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Address, Amount, BundlematchError, FillId, OrderId, OrderItem, OrderSide};

/// The bundle a settlement moves, as resolved from the taker's concrete list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedBundle {
    pub items: Vec<OrderItem>,
    /// Sum of `num_tokens` over `items`.
    pub total_units: u64,
}

/// One settled pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub id: FillId,
    pub maker_order_id: OrderId,
    pub taker_order_id: OrderId,
    /// Which side the maker was on.
    pub maker_side: OrderSide,
    pub buyer: Address,
    pub seller: Address,
    pub currency: Address,
    pub bundle: ResolvedBundle,
    /// Resolved execution price (maker curve at settlement time).
    pub price: Amount,
    /// Curator fee sent to the treasury.
    pub fee: Amount,
    /// `price - fee`, credited to the seller.
    pub seller_proceeds: Amount,
    pub treasury: Address,
    pub executed_at: DateTime<Utc>,
}

impl MatchResult {
    #[must_use]
    pub fn maker(&self) -> Address {
        match self.maker_side {
            OrderSide::Sell => self.seller,
            OrderSide::Buy => self.buyer,
        }
    }

    #[must_use]
    pub fn taker(&self) -> Address {
        match self.maker_side {
            OrderSide::Sell => self.buyer,
            OrderSide::Buy => self.seller,
        }
    }
}

impl std::fmt::Display for MatchResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Fill[{}] maker {} {} units @ {} (fee {})",
            self.id, self.maker_side, self.bundle.total_units, self.price, self.fee,
        )
    }
}

/// A pair dropped from a lenient batch.
#[derive(Debug)]
pub struct SkippedPair {
    /// Position of the pair in the submitted sequences.
    pub index: usize,
    pub error: BundlematchError,
}

/// Outcome of a `take_orders` call.
#[derive(Debug, Default)]
pub struct TakeOutcome {
    pub fills: Vec<MatchResult>,
    pub skipped: Vec<SkippedPair>,
}

impl TakeOutcome {
    #[must_use]
    pub fn all_settled(&self) -> bool {
        self.skipped.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::TokenInfo;

    fn make_fill(maker_side: OrderSide) -> MatchResult {
        let maker = OrderId::derive(&Address::repeat(1), 1, 1);
        let taker = OrderId::derive(&Address::repeat(2), 1, 1);
        MatchResult {
            id: FillId::deterministic(&maker, &taker),
            maker_order_id: maker,
            taker_order_id: taker,
            maker_side,
            buyer: Address::repeat(2),
            seller: Address::repeat(1),
            currency: Address::repeat(0xee),
            bundle: ResolvedBundle {
                items: vec![OrderItem::new(Address::repeat(0xc1), vec![TokenInfo::new(0, 1)])],
                total_units: 1,
            },
            price: Decimal::new(10_000, 0),
            fee: Decimal::new(150, 0),
            seller_proceeds: Decimal::new(9_850, 0),
            treasury: Address::repeat(0xfe),
            executed_at: Utc::now(),
        }
    }

    #[test]
    fn maker_and_taker_follow_side() {
        let fill = make_fill(OrderSide::Sell);
        assert_eq!(fill.maker(), Address::repeat(1));
        assert_eq!(fill.taker(), Address::repeat(2));

        let fill = make_fill(OrderSide::Buy);
        assert_eq!(fill.maker(), Address::repeat(2));
        assert_eq!(fill.taker(), Address::repeat(1));
    }

    #[test]
    fn display_mentions_price_and_fee() {
        let s = format!("{}", make_fill(OrderSide::Sell));
        assert!(s.contains("10000"));
        assert!(s.contains("150"));
    }

    #[test]
    fn empty_outcome_is_fully_settled() {
        assert!(TakeOutcome::default().all_settled());
    }
}
