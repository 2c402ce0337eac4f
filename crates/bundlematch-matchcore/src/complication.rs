//! Complications: pluggable rules deciding whether two orders may execute.
//!
//! Every order names its complication in `exec_params`. The settlement
//! engine looks the strategy up in a registry and asks it for an
//! [`Execution`]. The engine only ever sees the trait, so new order
//! types plug in without touching settlement.

use bundlematch_types::{
    Amount, BundlematchError, ExchangeConfig, Order, OrderSide, ResolvedBundle, Result,
};
use rust_decimal::Decimal;

use crate::bundle::BundleMatcher;
use crate::pricing;

/// What a complication agreed to settle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    /// Execution price: the maker's curve price at settlement time.
    pub price: Amount,
    pub bundle: ResolvedBundle,
}

/// An order-matching strategy.
pub trait Complication: Send + Sync {
    /// Short human-readable name, used in logs.
    fn name(&self) -> &'static str;

    /// Decide whether `maker` and `taker` can execute against each other at
    /// `now` and, if so, at what price and for which bundle.
    ///
    /// # Errors
    /// Any rejection reason as a [`BundlematchError`].
    fn can_execute(&self, maker: &Order, taker: &Order, now: i64) -> Result<Execution>;
}

/// Plain order book complication.
///
/// Executes at the maker's current price. The taker's own curve must agree
/// with the maker's within `price_error_bound` base units, so a taker that
/// signed a fixed price can still fill a slowly decaying maker.
#[derive(Debug, Clone)]
pub struct OrderBookComplication {
    price_error_bound: Amount,
}

impl OrderBookComplication {
    #[must_use]
    pub fn new(price_error_bound: u64) -> Self {
        Self {
            price_error_bound: Decimal::from(price_error_bound),
        }
    }

    #[must_use]
    pub fn from_config(config: &ExchangeConfig) -> Self {
        Self::new(config.price_error_bound)
    }

    #[must_use]
    pub fn price_error_bound(&self) -> Amount {
        self.price_error_bound
    }

    fn prices_agree(&self, taker: &Order, maker_price: Amount, taker_price: Amount) -> bool {
        match taker.side {
            // Buyer must be willing to pay (almost) the maker's ask.
            OrderSide::Buy => taker_price.saturating_add(self.price_error_bound) >= maker_price,
            // Seller must not ask (much) more than the maker's bid.
            OrderSide::Sell => taker_price <= maker_price.saturating_add(self.price_error_bound),
        }
    }
}

impl Default for OrderBookComplication {
    fn default() -> Self {
        Self::new(bundlematch_types::constants::DEFAULT_PRICE_ERROR_BOUND)
    }
}

impl Complication for OrderBookComplication {
    fn name(&self) -> &'static str {
        "order-book"
    }

    fn can_execute(&self, maker: &Order, taker: &Order, now: i64) -> Result<Execution> {
        if maker.side == taker.side {
            return Err(BundlematchError::InvalidOrder {
                reason: format!("maker and taker are both {} orders", maker.side),
            });
        }

        let maker_price = pricing::current_price(maker, now)?;
        let taker_price = pricing::current_price(taker, now)?;

        if taker.num_items != maker.num_items {
            return Err(BundlematchError::QuantityMismatch {
                expected: maker.num_items,
                actual: taker.num_items,
            });
        }

        if !self.prices_agree(taker, maker_price, taker_price) {
            tracing::debug!(
                maker = %maker.id,
                taker = %taker.id,
                %maker_price,
                %taker_price,
                bound = %self.price_error_bound,
                "Prices disagree"
            );
            return Err(BundlematchError::PriceMismatch {
                maker_price,
                taker_price,
            });
        }

        let bundle = BundleMatcher::reconcile(maker, &taker.nfts)?;
        Ok(Execution {
            price: maker_price,
            bundle,
        })
    }
}
