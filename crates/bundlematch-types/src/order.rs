//! Order model for BundleMatch.
//!
//! An [`Order`] is signed once by its maker and never mutated afterwards.
//! Whether it has been executed or cancelled is tracked by the nonce ledger,
//! not by the order itself.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Address, OrderId};

/// Currency amount in integral base units (e.g. wei). The fractional part is
/// always zero; `Decimal` keeps arithmetic checked and serialization exact.
pub type Amount = Decimal;

/// Direction of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// One token of a collection and how many units of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct TokenInfo {
    pub token_id: u64,
    pub num_tokens: u64,
}

impl TokenInfo {
    #[must_use]
    pub fn new(token_id: u64, num_tokens: u64) -> Self {
        Self {
            token_id,
            num_tokens,
        }
    }
}

/// A bundle entry: a collection and the tokens taken from it.
///
/// Empty `tokens` on a maker order means "any tokens of this collection".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderItem {
    pub collection: Address,
    pub tokens: Vec<TokenInfo>,
}

impl OrderItem {
    #[must_use]
    pub fn new(collection: Address, tokens: Vec<TokenInfo>) -> Self {
        Self { collection, tokens }
    }

    /// Wildcard entry: any token of `collection`.
    #[must_use]
    pub fn any_of(collection: Address) -> Self {
        Self {
            collection,
            tokens: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Sum of `num_tokens` over the listed tokens, saturating.
    #[must_use]
    pub fn unit_count(&self) -> u64 {
        self.tokens
            .iter()
            .fold(0u64, |acc, t| acc.saturating_add(t.num_tokens))
    }
}

/// The interpretation strategy and settlement currency an order is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecParams {
    pub complication: Address,
    pub currency: Address,
}

/// A maker's signed intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub chain_id: u64,
    pub side: OrderSide,
    pub signer: Address,
    /// Total asset units the order covers across all matched tokens.
    pub num_items: u64,
    pub start_price: Amount,
    pub end_price: Amount,
    /// Seconds since UNIX epoch.
    pub start_time: i64,
    pub end_time: i64,
    /// Floor (basis points) on the share of the price the seller nets after fees.
    pub min_bps_to_seller: u32,
    pub nonce: u64,
    pub nfts: Vec<OrderItem>,
    pub exec_params: ExecParams,
    /// Reserved for future complications; signed but not interpreted.
    pub extra_params: Vec<u8>,
    /// Ed25519 signature over the canonical order digest.
    pub signature: Vec<u8>,
}

impl Order {
    #[must_use]
    pub fn is_sell_order(&self) -> bool {
        self.side == OrderSide::Sell
    }

    /// Recompute `id` from `(signer, nonce, chain_id)`.
    pub fn refresh_id(&mut self) {
        self.id = OrderId::derive(&self.signer, self.nonce, self.chain_id);
    }

    /// Whether `at` lies inside `[start_time, end_time]`.
    #[must_use]
    pub fn is_live_at(&self, at: i64) -> bool {
        at >= self.start_time && at <= self.end_time
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Order {
    /// Unsigned fixed-price order for one token of a fixed collection,
    /// valid for ten minutes from `now`. The nonce is random.
    pub fn dummy(side: OrderSide, signer: Address, price: Amount, now: i64) -> Self {
        let nonce = u64::from(rand::random::<u32>());
        let chain_id = 1;
        Self {
            id: OrderId::derive(&signer, nonce, chain_id),
            chain_id,
            side,
            signer,
            num_items: 1,
            start_price: price,
            end_price: price,
            start_time: now,
            end_time: now + 600,
            min_bps_to_seller: 9000,
            nonce,
            nfts: vec![OrderItem::new(
                Address::repeat(0xc1),
                vec![TokenInfo::new(0, 1)],
            )],
            exec_params: ExecParams {
                complication: Address::repeat(0xcc),
                currency: Address::repeat(0xee),
            },
            extra_params: Vec::new(),
            signature: Vec::new(),
        }
    }

    /// Same as [`Order::dummy`] with an explicit nonce and bundle.
    pub fn dummy_with(
        side: OrderSide,
        signer: Address,
        nonce: u64,
        nfts: Vec<OrderItem>,
        num_items: u64,
        price: Amount,
        now: i64,
    ) -> Self {
        let mut order = Self::dummy(side, signer, price, now);
        order.nonce = nonce;
        order.nfts = nfts;
        order.num_items = num_items;
        order.refresh_id();
        order
    }
}
