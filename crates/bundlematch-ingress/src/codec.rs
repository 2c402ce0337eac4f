//! Canonical order encoding.
//!
//! Every field except the signature is written in a fixed order with
//! fixed-width little-endian integers and length prefixes for every
//! variable-size part, so no two distinct orders share an encoding.
//! The encoding is prefixed by a version tag and the [`SigningDomain`]:
//! a signature made for one exchange deployment or chain never verifies
//! against another.
//!
//! ```text
//! tag || domain.chain_id || domain.exchange || id || chain_id || side || signer
//!     || num_items || start_price || end_price || start_time || end_time
//!     || min_bps_to_seller || nonce || len(nfts) || { collection || len(tokens)
//!     || { token_id || num_tokens }* }* || complication || currency
//!     || len(extra_params) || extra_params
//! ```

use bundlematch_types::{Address, ExchangeConfig, Order, OrderSide, constants};
use sha2::{Digest, Sha256};

/// The deployment an order signature is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigningDomain {
    pub chain_id: u64,
    pub exchange: Address,
}

impl SigningDomain {
    #[must_use]
    pub fn new(chain_id: u64, exchange: Address) -> Self {
        Self { chain_id, exchange }
    }

    #[must_use]
    pub fn from_config(config: &ExchangeConfig) -> Self {
        Self::new(config.chain_id, config.exchange)
    }
}

/// Stateless canonical encoder.
pub struct OrderCodec;

impl OrderCodec {
    /// Canonical byte encoding of `order` under `domain`, signature excluded.
    #[must_use]
    pub fn encode(domain: &SigningDomain, order: &Order) -> Vec<u8> {
        let mut out = Vec::with_capacity(512);
        out.extend_from_slice(constants::ORDER_ENCODING_TAG);
        out.extend_from_slice(&domain.chain_id.to_le_bytes());
        out.extend_from_slice(domain.exchange.as_bytes());

        out.extend_from_slice(&order.id.0);
        out.extend_from_slice(&order.chain_id.to_le_bytes());
        out.push(match order.side {
            OrderSide::Buy => 0,
            OrderSide::Sell => 1,
        });
        out.extend_from_slice(order.signer.as_bytes());
        out.extend_from_slice(&order.num_items.to_le_bytes());
        out.extend_from_slice(&order.start_price.serialize());
        out.extend_from_slice(&order.end_price.serialize());
        out.extend_from_slice(&order.start_time.to_le_bytes());
        out.extend_from_slice(&order.end_time.to_le_bytes());
        out.extend_from_slice(&order.min_bps_to_seller.to_le_bytes());
        out.extend_from_slice(&order.nonce.to_le_bytes());

        out.extend_from_slice(&(order.nfts.len() as u64).to_le_bytes());
        for item in &order.nfts {
            out.extend_from_slice(item.collection.as_bytes());
            out.extend_from_slice(&(item.tokens.len() as u64).to_le_bytes());
            for token in &item.tokens {
                out.extend_from_slice(&token.token_id.to_le_bytes());
                out.extend_from_slice(&token.num_tokens.to_le_bytes());
            }
        }

        out.extend_from_slice(order.exec_params.complication.as_bytes());
        out.extend_from_slice(order.exec_params.currency.as_bytes());
        out.extend_from_slice(&(order.extra_params.len() as u64).to_le_bytes());
        out.extend_from_slice(&order.extra_params);
        out
    }

    /// SHA-256 of the canonical encoding. This is what makers sign.
    #[must_use]
    pub fn digest(domain: &SigningDomain, order: &Order) -> [u8; 32] {
        Sha256::digest(Self::encode(domain, order)).into()
    }
}
