//! Identifiers used throughout BundleMatch.
//!
//! Accounts, collections, currencies and complications are all addressed by a
//! 32-byte [`Address`]. For order signers the address is the raw ed25519
//! verifying key, so no separate key registry is needed.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A 32-byte account / contract identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Address(pub [u8; 32]);

impl Address {
    pub const ZERO: Self = Self([0u8; 32]);

    #[must_use]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// First four bytes in hex, for compact log fields.
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Address whose every byte is `byte`. Handy for fixed fixtures.
    #[must_use]
    pub fn repeat(byte: u8) -> Self {
        Self([byte; 32])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

// ---------------------------------------------------------------------------
// OrderId
// ---------------------------------------------------------------------------

/// Off-chain fingerprint of an order, derived from `(signer, nonce, chain_id)`.
///
/// Used for indexing and logging only. Settlement never trusts it: the
/// signature covers the id like every other field, but nothing re-derives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct OrderId(pub [u8; 32]);

impl OrderId {
    #[must_use]
    pub fn derive(signer: &Address, nonce: u64, chain_id: u64) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"bundlematch:order_id:v1:");
        hasher.update(signer.as_bytes());
        hasher.update(nonce.to_le_bytes());
        hasher.update(chain_id.to_le_bytes());
        Self(hasher.finalize().into())
    }

    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "order:{}", hex::encode(&self.0[..8]))
    }
}

// ---------------------------------------------------------------------------
// FillId
// ---------------------------------------------------------------------------

/// Identifier of one settled maker/taker pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct FillId(pub Uuid);

impl FillId {
    /// Deterministic `FillId` from the two order ids of the pair.
    ///
    /// The same maker/taker pair always maps to the same id, so an indexer
    /// replaying settlement logs produces identical records.
    #[must_use]
    pub fn deterministic(maker: &OrderId, taker: &OrderId) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"bundlematch:fill_id:v1:");
        hasher.update(maker.0);
        hasher.update(taker.0);
        let hash = hasher.finalize();
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&hash[..16]);
        Self(Uuid::from_bytes(bytes))
    }
}

impl fmt::Display for FillId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fill:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
