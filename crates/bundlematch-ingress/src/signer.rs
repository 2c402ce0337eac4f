//! Maker-side order signing.

use bundlematch_types::{Address, Order};
use ed25519_dalek::{Signer, SigningKey};

use crate::codec::{OrderCodec, SigningDomain};

/// Signs orders with one maker key for one signing domain.
#[derive(Debug, Clone)]
pub struct OrderSigner {
    key: SigningKey,
    domain: SigningDomain,
}

impl OrderSigner {
    #[must_use]
    pub fn new(key: SigningKey, domain: SigningDomain) -> Self {
        Self { key, domain }
    }

    /// Deterministic signer from a 32-byte secret seed.
    #[must_use]
    pub fn from_seed(seed: [u8; 32], domain: SigningDomain) -> Self {
        Self::new(SigningKey::from_bytes(&seed), domain)
    }

    /// The maker address: the raw verifying key.
    #[must_use]
    pub fn address(&self) -> Address {
        Address::from_bytes(self.key.verifying_key().to_bytes())
    }

    /// Bind `order` to this maker and fill in its signature.
    ///
    /// Sets `signer`, `chain_id` and re-derives `id` before signing, so the
    /// caller only describes the trade.
    pub fn sign(&self, order: &mut Order) {
        order.signer = self.address();
        order.chain_id = self.domain.chain_id;
        order.refresh_id();
        let digest = OrderCodec::digest(&self.domain, order);
        order.signature = self.key.sign(&digest).to_bytes().to_vec();
    }

    /// Owned variant of [`sign`](Self::sign).
    #[must_use]
    pub fn signed(&self, mut order: Order) -> Order {
        self.sign(&mut order);
        order
    }
}
