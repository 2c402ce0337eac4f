//! Order signature verification.
//!
//! The signer address of an order is its ed25519 verifying key. Verification
//! never errors: a malformed key, a malformed signature, a foreign chain id or
//! a wrong signature all resolve to `false`, so callers branch on a bool.

use bundlematch_types::{BundlematchError, Order, Result};
use ed25519_dalek::{Signature, VerifyingKey};

use crate::codec::{OrderCodec, SigningDomain};

/// Verifies maker signatures for one signing domain.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    domain: SigningDomain,
}

impl SignatureVerifier {
    #[must_use]
    pub fn new(domain: SigningDomain) -> Self {
        Self { domain }
    }

    #[must_use]
    pub fn domain(&self) -> &SigningDomain {
        &self.domain
    }

    /// Whether `order.signature` was produced by `order.signer` over the
    /// canonical digest of `order` in this domain.
    #[must_use]
    pub fn verify(&self, order: &Order) -> bool {
        if order.chain_id != self.domain.chain_id {
            tracing::debug!(
                order = %order.id,
                order_chain = order.chain_id,
                domain_chain = self.domain.chain_id,
                "Signature rejected: foreign chain id"
            );
            return false;
        }
        let Ok(key) = VerifyingKey::from_bytes(order.signer.as_bytes()) else {
            tracing::debug!(order = %order.id, "Signature rejected: malformed signer key");
            return false;
        };
        let Ok(signature) = Signature::from_slice(&order.signature) else {
            tracing::debug!(
                order = %order.id,
                len = order.signature.len(),
                "Signature rejected: malformed signature bytes"
            );
            return false;
        };
        let digest = OrderCodec::digest(&self.domain, order);
        key.verify_strict(&digest, &signature).is_ok()
    }

    /// [`verify`](Self::verify) as a typed result.
    pub fn check(&self, order: &Order) -> Result<()> {
        if self.verify(order) {
            Ok(())
        } else {
            Err(BundlematchError::InvalidSignature(order.id))
        }
    }
}
