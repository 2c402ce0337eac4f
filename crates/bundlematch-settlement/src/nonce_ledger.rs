//! Per-signer nonce ledger: prevents replay of executed or cancelled orders.
//!
//! Every order is identified by `(signer, nonce)`. A nonce is usable iff it is
//! at or above the signer's watermark (`min_order_nonce`) and has never been
//! executed or cancelled. Both sets only grow: once a nonce is unusable it
//! stays unusable.
//!
//! ```text
//! usable(s, n) ⇔ n >= min_order_nonce(s) ∧ n ∉ consumed(s)
//! ```

use std::collections::{HashMap, HashSet};

use bundlematch_types::{Address, BundlematchError, ExchangeConfig, Result, constants};

/// Nonce bookkeeping for a single signer.
#[derive(Debug, Default, Clone)]
struct SignerNonces {
    /// Every nonce below this is permanently invalid.
    min_order_nonce: u64,
    /// Nonces at or above the watermark that were executed or cancelled.
    consumed: HashSet<u64>,
}

/// Keyed store of per-signer nonce state, owned by the settlement engine.
#[derive(Debug, Clone)]
pub struct NonceLedger {
    signers: HashMap<Address, SignerNonces>,
    /// Largest watermark jump a single `cancel_all_orders` may make.
    max_cancel_delta: u64,
}

impl NonceLedger {
    #[must_use]
    pub fn new(max_cancel_delta: u64) -> Self {
        Self {
            signers: HashMap::new(),
            max_cancel_delta,
        }
    }

    #[must_use]
    pub fn from_config(config: &ExchangeConfig) -> Self {
        Self::new(config.max_nonce_cancel_delta)
    }

    /// Current watermark of `signer` (zero if never seen).
    #[must_use]
    pub fn user_min_order_nonce(&self, signer: &Address) -> u64 {
        self.signers.get(signer).map_or(0, |s| s.min_order_nonce)
    }

    #[must_use]
    pub fn is_nonce_valid(&self, signer: &Address, nonce: u64) -> bool {
        self.check_nonce(signer, nonce).is_ok()
    }

    /// Typed variant of [`is_nonce_valid`](Self::is_nonce_valid).
    ///
    /// # Errors
    /// - [`BundlematchError::NonceTooLow`] below the watermark
    /// - [`BundlematchError::NonceAlreadyUsed`] if executed or cancelled
    pub fn check_nonce(&self, signer: &Address, nonce: u64) -> Result<()> {
        let Some(record) = self.signers.get(signer) else {
            return Ok(());
        };
        if nonce < record.min_order_nonce {
            return Err(BundlematchError::NonceTooLow {
                nonce,
                min_nonce: record.min_order_nonce,
            });
        }
        if record.consumed.contains(&nonce) {
            return Err(BundlematchError::NonceAlreadyUsed(nonce));
        }
        Ok(())
    }

    /// Cancel specific nonces for `signer`.
    ///
    /// All-or-nothing: every nonce is checked before any is recorded, so a
    /// rejected call leaves the ledger untouched.
    ///
    /// # Errors
    /// - [`BundlematchError::InvalidOrder`] for an empty list
    /// - [`BundlematchError::NonceTooLow`] / [`BundlematchError::NonceAlreadyUsed`]
    ///   for the first unusable nonce (a nonce repeated in `nonces` counts as used)
    pub fn cancel_multiple_orders(&mut self, signer: &Address, nonces: &[u64]) -> Result<()> {
        if nonces.is_empty() {
            return Err(BundlematchError::InvalidOrder {
                reason: "cancel list must not be empty".to_string(),
            });
        }

        let mut batch = HashSet::with_capacity(nonces.len());
        for &nonce in nonces {
            let checked = self.check_nonce(signer, nonce).and_then(|()| {
                if batch.insert(nonce) {
                    Ok(())
                } else {
                    Err(BundlematchError::NonceAlreadyUsed(nonce))
                }
            });
            if let Err(err) = checked {
                tracing::warn!(signer = %signer, nonce, error = %err, "Cancellation rejected");
                return Err(err);
            }
        }

        let record = self.signers.entry(*signer).or_default();
        record.consumed.extend(batch);
        tracing::info!(signer = %signer, count = nonces.len(), "Orders cancelled");
        Ok(())
    }

    /// Raise `signer`'s watermark to `new_min_nonce`, invalidating every
    /// lower nonce.
    ///
    /// # Errors
    /// - [`BundlematchError::NonceTooLow`] unless `new_min_nonce` is strictly
    ///   above the current watermark
    /// - [`BundlematchError::TooManyNoncesCancelled`] if the jump exceeds the
    ///   configured maximum
    pub fn cancel_all_orders(&mut self, signer: &Address, new_min_nonce: u64) -> Result<()> {
        let current = self.user_min_order_nonce(signer);
        if new_min_nonce <= current {
            let err = BundlematchError::NonceTooLow {
                nonce: new_min_nonce,
                min_nonce: current,
            };
            tracing::warn!(signer = %signer, new_min_nonce, current, "Watermark regression rejected");
            return Err(err);
        }
        let requested = new_min_nonce - current;
        if requested > self.max_cancel_delta {
            tracing::warn!(
                signer = %signer,
                new_min_nonce,
                current,
                max = self.max_cancel_delta,
                "Watermark jump rejected"
            );
            return Err(BundlematchError::TooManyNoncesCancelled {
                requested,
                max: self.max_cancel_delta,
            });
        }

        let record = self.signers.entry(*signer).or_default();
        record.min_order_nonce = new_min_nonce;
        // Entries below the watermark are subsumed by it.
        record.consumed.retain(|&n| n >= new_min_nonce);
        tracing::info!(signer = %signer, new_min_nonce, "All orders below watermark cancelled");
        Ok(())
    }

    /// Consume `nonce` on execution.
    ///
    /// # Errors
    /// Same as [`check_nonce`](Self::check_nonce).
    pub fn mark_executed(&mut self, signer: &Address, nonce: u64) -> Result<()> {
        self.check_nonce(signer, nonce)?;
        self.signers.entry(*signer).or_default().consumed.insert(nonce);
        Ok(())
    }

    /// Undo a [`mark_executed`](Self::mark_executed) during rollback.
    pub(crate) fn release(&mut self, signer: &Address, nonce: u64) {
        if let Some(record) = self.signers.get_mut(signer) {
            record.consumed.remove(&nonce);
        }
    }
}

impl Default for NonceLedger {
    fn default() -> Self {
        Self::new(constants::DEFAULT_MAX_NONCE_CANCEL_DELTA)
    }
}
