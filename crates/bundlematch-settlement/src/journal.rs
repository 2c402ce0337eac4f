//! Settlement journal: every state change a pair makes, in order, so it can
//! be undone.
//!
//! Nonce consumption and collaborator transfers are recorded as they happen.
//! Rolling back replays the journal in reverse. A compensation that itself
//! fails is logged and skipped; the remaining entries are still undone, and
//! the rollback as a whole reports the ledgers as inconsistent.

use bundlematch_types::{Address, Amount, BundlematchError, Result};

use crate::assets::AssetLedger;
use crate::currency::CurrencyLedger;
use crate::nonce_ledger::NonceLedger;

/// One recorded state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Effect {
    NonceConsumed {
        signer: Address,
        nonce: u64,
    },
    Currency {
        currency: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    },
    Asset {
        collection: Address,
        token_id: u64,
        from: Address,
        to: Address,
        quantity: u64,
    },
}

#[derive(Debug, Default)]
pub(crate) struct Journal {
    effects: Vec<Effect>,
}

impl Journal {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    pub(crate) fn len(&self) -> usize {
        self.effects.len()
    }

    /// Append a settled pair's journal to a batch journal.
    pub(crate) fn append(&mut self, mut other: Journal) {
        self.effects.append(&mut other.effects);
    }

    /// Undo every recorded effect, newest first.
    ///
    /// # Errors
    /// [`BundlematchError::SupplyInvariantViolation`] if any compensation
    /// failed; the ledgers no longer match the pre-settlement state.
    pub(crate) fn rollback<C, A>(
        self,
        nonces: &mut NonceLedger,
        currency_ledger: &mut C,
        asset_ledger: &mut A,
    ) -> Result<()>
    where
        C: CurrencyLedger,
        A: AssetLedger,
    {
        let total = self.effects.len();
        let mut failed = 0;
        for effect in self.effects.into_iter().rev() {
            let undone = match &effect {
                Effect::NonceConsumed { signer, nonce } => {
                    nonces.release(signer, *nonce);
                    Ok(())
                }
                Effect::Currency {
                    currency,
                    spender,
                    from,
                    to,
                    amount,
                } => currency_ledger.revert_transfer(currency, spender, from, to, *amount),
                Effect::Asset {
                    collection,
                    token_id,
                    from,
                    to,
                    quantity,
                } => asset_ledger.revert_transfer(collection, *token_id, from, to, *quantity),
            };
            if let Err(err) = undone {
                failed += 1;
                tracing::error!(?effect, error = %err, "Rollback compensation failed");
            }
        }
        tracing::debug!(total, failed, "Journal rolled back");
        if failed > 0 {
            return Err(BundlematchError::SupplyInvariantViolation {
                reason: format!("{failed} of {total} rollback compensations failed"),
            });
        }
        Ok(())
    }
}
