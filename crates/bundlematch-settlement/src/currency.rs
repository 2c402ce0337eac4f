//! Fungible settlement currency: the collaborator that moves payment.
//!
//! The engine pulls funds with `transfer_from` as the approved spender, the
//! same way an exchange pulls tokens it was granted an allowance for.

use std::collections::{HashMap, HashSet};

use bundlematch_types::{Address, Amount, BundlematchError, Result};
use rust_decimal::Decimal;

/// A ledger of fungible currency balances and spender allowances.
pub trait CurrencyLedger {
    fn balance_of(&self, currency: &Address, owner: &Address) -> Amount;

    fn allowance(&self, currency: &Address, owner: &Address, spender: &Address) -> Amount;

    /// Move `amount` from `from` to `to`, spending `spender`'s allowance.
    ///
    /// # Errors
    /// Any failure leaves balances and allowances unchanged.
    fn transfer_from(
        &mut self,
        currency: &Address,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<()>;

    /// Undo a previous successful `transfer_from` with the same arguments,
    /// restoring both balances and the spent allowance.
    ///
    /// # Errors
    /// If the ledger can no longer reverse the transfer.
    fn revert_transfer(
        &mut self,
        currency: &Address,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<()>;
}

/// In-memory [`CurrencyLedger`] for tests and embedded hosts.
///
/// Keyed by `(currency, owner)` for balances and `(currency, owner, spender)`
/// for allowances. All mutations are atomic.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCurrency {
    balances: HashMap<(Address, Address), Amount>,
    allowances: HashMap<(Address, Address, Address), Amount>,
    /// Recipients whose incoming transfers are refused.
    blocked: HashSet<Address>,
}

impl InMemoryCurrency {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `owner` with freshly issued funds.
    pub fn deposit(&mut self, currency: &Address, owner: &Address, amount: Amount) {
        *self.balances.entry((*currency, *owner)).or_insert(Decimal::ZERO) += amount;
    }

    /// Set `spender`'s allowance over `owner`'s funds.
    pub fn approve(&mut self, currency: &Address, owner: &Address, spender: &Address, amount: Amount) {
        self.allowances.insert((*currency, *owner, *spender), amount);
    }

    /// Refuse every future transfer into `recipient`.
    pub fn block_recipient(&mut self, recipient: Address) {
        self.blocked.insert(recipient);
    }

    /// Sum of all balances of `currency`.
    #[must_use]
    pub fn total_supply(&self, currency: &Address) -> Amount {
        self.balances
            .iter()
            .filter(|((c, _), _)| c == currency)
            .map(|(_, amount)| *amount)
            .sum()
    }
}

impl CurrencyLedger for InMemoryCurrency {
    fn balance_of(&self, currency: &Address, owner: &Address) -> Amount {
        self.balances
            .get(&(*currency, *owner))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    fn allowance(&self, currency: &Address, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(&(*currency, *owner, *spender))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    fn transfer_from(
        &mut self,
        currency: &Address,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<()> {
        if self.blocked.contains(to) {
            return Err(BundlematchError::TransferFailed {
                reason: format!("recipient {to} refuses {currency}"),
            });
        }
        let allowed = self.allowance(currency, from, spender);
        if allowed < amount {
            return Err(BundlematchError::InsufficientAllowance {
                needed: amount,
                allowed,
            });
        }
        let available = self.balance_of(currency, from);
        if available < amount {
            return Err(BundlematchError::InsufficientBalance {
                needed: amount,
                available,
            });
        }

        self.allowances
            .insert((*currency, *from, *spender), allowed - amount);
        self.balances.insert((*currency, *from), available - amount);
        *self.balances.entry((*currency, *to)).or_insert(Decimal::ZERO) += amount;
        Ok(())
    }

    fn revert_transfer(
        &mut self,
        currency: &Address,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<()> {
        let held = self.balance_of(currency, to);
        if held < amount {
            return Err(BundlematchError::Internal(format!(
                "cannot revert {amount} of {currency}: {to} holds {held}"
            )));
        }
        self.balances.insert((*currency, *to), held - amount);
        *self.balances.entry((*currency, *from)).or_insert(Decimal::ZERO) += amount;
        *self
            .allowances
            .entry((*currency, *from, *spender))
            .or_insert(Decimal::ZERO) += amount;
        Ok(())
    }
}
