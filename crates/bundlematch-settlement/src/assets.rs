//! Non-fungible and semi-fungible assets: the collaborator that moves the
//! traded tokens.
//!
//! Balances are per `(collection, token_id, owner)` unit counts, so a plain
//! one-of-one token is simply a balance of 1.

use std::collections::{HashMap, HashSet};

use bundlematch_types::{Address, BundlematchError, Result};

/// A ledger of token holdings and operator approvals.
pub trait AssetLedger {
    /// Units of `token_id` in `collection` held by `owner`.
    fn balance_of(&self, collection: &Address, token_id: u64, owner: &Address) -> u64;

    /// Whether `operator` may move any of `owner`'s tokens in `collection`.
    fn is_approved_for_all(&self, collection: &Address, owner: &Address, operator: &Address) -> bool;

    /// Move `quantity` units from `from` to `to` on behalf of `operator`.
    ///
    /// # Errors
    /// Any failure leaves holdings unchanged.
    fn transfer_asset(
        &mut self,
        collection: &Address,
        token_id: u64,
        from: &Address,
        to: &Address,
        quantity: u64,
        operator: &Address,
    ) -> Result<()>;

    /// Undo a previous successful `transfer_asset`.
    ///
    /// # Errors
    /// If the ledger can no longer reverse the transfer.
    fn revert_transfer(
        &mut self,
        collection: &Address,
        token_id: u64,
        from: &Address,
        to: &Address,
        quantity: u64,
    ) -> Result<()>;
}

/// In-memory [`AssetLedger`] for tests and embedded hosts.
#[derive(Debug, Default, Clone)]
pub struct InMemoryAssets {
    holdings: HashMap<(Address, u64, Address), u64>,
    approvals: HashSet<(Address, Address, Address)>,
    /// Collections whose transfers are currently refused.
    paused: HashSet<Address>,
}

impl InMemoryAssets {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue `quantity` units of `token_id` to `owner`.
    pub fn mint(&mut self, collection: &Address, token_id: u64, owner: &Address, quantity: u64) {
        let held = self.holdings.entry((*collection, token_id, *owner)).or_insert(0);
        *held = held.saturating_add(quantity);
    }

    pub fn set_approval_for_all(
        &mut self,
        collection: &Address,
        owner: &Address,
        operator: &Address,
        approved: bool,
    ) {
        let key = (*collection, *owner, *operator);
        if approved {
            self.approvals.insert(key);
        } else {
            self.approvals.remove(&key);
        }
    }

    /// Refuse every future transfer in `collection`.
    pub fn pause(&mut self, collection: Address) {
        self.paused.insert(collection);
    }

    /// Total units of `token_id` across all owners.
    #[must_use]
    pub fn total_supply(&self, collection: &Address, token_id: u64) -> u64 {
        self.holdings
            .iter()
            .filter(|((c, t, _), _)| c == collection && *t == token_id)
            .fold(0u64, |acc, (_, n)| acc.saturating_add(*n))
    }

    fn move_units(
        &mut self,
        collection: &Address,
        token_id: u64,
        from: &Address,
        to: &Address,
        quantity: u64,
    ) -> Result<()> {
        let held = self.balance_of(collection, token_id, from);
        if held < quantity {
            return Err(BundlematchError::NotOwner {
                collection: *collection,
                token_id,
                owner: *from,
                quantity,
            });
        }
        self.holdings.insert((*collection, token_id, *from), held - quantity);
        let dest = self.holdings.entry((*collection, token_id, *to)).or_insert(0);
        *dest = dest.saturating_add(quantity);
        Ok(())
    }
}

impl AssetLedger for InMemoryAssets {
    fn balance_of(&self, collection: &Address, token_id: u64, owner: &Address) -> u64 {
        self.holdings
            .get(&(*collection, token_id, *owner))
            .copied()
            .unwrap_or(0)
    }

    fn is_approved_for_all(&self, collection: &Address, owner: &Address, operator: &Address) -> bool {
        owner == operator || self.approvals.contains(&(*collection, *owner, *operator))
    }

    fn transfer_asset(
        &mut self,
        collection: &Address,
        token_id: u64,
        from: &Address,
        to: &Address,
        quantity: u64,
        operator: &Address,
    ) -> Result<()> {
        if self.paused.contains(collection) {
            return Err(BundlematchError::TransferFailed {
                reason: format!("collection {collection} is paused"),
            });
        }
        if !self.is_approved_for_all(collection, from, operator) {
            return Err(BundlematchError::NotApproved {
                collection: *collection,
                owner: *from,
            });
        }
        self.move_units(collection, token_id, from, to, quantity)
    }

    fn revert_transfer(
        &mut self,
        collection: &Address,
        token_id: u64,
        from: &Address,
        to: &Address,
        quantity: u64,
    ) -> Result<()> {
        self.move_units(collection, token_id, to, from, quantity)
            .map_err(|e| BundlematchError::Internal(format!("cannot revert asset transfer: {e}")))
    }
}
