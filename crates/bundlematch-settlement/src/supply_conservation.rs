//! Per-pair conservation check.
//!
//! Invariant enforced after every settled pair:
//! ```text
//! currency: buyer -= price, seller += price - fee, treasury += fee
//! assets:   ∀ resolved (collection, token, n): seller -= n, buyer += n
//! ```
//! Nothing else moves. Balances are snapshotted before the transfers and
//! compared afterwards; any difference means a collaborator misbehaved and
//! the pair is rolled back.

use std::collections::HashMap;

use bundlematch_types::{Address, Amount, BundlematchError, Result};

use crate::assets::AssetLedger;
use crate::currency::CurrencyLedger;
use crate::engine::SettlementPlan;

/// Expected post-settlement balances of every party a pair touches.
#[derive(Debug)]
pub(crate) struct SupplyConservation {
    currency: Address,
    expected_currency: HashMap<Address, Amount>,
    expected_assets: HashMap<(Address, u64, Address), u64>,
}

impl SupplyConservation {
    /// Snapshot current balances and apply `plan`'s expected deltas.
    pub(crate) fn snapshot<C, A>(plan: &SettlementPlan, currency: &C, assets: &A) -> Result<Self>
    where
        C: CurrencyLedger,
        A: AssetLedger,
    {
        let mut expected_currency = HashMap::new();
        for party in [plan.buyer, plan.seller, plan.treasury] {
            expected_currency
                .entry(party)
                .or_insert_with(|| currency.balance_of(&plan.currency, &party));
        }
        let deltas = [
            (plan.buyer, -plan.price),
            (plan.seller, plan.seller_proceeds()),
            (plan.treasury, plan.fee),
        ];
        for (party, delta) in deltas {
            if let Some(balance) = expected_currency.get_mut(&party) {
                *balance = balance.checked_add(delta).ok_or_else(|| overflow(&party))?;
            }
        }

        let mut expected_assets = HashMap::new();
        for item in &plan.bundle.items {
            for token in &item.tokens {
                for owner in [plan.seller, plan.buyer] {
                    expected_assets
                        .entry((item.collection, token.token_id, owner))
                        .or_insert_with(|| assets.balance_of(&item.collection, token.token_id, &owner));
                }
                let seller = expected_assets
                    .entry((item.collection, token.token_id, plan.seller))
                    .or_insert(0);
                *seller = seller
                    .checked_sub(token.num_tokens)
                    .ok_or_else(|| overflow(&plan.seller))?;
                let buyer = expected_assets
                    .entry((item.collection, token.token_id, plan.buyer))
                    .or_insert(0);
                *buyer = buyer
                    .checked_add(token.num_tokens)
                    .ok_or_else(|| overflow(&plan.buyer))?;
            }
        }

        Ok(Self {
            currency: plan.currency,
            expected_currency,
            expected_assets,
        })
    }

    /// Compare actual balances with the expected ones.
    ///
    /// # Errors
    /// [`BundlematchError::SupplyInvariantViolation`] naming the first party
    /// whose balance differs.
    pub(crate) fn verify<C, A>(&self, currency: &C, assets: &A) -> Result<()>
    where
        C: CurrencyLedger,
        A: AssetLedger,
    {
        for (party, expected) in &self.expected_currency {
            let actual = currency.balance_of(&self.currency, party);
            if actual != *expected {
                return Err(BundlematchError::SupplyInvariantViolation {
                    reason: format!(
                        "{party} holds {actual} of {}, expected {expected}",
                        self.currency
                    ),
                });
            }
        }
        for ((collection, token_id, owner), expected) in &self.expected_assets {
            let actual = assets.balance_of(collection, *token_id, owner);
            if actual != *expected {
                return Err(BundlematchError::SupplyInvariantViolation {
                    reason: format!(
                        "{owner} holds {actual} of token {token_id} in {collection}, expected {expected}"
                    ),
                });
            }
        }
        Ok(())
    }
}

fn overflow(party: &Address) -> BundlematchError {
    BundlematchError::SupplyInvariantViolation {
        reason: format!("balance arithmetic overflow for {party}"),
    }
}
