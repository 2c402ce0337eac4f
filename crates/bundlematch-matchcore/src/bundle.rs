//! Bundle reconciliation.
//!
//! A maker describes what it will trade; the taker names concrete tokens.
//! [`BundleMatcher::reconcile`] decides whether the taker's list is an
//! acceptable instance of the maker's description and returns the bundle
//! that settlement will move.
//!
//! Maker entry forms:
//!
//! - explicit tokens: the taker must name exactly the same `(token_id, num_tokens)` set
//! - wildcard (empty tokens): the taker may name any non-empty set, or skip
//!   the collection entirely; only the aggregate count matters
//! - no entries at all: any concrete taker bundle is acceptable
//!
//! Whatever the form, the resolved unit total must equal the maker's
//! `num_items`.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use bundlematch_types::{Address, BundlematchError, Order, OrderItem, ResolvedBundle, Result};

/// Stateless bundle reconciler.
pub struct BundleMatcher;

impl BundleMatcher {
    /// Reconcile `taker_items` against `maker`'s bundle description.
    ///
    /// # Errors
    /// - [`BundlematchError::BundleMismatch`] when the taker's list is not an
    ///   instance of the maker's description
    /// - [`BundlematchError::QuantityMismatch`] when the resolved unit total
    ///   differs from `maker.num_items`
    pub fn reconcile(maker: &Order, taker_items: &[OrderItem]) -> Result<ResolvedBundle> {
        let offered = index_taker_items(taker_items)?;

        let items = if maker.nfts.is_empty() {
            taker_items.to_vec()
        } else {
            let mut named = HashSet::with_capacity(maker.nfts.len());
            for entry in &maker.nfts {
                if !named.insert(entry.collection) {
                    return Err(mismatch(format!(
                        "maker lists collection {} more than once",
                        entry.collection
                    )));
                }
            }
            if let Some(stray) = taker_items.iter().find(|i| !named.contains(&i.collection)) {
                return Err(mismatch(format!(
                    "collection {} is not part of the maker bundle",
                    stray.collection
                )));
            }

            let mut resolved = Vec::with_capacity(taker_items.len());
            for entry in &maker.nfts {
                match offered.get(&entry.collection) {
                    None if entry.is_wildcard() => {}
                    None => {
                        return Err(mismatch(format!(
                            "taker omits collection {}",
                            entry.collection
                        )));
                    }
                    Some(item) if entry.is_wildcard() => resolved.push((*item).clone()),
                    Some(item) => {
                        if !same_tokens(entry, item) {
                            return Err(mismatch(format!(
                                "token set for collection {} differs from the maker's",
                                entry.collection
                            )));
                        }
                        resolved.push((*item).clone());
                    }
                }
            }
            resolved
        };

        let total_units = items
            .iter()
            .fold(0u64, |acc, item| acc.saturating_add(item.unit_count()));
        if total_units != maker.num_items {
            return Err(BundlematchError::QuantityMismatch {
                expected: maker.num_items,
                actual: total_units,
            });
        }

        tracing::trace!(
            maker = %maker.id,
            collections = items.len(),
            total_units,
            "Bundle reconciled"
        );
        Ok(ResolvedBundle { items, total_units })
    }
}

/// Index the taker's entries by collection, rejecting anything that is not a
/// concrete, unambiguous token list.
fn index_taker_items(items: &[OrderItem]) -> Result<BTreeMap<Address, &OrderItem>> {
    let mut index = BTreeMap::new();
    for item in items {
        if item.is_wildcard() {
            return Err(mismatch(format!(
                "taker entry for {} names no tokens",
                item.collection
            )));
        }
        let mut ids = BTreeSet::new();
        for token in &item.tokens {
            if token.num_tokens == 0 {
                return Err(mismatch(format!(
                    "taker token {} in {} has zero units",
                    token.token_id, item.collection
                )));
            }
            if !ids.insert(token.token_id) {
                return Err(mismatch(format!(
                    "taker lists token {} in {} twice",
                    token.token_id, item.collection
                )));
            }
        }
        if index.insert(item.collection, item).is_some() {
            return Err(mismatch(format!(
                "taker lists collection {} more than once",
                item.collection
            )));
        }
    }
    Ok(index)
}

fn same_tokens(maker: &OrderItem, taker: &OrderItem) -> bool {
    let mut a = maker.tokens.clone();
    let mut b = taker.tokens.clone();
    a.sort_unstable();
    b.sort_unstable();
    a == b
}

fn mismatch(reason: String) -> BundlematchError {
    BundlematchError::BundleMismatch { reason }
}

#[cfg(test)]
mod tests {
    use bundlematch_types::{OrderSide, TokenInfo};
    use rust_decimal::Decimal;

    use super::*;

    const A: u8 = 0xa1;
    const B: u8 = 0xa2;
    const C: u8 = 0xa3;

    fn maker(nfts: Vec<OrderItem>, num_items: u64) -> Order {
        Order::dummy_with(
            OrderSide::Sell,
            Address::repeat(1),
            1,
            nfts,
            num_items,
            Decimal::ONE,
            0,
        )
    }

    fn item(collection: u8, ids: &[u64]) -> OrderItem {
        OrderItem::new(
            Address::repeat(collection),
            ids.iter().map(|&id| TokenInfo::new(id, 1)).collect(),
        )
    }

    #[test]
    fn explicit_tokens_match_in_any_order() {
        let m = maker(vec![item(A, &[1, 2, 3])], 3);
        let bundle = BundleMatcher::reconcile(&m, &[item(A, &[3, 1, 2])]).unwrap();
        assert_eq!(bundle.total_units, 3);
        assert_eq!(bundle.items.len(), 1);
    }

    #[test]
    fn explicit_tokens_reject_a_single_difference() {
        let m = maker(vec![item(A, &[1, 2, 3])], 3);
        let err = BundleMatcher::reconcile(&m, &[item(A, &[1, 2, 4])]).unwrap_err();
        assert!(matches!(err, BundlematchError::BundleMismatch { .. }));

        let err = BundleMatcher::reconcile(&m, &[item(A, &[1, 2])]).unwrap_err();
        assert!(matches!(err, BundlematchError::BundleMismatch { .. }));
    }

    #[test]
    fn explicit_tokens_compare_unit_counts() {
        let m = maker(
            vec![OrderItem::new(Address::repeat(A), vec![TokenInfo::new(1, 2)])],
            2,
        );
        let taker = OrderItem::new(Address::repeat(A), vec![TokenInfo::new(1, 1)]);
        assert!(BundleMatcher::reconcile(&m, &[taker]).is_err());
    }

    #[test]
    fn wildcard_collections_count_in_aggregate() {
        // Any four items from A, B or C.
        let m = maker(
            vec![
                OrderItem::any_of(Address::repeat(A)),
                OrderItem::any_of(Address::repeat(B)),
                OrderItem::any_of(Address::repeat(C)),
            ],
            4,
        );
        let bundle = BundleMatcher::reconcile(&m, &[item(A, &[1, 2]), item(C, &[7, 8])]).unwrap();
        assert_eq!(bundle.total_units, 4);
        assert_eq!(bundle.items.len(), 2);

        let err = BundleMatcher::reconcile(&m, &[item(A, &[1]), item(B, &[2]), item(C, &[3])])
            .unwrap_err();
        assert!(matches!(
            err,
            BundlematchError::QuantityMismatch { expected: 4, actual: 3 }
        ));
    }

    #[test]
    fn mixed_explicit_and_wildcard() {
        let m = maker(vec![item(A, &[1]), OrderItem::any_of(Address::repeat(B))], 3);
        assert!(BundleMatcher::reconcile(&m, &[item(A, &[1]), item(B, &[5, 6])]).is_ok());
        // Explicit entry cannot be skipped.
        assert!(BundleMatcher::reconcile(&m, &[item(B, &[5, 6, 7])]).is_err());
    }

    #[test]
    fn empty_maker_bundle_accepts_any_concrete_bundle() {
        let m = maker(Vec::new(), 2);
        let bundle = BundleMatcher::reconcile(&m, &[item(A, &[1]), item(B, &[9])]).unwrap();
        assert_eq!(bundle.total_units, 2);
    }

    #[test]
    fn rejects_unlisted_collection() {
        let m = maker(vec![OrderItem::any_of(Address::repeat(A))], 1);
        let err = BundleMatcher::reconcile(&m, &[item(B, &[1])]).unwrap_err();
        assert!(matches!(err, BundlematchError::BundleMismatch { .. }));
    }

    #[test]
    fn rejects_wildcard_or_duplicate_taker_entries() {
        let m = maker(Vec::new(), 1);
        assert!(BundleMatcher::reconcile(&m, &[OrderItem::any_of(Address::repeat(A))]).is_err());
        assert!(BundleMatcher::reconcile(&m, &[item(A, &[1]), item(A, &[2])]).is_err());
        assert!(BundleMatcher::reconcile(&m, &[item(A, &[1, 1])]).is_err());
    }
}
