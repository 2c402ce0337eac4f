//! Thread-safe handle to a [`SettlementEngine`].
//!
//! Every call takes the one lock, so concurrent callers are serialized and
//! no two settlements or cancellations ever interleave.

use std::sync::{Arc, Mutex, MutexGuard};

use bundlematch_types::{Address, BundlematchError, Order, Result, TakeOutcome};

use crate::assets::AssetLedger;
use crate::currency::CurrencyLedger;
use crate::engine::SettlementEngine;
use crate::fees::FeePolicy;
use crate::registry::CurrencyAllowlist;

/// Cloneable, lock-protected engine handle.
pub struct SharedEngine<C, A, F, L> {
    inner: Arc<Mutex<SettlementEngine<C, A, F, L>>>,
}

impl<C, A, F, L> Clone for SharedEngine<C, A, F, L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C, A, F, L> SharedEngine<C, A, F, L>
where
    C: CurrencyLedger,
    A: AssetLedger,
    F: FeePolicy,
    L: CurrencyAllowlist,
{
    #[must_use]
    pub fn new(engine: SettlementEngine<C, A, F, L>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, SettlementEngine<C, A, F, L>>> {
        self.inner
            .lock()
            .map_err(|_| BundlematchError::Internal("settlement engine lock poisoned".to_string()))
    }

    /// Run `f` with exclusive access to the engine.
    ///
    /// # Errors
    /// [`BundlematchError::Internal`] if the lock is poisoned.
    pub fn with<R>(&self, f: impl FnOnce(&mut SettlementEngine<C, A, F, L>) -> R) -> Result<R> {
        let mut engine = self.lock()?;
        Ok(f(&mut engine))
    }

    /// # Errors
    /// Lock poisoning, or any error of [`SettlementEngine::take_orders`].
    pub fn take_orders(
        &self,
        caller: &Address,
        sell_orders: &[Order],
        buy_orders: &[Order],
        strict: bool,
    ) -> Result<TakeOutcome> {
        self.lock()?.take_orders(caller, sell_orders, buy_orders, strict)
    }

    /// # Errors
    /// Lock poisoning, or any error of [`SettlementEngine::take_orders_at`].
    pub fn take_orders_at(
        &self,
        caller: &Address,
        sell_orders: &[Order],
        buy_orders: &[Order],
        strict: bool,
        now: i64,
    ) -> Result<TakeOutcome> {
        self.lock()?
            .take_orders_at(caller, sell_orders, buy_orders, strict, now)
    }

    /// # Errors
    /// Lock poisoning, or any error of [`SettlementEngine::cancel_multiple_orders`].
    pub fn cancel_multiple_orders(&self, caller: &Address, nonces: &[u64]) -> Result<()> {
        self.lock()?.cancel_multiple_orders(caller, nonces)
    }

    /// # Errors
    /// Lock poisoning, or any error of [`SettlementEngine::cancel_all_orders`].
    pub fn cancel_all_orders(&self, caller: &Address, new_min_nonce: u64) -> Result<()> {
        self.lock()?.cancel_all_orders(caller, new_min_nonce)
    }

    /// # Errors
    /// Lock poisoning.
    pub fn is_nonce_valid(&self, signer: &Address, nonce: u64) -> Result<bool> {
        Ok(self.lock()?.is_nonce_valid(signer, nonce))
    }

    /// # Errors
    /// Lock poisoning.
    pub fn user_min_order_nonce(&self, signer: &Address) -> Result<u64> {
        Ok(self.lock()?.user_min_order_nonce(signer))
    }

    /// # Errors
    /// Lock poisoning.
    pub fn verify_order_sig(&self, order: &Order) -> Result<bool> {
        Ok(self.lock()?.verify_order_sig(order))
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use bundlematch_types::ExchangeConfig;

    use super::*;
    use crate::engine::InMemoryEngine;

    fn shared() -> SharedEngine<
        crate::InMemoryCurrency,
        crate::InMemoryAssets,
        crate::StaticFeePolicy,
        crate::CurrencyRegistry,
    > {
        let engine = InMemoryEngine::in_memory(ExchangeConfig::new(1, Address::repeat(0xe0))).unwrap();
        SharedEngine::new(engine)
    }

    #[test]
    fn concurrent_cancellations_are_serialized() {
        let engine = shared();
        let signer = Address::repeat(1);
        let handles: Vec<_> = (0..8u64)
            .map(|i| {
                let engine = engine.clone();
                thread::spawn(move || engine.cancel_multiple_orders(&signer, &[i * 10, i * 10 + 1]))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }
        for i in 0..8u64 {
            assert!(!engine.is_nonce_valid(&signer, i * 10).unwrap());
            assert!(!engine.is_nonce_valid(&signer, i * 10 + 1).unwrap());
        }
        assert!(engine.is_nonce_valid(&signer, 2).unwrap());
    }

    #[test]
    fn watermark_through_handle() {
        let engine = shared();
        let signer = Address::repeat(1);
        engine.cancel_all_orders(&signer, 5).unwrap();
        assert_eq!(engine.user_min_order_nonce(&signer).unwrap(), 5);
        assert_eq!(engine.with(|e| e.config().chain_id).unwrap(), 1);
    }

    #[test]
    fn poisoned_lock_surfaces_as_internal() {
        let engine = shared();
        let poisoner = engine.clone();
        let _ = thread::spawn(move || {
            let _guard = poisoner.inner.lock().unwrap();
            panic!("poison the lock");
        })
        .join();
        let err = engine.is_nonce_valid(&Address::repeat(1), 0).unwrap_err();
        assert!(matches!(err, BundlematchError::Internal(_)));
    }
}
