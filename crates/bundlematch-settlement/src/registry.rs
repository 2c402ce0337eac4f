//! Allow-lists: which currencies and complications an exchange accepts.

use std::collections::{HashMap, HashSet};

use bundlematch_matchcore::Complication;
use bundlematch_types::Address;

/// Currencies orders may settle in.
pub trait CurrencyAllowlist {
    fn is_allowed(&self, currency: &Address) -> bool;
}

/// Mutable set of allowed currencies.
#[derive(Debug, Default, Clone)]
pub struct CurrencyRegistry {
    allowed: HashSet<Address>,
}

impl CurrencyRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(currencies: impl IntoIterator<Item = Address>) -> Self {
        Self {
            allowed: currencies.into_iter().collect(),
        }
    }

    /// Returns `true` if the currency was not already allowed.
    pub fn add(&mut self, currency: Address) -> bool {
        let added = self.allowed.insert(currency);
        if added {
            tracing::info!(currency = %currency, "Currency allowed");
        }
        added
    }

    /// Returns `true` if the currency was allowed.
    pub fn remove(&mut self, currency: &Address) -> bool {
        let removed = self.allowed.remove(currency);
        if removed {
            tracing::info!(currency = %currency, "Currency removed");
        }
        removed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.allowed.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }
}

impl CurrencyAllowlist for CurrencyRegistry {
    fn is_allowed(&self, currency: &Address) -> bool {
        self.allowed.contains(currency)
    }
}

/// Complication strategies keyed by the address orders name in
/// `exec_params.complication`.
#[derive(Default)]
pub struct ComplicationRegistry {
    entries: HashMap<Address, Box<dyn Complication>>,
}

impl ComplicationRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `complication` at `address`, replacing any previous entry.
    pub fn register(&mut self, address: Address, complication: Box<dyn Complication>) {
        tracing::info!(address = %address, name = complication.name(), "Complication registered");
        self.entries.insert(address, complication);
    }

    /// Returns `true` if something was registered at `address`.
    pub fn remove(&mut self, address: &Address) -> bool {
        self.entries.remove(address).is_some()
    }

    #[must_use]
    pub fn is_allowed(&self, address: &Address) -> bool {
        self.entries.contains_key(address)
    }

    #[must_use]
    pub fn get(&self, address: &Address) -> Option<&dyn Complication> {
        self.entries.get(address).map(AsRef::as_ref)
    }
}

impl std::fmt::Debug for ComplicationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(addr, c)| (addr, c.name())))
            .finish()
    }
}
