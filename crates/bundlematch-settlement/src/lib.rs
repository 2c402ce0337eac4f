//! # bundlematch-settlement
//!
//! **Settlement plane**: nonce state, collaborator ledgers and the atomic
//! `take_orders` engine.
//!
//! ## Architecture
//!
//! The [`SettlementEngine`] receives signed sell/buy pairs from a taker and:
//! 1. Verifies structure, signatures and nonces (via `bundlematch-ingress`)
//! 2. Asks the order's [`Complication`](bundlematch_matchcore::Complication)
//!    for price and bundle (via `bundlematch-matchcore`)
//! 3. Applies the curator fee and both slippage floors
//! 4. Consumes both nonces, then moves currency and assets through the
//!    [`CurrencyLedger`] and [`AssetLedger`] collaborators
//! 5. Checks conservation and rolls the pair back on any failure
//!
//! ## Collaborators
//!
//! - [`CurrencyLedger`]: fungible payment, pulled with an allowance
//! - [`AssetLedger`]: token holdings, moved by an approved operator
//! - [`FeePolicy`]: fee rate and treasury
//! - [`CurrencyAllowlist`]: currencies orders may settle in
//!
//! In-memory implementations of each are provided for tests and embedded use.

pub mod assets;
pub mod currency;
pub mod engine;
pub mod fees;
mod journal;
pub mod nonce_ledger;
pub mod registry;
pub mod shared;
mod supply_conservation;

pub use assets::{AssetLedger, InMemoryAssets};
pub use currency::{CurrencyLedger, InMemoryCurrency};
pub use engine::{InMemoryEngine, SettlementEngine};
pub use fees::{FeePolicy, StaticFeePolicy};
pub use nonce_ledger::NonceLedger;
pub use registry::{ComplicationRegistry, CurrencyAllowlist, CurrencyRegistry};
pub use shared::SharedEngine;
