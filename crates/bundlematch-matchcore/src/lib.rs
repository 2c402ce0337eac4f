//! # bundlematch-matchcore
//!
//! **Pure pricing and bundle matching for BundleMatch.**
//!
//! MatchCore is the compute plane: given two signed orders and a timestamp it
//! decides whether they can execute, at what price, and for which bundle.
//! It has:
//!
//! - **Zero side effects**: no nonce state, no balances, no transfers
//! - **Exact arithmetic**: whole base units, rounding in the maker's favour
//! - **Pluggable strategies**: every order names its [`Complication`]

pub mod bundle;
pub mod complication;
pub mod pricing;

pub use bundle::BundleMatcher;
pub use complication::{Complication, Execution, OrderBookComplication};
pub use pricing::{curator_fee, current_price, within_slippage_bound};
