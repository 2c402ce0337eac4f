//! # bundlematch-types
//!
//! Shared types, errors, and configuration for **BundleMatch**.
//!
//! This crate is the leaf dependency of the workspace: every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`Address`], [`OrderId`], [`FillId`]
//! - **Order model**: [`Order`], [`OrderSide`], [`OrderItem`], [`TokenInfo`], [`ExecParams`]
//! - **Settlement results**: [`MatchResult`], [`ResolvedBundle`], [`TakeOutcome`]
//! - **Configuration**: [`ExchangeConfig`], [`FeeConfig`]
//! - **Errors**: [`BundlematchError`] with `BM_ERR_` prefix codes
//! - **Constants**: protocol-wide limits and defaults

pub mod config;
pub mod constants;
pub mod error;
pub mod fill;
pub mod ids;
pub mod order;

// Re-export all primary types at crate root for ergonomic imports:
//   use bundlematch_types::{Order, OrderSide, MatchResult, ...};

pub use config::*;
pub use error::*;
pub use fill::*;
pub use ids::*;
pub use order::*;

// Constants are accessed via `bundlematch_types::constants::FOO`
// (not re-exported to avoid name collisions).
