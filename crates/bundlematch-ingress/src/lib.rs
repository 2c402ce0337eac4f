//! # bundlematch-ingress
//!
//! **Order envelope**: everything that can be checked about an order before it
//! touches settlement state.
//!
//! ## Architecture
//!
//! 1. **OrderCodec**: canonical, domain-separated encoding of an order
//! 2. **OrderSigner**: maker-side ed25519 signing of the canonical digest
//! 3. **SignatureVerifier**: checks a signature against the order's signer
//! 4. **OrderValidator**: structural checks (window, bps, quantities, sizes)
//!
//! ## Order Flow
//!
//! ```text
//! maker: Order → OrderSigner.sign() → signed Order (off-chain)
//! taker: signed Orders → OrderValidator.validate() → SignatureVerifier.check() → settlement
//! ```

pub mod codec;
pub mod signer;
pub mod validator;
pub mod verifier;

pub use codec::{OrderCodec, SigningDomain};
pub use signer::OrderSigner;
pub use validator::OrderValidator;
pub use verifier::SignatureVerifier;
