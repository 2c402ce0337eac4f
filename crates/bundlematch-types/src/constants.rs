//! System-wide constants for BundleMatch.

/// Basis-point denominator (100% = 10 000 bps).
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Maximum number of nonces a single `cancel_all_orders` call may skip.
pub const DEFAULT_MAX_NONCE_CANCEL_DELTA: u64 = 1_000_000;

/// Tolerance (base units) between the maker price and the taker's own curve.
pub const DEFAULT_PRICE_ERROR_BOUND: u64 = 1_000_000;

/// Default curator fee in basis points (1.5%).
pub const DEFAULT_CURATOR_FEE_BPS: u32 = 150;

/// Default chain id.
pub const DEFAULT_CHAIN_ID: u64 = 1;

/// Maximum bundle entries (collections) per order.
pub const MAX_ITEMS_PER_ORDER: usize = 256;

/// Maximum size of the opaque `extra_params` blob.
pub const MAX_EXTRA_PARAMS_BYTES: usize = 4096;

/// Version tag mixed into the canonical order encoding.
pub const ORDER_ENCODING_TAG: &[u8] = b"bundlematch:order:v1:";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Protocol name.
pub const PROTOCOL_NAME: &str = "BundleMatch";
