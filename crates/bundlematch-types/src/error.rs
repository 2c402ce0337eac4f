//! Error types for BundleMatch.
//!
//! All errors use the `BM_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Order / signature errors
//! - 2xx: Nonce errors
//! - 3xx: Pricing / matching errors
//! - 4xx: Settlement / batch errors
//! - 5xx: Collaborator (asset, currency) errors
//! - 9xx: General / internal errors

use thiserror::Error;

use crate::{Address, Amount, OrderId};

/// Central error enum for all BundleMatch operations.
#[derive(Debug, Error)]
pub enum BundlematchError {
    // =================================================================
    // Order / Signature Errors (1xx)
    // =================================================================
    /// The order failed structural validation.
    #[error("BM_ERR_100: Invalid order: {reason}")]
    InvalidOrder { reason: String },

    /// The signature does not verify against the order's signer.
    #[error("BM_ERR_101: Invalid signature on {0}")]
    InvalidSignature(OrderId),

    // =================================================================
    // Nonce Errors (2xx)
    // =================================================================
    /// The nonce is below the signer's cancel-all watermark.
    #[error("BM_ERR_200: Nonce too low: {nonce} < min order nonce {min_nonce}")]
    NonceTooLow { nonce: u64, min_nonce: u64 },

    /// The nonce was already executed or cancelled.
    #[error("BM_ERR_201: Nonce {0} already executed or cancelled")]
    NonceAlreadyUsed(u64),

    /// `cancel_all_orders` tried to skip more nonces than allowed at once.
    #[error("BM_ERR_202: Too many nonces cancelled: {requested} > max {max}")]
    TooManyNoncesCancelled { requested: u64, max: u64 },

    // =================================================================
    // Pricing / Matching Errors (3xx)
    // =================================================================
    /// Settlement time lies outside the order's validity window.
    #[error("BM_ERR_300: Order expired or not started: now {now}, window [{start_time}, {end_time}]")]
    OrderExpiredOrNotStarted {
        now: i64,
        start_time: i64,
        end_time: i64,
    },

    /// The seller would net less than the signed `min_bps_to_seller` floor.
    #[error("BM_ERR_301: Slippage violation: price {price}, fee {fee}, min bps {min_bps}")]
    SlippageViolation {
        price: Amount,
        fee: Amount,
        min_bps: u32,
    },

    /// The two sides disagree on complication or currency.
    #[error("BM_ERR_302: Exec params mismatch between maker and taker")]
    ExecParamsMismatch,

    /// The taker's concrete assets do not satisfy the maker's bundle.
    #[error("BM_ERR_303: Bundle mismatch: {reason}")]
    BundleMismatch { reason: String },

    /// The resolved bundle does not cover exactly `num_items` units.
    #[error("BM_ERR_304: Quantity mismatch: expected {expected}, got {actual}")]
    QuantityMismatch { expected: u64, actual: u64 },

    /// The taker's own price curve disagrees with the maker price.
    #[error("BM_ERR_305: Price mismatch: maker {maker_price}, taker {taker_price}")]
    PriceMismatch {
        maker_price: Amount,
        taker_price: Amount,
    },

    /// Buyer and seller are the same signer.
    #[error("BM_ERR_306: Self-trade prevented: both sides signed by {0}")]
    SelfTradeBlocked(Address),

    // =================================================================
    // Settlement / Batch Errors (4xx)
    // =================================================================
    /// Sell and buy sequences differ in length.
    #[error("BM_ERR_400: Malformed batch: {sells} sell orders vs {buys} buy orders")]
    MalformedBatch { sells: usize, buys: usize },

    /// A collaborator transfer failed after pre-flight; the pair was rolled back.
    #[error("BM_ERR_401: Transfer failed: {reason}")]
    TransferFailed { reason: String },

    /// The settlement currency is not on the allow-list.
    #[error("BM_ERR_402: Currency not allowed: {0}")]
    CurrencyNotAllowed(Address),

    /// The complication is not registered.
    #[error("BM_ERR_403: Complication not allowed: {0}")]
    ComplicationNotAllowed(Address),

    /// The caller signed neither side of the pair.
    #[error("BM_ERR_404: Caller {0} is not the taker of this pair")]
    InvalidTaker(Address),

    /// Post-settlement accounting does not add up.
    #[error("BM_ERR_405: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },

    // =================================================================
    // Collaborator Errors (5xx)
    // =================================================================
    /// The seller does not hold the asset units being transferred.
    #[error("BM_ERR_500: {owner} does not own {quantity} of token {token_id} in {collection}")]
    NotOwner {
        collection: Address,
        token_id: u64,
        owner: Address,
        quantity: u64,
    },

    /// The exchange is not approved to move the owner's assets.
    #[error("BM_ERR_501: Exchange not approved for {owner} on {collection}")]
    NotApproved { collection: Address, owner: Address },

    /// Not enough currency balance.
    #[error("BM_ERR_502: Insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: Amount, available: Amount },

    /// Not enough currency allowance for the exchange.
    #[error("BM_ERR_503: Insufficient allowance: need {needed}, have {allowed}")]
    InsufficientAllowance { needed: Amount, allowed: Amount },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("BM_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("BM_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config, missing fields, etc.).
    #[error("BM_ERR_902: Configuration error: {0}")]
    Configuration(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, BundlematchError>;

impl From<serde_json::Error> for BundlematchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
