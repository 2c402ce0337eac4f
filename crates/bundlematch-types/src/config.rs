//! Configuration types for a BundleMatch exchange deployment.

use serde::{Deserialize, Serialize};

use crate::{Address, BundlematchError, Result, constants};

/// Configuration for a single exchange deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// Network this deployment settles on. Signatures are bound to it.
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    /// The exchange's own address: signing domain and transfer operator.
    pub exchange: Address,
    /// Largest watermark jump accepted by `cancel_all_orders`.
    #[serde(default = "default_max_nonce_cancel_delta")]
    pub max_nonce_cancel_delta: u64,
    /// Tolerance between maker price and the taker's own price curve.
    #[serde(default = "default_price_error_bound")]
    pub price_error_bound: u64,
    /// Curator fee settings.
    #[serde(default)]
    pub fees: FeeConfig,
}

/// Protocol fee settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeConfig {
    /// Curator fee taken from every sale, in basis points.
    pub curator_fee_bps: u32,
    /// Where curator fees are sent.
    pub treasury: Address,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            curator_fee_bps: constants::DEFAULT_CURATOR_FEE_BPS,
            treasury: Address::ZERO,
        }
    }
}

fn default_chain_id() -> u64 {
    constants::DEFAULT_CHAIN_ID
}

fn default_max_nonce_cancel_delta() -> u64 {
    constants::DEFAULT_MAX_NONCE_CANCEL_DELTA
}

fn default_price_error_bound() -> u64 {
    constants::DEFAULT_PRICE_ERROR_BOUND
}

impl ExchangeConfig {
    /// Default configuration for an exchange at `exchange` on `chain_id`.
    #[must_use]
    pub fn new(chain_id: u64, exchange: Address) -> Self {
        Self {
            chain_id,
            exchange,
            max_nonce_cancel_delta: constants::DEFAULT_MAX_NONCE_CANCEL_DELTA,
            price_error_bound: constants::DEFAULT_PRICE_ERROR_BOUND,
            fees: FeeConfig::default(),
        }
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)
            .map_err(|e| BundlematchError::Configuration(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.fees.curator_fee_bps > constants::BPS_DENOMINATOR {
            return Err(BundlematchError::Configuration(format!(
                "curator_fee_bps {} exceeds {}",
                self.fees.curator_fee_bps,
                constants::BPS_DENOMINATOR
            )));
        }
        if self.max_nonce_cancel_delta == 0 {
            return Err(BundlematchError::Configuration(
                "max_nonce_cancel_delta must be > 0".to_string(),
            ));
        }
        if self.exchange.is_zero() {
            return Err(BundlematchError::Configuration(
                "exchange address must be set".to_string(),
            ));
        }
        Ok(())
    }
}
