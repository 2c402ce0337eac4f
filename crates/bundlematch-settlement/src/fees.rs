//! Curator fee policy.

use bundlematch_types::{Address, FeeConfig};

/// Where fees go and how large they are.
pub trait FeePolicy {
    /// Fee in basis points of the execution price.
    fn fee_bps(&self) -> u32;

    fn treasury(&self) -> Address;
}

/// Fixed fee rate and treasury.
#[derive(Debug, Clone, Copy)]
pub struct StaticFeePolicy {
    fee_bps: u32,
    treasury: Address,
}

impl StaticFeePolicy {
    #[must_use]
    pub fn new(fee_bps: u32, treasury: Address) -> Self {
        Self { fee_bps, treasury }
    }

    #[must_use]
    pub fn from_config(config: &FeeConfig) -> Self {
        Self::new(config.curator_fee_bps, config.treasury)
    }
}

impl FeePolicy for StaticFeePolicy {
    fn fee_bps(&self) -> u32 {
        self.fee_bps
    }

    fn treasury(&self) -> Address {
        self.treasury
    }
}
