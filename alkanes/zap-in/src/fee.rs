//! # Fee Model
//!
//! A pool's swap fee expressed as the fraction of the input that is kept after
//! the fee, `numerator / denominator` (997/1000 for a 0.3% fee). Rounding is
//! always floor, which is what the AMM does.

use crate::error::ZapError;
use crate::types::{U256, DEFAULT_FEE_AMOUNT_PER_1000};
use anyhow::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeModel {
    numerator: u128,
    denominator: u128,
}

impl FeeModel {
    pub fn new(numerator: u128, denominator: u128) -> Result<Self> {
        if numerator == 0 || denominator == 0 || numerator > denominator {
            return Err(ZapError::InvalidFee {
                numerator,
                denominator,
            }
            .into());
        }
        Ok(Self {
            numerator,
            denominator,
        })
    }

    /// Fee given as an amount taken per 1000 units of input, as OYL pools store it.
    pub fn from_fee_per_1000(fee_amount_per_1000: u128) -> Result<Self> {
        let numerator = 1000u128
            .checked_sub(fee_amount_per_1000)
            .ok_or(ZapError::InvalidFee {
                numerator: 0,
                denominator: 1000,
            })?;
        Self::new(numerator, 1000)
    }

    /// The 0.3% schedule of Uniswap v2 style pools.
    pub fn uniswap_v2() -> Self {
        Self {
            numerator: 997,
            denominator: 1000,
        }
    }

    pub fn numerator(&self) -> u128 {
        self.numerator
    }

    pub fn denominator(&self) -> u128 {
        self.denominator
    }

    /// Net amount that counts towards the swap after the fee is taken,
    /// floored. Swap pricing keeps the unfloored product instead, see
    /// [`crate::amm_logic::get_amount_out`].
    pub fn applied_amount(&self, gross_amount: u128) -> Result<u128> {
        let scaled = U256::from(gross_amount)
            .checked_mul(U256::from(self.numerator))
            .ok_or(ZapError::Overflow)?;
        let net = scaled / U256::from(self.denominator);
        Ok(u128::try_from(net).map_err(|_| ZapError::Overflow)?)
    }
}

impl Default for FeeModel {
    fn default() -> Self {
        Self {
            numerator: 1000 - DEFAULT_FEE_AMOUNT_PER_1000,
            denominator: 1000,
        }
    }
}
