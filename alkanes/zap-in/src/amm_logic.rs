//! # AMM Logic
//!
//! The external AMM's own integer formulas, reproduced bit-for-bit. The split
//! calculation, quotes and the test ledger all go through these functions so
//! that what the zap predicts is exactly what the AMM will do; any rounding
//! mismatch would show up as stranded dust.
//!
//! All intermediate products are computed in 256-bit integers with checked
//! arithmetic. Overflow is an error, never a saturated value.

use crate::error::ZapError;
use crate::fee::FeeModel;
use crate::types::{BASIS_POINTS, MINIMUM_LIQUIDITY, U256, U512};
use anyhow::Result;

fn mul(a: U256, b: U256) -> Result<U256> {
    Ok(a.checked_mul(b).ok_or(ZapError::Overflow)?)
}

fn add(a: U256, b: U256) -> Result<U256> {
    Ok(a.checked_add(b).ok_or(ZapError::Overflow)?)
}

fn div(a: U256, b: U256) -> Result<U256> {
    Ok(a.checked_div(b).ok_or(ZapError::DivisionByZero)?)
}

fn narrow(value: U256) -> Result<u128> {
    Ok(u128::try_from(value).map_err(|_| ZapError::Overflow)?)
}

/// Output of a single constant-product swap, fee taken on the input.
///
/// `out = in * n * reserve_out / (reserve_in * d + in * n)` for a fee model
/// of `n / d`, floored. The gross input is scaled by `n` inside the single
/// division, so the net input is never floored first and
/// [`FeeModel::applied_amount`] is not used here.
pub fn get_amount_out(
    amount_in: u128,
    reserve_in: u128,
    reserve_out: u128,
    fee: &FeeModel,
) -> Result<u128> {
    if amount_in == 0 {
        return Err(ZapError::InsufficientInputAmount.into());
    }
    if reserve_in == 0 || reserve_out == 0 {
        return Err(ZapError::InsufficientLiquidity.into());
    }

    let amount_in_with_fee = mul(U256::from(amount_in), U256::from(fee.numerator()))?;
    let numerator = mul(amount_in_with_fee, U256::from(reserve_out))?;
    let denominator = add(
        mul(U256::from(reserve_in), U256::from(fee.denominator()))?,
        amount_in_with_fee,
    )?;

    narrow(div(numerator, denominator)?)
}

/// Amount of the other asset matching `amount_a` at the current reserve ratio.
pub fn quote(amount_a: u128, reserve_a: u128, reserve_b: u128) -> Result<u128> {
    if amount_a == 0 {
        return Err(ZapError::InsufficientAmount.into());
    }
    if reserve_a == 0 || reserve_b == 0 {
        return Err(ZapError::InsufficientLiquidity.into());
    }
    narrow(div(
        mul(U256::from(amount_a), U256::from(reserve_b))?,
        U256::from(reserve_a),
    )?)
}

/// The amounts the AMM router actually takes from a deposit of up to
/// `(desired_a, desired_b)`. One side is always taken in full; the other is
/// cut down to the pool ratio and must still clear its minimum.
pub fn optimal_deposit(
    desired_a: u128,
    desired_b: u128,
    min_a: u128,
    min_b: u128,
    reserve_a: u128,
    reserve_b: u128,
) -> Result<(u128, u128)> {
    if reserve_a == 0 && reserve_b == 0 {
        return Ok((desired_a, desired_b));
    }

    let b_optimal = quote(desired_a, reserve_a, reserve_b)?;
    if b_optimal <= desired_b {
        if b_optimal < min_b {
            return Err(ZapError::InsufficientBAmount.into());
        }
        return Ok((desired_a, b_optimal));
    }

    let a_optimal = quote(desired_b, reserve_b, reserve_a)?;
    if a_optimal > desired_a || a_optimal < min_a {
        return Err(ZapError::InsufficientAAmount.into());
    }
    Ok((a_optimal, desired_b))
}

/// Receipt tokens minted for a deposit of `(amount_a, amount_b)`.
///
/// The first deposit into an empty pool mints the geometric mean minus
/// [`MINIMUM_LIQUIDITY`], which stays locked in the pool.
pub fn liquidity_minted(
    amount_a: u128,
    amount_b: u128,
    reserve_a: u128,
    reserve_b: u128,
    total_supply: u128,
) -> Result<u128> {
    let liquidity = if total_supply == 0 {
        let root = integer_sqrt(U512::from(amount_a) * U512::from(amount_b));
        let root = u128::try_from(root).map_err(|_| ZapError::Overflow)?;
        root.saturating_sub(MINIMUM_LIQUIDITY)
    } else {
        let from_a = div(
            mul(U256::from(amount_a), U256::from(total_supply))?,
            U256::from(reserve_a),
        )?;
        let from_b = div(
            mul(U256::from(amount_b), U256::from(total_supply))?,
            U256::from(reserve_b),
        )?;
        narrow(from_a.min(from_b))?
    };

    if liquidity == 0 {
        return Err(ZapError::InsufficientLiquidityMinted.into());
    }
    Ok(liquidity)
}

/// `amount` reduced by `slippage_bps` basis points, floored.
pub fn apply_slippage(amount: u128, slippage_bps: u128) -> Result<u128> {
    let keep_bps = BASIS_POINTS
        .checked_sub(slippage_bps)
        .ok_or(ZapError::Overflow)?;
    narrow(div(
        mul(U256::from(amount), U256::from(keep_bps))?,
        U256::from(BASIS_POINTS),
    )?)
}

/// Integer square root (floor) using the Babylonian method.
pub fn integer_sqrt(n: U512) -> U512 {
    if n.is_zero() {
        return U512::ZERO;
    }
    let mut x = n;
    let mut y = (x >> 1usize) + (n & U512::from(1u8));
    while y < x {
        x = y;
        y = (x + n / x) >> 1usize;
    }
    x
}
