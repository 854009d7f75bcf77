//! # Optimal Split
//!
//! How much of a single-asset contribution to swap so that the unswapped
//! remainder and the swap proceeds match the pool's post-swap reserve ratio.
//!
//! With `r` the input-side reserve, `a` the contribution, `s` the swapped part
//! and a fee model `n / d`, depositing `(a - s, out(s))` against reserves
//! `(r + s, R - out(s))` is balanced exactly when
//!
//! ```text
//! n * s^2 + r * (n + d) * s - r * a * d = 0
//! ```
//!
//! (the other reserve `R` cancels out). The positive root, floored, is
//!
//! ```text
//! s = (isqrt(r * (r * (n + d)^2 + 4 * n * d * a)) - r * (n + d)) / (2 * n)
//! ```
//!
//! which for a 997/1000 fee is the familiar `sqrt(r * (3988009 r + 3988000 a))
//! - 1997 r) / 1994`. Flooring keeps `s` on the side where the quadratic is
//! still non-positive, so the zap never swaps more than the balanced amount.

use crate::amm_logic::integer_sqrt;
use crate::error::ZapError;
use crate::fee::FeeModel;
use crate::types::{SplitResult, U512};
use anyhow::Result;

fn mul(a: U512, b: U512) -> Result<U512> {
    Ok(a.checked_mul(b).ok_or(ZapError::Overflow)?)
}

fn add(a: U512, b: U512) -> Result<U512> {
    Ok(a.checked_add(b).ok_or(ZapError::Overflow)?)
}

/// Split `total_in` of the input asset into the part to swap and the part to
/// keep. A zero swap amount is a valid result: the AMM rejects it when the
/// swap is attempted.
pub fn compute_split(
    reserve_in: u128,
    reserve_out: u128,
    fee: &FeeModel,
    total_in: u128,
) -> Result<SplitResult> {
    if reserve_in == 0 || reserve_out == 0 {
        return Err(ZapError::InsufficientLiquidity.into());
    }
    if total_in == 0 {
        return Err(ZapError::InvalidAmount.into());
    }

    let n = U512::from(fee.numerator());
    let d = U512::from(fee.denominator());
    let r = U512::from(reserve_in);
    let a = U512::from(total_in);

    let fee_sum = add(n, d)?;
    let base = mul(r, fee_sum)?;
    let inner = add(
        mul(base, fee_sum)?,
        mul(mul(mul(U512::from(4u8), n)?, d)?, a)?,
    )?;
    let root = integer_sqrt(mul(r, inner)?);

    let numerator = root.checked_sub(base).ok_or(ZapError::Overflow)?;
    let divisor = mul(U512::from(2u8), n)?;
    let swap = numerator
        .checked_div(divisor)
        .ok_or(ZapError::DivisionByZero)?;

    let swap_amount = u128::try_from(swap).map_err(|_| ZapError::Overflow)?;
    let keep_amount = total_in
        .checked_sub(swap_amount)
        .ok_or(ZapError::Overflow)?;

    Ok(SplitResult {
        swap_amount,
        keep_amount,
    })
}
