//! # Zap Errors
//!
//! Every rejection the zap raises on its own. The `Display` strings are the
//! signals callers match on, so they must not change.
//!
//! Failures reported by the AMM or by the asset transfer layer are passed
//! through `anyhow` untouched; the variants in the AMM section exist so that
//! the pure math in [`crate::amm_logic`] fails with the same text the AMM uses.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ZapError {
    // ========================================================================
    // Request validation
    // ========================================================================
    #[error("Invalid pair address")]
    InvalidPair,

    #[error("Invalid token address")]
    InvalidToken,

    #[error("Invalid amount")]
    InvalidAmount,

    #[error("Invalid to address")]
    InvalidRecipient,

    #[error("EXPIRED")]
    Expired,

    #[error("token not in pair")]
    TokenNotInPair,

    // ========================================================================
    // Lifecycle
    // ========================================================================
    #[error("Invalid router address")]
    InvalidRouter,

    #[error("already initialized")]
    AlreadyInitialized,

    #[error("not initialized")]
    NotInitialized,

    // ========================================================================
    // AMM
    // ========================================================================
    #[error("insufficient input amount")]
    InsufficientInputAmount,

    #[error("insufficient output amount")]
    InsufficientOutputAmount,

    #[error("insufficient amount")]
    InsufficientAmount,

    #[error("insufficient liquidity")]
    InsufficientLiquidity,

    #[error("insufficient liquidity minted")]
    InsufficientLiquidityMinted,

    #[error("insufficient A amount")]
    InsufficientAAmount,

    #[error("insufficient B amount")]
    InsufficientBAmount,

    #[error("invalid fee: {numerator}/{denominator}")]
    InvalidFee { numerator: u128, denominator: u128 },

    // ========================================================================
    // Asset transfers
    // ========================================================================
    #[error("transfer amount exceeds allowance")]
    InsufficientAllowance,

    #[error("transfer amount exceeds balance")]
    InsufficientBalance,

    // ========================================================================
    // Arithmetic and settlement
    // ========================================================================
    #[error("arithmetic overflow")]
    Overflow,

    #[error("division by zero")]
    DivisionByZero,

    #[error("custody not settled: {0}")]
    CustodyNotSettled(String),
}
