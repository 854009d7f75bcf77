use crate::error::ZapError;
use crate::fee::FeeModel;
use alkanes_support::id::AlkaneId;
use anyhow::{anyhow, Result};
use ruint::Uint;

pub type U256 = Uint<256, 4>;
pub type U512 = Uint<512, 8>;

// Constants for the zap contract
pub const DEFAULT_FEE_AMOUNT_PER_1000: u128 = 5; // 0.5% fee
pub const BASIS_POINTS: u128 = 10000; // 100% in basis points
pub const MINIMUM_LIQUIDITY: u128 = 1000; // Locked on the first deposit into a pool
pub const DEFAULT_SWAP_SLIPPAGE_BPS: u128 = 50;
pub const DEFAULT_DEPOSIT_SLIPPAGE_BPS: u128 = 50;

/// The all-zero id, used as "no address".
pub const NULL_ID: AlkaneId = AlkaneId { block: 0, tx: 0 };

pub fn is_null(id: &AlkaneId) -> bool {
    id.block == 0 && id.tx == 0
}

/// Snapshot of a constant-product pool as reported by the AMM.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolReserves {
    pub pool: AlkaneId,
    pub token_a: AlkaneId,
    pub token_b: AlkaneId,
    pub reserve_a: u128,
    pub reserve_b: u128,
    pub total_supply: u128,
    pub fee: FeeModel,
}

impl PoolReserves {
    pub fn new(
        pool: AlkaneId,
        token_a: AlkaneId,
        token_b: AlkaneId,
        reserve_a: u128,
        reserve_b: u128,
        total_supply: u128,
    ) -> Self {
        Self {
            pool,
            token_a,
            token_b,
            reserve_a,
            reserve_b,
            total_supply,
            fee: FeeModel::default(),
        }
    }

    pub fn with_fee(mut self, fee: FeeModel) -> Self {
        self.fee = fee;
        self
    }

    pub fn get_reserve_for_token(&self, token: &AlkaneId) -> Option<u128> {
        if *token == self.token_a {
            Some(self.reserve_a)
        } else if *token == self.token_b {
            Some(self.reserve_b)
        } else {
            None
        }
    }

    /// The pool seen from `token_in`: `(reserve_in, reserve_out, token_out)`.
    pub fn orient(&self, token_in: &AlkaneId) -> Result<(u128, u128, AlkaneId)> {
        if *token_in == self.token_a {
            Ok((self.reserve_a, self.reserve_b, self.token_b))
        } else if *token_in == self.token_b {
            Ok((self.reserve_b, self.reserve_a, self.token_a))
        } else {
            Err(ZapError::TokenNotInPair.into())
        }
    }

    pub fn is_token_a(&self, token: &AlkaneId) -> bool {
        *token == self.token_a
    }
}

/// A single-sided deposit as submitted by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ZapRequest {
    pub pair: AlkaneId,
    pub token: AlkaneId,
    pub amount: u128,
    pub to: AlkaneId,
    pub deadline: u128,
}

impl ZapRequest {
    pub fn new(pair: AlkaneId, token: AlkaneId, amount: u128, to: AlkaneId, deadline: u128) -> Self {
        Self {
            pair,
            token,
            amount,
            to,
            deadline,
        }
    }

    /// Checks run before any funds move, in a fixed order so the first broken
    /// field decides the signal.
    pub fn validate(&self, now: u128) -> Result<(), ZapError> {
        if is_null(&self.pair) {
            return Err(ZapError::InvalidPair);
        }
        if is_null(&self.token) {
            return Err(ZapError::InvalidToken);
        }
        if self.amount == 0 {
            return Err(ZapError::InvalidAmount);
        }
        if is_null(&self.to) {
            return Err(ZapError::InvalidRecipient);
        }
        if self.deadline <= now {
            return Err(ZapError::Expired);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitResult {
    pub swap_amount: u128,
    pub keep_amount: u128,
}

/// What the AMM actually took and minted for a deposit, in pool order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositResult {
    pub amount_a: u128,
    pub amount_b: u128,
    pub liquidity: u128,
}

/// The `ZapIn` event: emitted once for every successful deposit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZapOutcome {
    pub sender: AlkaneId,
    pub recipient: AlkaneId,
    pub pool: AlkaneId,
    pub minted: u128,
}

impl ZapOutcome {
    pub const ENCODED_LEN: usize = 16 * 7;

    pub fn encode(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(Self::ENCODED_LEN);
        for id in [&self.sender, &self.recipient, &self.pool] {
            data.extend_from_slice(&encode_id(id));
        }
        data.extend_from_slice(&self.minted.to_le_bytes());
        data
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < Self::ENCODED_LEN {
            return Err(anyhow!(
                "ZapIn event too short: {} < {}",
                data.len(),
                Self::ENCODED_LEN
            ));
        }
        Ok(Self {
            sender: read_id(data, 0)?,
            recipient: read_id(data, 32)?,
            pool: read_id(data, 64)?,
            minted: read_u128(data, 96)?,
        })
    }
}

/// Read-only preview of a zap against the current reserves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZapQuote {
    pub pair: AlkaneId,
    pub token: AlkaneId,
    pub amount: u128,
    pub swap_amount: u128,
    pub keep_amount: u128,
    pub expected_out: u128,
    pub deposit_in: u128,
    pub deposit_out: u128,
    pub expected_liquidity: u128,
    pub dust_in: u128,
    pub dust_out: u128,
}

impl ZapQuote {
    pub fn encode(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(16 * 8);
        for word in [
            self.swap_amount,
            self.keep_amount,
            self.expected_out,
            self.deposit_in,
            self.deposit_out,
            self.expected_liquidity,
            self.dust_in,
            self.dust_out,
        ] {
            data.extend_from_slice(&word.to_le_bytes());
        }
        data
    }
}

/// 32 bytes: block then tx, little-endian. The layout of stored ids and of
/// ids in response data.
pub fn encode_id(id: &AlkaneId) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(32);
    bytes.extend_from_slice(&id.block.to_le_bytes());
    bytes.extend_from_slice(&id.tx.to_le_bytes());
    bytes
}

pub(crate) fn read_u128(data: &[u8], offset: usize) -> Result<u128> {
    let bytes = data
        .get(offset..offset + 16)
        .ok_or_else(|| anyhow!("short read at offset {}", offset))?;
    Ok(u128::from_le_bytes(bytes.try_into()?))
}

pub(crate) fn read_id(data: &[u8], offset: usize) -> Result<AlkaneId> {
    Ok(AlkaneId {
        block: read_u128(data, offset)?,
        tx: read_u128(data, offset + 16)?,
    })
}
