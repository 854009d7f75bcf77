//! Common test utilities for zap-in tests
//!
//! `MockLedger` is an in-memory constant-product AMM plus a fungible asset
//! ledger with balances and allowances. It rounds exactly like the OYL factory
//! so tests can assert exact amounts.

// Silence warnings for unused code in the common module
#![allow(dead_code)]

use alkanes_support::id::AlkaneId;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use zap_in_core::amm_logic::{self, integer_sqrt};
use zap_in_core::gateway::{AmmGateway, AssetGateway, AtomicScope, ZapEnvironment};
use zap_in_core::types::U512;
use zap_in_core::{DepositResult, FeeModel, PoolReserves, ZapError, MINIMUM_LIQUIDITY};

pub const E18: u128 = 1_000_000_000_000_000_000;
pub const HEIGHT: u128 = 880_000;
pub const DEADLINE: u128 = HEIGHT + 10;

/// Deterministic id from a short name.
pub fn alkane_id(s: &str) -> AlkaneId {
    let mut block_bytes = [0u8; 16];
    let s_bytes = s.as_bytes();
    let len = s_bytes.len().min(16);
    block_bytes[..len].copy_from_slice(&s_bytes[..len]);
    let block = u128::from_le_bytes(block_bytes);
    AlkaneId { block, tx: 0 }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MockPool {
    pub token_a: AlkaneId,
    pub token_b: AlkaneId,
    pub reserve_a: u128,
    pub reserve_b: u128,
    pub total_supply: u128,
    pub fee: FeeModel,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerState {
    /// (token, holder) -> balance
    pub balances: HashMap<(AlkaneId, AlkaneId), u128>,
    /// (token, owner, spender) -> allowance
    pub allowances: HashMap<(AlkaneId, AlkaneId, AlkaneId), u128>,
    pub pools: HashMap<AlkaneId, MockPool>,
}

pub struct MockLedger {
    pub state: LedgerState,
    snapshot: Option<LedgerState>,
    pub height: u128,
    pub zap: AlkaneId,
    pub router: AlkaneId,
    /// Make the next deposit fail after the swap went through.
    pub fail_deposit: bool,
    /// Reserve moves (added to reserve A, reserve B) that land between the
    /// zap reading the pool and its swap or deposit.
    pub drift_before_swap: Option<(u128, u128)>,
    pub drift_before_deposit: Option<(u128, u128)>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            state: LedgerState::default(),
            snapshot: None,
            height: HEIGHT,
            zap: alkane_id("zap_contract"),
            router: alkane_id("oyl_factory"),
            fail_deposit: false,
            drift_before_swap: None,
            drift_before_deposit: None,
        }
    }

    pub fn mint(&mut self, token: AlkaneId, holder: AlkaneId, amount: u128) {
        *self.state.balances.entry((token, holder)).or_insert(0) += amount;
    }

    /// Let the zap pull `amount` of `token` from `owner`.
    pub fn approve(&mut self, token: AlkaneId, owner: AlkaneId, amount: u128) {
        self.state.allowances.insert((token, owner, self.zap), amount);
    }

    pub fn add_pool(
        &mut self,
        pair: AlkaneId,
        token_a: AlkaneId,
        token_b: AlkaneId,
        reserve_a: u128,
        reserve_b: u128,
    ) {
        self.add_pool_with_fee(pair, token_a, token_b, reserve_a, reserve_b, FeeModel::default());
    }

    pub fn add_pool_with_fee(
        &mut self,
        pair: AlkaneId,
        token_a: AlkaneId,
        token_b: AlkaneId,
        reserve_a: u128,
        reserve_b: u128,
        fee: FeeModel,
    ) {
        let supply = integer_sqrt(U512::from(reserve_a) * U512::from(reserve_b));
        let total_supply = u128::try_from(supply).unwrap();
        self.state.pools.insert(
            pair,
            MockPool {
                token_a,
                token_b,
                reserve_a,
                reserve_b,
                total_supply,
                fee,
            },
        );
    }

    pub fn pool(&self, pair: &AlkaneId) -> &MockPool {
        &self.state.pools[pair]
    }

    pub fn balance(&self, token: &AlkaneId, holder: &AlkaneId) -> u128 {
        self.state
            .balances
            .get(&(*token, *holder))
            .copied()
            .unwrap_or(0)
    }

    pub fn allowance(&self, token: &AlkaneId, owner: &AlkaneId, spender: &AlkaneId) -> u128 {
        self.state
            .allowances
            .get(&(*token, *owner, *spender))
            .copied()
            .unwrap_or(0)
    }

    fn credit(&mut self, token: AlkaneId, holder: AlkaneId, amount: u128) {
        *self.state.balances.entry((token, holder)).or_insert(0) += amount;
    }

    fn debit(&mut self, token: AlkaneId, holder: AlkaneId, amount: u128) -> Result<()> {
        let balance = self.state.balances.entry((token, holder)).or_insert(0);
        *balance = balance
            .checked_sub(amount)
            .ok_or(ZapError::InsufficientBalance)?;
        Ok(())
    }

    fn spend_allowance(
        &mut self,
        token: AlkaneId,
        owner: AlkaneId,
        spender: AlkaneId,
        amount: u128,
    ) -> Result<()> {
        let allowance = self
            .state
            .allowances
            .entry((token, owner, spender))
            .or_insert(0);
        *allowance = allowance
            .checked_sub(amount)
            .ok_or(ZapError::InsufficientAllowance)?;
        Ok(())
    }

    fn apply_drift(&mut self, pair: &AlkaneId, drift: Option<(u128, u128)>) {
        if let (Some((da, db)), Some(pool)) = (drift, self.state.pools.get_mut(pair)) {
            pool.reserve_a += da;
            pool.reserve_b += db;
        }
    }

    fn check_deadline(&self, deadline: u128) -> Result<()> {
        if deadline <= self.height {
            return Err(ZapError::Expired.into());
        }
        Ok(())
    }
}

impl AmmGateway for MockLedger {
    fn reserves_of(&self, pair: &AlkaneId) -> Result<PoolReserves> {
        let pool = self
            .state
            .pools
            .get(pair)
            .ok_or_else(|| anyhow!("Pool not found: {:?}", pair))?;
        Ok(PoolReserves::new(
            *pair,
            pool.token_a,
            pool.token_b,
            pool.reserve_a,
            pool.reserve_b,
            pool.total_supply,
        )
        .with_fee(pool.fee))
    }

    fn swap(
        &mut self,
        pair: &AlkaneId,
        token_in: &AlkaneId,
        amount_in: u128,
        min_amount_out: u128,
        to: &AlkaneId,
        deadline: u128,
    ) -> Result<u128> {
        self.check_deadline(deadline)?;
        self.apply_drift(pair, self.drift_before_swap);
        let reserves = self.reserves_of(pair)?;
        let (reserve_in, reserve_out, token_out) = reserves.orient(token_in)?;
        let amount_out =
            amm_logic::get_amount_out(amount_in, reserve_in, reserve_out, &reserves.fee)?;
        if amount_out < min_amount_out {
            return Err(ZapError::InsufficientOutputAmount.into());
        }

        let (zap, router) = (self.zap, self.router);
        self.spend_allowance(*token_in, zap, router, amount_in)?;
        self.debit(*token_in, zap, amount_in)?;

        let pool = self
            .state
            .pools
            .get_mut(pair)
            .ok_or_else(|| anyhow!("Pool not found: {:?}", pair))?;
        if reserves.is_token_a(token_in) {
            pool.reserve_a += amount_in;
            pool.reserve_b -= amount_out;
        } else {
            pool.reserve_b += amount_in;
            pool.reserve_a -= amount_out;
        }
        self.credit(token_out, *to, amount_out);
        Ok(amount_out)
    }

    fn deposit(
        &mut self,
        pair: &AlkaneId,
        amount_a_desired: u128,
        amount_b_desired: u128,
        amount_a_min: u128,
        amount_b_min: u128,
        to: &AlkaneId,
        deadline: u128,
    ) -> Result<DepositResult> {
        if self.fail_deposit {
            return Err(anyhow!("deposit rejected"));
        }
        self.check_deadline(deadline)?;
        self.apply_drift(pair, self.drift_before_deposit);
        let reserves = self.reserves_of(pair)?;
        let (amount_a, amount_b) = amm_logic::optimal_deposit(
            amount_a_desired,
            amount_b_desired,
            amount_a_min,
            amount_b_min,
            reserves.reserve_a,
            reserves.reserve_b,
        )?;
        let liquidity = amm_logic::liquidity_minted(
            amount_a,
            amount_b,
            reserves.reserve_a,
            reserves.reserve_b,
            reserves.total_supply,
        )?;

        let (zap, router) = (self.zap, self.router);
        self.spend_allowance(reserves.token_a, zap, router, amount_a)?;
        self.spend_allowance(reserves.token_b, zap, router, amount_b)?;
        self.debit(reserves.token_a, zap, amount_a)?;
        self.debit(reserves.token_b, zap, amount_b)?;

        let pool = self
            .state
            .pools
            .get_mut(pair)
            .ok_or_else(|| anyhow!("Pool not found: {:?}", pair))?;
        pool.reserve_a += amount_a;
        pool.reserve_b += amount_b;
        if pool.total_supply == 0 {
            pool.total_supply += MINIMUM_LIQUIDITY;
        }
        pool.total_supply += liquidity;
        self.credit(*pair, *to, liquidity);

        Ok(DepositResult {
            amount_a,
            amount_b,
            liquidity,
        })
    }
}

impl AssetGateway for MockLedger {
    fn pull(&mut self, token: &AlkaneId, from: &AlkaneId, amount: u128) -> Result<()> {
        let zap = self.zap;
        self.spend_allowance(*token, *from, zap, amount)?;
        self.debit(*token, *from, amount)?;
        self.credit(*token, zap, amount);
        Ok(())
    }

    fn authorize(&mut self, token: &AlkaneId, spender: &AlkaneId, amount: u128) -> Result<()> {
        self.state
            .allowances
            .insert((*token, self.zap, *spender), amount);
        Ok(())
    }

    fn transfer(&mut self, token: &AlkaneId, to: &AlkaneId, amount: u128) -> Result<()> {
        let zap = self.zap;
        self.debit(*token, zap, amount)?;
        self.credit(*token, *to, amount);
        Ok(())
    }

    fn balance_of(&self, token: &AlkaneId, holder: &AlkaneId) -> u128 {
        self.balance(token, holder)
    }
}

impl AtomicScope for MockLedger {
    fn begin(&mut self) {
        self.snapshot = Some(self.state.clone());
    }

    fn commit(&mut self) {
        self.snapshot = None;
    }

    fn rollback(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            self.state = snapshot;
        }
    }
}

impl ZapEnvironment for MockLedger {
    fn now(&self) -> u128 {
        self.height
    }

    fn custodian(&self) -> AlkaneId {
        self.zap
    }
}

/// Two assets, one pool, and a funded user who approved the zap for
/// `approved` of asset A.
pub struct Scenario {
    pub ledger: MockLedger,
    pub user: AlkaneId,
    pub recipient: AlkaneId,
    pub token_a: AlkaneId,
    pub token_b: AlkaneId,
    pub pair: AlkaneId,
}

pub fn setup_scenario(reserve_a: u128, reserve_b: u128, fee: FeeModel, funded: u128) -> Scenario {
    let mut ledger = MockLedger::new();
    let user = alkane_id("user");
    let recipient = alkane_id("recipient");
    let token_a = alkane_id("TOKEN_A");
    let token_b = alkane_id("TOKEN_B");
    let pair = alkane_id("A_B_POOL");

    ledger.add_pool_with_fee(pair, token_a, token_b, reserve_a, reserve_b, fee);
    ledger.mint(token_a, user, funded);
    ledger.mint(token_b, user, funded);
    ledger.approve(token_a, user, funded);
    ledger.approve(token_b, user, funded);

    Scenario {
        ledger,
        user,
        recipient,
        token_a,
        token_b,
        pair,
    }
}
