//! # Zap Orchestrator
//!
//! Runs one single-sided deposit from validation to the `ZapIn` event:
//!
//! ```text
//! Validating -> FundsPulled -> ReservesRead -> Split -> Swapped -> Deposited -> Completed
//!      \____________\______________\____________\_________\___________\______-> Failed
//! ```
//!
//! Each step performs the action that moves the request into the next stage.
//! Any error moves it to `Failed`, and the environment's atomic scope is
//! rolled back so no fund pull, swap or deposit survives. Errors from the AMM
//! and the asset layer are returned unchanged.

use crate::amm_logic;
use crate::error::ZapError;
use crate::gateway::{AmmGateway, ZapEnvironment};
use crate::lifecycle::ZapConfig;
use crate::split::compute_split;
use crate::types::{
    is_null, DepositResult, PoolReserves, SplitResult, ZapOutcome, ZapQuote, ZapRequest,
    BASIS_POINTS, DEFAULT_DEPOSIT_SLIPPAGE_BPS, DEFAULT_SWAP_SLIPPAGE_BPS,
};
use alkanes_support::id::AlkaneId;
use anyhow::{anyhow, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZapStage {
    Validating,
    FundsPulled,
    ReservesRead,
    Split,
    Swapped,
    Deposited,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZapOrchestrator {
    pub router: AlkaneId,
    pub swap_slippage_bps: u128,
    pub deposit_slippage_bps: u128,
}

impl ZapOrchestrator {
    pub fn new(router: AlkaneId) -> Self {
        Self {
            router,
            swap_slippage_bps: DEFAULT_SWAP_SLIPPAGE_BPS,
            deposit_slippage_bps: DEFAULT_DEPOSIT_SLIPPAGE_BPS,
        }
    }

    pub fn from_config(config: &ZapConfig) -> Result<Self> {
        Ok(Self::new(config.router()?))
    }

    pub fn with_swap_slippage(mut self, swap_slippage_bps: u128) -> Self {
        self.swap_slippage_bps = swap_slippage_bps;
        self
    }

    pub fn with_deposit_slippage(mut self, deposit_slippage_bps: u128) -> Self {
        self.deposit_slippage_bps = deposit_slippage_bps;
        self
    }

    /// Deposit `request.amount` of a single asset into `request.pair`, minting
    /// receipt tokens to `request.to`. Either every step happens or none does.
    pub fn single_token_add_liquidity<E: ZapEnvironment>(
        &self,
        env: &mut E,
        sender: AlkaneId,
        request: &ZapRequest,
    ) -> Result<ZapOutcome> {
        if self.swap_slippage_bps > BASIS_POINTS || self.deposit_slippage_bps > BASIS_POINTS {
            return Err(anyhow!("Max slippage cannot exceed 100%"));
        }

        let mut execution = ZapExecution::new(*self, sender, request.clone());
        env.begin();
        match execution.run(env) {
            Ok(outcome) => {
                env.commit();
                zap_log!(
                    "zap-in: minted {} to {:?} from pool {:?}",
                    outcome.minted,
                    outcome.recipient,
                    outcome.pool
                );
                Ok(outcome)
            }
            Err(e) => {
                env.rollback();
                zap_log!("zap-in: failed at {:?}: {}", execution.failed_at, e);
                Err(e)
            }
        }
    }

    /// Preview of what [`Self::single_token_add_liquidity`] would do against
    /// the pool as it is now. Nothing is moved.
    pub fn quote<A: AmmGateway + ?Sized>(
        &self,
        amm: &A,
        pair: AlkaneId,
        token: AlkaneId,
        amount: u128,
    ) -> Result<ZapQuote> {
        if is_null(&pair) {
            return Err(ZapError::InvalidPair.into());
        }
        if is_null(&token) {
            return Err(ZapError::InvalidToken.into());
        }
        if amount == 0 {
            return Err(ZapError::InvalidAmount.into());
        }

        let reserves = amm.reserves_of(&pair)?;
        let (reserve_in, reserve_out, _) = reserves.orient(&token)?;
        let split = compute_split(reserve_in, reserve_out, &reserves.fee, amount)?;
        let expected_out =
            amm_logic::get_amount_out(split.swap_amount, reserve_in, reserve_out, &reserves.fee)?;

        let post_in = reserve_in
            .checked_add(split.swap_amount)
            .ok_or(ZapError::Overflow)?;
        let post_out = reserve_out - expected_out;
        let (deposit_in, deposit_out) = amm_logic::optimal_deposit(
            split.keep_amount,
            expected_out,
            0,
            0,
            post_in,
            post_out,
        )?;
        let expected_liquidity = amm_logic::liquidity_minted(
            deposit_in,
            deposit_out,
            post_in,
            post_out,
            reserves.total_supply,
        )?;

        Ok(ZapQuote {
            pair,
            token,
            amount,
            swap_amount: split.swap_amount,
            keep_amount: split.keep_amount,
            expected_out,
            deposit_in,
            deposit_out,
            expected_liquidity,
            dust_in: split.keep_amount - deposit_in,
            dust_out: expected_out - deposit_out,
        })
    }
}

/// State carried between the stages of one request.
struct ZapExecution {
    config: ZapOrchestrator,
    sender: AlkaneId,
    request: ZapRequest,
    stage: ZapStage,
    failed_at: ZapStage,
    opening_custody: (u128, u128),
    reserves: Option<PoolReserves>,
    token_out: Option<AlkaneId>,
    split: Option<SplitResult>,
    amount_out: u128,
    deposit: Option<DepositResult>,
    outcome: Option<ZapOutcome>,
}

impl ZapExecution {
    fn new(config: ZapOrchestrator, sender: AlkaneId, request: ZapRequest) -> Self {
        Self {
            config,
            sender,
            request,
            stage: ZapStage::Validating,
            failed_at: ZapStage::Validating,
            opening_custody: (0, 0),
            reserves: None,
            token_out: None,
            split: None,
            amount_out: 0,
            deposit: None,
            outcome: None,
        }
    }

    fn run<E: ZapEnvironment>(&mut self, env: &mut E) -> Result<ZapOutcome> {
        while self.stage != ZapStage::Completed {
            if let Err(e) = self.step(env) {
                self.failed_at = self.stage;
                self.stage = ZapStage::Failed;
                return Err(e);
            }
        }
        self.outcome
            .clone()
            .ok_or_else(|| anyhow!("zap completed without an outcome"))
    }

    fn step<E: ZapEnvironment>(&mut self, env: &mut E) -> Result<()> {
        let next = match self.stage {
            ZapStage::Validating => {
                self.request.validate(env.now())?;
                let custodian = env.custodian();
                self.opening_custody.0 = env.balance_of(&self.request.token, &custodian);
                env.pull(&self.request.token, &self.sender, self.request.amount)?;
                env.authorize(&self.request.token, &self.config.router, self.request.amount)?;
                ZapStage::FundsPulled
            }
            ZapStage::FundsPulled => {
                let reserves = env.reserves_of(&self.request.pair)?;
                let (reserve_in, reserve_out, token_out) = reserves.orient(&self.request.token)?;
                if reserve_in == 0 || reserve_out == 0 {
                    return Err(ZapError::InsufficientLiquidity.into());
                }
                let custodian = env.custodian();
                self.opening_custody.1 = env.balance_of(&token_out, &custodian);
                self.token_out = Some(token_out);
                self.reserves = Some(reserves);
                ZapStage::ReservesRead
            }
            ZapStage::ReservesRead => {
                let reserves = self.reserves()?;
                let (reserve_in, reserve_out, _) = reserves.orient(&self.request.token)?;
                self.split = Some(compute_split(
                    reserve_in,
                    reserve_out,
                    &reserves.fee,
                    self.request.amount,
                )?);
                ZapStage::Split
            }
            ZapStage::Split => {
                let split = self.split()?;
                let min_amount_out = self.swap_minimum(split.swap_amount)?;
                let custodian = env.custodian();
                self.amount_out = env.swap(
                    &self.request.pair,
                    &self.request.token,
                    split.swap_amount,
                    min_amount_out,
                    &custodian,
                    self.request.deadline,
                )?;
                ZapStage::Swapped
            }
            ZapStage::Swapped => {
                let split = self.split()?;
                let token_out = self.token_out()?;
                env.authorize(&token_out, &self.config.router, self.amount_out)?;

                let (desired_a, desired_b) = if self.reserves()?.is_token_a(&self.request.token) {
                    (split.keep_amount, self.amount_out)
                } else {
                    (self.amount_out, split.keep_amount)
                };
                let deposit = env.deposit(
                    &self.request.pair,
                    desired_a,
                    desired_b,
                    amm_logic::apply_slippage(desired_a, self.config.deposit_slippage_bps)?,
                    amm_logic::apply_slippage(desired_b, self.config.deposit_slippage_bps)?,
                    &self.request.to,
                    self.request.deadline,
                )?;
                if deposit.liquidity == 0 {
                    return Err(ZapError::InsufficientLiquidityMinted.into());
                }
                self.deposit = Some(deposit);
                ZapStage::Deposited
            }
            ZapStage::Deposited => {
                self.settle(env)?;
                ZapStage::Completed
            }
            ZapStage::Completed | ZapStage::Failed => return Ok(()),
        };
        zap_log!("zap-in: {:?} -> {:?}", self.stage, next);
        self.stage = next;
        Ok(())
    }

    /// Minimum accepted for the swap leg. A zero-sized swap is passed straight
    /// through so the AMM can reject it with its own error.
    fn swap_minimum(&self, swap_amount: u128) -> Result<u128> {
        if swap_amount == 0 {
            return Ok(0);
        }
        let reserves = self.reserves()?;
        let (reserve_in, reserve_out, _) = reserves.orient(&self.request.token)?;
        let expected = amm_logic::get_amount_out(swap_amount, reserve_in, reserve_out, &reserves.fee)?;
        amm_logic::apply_slippage(expected, self.config.swap_slippage_bps)
    }

    /// Refund whatever the deposit did not take, revoke the router's remaining
    /// allowance and check custody is back where it started.
    fn settle<E: ZapEnvironment>(&mut self, env: &mut E) -> Result<()> {
        let split = self.split()?;
        let deposit = self.deposit.ok_or_else(|| anyhow!("missing deposit result"))?;
        let token_in = self.request.token;
        let token_out = self.token_out()?;

        let (used_in, used_out) = if self.reserves()?.is_token_a(&token_in) {
            (deposit.amount_a, deposit.amount_b)
        } else {
            (deposit.amount_b, deposit.amount_a)
        };
        let dust_in = split
            .keep_amount
            .checked_sub(used_in)
            .ok_or(ZapError::Overflow)?;
        let dust_out = self
            .amount_out
            .checked_sub(used_out)
            .ok_or(ZapError::Overflow)?;

        if dust_in > 0 {
            env.transfer(&token_in, &self.sender, dust_in)?;
        }
        if dust_out > 0 {
            env.transfer(&token_out, &self.sender, dust_out)?;
        }
        env.authorize(&token_in, &self.config.router, 0)?;
        env.authorize(&token_out, &self.config.router, 0)?;

        let custodian = env.custodian();
        let closing = (
            env.balance_of(&token_in, &custodian),
            env.balance_of(&token_out, &custodian),
        );
        if closing != self.opening_custody {
            return Err(ZapError::CustodyNotSettled(format!(
                "opened with {:?}, closing with {:?}",
                self.opening_custody, closing
            ))
            .into());
        }

        self.outcome = Some(ZapOutcome {
            sender: self.sender,
            recipient: self.request.to,
            pool: self.request.pair,
            minted: deposit.liquidity,
        });
        Ok(())
    }

    fn reserves(&self) -> Result<&PoolReserves> {
        self.reserves
            .as_ref()
            .ok_or_else(|| anyhow!("reserves not read"))
    }

    fn split(&self) -> Result<SplitResult> {
        self.split.ok_or_else(|| anyhow!("split not computed"))
    }

    fn token_out(&self) -> Result<AlkaneId> {
        self.token_out.ok_or_else(|| anyhow!("paired token unknown"))
    }
}
