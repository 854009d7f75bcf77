//! # Alkanes Environment
//!
//! Runs the zap against the live chain: the OYL factory acts as the AMM
//! router, and custody is the set of alkanes this contract is holding during
//! the current call.
//!
//! Authorization works the alkanes way. A caller "approves" the zap by sending
//! the input alongside the call, so `pull` draws from the incoming parcel; the
//! zap "approves" the router by attaching a parcel to the router call, so
//! `authorize` only records a budget that router calls may not exceed.
//! Everything handed to `transfer` leaves in the response parcel, which the
//! protocol routes back to the caller's pointer.
//!
//! A failed call is reverted by the runtime, so the atomic scope is a no-op.

use crate::error::ZapError;
use crate::gateway::{AmmGateway, AssetGateway, AtomicScope, ZapEnvironment};
use crate::types::{read_id, read_u128, DepositResult, PoolReserves};
use alkanes_runtime::runtime::AlkaneResponder;
use alkanes_support::{
    cellpack::Cellpack,
    context::Context,
    id::AlkaneId,
    parcel::{AlkaneTransfer, AlkaneTransferParcel},
    response::CallResponse,
};
use anyhow::{anyhow, Result};
use std::collections::HashMap;

// OYL factory opcodes
pub const ADD_LIQUIDITY_OPCODE: u128 = 11;
pub const SWAP_EXACT_TOKENS_FOR_TOKENS_OPCODE: u128 = 13;
// OYL pool opcodes
pub const POOL_DETAILS_OPCODE: u128 = 999;

/// Custody of one call: the incoming parcel not yet pulled, what the zap
/// holds, the router's spending budget and the outgoing parcel. Needs no
/// runtime host.
pub struct ParcelLedger {
    router: AlkaneId,
    incoming: Vec<AlkaneTransfer>,
    custody: HashMap<AlkaneId, u128>,
    allowances: HashMap<(AlkaneId, AlkaneId), u128>,
    outgoing: Vec<AlkaneTransfer>,
}

impl ParcelLedger {
    pub fn new(router: AlkaneId, incoming: &AlkaneTransferParcel) -> Self {
        Self {
            router,
            incoming: incoming.0.clone(),
            custody: HashMap::new(),
            allowances: HashMap::new(),
            outgoing: Vec::new(),
        }
    }

    /// Move `amount` of `token` from the incoming parcel into custody, taking
    /// from as many transfers of that token as needed.
    pub fn pull(&mut self, token: &AlkaneId, amount: u128) -> Result<()> {
        let available: u128 = self
            .incoming
            .iter()
            .filter(|t| t.id == *token)
            .map(|t| t.value)
            .sum();
        if available < amount {
            return Err(ZapError::InsufficientAllowance.into());
        }

        let mut remaining = amount;
        for transfer in self.incoming.iter_mut().filter(|t| t.id == *token) {
            let taken = transfer.value.min(remaining);
            transfer.value -= taken;
            remaining -= taken;
            if remaining == 0 {
                break;
            }
        }
        self.credit(*token, amount)
    }

    pub fn authorize(&mut self, token: &AlkaneId, spender: &AlkaneId, amount: u128) {
        self.allowances.insert((*token, *spender), amount);
    }

    pub fn allowance(&self, token: &AlkaneId, spender: &AlkaneId) -> u128 {
        self.allowances.get(&(*token, *spender)).copied().unwrap_or(0)
    }

    /// Take `amount` of `token` out of custody on the router's behalf.
    pub fn spend(&mut self, token: &AlkaneId, amount: u128) -> Result<()> {
        let allowance = self.allowances.entry((*token, self.router)).or_insert(0);
        *allowance = allowance
            .checked_sub(amount)
            .ok_or(ZapError::InsufficientAllowance)?;
        self.debit(*token, amount)
    }

    /// Put everything a router call sent back into custody.
    pub fn absorb(&mut self, response: &CallResponse) -> Result<()> {
        for transfer in &response.alkanes.0 {
            self.credit(transfer.id, transfer.value)?;
        }
        Ok(())
    }

    /// Move `amount` of `token` from custody into the outgoing parcel.
    pub fn transfer(&mut self, token: &AlkaneId, amount: u128) -> Result<()> {
        self.debit(*token, amount)?;
        self.outgoing.push(AlkaneTransfer {
            id: *token,
            value: amount,
        });
        Ok(())
    }

    pub fn custody_of(&self, token: &AlkaneId) -> u128 {
        self.custody.get(token).copied().unwrap_or(0)
    }

    /// Everything leaving with the response: refunds, receipt tokens and any
    /// part of the incoming parcel that was never pulled.
    pub fn into_parcel(self) -> AlkaneTransferParcel {
        let mut transfers = self.outgoing;
        transfers.extend(self.incoming.into_iter().filter(|t| t.value > 0));
        AlkaneTransferParcel(transfers)
    }

    fn credit(&mut self, token: AlkaneId, amount: u128) -> Result<()> {
        let balance = self.custody.entry(token).or_insert(0);
        *balance = balance.checked_add(amount).ok_or(ZapError::Overflow)?;
        Ok(())
    }

    fn debit(&mut self, token: AlkaneId, amount: u128) -> Result<()> {
        let balance = self.custody.entry(token).or_insert(0);
        *balance = balance
            .checked_sub(amount)
            .ok_or(ZapError::InsufficientBalance)?;
        Ok(())
    }
}

/// Total of `token` in a router response.
pub fn received(response: &CallResponse, token: &AlkaneId) -> u128 {
    response
        .alkanes
        .0
        .iter()
        .filter(|t| t.id == *token)
        .map(|t| t.value)
        .sum()
}

pub struct AlkanesEnvironment<'a, R: AlkaneResponder> {
    responder: &'a R,
    router: AlkaneId,
    myself: AlkaneId,
    caller: AlkaneId,
    height: u128,
    ledger: ParcelLedger,
}

impl<'a, R: AlkaneResponder> AlkanesEnvironment<'a, R> {
    pub fn new(responder: &'a R, router: AlkaneId, context: &Context) -> Self {
        Self {
            responder,
            router,
            myself: context.myself,
            caller: context.caller,
            height: responder.height() as u128,
            ledger: ParcelLedger::new(router, &context.incoming_alkanes),
        }
    }

    pub fn into_parcel(self) -> AlkaneTransferParcel {
        self.ledger.into_parcel()
    }

    fn forward_to(&mut self, token: AlkaneId, to: &AlkaneId, amount: u128) -> Result<()> {
        if *to != self.myself && amount > 0 {
            self.ledger.transfer(&token, amount)?;
        }
        Ok(())
    }
}

impl<'a, R: AlkaneResponder> AmmGateway for AlkanesEnvironment<'a, R> {
    fn reserves_of(&self, pair: &AlkaneId) -> Result<PoolReserves> {
        let cellpack = Cellpack {
            target: *pair,
            inputs: vec![POOL_DETAILS_OPCODE],
        };
        let response = self.responder.staticcall(
            &cellpack,
            &AlkaneTransferParcel::default(),
            self.responder.fuel(),
        )?;
        if response.data.len() < 112 {
            return Err(anyhow!("Pool not found at {:?}", pair));
        }
        Ok(PoolReserves::new(
            *pair,
            read_id(&response.data, 0)?,
            read_id(&response.data, 32)?,
            read_u128(&response.data, 64)?,
            read_u128(&response.data, 80)?,
            read_u128(&response.data, 96)?,
        ))
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
        let (_, _, token_out) = self.reserves_of(pair)?.orient(token_in)?;
        self.ledger.spend(token_in, amount_in)?;

        let cellpack = Cellpack {
            target: self.router,
            inputs: vec![
                SWAP_EXACT_TOKENS_FOR_TOKENS_OPCODE,
                2,
                token_in.block,
                token_in.tx,
                token_out.block,
                token_out.tx,
                amount_in,
                min_amount_out,
                deadline,
            ],
        };
        let parcel = AlkaneTransferParcel(vec![AlkaneTransfer {
            id: *token_in,
            value: amount_in,
        }]);
        let response = self
            .responder
            .call(&cellpack, &parcel, self.responder.fuel())?;
        self.ledger.absorb(&response)?;

        let amount_out = received(&response, &token_out);
        if amount_out < min_amount_out {
            return Err(ZapError::InsufficientOutputAmount.into());
        }
        self.forward_to(token_out, to, amount_out)?;
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
        let reserves = self.reserves_of(pair)?;
        let (token_a, token_b) = (reserves.token_a, reserves.token_b);
        self.ledger.spend(&token_a, amount_a_desired)?;
        self.ledger.spend(&token_b, amount_b_desired)?;

        let cellpack = Cellpack {
            target: self.router,
            inputs: vec![
                ADD_LIQUIDITY_OPCODE,
                token_a.block,
                token_a.tx,
                token_b.block,
                token_b.tx,
                amount_a_desired,
                amount_b_desired,
                amount_a_min,
                amount_b_min,
                deadline,
            ],
        };
        let parcel = AlkaneTransferParcel(vec![
            AlkaneTransfer {
                id: token_a,
                value: amount_a_desired,
            },
            AlkaneTransfer {
                id: token_b,
                value: amount_b_desired,
            },
        ]);
        let response = self
            .responder
            .call(&cellpack, &parcel, self.responder.fuel())?;
        self.ledger.absorb(&response)?;

        let amount_a = amount_a_desired
            .checked_sub(received(&response, &token_a))
            .ok_or(ZapError::Overflow)?;
        let amount_b = amount_b_desired
            .checked_sub(received(&response, &token_b))
            .ok_or(ZapError::Overflow)?;
        let liquidity = received(&response, pair);
        self.forward_to(*pair, to, liquidity)?;

        Ok(DepositResult {
            amount_a,
            amount_b,
            liquidity,
        })
    }
}

impl<'a, R: AlkaneResponder> AssetGateway for AlkanesEnvironment<'a, R> {
    fn pull(&mut self, token: &AlkaneId, from: &AlkaneId, amount: u128) -> Result<()> {
        if *from != self.caller {
            return Err(anyhow!("can only pull from the caller, not {:?}", from));
        }
        self.ledger.pull(token, amount)
    }

    fn authorize(&mut self, token: &AlkaneId, spender: &AlkaneId, amount: u128) -> Result<()> {
        self.ledger.authorize(token, spender, amount);
        Ok(())
    }

    /// The response parcel always goes to the caller's pointer, so `to` is
    /// not honoured here; the recipient is only recorded in the `ZapIn` event.
    fn transfer(&mut self, token: &AlkaneId, _to: &AlkaneId, amount: u128) -> Result<()> {
        self.ledger.transfer(token, amount)
    }

    /// Only this contract's own custody is visible from inside a call.
    fn balance_of(&self, token: &AlkaneId, holder: &AlkaneId) -> u128 {
        if *holder != self.myself {
            return 0;
        }
        self.ledger.custody_of(token)
    }
}

impl<'a, R: AlkaneResponder> AtomicScope for AlkanesEnvironment<'a, R> {
    fn begin(&mut self) {}
    fn commit(&mut self) {}
    fn rollback(&mut self) {}
}

impl<'a, R: AlkaneResponder> ZapEnvironment for AlkanesEnvironment<'a, R> {
    fn now(&self) -> u128 {
        self.height
    }

    fn custodian(&self) -> AlkaneId {
        self.myself
    }
}
