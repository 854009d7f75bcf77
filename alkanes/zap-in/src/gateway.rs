use crate::types::{DepositResult, PoolReserves};
use alkanes_support::id::AlkaneId;
use anyhow::Result;

/// The capabilities the zap needs from the external AMM. Implementations must
/// round exactly like the AMM itself, otherwise the split leaves dust behind.
pub trait AmmGateway {
    /// Current reserves, supply and fee schedule of `pair`.
    fn reserves_of(&self, pair: &AlkaneId) -> Result<PoolReserves>;

    /// Swap `amount_in` of `token_in` for the pair's other asset, delivering the
    /// output to `to`. Returns the amount received.
    fn swap(
        &mut self,
        pair: &AlkaneId,
        token_in: &AlkaneId,
        amount_in: u128,
        min_amount_out: u128,
        to: &AlkaneId,
        deadline: u128,
    ) -> Result<u128>;

    /// Deposit both assets in pool order, minting receipt tokens to `to`.
    #[allow(clippy::too_many_arguments)]
    fn deposit(
        &mut self,
        pair: &AlkaneId,
        amount_a_desired: u128,
        amount_b_desired: u128,
        amount_a_min: u128,
        amount_b_min: u128,
        to: &AlkaneId,
        deadline: u128,
    ) -> Result<DepositResult>;
}

/// Fungible asset movements on behalf of the zap's custody account.
pub trait AssetGateway {
    /// Move `amount` of `token` from `from` into custody. Fails unless `from`
    /// authorized at least that much beforehand.
    fn pull(&mut self, token: &AlkaneId, from: &AlkaneId, amount: u128) -> Result<()>;

    /// Let `spender` move up to `amount` of `token` out of custody.
    fn authorize(&mut self, token: &AlkaneId, spender: &AlkaneId, amount: u128) -> Result<()>;

    /// Send `amount` of `token` from custody to `to`.
    ///
    /// Alkanes hosts cannot push tokens to an arbitrary identity: the amount
    /// leaves in the response parcel to the caller's pointer and `to` is only
    /// recorded in the `ZapIn` event.
    fn transfer(&mut self, token: &AlkaneId, to: &AlkaneId, amount: u128) -> Result<()>;

    fn balance_of(&self, token: &AlkaneId, holder: &AlkaneId) -> u128;
}

/// All-or-nothing scope around one request. Hosts that revert failed calls on
/// their own can implement every method as a no-op.
pub trait AtomicScope {
    fn begin(&mut self);
    fn commit(&mut self);
    fn rollback(&mut self);
}

/// Everything a zap request runs against.
pub trait ZapEnvironment: AmmGateway + AssetGateway + AtomicScope {
    /// Current ledger time, compared against request deadlines.
    fn now(&self) -> u128;

    /// The account that holds funds while a request is in flight.
    fn custodian(&self) -> AlkaneId;
}
