//! External yield protocol adapter trait.

use crate::error::ProtocolError;
use crate::types::{AccountId, Amount, AssetId};

/// Adapter over one external yield protocol, used only by leaf
/// strategies.
///
/// The protocol's staking and reward mechanics are opaque; the vault only
/// sequences stake/unstake calls and reads the position back. Staked
/// balances may grow on their own as the protocol accrues yield, and a
/// leveraged protocol may report outstanding debt through
/// [`YieldProtocol::liability_balance`].
pub trait YieldProtocol: Send + Sync {
    /// The position asset this adapter manages (e.g. an LP token).
    fn position_asset(&self) -> AssetId;

    /// Stakes `amount` of the position asset out of `account`.
    fn stake(&self, account: &AccountId, amount: Amount) -> Result<(), ProtocolError>;

    /// Unstakes `amount` of the position asset back into `account`.
    ///
    /// Returns the amount actually credited, which may differ from the
    /// request by protocol-side rounding.
    fn unstake(&self, account: &AccountId, amount: Amount) -> Result<Amount, ProtocolError>;

    /// Returns `account`'s currently staked position balance.
    fn staked_balance(&self, account: &AccountId) -> Amount;

    /// Returns `account`'s outstanding debt to the protocol, if any,
    /// as `(debt asset, balance)`. Unleveraged protocols return `None`.
    fn liability_balance(&self, account: &AccountId) -> Option<(AssetId, Amount)>;
}
