//! Fungible token ledger trait.

use crate::error::LedgerError;
use crate::types::{AccountId, Amount, AssetId};

/// Fungible asset ledger with transfer/approve semantics.
///
/// The ledger is the system of record for every token the vault touches:
/// the deposit asset, strategy position assets, and the investment tokens
/// the nodes themselves mint and burn. Implementations must apply each
/// call atomically — a failed transfer leaves both balances untouched.
pub trait TokenLedger: Send + Sync {
    /// Returns `holder`'s balance of `asset`.
    fn balance_of(&self, asset: &AssetId, holder: &AccountId) -> Amount;

    /// Returns the total outstanding supply of `asset`.
    fn total_supply(&self, asset: &AssetId) -> Amount;

    /// Sets `spender`'s allowance over `owner`'s balance of `asset`.
    fn approve(
        &self,
        asset: &AssetId,
        owner: &AccountId,
        spender: &AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError>;

    /// Returns the remaining allowance from `owner` to `spender`.
    fn allowance(&self, asset: &AssetId, owner: &AccountId, spender: &AccountId) -> Amount;

    /// Moves `amount` of `asset` from `from` to `to`.
    fn transfer(
        &self,
        asset: &AssetId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError>;

    /// Moves `amount` of `asset` from `from` to `to` on behalf of
    /// `spender`, consuming allowance.
    fn transfer_from(
        &self,
        asset: &AssetId,
        spender: &AccountId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError>;

    /// Creates `amount` new units of `asset` in `to`'s balance.
    fn mint(&self, asset: &AssetId, to: &AccountId, amount: Amount) -> Result<(), LedgerError>;

    /// Destroys `amount` units of `asset` from `from`'s balance.
    fn burn(&self, asset: &AssetId, from: &AccountId, amount: Amount) -> Result<(), LedgerError>;
}
