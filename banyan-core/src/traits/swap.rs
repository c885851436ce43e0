//! Swap engine trait.

use crate::error::SwapError;
use crate::types::{AccountId, Amount, AssetId};

/// Converts one asset into another on behalf of a ledger account.
///
/// The engine moves the tokens itself: on success, `account` has paid
/// `amount_in` of `from` and received the returned amount of `to`.
/// Slippage protection is the engine's responsibility — an execution that
/// would return less than `minimum_out` fails with
/// [`SwapError::SlippageExceeded`] and moves nothing.
pub trait SwapEngine: Send + Sync {
    /// Swaps `amount_in` of `from` into `to` for `account`.
    ///
    /// Returns the realized output amount.
    fn swap(
        &self,
        account: &AccountId,
        from: &AssetId,
        to: &AssetId,
        amount_in: Amount,
        minimum_out: Amount,
    ) -> Result<Amount, SwapError>;
}
