//! Token ledger error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{AccountId, Amount, AssetId};

/// Token ledger error type covering balance, allowance, and supply
/// failures.
///
/// These surface unmodified to vault callers: a deposit that pulls more
/// than the depositor approved fails with the ledger's own
/// `InsufficientAllowance`, exactly as the ledger reported it.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerError {
    /// Account balance is lower than the transfer amount.
    #[error("[Ledger] Insufficient balance of '{asset}' for '{account}': balance {balance}, required {required}")]
    InsufficientBalance {
        /// Asset being moved.
        asset: AssetId,
        /// Account short of funds.
        account: AccountId,
        /// Current balance.
        balance: Amount,
        /// Amount the operation required.
        required: Amount,
    },

    /// Spender allowance is lower than the transfer amount.
    #[error("[Ledger] Insufficient allowance of '{asset}' from '{owner}' to '{spender}': allowance {allowance}, required {required}")]
    InsufficientAllowance {
        /// Asset being moved.
        asset: AssetId,
        /// Account that granted the allowance.
        owner: AccountId,
        /// Account attempting to spend.
        spender: AccountId,
        /// Current allowance.
        allowance: Amount,
        /// Amount the operation required.
        required: Amount,
    },

    /// A balance or total supply would overflow.
    #[error("[Ledger] Balance overflow for '{asset}'")]
    BalanceOverflow {
        /// Asset whose balance or supply overflowed.
        asset: AssetId,
    },
}
