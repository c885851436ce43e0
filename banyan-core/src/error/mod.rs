//! Error types and handling framework.
//!
//! This module provides a hierarchical error type system with
//! domain-specific error categories for the Banyan vault system.
//!
//! # Error Hierarchy
//!
//! - [`VaultError`] - Top-level error type for every node operation
//!   - [`LedgerError`] - Token ledger failures (balance, allowance)
//!   - [`PriceError`] - Price source failures (unavailable, stale)
//!   - [`SwapError`] - Swap engine failures (slippage, liquidity)
//!   - [`ProtocolError`] - External yield protocol failures
//!   - [`ConfigError`] - Configuration errors
//!   - [`MathError`] - Checked-arithmetic failures
//!
//! Collaborator failures are propagated verbatim through `#[from]`
//! conversions — a caller that hits a slippage limit sees the swap
//! engine's own error, not a vault-flavored paraphrase of it. Locally
//! detectable rule violations (zero amounts, limits, pause,
//! authorization, reentrancy) get their own specific variants.

mod config;
mod ledger;
mod price;
mod protocol;
mod swap;

pub use config::ConfigError;
pub use ledger::LedgerError;
pub use price::PriceError;
pub use protocol::ProtocolError;
pub use swap::SwapError;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{AccountId, Amount, ValidationError};

/// Checked-arithmetic error.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MathError {
    /// Arithmetic overflow.
    #[error("[Math] Overflow during {operation}")]
    Overflow {
        /// Operation that overflowed.
        operation: String,
    },

    /// Arithmetic underflow (unsigned subtraction below zero).
    #[error("[Math] Underflow during {operation}")]
    Underflow {
        /// Operation that underflowed.
        operation: String,
    },

    /// Division by zero.
    #[error("[Math] Division by zero during {operation}")]
    DivisionByZero {
        /// Operation that divided by zero.
        operation: String,
    },
}

/// Top-level error type for vault node operations.
///
/// # Examples
///
/// ```
/// use banyan_core::error::VaultError;
/// use banyan_core::types::Amount;
///
/// let error = VaultError::TotalInvestmentLimitExceeded {
///     limit: Amount::new(49_000_000),
///     attempted: Amount::new(50_000_000),
/// };
/// assert!(error.to_string().contains("total investment limit"));
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultError {
    /// Deposit called with a zero amount.
    #[error("[Vault] Zero amount deposited")]
    ZeroAmountDeposited,

    /// Withdraw called with zero shares.
    #[error("[Vault] Zero amount withdrawn")]
    ZeroAmountWithdrawn,

    /// The proportional mint would issue zero shares.
    #[error("[Vault] Deposit of {deposit} would issue zero shares")]
    ZeroSharesIssued {
        /// Deposit value that floored to zero shares.
        deposit: Amount,
    },

    /// An amount became zero somewhere downstream (e.g. a conversion
    /// through a low-liquidity pool) and the operation must fail rather
    /// than proceed silently.
    #[error("[Vault] Amount {amount} is too small to process")]
    AmountTooSmall {
        /// Amount that rounded away.
        amount: Amount,
    },

    /// Deposit would push pooled value above the total investment limit.
    #[error("[Vault] Deposit would exceed the total investment limit: limit {limit}, attempted total {attempted}")]
    TotalInvestmentLimitExceeded {
        /// Configured total limit.
        limit: Amount,
        /// Total that the deposit would have produced.
        attempted: Amount,
    },

    /// Deposit would push the receiver's invested value above the
    /// per-address limit.
    #[error("[Vault] Deposit would exceed the per-address investment limit: limit {limit}, attempted balance {attempted}")]
    InvestmentLimitPerAddressExceeded {
        /// Configured per-address limit.
        limit: Amount,
        /// Depositor value that the deposit would have produced.
        attempted: Amount,
    },

    /// Node is paused; deposits, withdrawals, and fee claims are refused.
    #[error("[Vault] Node is paused")]
    Paused,

    /// Node is already in the requested pause state.
    #[error("[Vault] Node is not paused")]
    NotPaused,

    /// Caller is not authorized for a privileged operation.
    #[error("[Vault] Account '{account}' is not authorized")]
    Unauthorized {
        /// The rejected caller.
        account: AccountId,
    },

    /// A state-mutating entry point was re-entered while already held.
    #[error("[Vault] Reentrant call rejected")]
    ReentrantCall,

    /// Referenced portfolio child does not exist.
    #[error("[Vault] Unknown child node '{name}'")]
    ChildNotFound {
        /// Child node name.
        name: String,
    },

    /// Portfolio child still holds invested value and cannot be removed.
    #[error("[Vault] Child node '{name}' still holds invested value")]
    ChildStillInvested {
        /// Child node name.
        name: String,
    },

    /// Token ledger failure, propagated verbatim.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Price source failure, propagated verbatim.
    #[error(transparent)]
    Price(#[from] PriceError),

    /// Swap engine failure, propagated verbatim.
    #[error(transparent)]
    Swap(#[from] SwapError),

    /// Yield protocol failure, propagated verbatim.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Arithmetic failure.
    #[error(transparent)]
    Math(#[from] MathError),

    /// Value-type validation failure.
    #[error("[Vault] Validation failed: {0}")]
    Validation(#[from] ValidationError),
}
