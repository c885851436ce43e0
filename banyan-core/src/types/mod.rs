//! `NewType` wrappers for financial primitives.
//!
//! This module provides type-safe wrappers around unsigned base-unit values
//! to prevent mixing incompatible quantities at compile time.
//!
//! # Types
//!
//! - [`Amount`] - Accounting-asset values in base units
//! - [`Shares`] - Investment-token (share) balances in base units
//! - [`AllocationWeight`] - Fixed-point allocation percentages
//! - [`FeeRate`] - Fixed-point fee percentages
//! - [`AssetId`] - Token identifiers
//! - [`AccountId`] - Account/address identifiers
//!
//! All proportional math multiplies before dividing in 128-bit
//! intermediates and truncates toward zero, so a claim can round down but
//! never round up against the pool.

mod account;
mod amount;
mod asset;
mod rate;
mod shares;
mod weight;

pub use account::AccountId;
pub use amount::Amount;
pub use asset::AssetId;
pub use rate::FeeRate;
pub use shares::Shares;
pub use weight::{AllocationWeight, PERCENTAGE_SCALE};

/// Validation error for `NewType` construction.
#[derive(
    Debug, Clone, PartialEq, Eq, thiserror::Error, serde::Serialize, serde::Deserialize,
)]
pub enum ValidationError {
    /// Asset identifier is empty
    #[error("asset identifier cannot be empty")]
    EmptyAssetId,

    /// Asset identifier contains invalid characters
    #[error("invalid asset identifier: {0}")]
    InvalidAssetId(String),

    /// Account identifier is empty
    #[error("account identifier cannot be empty")]
    EmptyAccountId,

    /// Account identifier contains invalid characters
    #[error("invalid account identifier: {0}")]
    InvalidAccountId(String),

    /// Allocation weight exceeds 100%
    #[error("allocation weight {0} exceeds the {PERCENTAGE_SCALE} scale")]
    WeightExceedsScale(u32),

    /// Fee rate exceeds 100%
    #[error("fee rate {0} exceeds the {PERCENTAGE_SCALE} scale")]
    RateExceedsScale(u32),
}
