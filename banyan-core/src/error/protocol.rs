//! External yield protocol error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Amount, AssetId};

/// Yield protocol adapter error type.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolError {
    /// The protocol rejected a stake request.
    #[error("[Protocol] Stake of {amount} rejected: {reason}")]
    StakeRejected {
        /// Amount that was being staked.
        amount: Amount,
        /// Protocol-reported reason.
        reason: String,
    },

    /// The protocol rejected an unstake request.
    #[error("[Protocol] Unstake of {amount} rejected: {reason}")]
    UnstakeRejected {
        /// Amount that was being unstaked.
        amount: Amount,
        /// Protocol-reported reason.
        reason: String,
    },

    /// The adapter's position asset does not match the strategy
    /// configuration.
    #[error("[Protocol] Position asset mismatch: expected '{expected}', adapter reports '{actual}'")]
    PositionAssetMismatch {
        /// Asset the strategy was configured for.
        expected: AssetId,
        /// Asset the adapter actually manages.
        actual: AssetId,
    },
}
