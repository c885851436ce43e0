//! Swap engine error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Amount, AssetId};

/// Swap engine error type.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapError {
    /// Realized output fell below the caller's minimum.
    #[error("[Swap] Slippage exceeded: minimum out {minimum_out}, actual out {actual_out}")]
    SlippageExceeded {
        /// Minimum acceptable output.
        minimum_out: Amount,
        /// Output the swap would have produced.
        actual_out: Amount,
    },

    /// The engine has no route between the two assets.
    #[error("[Swap] Unsupported pair '{from}' -> '{to}'")]
    UnsupportedPair {
        /// Input asset.
        from: AssetId,
        /// Output asset.
        to: AssetId,
    },

    /// The route exists but cannot absorb the input size.
    #[error("[Swap] Insufficient liquidity for {amount_in} of '{from}'")]
    InsufficientLiquidity {
        /// Input asset.
        from: AssetId,
        /// Input amount.
        amount_in: Amount,
    },
}
