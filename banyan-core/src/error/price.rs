//! Price source error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::AssetId;

/// Price source error type.
///
/// A valuation request never blocks waiting for fresher data: when the
/// caller demands a fresh quote and the source cannot provide one, the
/// request fails with [`PriceError::StaleData`] instead.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceError {
    /// The source has no quote for this asset at all.
    #[error("[Price] No quote available for '{asset}'")]
    Unavailable {
        /// Asset with no quote.
        asset: AssetId,
    },

    /// A fresh quote was demanded but only stale data exists.
    #[error("[Price] Only stale data available for '{asset}'")]
    StaleData {
        /// Asset whose quote is stale.
        asset: AssetId,
    },
}
