//! Price source trait and valuation modes.

use serde::{Deserialize, Serialize};

use crate::error::PriceError;
use crate::types::{Amount, AssetId};

/// How a valuation should be computed.
///
/// Two independent flags, both chosen by the caller of every valuation
/// query:
///
/// - `use_cache` selects the source's cached quote versus a freshly
///   fetched one. A fresh request that cannot be satisfied fails — the
///   engine never blocks waiting for data.
/// - `conservative` is a mark-direction hint: a conservative view marks
///   assets low. When valuing liabilities the engine flips the hint, so a
///   conservative equity figure never understates what is owed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValuationMode {
    /// Use the source's cached quote instead of fetching a fresh one.
    pub use_cache: bool,
    /// Mark in the direction that understates equity.
    pub conservative: bool,
}

impl ValuationMode {
    /// Cached, neutral-bias valuation - the default view the deposit and
    /// withdrawal pipelines price shares against.
    #[must_use]
    pub const fn cached() -> Self {
        Self {
            use_cache: true,
            conservative: false,
        }
    }

    /// Freshly fetched, neutral-bias valuation.
    #[must_use]
    pub const fn fresh() -> Self {
        Self {
            use_cache: false,
            conservative: false,
        }
    }

    /// Returns the same mode with the conservative flag set.
    #[must_use]
    pub const fn with_conservative(mut self, conservative: bool) -> Self {
        self.conservative = conservative;
        self
    }

    /// Returns the mode with the mark direction inverted, used when
    /// valuing liabilities.
    #[must_use]
    pub const fn flipped(mut self) -> Self {
        self.conservative = !self.conservative;
        self
    }
}

impl Default for ValuationMode {
    fn default() -> Self {
        Self::cached()
    }
}

/// A quote from the price source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// Value of the quoted quantity, in accounting-asset base units.
    pub value: Amount,
    /// Whether the quote was freshly fetched rather than served from
    /// cache.
    pub fresh: bool,
}

/// Values an asset quantity in accounting-asset terms.
///
/// The source's internal computation (oracle aggregation, TWAP windows,
/// cache policy) is opaque to the vault; the contract is only that a
/// `use_cache == false` request either returns `fresh == true` or fails
/// with [`PriceError::StaleData`].
pub trait PriceSource: Send + Sync {
    /// Quotes `quantity` of `asset` under the given mode.
    fn quote(
        &self,
        asset: &AssetId,
        quantity: Amount,
        mode: ValuationMode,
    ) -> Result<PriceQuote, PriceError>;
}
