//! Valuation snapshot types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use banyan_core::error::VaultError;
use banyan_core::types::{Amount, AssetId, Shares};

/// A raw holding: how much of an asset a node controls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetBalance {
    /// The held asset.
    pub asset: AssetId,
    /// Balance in the asset's own base units.
    pub balance: Amount,
}

/// A marked holding: what a balance is worth in accounting-asset terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetValuation {
    /// The valued asset.
    pub asset: AssetId,
    /// Value in accounting-asset base units.
    pub valuation: Amount,
}

/// A node's complete valuation, computed on demand and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuationSnapshot {
    /// Raw asset holdings.
    pub asset_balances: Vec<AssetBalance>,
    /// Marked asset holdings.
    pub asset_valuations: Vec<AssetValuation>,
    /// Raw liabilities.
    pub liability_balances: Vec<AssetBalance>,
    /// Marked liabilities.
    pub liability_valuations: Vec<AssetValuation>,
    /// `Σ asset valuations − Σ liability valuations`, floored at zero.
    pub equity_valuation: Amount,
}

impl ValuationSnapshot {
    /// Assembles a snapshot, computing equity from the marked legs.
    ///
    /// Liabilities exceeding assets floor equity at zero rather than
    /// underflowing; that state is logged, because a pool underwater
    /// against its own debt cannot price shares meaningfully.
    pub fn from_parts(
        asset_balances: Vec<AssetBalance>,
        asset_valuations: Vec<AssetValuation>,
        liability_balances: Vec<AssetBalance>,
        liability_valuations: Vec<AssetValuation>,
    ) -> Result<Self, VaultError> {
        let assets = Amount::checked_sum(asset_valuations.iter().map(|v| v.valuation))?;
        let liabilities = Amount::checked_sum(liability_valuations.iter().map(|v| v.valuation))?;
        if liabilities > assets {
            warn!(
                target: "banyan::valuation",
                assets = %assets,
                liabilities = %liabilities,
                "liabilities exceed assets; equity floored at zero"
            );
        }
        Ok(Self {
            asset_balances,
            asset_valuations,
            liability_balances,
            liability_valuations,
            equity_valuation: assets.saturating_sub(liabilities),
        })
    }
}

/// Equity value of one share in human units, or `None` with zero supply.
///
/// `scale` is the decimal precision of the accounting asset (6 for a
/// USDC-style token). This is a reporting view; all claim math stays in
/// integer base units.
#[must_use]
pub fn price_per_share(equity: Amount, supply: Shares, scale: u32) -> Option<Decimal> {
    if supply.is_zero() {
        return None;
    }
    equity
        .to_decimal(scale)
        .checked_div(supply.as_amount().to_decimal(scale))
}
