//! Shares type for representing investment-token balances.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::Amount;
use crate::error::MathError;

/// Shares type - investment-token balances in base units.
///
/// Shares use the same decimal precision as the deposit asset, so the
/// bootstrap mint is exactly 1:1. The distinct wrapper keeps share counts
/// from being confused with asset values in the proportional-claim math;
/// conversion happens only at the token-ledger boundary, where the
/// investment token is just another fungible asset.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(transparent)]
#[serde(transparent)]
pub struct Shares(u64);

impl Shares {
    /// Zero shares constant.
    pub const ZERO: Self = Self(0);

    /// Creates a new `Shares` from base units.
    #[must_use]
    pub const fn new(base_units: u64) -> Self {
        Self(base_units)
    }

    /// Returns the underlying base-unit value.
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Returns true if the share count is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Reinterprets the share count as a token amount, for ledger calls.
    #[must_use]
    pub const fn as_amount(&self) -> Amount {
        Amount::new(self.0)
    }

    /// Reinterprets a token amount as a share count.
    #[must_use]
    pub const fn from_amount(amount: Amount) -> Self {
        Self(amount.as_u64())
    }

    /// Checked addition.
    pub fn checked_add(self, rhs: Self) -> Result<Self, MathError> {
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .ok_or(MathError::Overflow {
                operation: "share addition".to_string(),
            })
    }

    /// Full-precision `self * numerator / denominator`, truncated toward
    /// zero.
    pub fn mul_div_floor(self, numerator: u64, denominator: u64) -> Result<Self, MathError> {
        self.as_amount()
            .mul_div_floor(numerator, denominator)
            .map(Self::from_amount)
    }
}

impl fmt::Display for Shares {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Shares {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(Self)
    }
}

impl From<Shares> for u64 {
    fn from(shares: Shares) -> Self {
        shares.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shares_amount_conversion() {
        let shares = Shares::new(5_000_000);
        assert_eq!(shares.as_amount(), Amount::new(5_000_000));
        assert_eq!(Shares::from_amount(Amount::new(7)), Shares::new(7));
    }

    #[test]
    fn test_shares_mul_div_floor() {
        // 100 shares * 50 equity / 200 supply -> 25
        let result = Shares::new(100).mul_div_floor(50, 200).unwrap();
        assert_eq!(result, Shares::new(25));
    }

    #[test]
    fn test_shares_serde_roundtrip() {
        let shares = Shares::new(123);
        let json = serde_json::to_string(&shares).unwrap();
        let parsed: Shares = serde_json::from_str(&json).unwrap();
        assert_eq!(shares, parsed);
    }
}
