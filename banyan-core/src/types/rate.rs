//! Fee rate type.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Amount, ValidationError, PERCENTAGE_SCALE};

/// Fee rate - a fixed-point percentage charged on a principal amount.
///
/// Shares the `100_000` scale with [`super::AllocationWeight`], so a 0.3%
/// fee is `300`. Applying a rate floors, which keeps the quoted fee at or
/// below the exact proportion and therefore always ≤ principal.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(transparent)]
#[serde(transparent)]
pub struct FeeRate(u32);

impl FeeRate {
    /// Zero rate constant.
    pub const ZERO: Self = Self(0);

    /// Creates a new `FeeRate` from fixed-point units.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::RateExceedsScale`] above 100%.
    pub fn new(fixed_point: u32) -> Result<Self, ValidationError> {
        if fixed_point > PERCENTAGE_SCALE {
            return Err(ValidationError::RateExceedsScale(fixed_point));
        }
        Ok(Self(fixed_point))
    }

    /// Creates a new `FeeRate` from basis points (1 bp == 0.01%).
    pub fn from_basis_points(bps: u32) -> Result<Self, ValidationError> {
        bps.checked_mul(PERCENTAGE_SCALE / 10_000)
            .ok_or(ValidationError::RateExceedsScale(u32::MAX))
            .and_then(Self::new)
    }

    /// Returns the fixed-point value.
    #[must_use]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    /// Returns true if the rate is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Quotes the fee for `principal`, truncating toward zero.
    #[must_use]
    pub fn apply(&self, principal: Amount) -> Amount {
        let product = u128::from(principal.as_u64()) * u128::from(self.0);
        #[allow(clippy::cast_possible_truncation)]
        Amount::new((product / u128::from(PERCENTAGE_SCALE)) as u64)
    }
}

impl fmt::Display for FeeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:03}%",
            self.0 / (PERCENTAGE_SCALE / 100),
            self.0 % (PERCENTAGE_SCALE / 100)
        )
    }
}
