//! Amount type for representing accounting-asset values.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::MathError;

/// Amount type - accounting-asset values in unsigned base units.
///
/// A vault denominated in a 6-decimal asset stores `3000` tokens as
/// `3_000_000_000` base units. Amounts are always non-negative; debts are
/// modeled as liability entries, never as negative amounts.
///
/// Arithmetic is checked: overflow is a [`MathError`], never a wrap-around.
/// Proportional math ([`Amount::mul_div_floor`]) multiplies in 128 bits
/// before dividing and truncates toward zero.
///
/// # Examples
///
/// ```
/// use banyan_core::types::Amount;
///
/// let deposit = Amount::new(3_000_000_000);
/// let supply = Amount::new(1_000_000);
/// let equity = Amount::new(2_000_000);
/// // deposit * supply / equity, full precision
/// assert_eq!(
///     deposit.mul_div_floor(supply.as_u64(), equity.as_u64()).unwrap(),
///     Amount::new(1_500_000_000)
/// );
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(transparent)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    /// Zero amount constant.
    pub const ZERO: Self = Self(0);

    /// Maximum representable amount.
    pub const MAX: Self = Self(u64::MAX);

    /// Creates a new `Amount` from base units.
    #[must_use]
    pub const fn new(base_units: u64) -> Self {
        Self(base_units)
    }

    /// Returns the underlying base-unit value.
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Returns true if the amount is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked addition.
    pub fn checked_add(self, rhs: Self) -> Result<Self, MathError> {
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .ok_or(MathError::Overflow {
                operation: "amount addition".to_string(),
            })
    }

    /// Checked subtraction.
    pub fn checked_sub(self, rhs: Self) -> Result<Self, MathError> {
        self.0
            .checked_sub(rhs.0)
            .map(Self)
            .ok_or(MathError::Underflow {
                operation: "amount subtraction".to_string(),
            })
    }

    /// Saturating subtraction, floored at zero.
    #[must_use]
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    /// Full-precision `self * numerator / denominator`, truncated toward
    /// zero.
    ///
    /// The product is computed in 128 bits, so it cannot overflow before
    /// the division. Fails with [`MathError::DivisionByZero`] when
    /// `denominator == 0` and with [`MathError::Overflow`] when the
    /// quotient does not fit back into 64 bits.
    pub fn mul_div_floor(self, numerator: u64, denominator: u64) -> Result<Self, MathError> {
        if denominator == 0 {
            return Err(MathError::DivisionByZero {
                operation: "amount mul_div".to_string(),
            });
        }
        let product = u128::from(self.0) * u128::from(numerator);
        let quotient = product / u128::from(denominator);
        u64::try_from(quotient)
            .map(Self)
            .map_err(|_| MathError::Overflow {
                operation: "amount mul_div".to_string(),
            })
    }

    /// Sums an iterator of amounts, failing on overflow.
    pub fn checked_sum<I: IntoIterator<Item = Self>>(amounts: I) -> Result<Self, MathError> {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, Self::checked_add)
    }

    /// Converts to a [`Decimal`] in human units for the given scale.
    ///
    /// A 6-decimal asset amount of `3_000_000_000` base units converts to
    /// `3000.000000`.
    #[must_use]
    pub fn to_decimal(self, scale: u32) -> Decimal {
        Decimal::from_i128_with_scale(i128::from(self.0), scale)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(Self)
    }
}

impl From<Amount> for u64 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}
