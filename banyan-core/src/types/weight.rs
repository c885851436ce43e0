//! Allocation weight type for portfolio routing.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Amount, ValidationError};

/// Fixed-point percentage scale: 100% == `100_000`, giving three decimal
/// digits of percentage precision (30.125% == `30_125`).
pub const PERCENTAGE_SCALE: u32 = 100_000;

/// Allocation weight - the fixed-point percentage of routed deposits a
/// portfolio child receives.
///
/// Weights are used only for *routing* deposits and withdrawals. Valuation
/// always reflects each child's actual holdings, which drift from nominal
/// weights as children earn yield or receive direct deposits.
///
/// # Examples
///
/// ```
/// use banyan_core::types::{AllocationWeight, Amount};
///
/// let weight = AllocationWeight::from_percent(30).unwrap();
/// assert_eq!(weight.apply(Amount::new(1_000_000)), Amount::new(300_000));
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(transparent)]
#[serde(transparent)]
pub struct AllocationWeight(u32);

impl AllocationWeight {
    /// Zero weight constant.
    pub const ZERO: Self = Self(0);

    /// Full (100%) weight constant.
    pub const FULL: Self = Self(PERCENTAGE_SCALE);

    /// Creates a new `AllocationWeight` from fixed-point units.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::WeightExceedsScale`] above 100%.
    pub fn new(fixed_point: u32) -> Result<Self, ValidationError> {
        if fixed_point > PERCENTAGE_SCALE {
            return Err(ValidationError::WeightExceedsScale(fixed_point));
        }
        Ok(Self(fixed_point))
    }

    /// Creates a new `AllocationWeight` from whole percent.
    pub fn from_percent(percent: u32) -> Result<Self, ValidationError> {
        percent
            .checked_mul(PERCENTAGE_SCALE / 100)
            .ok_or(ValidationError::WeightExceedsScale(u32::MAX))
            .and_then(Self::new)
    }

    /// Returns the fixed-point value.
    #[must_use]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    /// Returns true if the weight is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Routes `amount` by this weight, truncating toward zero.
    ///
    /// The 128-bit product of a `u64` amount and a `u32` weight cannot
    /// overflow, and the quotient never exceeds the input, so this is
    /// infallible.
    #[must_use]
    pub fn apply(&self, amount: Amount) -> Amount {
        let product = u128::from(amount.as_u64()) * u128::from(self.0);
        #[allow(clippy::cast_possible_truncation)]
        Amount::new((product / u128::from(PERCENTAGE_SCALE)) as u64)
    }

    /// Sums weights, verifying the total stays within 100%.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::WeightExceedsScale`] when the sum
    /// exceeds the scale.
    pub fn checked_sum<I: IntoIterator<Item = Self>>(weights: I) -> Result<Self, ValidationError> {
        let mut total: u32 = 0;
        for weight in weights {
            total = total
                .checked_add(weight.0)
                .ok_or(ValidationError::WeightExceedsScale(u32::MAX))?;
        }
        Self::new(total)
    }
}

impl fmt::Display for AllocationWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:03}%",
            self.0 / (PERCENTAGE_SCALE / 100),
            self.0 % (PERCENTAGE_SCALE / 100)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_new_bounds() {
        assert!(AllocationWeight::new(PERCENTAGE_SCALE).is_ok());
        assert!(matches!(
            AllocationWeight::new(PERCENTAGE_SCALE + 1),
            Err(ValidationError::WeightExceedsScale(_))
        ));
    }

    #[test]
    fn test_weight_apply_floors() {
        let weight = AllocationWeight::new(33_333).unwrap();
        // 100 * 33333 / 100000 = 33.333 -> 33
        assert_eq!(weight.apply(Amount::new(100)), Amount::new(33));
    }

    #[test]
    fn test_weight_apply_full() {
        let amount = Amount::new(u64::MAX);
        assert_eq!(AllocationWeight::FULL.apply(amount), amount);
    }

    #[test]
    fn test_weight_checked_sum() {
        let weights = [
            AllocationWeight::from_percent(30).unwrap(),
            AllocationWeight::from_percent(70).unwrap(),
        ];
        assert_eq!(
            AllocationWeight::checked_sum(weights).unwrap(),
            AllocationWeight::FULL
        );

        let over = [
            AllocationWeight::from_percent(60).unwrap(),
            AllocationWeight::from_percent(60).unwrap(),
        ];
        assert!(AllocationWeight::checked_sum(over).is_err());
    }

    #[test]
    fn test_weight_display() {
        let weight = AllocationWeight::new(30_125).unwrap();
        assert_eq!(format!("{weight}"), "30.125%");
    }
}
