//! Account identifier type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;

/// `AccountId` - identifies a ledger account.
///
/// Depositors, fee receivers, node owners, and the nodes' own treasury
/// accounts are all `AccountId`s. Signing and wallet concerns live outside
/// the engine; an `AccountId` is just a validated address string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Creates a new `AccountId` from a string.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyAccountId` if the string is empty,
    /// or `ValidationError::InvalidAccountId` on characters other than
    /// alphanumerics, hyphens, underscores, and colons.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if s.is_empty() {
            return Err(ValidationError::EmptyAccountId);
        }
        if !s
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == ':')
        {
            return Err(ValidationError::InvalidAccountId(s));
        }
        Ok(Self(s))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if this identifier is valid.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty()
            && self
                .0
                .chars()
                .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == ':')
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AccountId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_id_valid() {
        let account = AccountId::new("vault:main-pool").unwrap();
        assert_eq!(account.as_str(), "vault:main-pool");
    }

    #[test]
    fn test_account_id_rejects_empty() {
        assert!(matches!(
            AccountId::new(""),
            Err(ValidationError::EmptyAccountId)
        ));
    }
}
