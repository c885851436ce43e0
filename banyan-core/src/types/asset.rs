//! Asset identifier type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;

/// `AssetId` - identifies a fungible token on the ledger.
///
/// Both the deposit asset ("USDC"), strategy position assets
/// ("STG-LP-USDC"), and every node's investment token are addressed by
/// `AssetId`.
///
/// # Examples
///
/// ```
/// use banyan_core::types::AssetId;
///
/// let asset = AssetId::new("USDC").unwrap();
/// assert_eq!(asset.as_str(), "USDC");
/// assert!(AssetId::new("").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    /// Creates a new `AssetId` from a string.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyAssetId` if the string is empty, or
    /// `ValidationError::InvalidAssetId` if it contains characters other
    /// than alphanumerics, hyphens, and underscores.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if s.is_empty() {
            return Err(ValidationError::EmptyAssetId);
        }
        if !s
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ValidationError::InvalidAssetId(s));
        }
        Ok(Self(s))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if this identifier is valid.
    ///
    /// Deserialized values bypass construction, so configuration
    /// validation re-checks through this.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty()
            && self
                .0
                .chars()
                .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AssetId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_id_valid() {
        let asset = AssetId::new("STG-LP_USDC1").unwrap();
        assert!(asset.is_valid());
    }

    #[test]
    fn test_asset_id_rejects_empty_and_invalid() {
        assert!(matches!(
            AssetId::new(""),
            Err(ValidationError::EmptyAssetId)
        ));
        assert!(matches!(
            AssetId::new("US DC"),
            Err(ValidationError::InvalidAssetId(_))
        ));
    }

    #[test]
    fn test_asset_id_serde_roundtrip() {
        let asset = AssetId::new("USDC").unwrap();
        let json = serde_json::to_string(&asset).unwrap();
        assert_eq!(json, "\"USDC\"");
        let parsed: AssetId = serde_json::from_str(&json).unwrap();
        assert_eq!(asset, parsed);
    }
}
