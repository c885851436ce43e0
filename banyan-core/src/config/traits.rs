//! Configuration traits.

use crate::error::ConfigError;

/// Trait for types that can be validated after deserialization.
///
/// Deserialization is structural; `validate` enforces the semantic
/// invariants a well-formed configuration must hold (weight sums, rate
/// bounds, non-empty identifiers).
///
/// # Example
///
/// ```
/// use banyan_core::config::Validatable;
/// use banyan_core::error::ConfigError;
///
/// struct PoolConfig {
///     name: String,
/// }
///
/// impl Validatable for PoolConfig {
///     fn validate(&self) -> Result<(), ConfigError> {
///         if self.name.is_empty() {
///             return Err(ConfigError::missing_field("name"));
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Validatable {
    /// Validates the configuration.
    fn validate(&self) -> Result<(), ConfigError>;
}
