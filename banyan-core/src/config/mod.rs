//! Configuration management module.
//!
//! This module provides the typed configuration every vault node is
//! constructed (and later reinitialized) with, plus a loader supporting:
//! - YAML, TOML, and JSON configuration file formats
//! - Configuration validation with descriptive error messages
//! - Environment variable overrides for deployment-specific values
//!
//! Fee formulas are a tagged union of concrete policies selected at
//! construction time ([`FeePolicy`]) rather than runtime-decoded
//! parameter blobs.
//!
//! # Example
//!
//! ```rust,ignore
//! use banyan_core::config::{ConfigLoader, PortfolioConfig};
//!
//! let config: PortfolioConfig = ConfigLoader::new()
//!     .with_env_prefix("BANYAN")
//!     .load_validated("pool.toml")?;
//! ```

mod loader;
mod node;
mod traits;

pub use loader::{ConfigFormat, ConfigLoader};
pub use node::{
    ChildAllocation, FeeConfig, FeePolicy, FeeTier, LimitConfig, NodeConfig, PortfolioConfig,
    StrategyConfig,
};
pub use traits::Validatable;
