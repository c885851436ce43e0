//! # Banyan Core
//!
//! Core types, traits, and interfaces for the Banyan multi-strategy
//! investment vault system.
//!
//! This crate provides:
//! - `NewType` wrappers for financial primitives (Amount, Shares,
//!   `AllocationWeight`, `FeeRate`, `AssetId`, `AccountId`)
//! - Error types and handling framework
//! - Trait definitions for the external collaborators every vault node is
//!   wired against (token ledger, price source, swap engine, yield protocol)
//! - Configuration management with YAML/TOML/JSON support, validation, and
//!   environment variable overrides
//!
//! # Architecture
//!
//! Banyan models a vault as a tree of *investable* nodes: leaf strategies
//! hold a position in one external yield protocol, composite portfolios
//! route capital into weighted children. This crate is the bottom layer of
//! that tree — everything here is pure data, pure math, or an injected
//! seam; the node machinery itself lives in `banyan-vault`.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_name_repetitions)]

/// Core type definitions and `NewType` wrappers
pub mod types;

/// Error types and handling
pub mod error;

/// Collaborator trait definitions
pub mod traits;

/// Configuration management
pub mod config;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::*;
    pub use crate::error::*;
    pub use crate::traits::*;
    pub use crate::types::*;
}
