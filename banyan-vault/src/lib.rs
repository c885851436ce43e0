//! # Banyan Vault
//!
//! The vault accounting and valuation engine for the Banyan
//! multi-strategy investment system.
//!
//! This crate provides:
//! - [`ShareLedger`] - proportional share minting and burning
//! - [`FeeEngine`] - pluggable deposit/withdrawal/performance fees with
//!   accrual and receiver-gated claims
//! - [`LimitGuard`] - total and per-address investment ceilings
//! - [`Investable`] - the capability every node in the vault tree exposes
//! - [`Portfolio`] - composite node routing capital into weighted children
//! - [`Strategy`] - leaf node staking into one external yield protocol
//! - [`InMemoryTokenLedger`] - an in-process reference token ledger
//!
//! # Architecture
//!
//! A vault is a tree of investable nodes. Depositors put the accounting
//! asset into any node and receive that node's investment token — a
//! fungible, proportional, non-dilutable claim on the node's equity.
//! Portfolios fan deposits out to children by allocation weight and value
//! themselves bottom-up from their actual child holdings; strategies
//! convert deposits into an external protocol position through a swap
//! capability.
//!
//! Execution is transaction-serial: each state-mutating call runs to
//! completion under a per-node reentrancy lock and either fully commits
//! or unwinds everything it did.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_name_repetitions)]

mod events;
mod fees;
mod investable;
mod ledger;
mod limits;
mod portfolio;
mod shares;
mod strategy;
mod valuation;

pub use events::{EventLog, EventRecord, VaultEvent};
pub use fees::{FeeEngine, FeeState};
pub use investable::{Investable, NodeDescriptor, NodeStatus};
pub use ledger::InMemoryTokenLedger;
pub use limits::LimitGuard;
pub use portfolio::Portfolio;
pub use shares::ShareLedger;
pub use strategy::Strategy;
pub use valuation::{price_per_share, AssetBalance, AssetValuation, ValuationSnapshot};

#[cfg(test)]
pub(crate) mod testing;
