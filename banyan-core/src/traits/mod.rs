//! Collaborator trait definitions.
//!
//! Every vault node is wired against four injected seams:
//!
//! - [`TokenLedger`] - the fungible asset ledger holding deposit assets,
//!   position assets, and every node's investment token
//! - [`PriceSource`] - values an asset quantity in accounting-asset terms
//! - [`SwapEngine`] - converts between assets with slippage protection
//! - [`YieldProtocol`] - stakes and unstakes a leaf strategy's position
//!
//! All four are synchronous: the ledger processes one state-mutating call
//! at a time to completion, so there is no async surface to await on. Each
//! trait carries its own error type, and those errors cross the vault
//! boundary unmodified.

mod ledger;
mod price;
mod protocol;
mod swap;

pub use ledger::TokenLedger;
pub use price::{PriceQuote, PriceSource, ValuationMode};
pub use protocol::YieldProtocol;
pub use swap::SwapEngine;
