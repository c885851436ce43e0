//! Vault event types and the per-node event log.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

use banyan_core::types::{AccountId, Amount, Shares};

/// An observable state transition on a vault node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VaultEvent {
    /// A deposit was accepted and shares were minted.
    Deposit {
        /// Account the deposit was pulled from.
        sender: AccountId,
        /// Account the shares were minted to.
        receiver: AccountId,
        /// Gross deposit amount.
        amount: Amount,
    },
    /// Shares were burned and proceeds paid out.
    Withdrawal {
        /// Account the shares were burned from.
        sender: AccountId,
        /// Account the proceeds were paid to.
        receiver: AccountId,
        /// Share amount burned.
        shares: Shares,
    },
    /// Accumulated fees were claimed by the fee receiver.
    FeeClaim {
        /// The fee receiver.
        receiver: AccountId,
        /// Amount paid out.
        amount: Amount,
    },
    /// A performance fee was accrued against organic profit.
    PerformanceFeeAccrued {
        /// Profit the fee was charged on.
        profit: Amount,
        /// Accrued fee amount.
        fee: Amount,
    },
    /// The node was paused.
    Paused {
        /// Account that paused the node.
        by: AccountId,
    },
    /// The node was unpaused.
    Unpaused {
        /// Account that unpaused the node.
        by: AccountId,
    },
    /// The node configuration was replaced by an upgrade.
    Reinitialized {
        /// New version string.
        version: String,
    },
    /// A portfolio realigned its children toward target allocations.
    Rebalanced {
        /// Total value moved between children.
        moved: Amount,
    },
}

/// One entry of a node's event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Monotonically increasing sequence number, per node.
    pub sequence: u64,
    /// The recorded event.
    pub event: VaultEvent,
}

/// Append-only, sequence-numbered event log.
///
/// There is no wall clock in the engine; ordering is the sequence number.
/// Every append also emits a structured tracing event so deployments get
/// the transitions in their logs without polling the node.
#[derive(Debug, Default)]
pub struct EventLog {
    records: RwLock<Vec<EventRecord>>,
}

impl EventLog {
    /// Creates an empty event log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event, assigning the next sequence number.
    pub fn record(&self, node: &str, event: VaultEvent) {
        let mut records = self.records.write();
        let sequence = records.len() as u64;
        info!(target: "banyan::events", node, sequence, event = ?event);
        records.push(EventRecord { sequence, event });
    }

    /// Returns a copy of every recorded event.
    #[must_use]
    pub fn records(&self) -> Vec<EventRecord> {
        self.records.read().clone()
    }

    /// Returns the most recent event, if any.
    #[must_use]
    pub fn last(&self) -> Option<EventRecord> {
        self.records.read().last().cloned()
    }

    /// Returns the number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}
