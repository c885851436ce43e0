//! Fee quoting, accrual, and claims.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use banyan_core::config::{FeeConfig, FeePolicy};
use banyan_core::error::VaultError;
use banyan_core::types::{AccountId, Amount};

/// Running fee totals for one node.
///
/// `accumulated` and `claimed` are monotone except that a claim moves
/// value from the former to the latter. The performance checkpoint is the
/// node's equity as of the last performance accrual, adjusted for
/// deposit/withdrawal flows so that only organic profit is ever charged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeState {
    /// Accrued but not yet claimed fees.
    pub accumulated: Amount,
    /// Lifetime claimed fees.
    pub claimed: Amount,
    /// Flow-adjusted equity at the last performance accrual.
    pub performance_checkpoint: Amount,
}

/// Computes, accrues, and tracks fees for one node.
///
/// Policies are pluggable per fee kind ([`FeePolicy`]); the engine only
/// relies on the contract `0 ≤ fee ≤ principal`. Performance fees are
/// quoted against the valuation delta since the last accrual checkpoint,
/// never against gross deposits.
pub struct FeeEngine {
    config: RwLock<FeeConfig>,
    state: RwLock<FeeState>,
}

impl FeeEngine {
    /// Creates a fee engine with zeroed state.
    #[must_use]
    pub fn new(config: FeeConfig) -> Self {
        Self {
            config: RwLock::new(config),
            state: RwLock::new(FeeState::default()),
        }
    }

    /// Quotes the deposit fee for a gross deposit.
    #[must_use]
    pub fn quote_deposit_fee(&self, amount: Amount) -> Amount {
        self.config.read().deposit.quote(amount)
    }

    /// Quotes the withdrawal fee for gross proceeds.
    #[must_use]
    pub fn quote_withdrawal_fee(&self, amount: Amount) -> Amount {
        self.config.read().withdrawal.quote(amount)
    }

    /// Quotes the performance fee for organic profit.
    #[must_use]
    pub fn quote_performance_fee(&self, profit: Amount) -> Amount {
        self.config.read().performance.quote(profit)
    }

    /// Adds `fee` to the accumulated total.
    pub fn accrue(&self, fee: Amount) -> Result<(), VaultError> {
        if fee.is_zero() {
            return Ok(());
        }
        let mut state = self.state.write();
        state.accumulated = state.accumulated.checked_add(fee)?;
        debug!(target: "banyan::fees", fee = %fee, accumulated = %state.accumulated, "accrued fee");
        Ok(())
    }

    /// Removes `fee` from the accumulated total on an unwind path.
    pub fn reverse_accrual(&self, fee: Amount) {
        let mut state = self.state.write();
        state.accumulated = state.accumulated.saturating_sub(fee);
    }

    /// Starts a claim: verifies the caller, zeroes `accumulated`, and
    /// moves it into `claimed`.
    ///
    /// Returns the amount to pay out. The caller performs the transfer
    /// and must call [`FeeEngine::rollback_claim`] if it fails.
    pub fn begin_claim(&self, caller: &AccountId) -> Result<Amount, VaultError> {
        let receiver = self.receiver();
        if *caller != receiver {
            return Err(VaultError::Unauthorized {
                account: caller.clone(),
            });
        }
        let mut state = self.state.write();
        let amount = state.accumulated;
        state.accumulated = Amount::ZERO;
        state.claimed = state.claimed.checked_add(amount)?;
        Ok(amount)
    }

    /// Reverts a claim whose payout transfer failed.
    pub fn rollback_claim(&self, amount: Amount) {
        let mut state = self.state.write();
        state.claimed = state.claimed.saturating_sub(amount);
        state.accumulated = match state.accumulated.checked_add(amount) {
            Ok(total) => total,
            Err(_) => Amount::MAX,
        };
    }

    /// Accrues a performance fee against equity growth since the last
    /// checkpoint.
    ///
    /// Returns `(profit, fee)`. The checkpoint moves to the post-fee
    /// equity, so the same profit is never charged twice.
    pub fn accrue_performance(&self, current_equity: Amount) -> Result<(Amount, Amount), VaultError> {
        let profit = {
            let state = self.state.read();
            current_equity.saturating_sub(state.performance_checkpoint)
        };
        let fee = self.quote_performance_fee(profit);
        let mut state = self.state.write();
        state.accumulated = state.accumulated.checked_add(fee)?;
        state.performance_checkpoint = current_equity.saturating_sub(fee);
        debug!(
            target: "banyan::fees",
            profit = %profit,
            fee = %fee,
            checkpoint = %state.performance_checkpoint,
            "accrued performance fee"
        );
        Ok((profit, fee))
    }

    /// Shifts the performance checkpoint up for deposited value, so
    /// inflows are not mistaken for profit.
    pub fn note_deposit_flow(&self, net_amount: Amount) {
        let mut state = self.state.write();
        state.performance_checkpoint = match state.performance_checkpoint.checked_add(net_amount) {
            Ok(total) => total,
            Err(_) => Amount::MAX,
        };
    }

    /// Shifts the performance checkpoint down for withdrawn value.
    pub fn note_withdrawal_flow(&self, gross_amount: Amount) {
        let mut state = self.state.write();
        state.performance_checkpoint = state.performance_checkpoint.saturating_sub(gross_amount);
    }

    /// The account fees are claimable by.
    #[must_use]
    pub fn receiver(&self) -> AccountId {
        self.config.read().receiver.clone()
    }

    /// Accrued, unclaimed fee total.
    #[must_use]
    pub fn accumulated(&self) -> Amount {
        self.state.read().accumulated
    }

    /// Lifetime claimed fee total.
    #[must_use]
    pub fn claimed(&self) -> Amount {
        self.state.read().claimed
    }

    /// Snapshot of the full fee state.
    #[must_use]
    pub fn state(&self) -> FeeState {
        *self.state.read()
    }

    /// Copy of the current fee configuration.
    #[must_use]
    pub fn config(&self) -> FeeConfig {
        self.config.read().clone()
    }

    /// The configured deposit policy.
    #[must_use]
    pub fn deposit_policy(&self) -> FeePolicy {
        self.config.read().deposit.clone()
    }

    /// The configured withdrawal policy.
    #[must_use]
    pub fn withdrawal_policy(&self) -> FeePolicy {
        self.config.read().withdrawal.clone()
    }

    /// The configured performance policy.
    #[must_use]
    pub fn performance_policy(&self) -> FeePolicy {
        self.config.read().performance.clone()
    }

    /// Replaces the fee configuration, preserving state.
    ///
    /// Reinitialization swaps policies wholesale; accumulated, claimed,
    /// and the performance checkpoint all survive untouched.
    pub fn replace_config(&self, config: FeeConfig) {
        *self.config.write() = config;
    }
}
