//! Investment ceiling enforcement.

use parking_lot::RwLock;

use banyan_core::config::LimitConfig;
use banyan_core::error::VaultError;
use banyan_core::types::Amount;

/// Enforces a node's total and per-address investment ceilings.
///
/// Checks run before any share mint or asset transfer, so a violating
/// deposit fails with no state mutated anywhere. Changing a limit only
/// affects future deposits; balances already above a newly lowered limit
/// stay valid and withdrawable.
pub struct LimitGuard {
    limits: RwLock<LimitConfig>,
}

impl LimitGuard {
    /// Creates a guard from the configured limits.
    #[must_use]
    pub fn new(limits: LimitConfig) -> Self {
        Self {
            limits: RwLock::new(limits),
        }
    }

    /// Checks a prospective deposit against both ceilings.
    ///
    /// `current_total` is the node's pooled value and
    /// `current_depositor_value` the receiver's already-invested value,
    /// both before the deposit.
    pub fn check_deposit(
        &self,
        amount: Amount,
        current_total: Amount,
        current_depositor_value: Amount,
    ) -> Result<(), VaultError> {
        let limits = *self.limits.read();
        let attempted_total = current_total.checked_add(amount)?;
        if let Some(limit) = limits.total_investment_limit {
            if attempted_total > limit {
                return Err(VaultError::TotalInvestmentLimitExceeded {
                    limit,
                    attempted: attempted_total,
                });
            }
        }
        let attempted_balance = current_depositor_value.checked_add(amount)?;
        if let Some(limit) = limits.investment_limit_per_address {
            if attempted_balance > limit {
                return Err(VaultError::InvestmentLimitPerAddressExceeded {
                    limit,
                    attempted: attempted_balance,
                });
            }
        }
        Ok(())
    }

    /// Current limit configuration.
    #[must_use]
    pub fn config(&self) -> LimitConfig {
        *self.limits.read()
    }

    /// Total investment ceiling, `None` when unlimited.
    #[must_use]
    pub fn total_investment_limit(&self) -> Option<Amount> {
        self.limits.read().total_investment_limit
    }

    /// Per-address ceiling, `None` when unlimited.
    #[must_use]
    pub fn investment_limit_per_address(&self) -> Option<Amount> {
        self.limits.read().investment_limit_per_address
    }

    /// Replaces the total ceiling. Authorization is the node's concern.
    pub fn set_total_investment_limit(&self, limit: Option<Amount>) {
        self.limits.write().total_investment_limit = limit;
    }

    /// Replaces the per-address ceiling.
    pub fn set_investment_limit_per_address(&self, limit: Option<Amount>) {
        self.limits.write().investment_limit_per_address = limit;
    }

    /// Replaces both ceilings, used by reinitialization.
    pub fn replace_config(&self, limits: LimitConfig) {
        *self.limits.write() = limits;
    }
}
