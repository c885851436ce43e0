//! The investable capability and the state block shared by both node
//! kinds.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use banyan_core::config::{FeeConfig, LimitConfig, NodeConfig, Validatable};
use banyan_core::error::{ConfigError, VaultError};
use banyan_core::traits::{PriceSource, TokenLedger, ValuationMode};
use banyan_core::types::{AccountId, Amount, AssetId, Shares};

use crate::events::{EventLog, EventRecord, VaultEvent};
use crate::fees::FeeEngine;
use crate::limits::LimitGuard;
use crate::shares::ShareLedger;
use crate::valuation::{AssetBalance, AssetValuation, ValuationSnapshot};

/// Operational state of a node.
///
/// Transitions are owner-only and never automatic. While `Paused`,
/// deposits, withdrawals, and fee claims are refused; valuation queries,
/// configuration changes, and reinitialization remain available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    /// Accepting deposits and withdrawals.
    Active,
    /// Refusing state-mutating user operations.
    Paused,
}

/// Identity and versioning metadata of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    /// Machine name.
    pub name: String,
    /// Display name.
    pub human_readable_name: String,
    /// Version string, bumped by reinitialization.
    pub version: String,
}

/// The capability every node in the vault tree exposes.
///
/// Portfolios hold children behind this trait, so a child can be another
/// portfolio or a leaf strategy interchangeably; recursive valuation and
/// routing never inspect the concrete kind.
pub trait Investable: Send + Sync {
    /// Identity and version metadata.
    fn descriptor(&self) -> NodeDescriptor;

    /// The node's treasury account on the token ledger.
    fn node_account(&self) -> AccountId;

    /// The accounting asset deposits arrive in.
    fn deposit_asset(&self) -> AssetId;

    /// The share token this node mints.
    fn investment_token(&self) -> AssetId;

    /// Deposits `amount` of the deposit asset pulled from `caller`,
    /// minting shares to `receiver`.
    fn deposit(
        &self,
        caller: &AccountId,
        amount: Amount,
        receiver: &AccountId,
    ) -> Result<Shares, VaultError>;

    /// Burns `shares` from `caller` and pays the net proceeds to
    /// `receiver`.
    fn withdraw(
        &self,
        caller: &AccountId,
        shares: Shares,
        receiver: &AccountId,
    ) -> Result<Amount, VaultError>;

    /// Computes the node's full valuation under `mode`.
    fn valuation(&self, mode: ValuationMode) -> Result<ValuationSnapshot, VaultError>;

    /// Raw asset holdings, no price source involved.
    fn asset_balances(&self) -> Vec<AssetBalance>;

    /// Raw liabilities, no price source involved.
    fn liability_balances(&self) -> Vec<AssetBalance>;

    /// Equity valuation under `mode`.
    fn equity_valuation(&self, mode: ValuationMode) -> Result<Amount, VaultError> {
        Ok(self.valuation(mode)?.equity_valuation)
    }

    /// Marked asset holdings under `mode`.
    fn asset_valuations(&self, mode: ValuationMode) -> Result<Vec<AssetValuation>, VaultError> {
        Ok(self.valuation(mode)?.asset_valuations)
    }

    /// Marked liabilities under `mode`.
    fn liability_valuations(&self, mode: ValuationMode) -> Result<Vec<AssetValuation>, VaultError> {
        Ok(self.valuation(mode)?.liability_valuations)
    }

    /// Total outstanding share supply.
    fn investment_token_supply(&self) -> Shares;

    /// `holder`'s share balance.
    fn investment_token_balance_of(&self, holder: &AccountId) -> Shares;

    /// Quotes this node's own deposit fee for a gross deposit.
    fn quote_deposit_fee(&self, amount: Amount) -> Amount;

    /// Quotes this node's own withdrawal fee for gross proceeds.
    fn quote_withdrawal_fee(&self, amount: Amount) -> Amount;

    /// Quotes this node's own performance fee for a profit amount.
    fn quote_performance_fee(&self, profit: Amount) -> Amount;

    /// Quotes the deposit fee including every embedded child's cut, as a
    /// depositor routing through this node would pay it.
    fn total_deposit_fee(&self, amount: Amount) -> Amount;

    /// Quotes the withdrawal fee including every embedded child's cut.
    fn total_withdrawal_fee(&self, amount: Amount) -> Amount;

    /// Current fee configuration.
    fn fee_config(&self) -> FeeConfig;

    /// Account fee claims pay out to.
    fn fee_receiver(&self) -> AccountId;

    /// Accrued, unclaimed fee total.
    fn accumulated_fee(&self) -> Amount;

    /// Lifetime claimed fee total.
    fn claimed_fee(&self) -> Amount;

    /// Pays the accumulated fee out to the fee receiver.
    ///
    /// Only the fee receiver may call this.
    fn claim_fee(&self, caller: &AccountId) -> Result<Amount, VaultError>;

    /// Accrues the performance fee against organic profit since the last
    /// accrual. Owner-only. Returns the accrued fee.
    fn accrue_performance_fee(&self, caller: &AccountId) -> Result<Amount, VaultError>;

    /// Current investment ceilings.
    fn limit_config(&self) -> LimitConfig;

    /// Replaces the total investment ceiling. Owner-only.
    fn set_total_investment_limit(
        &self,
        caller: &AccountId,
        limit: Option<Amount>,
    ) -> Result<(), VaultError>;

    /// Replaces the per-address ceiling. Owner-only.
    fn set_investment_limit_per_address(
        &self,
        caller: &AccountId,
        limit: Option<Amount>,
    ) -> Result<(), VaultError>;

    /// Whether the node is paused.
    fn is_paused(&self) -> bool;

    /// Pauses the node. Owner-only.
    fn pause(&self, caller: &AccountId) -> Result<(), VaultError>;

    /// Unpauses the node. Owner-only.
    fn unpause(&self, caller: &AccountId) -> Result<(), VaultError>;

    /// Replaces the node configuration in place, preserving share
    /// supply, fee state, and asset identities. Owner-only, available
    /// while paused.
    fn reinitialize(&self, caller: &AccountId, config: NodeConfig) -> Result<(), VaultError>;

    /// Copy of the node's event log.
    fn events(&self) -> Vec<EventRecord>;
}

/// State and behavior shared by portfolios and strategies: configuration,
/// the fee engine, the limit guard, the share ledger, pause status, the
/// reentrancy lock, and the event log.
pub(crate) struct NodeCore {
    pub(crate) config: RwLock<NodeConfig>,
    pub(crate) account: AccountId,
    pub(crate) ledger: Arc<dyn TokenLedger>,
    pub(crate) prices: Arc<dyn PriceSource>,
    pub(crate) shares: ShareLedger,
    pub(crate) fees: FeeEngine,
    pub(crate) limits: LimitGuard,
    status: RwLock<NodeStatus>,
    entry: Mutex<()>,
    pub(crate) events: EventLog,
}

impl NodeCore {
    pub(crate) fn new(
        config: NodeConfig,
        account: AccountId,
        ledger: Arc<dyn TokenLedger>,
        prices: Arc<dyn PriceSource>,
    ) -> Result<Self, VaultError> {
        config.validate()?;
        let shares = ShareLedger::new(Arc::clone(&ledger), config.investment_token.clone());
        let fees = FeeEngine::new(config.fees.clone());
        let limits = LimitGuard::new(config.limits);
        Ok(Self {
            config: RwLock::new(config),
            account,
            ledger,
            prices,
            shares,
            fees,
            limits,
            status: RwLock::new(NodeStatus::Active),
            entry: Mutex::new(()),
            events: EventLog::new(),
        })
    }

    /// Acquires the reentrancy lock, failing immediately if it is held.
    ///
    /// Every state-mutating entry point holds this for its full duration,
    /// so a collaborator that calls back into the node mid-operation is
    /// rejected instead of interleaving with half-applied state.
    pub(crate) fn enter(&self) -> Result<MutexGuard<'_, ()>, VaultError> {
        self.entry.try_lock().ok_or(VaultError::ReentrantCall)
    }

    pub(crate) fn ensure_active(&self) -> Result<(), VaultError> {
        match *self.status.read() {
            NodeStatus::Active => Ok(()),
            NodeStatus::Paused => Err(VaultError::Paused),
        }
    }

    pub(crate) fn ensure_owner(&self, caller: &AccountId) -> Result<(), VaultError> {
        if *caller != self.config.read().owner {
            return Err(VaultError::Unauthorized {
                account: caller.clone(),
            });
        }
        Ok(())
    }

    pub(crate) fn descriptor(&self) -> NodeDescriptor {
        let config = self.config.read();
        NodeDescriptor {
            name: config.name.clone(),
            human_readable_name: config.human_readable_name.clone(),
            version: config.version.clone(),
        }
    }

    pub(crate) fn deposit_asset(&self) -> AssetId {
        self.config.read().deposit_asset.clone()
    }

    pub(crate) fn record(&self, event: VaultEvent) {
        let name = self.config.read().name.clone();
        self.events.record(&name, event);
    }

    /// Deposit-asset cash in the treasury that belongs to shareholders.
    ///
    /// Accrued fees sit in the same account but are earmarked for the
    /// fee receiver, so they are excluded from equity.
    pub(crate) fn idle_cash(&self) -> Amount {
        let asset = self.deposit_asset();
        self.ledger
            .balance_of(&asset, &self.account)
            .saturating_sub(self.fees.accumulated())
    }

    /// Pulls `amount` of the deposit asset from `caller` into the
    /// treasury, consuming the caller's allowance.
    pub(crate) fn pull_deposit(&self, caller: &AccountId, amount: Amount) -> Result<(), VaultError> {
        let asset = self.deposit_asset();
        self.ledger
            .transfer_from(&asset, &self.account, caller, &self.account, amount)?;
        Ok(())
    }

    /// Returns a pulled deposit on an unwind path. Best-effort: a ledger
    /// that accepted the pull moments ago should accept the return, and
    /// if it does not, the funds stay in the treasury as idle cash.
    pub(crate) fn refund_deposit(&self, caller: &AccountId, amount: Amount) {
        let asset = self.deposit_asset();
        if let Err(err) = self.ledger.transfer(&asset, &self.account, caller, amount) {
            error!(
                target: "banyan::vault",
                node = %self.config.read().name,
                caller = %caller,
                amount = %amount,
                %err,
                "deposit refund failed; funds remain as idle cash"
            );
        }
    }

    /// Pays `amount` of the deposit asset from the treasury to
    /// `receiver`.
    pub(crate) fn pay_out(&self, receiver: &AccountId, amount: Amount) -> Result<(), VaultError> {
        let asset = self.deposit_asset();
        self.ledger
            .transfer(&asset, &self.account, receiver, amount)?;
        Ok(())
    }

    /// Value of `holder`'s existing claim at the given prior state.
    pub(crate) fn holder_value(
        &self,
        holder: &AccountId,
        prior_equity: Amount,
        prior_supply: Shares,
    ) -> Result<Amount, VaultError> {
        if prior_supply.is_zero() {
            return Ok(Amount::ZERO);
        }
        let balance = self.shares.balance_of(holder);
        Ok(prior_equity.mul_div_floor(balance.as_u64(), prior_supply.as_u64())?)
    }

    /// Runs both investment ceilings against a prospective deposit.
    pub(crate) fn check_deposit_limits(
        &self,
        receiver: &AccountId,
        amount: Amount,
        prior_equity: Amount,
        prior_supply: Shares,
    ) -> Result<(), VaultError> {
        let depositor_value = self.holder_value(receiver, prior_equity, prior_supply)?;
        self.limits
            .check_deposit(amount, prior_equity, depositor_value)
    }

    pub(crate) fn claim_fee(&self, caller: &AccountId) -> Result<Amount, VaultError> {
        let _entry = self.enter()?;
        self.ensure_active()?;
        let amount = self.fees.begin_claim(caller)?;
        if amount.is_zero() {
            return Ok(Amount::ZERO);
        }
        if let Err(err) = self.pay_out(caller, amount) {
            self.fees.rollback_claim(amount);
            return Err(err);
        }
        info!(
            target: "banyan::vault",
            node = %self.config.read().name,
            receiver = %caller,
            amount = %amount,
            "fee claimed"
        );
        self.record(VaultEvent::FeeClaim {
            receiver: caller.clone(),
            amount,
        });
        Ok(amount)
    }

    /// Completes a performance accrual once the node computed its
    /// current equity. Owner gating happens here so both node kinds
    /// share it.
    pub(crate) fn finish_performance_accrual(
        &self,
        caller: &AccountId,
        current_equity: Amount,
    ) -> Result<Amount, VaultError> {
        self.ensure_owner(caller)?;
        let (profit, fee) = self.fees.accrue_performance(current_equity)?;
        if !fee.is_zero() {
            self.record(VaultEvent::PerformanceFeeAccrued { profit, fee });
        }
        Ok(fee)
    }

    pub(crate) fn status(&self) -> NodeStatus {
        *self.status.read()
    }

    pub(crate) fn pause(&self, caller: &AccountId) -> Result<(), VaultError> {
        self.ensure_owner(caller)?;
        let mut status = self.status.write();
        if *status == NodeStatus::Paused {
            return Err(VaultError::Paused);
        }
        *status = NodeStatus::Paused;
        drop(status);
        self.record(VaultEvent::Paused { by: caller.clone() });
        Ok(())
    }

    pub(crate) fn unpause(&self, caller: &AccountId) -> Result<(), VaultError> {
        self.ensure_owner(caller)?;
        let mut status = self.status.write();
        if *status == NodeStatus::Active {
            return Err(VaultError::NotPaused);
        }
        *status = NodeStatus::Active;
        drop(status);
        self.record(VaultEvent::Unpaused { by: caller.clone() });
        Ok(())
    }

    pub(crate) fn set_total_investment_limit(
        &self,
        caller: &AccountId,
        limit: Option<Amount>,
    ) -> Result<(), VaultError> {
        self.ensure_owner(caller)?;
        self.limits.set_total_investment_limit(limit);
        self.config.write().limits.total_investment_limit = limit;
        Ok(())
    }

    pub(crate) fn set_investment_limit_per_address(
        &self,
        caller: &AccountId,
        limit: Option<Amount>,
    ) -> Result<(), VaultError> {
        self.ensure_owner(caller)?;
        self.limits.set_investment_limit_per_address(limit);
        self.config.write().limits.investment_limit_per_address = limit;
        Ok(())
    }

    /// Replaces the node configuration wholesale, the way an upgrade
    /// re-runs initialization.
    ///
    /// Share supply lives on the token ledger and fee state in the fee
    /// engine; neither is touched. Asset identities and the owner are
    /// immutable — a configuration that changes them is rejected before
    /// anything is applied.
    pub(crate) fn reinitialize(
        &self,
        caller: &AccountId,
        new_config: NodeConfig,
    ) -> Result<(), VaultError> {
        let _entry = self.enter()?;
        self.ensure_owner(caller)?;
        new_config.validate()?;
        {
            let current = self.config.read();
            if new_config.deposit_asset != current.deposit_asset {
                return Err(ConfigError::immutable_field("deposit_asset").into());
            }
            if new_config.investment_token != current.investment_token {
                return Err(ConfigError::immutable_field("investment_token").into());
            }
            if new_config.owner != current.owner {
                return Err(ConfigError::immutable_field("owner").into());
            }
        }
        self.fees.replace_config(new_config.fees.clone());
        self.limits.replace_config(new_config.limits);
        let version = new_config.version.clone();
        *self.config.write() = new_config;
        info!(
            target: "banyan::vault",
            node = %self.config.read().name,
            version = %version,
            "node reinitialized"
        );
        self.record(VaultEvent::Reinitialized { version });
        Ok(())
    }
}
