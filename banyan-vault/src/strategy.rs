//! Leaf strategy node: one external yield protocol behind a swap leg.

use std::sync::Arc;

use tracing::{error, info};

use banyan_core::config::{FeeConfig, LimitConfig, NodeConfig, StrategyConfig, Validatable};
use banyan_core::error::{ConfigError, ProtocolError, VaultError};
use banyan_core::traits::{PriceSource, SwapEngine, TokenLedger, ValuationMode, YieldProtocol};
use banyan_core::types::{AccountId, Amount, AssetId, Shares};

use crate::events::{EventRecord, VaultEvent};
use crate::investable::{Investable, NodeCore, NodeDescriptor};
use crate::valuation::{AssetBalance, AssetValuation, ValuationSnapshot};

/// A leaf of the vault tree: holds a position in one external yield
/// protocol.
///
/// Deposits are swapped from the accounting asset into the protocol's
/// position asset and staked; withdrawals unstake a proportional position
/// and swap it back. Slippage protection lives in the swap capability,
/// which fails rather than executing below its configured minimum.
pub struct Strategy {
    core: NodeCore,
    position_asset: AssetId,
    swap: Arc<dyn SwapEngine>,
    protocol: Arc<dyn YieldProtocol>,
}

impl Strategy {
    /// Creates a strategy node.
    ///
    /// Fails with [`ProtocolError::PositionAssetMismatch`] when the
    /// adapter manages a different position asset than the configuration
    /// names.
    pub fn new(
        config: StrategyConfig,
        account: AccountId,
        ledger: Arc<dyn TokenLedger>,
        prices: Arc<dyn PriceSource>,
        swap: Arc<dyn SwapEngine>,
        protocol: Arc<dyn YieldProtocol>,
    ) -> Result<Self, VaultError> {
        config.validate()?;
        let reported = protocol.position_asset();
        if reported != config.position_asset {
            return Err(ProtocolError::PositionAssetMismatch {
                expected: config.position_asset,
                actual: reported,
            }
            .into());
        }
        let position_asset = config.position_asset.clone();
        let core = NodeCore::new(config.node, account, ledger, prices)?;
        Ok(Self {
            core,
            position_asset,
            swap,
            protocol,
        })
    }

    /// The position asset this strategy accumulates.
    #[must_use]
    pub fn position_asset(&self) -> &AssetId {
        &self.position_asset
    }

    /// Reinitializes with a full strategy configuration.
    ///
    /// The position asset is part of the node's identity and cannot
    /// change across upgrades.
    pub fn reinitialize_with(
        &self,
        caller: &AccountId,
        config: StrategyConfig,
    ) -> Result<(), VaultError> {
        config.validate()?;
        if config.position_asset != self.position_asset {
            return Err(ConfigError::immutable_field("position_asset").into());
        }
        self.core.reinitialize(caller, config.node)
    }

    /// Total position holding: staked balance plus any loose position
    /// cash sitting in the treasury.
    fn position_total(&self) -> Amount {
        let staked = self.protocol.staked_balance(&self.core.account);
        let loose = self
            .core
            .ledger
            .balance_of(&self.position_asset, &self.core.account);
        staked.checked_add(loose).unwrap_or(Amount::MAX)
    }

    fn snapshot(&self, mode: ValuationMode) -> Result<ValuationSnapshot, VaultError> {
        let deposit_asset = self.core.deposit_asset();
        let position = self.position_total();
        let idle = self.core.idle_cash();

        let mut asset_balances = vec![AssetBalance {
            asset: self.position_asset.clone(),
            balance: position,
        }];
        let position_value = if position.is_zero() {
            Amount::ZERO
        } else {
            self.core
                .prices
                .quote(&self.position_asset, position, mode)?
                .value
        };
        let mut asset_valuations = vec![AssetValuation {
            asset: self.position_asset.clone(),
            valuation: position_value,
        }];
        if !idle.is_zero() {
            asset_balances.push(AssetBalance {
                asset: deposit_asset.clone(),
                balance: idle,
            });
            // the accounting asset marks at par
            asset_valuations.push(AssetValuation {
                asset: deposit_asset.clone(),
                valuation: idle,
            });
        }

        let mut liability_balances = Vec::new();
        let mut liability_valuations = Vec::new();
        if let Some((asset, balance)) = self.protocol.liability_balance(&self.core.account) {
            if !balance.is_zero() {
                let valuation = if asset == deposit_asset {
                    balance
                } else {
                    // a conservative equity view must not understate debt
                    self.core.prices.quote(&asset, balance, mode.flipped())?.value
                };
                liability_balances.push(AssetBalance {
                    asset: asset.clone(),
                    balance,
                });
                liability_valuations.push(AssetValuation { asset, valuation });
            }
        }

        ValuationSnapshot::from_parts(
            asset_balances,
            asset_valuations,
            liability_balances,
            liability_valuations,
        )
    }

    /// Converts net deposit cash into the staked position. Returns the
    /// position amount acquired.
    fn invest(&self, net_amount: Amount) -> Result<Amount, VaultError> {
        let deposit_asset = self.core.deposit_asset();
        let acquired = self.swap.swap(
            &self.core.account,
            &deposit_asset,
            &self.position_asset,
            net_amount,
            Amount::ZERO,
        )?;
        if acquired.is_zero() {
            return Err(VaultError::AmountTooSmall { amount: net_amount });
        }
        if let Err(err) = self.protocol.stake(&self.core.account, acquired) {
            // put the position back into cash before surfacing the failure
            if let Err(unwind_err) = self.swap.swap(
                &self.core.account,
                &self.position_asset,
                &deposit_asset,
                acquired,
                Amount::ZERO,
            ) {
                error!(
                    target: "banyan::strategy",
                    node = %self.core.descriptor().name,
                    %unwind_err,
                    "failed to unwind swap after stake rejection"
                );
            }
            return Err(err.into());
        }
        Ok(acquired)
    }

    /// Unstakes `position_amount` and swaps it back to the accounting
    /// asset. Returns the cash proceeds.
    fn divest(&self, position_amount: Amount) -> Result<Amount, VaultError> {
        let returned = self.protocol.unstake(&self.core.account, position_amount)?;
        if returned.is_zero() {
            return Ok(Amount::ZERO);
        }
        let deposit_asset = self.core.deposit_asset();
        let proceeds = self.swap.swap(
            &self.core.account,
            &self.position_asset,
            &deposit_asset,
            returned,
            Amount::ZERO,
        )?;
        Ok(proceeds)
    }

    /// Best-effort unwind of a fresh investment on a failed deposit.
    fn unwind_investment(&self, position_amount: Amount) {
        if let Err(err) = self.divest(position_amount) {
            error!(
                target: "banyan::strategy",
                node = %self.core.descriptor().name,
                %err,
                "failed to unwind investment; position remains staked"
            );
        }
    }

    #[cfg(test)]
    pub(crate) fn core_for_tests(&self) -> &NodeCore {
        &self.core
    }
}

impl Investable for Strategy {
    fn descriptor(&self) -> NodeDescriptor {
        self.core.descriptor()
    }

    fn node_account(&self) -> AccountId {
        self.core.account.clone()
    }

    fn deposit_asset(&self) -> AssetId {
        self.core.deposit_asset()
    }

    fn investment_token(&self) -> AssetId {
        self.core.shares.token().clone()
    }

    fn deposit(
        &self,
        caller: &AccountId,
        amount: Amount,
        receiver: &AccountId,
    ) -> Result<Shares, VaultError> {
        let _entry = self.core.enter()?;
        self.core.ensure_active()?;
        if amount.is_zero() {
            return Err(VaultError::ZeroAmountDeposited);
        }

        // prior state read under the lock, before any external call
        let prior_equity = self.snapshot(ValuationMode::cached())?.equity_valuation;
        let prior_supply = self.core.shares.supply();

        let fee = self.core.fees.quote_deposit_fee(amount);
        let net_amount = amount.saturating_sub(fee);
        // pre-validate the mint so a dust deposit fails before funds move
        self.core
            .shares
            .compute_shares(net_amount, prior_equity, prior_supply)?;
        self.core
            .check_deposit_limits(receiver, amount, prior_equity, prior_supply)?;

        self.core.pull_deposit(caller, amount)?;
        if let Err(err) = self.core.fees.accrue(fee) {
            self.core.refund_deposit(caller, amount);
            return Err(err);
        }

        let acquired = match self.invest(net_amount) {
            Ok(acquired) => acquired,
            Err(err) => {
                self.core.fees.reverse_accrual(fee);
                self.core.refund_deposit(caller, amount);
                return Err(err);
            }
        };

        let minted = match self
            .core
            .shares
            .mint(receiver, net_amount, prior_equity, prior_supply)
        {
            Ok(minted) => minted,
            Err(err) => {
                self.unwind_investment(acquired);
                self.core.fees.reverse_accrual(fee);
                self.core.refund_deposit(caller, amount);
                return Err(err);
            }
        };

        self.core.fees.note_deposit_flow(net_amount);
        info!(
            target: "banyan::strategy",
            node = %self.core.descriptor().name,
            sender = %caller,
            receiver = %receiver,
            amount = %amount,
            shares = %minted,
            "deposit accepted"
        );
        self.core.record(VaultEvent::Deposit {
            sender: caller.clone(),
            receiver: receiver.clone(),
            amount,
        });
        Ok(minted)
    }

    fn withdraw(
        &self,
        caller: &AccountId,
        shares: Shares,
        receiver: &AccountId,
    ) -> Result<Amount, VaultError> {
        let _entry = self.core.enter()?;
        self.core.ensure_active()?;
        if shares.is_zero() {
            return Err(VaultError::ZeroAmountWithdrawn);
        }

        let prior_supply = self.core.shares.supply();
        let position_total = self.position_total();
        let idle = self.core.idle_cash();

        // burn before the external leg so a reentrant callee cannot
        // redeem the same claim twice
        self.core.shares.burn(caller, shares)?;

        let position_out = position_total.mul_div_floor(shares.as_u64(), prior_supply.as_u64())?;
        let idle_share = idle.mul_div_floor(shares.as_u64(), prior_supply.as_u64())?;

        let proceeds = if position_out.is_zero() {
            Amount::ZERO
        } else {
            match self.divest(position_out) {
                Ok(proceeds) => proceeds,
                Err(err) => {
                    if let Err(restore_err) = self.core.shares.restore(caller, shares) {
                        error!(
                            target: "banyan::strategy",
                            node = %self.core.descriptor().name,
                            %restore_err,
                            "failed to restore shares after divest failure"
                        );
                    }
                    return Err(err);
                }
            }
        };

        let gross = proceeds.checked_add(idle_share)?;
        if gross.is_zero() {
            self.core.shares.restore(caller, shares)?;
            return Err(VaultError::AmountTooSmall { amount: gross });
        }

        let fee = self.core.fees.quote_withdrawal_fee(gross);
        let net_proceeds = gross.saturating_sub(fee);
        if let Err(err) = self.core.fees.accrue(fee) {
            self.core.shares.restore(caller, shares)?;
            return Err(err);
        }
        if let Err(err) = self.core.pay_out(receiver, net_proceeds) {
            self.core.fees.reverse_accrual(fee);
            if let Err(restore_err) = self.core.shares.restore(caller, shares) {
                error!(
                    target: "banyan::strategy",
                    node = %self.core.descriptor().name,
                    %restore_err,
                    "failed to restore shares after payout failure"
                );
            }
            return Err(err);
        }

        self.core.fees.note_withdrawal_flow(gross);
        info!(
            target: "banyan::strategy",
            node = %self.core.descriptor().name,
            sender = %caller,
            receiver = %receiver,
            shares = %shares,
            net_proceeds = %net_proceeds,
            "withdrawal paid"
        );
        self.core.record(VaultEvent::Withdrawal {
            sender: caller.clone(),
            receiver: receiver.clone(),
            shares,
        });
        Ok(net_proceeds)
    }

    fn valuation(&self, mode: ValuationMode) -> Result<ValuationSnapshot, VaultError> {
        self.snapshot(mode)
    }

    fn asset_balances(&self) -> Vec<AssetBalance> {
        let mut balances = vec![AssetBalance {
            asset: self.position_asset.clone(),
            balance: self.position_total(),
        }];
        let idle = self.core.idle_cash();
        if !idle.is_zero() {
            balances.push(AssetBalance {
                asset: self.core.deposit_asset(),
                balance: idle,
            });
        }
        balances
    }

    fn liability_balances(&self) -> Vec<AssetBalance> {
        match self.protocol.liability_balance(&self.core.account) {
            Some((asset, balance)) if !balance.is_zero() => {
                vec![AssetBalance { asset, balance }]
            }
            _ => Vec::new(),
        }
    }

    fn investment_token_supply(&self) -> Shares {
        self.core.shares.supply()
    }

    fn investment_token_balance_of(&self, holder: &AccountId) -> Shares {
        self.core.shares.balance_of(holder)
    }

    fn quote_deposit_fee(&self, amount: Amount) -> Amount {
        self.core.fees.quote_deposit_fee(amount)
    }

    fn quote_withdrawal_fee(&self, amount: Amount) -> Amount {
        self.core.fees.quote_withdrawal_fee(amount)
    }

    fn quote_performance_fee(&self, profit: Amount) -> Amount {
        self.core.fees.quote_performance_fee(profit)
    }

    fn total_deposit_fee(&self, amount: Amount) -> Amount {
        self.core.fees.quote_deposit_fee(amount)
    }

    fn total_withdrawal_fee(&self, amount: Amount) -> Amount {
        self.core.fees.quote_withdrawal_fee(amount)
    }

    fn fee_config(&self) -> FeeConfig {
        self.core.fees.config()
    }

    fn fee_receiver(&self) -> AccountId {
        self.core.fees.receiver()
    }

    fn accumulated_fee(&self) -> Amount {
        self.core.fees.accumulated()
    }

    fn claimed_fee(&self) -> Amount {
        self.core.fees.claimed()
    }

    fn claim_fee(&self, caller: &AccountId) -> Result<Amount, VaultError> {
        self.core.claim_fee(caller)
    }

    fn accrue_performance_fee(&self, caller: &AccountId) -> Result<Amount, VaultError> {
        let _entry = self.core.enter()?;
        let equity = self.snapshot(ValuationMode::cached())?.equity_valuation;
        self.core.finish_performance_accrual(caller, equity)
    }

    fn limit_config(&self) -> LimitConfig {
        self.core.limits.config()
    }

    fn set_total_investment_limit(
        &self,
        caller: &AccountId,
        limit: Option<Amount>,
    ) -> Result<(), VaultError> {
        self.core.set_total_investment_limit(caller, limit)
    }

    fn set_investment_limit_per_address(
        &self,
        caller: &AccountId,
        limit: Option<Amount>,
    ) -> Result<(), VaultError> {
        self.core.set_investment_limit_per_address(caller, limit)
    }

    fn is_paused(&self) -> bool {
        self.core.status() == crate::investable::NodeStatus::Paused
    }

    fn pause(&self, caller: &AccountId) -> Result<(), VaultError> {
        self.core.pause(caller)
    }

    fn unpause(&self, caller: &AccountId) -> Result<(), VaultError> {
        self.core.unpause(caller)
    }

    fn reinitialize(&self, caller: &AccountId, config: NodeConfig) -> Result<(), VaultError> {
        self.core.reinitialize(caller, config)
    }

    fn events(&self) -> Vec<EventRecord> {
        self.core.events.records()
    }
}
