//! Composite portfolio node: weighted routing over child investables.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{error, info, warn};

use banyan_core::config::{
    ChildAllocation, FeeConfig, LimitConfig, NodeConfig, PortfolioConfig, Validatable,
};
use banyan_core::error::{ConfigError, VaultError};
use banyan_core::traits::{PriceSource, TokenLedger, ValuationMode};
use banyan_core::types::{AccountId, AllocationWeight, Amount, AssetId, Shares};

use crate::events::{EventRecord, VaultEvent};
use crate::investable::{Investable, NodeCore, NodeDescriptor};
use crate::valuation::{AssetBalance, AssetValuation, ValuationSnapshot};

struct ChildSlot {
    node: Arc<dyn Investable>,
    weight: AllocationWeight,
}

impl ChildSlot {
    fn name(&self) -> String {
        self.node.descriptor().name
    }
}

/// A composite of the vault tree: holds no external position itself,
/// only weighted claims on child investables (which may themselves be
/// portfolios).
///
/// Weights route deposits and steer rebalancing; valuation always marks
/// the portfolio's actual child-share holdings at each child's live
/// price-per-share, so value a child gains from direct third-party
/// deposits or its own yield shows up here without any capital having
/// moved through the portfolio.
pub struct Portfolio {
    core: NodeCore,
    children: RwLock<Vec<ChildSlot>>,
}

impl Portfolio {
    /// Creates a portfolio over `children`.
    ///
    /// The configured allocations are matched to the children by
    /// position and name; every child must share the portfolio's deposit
    /// asset.
    pub fn new(
        config: PortfolioConfig,
        account: AccountId,
        ledger: Arc<dyn TokenLedger>,
        prices: Arc<dyn PriceSource>,
        children: Vec<Arc<dyn Investable>>,
    ) -> Result<Self, VaultError> {
        config.validate()?;
        if children.len() != config.allocations.len() {
            return Err(ConfigError::invalid_value(
                "allocations",
                format!(
                    "{} allocations for {} children",
                    config.allocations.len(),
                    children.len()
                ),
            )
            .into());
        }
        let mut slots = Vec::with_capacity(children.len());
        for (node, allocation) in children.into_iter().zip(&config.allocations) {
            let descriptor = node.descriptor();
            if descriptor.name != allocation.name {
                return Err(ConfigError::invalid_value(
                    "allocations",
                    format!(
                        "allocation '{}' does not match child '{}'",
                        allocation.name, descriptor.name
                    ),
                )
                .into());
            }
            if node.deposit_asset() != config.node.deposit_asset {
                return Err(ConfigError::invalid_value(
                    "allocations",
                    format!("child '{}' uses a different deposit asset", descriptor.name),
                )
                .into());
            }
            slots.push(ChildSlot {
                node,
                weight: allocation.weight,
            });
        }
        let core = NodeCore::new(config.node, account, ledger, prices)?;
        Ok(Self {
            core,
            children: RwLock::new(slots),
        })
    }

    /// Descriptors and current target weights of all children, in
    /// routing order.
    #[must_use]
    pub fn child_allocations(&self) -> Vec<(NodeDescriptor, AllocationWeight)> {
        self.children
            .read()
            .iter()
            .map(|slot| (slot.node.descriptor(), slot.weight))
            .collect()
    }

    /// Adds a child with the given target weight. Owner-only.
    pub fn add_child(
        &self,
        caller: &AccountId,
        node: Arc<dyn Investable>,
        weight: AllocationWeight,
    ) -> Result<(), VaultError> {
        let _entry = self.core.enter()?;
        self.core.ensure_owner(caller)?;
        if node.deposit_asset() != self.core.deposit_asset() {
            return Err(ConfigError::invalid_value(
                "child",
                "deposit asset differs from the portfolio's",
            )
            .into());
        }
        let mut children = self.children.write();
        let name = node.descriptor().name;
        if children.iter().any(|slot| slot.name() == name) {
            return Err(ConfigError::invalid_value("child", format!("duplicate name '{name}'")).into());
        }
        AllocationWeight::checked_sum(
            children.iter().map(|slot| slot.weight).chain([weight]),
        )
        .map_err(VaultError::Validation)?;
        children.push(ChildSlot { node, weight });
        Ok(())
    }

    /// Removes a child whose holding is fully unwound. Owner-only.
    pub fn remove_child(&self, caller: &AccountId, name: &str) -> Result<(), VaultError> {
        let _entry = self.core.enter()?;
        self.core.ensure_owner(caller)?;
        let mut children = self.children.write();
        let index = children
            .iter()
            .position(|slot| slot.name() == name)
            .ok_or_else(|| VaultError::ChildNotFound {
                name: name.to_string(),
            })?;
        let holding = children[index]
            .node
            .investment_token_balance_of(&self.core.account);
        if !holding.is_zero() {
            return Err(VaultError::ChildStillInvested {
                name: name.to_string(),
            });
        }
        children.remove(index);
        Ok(())
    }

    /// Replaces the target allocations. Owner-only; the allocations must
    /// name exactly the current children.
    pub fn set_target_allocations(
        &self,
        caller: &AccountId,
        allocations: &[ChildAllocation],
    ) -> Result<(), VaultError> {
        let _entry = self.core.enter()?;
        self.core.ensure_owner(caller)?;
        let mut children = self.children.write();
        let weights = Self::resolve_weights(&children, allocations)?;
        for (slot, weight) in children.iter_mut().zip(weights) {
            slot.weight = weight;
        }
        Ok(())
    }

    /// Matches `allocations` against the current children, returning the
    /// new weights in child order. Validates without mutating.
    fn resolve_weights(
        children: &[ChildSlot],
        allocations: &[ChildAllocation],
    ) -> Result<Vec<AllocationWeight>, VaultError> {
        if allocations.len() != children.len() {
            return Err(ConfigError::invalid_value(
                "allocations",
                "must cover exactly the current children",
            )
            .into());
        }
        AllocationWeight::checked_sum(allocations.iter().map(|a| a.weight))
            .map_err(VaultError::Validation)?;
        let mut weights = Vec::with_capacity(children.len());
        for slot in children {
            let name = slot.name();
            let allocation = allocations
                .iter()
                .find(|a| a.name == name)
                .ok_or(VaultError::ChildNotFound { name })?;
            weights.push(allocation.weight);
        }
        Ok(weights)
    }

    /// Reinitializes with a full portfolio configuration, including new
    /// target allocations for the existing children.
    ///
    /// Validation runs up front, so a rejected configuration changes
    /// neither the node nor the weights.
    pub fn reinitialize_with(
        &self,
        caller: &AccountId,
        config: PortfolioConfig,
    ) -> Result<(), VaultError> {
        config.validate()?;
        let weights = {
            let children = self.children.read();
            Self::resolve_weights(&children, &config.allocations)?
        };
        self.core.reinitialize(caller, config.node)?;
        let mut children = self.children.write();
        for (slot, weight) in children.iter_mut().zip(weights) {
            slot.weight = weight;
        }
        Ok(())
    }

    /// Realigns child holdings toward the target weights: overweight
    /// children are partially unwound, the freed cash (plus any idle
    /// cash) is routed into underweight ones. Owner-only.
    ///
    /// A child failure aborts the pass with the portfolio still solvent;
    /// value freed so far stays as idle cash for the next attempt.
    pub fn rebalance(&self, caller: &AccountId) -> Result<Amount, VaultError> {
        let _entry = self.core.enter()?;
        self.core.ensure_owner(caller)?;
        self.core.ensure_active()?;

        let slots = self.cloned_slots();
        let equity = self.snapshot(ValuationMode::cached())?.equity_valuation;
        let mut values = Vec::with_capacity(slots.len());
        for slot in &slots {
            let (holding, value) = self.child_value(&slot.node, ValuationMode::cached())?;
            values.push((holding, value, slot.weight.apply(equity)));
        }

        let mut moved = Amount::ZERO;
        // pass 1: unwind overweight children into cash
        for (slot, (holding, value, target)) in slots.iter().zip(&values) {
            let excess = value.saturating_sub(*target);
            if excess.is_zero() || value.is_zero() {
                continue;
            }
            let redeem = holding.mul_div_floor(excess.as_u64(), value.as_u64())?;
            if redeem.is_zero() {
                continue;
            }
            let proceeds = slot
                .node
                .withdraw(&self.core.account, redeem, &self.core.account)?;
            moved = moved.checked_add(proceeds)?;
        }

        // pass 2: route idle cash into underweight children
        let mut available = self.core.idle_cash();
        for (slot, (_, value, target)) in slots.iter().zip(&values) {
            if available.is_zero() {
                break;
            }
            let deficit = target.saturating_sub(*value);
            if deficit.is_zero() {
                continue;
            }
            let portion = deficit.min(available);
            self.approve_child(&slot.node, portion)?;
            slot.node
                .deposit(&self.core.account, portion, &self.core.account)?;
            available = available.saturating_sub(portion);
            moved = moved.checked_add(portion)?;
        }

        info!(
            target: "banyan::portfolio",
            node = %self.core.descriptor().name,
            moved = %moved,
            "rebalanced"
        );
        self.core.record(VaultEvent::Rebalanced { moved });
        Ok(moved)
    }

    fn cloned_slots(&self) -> Vec<ChildSlot> {
        self.children
            .read()
            .iter()
            .map(|slot| ChildSlot {
                node: Arc::clone(&slot.node),
                weight: slot.weight,
            })
            .collect()
    }

    fn approve_child(
        &self,
        child: &Arc<dyn Investable>,
        amount: Amount,
    ) -> Result<(), VaultError> {
        let asset = self.core.deposit_asset();
        self.core
            .ledger
            .approve(&asset, &self.core.account, &child.node_account(), amount)?;
        Ok(())
    }

    /// The portfolio's holding of one child and its value at the child's
    /// live price-per-share.
    fn child_value(
        &self,
        child: &Arc<dyn Investable>,
        mode: ValuationMode,
    ) -> Result<(Shares, Amount), VaultError> {
        let holding = child.investment_token_balance_of(&self.core.account);
        if holding.is_zero() {
            return Ok((holding, Amount::ZERO));
        }
        let supply = child.investment_token_supply();
        if supply.is_zero() {
            return Ok((holding, Amount::ZERO));
        }
        let equity = child.equity_valuation(mode)?;
        let value = equity.mul_div_floor(holding.as_u64(), supply.as_u64())?;
        Ok((holding, value))
    }

    fn snapshot(&self, mode: ValuationMode) -> Result<ValuationSnapshot, VaultError> {
        let slots = self.cloned_slots();
        let mut asset_balances = Vec::with_capacity(slots.len() + 1);
        let mut asset_valuations = Vec::with_capacity(slots.len() + 1);
        for slot in &slots {
            let (holding, value) = self.child_value(&slot.node, mode)?;
            let token = slot.node.investment_token();
            asset_balances.push(AssetBalance {
                asset: token.clone(),
                balance: holding.as_amount(),
            });
            asset_valuations.push(AssetValuation {
                asset: token,
                valuation: value,
            });
        }
        let idle = self.core.idle_cash();
        if !idle.is_zero() {
            let asset = self.core.deposit_asset();
            asset_balances.push(AssetBalance {
                asset: asset.clone(),
                balance: idle,
            });
            asset_valuations.push(AssetValuation {
                asset,
                valuation: idle,
            });
        }
        // a portfolio borrows nothing itself; leverage lives in leaves
        ValuationSnapshot::from_parts(asset_balances, asset_valuations, Vec::new(), Vec::new())
    }

    fn unwind_child_deposits(&self, deposited: &[(Arc<dyn Investable>, Shares)]) {
        for (node, minted) in deposited {
            if let Err(err) = node.withdraw(&self.core.account, *minted, &self.core.account) {
                error!(
                    target: "banyan::portfolio",
                    node = %self.core.descriptor().name,
                    child = %node.descriptor().name,
                    %err,
                    "failed to unwind child deposit"
                );
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn core_for_tests(&self) -> &NodeCore {
        &self.core
    }
}

impl Investable for Portfolio {
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

        let prior_equity = self.snapshot(ValuationMode::cached())?.equity_valuation;
        let prior_supply = self.core.shares.supply();

        let fee = self.core.fees.quote_deposit_fee(amount);
        let net_amount = amount.saturating_sub(fee);
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

        // fan the net amount out by weight; the unrouted remainder stays
        // as idle cash
        let slots = self.cloned_slots();
        let mut deposited: Vec<(Arc<dyn Investable>, Shares)> = Vec::with_capacity(slots.len());
        for slot in &slots {
            let portion = slot.weight.apply(net_amount);
            if portion.is_zero() {
                continue;
            }
            let routed = self
                .approve_child(&slot.node, portion)
                .and_then(|()| slot.node.deposit(&self.core.account, portion, &self.core.account));
            match routed {
                Ok(minted) => deposited.push((Arc::clone(&slot.node), minted)),
                Err(err) => {
                    self.unwind_child_deposits(&deposited);
                    self.core.fees.reverse_accrual(fee);
                    self.core.refund_deposit(caller, amount);
                    return Err(err);
                }
            }
        }

        let minted = match self
            .core
            .shares
            .mint(receiver, net_amount, prior_equity, prior_supply)
        {
            Ok(minted) => minted,
            Err(err) => {
                self.unwind_child_deposits(&deposited);
                self.core.fees.reverse_accrual(fee);
                self.core.refund_deposit(caller, amount);
                return Err(err);
            }
        };

        self.core.fees.note_deposit_flow(net_amount);
        info!(
            target: "banyan::portfolio",
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
        let idle = self.core.idle_cash();

        self.core.shares.burn(caller, shares)?;

        // pull the proportional slice out of every child through the
        // child's own withdraw path (its fees and limits included)
        let slots = self.cloned_slots();
        let mut collected = Amount::ZERO;
        for slot in &slots {
            let holding = slot.node.investment_token_balance_of(&self.core.account);
            let child_shares = holding.mul_div_floor(shares.as_u64(), prior_supply.as_u64())?;
            if child_shares.is_zero() {
                continue;
            }
            match slot
                .node
                .withdraw(&self.core.account, child_shares, &self.core.account)
            {
                Ok(proceeds) => collected = collected.checked_add(proceeds)?,
                Err(err) => {
                    // value collected so far stays as idle cash; the
                    // claim is restored, so holders lose nothing
                    warn!(
                        target: "banyan::portfolio",
                        node = %self.core.descriptor().name,
                        child = %slot.node.descriptor().name,
                        collected = %collected,
                        "child withdrawal failed; aborting with proceeds as idle cash"
                    );
                    if let Err(restore_err) = self.core.shares.restore(caller, shares) {
                        error!(
                            target: "banyan::portfolio",
                            node = %self.core.descriptor().name,
                            %restore_err,
                            "failed to restore shares after child failure"
                        );
                    }
                    return Err(err);
                }
            }
        }

        let idle_share = idle.mul_div_floor(shares.as_u64(), prior_supply.as_u64())?;
        let gross = collected.checked_add(idle_share)?;
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
                    target: "banyan::portfolio",
                    node = %self.core.descriptor().name,
                    %restore_err,
                    "failed to restore shares after payout failure"
                );
            }
            return Err(err);
        }

        self.core.fees.note_withdrawal_flow(gross);
        info!(
            target: "banyan::portfolio",
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
        let slots = self.cloned_slots();
        let mut balances: Vec<AssetBalance> = slots
            .iter()
            .map(|slot| AssetBalance {
                asset: slot.node.investment_token(),
                balance: slot
                    .node
                    .investment_token_balance_of(&self.core.account)
                    .as_amount(),
            })
            .collect();
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
        Vec::new()
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
        let own = self.core.fees.quote_deposit_fee(amount);
        let net_amount = amount.saturating_sub(own);
        let embedded = self
            .cloned_slots()
            .iter()
            .map(|slot| slot.node.total_deposit_fee(slot.weight.apply(net_amount)))
            .fold(Amount::ZERO, |total, fee| {
                total.checked_add(fee).unwrap_or(Amount::MAX)
            });
        own.checked_add(embedded).unwrap_or(Amount::MAX)
    }

    fn total_withdrawal_fee(&self, amount: Amount) -> Amount {
        let embedded = self
            .cloned_slots()
            .iter()
            .map(|slot| slot.node.total_withdrawal_fee(slot.weight.apply(amount)))
            .fold(Amount::ZERO, |total, fee| {
                total.checked_add(fee).unwrap_or(Amount::MAX)
            });
        let own = self.core.fees.quote_withdrawal_fee(amount);
        own.checked_add(embedded).unwrap_or(Amount::MAX)
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

#[cfg(test)]
mod tests {
    use super::*;

    use banyan_core::config::FeePolicy;
    use banyan_core::error::PriceError;
    use banyan_core::types::FeeRate;

    use crate::testing::{self, account, asset, portfolio_fixture, portfolio_fixture_weighted, units};

    #[test]
    fn test_deposit_routes_by_allocation_weight() {
        let fixture = portfolio_fixture();
        let minted = fixture
            .portfolio
            .deposit(&fixture.alice, units(3_000), &fixture.alice)
            .unwrap();

        assert_eq!(minted, Shares::new(3_000 * testing::UNIT));
        assert_eq!(fixture.usdc_balance(&fixture.alice), units(7_000));
        assert_eq!(
            fixture.portfolio.investment_token_supply(),
            Shares::new(3_000 * testing::UNIT)
        );
        // 30% / 70% fan-out
        assert_eq!(
            fixture.child_a.investment_token_supply(),
            Shares::new(900 * testing::UNIT)
        );
        assert_eq!(
            fixture.child_b.investment_token_supply(),
            Shares::new(2_100 * testing::UNIT)
        );
        // the portfolio holds the child shares it just bought
        assert_eq!(
            fixture
                .child_a
                .investment_token_balance_of(&fixture.portfolio.node_account()),
            Shares::new(900 * testing::UNIT)
        );
        assert_eq!(
            fixture
                .portfolio
                .equity_valuation(ValuationMode::cached())
                .unwrap(),
            units(3_000)
        );
        assert!(matches!(
            fixture.portfolio.events().last().unwrap().event,
            VaultEvent::Deposit { amount, .. } if amount == units(3_000)
        ));
    }

    #[test]
    fn test_zero_deposit_rejected() {
        let fixture = portfolio_fixture();
        let result = fixture
            .portfolio
            .deposit(&fixture.alice, Amount::ZERO, &fixture.alice);
        assert!(matches!(result, Err(VaultError::ZeroAmountDeposited)));
        assert_eq!(fixture.portfolio.investment_token_supply(), Shares::ZERO);
    }

    #[test]
    fn test_direct_child_deposit_not_credited_to_parent_but_marked_truthfully() {
        let fixture = portfolio_fixture();

        // bob goes straight to the child, bypassing the portfolio
        fixture
            .ledger
            .approve(
                &asset("USDC"),
                &fixture.bob,
                &fixture.child_a.node_account(),
                units(3_000),
            )
            .unwrap();
        fixture
            .child_a
            .deposit(&fixture.bob, units(3_000), &fixture.bob)
            .unwrap();

        fixture
            .portfolio
            .deposit(&fixture.alice, units(3_000), &fixture.alice)
            .unwrap();

        // child carries both positions
        assert_eq!(
            fixture.child_a.investment_token_supply(),
            Shares::new(3_900 * testing::UNIT)
        );
        assert_eq!(
            fixture
                .child_a
                .equity_valuation(ValuationMode::cached())
                .unwrap(),
            units(3_900)
        );
        // the parent's equity covers only its own holdings
        assert_eq!(
            fixture
                .portfolio
                .equity_valuation(ValuationMode::cached())
                .unwrap(),
            units(3_000)
        );
    }

    #[test]
    fn test_child_growth_reflected_in_parent_without_flows() {
        let fixture = portfolio_fixture();
        fixture
            .portfolio
            .deposit(&fixture.alice, units(3_000), &fixture.alice)
            .unwrap();

        // both children double their positions organically
        fixture
            .protocol_a
            .add_yield(&fixture.child_a.node_account(), units(900));
        fixture
            .protocol_b
            .add_yield(&fixture.child_b.node_account(), units(2_100));

        // next query marks the same holdings at the children's new
        // price-per-share
        assert_eq!(
            fixture
                .portfolio
                .equity_valuation(ValuationMode::cached())
                .unwrap(),
            units(6_000)
        );
    }

    #[test]
    fn test_partial_allocation_leaves_idle_cash() {
        let fixture = portfolio_fixture_weighted(30_000, 50_000);
        fixture
            .portfolio
            .deposit(&fixture.alice, units(3_000), &fixture.alice)
            .unwrap();

        assert_eq!(
            fixture.child_a.investment_token_supply(),
            Shares::new(900 * testing::UNIT)
        );
        assert_eq!(
            fixture.child_b.investment_token_supply(),
            Shares::new(1_500 * testing::UNIT)
        );
        // 20% unrouted, still part of equity
        let snapshot = fixture
            .portfolio
            .valuation(ValuationMode::cached())
            .unwrap();
        assert_eq!(snapshot.equity_valuation, units(3_000));
        assert!(snapshot
            .asset_balances
            .iter()
            .any(|entry| entry.asset == asset("USDC") && entry.balance == units(600)));
    }

    #[test]
    fn test_withdraw_pulls_proportionally_from_children() {
        let fixture = portfolio_fixture();
        fixture
            .portfolio
            .deposit(&fixture.alice, units(3_000), &fixture.alice)
            .unwrap();

        let proceeds = fixture
            .portfolio
            .withdraw(&fixture.alice, Shares::new(1_500 * testing::UNIT), &fixture.alice)
            .unwrap();
        assert_eq!(proceeds, units(1_500));
        assert_eq!(fixture.usdc_balance(&fixture.alice), units(8_500));
        assert_eq!(
            fixture.child_a.investment_token_supply(),
            Shares::new(450 * testing::UNIT)
        );
        assert_eq!(
            fixture.child_b.investment_token_supply(),
            Shares::new(1_050 * testing::UNIT)
        );
        assert_eq!(
            fixture
                .portfolio
                .equity_valuation(ValuationMode::cached())
                .unwrap(),
            units(1_500)
        );
    }

    #[test]
    fn test_full_round_trip_empties_the_tree() {
        let fixture = portfolio_fixture();
        let minted = fixture
            .portfolio
            .deposit(&fixture.alice, units(3_000), &fixture.alice)
            .unwrap();
        let proceeds = fixture
            .portfolio
            .withdraw(&fixture.alice, minted, &fixture.alice)
            .unwrap();

        assert_eq!(proceeds, units(3_000));
        assert_eq!(fixture.usdc_balance(&fixture.alice), units(10_000));
        assert_eq!(fixture.portfolio.investment_token_supply(), Shares::ZERO);
        assert_eq!(fixture.child_a.investment_token_supply(), Shares::ZERO);
        assert_eq!(fixture.child_b.investment_token_supply(), Shares::ZERO);
        assert_eq!(
            fixture
                .portfolio
                .equity_valuation(ValuationMode::cached())
                .unwrap(),
            Amount::ZERO
        );
    }

    #[test]
    fn test_child_failure_mid_fanout_unwinds_whole_deposit() {
        let fixture = portfolio_fixture();
        // the 30% leg (900) fits under the cap, the 70% leg (2100) fails
        fixture
            .swap
            .set_liquidity_cap(&asset("USDC"), units(1_000));

        let result = fixture
            .portfolio
            .deposit(&fixture.alice, units(3_000), &fixture.alice);
        assert!(matches!(result, Err(VaultError::Swap(_))));

        // the first child's deposit was unwound, the pull refunded
        assert_eq!(fixture.usdc_balance(&fixture.alice), units(10_000));
        assert_eq!(fixture.portfolio.investment_token_supply(), Shares::ZERO);
        assert_eq!(fixture.child_a.investment_token_supply(), Shares::ZERO);
        assert_eq!(fixture.child_b.investment_token_supply(), Shares::ZERO);
        assert_eq!(
            fixture
                .portfolio
                .equity_valuation(ValuationMode::cached())
                .unwrap(),
            Amount::ZERO
        );
    }

    #[test]
    fn test_per_address_limit_blocks_portfolio_deposit_atomically() {
        let fixture = portfolio_fixture();
        fixture
            .portfolio
            .set_investment_limit_per_address(&fixture.owner, Some(units(49)))
            .unwrap();

        let result = fixture
            .portfolio
            .deposit(&fixture.bob, units(50), &fixture.bob);
        assert!(matches!(
            result,
            Err(VaultError::InvestmentLimitPerAddressExceeded { .. })
        ));
        assert_eq!(fixture.usdc_balance(&fixture.bob), units(10_000));
        assert_eq!(fixture.portfolio.investment_token_supply(), Shares::ZERO);
        assert_eq!(fixture.child_a.investment_token_supply(), Shares::ZERO);
        assert_eq!(
            fixture
                .portfolio
                .equity_valuation(ValuationMode::cached())
                .unwrap(),
            Amount::ZERO
        );
    }

    #[test]
    fn test_paused_portfolio_refuses_flows() {
        let fixture = portfolio_fixture();
        fixture
            .portfolio
            .deposit(&fixture.alice, units(30), &fixture.alice)
            .unwrap();
        fixture.portfolio.pause(&fixture.owner).unwrap();

        assert!(matches!(
            fixture
                .portfolio
                .deposit(&fixture.alice, units(1), &fixture.alice),
            Err(VaultError::Paused)
        ));
        assert!(matches!(
            fixture
                .portfolio
                .withdraw(&fixture.alice, Shares::new(1), &fixture.alice),
            Err(VaultError::Paused)
        ));
        assert_eq!(
            fixture
                .portfolio
                .equity_valuation(ValuationMode::cached())
                .unwrap(),
            units(30)
        );
    }

    #[test]
    fn test_stale_child_price_propagates_through_parent() {
        let fixture = portfolio_fixture();
        fixture
            .portfolio
            .deposit(&fixture.alice, units(30), &fixture.alice)
            .unwrap();

        fixture.prices.set_fresh_available(false);
        let result = fixture
            .portfolio
            .equity_valuation(ValuationMode::fresh());
        assert!(matches!(
            result,
            Err(VaultError::Price(PriceError::StaleData { .. }))
        ));
    }

    #[test]
    fn test_child_management_guards() {
        let fixture = portfolio_fixture();
        fixture
            .portfolio
            .deposit(&fixture.alice, units(3_000), &fixture.alice)
            .unwrap();

        // an invested child cannot be removed
        let result = fixture.portfolio.remove_child(&fixture.owner, "sg-usdc");
        assert!(matches!(
            result,
            Err(VaultError::ChildStillInvested { .. })
        ));
        assert!(matches!(
            fixture.portfolio.remove_child(&fixture.owner, "nope"),
            Err(VaultError::ChildNotFound { .. })
        ));
        assert!(matches!(
            fixture.portfolio.remove_child(&fixture.alice, "sg-usdc"),
            Err(VaultError::Unauthorized { .. })
        ));

        // weights stay bounded when adding
        let extra = Arc::clone(&fixture.child_a) as Arc<dyn Investable>;
        let result = fixture.portfolio.add_child(
            &fixture.owner,
            extra,
            AllocationWeight::new(10_000).unwrap(),
        );
        // duplicate name is refused before the weight even matters
        assert!(matches!(result, Err(VaultError::Config(_))));

        // after a full unwind the child can be dropped
        let supply = fixture.portfolio.investment_token_supply();
        fixture
            .portfolio
            .withdraw(&fixture.alice, supply, &fixture.alice)
            .unwrap();
        fixture
            .portfolio
            .remove_child(&fixture.owner, "sg-usdc")
            .unwrap();
        assert_eq!(fixture.portfolio.child_allocations().len(), 1);
    }

    #[test]
    fn test_set_target_allocations_validates_names_and_weights() {
        let fixture = portfolio_fixture();

        let result = fixture.portfolio.set_target_allocations(
            &fixture.owner,
            &[
                ChildAllocation {
                    name: "sg-usdc".to_string(),
                    weight: AllocationWeight::new(60_000).unwrap(),
                },
                ChildAllocation {
                    name: "unknown".to_string(),
                    weight: AllocationWeight::new(40_000).unwrap(),
                },
            ],
        );
        assert!(matches!(result, Err(VaultError::ChildNotFound { .. })));

        fixture
            .portfolio
            .set_target_allocations(
                &fixture.owner,
                &[
                    ChildAllocation {
                        name: "sg-usdc".to_string(),
                        weight: AllocationWeight::new(50_000).unwrap(),
                    },
                    ChildAllocation {
                        name: "tc-usdc".to_string(),
                        weight: AllocationWeight::new(50_000).unwrap(),
                    },
                ],
            )
            .unwrap();
        let allocations = fixture.portfolio.child_allocations();
        assert!(allocations
            .iter()
            .all(|(_, weight)| *weight == AllocationWeight::new(50_000).unwrap()));
    }

    #[test]
    fn test_rebalance_realigns_children_to_targets() {
        let fixture = portfolio_fixture();
        fixture
            .portfolio
            .deposit(&fixture.alice, units(3_000), &fixture.alice)
            .unwrap();

        fixture
            .portfolio
            .set_target_allocations(
                &fixture.owner,
                &[
                    ChildAllocation {
                        name: "sg-usdc".to_string(),
                        weight: AllocationWeight::new(50_000).unwrap(),
                    },
                    ChildAllocation {
                        name: "tc-usdc".to_string(),
                        weight: AllocationWeight::new(50_000).unwrap(),
                    },
                ],
            )
            .unwrap();

        let moved = fixture.portfolio.rebalance(&fixture.owner).unwrap();
        assert_eq!(moved, units(1_200));

        let snapshot = fixture
            .portfolio
            .valuation(ValuationMode::cached())
            .unwrap();
        assert_eq!(snapshot.equity_valuation, units(3_000));
        assert_eq!(
            fixture.child_a.investment_token_supply(),
            Shares::new(1_500 * testing::UNIT)
        );
        assert_eq!(
            fixture.child_b.investment_token_supply(),
            Shares::new(1_500 * testing::UNIT)
        );
        assert!(matches!(
            fixture.portfolio.events().last().unwrap().event,
            VaultEvent::Rebalanced { moved } if moved == units(1_200)
        ));
    }

    #[test]
    fn test_total_deposit_fee_includes_embedded_children() {
        let fixture = portfolio_fixture();
        let owner = account("owner");

        // children charge 1% on deposits, the portfolio itself 0.5%
        for (child, name, token) in [
            (&fixture.child_a, "sg-usdc", "bSG-USDC"),
            (&fixture.child_b, "tc-usdc", "bTC-USDC"),
        ] {
            let mut node = testing::strategy_node_config(name, token);
            node.fees.deposit = FeePolicy::Flat {
                rate: FeeRate::from_basis_points(100).unwrap(),
            };
            child.reinitialize(&owner, node).unwrap();
        }
        let mut node = testing::strategy_node_config("main-pool", "bPOOL");
        node.fees.deposit = FeePolicy::Flat {
            rate: FeeRate::from_basis_points(50).unwrap(),
        };
        fixture.portfolio.reinitialize(&owner, node).unwrap();

        // own: 5.0; children: 1% of 298.5 and 696.5
        let total = fixture.portfolio.total_deposit_fee(units(1_000));
        assert_eq!(total, Amount::new(14_950_000));
        assert_eq!(
            fixture.portfolio.quote_deposit_fee(units(1_000)),
            units(5)
        );
    }

    #[test]
    fn test_reinitialize_with_updates_allocations_and_preserves_state() {
        let fixture = portfolio_fixture();
        fixture
            .portfolio
            .deposit(&fixture.alice, units(3_000), &fixture.alice)
            .unwrap();

        let supply_before = fixture.portfolio.investment_token_supply();
        let accumulated_before = fixture.portfolio.accumulated_fee();
        let claimed_before = fixture.portfolio.claimed_fee();
        let deposit_asset_before = fixture.portfolio.deposit_asset();
        let investment_token_before = fixture.portfolio.investment_token();
        let limits_before = fixture.portfolio.limit_config();
        let fee_config_before = fixture.portfolio.fee_config();

        let config = PortfolioConfig {
            node: {
                let mut node = testing::strategy_node_config("main-pool", "bPOOL");
                node.human_readable_name = "Main USDC pool".to_string();
                node.version = "2.0.0".to_string();
                node
            },
            allocations: vec![
                ChildAllocation {
                    name: "sg-usdc".to_string(),
                    weight: AllocationWeight::new(40_000).unwrap(),
                },
                ChildAllocation {
                    name: "tc-usdc".to_string(),
                    weight: AllocationWeight::new(60_000).unwrap(),
                },
            ],
        };
        fixture
            .portfolio
            .reinitialize_with(&fixture.owner, config)
            .unwrap();

        assert_eq!(fixture.portfolio.descriptor().version, "2.0.0");
        assert_eq!(fixture.portfolio.investment_token_supply(), supply_before);
        assert_eq!(fixture.portfolio.accumulated_fee(), accumulated_before);
        assert_eq!(fixture.portfolio.claimed_fee(), claimed_before);
        assert_eq!(fixture.portfolio.deposit_asset(), deposit_asset_before);
        assert_eq!(fixture.portfolio.investment_token(), investment_token_before);
        assert_eq!(fixture.portfolio.limit_config(), limits_before);
        assert_eq!(fixture.portfolio.fee_config(), fee_config_before);
        assert_eq!(
            fixture.portfolio.child_allocations()[0].1,
            AllocationWeight::new(40_000).unwrap()
        );
        // routing follows the new weights
        fixture
            .portfolio
            .deposit(&fixture.bob, units(1_000), &fixture.bob)
            .unwrap();
        assert_eq!(
            fixture.child_a.investment_token_supply(),
            Shares::new((900 + 400) * testing::UNIT)
        );
    }

    #[test]
    fn test_nested_portfolio_valuation_recurses() {
        // a portfolio of a portfolio: the grandparent marks the parent's
        // shares at the parent's live price-per-share
        let fixture = portfolio_fixture();
        let grandparent = Arc::new(
            Portfolio::new(
                PortfolioConfig {
                    node: {
                        let mut node = testing::strategy_node_config("outer-pool", "bOUTER");
                        node.version = "1.0.0".to_string();
                        node
                    },
                    allocations: vec![ChildAllocation {
                        name: "main-pool".to_string(),
                        weight: AllocationWeight::FULL,
                    }],
                },
                account("vault:outer-pool"),
                Arc::clone(&fixture.ledger) as Arc<dyn TokenLedger>,
                Arc::clone(&fixture.prices) as Arc<dyn PriceSource>,
                vec![Arc::clone(&fixture.portfolio) as Arc<dyn Investable>],
            )
            .unwrap(),
        );

        fixture
            .ledger
            .approve(
                &asset("USDC"),
                &fixture.alice,
                &grandparent.node_account(),
                units(1_000),
            )
            .unwrap();
        grandparent
            .deposit(&fixture.alice, units(1_000), &fixture.alice)
            .unwrap();

        assert_eq!(
            grandparent
                .equity_valuation(ValuationMode::cached())
                .unwrap(),
            units(1_000)
        );
        // the leaf strategies received the recursive fan-out
        assert_eq!(
            fixture.child_a.investment_token_supply(),
            Shares::new(300 * testing::UNIT)
        );
        assert_eq!(
            fixture.child_b.investment_token_supply(),
            Shares::new(700 * testing::UNIT)
        );
    }
}
