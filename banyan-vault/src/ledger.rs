//! In-process reference implementation of the token ledger.

use dashmap::DashMap;

use banyan_core::error::LedgerError;
use banyan_core::traits::TokenLedger;
use banyan_core::types::{AccountId, Amount, AssetId};

/// An in-memory [`TokenLedger`] with honest ERC-20-style semantics:
/// balances, total supplies, and allowances that `transfer_from`
/// decrements.
///
/// This is the ledger the test suite and local wiring run the engine
/// against; a deployment substitutes its real asset ledger behind the
/// same trait. Calls are applied atomically — every failure is detected
/// before the first balance moves.
#[derive(Debug, Default)]
pub struct InMemoryTokenLedger {
    balances: DashMap<(AssetId, AccountId), u64>,
    allowances: DashMap<(AssetId, AccountId, AccountId), u64>,
    supplies: DashMap<AssetId, u64>,
}

impl InMemoryTokenLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn debit(
        &self,
        asset: &AssetId,
        from: &AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let key = (asset.clone(), from.clone());
        let mut entry = self.balances.entry(key).or_insert(0);
        let balance = Amount::new(*entry);
        if balance < amount {
            return Err(LedgerError::InsufficientBalance {
                asset: asset.clone(),
                account: from.clone(),
                balance,
                required: amount,
            });
        }
        *entry -= amount.as_u64();
        Ok(())
    }

    fn credit(&self, asset: &AssetId, to: &AccountId, amount: Amount) -> Result<(), LedgerError> {
        let key = (asset.clone(), to.clone());
        let mut entry = self.balances.entry(key).or_insert(0);
        *entry = entry
            .checked_add(amount.as_u64())
            .ok_or(LedgerError::BalanceOverflow {
                asset: asset.clone(),
            })?;
        Ok(())
    }
}

impl TokenLedger for InMemoryTokenLedger {
    fn balance_of(&self, asset: &AssetId, holder: &AccountId) -> Amount {
        self.balances
            .get(&(asset.clone(), holder.clone()))
            .map_or(Amount::ZERO, |entry| Amount::new(*entry))
    }

    fn total_supply(&self, asset: &AssetId) -> Amount {
        self.supplies
            .get(asset)
            .map_or(Amount::ZERO, |entry| Amount::new(*entry))
    }

    fn approve(
        &self,
        asset: &AssetId,
        owner: &AccountId,
        spender: &AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.allowances
            .insert((asset.clone(), owner.clone(), spender.clone()), amount.as_u64());
        Ok(())
    }

    fn allowance(&self, asset: &AssetId, owner: &AccountId, spender: &AccountId) -> Amount {
        self.allowances
            .get(&(asset.clone(), owner.clone(), spender.clone()))
            .map_or(Amount::ZERO, |entry| Amount::new(*entry))
    }

    fn transfer(
        &self,
        asset: &AssetId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        if from == to || amount.is_zero() {
            // still validate the balance so a bad self-transfer fails loudly
            let balance = self.balance_of(asset, from);
            if balance < amount {
                return Err(LedgerError::InsufficientBalance {
                    asset: asset.clone(),
                    account: from.clone(),
                    balance,
                    required: amount,
                });
            }
            return Ok(());
        }
        self.debit(asset, from, amount)?;
        self.credit(asset, to, amount)
    }

    fn transfer_from(
        &self,
        asset: &AssetId,
        spender: &AccountId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        if spender != from {
            let key = (asset.clone(), from.clone(), spender.clone());
            let allowance = self
                .allowances
                .get(&key)
                .map_or(Amount::ZERO, |entry| Amount::new(*entry));
            if allowance < amount {
                return Err(LedgerError::InsufficientAllowance {
                    asset: asset.clone(),
                    owner: from.clone(),
                    spender: spender.clone(),
                    allowance,
                    required: amount,
                });
            }
            self.transfer(asset, from, to, amount)?;
            self.allowances
                .insert(key, allowance.as_u64() - amount.as_u64());
            return Ok(());
        }
        self.transfer(asset, from, to, amount)
    }

    fn mint(&self, asset: &AssetId, to: &AccountId, amount: Amount) -> Result<(), LedgerError> {
        {
            let mut supply = self.supplies.entry(asset.clone()).or_insert(0);
            *supply = supply
                .checked_add(amount.as_u64())
                .ok_or(LedgerError::BalanceOverflow {
                    asset: asset.clone(),
                })?;
        }
        if let Err(err) = self.credit(asset, to, amount) {
            // supply bump must not outlive a failed credit
            if let Some(mut supply) = self.supplies.get_mut(asset) {
                *supply -= amount.as_u64();
            }
            return Err(err);
        }
        Ok(())
    }

    fn burn(&self, asset: &AssetId, from: &AccountId, amount: Amount) -> Result<(), LedgerError> {
        self.debit(asset, from, amount)?;
        if let Some(mut supply) = self.supplies.get_mut(asset) {
            *supply = supply.saturating_sub(amount.as_u64());
        }
        Ok(())
    }
}
