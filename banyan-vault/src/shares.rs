//! Proportional share minting and burning.

use std::sync::Arc;

use tracing::debug;

use banyan_core::error::VaultError;
use banyan_core::traits::TokenLedger;
use banyan_core::types::{AccountId, Amount, AssetId, Shares};

/// Mints and burns a node's investment token against deposited and
/// withdrawn value.
///
/// The investment token is an ordinary fungible asset on the token
/// ledger; this component owns the proportional-claim math on top of it.
/// Both directions truncate toward zero — a depositor can be rounded down
/// by a base unit, the pool can never be over-minted, and remaining
/// holders can never be underpaid by a withdrawal.
pub struct ShareLedger {
    ledger: Arc<dyn TokenLedger>,
    token: AssetId,
}

impl ShareLedger {
    /// Creates a share ledger over `token`.
    #[must_use]
    pub fn new(ledger: Arc<dyn TokenLedger>, token: AssetId) -> Self {
        Self { ledger, token }
    }

    /// The investment token this ledger mints and burns.
    #[must_use]
    pub fn token(&self) -> &AssetId {
        &self.token
    }

    /// Total outstanding share supply.
    #[must_use]
    pub fn supply(&self) -> Shares {
        Shares::from_amount(self.ledger.total_supply(&self.token))
    }

    /// `holder`'s share balance.
    #[must_use]
    pub fn balance_of(&self, holder: &AccountId) -> Shares {
        Shares::from_amount(self.ledger.balance_of(&self.token, holder))
    }

    /// Computes the shares a deposit of `deposit_value` is entitled to,
    /// without minting.
    ///
    /// With zero prior supply the bootstrap mint is 1:1; otherwise
    /// `deposit_value · prior_supply / prior_equity`, floored.
    pub fn compute_shares(
        &self,
        deposit_value: Amount,
        prior_equity: Amount,
        prior_supply: Shares,
    ) -> Result<Shares, VaultError> {
        if deposit_value.is_zero() {
            return Err(VaultError::ZeroAmountDeposited);
        }
        let shares = if prior_supply.is_zero() {
            Shares::from_amount(deposit_value)
        } else {
            Shares::from_amount(
                deposit_value.mul_div_floor(prior_supply.as_u64(), prior_equity.as_u64())?,
            )
        };
        if shares.is_zero() {
            return Err(VaultError::ZeroSharesIssued {
                deposit: deposit_value,
            });
        }
        Ok(shares)
    }

    /// Computes the value a burn of `shares` redeems, without burning:
    /// `shares · prior_equity / prior_supply`, floored.
    pub fn compute_redemption(
        &self,
        shares: Shares,
        prior_equity: Amount,
        prior_supply: Shares,
    ) -> Result<Amount, VaultError> {
        if shares.is_zero() {
            return Err(VaultError::ZeroAmountWithdrawn);
        }
        let value = prior_equity.mul_div_floor(shares.as_u64(), prior_supply.as_u64())?;
        Ok(value)
    }

    /// Mints the proportional shares for a deposit to `receiver`.
    pub fn mint(
        &self,
        receiver: &AccountId,
        deposit_value: Amount,
        prior_equity: Amount,
        prior_supply: Shares,
    ) -> Result<Shares, VaultError> {
        let shares = self.compute_shares(deposit_value, prior_equity, prior_supply)?;
        self.ledger.mint(&self.token, receiver, shares.as_amount())?;
        debug!(
            target: "banyan::shares",
            token = %self.token,
            receiver = %receiver,
            shares = %shares,
            deposit = %deposit_value,
            "minted shares"
        );
        Ok(shares)
    }

    /// Burns `shares` from `holder`.
    ///
    /// The redeemed value is computed by the caller from pre-burn state;
    /// this only destroys the claim.
    pub fn burn(&self, holder: &AccountId, shares: Shares) -> Result<(), VaultError> {
        if shares.is_zero() {
            return Err(VaultError::ZeroAmountWithdrawn);
        }
        self.ledger.burn(&self.token, holder, shares.as_amount())?;
        debug!(
            target: "banyan::shares",
            token = %self.token,
            holder = %holder,
            shares = %shares,
            "burned shares"
        );
        Ok(())
    }

    /// Re-mints shares destroyed earlier in a failed operation.
    ///
    /// Used only on unwind paths; failures are the caller's to report.
    pub fn restore(&self, holder: &AccountId, shares: Shares) -> Result<(), VaultError> {
        self.ledger.mint(&self.token, holder, shares.as_amount())?;
        Ok(())
    }
}
