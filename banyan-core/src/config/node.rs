//! Vault node configuration types.

use serde::{Deserialize, Serialize};

use super::Validatable;
use crate::error::ConfigError;
use crate::types::{AccountId, AllocationWeight, Amount, AssetId, FeeRate};

/// A pluggable fee formula, selected per fee kind at construction time.
///
/// The engine is agnostic to policy internals beyond the contract
/// `0 ≤ fee ≤ principal`, which every variant upholds by construction
/// (rates are bounded at 100% and quoting floors).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeePolicy {
    /// No fee.
    #[default]
    None,
    /// A single rate applied to the whole principal.
    Flat {
        /// The fee rate.
        rate: FeeRate,
    },
    /// A breakpoint schedule: the rate of the highest tier whose
    /// threshold the principal reaches applies to the whole principal.
    Tiered {
        /// Tiers, ascending by threshold; the first threshold must be
        /// zero so every principal has an applicable rate.
        tiers: Vec<FeeTier>,
    },
}

/// One breakpoint of a tiered fee schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeTier {
    /// Principal amount from which this tier applies.
    pub threshold: Amount,
    /// Rate charged within this tier.
    pub rate: FeeRate,
}

impl FeePolicy {
    /// Quotes the fee for `principal`.
    #[must_use]
    pub fn quote(&self, principal: Amount) -> Amount {
        match self {
            Self::None => Amount::ZERO,
            Self::Flat { rate } => rate.apply(principal),
            Self::Tiered { tiers } => tiers
                .iter()
                .rev()
                .find(|tier| principal >= tier.threshold)
                .map_or(Amount::ZERO, |tier| tier.rate.apply(principal)),
        }
    }

    /// Returns true if this policy never charges anything.
    #[must_use]
    pub fn is_free(&self) -> bool {
        match self {
            Self::None => true,
            Self::Flat { rate } => rate.is_zero(),
            Self::Tiered { tiers } => tiers.iter().all(|tier| tier.rate.is_zero()),
        }
    }
}

impl Validatable for FeePolicy {
    fn validate(&self) -> Result<(), ConfigError> {
        // Transparent deserialization bypasses FeeRate's constructor, so
        // the 100% bound is re-checked here.
        let in_bounds = |rate: FeeRate| rate.as_u32() <= crate::types::PERCENTAGE_SCALE;
        match self {
            Self::None => {}
            Self::Flat { rate } => {
                if !in_bounds(*rate) {
                    return Err(ConfigError::invalid_value("rate", "exceeds 100%"));
                }
            }
            Self::Tiered { tiers } => {
                if let Some(tier) = tiers.iter().find(|tier| !in_bounds(tier.rate)) {
                    return Err(ConfigError::invalid_value(
                        "tiers",
                        format!("rate {} exceeds 100%", tier.rate.as_u32()),
                    ));
                }
            }
        }
        if let Self::Tiered { tiers } = self {
            if tiers.is_empty() {
                return Err(ConfigError::invalid_value("tiers", "schedule is empty"));
            }
            if !tiers[0].threshold.is_zero() {
                return Err(ConfigError::invalid_value(
                    "tiers",
                    "first threshold must be zero",
                ));
            }
            if !tiers
                .windows(2)
                .all(|pair| pair[0].threshold < pair[1].threshold)
            {
                return Err(ConfigError::invalid_value(
                    "tiers",
                    "thresholds must be strictly ascending",
                ));
            }
        }
        Ok(())
    }
}

/// Fee configuration for one node: a policy per fee kind plus the
/// receiver fee claims pay out to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeConfig {
    /// Fee charged on gross deposits.
    #[serde(default)]
    pub deposit: FeePolicy,
    /// Fee charged on gross withdrawal proceeds.
    #[serde(default)]
    pub withdrawal: FeePolicy,
    /// Fee charged on organic profit since the last accrual checkpoint.
    #[serde(default)]
    pub performance: FeePolicy,
    /// Account accrued fees are claimable by.
    pub receiver: AccountId,
}

impl Validatable for FeeConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.receiver.is_valid() {
            return Err(ConfigError::invalid_value(
                "fees.receiver",
                "invalid account identifier",
            ));
        }
        self.deposit.validate()?;
        self.withdrawal.validate()?;
        self.performance.validate()?;
        Ok(())
    }
}

/// Investment ceilings for one node.
///
/// `None` means unlimited. A configured `Some(0)` is an explicit freeze:
/// every deposit is rejected. Changing a limit never retroactively
/// invalidates existing balances; it only constrains future deposits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LimitConfig {
    /// Ceiling on the node's total pooled value.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub total_investment_limit: Option<Amount>,
    /// Ceiling on any single address's invested value.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub investment_limit_per_address: Option<Amount>,
}

/// Configuration common to every vault node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Machine name, unique within a deployment.
    pub name: String,
    /// Human-readable display name.
    pub human_readable_name: String,
    /// Version string, bumped by each reinitialization.
    pub version: String,
    /// Account allowed to run privileged operations.
    pub owner: AccountId,
    /// The accounting asset deposits arrive in.
    pub deposit_asset: AssetId,
    /// The share token this node mints and burns.
    pub investment_token: AssetId,
    /// Fee policies and receiver.
    pub fees: FeeConfig,
    /// Investment ceilings.
    #[serde(default)]
    pub limits: LimitConfig,
}

impl Validatable for NodeConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::missing_field("name"));
        }
        if self.version.is_empty() {
            return Err(ConfigError::missing_field("version"));
        }
        if !self.owner.is_valid() {
            return Err(ConfigError::invalid_value(
                "owner",
                "invalid account identifier",
            ));
        }
        if !self.deposit_asset.is_valid() {
            return Err(ConfigError::invalid_value(
                "deposit_asset",
                "invalid asset identifier",
            ));
        }
        if !self.investment_token.is_valid() {
            return Err(ConfigError::invalid_value(
                "investment_token",
                "invalid asset identifier",
            ));
        }
        if self.deposit_asset == self.investment_token {
            return Err(ConfigError::invalid_value(
                "investment_token",
                "must differ from the deposit asset",
            ));
        }
        self.fees.validate()
    }
}

/// Configuration for a leaf strategy node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Common node configuration.
    #[serde(flatten)]
    pub node: NodeConfig,
    /// The position asset the strategy expects its yield protocol to
    /// manage. Construction fails if the adapter reports a different one.
    pub position_asset: AssetId,
}

impl Validatable for StrategyConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.node.validate()?;
        if !self.position_asset.is_valid() {
            return Err(ConfigError::invalid_value(
                "position_asset",
                "invalid asset identifier",
            ));
        }
        if self.position_asset == self.node.deposit_asset {
            return Err(ConfigError::invalid_value(
                "position_asset",
                "must differ from the deposit asset",
            ));
        }
        Ok(())
    }
}

/// Target allocation for one portfolio child, matched to the child by its
/// node name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildAllocation {
    /// Name of the child node.
    pub name: String,
    /// Share of routed deposits the child receives.
    pub weight: AllocationWeight,
}

/// Configuration for a composite portfolio node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioConfig {
    /// Common node configuration.
    #[serde(flatten)]
    pub node: NodeConfig,
    /// Ordered child allocations. The sum of weights may be below 100%;
    /// the unrouted remainder stays in the portfolio as idle cash.
    pub allocations: Vec<ChildAllocation>,
}

impl Validatable for PortfolioConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.node.validate()?;
        for allocation in &self.allocations {
            if allocation.name.is_empty() {
                return Err(ConfigError::missing_field("allocations.name"));
            }
        }
        let mut names: Vec<&str> = self
            .allocations
            .iter()
            .map(|a| a.name.as_str())
            .collect();
        names.sort_unstable();
        if names.windows(2).any(|pair| pair[0] == pair[1]) {
            return Err(ConfigError::invalid_value(
                "allocations",
                "duplicate child name",
            ));
        }
        AllocationWeight::checked_sum(self.allocations.iter().map(|a| a.weight)).map_err(|_| {
            ConfigError::invalid_value("allocations", "weights sum to more than 100%")
        })?;
        Ok(())
    }
}
