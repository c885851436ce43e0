//! Shared mock collaborators and fixtures for the engine tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use banyan_core::config::{
    ChildAllocation, FeeConfig, FeePolicy, LimitConfig, NodeConfig, PortfolioConfig,
    StrategyConfig,
};
use banyan_core::error::{LedgerError, PriceError, ProtocolError, SwapError, VaultError};
use banyan_core::traits::{
    PriceQuote, PriceSource, SwapEngine, TokenLedger, ValuationMode, YieldProtocol,
};
use banyan_core::types::{AccountId, AllocationWeight, Amount, AssetId, PERCENTAGE_SCALE};

use crate::investable::Investable;
use crate::ledger::InMemoryTokenLedger;
use crate::portfolio::Portfolio;
use crate::strategy::Strategy;

/// One whole token of a 6-decimal asset, in base units.
pub(crate) const UNIT: u64 = 1_000_000;

pub(crate) fn units(tokens: u64) -> Amount {
    Amount::new(tokens * UNIT)
}

pub(crate) fn asset(name: &str) -> AssetId {
    AssetId::new(name).unwrap()
}

pub(crate) fn account(name: &str) -> AccountId {
    AccountId::new(name).unwrap()
}

pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Price source with per-asset rational rates, a freshness switch, and a
/// configurable conservative haircut.
pub(crate) struct MockPriceSource {
    rates: DashMap<AssetId, (u64, u64)>,
    fresh_available: AtomicBool,
    haircut: Mutex<u32>,
}

impl MockPriceSource {
    pub(crate) fn new() -> Self {
        Self {
            rates: DashMap::new(),
            fresh_available: AtomicBool::new(true),
            haircut: Mutex::new(0),
        }
    }

    /// Values `asset` at `numerator / denominator` accounting units per
    /// base unit.
    pub(crate) fn set_rate(&self, asset: &AssetId, numerator: u64, denominator: u64) {
        self.rates.insert(asset.clone(), (numerator, denominator));
    }

    pub(crate) fn set_fresh_available(&self, available: bool) {
        self.fresh_available.store(available, Ordering::SeqCst);
    }

    /// Haircut applied to conservative marks, on the `100_000` scale.
    pub(crate) fn set_conservative_haircut(&self, haircut: u32) {
        *self.haircut.lock() = haircut;
    }
}

impl PriceSource for MockPriceSource {
    fn quote(
        &self,
        asset: &AssetId,
        quantity: Amount,
        mode: ValuationMode,
    ) -> Result<PriceQuote, PriceError> {
        let (numerator, denominator) =
            *self.rates.get(asset).ok_or_else(|| PriceError::Unavailable {
                asset: asset.clone(),
            })?;
        if !mode.use_cache && !self.fresh_available.load(Ordering::SeqCst) {
            return Err(PriceError::StaleData {
                asset: asset.clone(),
            });
        }
        let mut value = quantity
            .mul_div_floor(numerator, denominator)
            .unwrap_or(Amount::MAX);
        if mode.conservative {
            let haircut = *self.haircut.lock();
            value = value
                .mul_div_floor(u64::from(PERCENTAGE_SCALE - haircut), u64::from(PERCENTAGE_SCALE))
                .unwrap_or(value);
        }
        Ok(PriceQuote {
            value,
            fresh: !mode.use_cache,
        })
    }
}

/// Swap engine with rational pair rates over the in-memory ledger.
/// Output below the caller's minimum fails; so does input above a
/// configured liquidity cap.
pub(crate) struct MockSwapEngine {
    ledger: Arc<InMemoryTokenLedger>,
    rates: DashMap<(AssetId, AssetId), (u64, u64)>,
    liquidity_caps: DashMap<AssetId, u64>,
}

impl MockSwapEngine {
    pub(crate) fn new(ledger: Arc<InMemoryTokenLedger>) -> Self {
        Self {
            ledger,
            rates: DashMap::new(),
            liquidity_caps: DashMap::new(),
        }
    }

    pub(crate) fn set_rate(&self, from: &AssetId, to: &AssetId, numerator: u64, denominator: u64) {
        self.rates
            .insert((from.clone(), to.clone()), (numerator, denominator));
    }

    /// Symmetric 1:1 route between two assets.
    pub(crate) fn set_pair_identity(&self, a: &AssetId, b: &AssetId) {
        self.set_rate(a, b, 1, 1);
        self.set_rate(b, a, 1, 1);
    }

    pub(crate) fn set_liquidity_cap(&self, from: &AssetId, cap: Amount) {
        self.liquidity_caps.insert(from.clone(), cap.as_u64());
    }
}

impl SwapEngine for MockSwapEngine {
    fn swap(
        &self,
        account: &AccountId,
        from: &AssetId,
        to: &AssetId,
        amount_in: Amount,
        minimum_out: Amount,
    ) -> Result<Amount, SwapError> {
        let (numerator, denominator) = *self
            .rates
            .get(&(from.clone(), to.clone()))
            .ok_or_else(|| SwapError::UnsupportedPair {
                from: from.clone(),
                to: to.clone(),
            })?;
        if let Some(cap) = self.liquidity_caps.get(from) {
            if amount_in.as_u64() > *cap {
                return Err(SwapError::InsufficientLiquidity {
                    from: from.clone(),
                    amount_in,
                });
            }
        }
        let amount_out = amount_in
            .mul_div_floor(numerator, denominator)
            .map_err(|_| SwapError::InsufficientLiquidity {
                from: from.clone(),
                amount_in,
            })?;
        if amount_out < minimum_out {
            return Err(SwapError::SlippageExceeded {
                minimum_out,
                actual_out: amount_out,
            });
        }
        self.ledger
            .burn(from, account, amount_in)
            .map_err(|_| SwapError::InsufficientLiquidity {
                from: from.clone(),
                amount_in,
            })?;
        self.ledger
            .mint(to, account, amount_out)
            .map_err(|_| SwapError::InsufficientLiquidity {
                from: from.clone(),
                amount_in,
            })?;
        Ok(amount_out)
    }
}

/// Yield protocol with per-account staked balances held in a custody
/// account, injectable yield, optional liabilities, and failure
/// switches.
pub(crate) struct MockYieldProtocol {
    ledger: Arc<InMemoryTokenLedger>,
    position: AssetId,
    custody: AccountId,
    staked: DashMap<AccountId, u64>,
    liabilities: DashMap<AccountId, (AssetId, u64)>,
    fail_stake: Mutex<Option<String>>,
    fail_unstake: Mutex<Option<String>>,
}

impl MockYieldProtocol {
    pub(crate) fn new(ledger: Arc<InMemoryTokenLedger>, position: AssetId) -> Self {
        Self {
            ledger,
            position,
            custody: account("protocol:custody"),
            staked: DashMap::new(),
            liabilities: DashMap::new(),
            fail_stake: Mutex::new(None),
            fail_unstake: Mutex::new(None),
        }
    }

    /// Grows `holder`'s staked position, the way protocol rewards do.
    pub(crate) fn add_yield(&self, holder: &AccountId, amount: Amount) {
        self.ledger
            .mint(&self.position, &self.custody, amount)
            .unwrap();
        *self.staked.entry(holder.clone()).or_insert(0) += amount.as_u64();
    }

    pub(crate) fn set_liability(&self, holder: &AccountId, asset: AssetId, amount: Amount) {
        self.liabilities
            .insert(holder.clone(), (asset, amount.as_u64()));
    }

    pub(crate) fn set_fail_stake(&self, reason: Option<&str>) {
        *self.fail_stake.lock() = reason.map(str::to_string);
    }

    pub(crate) fn set_fail_unstake(&self, reason: Option<&str>) {
        *self.fail_unstake.lock() = reason.map(str::to_string);
    }
}

impl YieldProtocol for MockYieldProtocol {
    fn position_asset(&self) -> AssetId {
        self.position.clone()
    }

    fn stake(&self, holder: &AccountId, amount: Amount) -> Result<(), ProtocolError> {
        if let Some(reason) = self.fail_stake.lock().clone() {
            return Err(ProtocolError::StakeRejected { amount, reason });
        }
        self.ledger
            .transfer(&self.position, holder, &self.custody, amount)
            .map_err(|err| ProtocolError::StakeRejected {
                amount,
                reason: err.to_string(),
            })?;
        *self.staked.entry(holder.clone()).or_insert(0) += amount.as_u64();
        Ok(())
    }

    fn unstake(&self, holder: &AccountId, amount: Amount) -> Result<Amount, ProtocolError> {
        if let Some(reason) = self.fail_unstake.lock().clone() {
            return Err(ProtocolError::UnstakeRejected { amount, reason });
        }
        let mut staked = self.staked.entry(holder.clone()).or_insert(0);
        if *staked < amount.as_u64() {
            return Err(ProtocolError::UnstakeRejected {
                amount,
                reason: "insufficient staked balance".to_string(),
            });
        }
        self.ledger
            .transfer(&self.position, &self.custody, holder, amount)
            .map_err(|err| ProtocolError::UnstakeRejected {
                amount,
                reason: err.to_string(),
            })?;
        *staked -= amount.as_u64();
        Ok(amount)
    }

    fn staked_balance(&self, holder: &AccountId) -> Amount {
        self.staked
            .get(holder)
            .map_or(Amount::ZERO, |entry| Amount::new(*entry))
    }

    fn liability_balance(&self, holder: &AccountId) -> Option<(AssetId, Amount)> {
        self.liabilities
            .get(holder)
            .map(|entry| (entry.0.clone(), Amount::new(entry.1)))
    }
}

/// Ledger wrapper that re-enters a target node during the deposit pull,
/// the way a malicious token contract would.
pub(crate) struct ReentrantLedger {
    inner: Arc<InMemoryTokenLedger>,
    target: Mutex<Option<Arc<dyn Investable>>>,
    attacker: AccountId,
    attacked: AtomicBool,
    observed: Mutex<Option<VaultError>>,
}

impl ReentrantLedger {
    pub(crate) fn new(inner: Arc<InMemoryTokenLedger>, attacker: AccountId) -> Self {
        Self {
            inner,
            target: Mutex::new(None),
            attacker,
            attacked: AtomicBool::new(false),
            observed: Mutex::new(None),
        }
    }

    pub(crate) fn arm(&self, target: Arc<dyn Investable>) {
        *self.target.lock() = Some(target);
        self.attacked.store(false, Ordering::SeqCst);
    }

    /// The error the re-entering call received, if the attack fired.
    pub(crate) fn observed(&self) -> Option<VaultError> {
        self.observed.lock().clone()
    }
}

impl TokenLedger for ReentrantLedger {
    fn balance_of(&self, asset: &AssetId, holder: &AccountId) -> Amount {
        self.inner.balance_of(asset, holder)
    }

    fn total_supply(&self, asset: &AssetId) -> Amount {
        self.inner.total_supply(asset)
    }

    fn approve(
        &self,
        asset: &AssetId,
        owner: &AccountId,
        spender: &AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.inner.approve(asset, owner, spender, amount)
    }

    fn allowance(&self, asset: &AssetId, owner: &AccountId, spender: &AccountId) -> Amount {
        self.inner.allowance(asset, owner, spender)
    }

    fn transfer(
        &self,
        asset: &AssetId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.inner.transfer(asset, from, to, amount)
    }

    fn transfer_from(
        &self,
        asset: &AssetId,
        spender: &AccountId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let armed = self.target.lock().clone();
        if let Some(node) = armed {
            if !self.attacked.swap(true, Ordering::SeqCst) {
                // mid-pull callback: try to deposit into the same node
                let result = node.deposit(&self.attacker, Amount::new(1), &self.attacker);
                *self.observed.lock() = result.err();
            }
        }
        self.inner.transfer_from(asset, spender, from, to, amount)
    }

    fn mint(&self, asset: &AssetId, to: &AccountId, amount: Amount) -> Result<(), LedgerError> {
        self.inner.mint(asset, to, amount)
    }

    fn burn(&self, asset: &AssetId, from: &AccountId, amount: Amount) -> Result<(), LedgerError> {
        self.inner.burn(asset, from, amount)
    }
}

fn no_fees() -> FeeConfig {
    FeeConfig {
        deposit: FeePolicy::None,
        withdrawal: FeePolicy::None,
        performance: FeePolicy::None,
        receiver: account("treasury"),
    }
}

pub(crate) fn strategy_node_config(name: &str, token: &str) -> NodeConfig {
    NodeConfig {
        name: name.to_string(),
        human_readable_name: format!("{name} strategy"),
        version: "1.0.0".to_string(),
        owner: account("owner"),
        deposit_asset: asset("USDC"),
        investment_token: asset(token),
        fees: no_fees(),
        limits: LimitConfig::default(),
    }
}

pub(crate) struct StrategyFixture {
    pub ledger: Arc<InMemoryTokenLedger>,
    pub prices: Arc<MockPriceSource>,
    pub swap: Arc<MockSwapEngine>,
    pub protocol: Arc<MockYieldProtocol>,
    pub strategy: Arc<Strategy>,
    pub owner: AccountId,
    pub treasury: AccountId,
    pub alice: AccountId,
    pub bob: AccountId,
}

impl StrategyFixture {
    /// Funds `holder` and approves the strategy for `amount`.
    pub(crate) fn fund_and_approve(&self, holder: &AccountId, amount: Amount) {
        self.ledger.mint(&asset("USDC"), holder, amount).unwrap();
        self.approve(holder, amount);
    }

    pub(crate) fn approve(&self, holder: &AccountId, amount: Amount) {
        self.ledger
            .approve(&asset("USDC"), holder, &self.strategy.node_account(), amount)
            .unwrap();
    }

    pub(crate) fn usdc_balance(&self, holder: &AccountId) -> Amount {
        self.ledger.balance_of(&asset("USDC"), holder)
    }
}

pub(crate) fn strategy_fixture() -> StrategyFixture {
    strategy_fixture_with(no_fees(), LimitConfig::default())
}

pub(crate) fn strategy_fixture_with(fees: FeeConfig, limits: LimitConfig) -> StrategyFixture {
    init_tracing();
    let ledger = Arc::new(InMemoryTokenLedger::new());
    let prices = Arc::new(MockPriceSource::new());
    let swap = Arc::new(MockSwapEngine::new(Arc::clone(&ledger)));
    let position = asset("SG-LP-USDC");
    let protocol = Arc::new(MockYieldProtocol::new(Arc::clone(&ledger), position.clone()));

    prices.set_rate(&position, 1, 1);
    swap.set_pair_identity(&asset("USDC"), &position);

    let mut node = strategy_node_config("sg-usdc", "bSG-USDC");
    node.fees = fees;
    node.limits = limits;
    let config = StrategyConfig {
        node,
        position_asset: position,
    };
    let strategy = Arc::new(
        Strategy::new(
            config,
            account("vault:sg-usdc"),
            Arc::clone(&ledger) as Arc<dyn TokenLedger>,
            Arc::clone(&prices) as Arc<dyn PriceSource>,
            Arc::clone(&swap) as Arc<dyn SwapEngine>,
            Arc::clone(&protocol) as Arc<dyn YieldProtocol>,
        )
        .unwrap(),
    );

    let fixture = StrategyFixture {
        ledger,
        prices,
        swap,
        protocol,
        strategy,
        owner: account("owner"),
        treasury: account("treasury"),
        alice: account("alice"),
        bob: account("bob"),
    };
    fixture.fund_and_approve(&account("alice"), units(10_000));
    fixture.fund_and_approve(&account("bob"), units(10_000));
    fixture
}

pub(crate) struct PortfolioFixture {
    pub ledger: Arc<InMemoryTokenLedger>,
    pub prices: Arc<MockPriceSource>,
    pub swap: Arc<MockSwapEngine>,
    pub portfolio: Arc<Portfolio>,
    pub child_a: Arc<Strategy>,
    pub child_b: Arc<Strategy>,
    pub protocol_a: Arc<MockYieldProtocol>,
    pub protocol_b: Arc<MockYieldProtocol>,
    pub owner: AccountId,
    pub alice: AccountId,
    pub bob: AccountId,
}

impl PortfolioFixture {
    pub(crate) fn fund_and_approve(&self, holder: &AccountId, amount: Amount) {
        self.ledger.mint(&asset("USDC"), holder, amount).unwrap();
        self.ledger
            .approve(&asset("USDC"), holder, &self.portfolio.node_account(), amount)
            .unwrap();
    }

    pub(crate) fn usdc_balance(&self, holder: &AccountId) -> Amount {
        self.ledger.balance_of(&asset("USDC"), holder)
    }
}

/// Portfolio over two leaf strategies at 30% / 70%.
pub(crate) fn portfolio_fixture() -> PortfolioFixture {
    portfolio_fixture_weighted(30_000, 70_000)
}

pub(crate) fn portfolio_fixture_weighted(weight_a: u32, weight_b: u32) -> PortfolioFixture {
    init_tracing();
    let ledger = Arc::new(InMemoryTokenLedger::new());
    let prices = Arc::new(MockPriceSource::new());
    let swap = Arc::new(MockSwapEngine::new(Arc::clone(&ledger)));

    let mut children = Vec::new();
    let mut protocols = Vec::new();
    for (name, token, position) in [
        ("sg-usdc", "bSG-USDC", "SG-LP-USDC"),
        ("tc-usdc", "bTC-USDC", "TC-LP-USDC"),
    ] {
        let position = asset(position);
        let protocol = Arc::new(MockYieldProtocol::new(Arc::clone(&ledger), position.clone()));
        prices.set_rate(&position, 1, 1);
        swap.set_pair_identity(&asset("USDC"), &position);
        let config = StrategyConfig {
            node: strategy_node_config(name, token),
            position_asset: position,
        };
        let strategy = Arc::new(
            Strategy::new(
                config,
                account(&format!("vault:{name}")),
                Arc::clone(&ledger) as Arc<dyn TokenLedger>,
                Arc::clone(&prices) as Arc<dyn PriceSource>,
                Arc::clone(&swap) as Arc<dyn SwapEngine>,
                Arc::clone(&protocol) as Arc<dyn YieldProtocol>,
            )
            .unwrap(),
        );
        children.push(strategy);
        protocols.push(protocol);
    }
    let child_a = Arc::clone(&children[0]);
    let child_b = Arc::clone(&children[1]);
    let protocol_a = Arc::clone(&protocols[0]);
    let protocol_b = Arc::clone(&protocols[1]);

    let config = PortfolioConfig {
        node: NodeConfig {
            name: "main-pool".to_string(),
            human_readable_name: "Main USDC pool".to_string(),
            version: "1.0.0".to_string(),
            owner: account("owner"),
            deposit_asset: asset("USDC"),
            investment_token: asset("bPOOL"),
            fees: no_fees(),
            limits: LimitConfig::default(),
        },
        allocations: vec![
            ChildAllocation {
                name: "sg-usdc".to_string(),
                weight: AllocationWeight::new(weight_a).unwrap(),
            },
            ChildAllocation {
                name: "tc-usdc".to_string(),
                weight: AllocationWeight::new(weight_b).unwrap(),
            },
        ],
    };
    let portfolio = Arc::new(
        Portfolio::new(
            config,
            account("vault:main-pool"),
            Arc::clone(&ledger) as Arc<dyn TokenLedger>,
            Arc::clone(&prices) as Arc<dyn PriceSource>,
            vec![
                Arc::clone(&child_a) as Arc<dyn Investable>,
                Arc::clone(&child_b) as Arc<dyn Investable>,
            ],
        )
        .unwrap(),
    );

    let fixture = PortfolioFixture {
        ledger,
        prices,
        swap,
        portfolio,
        child_a,
        child_b,
        protocol_a,
        protocol_b,
        owner: account("owner"),
        alice: account("alice"),
        bob: account("bob"),
    };
    fixture.fund_and_approve(&account("alice"), units(10_000));
    fixture.fund_and_approve(&account("bob"), units(10_000));
    fixture
}
