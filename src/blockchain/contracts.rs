// Contract handles the checks read from and the action writes to
use alloy::primitives::{Address, TxHash, I256, U256};
use async_trait::async_trait;
use std::sync::Arc;

/// Error raised by a contract read or write.
#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    #[error(transparent)]
    Call(#[from] alloy::contract::Error),

    #[error(transparent)]
    Transport(#[from] alloy::transports::TransportError),

    #[error("Contract call reverted: {0}")]
    Reverted(String),
}

/// `getCollateralRatioTargets()` of a loop strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CollateralRatioTargets {
    pub target: U256,
    pub min_for_rebalance: U256,
    pub max_for_rebalance: U256,
    pub min_bound: U256,
    pub max_bound: U256,
}

impl From<[u64; 5]> for CollateralRatioTargets {
    fn from(values: [u64; 5]) -> Self {
        Self {
            target: U256::from(values[0]),
            min_for_rebalance: U256::from(values[1]),
            max_for_rebalance: U256::from(values[2]),
            min_bound: U256::from(values[3]),
            max_bound: U256::from(values[4]),
        }
    }
}

/// `latestRoundData()` of a Chainlink-style aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoundData {
    pub round_id: u128,
    pub answer: I256,
    pub started_at: u64,
    pub updated_at: u64,
    pub answered_in_round: u128,
}

/// Leveraged loop strategy.
#[async_trait]
pub trait StrategyContract: Send + Sync {
    fn address(&self) -> Address;

    async fn debt_usd(&self) -> Result<U256, ContractError>;

    async fn collateral_usd(&self) -> Result<U256, ContractError>;

    async fn current_collateral_ratio(&self) -> Result<U256, ContractError>;

    async fn collateral_ratio_targets(&self) -> Result<CollateralRatioTargets, ContractError>;

    async fn equity(&self) -> Result<U256, ContractError>;

    async fn total_supply(&self) -> Result<U256, ContractError>;

    async fn rebalance_needed(&self) -> Result<bool, ContractError>;

    /// Submit `rebalance()` and return the transaction hash.
    async fn rebalance(&self) -> Result<TxHash, ContractError>;
}

/// Price feed.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    fn address(&self) -> Address;

    async fn latest_round_data(&self) -> Result<RoundData, ContractError>;

    async fn latest_answer(&self) -> Result<I256, ContractError>;
}

/// Lending pool the strategies borrow from.
#[async_trait]
pub trait LendingPool: Send + Sync {
    fn address(&self) -> Address;

    /// Variable borrow rate of `reserve` in RAY.
    async fn variable_borrow_rate(&self, reserve: Address) -> Result<U256, ContractError>;
}

/// Builds contract handles from addresses.
pub trait ContractProvider: Send + Sync {
    fn strategy(&self, address: Address) -> Arc<dyn StrategyContract>;

    fn oracle(&self, address: Address) -> Arc<dyn PriceOracle>;

    fn lending_pool(&self, address: Address) -> Arc<dyn LendingPool>;
}
