// Alloy-backed contract handles
use alloy::network::EthereumWallet;
use alloy::primitives::{Address, TxHash, I256, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use alloy::transports::http::{Client, Http};
use async_trait::async_trait;
use std::str::FromStr;
use std::sync::Arc;

use crate::blockchain::contracts::{
    CollateralRatioTargets, ContractError, ContractProvider, LendingPool, PriceOracle, RoundData,
    StrategyContract,
};

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    interface ILoopStrategy {
        struct CollateralRatio {
            uint256 target;
            uint256 minForRebalance;
            uint256 maxForRebalance;
            uint256 minBound;
            uint256 maxBound;
        }

        function rebalanceNeeded() external view returns (bool);
        function rebalance() external returns (uint256);
        function debtUSD() external view returns (uint256);
        function collateralUSD() external view returns (uint256);
        function currentCollateralRatio() external view returns (uint256);
        function getCollateralRatioTargets() external view returns (CollateralRatio memory);
        function equity() external view returns (uint256);
        function totalSupply() external view returns (uint256);
    }

    #[allow(missing_docs)]
    #[sol(rpc)]
    interface IPriceFeed {
        function latestRoundData() external view returns (
            uint80 roundId,
            int256 answer,
            uint256 startedAt,
            uint256 updatedAt,
            uint80 answeredInRound
        );
        function latestAnswer() external view returns (int256);
    }

    // Field 3 carries the variable borrow rate the keeper compares against.
    #[allow(missing_docs)]
    #[sol(rpc)]
    interface ILendingPool {
        struct ReserveData {
            uint256 configuration;
            uint128 liquidityIndex;
            uint128 currentLiquidityRate;
            uint128 currentVariableBorrowRate;
            uint128 variableBorrowIndex;
            uint128 currentStableBorrowRate;
            uint40 lastUpdateTimestamp;
            uint16 id;
            address aTokenAddress;
            address stableDebtTokenAddress;
            address variableDebtTokenAddress;
            address interestRateStrategyAddress;
            uint128 accruedToTreasury;
            uint128 unbacked;
            uint128 isolationModeTotalDebt;
        }

        function getReserveData(address asset) external view returns (ReserveData memory);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("Invalid relayer key: {0}")]
    InvalidPrivateKey(String),
}

/// Read-only handles when `private_key` is `None`, otherwise handles whose
/// writes are signed by the relayer key.
pub fn connect(
    rpc_url: &str,
    private_key: Option<&str>,
) -> Result<Arc<dyn ContractProvider>, ConnectError> {
    let url = rpc_url
        .parse()
        .map_err(|e| ConnectError::InvalidRpcUrl(format!("{}: {}", rpc_url, e)))?;

    match private_key {
        Some(key) => {
            let signer = PrivateKeySigner::from_str(key)
                .map_err(|e| ConnectError::InvalidPrivateKey(e.to_string()))?;
            tracing::info!(relayer = %signer.address(), "Using relayer signer for rebalances");
            let provider = ProviderBuilder::new()
                .with_recommended_fillers()
                .wallet(EthereumWallet::from(signer))
                .on_http(url);
            Ok(Arc::new(AlloyContracts::new(provider)))
        }
        None => {
            let provider = ProviderBuilder::new().on_http(url);
            Ok(Arc::new(AlloyContracts::new(provider)))
        }
    }
}

#[derive(Debug, Clone)]
pub struct AlloyContracts<P> {
    provider: P,
}

impl<P> AlloyContracts<P>
where
    P: Provider<Http<Client>> + Clone + 'static,
{
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

impl<P> ContractProvider for AlloyContracts<P>
where
    P: Provider<Http<Client>> + Clone + 'static,
{
    fn strategy(&self, address: Address) -> Arc<dyn StrategyContract> {
        Arc::new(AlloyStrategy {
            instance: ILoopStrategy::new(address, self.provider.clone()),
        })
    }

    fn oracle(&self, address: Address) -> Arc<dyn PriceOracle> {
        Arc::new(AlloyPriceFeed {
            instance: IPriceFeed::new(address, self.provider.clone()),
        })
    }

    fn lending_pool(&self, address: Address) -> Arc<dyn LendingPool> {
        Arc::new(AlloyLendingPool {
            instance: ILendingPool::new(address, self.provider.clone()),
        })
    }
}

struct AlloyStrategy<P> {
    instance: ILoopStrategy::ILoopStrategyInstance<Http<Client>, P>,
}

#[async_trait]
impl<P> StrategyContract for AlloyStrategy<P>
where
    P: Provider<Http<Client>> + Clone + 'static,
{
    fn address(&self) -> Address {
        *self.instance.address()
    }

    async fn debt_usd(&self) -> Result<U256, ContractError> {
        Ok(self.instance.debtUSD().call().await?._0)
    }

    async fn collateral_usd(&self) -> Result<U256, ContractError> {
        Ok(self.instance.collateralUSD().call().await?._0)
    }

    async fn current_collateral_ratio(&self) -> Result<U256, ContractError> {
        Ok(self.instance.currentCollateralRatio().call().await?._0)
    }

    async fn collateral_ratio_targets(&self) -> Result<CollateralRatioTargets, ContractError> {
        let targets = self.instance.getCollateralRatioTargets().call().await?._0;
        Ok(CollateralRatioTargets {
            target: targets.target,
            min_for_rebalance: targets.minForRebalance,
            max_for_rebalance: targets.maxForRebalance,
            min_bound: targets.minBound,
            max_bound: targets.maxBound,
        })
    }

    async fn equity(&self) -> Result<U256, ContractError> {
        Ok(self.instance.equity().call().await?._0)
    }

    async fn total_supply(&self) -> Result<U256, ContractError> {
        Ok(self.instance.totalSupply().call().await?._0)
    }

    async fn rebalance_needed(&self) -> Result<bool, ContractError> {
        Ok(self.instance.rebalanceNeeded().call().await?._0)
    }

    async fn rebalance(&self) -> Result<TxHash, ContractError> {
        let call = self.instance.rebalance();
        let pending = call.send().await?;
        Ok(*pending.tx_hash())
    }
}

struct AlloyPriceFeed<P> {
    instance: IPriceFeed::IPriceFeedInstance<Http<Client>, P>,
}

#[async_trait]
impl<P> PriceOracle for AlloyPriceFeed<P>
where
    P: Provider<Http<Client>> + Clone + 'static,
{
    fn address(&self) -> Address {
        *self.instance.address()
    }

    async fn latest_round_data(&self) -> Result<RoundData, ContractError> {
        let round = self.instance.latestRoundData().call().await?;
        Ok(RoundData {
            round_id: round.roundId.saturating_to(),
            answer: round.answer,
            started_at: round.startedAt.saturating_to(),
            updated_at: round.updatedAt.saturating_to(),
            answered_in_round: round.answeredInRound.saturating_to(),
        })
    }

    async fn latest_answer(&self) -> Result<I256, ContractError> {
        Ok(self.instance.latestAnswer().call().await?._0)
    }
}

struct AlloyLendingPool<P> {
    instance: ILendingPool::ILendingPoolInstance<Http<Client>, P>,
}

#[async_trait]
impl<P> LendingPool for AlloyLendingPool<P>
where
    P: Provider<Http<Client>> + Clone + 'static,
{
    fn address(&self) -> Address {
        *self.instance.address()
    }

    async fn variable_borrow_rate(&self, reserve: Address) -> Result<U256, ContractError> {
        let data = self.instance.getReserveData(reserve).call().await?._0;
        Ok(U256::from(data.currentVariableBorrowRate))
    }
}
