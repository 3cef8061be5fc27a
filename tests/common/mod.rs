#![allow(dead_code)]

use alloy::primitives::{Address, TxHash, I256, U256};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use strategy_keeper::blockchain::{
    CollateralRatioTargets, ContractError, ContractProvider, LendingPool, PriceOracle, RoundData,
    StrategyContract,
};
use strategy_keeper::services::{Notification, NotificationChannel, Notifier, NotifyError};
use strategy_keeper::store::{KeyValueStore, StoreError};

pub fn address(byte: u8) -> Address {
    Address::repeat_byte(byte)
}

fn reverted(what: &str) -> ContractError {
    ContractError::Reverted(format!("{} reverted", what))
}

/// Strategy whose reads return fixed values. A `None` field makes the
/// corresponding read revert.
#[derive(Debug, Clone)]
pub struct MockStrategy {
    pub address: Address,
    pub debt_usd: Option<U256>,
    pub collateral_usd: Option<U256>,
    pub current_collateral_ratio: Option<U256>,
    pub targets: Option<CollateralRatioTargets>,
    pub equity: Option<U256>,
    pub total_supply: Option<U256>,
    pub rebalance_needed: Option<bool>,
    pub rebalance_tx: Option<TxHash>,
}

impl MockStrategy {
    /// Healthy strategy: health factor 2.0, ratio above min, EPS 1.0.
    pub fn healthy(address: Address) -> Self {
        Self {
            address,
            debt_usd: Some(U256::from(100_000_000u64)),
            collateral_usd: Some(U256::from(200_000_000u64)),
            current_collateral_ratio: Some(U256::from(150_000_000u64)),
            targets: Some(CollateralRatioTargets::from([
                150_000_000,
                140_000_000,
                160_000_000,
                130_000_000,
                170_000_000,
            ])),
            equity: Some(U256::from(1_000u64)),
            total_supply: Some(U256::from(1_000u64)),
            rebalance_needed: Some(false),
            rebalance_tx: Some(TxHash::repeat_byte(0xaa)),
        }
    }
}

#[derive(Default)]
pub struct CallLog {
    pub rebalances: AtomicUsize,
    pub equity_reads: AtomicUsize,
}

struct LoggedStrategy {
    inner: MockStrategy,
    log: Arc<CallLog>,
}

#[async_trait]
impl StrategyContract for LoggedStrategy {
    fn address(&self) -> Address {
        self.inner.address
    }

    async fn debt_usd(&self) -> Result<U256, ContractError> {
        self.inner.debt_usd.ok_or_else(|| reverted("debtUSD"))
    }

    async fn collateral_usd(&self) -> Result<U256, ContractError> {
        self.inner.collateral_usd.ok_or_else(|| reverted("collateralUSD"))
    }

    async fn current_collateral_ratio(&self) -> Result<U256, ContractError> {
        self.inner
            .current_collateral_ratio
            .ok_or_else(|| reverted("currentCollateralRatio"))
    }

    async fn collateral_ratio_targets(&self) -> Result<CollateralRatioTargets, ContractError> {
        self.inner
            .targets
            .ok_or_else(|| reverted("getCollateralRatioTargets"))
    }

    async fn equity(&self) -> Result<U256, ContractError> {
        self.log.equity_reads.fetch_add(1, Ordering::SeqCst);
        self.inner.equity.ok_or_else(|| reverted("equity"))
    }

    async fn total_supply(&self) -> Result<U256, ContractError> {
        self.inner.total_supply.ok_or_else(|| reverted("totalSupply"))
    }

    async fn rebalance_needed(&self) -> Result<bool, ContractError> {
        self.inner
            .rebalance_needed
            .ok_or_else(|| reverted("rebalanceNeeded"))
    }

    async fn rebalance(&self) -> Result<TxHash, ContractError> {
        self.log.rebalances.fetch_add(1, Ordering::SeqCst);
        self.inner.rebalance_tx.ok_or_else(|| reverted("rebalance"))
    }
}

#[derive(Debug, Clone)]
pub struct MockOracle {
    pub address: Address,
    pub updated_at: Option<u64>,
    pub latest_answer: Option<I256>,
}

impl MockOracle {
    pub fn new(address: Address, updated_at: u64, latest_answer: i64) -> Self {
        Self {
            address,
            updated_at: Some(updated_at),
            latest_answer: Some(I256::try_from(latest_answer).unwrap()),
        }
    }
}

#[async_trait]
impl PriceOracle for MockOracle {
    fn address(&self) -> Address {
        self.address
    }

    async fn latest_round_data(&self) -> Result<RoundData, ContractError> {
        let updated_at = self.updated_at.ok_or_else(|| reverted("latestRoundData"))?;
        Ok(RoundData {
            round_id: 1,
            answer: self.latest_answer.unwrap_or(I256::ZERO),
            started_at: updated_at,
            updated_at,
            answered_in_round: 1,
        })
    }

    async fn latest_answer(&self) -> Result<I256, ContractError> {
        self.latest_answer.ok_or_else(|| reverted("latestAnswer"))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockPool {
    pub address: Address,
    pub rates: HashMap<Address, U256>,
}

#[async_trait]
impl LendingPool for MockPool {
    fn address(&self) -> Address {
        self.address
    }

    async fn variable_borrow_rate(&self, reserve: Address) -> Result<U256, ContractError> {
        self.rates
            .get(&reserve)
            .copied()
            .ok_or_else(|| reverted("getReserveData"))
    }
}

/// Hands out the registered mocks. Unknown strategies revert on every read.
#[derive(Default)]
pub struct MockContracts {
    pub strategies: HashMap<Address, MockStrategy>,
    pub oracles: HashMap<Address, MockOracle>,
    pub pool: MockPool,
    pub log: Arc<CallLog>,
}

impl MockContracts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strategy(mut self, strategy: MockStrategy) -> Self {
        self.strategies.insert(strategy.address, strategy);
        self
    }

    pub fn with_oracle(mut self, oracle: MockOracle) -> Self {
        self.oracles.insert(oracle.address, oracle);
        self
    }

    pub fn with_rate(mut self, reserve: Address, rate: U256) -> Self {
        self.pool.rates.insert(reserve, rate);
        self
    }
}

impl ContractProvider for MockContracts {
    fn strategy(&self, address: Address) -> Arc<dyn StrategyContract> {
        let inner = self.strategies.get(&address).cloned().unwrap_or(MockStrategy {
            address,
            debt_usd: None,
            collateral_usd: None,
            current_collateral_ratio: None,
            targets: None,
            equity: None,
            total_supply: None,
            rebalance_needed: None,
            rebalance_tx: None,
        });
        Arc::new(LoggedStrategy {
            inner,
            log: self.log.clone(),
        })
    }

    fn oracle(&self, address: Address) -> Arc<dyn PriceOracle> {
        Arc::new(self.oracles.get(&address).cloned().unwrap_or(MockOracle {
            address,
            updated_at: None,
            latest_answer: None,
        }))
    }

    fn lending_pool(&self, address: Address) -> Arc<dyn LendingPool> {
        Arc::new(MockPool {
            address,
            rates: self.pool.rates.clone(),
        })
    }
}

/// Records every notification; optionally rejects all sends.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
    pub channels: Vec<String>,
    pub reject: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            channels: vec!["seamless-alerts".to_string()],
            ..Default::default()
        }
    }

    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::new()
        }
    }

    pub fn subjects(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.subject.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        if self.reject {
            return Err(NotifyError::Rejected {
                channel: notification.channel_alias,
                status: 500,
            });
        }
        self.sent.lock().unwrap().push(notification);
        Ok(())
    }

    async fn list_channels(&self) -> Result<Vec<NotificationChannel>, NotifyError> {
        Ok(self
            .channels
            .iter()
            .map(|name| NotificationChannel { name: name.clone() })
            .collect())
    }
}

/// Store whose every access fails.
pub struct FailingStore;

#[async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Unavailable("offline".to_string()))
    }

    async fn put(&self, _key: &str, _value: String) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("offline".to_string()))
    }
}
