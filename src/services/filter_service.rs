// Match aggregation over a batch of chain events

use alloy::primitives::{Address, I256};
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::blockchain::ContractProvider;
use crate::config::Routing;
use crate::error::{Check, CheckError, FilterError, HandlerGroup};
use crate::models::{
    ChainEvent, ConditionRequest, EventKind, FilterResponse, Fixed, Match, MatchMetadata,
    MatchReason, Ray, StrategyFindings, UserAction,
};
use crate::services::checks::{
    has_eps_decreased, is_oracle_out_at, is_strategy_at_risk, is_strategy_overexposed,
};
use crate::store::KeyValueStore;
use crate::utils::equity::{equity_per_share, update_eps};
use crate::utils::time::unix_now;

/// Oracle answer reported while the rollup sequencer is down.
pub const SEQUENCER_OUT_ANSWER: I256 = I256::ONE;

pub struct EventFilter {
    contracts: Arc<dyn ContractProvider>,
    store: Arc<dyn KeyValueStore>,
    routing: Arc<Routing>,
    clock: fn() -> i64,
}

impl EventFilter {
    pub fn new(
        contracts: Arc<dyn ContractProvider>,
        store: Arc<dyn KeyValueStore>,
        routing: Arc<Routing>,
    ) -> Self {
        Self {
            contracts,
            store,
            routing,
            clock: unix_now,
        }
    }

    /// Replace the wall clock used by the oracle freshness check.
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    pub async fn handle(&self, request: ConditionRequest) -> Result<FilterResponse, FilterError> {
        let mut matches = Vec::new();

        for event in &request.events {
            for reason in &event.match_reasons {
                self.route(event, reason, &mut matches).await?;
            }
        }

        info!(
            "Filter produced {} match(es) from {} event(s)",
            matches.len(),
            request.events.len()
        );
        Ok(FilterResponse { matches })
    }

    async fn route(
        &self,
        event: &ChainEvent,
        reason: &MatchReason,
        matches: &mut Vec<Match>,
    ) -> Result<(), FilterError> {
        let Some(kind) = EventKind::from_signature(&reason.signature) else {
            debug!("Ignoring unmatched signature {}", reason.signature);
            return Ok(());
        };

        if let Some(action) = kind.user_action() {
            return self
                .handle_withdraw_or_deposit(event, reason, action, matches)
                .await
                .map_err(|e| group_failure(HandlerGroup::WithdrawOrDeposit, e));
        }

        if kind == EventKind::PriceUpdate {
            return self
                .handle_price_update(event, reason, matches)
                .await
                .map_err(|e| group_failure(HandlerGroup::PriceUpdate, e));
        }

        if kind.is_pool_action() {
            let reserve = reserve_argument(reason).inspect_err(|_| {
                error!("There was an error during {} check flow.", HandlerGroup::PoolAction)
            })?;
            return self
                .handle_pool_action(event, reason, reserve, matches)
                .await
                .map_err(|e| group_failure(HandlerGroup::PoolAction, e));
        }

        Ok(())
    }

    /// Runs the three strategy checks concurrently and pushes one match per
    /// condition that fired.
    pub async fn handle_withdraw_or_deposit(
        &self,
        event: &ChainEvent,
        reason: &MatchReason,
        action: UserAction,
        matches: &mut Vec<Match>,
    ) -> Result<(), CheckError> {
        let strategy = self.contracts.strategy(reason.address);

        let (risk_state, exposure_state, eps_state) = tokio::try_join!(
            is_strategy_at_risk(strategy.as_ref(), self.routing.health_factor_threshold),
            is_strategy_overexposed(strategy.as_ref()),
            has_eps_decreased(self.store.as_ref(), strategy.as_ref()),
        )?;

        if risk_state.is_at_risk {
            matches.push(Match::new(
                &event.hash,
                action.metadata(StrategyFindings::risk(risk_state)),
            ));
        }
        if exposure_state.is_over_exposed {
            matches.push(Match::new(
                &event.hash,
                action.metadata(StrategyFindings::exposure(exposure_state)),
            ));
        }
        if eps_state.has_eps_decreased {
            matches.push(Match::new(
                &event.hash,
                action.metadata(StrategyFindings::eps(eps_state)),
            ));
        }
        Ok(())
    }

    /// Refreshes the stored EPS of every strategy priced by the oracle and
    /// collects those needing a rebalance, alongside the oracle and
    /// sequencer state.
    pub async fn handle_price_update(
        &self,
        event: &ChainEvent,
        reason: &MatchReason,
        matches: &mut Vec<Match>,
    ) -> Result<(), CheckError> {
        let oracle = self.contracts.oracle(reason.address);
        let oracle_address = oracle.address();

        let latest_answer = oracle.latest_answer().await.map_err(|source| {
            let e = CheckError::ContractRead {
                check: Check::OracleFreshness,
                address: oracle_address,
                source,
            };
            error!("An error has occurred during {}: {}", e.check(), e);
            e
        })?;

        let dependents = self.routing.strategies_for_oracle(&oracle_address);
        let refreshes = dependents.iter().map(|address| self.refresh_strategy(*address));

        let now = (self.clock)();
        let (needs_rebalance, oracle_state) = tokio::try_join!(
            try_join_all(refreshes),
            is_oracle_out_at(self.store.as_ref(), oracle.as_ref(), now),
        )?;

        let strategies_to_rebalance: Vec<Address> = dependents
            .iter()
            .zip(needs_rebalance)
            .filter_map(|(address, needed)| needed.then_some(*address))
            .collect();
        let is_sequencer_out = latest_answer == SEQUENCER_OUT_ANSWER;

        if !strategies_to_rebalance.is_empty() || oracle_state.is_out || is_sequencer_out {
            matches.push(Match::new(
                &event.hash,
                MatchMetadata::PriceUpdate {
                    strategies_to_rebalance,
                    oracle_state,
                    is_sequencer_out,
                },
            ));
        }
        Ok(())
    }

    /// Updates the stored EPS of one strategy and reports whether it needs a
    /// rebalance.
    async fn refresh_strategy(&self, address: Address) -> Result<bool, CheckError> {
        let strategy = self.contracts.strategy(address);

        let current_eps = equity_per_share(strategy.as_ref()).await?;
        update_eps(self.store.as_ref(), address, current_eps).await?;

        strategy.rebalance_needed().await.map_err(|source| {
            let e = CheckError::ContractRead {
                check: Check::RebalanceNeed,
                address,
                source,
            };
            error!("An error has occurred during {}: {}", e.check(), e);
            e
        })
    }

    /// Reads the variable borrow rate of a tracked reserve and pushes the
    /// strategies whose interest threshold it exceeds.
    pub async fn handle_pool_action(
        &self,
        event: &ChainEvent,
        reason: &MatchReason,
        reserve: Address,
        matches: &mut Vec<Match>,
    ) -> Result<(), CheckError> {
        let Some(strategies) = self.routing.strategies_for_debt_token(&reserve) else {
            debug!("Reserve {} is not a tracked debt token", reserve);
            return Ok(());
        };

        let pool = self.contracts.lending_pool(reason.address);
        let rate = pool.variable_borrow_rate(reserve).await.map_err(|source| {
            let e = CheckError::ContractRead {
                check: Check::BorrowRate,
                address: pool.address(),
                source,
            };
            error!("An error has occurred during {}: {}", e.check(), e);
            e
        })?;
        let curr_borrow_rate = Fixed::<Ray>::from_raw(rate);

        let affected_strategies: Vec<Address> = strategies
            .iter()
            .filter(|strategy| {
                self.routing
                    .interest_threshold(strategy)
                    .is_some_and(|threshold| threshold < curr_borrow_rate)
            })
            .copied()
            .collect();

        if !affected_strategies.is_empty() {
            matches.push(Match::new(
                &event.hash,
                MatchMetadata::BorrowRate {
                    reserve,
                    curr_borrow_rate,
                    affected_strategies,
                },
            ));
        }
        Ok(())
    }
}

fn group_failure(group: HandlerGroup, source: CheckError) -> FilterError {
    error!("There was an error during {} check flow.", group);
    FilterError::Group { group, source }
}

/// First event argument of a pool action, the reserve address.
fn reserve_argument(reason: &MatchReason) -> Result<Address, FilterError> {
    let malformed = |message: String| FilterError::MalformedReason {
        signature: reason.signature.clone(),
        message,
    };

    let arg = reason
        .args
        .first()
        .ok_or_else(|| malformed("missing reserve argument".to_string()))?;
    let text = arg
        .as_str()
        .ok_or_else(|| malformed(format!("reserve argument is not a string: {}", arg)))?;
    text.parse::<Address>()
        .map_err(|e| malformed(format!("invalid reserve address {:?}: {}", text, e)))
}
