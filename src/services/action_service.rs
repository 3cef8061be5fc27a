// Rebalances and alerts for matches produced by the filter

use alloy::primitives::{Address, TxHash};
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::blockchain::{ContractProvider, StrategyContract};
use crate::error::ActionError;
use crate::models::{
    Base8, Fixed, MatchMetadata, OracleState, Ray, StrategyFindings, UserAction,
};
use crate::services::alerts::{
    send_borrow_rate_alert, send_eps_alert, send_exposure_alert, send_health_factor_alert,
    send_oracle_outage_alert, send_sequencer_outage_alert,
};
use crate::services::checks::{is_strategy_at_risk, is_strategy_overexposed};
use crate::services::notification_service::Notifier;
use crate::store::KeyValueStore;
use crate::utils::equity::{equity_per_share, update_eps};

/// Result of a single rebalance attempt. Errors are absorbed here so one
/// strategy cannot fail its siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebalanceOutcome {
    Submitted(TxHash),
    NotNeeded,
    Failed,
}

pub struct ActionRunner {
    contracts: Arc<dyn ContractProvider>,
    store: Arc<dyn KeyValueStore>,
    notifier: Arc<dyn Notifier>,
    health_factor_threshold: Fixed<Base8>,
}

impl ActionRunner {
    pub fn new(
        contracts: Arc<dyn ContractProvider>,
        store: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
        health_factor_threshold: Fixed<Base8>,
    ) -> Self {
        Self {
            contracts,
            store,
            notifier,
            health_factor_threshold,
        }
    }

    pub async fn handle(&self, metadata: MatchMetadata) -> Result<(), ActionError> {
        info!("Handling {} match", metadata.type_name());

        match metadata {
            MatchMetadata::Withdraw(findings) => {
                self.handle_user_action(UserAction::Withdraw, findings).await
            }
            MatchMetadata::Deposit(findings) => {
                self.handle_user_action(UserAction::Deposit, findings).await
            }
            MatchMetadata::PriceUpdate {
                strategies_to_rebalance,
                oracle_state,
                is_sequencer_out,
            } => {
                self.handle_price_update(&strategies_to_rebalance, &oracle_state, is_sequencer_out)
                    .await
            }
            MatchMetadata::BorrowRate {
                reserve,
                curr_borrow_rate,
                affected_strategies,
            } => {
                self.handle_borrow_rate(reserve, curr_borrow_rate, &affected_strategies)
                    .await
            }
        }
    }

    /// Informational only: alerts on breached states, logs the rest.
    async fn handle_user_action(
        &self,
        action: UserAction,
        findings: StrategyFindings,
    ) -> Result<(), ActionError> {
        let notifier = self.notifier.as_ref();

        if let Some(risk) = findings.risk_state {
            if risk.is_at_risk {
                send_health_factor_alert(notifier, risk.threshold, risk.health_factor).await?;
            } else {
                info!(
                    "Health factor {} after {} deemed safe",
                    risk.health_factor.to_decimal(),
                    action.as_str()
                );
            }
        }

        if let Some(exposure) = findings.exposure_state {
            if exposure.is_over_exposed {
                send_exposure_alert(notifier, exposure.current, exposure.min).await?;
            } else {
                info!(
                    "Collateral ratio {} after {} deemed safe",
                    exposure.current.to_decimal(),
                    action.as_str()
                );
            }
        }

        if let Some(eps) = findings.eps_state {
            if eps.has_eps_decreased {
                send_eps_alert(
                    notifier,
                    eps.strategy_address,
                    eps.current_eps,
                    eps.prev_eps.as_deref(),
                    action,
                )
                .await?;
            } else {
                info!(
                    "Equity per share of {} after {} deemed safe",
                    eps.strategy_address,
                    action.as_str()
                );
            }
        }

        Ok(())
    }

    async fn handle_price_update(
        &self,
        strategies_to_rebalance: &[Address],
        oracle_state: &OracleState,
        is_sequencer_out: bool,
    ) -> Result<(), ActionError> {
        let batch = strategies_to_rebalance
            .iter()
            .map(|address| self.rebalance_and_recheck(*address));

        try_join_all(batch).await.inspect_err(|_| {
            error!("There was an error when attempting to rebalance affected strategies.")
        })?;

        if oracle_state.is_out {
            send_oracle_outage_alert(
                self.notifier.as_ref(),
                oracle_state.oracle_address,
                oracle_state.second_since_last_update,
            )
            .await?;
        }

        if is_sequencer_out {
            send_sequencer_outage_alert(self.notifier.as_ref()).await?;
        }

        Ok(())
    }

    /// Rebalances one strategy, then refreshes its stored EPS and alerts on
    /// whatever is still breached. A failed rebalance skips the rest.
    async fn rebalance_and_recheck(&self, address: Address) -> Result<(), ActionError> {
        let strategy = self.contracts.strategy(address);

        match perform_rebalance(strategy.as_ref()).await {
            RebalanceOutcome::Failed => return Ok(()),
            RebalanceOutcome::Submitted(tx_hash) => {
                info!("Rebalance of {} submitted in {}", address, tx_hash);
            }
            RebalanceOutcome::NotNeeded => {
                info!("Strategy {} no longer needs a rebalance", address);
            }
        }

        let current_eps = equity_per_share(strategy.as_ref()).await?;
        update_eps(self.store.as_ref(), address, current_eps).await?;

        let (risk, exposure) = tokio::try_join!(
            is_strategy_at_risk(strategy.as_ref(), self.health_factor_threshold),
            is_strategy_overexposed(strategy.as_ref()),
        )?;

        if risk.is_at_risk {
            send_health_factor_alert(self.notifier.as_ref(), risk.threshold, risk.health_factor)
                .await?;
        }
        if exposure.is_over_exposed {
            send_exposure_alert(self.notifier.as_ref(), exposure.current, exposure.min).await?;
        }

        Ok(())
    }

    async fn handle_borrow_rate(
        &self,
        reserve: Address,
        curr_borrow_rate: Fixed<Ray>,
        affected_strategies: &[Address],
    ) -> Result<(), ActionError> {
        send_borrow_rate_alert(
            self.notifier.as_ref(),
            reserve,
            curr_borrow_rate,
            affected_strategies,
        )
        .await?;
        Ok(())
    }
}

/// Re-checks `rebalanceNeeded` and submits `rebalance()` when it holds.
pub async fn perform_rebalance(strategy: &dyn StrategyContract) -> RebalanceOutcome {
    let address = strategy.address();

    let needed = match strategy.rebalance_needed().await {
        Ok(needed) => needed,
        Err(e) => {
            error!("Failed to read rebalanceNeeded for {}: {}", address, e);
            return RebalanceOutcome::Failed;
        }
    };

    if !needed {
        return RebalanceOutcome::NotNeeded;
    }

    match strategy.rebalance().await {
        Ok(tx_hash) => RebalanceOutcome::Submitted(tx_hash),
        Err(e) => {
            warn!("Rebalance of {} failed: {}", address, e);
            RebalanceOutcome::Failed
        }
    }
}
