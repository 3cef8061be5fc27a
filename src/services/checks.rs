// Risk checks shared by the filter and the action

use tracing::error;

use crate::blockchain::{PriceOracle, StrategyContract};
use crate::error::{Check, CheckError};
use crate::models::{Base8, EpsState, ExposureState, Fixed, OracleState, RiskState, Wad};
use crate::services::alerts::ALERT_CHANNEL;
use crate::services::notification_service::Notifier;
use crate::store::KeyValueStore;
use crate::utils::equity::{equity_per_share, store_key, update_eps};
use crate::utils::time::unix_now;

/// One day plus a one minute grace period.
pub const ORACLE_OUTAGE_THRESHOLD_SECS: i64 = 24 * 60 * 60 + 60;

fn log_failure(e: CheckError) -> CheckError {
    error!("An error has occurred during {}: {}", e.check(), e);
    e
}

/// Health factor is `collateralUSD * 1e8 / debtUSD`; at risk when strictly
/// below `threshold`. A strategy without debt has the maximum health factor.
pub async fn is_strategy_at_risk(
    strategy: &dyn StrategyContract,
    threshold: Fixed<Base8>,
) -> Result<RiskState, CheckError> {
    let address = strategy.address();

    let (debt, collateral) = tokio::try_join!(strategy.debt_usd(), strategy.collateral_usd())
        .map_err(|source| {
            log_failure(CheckError::ContractRead {
                check: Check::HealthFactor,
                address,
                source,
            })
        })?;

    let health_factor = if debt.is_zero() {
        Fixed::<Base8>::MAX
    } else {
        Fixed::<Base8>::ratio(collateral, debt).map_err(|source| {
            log_failure(CheckError::Arithmetic {
                check: Check::HealthFactor,
                address,
                source,
            })
        })?
    };

    Ok(RiskState {
        is_at_risk: health_factor < threshold,
        threshold,
        health_factor,
    })
}

/// Overexposed when the current collateral ratio is strictly below the
/// min-for-rebalance target.
pub async fn is_strategy_overexposed(
    strategy: &dyn StrategyContract,
) -> Result<ExposureState, CheckError> {
    let address = strategy.address();

    let (current, targets) = tokio::try_join!(
        strategy.current_collateral_ratio(),
        strategy.collateral_ratio_targets()
    )
    .map_err(|source| {
        log_failure(CheckError::ContractRead {
            check: Check::CollateralRatio,
            address,
            source,
        })
    })?;

    let current = Fixed::<Base8>::from_raw(current);
    let min = Fixed::<Base8>::from_raw(targets.min_for_rebalance);

    Ok(ExposureState {
        is_over_exposed: current < min,
        current,
        min,
    })
}

/// Compares the current equity per share with the persisted one and stores
/// the current value, whether or not it decreased.
///
/// The stored string is compared raw against the 18-decimal current value.
pub async fn has_eps_decreased(
    store: &dyn KeyValueStore,
    strategy: &dyn StrategyContract,
) -> Result<EpsState, CheckError> {
    let address = strategy.address();

    let prev_eps = store.get(&store_key(address)).await.map_err(|source| {
        log_failure(CheckError::Store {
            check: Check::EquityPerShare,
            address,
            source,
        })
    })?;

    let current_eps = equity_per_share(strategy).await?;
    update_eps(store, address, current_eps).await?;

    let has_eps_decreased = match prev_eps.as_deref() {
        Some(prev) => {
            let prev: Fixed<Wad> = prev.parse().map_err(|_| {
                log_failure(CheckError::CorruptValue {
                    check: Check::EquityPerShare,
                    address,
                    value: prev.to_string(),
                })
            })?;
            current_eps < prev
        }
        None => false,
    };

    Ok(EpsState {
        strategy_address: address,
        prev_eps,
        current_eps,
        has_eps_decreased,
    })
}

pub async fn is_oracle_out(
    store: &dyn KeyValueStore,
    oracle: &dyn PriceOracle,
) -> Result<OracleState, CheckError> {
    is_oracle_out_at(store, oracle, unix_now()).await
}

/// Records the feed's latest `updatedAt` and reports the time elapsed since
/// the timestamp recorded by the previous run. Never out on the first run.
pub async fn is_oracle_out_at(
    store: &dyn KeyValueStore,
    oracle: &dyn PriceOracle,
    now: i64,
) -> Result<OracleState, CheckError> {
    let address = oracle.address();
    let key = store_key(address);
    let store_failure = |source| {
        log_failure(CheckError::Store {
            check: Check::OracleFreshness,
            address,
            source,
        })
    };

    let round = oracle.latest_round_data().await.map_err(|source| {
        log_failure(CheckError::ContractRead {
            check: Check::OracleFreshness,
            address,
            source,
        })
    })?;

    let previous = store.get(&key).await.map_err(store_failure)?;
    store
        .put(&key, round.updated_at.to_string())
        .await
        .map_err(store_failure)?;

    let second_since_last_update = match previous.as_deref() {
        Some(value) => {
            let last_update: i64 = value.trim().parse().map_err(|_| {
                log_failure(CheckError::CorruptValue {
                    check: Check::OracleFreshness,
                    address,
                    value: value.to_string(),
                })
            })?;
            now - last_update
        }
        None => 0,
    };

    Ok(OracleState {
        is_out: second_since_last_update > ORACLE_OUTAGE_THRESHOLD_SECS,
        second_since_last_update,
        oracle_address: address,
    })
}

/// Logs an error when no channel named `seamless-alerts` is configured.
/// Returns whether the channel exists.
pub async fn check_alert_channels_exist(notifier: &dyn Notifier) -> Result<bool, CheckError> {
    let channels = notifier.list_channels().await.map_err(|source| {
        log_failure(CheckError::Channels {
            check: Check::AlertChannels,
            source,
        })
    })?;

    let exists = channels.iter().any(|channel| channel.name == ALERT_CHANNEL);
    if !exists {
        error!("No alert notification channels exist.");
    }
    Ok(exists)
}
