// Formatting and dispatch of alert notifications. No checking logic here.
use alloy::primitives::Address;
use tracing::error;

use crate::models::{Base8, Fixed, Ray, UserAction, Wad};
use crate::services::checks::ORACLE_OUTAGE_THRESHOLD_SECS;
use crate::services::notification_service::{Notification, Notifier, NotifyError};

pub const ALERT_CHANNEL: &str = "seamless-alerts";

async fn dispatch(
    notifier: &dyn Notifier,
    subject: String,
    message: String,
    kind: &str,
) -> Result<(), NotifyError> {
    notifier
        .send(Notification {
            channel_alias: ALERT_CHANNEL.to_string(),
            subject,
            message,
        })
        .await
        .map_err(|e| {
            error!("Failed to send {} notification: {}", kind, e);
            e
        })
}

pub async fn send_oracle_outage_alert(
    notifier: &dyn Notifier,
    oracle_address: Address,
    second_since_last_update: i64,
) -> Result<(), NotifyError> {
    dispatch(
        notifier,
        "ORACLE OUTAGE".to_string(),
        format!(
            "Seconds elapsed since last update for {}: {}. This is more than {} seconds",
            oracle_address, second_since_last_update, ORACLE_OUTAGE_THRESHOLD_SECS
        ),
        "oracle outage",
    )
    .await
}

pub async fn send_sequencer_outage_alert(notifier: &dyn Notifier) -> Result<(), NotifyError> {
    dispatch(
        notifier,
        "SEQUENCER OUTAGE".to_string(),
        "Latest answer of sequencer oracle is 1.".to_string(),
        "sequencer outage",
    )
    .await
}

pub async fn send_health_factor_alert(
    notifier: &dyn Notifier,
    threshold: Fixed<Base8>,
    health_factor: Fixed<Base8>,
) -> Result<(), NotifyError> {
    dispatch(
        notifier,
        "HEALTH FACTOR THRESHOLD BREACHED".to_string(),
        format!(
            "Current strategy health factor threshold is: {} and healthFactor is {}",
            threshold.to_decimal(),
            health_factor.to_decimal()
        ),
        "health factor",
    )
    .await
}

pub async fn send_eps_alert(
    notifier: &dyn Notifier,
    strategy: Address,
    current_eps: Fixed<Wad>,
    prev_eps: Option<&str>,
    action: UserAction,
) -> Result<(), NotifyError> {
    dispatch(
        notifier,
        format!(
            "STRATEGY EQUITY PER SHARE DECREASED AFTER USER ACTION: {}",
            action.as_str().to_uppercase()
        ),
        format!(
            "This action resulted in {} EPS to become {} from {}",
            strategy,
            current_eps,
            prev_eps.unwrap_or("none")
        ),
        "EPS",
    )
    .await
}

pub async fn send_exposure_alert(
    notifier: &dyn Notifier,
    current: Fixed<Base8>,
    min_for_rebalance: Fixed<Base8>,
) -> Result<(), NotifyError> {
    dispatch(
        notifier,
        "STRATEGY IS OVEREXPOSED".to_string(),
        format!(
            "Current collateral ratio is {} and minForRebalance ratio is {}",
            current.to_decimal(),
            min_for_rebalance.to_decimal()
        ),
        "exposure",
    )
    .await
}

pub async fn send_borrow_rate_alert(
    notifier: &dyn Notifier,
    reserve: Address,
    current_rate: Fixed<Ray>,
    affected_strategies: &[Address],
) -> Result<(), NotifyError> {
    let affected = affected_strategies
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(", ");

    dispatch(
        notifier,
        "LENDING POOL BORROW RATE EXCEEDED THRESHOLD".to_string(),
        format!(
            "Current rate for {} is {}, which affects {}.",
            reserve,
            current_rate.to_decimal(),
            affected
        ),
        "borrow rate",
    )
    .await
}
