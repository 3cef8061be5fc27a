use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::models::fixed_point::{Base8, Fixed, Wad};

/// Health factor of a strategy against the configured threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskState {
    pub is_at_risk: bool,
    pub threshold: Fixed<Base8>,
    pub health_factor: Fixed<Base8>,
}

/// Current collateral ratio against the min-for-rebalance target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExposureState {
    pub is_over_exposed: bool,
    pub current: Fixed<Base8>,
    pub min: Fixed<Base8>,
}

/// Equity per share compared with the value persisted by the previous run.
///
/// `prev_eps` is the stored string as read, `None` on the first run for
/// the strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpsState {
    #[serde(rename = "strategyAddress")]
    pub strategy_address: Address,
    #[serde(rename = "prevEPS")]
    pub prev_eps: Option<String>,
    #[serde(rename = "currentEPS")]
    pub current_eps: Fixed<Wad>,
    #[serde(rename = "hasEPSDecreased")]
    pub has_eps_decreased: bool,
}

/// Price-feed freshness. `second_since_last_update` is signed: a feed whose
/// stored timestamp lies ahead of the local clock yields a negative value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleState {
    pub is_out: bool,
    pub second_since_last_update: i64,
    pub oracle_address: Address,
}
