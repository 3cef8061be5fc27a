// Work items handed from the filter to the action
use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::models::fixed_point::{Fixed, Ray};
use crate::models::state::{EpsState, ExposureState, OracleState, RiskState};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub hash: String,
    pub metadata: MatchMetadata,
}

impl Match {
    pub fn new(hash: impl Into<String>, metadata: MatchMetadata) -> Self {
        Self {
            hash: hash.into(),
            metadata,
        }
    }
}

/// Condition-specific payload, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MatchMetadata {
    Withdraw(StrategyFindings),
    Deposit(StrategyFindings),
    #[serde(rename_all = "camelCase")]
    PriceUpdate {
        strategies_to_rebalance: Vec<Address>,
        oracle_state: OracleState,
        is_sequencer_out: bool,
    },
    #[serde(rename_all = "camelCase")]
    BorrowRate {
        reserve: Address,
        curr_borrow_rate: Fixed<Ray>,
        affected_strategies: Vec<Address>,
    },
}

impl MatchMetadata {
    pub fn type_name(&self) -> &'static str {
        match self {
            MatchMetadata::Withdraw(_) => "withdraw",
            MatchMetadata::Deposit(_) => "deposit",
            MatchMetadata::PriceUpdate { .. } => "priceUpdate",
            MatchMetadata::BorrowRate { .. } => "borrowRate",
        }
    }
}

/// User action that produced a withdraw/deposit match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    Withdraw,
    Deposit,
}

impl UserAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserAction::Withdraw => "withdraw",
            UserAction::Deposit => "deposit",
        }
    }

    pub fn metadata(self, findings: StrategyFindings) -> MatchMetadata {
        match self {
            UserAction::Withdraw => MatchMetadata::Withdraw(findings),
            UserAction::Deposit => MatchMetadata::Deposit(findings),
        }
    }
}

/// A single breached strategy condition. The filter emits one match per
/// breached condition, so normally exactly one field is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyFindings {
    #[serde(rename = "riskState", default, skip_serializing_if = "Option::is_none")]
    pub risk_state: Option<RiskState>,
    #[serde(rename = "exposureState", default, skip_serializing_if = "Option::is_none")]
    pub exposure_state: Option<ExposureState>,
    #[serde(rename = "EPSState", default, skip_serializing_if = "Option::is_none")]
    pub eps_state: Option<EpsState>,
}

impl StrategyFindings {
    pub fn risk(state: RiskState) -> Self {
        Self {
            risk_state: Some(state),
            ..Default::default()
        }
    }

    pub fn exposure(state: ExposureState) -> Self {
        Self {
            exposure_state: Some(state),
            ..Default::default()
        }
    }

    pub fn eps(state: EpsState) -> Self {
        Self {
            eps_state: Some(state),
            ..Default::default()
        }
    }
}
