use alloy::primitives::Address;
use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;
use std::fmt;
use thiserror::Error;

use crate::blockchain::{ConnectError, ContractError};
use crate::models::FixedPointError;
use crate::services::notification_service::NotifyError;
use crate::store::StoreError;

/// The check that produced an error; its display form is the log prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    HealthFactor,
    CollateralRatio,
    EquityPerShare,
    OracleFreshness,
    RebalanceNeed,
    BorrowRate,
    AlertChannels,
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Check::HealthFactor => "health factor check",
            Check::CollateralRatio => "collateral ratio check",
            Check::EquityPerShare => "equity per share calculation",
            Check::OracleFreshness => "oracle freshness check",
            Check::RebalanceNeed => "rebalance need check",
            Check::BorrowRate => "borrow rate check",
            Check::AlertChannels => "alert channel check",
        };
        f.write_str(name)
    }
}

/// Failure inside a single check. The underlying error stays reachable via
/// `source()`.
#[derive(Error, Debug)]
pub enum CheckError {
    #[error("{check} could not read {address}: {source}")]
    ContractRead {
        check: Check,
        address: Address,
        #[source]
        source: ContractError,
    },

    #[error("{check} could not access store entry {address}: {source}")]
    Store {
        check: Check,
        address: Address,
        #[source]
        source: StoreError,
    },

    #[error("{check} arithmetic failed for {address}: {source}")]
    Arithmetic {
        check: Check,
        address: Address,
        #[source]
        source: FixedPointError,
    },

    #[error("{check} found a corrupt stored value for {address}: {value:?}")]
    CorruptValue {
        check: Check,
        address: Address,
        value: String,
    },

    #[error("{check} could not list channels: {source}")]
    Channels {
        check: Check,
        #[source]
        source: NotifyError,
    },
}

impl CheckError {
    pub fn check(&self) -> Check {
        match self {
            CheckError::ContractRead { check, .. }
            | CheckError::Store { check, .. }
            | CheckError::Arithmetic { check, .. }
            | CheckError::CorruptValue { check, .. }
            | CheckError::Channels { check, .. } => *check,
        }
    }

    pub fn address(&self) -> Option<Address> {
        match self {
            CheckError::ContractRead { address, .. }
            | CheckError::Store { address, .. }
            | CheckError::Arithmetic { address, .. }
            | CheckError::CorruptValue { address, .. } => Some(*address),
            CheckError::Channels { .. } => None,
        }
    }
}

/// Handler groups of the filter; each failure aborts the invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerGroup {
    WithdrawOrDeposit,
    PriceUpdate,
    PoolAction,
}

impl fmt::Display for HandlerGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandlerGroup::WithdrawOrDeposit => "withdraw or deposit",
            HandlerGroup::PriceUpdate => "priceUpdate",
            HandlerGroup::PoolAction => "pool action",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("{group} check flow failed: {source}")]
    Group {
        group: HandlerGroup,
        #[source]
        source: CheckError,
    },

    #[error("Malformed {signature} match reason: {message}")]
    MalformedReason { signature: String, message: String },
}

#[derive(Error, Debug)]
pub enum ActionError {
    #[error(transparent)]
    Check(#[from] CheckError),

    #[error(transparent)]
    Notification(#[from] NotifyError),
}

/// Host-level error, rendered as the HTTP response of a failed invocation.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Blockchain error: {0}")]
    BlockchainError(#[from] ConnectError),

    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),

    #[error("Filter error: {0}")]
    FilterError(#[from] FilterError),

    #[error("Action error: {0}")]
    ActionError(#[from] ActionError),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::ValidationError(format!("JSON serialization error: {}", err))
    }
}
