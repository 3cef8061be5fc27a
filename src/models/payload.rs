use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::models::matches::{Match, MatchMetadata, UserAction};

/// Envelope used by the trigger infrastructure for both functions:
/// `{ request: { body: ... } }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookPayload<B> {
    pub request: WebhookRequest<B>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookRequest<B> {
    pub body: B,
}

impl<B> WebhookPayload<B> {
    pub fn new(body: B) -> Self {
        Self {
            request: WebhookRequest { body },
        }
    }

    pub fn into_body(self) -> B {
        self.request.body
    }
}

pub type FilterPayload = WebhookPayload<ConditionRequest>;
pub type ActionPayload = WebhookPayload<ActionBody>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConditionRequest {
    #[serde(default)]
    pub events: Vec<ChainEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainEvent {
    pub hash: String,
    #[serde(default)]
    pub match_reasons: Vec<MatchReason>,
}

/// A pre-classified reason an event was forwarded: the event signature,
/// the emitting contract and the decoded arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchReason {
    pub signature: String,
    pub address: Address,
    #[serde(default)]
    pub args: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterResponse {
    pub matches: Vec<Match>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionBody {
    pub metadata: MatchMetadata,
}

pub const DEPOSIT_SIG: &str = "Deposit(address,address,uint256,uint256)";
pub const WITHDRAW_SIG: &str = "Withdraw(address,address,address,uint256,uint256)";
pub const PRICE_UPDATE_SIG: &str = "AnswerUpdated(int256,uint256,uint256)";
pub const POOL_LIQUIDATION_SIG: &str =
    "LiquidationCall(address,address,address,uint256,uint256,address,bool)";
pub const POOL_BORROW_SIG: &str = "Borrow(address,address,address,uint256,uint8,uint256,uint16)";
pub const POOL_REPAY_SIG: &str = "Repay(address,address,address,uint256,bool)";
pub const POOL_WITHDRAW_SIG: &str = "Withdraw(address,address,address,uint256)";
pub const POOL_SUPPLY_SIG: &str = "Supply(address,address,address,uint256,uint16)";

/// Event signatures the filter reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Deposit,
    Withdraw,
    PriceUpdate,
    PoolBorrow,
    PoolRepay,
    PoolWithdraw,
    PoolSupply,
    PoolLiquidation,
}

impl EventKind {
    pub fn from_signature(signature: &str) -> Option<Self> {
        match signature {
            DEPOSIT_SIG => Some(EventKind::Deposit),
            WITHDRAW_SIG => Some(EventKind::Withdraw),
            PRICE_UPDATE_SIG => Some(EventKind::PriceUpdate),
            POOL_BORROW_SIG => Some(EventKind::PoolBorrow),
            POOL_REPAY_SIG => Some(EventKind::PoolRepay),
            POOL_WITHDRAW_SIG => Some(EventKind::PoolWithdraw),
            POOL_SUPPLY_SIG => Some(EventKind::PoolSupply),
            POOL_LIQUIDATION_SIG => Some(EventKind::PoolLiquidation),
            _ => None,
        }
    }

    pub fn user_action(&self) -> Option<UserAction> {
        match self {
            EventKind::Deposit => Some(UserAction::Deposit),
            EventKind::Withdraw => Some(UserAction::Withdraw),
            _ => None,
        }
    }

    pub fn is_pool_action(&self) -> bool {
        matches!(
            self,
            EventKind::PoolBorrow
                | EventKind::PoolRepay
                | EventKind::PoolWithdraw
                | EventKind::PoolSupply
                | EventKind::PoolLiquidation
        )
    }
}
