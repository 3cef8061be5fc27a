mod common;

use alloy::primitives::{Address, U256};
use common::{address, MockContracts, MockOracle, MockStrategy};
use serde_json::json;
use std::sync::Arc;

use strategy_keeper::config::Routing;
use strategy_keeper::error::{FilterError, HandlerGroup};
use strategy_keeper::models::{
    ChainEvent, ConditionRequest, Fixed, MatchMetadata, MatchReason, Ray, DEPOSIT_SIG,
    POOL_BORROW_SIG, POOL_WITHDRAW_SIG, PRICE_UPDATE_SIG, WITHDRAW_SIG,
};
use strategy_keeper::services::EventFilter;
use strategy_keeper::store::{KeyValueStore, MemoryStore};
use strategy_keeper::utils::equity::store_key;

const NOW: i64 = 1_700_000_000;

fn oracle_addr() -> Address {
    address(0x0a)
}

fn weth() -> Address {
    address(0x42)
}

fn pool_addr() -> Address {
    address(0x99)
}

fn routing() -> Routing {
    Routing::new(Fixed::from(110_000_000u64))
        .with_oracle(oracle_addr(), vec![address(1), address(2)])
        .with_debt_token(weth(), vec![address(1), address(2)])
        .with_interest_threshold(address(1), Fixed::<Ray>::parse_units("0.03").unwrap())
        .with_interest_threshold(address(2), Fixed::<Ray>::parse_units("0.05").unwrap())
}

fn filter(contracts: MockContracts, store: Arc<MemoryStore>) -> EventFilter {
    EventFilter::new(Arc::new(contracts), store, Arc::new(routing())).with_clock(|| NOW)
}

fn event(hash: &str, signature: &str, emitter: Address, args: Vec<serde_json::Value>) -> ChainEvent {
    ChainEvent {
        hash: hash.to_string(),
        match_reasons: vec![MatchReason {
            signature: signature.to_string(),
            address: emitter,
            args,
        }],
    }
}

fn request(events: Vec<ChainEvent>) -> ConditionRequest {
    ConditionRequest { events }
}

fn base_contracts() -> MockContracts {
    MockContracts::new()
        .with_strategy(MockStrategy::healthy(address(1)))
        .with_strategy(MockStrategy::healthy(address(2)))
}

#[tokio::test]
async fn test_sequencer_outage_produces_price_update_match() {
    let contracts = base_contracts().with_oracle(MockOracle::new(oracle_addr(), NOW as u64, 1));
    let filter = filter(contracts, Arc::new(MemoryStore::new()));

    let response = filter
        .handle(request(vec![event("0x01", PRICE_UPDATE_SIG, oracle_addr(), vec![])]))
        .await
        .unwrap();

    assert_eq!(response.matches.len(), 1);
    assert_eq!(response.matches[0].hash, "0x01");
    match &response.matches[0].metadata {
        MatchMetadata::PriceUpdate {
            strategies_to_rebalance,
            oracle_state,
            is_sequencer_out,
        } => {
            assert!(*is_sequencer_out);
            assert!(strategies_to_rebalance.is_empty());
            assert!(!oracle_state.is_out);
        }
        other => panic!("unexpected metadata: {:?}", other),
    }
}

#[tokio::test]
async fn test_quiet_price_update_refreshes_eps_without_match() {
    let contracts =
        base_contracts().with_oracle(MockOracle::new(oracle_addr(), NOW as u64, 250_000_000_000));
    let store = Arc::new(MemoryStore::new());
    let filter = filter(contracts, store.clone());

    let response = filter
        .handle(request(vec![event("0x02", PRICE_UPDATE_SIG, oracle_addr(), vec![])]))
        .await
        .unwrap();

    assert!(response.matches.is_empty());
    // two strategy EPS entries plus the oracle timestamp
    assert_eq!(store.len().await, 3);
    assert_eq!(
        store.get(&store_key(address(1))).await.unwrap().as_deref(),
        Some("1000000000000000000")
    );
}

#[tokio::test]
async fn test_price_update_lists_strategies_needing_rebalance() {
    let mut needs_rebalance = MockStrategy::healthy(address(2));
    needs_rebalance.rebalance_needed = Some(true);
    let contracts = MockContracts::new()
        .with_strategy(MockStrategy::healthy(address(1)))
        .with_strategy(needs_rebalance)
        .with_oracle(MockOracle::new(oracle_addr(), NOW as u64, 250_000_000_000));
    let filter = filter(contracts, Arc::new(MemoryStore::new()));

    let response = filter
        .handle(request(vec![event("0x03", PRICE_UPDATE_SIG, oracle_addr(), vec![])]))
        .await
        .unwrap();

    assert_eq!(response.matches.len(), 1);
    match &response.matches[0].metadata {
        MatchMetadata::PriceUpdate {
            strategies_to_rebalance,
            is_sequencer_out,
            ..
        } => {
            assert_eq!(strategies_to_rebalance, &vec![address(2)]);
            assert!(!*is_sequencer_out);
        }
        other => panic!("unexpected metadata: {:?}", other),
    }
}

#[tokio::test]
async fn test_stale_oracle_produces_match() {
    let contracts =
        base_contracts().with_oracle(MockOracle::new(oracle_addr(), NOW as u64, 250_000_000_000));
    let stale = (NOW - 90_000).to_string();
    let store = Arc::new(MemoryStore::with_entries([(store_key(oracle_addr()), stale)]));
    let filter = filter(contracts, store);

    let response = filter
        .handle(request(vec![event("0x04", PRICE_UPDATE_SIG, oracle_addr(), vec![])]))
        .await
        .unwrap();

    assert_eq!(response.matches.len(), 1);
    match &response.matches[0].metadata {
        MatchMetadata::PriceUpdate { oracle_state, .. } => {
            assert!(oracle_state.is_out);
            assert_eq!(oracle_state.second_since_last_update, 90_000);
        }
        other => panic!("unexpected metadata: {:?}", other),
    }
}

#[tokio::test]
async fn test_borrow_rate_affects_only_exceeded_thresholds() {
    let rate = Fixed::<Ray>::parse_units("0.04").unwrap();
    let contracts = base_contracts().with_rate(weth(), rate.raw());
    let filter = filter(contracts, Arc::new(MemoryStore::new()));

    let response = filter
        .handle(request(vec![event(
            "0x05",
            POOL_BORROW_SIG,
            pool_addr(),
            vec![json!(weth().to_string())],
        )]))
        .await
        .unwrap();

    assert_eq!(response.matches.len(), 1);
    assert_eq!(
        response.matches[0].metadata,
        MatchMetadata::BorrowRate {
            reserve: weth(),
            curr_borrow_rate: rate,
            affected_strategies: vec![address(1)],
        }
    );
}

#[tokio::test]
async fn test_pool_withdraw_routes_to_borrow_rate_check() {
    let rate = Fixed::<Ray>::parse_units("0.06").unwrap();
    let contracts = base_contracts().with_rate(weth(), rate.raw());
    let filter = filter(contracts, Arc::new(MemoryStore::new()));

    let response = filter
        .handle(request(vec![event(
            "0x0f",
            POOL_WITHDRAW_SIG,
            pool_addr(),
            vec![json!(weth().to_string())],
        )]))
        .await
        .unwrap();

    assert_eq!(response.matches.len(), 1);
    match &response.matches[0].metadata {
        MatchMetadata::BorrowRate {
            affected_strategies,
            ..
        } => assert_eq!(affected_strategies, &vec![address(1), address(2)]),
        other => panic!("unexpected metadata: {:?}", other),
    }
}

#[tokio::test]
async fn test_borrow_rate_below_all_thresholds_is_quiet() {
    let rate = Fixed::<Ray>::parse_units("0.01").unwrap();
    let contracts = base_contracts().with_rate(weth(), rate.raw());
    let filter = filter(contracts, Arc::new(MemoryStore::new()));

    let response = filter
        .handle(request(vec![event(
            "0x06",
            POOL_BORROW_SIG,
            pool_addr(),
            vec![json!(weth().to_string())],
        )]))
        .await
        .unwrap();

    assert!(response.matches.is_empty());
}

#[tokio::test]
async fn test_untracked_reserve_is_ignored() {
    let filter = filter(base_contracts(), Arc::new(MemoryStore::new()));

    let response = filter
        .handle(request(vec![event(
            "0x07",
            POOL_BORROW_SIG,
            pool_addr(),
            vec![json!(address(0x77).to_string())],
        )]))
        .await
        .unwrap();

    assert!(response.matches.is_empty());
}

#[tokio::test]
async fn test_pool_action_without_reserve_is_malformed() {
    let filter = filter(base_contracts(), Arc::new(MemoryStore::new()));

    let err = filter
        .handle(request(vec![event("0x08", POOL_BORROW_SIG, pool_addr(), vec![])]))
        .await
        .unwrap_err();

    assert!(matches!(err, FilterError::MalformedReason { .. }));
}

#[tokio::test]
async fn test_unmatched_signature_is_ignored() {
    let filter = filter(MockContracts::new(), Arc::new(MemoryStore::new()));

    let response = filter
        .handle(request(vec![event(
            "0x09",
            "Transfer(address,address,uint256)",
            address(5),
            vec![],
        )]))
        .await
        .unwrap();

    assert!(response.matches.is_empty());
}

#[tokio::test]
async fn test_withdraw_emits_one_match_per_breach() {
    let mut strategy = MockStrategy::healthy(address(1));
    strategy.collateral_usd = Some(U256::from(105_000_000u64));
    strategy.current_collateral_ratio = Some(U256::from(135_000_000u64));
    let contracts = MockContracts::new().with_strategy(strategy);
    let filter = filter(contracts, Arc::new(MemoryStore::new()));

    let response = filter
        .handle(request(vec![event("0x0a", WITHDRAW_SIG, address(1), vec![])]))
        .await
        .unwrap();

    assert_eq!(response.matches.len(), 2);
    let findings: Vec<_> = response
        .matches
        .iter()
        .map(|m| match &m.metadata {
            MatchMetadata::Withdraw(findings) => findings.clone(),
            other => panic!("unexpected metadata: {:?}", other),
        })
        .collect();
    assert!(findings[0].risk_state.as_ref().is_some_and(|s| s.is_at_risk));
    assert!(findings[0].exposure_state.is_none());
    assert!(findings[1].exposure_state.as_ref().is_some_and(|s| s.is_over_exposed));
    assert!(findings[1].risk_state.is_none());
}

#[tokio::test]
async fn test_deposit_with_eps_drop_tags_deposit() {
    let store = Arc::new(MemoryStore::with_entries([(
        store_key(address(1)),
        "2000000000000000000",
    )]));
    let filter = filter(base_contracts(), store);

    let response = filter
        .handle(request(vec![event("0x0b", DEPOSIT_SIG, address(1), vec![])]))
        .await
        .unwrap();

    assert_eq!(response.matches.len(), 1);
    assert_eq!(response.matches[0].metadata.type_name(), "deposit");
    let value = serde_json::to_value(&response.matches[0]).unwrap();
    assert_eq!(value["metadata"]["EPSState"]["hasEPSDecreased"], json!(true));
    assert_eq!(value["metadata"]["EPSState"]["prevEPS"], json!("2000000000000000000"));
}

#[tokio::test]
async fn test_failing_group_aborts_whole_batch() {
    let filter = filter(base_contracts(), Arc::new(MemoryStore::new()));

    let err = filter
        .handle(request(vec![
            event("0x0c", DEPOSIT_SIG, address(1), vec![]),
            event("0x0d", WITHDRAW_SIG, address(0x33), vec![]),
        ]))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        FilterError::Group {
            group: HandlerGroup::WithdrawOrDeposit,
            ..
        }
    ));
}

#[tokio::test]
async fn test_unknown_oracle_fails_price_update_group() {
    let filter = filter(base_contracts(), Arc::new(MemoryStore::new()));

    let err = filter
        .handle(request(vec![event("0x0e", PRICE_UPDATE_SIG, address(0x44), vec![])]))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        FilterError::Group {
            group: HandlerGroup::PriceUpdate,
            ..
        }
    ));
}
