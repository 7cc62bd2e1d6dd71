// SPDX-License-Identifier: MIT
// End-to-end rebalance flows against the in-memory par ledger: both gates,
// swap sizing, failure atomicity, persistence and the stETH deposit path.

use alloy::primitives::U256;
use treasury_rebalancer::common::time_utils::current_unix;
use treasury_rebalancer::core::{RatioEvaluator, RebalanceExecutor};
use treasury_rebalancer::data::ledger::InMemoryReserve;
use treasury_rebalancer::data::state_store::StateStore;
use treasury_rebalancer::domain::error::RebalanceError;
use treasury_rebalancer::domain::types::{
    Asset, DecisionReason, ExecutorState, RebalanceConfig, ReserveSnapshot,
};

const T0: u64 = 1_700_000_000;
const MONTH: u64 = 2_592_000;

fn ledger(a: u64, b: u64) -> InMemoryReserve {
    InMemoryReserve::new(U256::from(a), U256::from(b))
}

fn executor(
    config: RebalanceConfig,
    last: u64,
    ledger: &InMemoryReserve,
) -> RebalanceExecutor<InMemoryReserve, InMemoryReserve> {
    let state = ExecutorState {
        last_rebalance_timestamp: last,
    };
    RebalanceExecutor::with_state(config, state, ledger.clone(), ledger.clone())
}

#[tokio::test]
async fn time_gate_opens_exactly_at_interval() {
    let config = RebalanceConfig::new(5_000, 100, MONTH).unwrap();
    let reserve = ledger(7_000, 3_000);
    let mut exec = executor(config, T0, &reserve);

    let err = exec.execute_at(T0 + MONTH - 1).await.unwrap_err();
    match err {
        RebalanceError::MinimumIntervalNotElapsed { retry_at, .. } => {
            assert_eq!(retry_at, T0 + MONTH)
        }
        other => panic!("expected time gate, got {other}"),
    }
    assert!(reserve.executed_swaps().is_empty());

    let record = exec.execute_at(T0 + MONTH).await.unwrap();
    assert_eq!(record.timestamp, T0 + MONTH);
    assert_eq!(exec.state().last_rebalance_timestamp, T0 + MONTH);
}

#[tokio::test]
async fn execute_stamps_the_wall_clock() {
    let config = RebalanceConfig::new(5_000, 100, MONTH).unwrap();
    let reserve = ledger(7_000, 3_000);
    let mut exec = executor(config, 0, &reserve);

    let started = current_unix();
    let record = exec.execute().await.unwrap();
    let finished = current_unix();
    assert!(record.timestamp >= started && record.timestamp <= finished);
    assert_eq!(exec.state().last_rebalance_timestamp, record.timestamp);

    let err = exec.execute().await.unwrap_err();
    assert!(matches!(err, RebalanceError::MinimumIntervalNotElapsed { .. }));
}

#[tokio::test]
async fn second_immediate_call_hits_time_gate() {
    let config = RebalanceConfig::new(5_000, 100, MONTH).unwrap();
    let reserve = ledger(7_000, 3_000);
    let mut exec = executor(config, 0, &reserve);

    exec.execute_at(T0).await.unwrap();
    assert_eq!(exec.state().last_rebalance_timestamp, T0);

    // Push the ledger off target again so only the time gate can reject.
    reserve.set_balances(U256::from(9_000u64), U256::from(1_000u64));
    let err = exec.execute_at(T0).await.unwrap_err();
    assert!(matches!(err, RebalanceError::MinimumIntervalNotElapsed { .. }));
    assert_eq!(reserve.executed_swaps().len(), 1);
}

#[tokio::test]
async fn half_target_sells_two_thousand_a_and_lands_on_target() {
    let config = RebalanceConfig::new(5_000, 100, MONTH).unwrap();
    let reserve = ledger(7_000, 3_000);
    let mut exec = executor(config, 0, &reserve);

    let record = exec.execute_at(T0).await.unwrap();
    assert_eq!(record.instruction.sell_asset, Asset::A);
    assert_eq!(record.instruction.buy_asset, Asset::B);
    assert_eq!(record.instruction.sell_amount, U256::from(2_000u64));
    assert_eq!(record.deviation_bps_before, 2_000);
    assert_eq!(record.pre, ReserveSnapshot::new(U256::from(7_000u64), U256::from(3_000u64)));
    assert_eq!(record.post, ReserveSnapshot::new(U256::from(5_000u64), U256::from(5_000u64)));
    assert_eq!(reserve.balances(), record.post);
}

#[tokio::test]
async fn failed_swap_leaves_state_and_reserve_untouched() {
    let config = RebalanceConfig::new(5_000, 100, MONTH).unwrap();
    let reserve = ledger(7_000, 3_000);
    reserve.fail_swaps("router reverted");
    let mut exec = executor(config, 0, &reserve);

    let err = exec.execute_at(T0).await.unwrap_err();
    match err {
        RebalanceError::SwapExecutionFailed { instruction, .. } => {
            assert_eq!(instruction.sell_amount, U256::from(2_000u64))
        }
        other => panic!("expected swap failure, got {other}"),
    }
    assert_eq!(exec.state().last_rebalance_timestamp, 0);
    assert!(exec.last_record().is_none());
    assert_eq!(reserve.balances(), ReserveSnapshot::new(U256::from(7_000u64), U256::from(3_000u64)));

    // Same call succeeds once the venue recovers.
    reserve.clear_swap_failure();
    exec.execute_at(T0).await.unwrap();
    assert_eq!(exec.state().last_rebalance_timestamp, T0);
}

#[tokio::test]
async fn all_in_a_sells_three_thousand_toward_seventy_percent() {
    let config = RebalanceConfig::new(7_000, 500, MONTH).unwrap();
    let reserve = ledger(10_000, 0);
    let mut exec = executor(config, 0, &reserve);

    let record = exec.execute_at(T0).await.unwrap();
    assert_eq!(record.deviation_bps_before, 3_000);
    assert_eq!(record.instruction.sell_asset, Asset::A);
    assert_eq!(record.instruction.sell_amount, U256::from(3_000u64));
    assert_eq!(reserve.balances(), ReserveSnapshot::new(U256::from(7_000u64), U256::from(3_000u64)));
}

#[tokio::test]
async fn on_target_reserve_is_below_threshold() {
    let config = RebalanceConfig::new(7_000, 100, MONTH).unwrap();
    let reserve = ledger(70, 30);
    let mut exec = executor(config, 0, &reserve);

    let err = exec.execute_at(T0).await.unwrap_err();
    assert!(matches!(
        err,
        RebalanceError::DeviationBelowThreshold {
            deviation_bps: 0,
            min_deviation_bps: 100
        }
    ));
    assert!(err.is_gate_rejection());
    assert!(reserve.executed_swaps().is_empty());
    assert_eq!(exec.state().last_rebalance_timestamp, 0);
}

#[tokio::test]
async fn under_weighted_a_sells_b() {
    let config = RebalanceConfig::new(7_000, 500, MONTH).unwrap();
    let reserve = ledger(4_000, 6_000);
    let mut exec = executor(config, 0, &reserve);

    let record = exec.execute_at(T0).await.unwrap();
    assert_eq!(record.instruction.sell_asset, Asset::B);
    assert_eq!(record.instruction.sell_amount, U256::from(3_000u64));
    assert_eq!(reserve.balances(), ReserveSnapshot::new(U256::from(7_000u64), U256::from(3_000u64)));
}

#[tokio::test]
async fn empty_reserve_is_rejected_without_swapping() {
    let config = RebalanceConfig::new(7_000, 100, MONTH).unwrap();
    let reserve = ledger(0, 0);
    let mut exec = executor(config, 0, &reserve);

    let err = exec.execute_at(T0).await.unwrap_err();
    assert!(matches!(err, RebalanceError::EmptyReserve));
    assert!(!err.is_retryable());
    assert!(reserve.executed_swaps().is_empty());
}

#[tokio::test]
async fn subscribers_receive_completed_rebalances() {
    let config = RebalanceConfig::new(5_000, 100, MONTH).unwrap();
    let reserve = ledger(7_000, 3_000);
    let mut exec = executor(config, 0, &reserve);
    let mut rx = exec.subscribe();

    let record = exec.execute_at(T0).await.unwrap();
    let seen = rx.recv().await.unwrap();
    assert_eq!(seen, record);
    assert_eq!(exec.last_record(), Some(&record));
}

#[tokio::test]
async fn preview_and_status_never_move_funds() {
    let config = RebalanceConfig::new(5_000, 100, MONTH).unwrap();
    let reserve = ledger(7_000, 3_000);
    let exec = executor(config, 0, &reserve);

    let preview = exec.preview_at(T0).await.unwrap();
    assert_eq!(preview.instruction.sell_amount, U256::from(2_000u64));
    assert_eq!(preview.projected, ReserveSnapshot::new(U256::from(5_000u64), U256::from(5_000u64)));

    let status = exec.status_at(T0).await.unwrap();
    assert_eq!(status.decision.reason, DecisionReason::Ok);
    assert_eq!(status.instruction, Some(preview.instruction));
    assert_eq!(status.next_eligible_at, MONTH);

    assert!(reserve.executed_swaps().is_empty());
    assert_eq!(exec.state().last_rebalance_timestamp, 0);
}

#[tokio::test]
async fn persisted_state_keeps_time_gate_across_restarts() {
    let dir = std::env::temp_dir().join(format!("rebalancer-flow-{}", std::process::id()));
    let store = StateStore::new(dir.join("executor_state.json"));
    let config = RebalanceConfig::new(5_000, 100, MONTH).unwrap();
    let reserve = ledger(7_000, 3_000);

    let mut first = RebalanceExecutor::with_state(config, store.load().unwrap(), reserve.clone(), reserve.clone());
    first.execute_at(T0).await.unwrap();
    store.save(&first.state()).unwrap();

    reserve.set_balances(U256::from(9_000u64), U256::from(1_000u64));
    let mut restarted =
        RebalanceExecutor::with_state(config, store.load().unwrap(), reserve.clone(), reserve.clone());
    let err = restarted.execute_at(T0 + 60).await.unwrap_err();
    assert!(matches!(err, RebalanceError::MinimumIntervalNotElapsed { last: T0, .. }));

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn wrapped_native_is_staked_into_yield_asset() {
    let config = RebalanceConfig::new(7_000, 100, MONTH).unwrap();
    let reserve = ledger(7_000, 3_000);
    let exec = executor(config, T0, &reserve);

    let err = exec.deposit_wrapped_into_yield(&reserve, &reserve).await.unwrap_err();
    assert!(matches!(err, RebalanceError::NothingToDeposit));

    reserve.set_wrapped(U256::from(500u64));
    let minted = exec.deposit_wrapped_into_yield(&reserve, &reserve).await.unwrap();
    assert_eq!(minted, U256::from(500u64));
    assert_eq!(reserve.wrapped(), U256::ZERO);
    assert_eq!(reserve.balances().balance_b, U256::from(3_500u64));
    // Deposits do not consume the rebalance interval.
    assert_eq!(exec.state().last_rebalance_timestamp, T0);
}

#[test]
fn deviation_is_symmetric_around_target() {
    let config = RebalanceConfig::new(5_000, 100, MONTH).unwrap();
    let over = ReserveSnapshot::new(U256::from(6_000u64), U256::from(4_000u64));
    let under = ReserveSnapshot::new(U256::from(4_000u64), U256::from(6_000u64));
    let a = RatioEvaluator::evaluate(&over, &config).unwrap();
    let b = RatioEvaluator::evaluate(&under, &config).unwrap();
    assert_eq!(a.deviation_bps, 1_000);
    assert_eq!(a.deviation_bps, b.deviation_bps);
    assert_eq!(a, RatioEvaluator::evaluate(&over, &config).unwrap());
}
