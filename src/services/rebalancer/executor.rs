// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::common::time_utils::current_unix;
use crate::domain::error::RebalanceError;
use crate::domain::types::{
    Asset, DecisionReason, ExecutorState, RebalanceConfig, RebalanceDecision, RebalancePreview,
    RebalanceRecord, RebalanceStatus, ReserveSnapshot, SwapInstruction,
};
use crate::services::rebalancer::collaborators::{
    ReserveSource, StakingVenue, SwapVenue, WrappedBalanceSource,
};
use crate::services::rebalancer::evaluator::RatioEvaluator;
use crate::services::rebalancer::planning::{plan_swap, projected_post_trade};
use alloy::primitives::U256;
use tokio::sync::broadcast;

const RECORD_CHANNEL_CAPACITY: usize = 64;

/// Gate-keeper and orchestrator for reserve rebalances.
///
/// Each `execute` takes `&mut self`, so one executor runs at most one attempt
/// at a time. `state` only changes after the swap venue reports success.
pub struct RebalanceExecutor<R, S> {
    config: RebalanceConfig,
    state: ExecutorState,
    reserve: R,
    swapper: S,
    records: broadcast::Sender<RebalanceRecord>,
    last_record: Option<RebalanceRecord>,
}

impl<R, S> RebalanceExecutor<R, S>
where
    R: ReserveSource,
    S: SwapVenue,
{
    pub fn new(config: RebalanceConfig, reserve: R, swapper: S) -> Self {
        Self::with_state(config, ExecutorState::default(), reserve, swapper)
    }

    pub fn with_state(config: RebalanceConfig, state: ExecutorState, reserve: R, swapper: S) -> Self {
        let (records, _) = broadcast::channel(RECORD_CHANNEL_CAPACITY);
        Self {
            config,
            state,
            reserve,
            swapper,
            records,
            last_record: None,
        }
    }

    pub fn config(&self) -> &RebalanceConfig {
        &self.config
    }

    pub fn state(&self) -> ExecutorState {
        self.state
    }

    pub fn last_record(&self) -> Option<&RebalanceRecord> {
        self.last_record.as_ref()
    }

    /// Completion records of every successful rebalance from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<RebalanceRecord> {
        self.records.subscribe()
    }

    /// Earliest timestamp at which the time gate opens.
    pub fn next_eligible_at(&self) -> u64 {
        self.state
            .last_rebalance_timestamp
            .saturating_add(self.config.min_interval_secs())
    }

    /// Read both reserve balances for one decision.
    pub async fn snapshot(&self) -> Result<ReserveSnapshot, RebalanceError> {
        let (balance_a, balance_b) = tokio::try_join!(
            self.reserve.balance_of(Asset::A),
            self.reserve.balance_of(Asset::B)
        )
        .map_err(|e| RebalanceError::ReserveUnavailable(Box::new(e)))?;
        Ok(ReserveSnapshot::new(balance_a, balance_b))
    }

    /// Rebalance using the local wall clock as `now`.
    pub async fn execute(&mut self) -> Result<RebalanceRecord, RebalanceError> {
        self.execute_at(current_unix()).await
    }

    /// Run both gates at `now` and, if they pass, sell the over-weighted asset.
    pub async fn execute_at(&mut self, now: u64) -> Result<RebalanceRecord, RebalanceError> {
        let (pre, decision, instruction) = self.gate_and_plan(now).await?;

        tracing::info!(
            target: "rebalance",
            now,
            sell = %instruction.sell_asset,
            amount = %instruction.sell_amount,
            deviation_bps = decision.deviation_bps,
            "Executing rebalance swap"
        );

        let receipt = match self.swapper.swap(&instruction).await {
            Ok(receipt) => receipt,
            Err(e) => {
                tracing::warn!(
                    target: "rebalance",
                    now,
                    sell = %instruction.sell_asset,
                    amount = %instruction.sell_amount,
                    error = %e,
                    "Rebalance swap failed; time gate not consumed"
                );
                return Err(RebalanceError::SwapExecutionFailed {
                    instruction,
                    source: Box::new(e),
                });
            }
        };

        self.state.last_rebalance_timestamp = now;

        let post = match self.snapshot().await {
            Ok(post) => post,
            Err(e) => {
                tracing::warn!(
                    target: "rebalance",
                    error = %e,
                    "Post-swap balance read failed; recording par projection"
                );
                projected_post_trade(&pre, &instruction)
            }
        };

        let record = RebalanceRecord {
            timestamp: now,
            instruction,
            received: receipt.received,
            deviation_bps_before: decision.deviation_bps,
            pre,
            post,
        };
        tracing::info!(
            target: "rebalance",
            now,
            received = %record.received,
            pre_a = %pre.balance_a,
            pre_b = %pre.balance_b,
            post_a = %post.balance_a,
            post_b = %post.balance_b,
            "Rebalance complete"
        );

        // No subscribers is fine.
        let _ = self.records.send(record.clone());
        self.last_record = Some(record.clone());
        Ok(record)
    }

    /// Everything `execute_at` would do short of calling the swap venue.
    pub async fn preview_at(&self, now: u64) -> Result<RebalancePreview, RebalanceError> {
        let (snapshot, decision, instruction) = self.gate_and_plan(now).await?;
        Ok(RebalancePreview {
            now,
            snapshot,
            decision,
            projected: projected_post_trade(&snapshot, &instruction),
            instruction,
        })
    }

    /// Where both gates stand at `now`. The time gate is folded into the
    /// decision so a closed gate reports `TimeGateNotElapsed`.
    pub async fn status_at(&self, now: u64) -> Result<RebalanceStatus, RebalanceError> {
        let snapshot = self.snapshot().await?;
        let mut decision = RatioEvaluator::evaluate(&snapshot, &self.config)?;
        if self.check_time_gate(now).is_err() {
            decision.eligible = false;
            decision.reason = DecisionReason::TimeGateNotElapsed;
        }
        let instruction = if decision.eligible {
            plan_swap(&snapshot, &self.config)
        } else {
            None
        };
        Ok(RebalanceStatus {
            now,
            state: self.state,
            next_eligible_at: self.next_eligible_at(),
            snapshot,
            decision,
            instruction,
        })
    }

    /// Stake all wrapped native sitting in the reserve into the yield asset.
    /// Independent of both gates and of the executor state.
    pub async fn deposit_wrapped_into_yield<W, K>(
        &self,
        wrapped: &W,
        staking: &K,
    ) -> Result<U256, RebalanceError>
    where
        W: WrappedBalanceSource,
        K: StakingVenue,
    {
        let amount = wrapped
            .wrapped_balance()
            .await
            .map_err(|e| RebalanceError::ReserveUnavailable(Box::new(e)))?;
        if amount.is_zero() {
            return Err(RebalanceError::NothingToDeposit);
        }

        tracing::info!(target: "staking", amount = %amount, "Depositing wrapped native into yield asset");
        let received = staking
            .stake_wrapped(amount)
            .await
            .map_err(|e| RebalanceError::DepositFailed {
                amount,
                source: Box::new(e),
            })?;
        tracing::info!(target: "staking", amount = %amount, received = %received, "Deposit complete");
        Ok(received)
    }

    fn check_time_gate(&self, now: u64) -> Result<(), RebalanceError> {
        let last = self.state.last_rebalance_timestamp;
        let min_interval = self.config.min_interval_secs();
        if now.saturating_sub(last) < min_interval {
            return Err(RebalanceError::MinimumIntervalNotElapsed {
                now,
                last,
                min_interval,
                retry_at: self.next_eligible_at(),
            });
        }
        Ok(())
    }

    async fn gate_and_plan(
        &self,
        now: u64,
    ) -> Result<(ReserveSnapshot, RebalanceDecision, SwapInstruction), RebalanceError> {
        if let Err(e) = self.check_time_gate(now) {
            tracing::debug!(target: "rebalance", now, error = %e, "Time gate closed");
            return Err(e);
        }

        let snapshot = self.snapshot().await?;
        let decision = RatioEvaluator::evaluate(&snapshot, &self.config)?;
        let below_threshold = RebalanceError::DeviationBelowThreshold {
            deviation_bps: decision.deviation_bps,
            min_deviation_bps: self.config.min_deviation_bps(),
        };
        if !decision.eligible {
            tracing::debug!(
                target: "rebalance",
                deviation_bps = decision.deviation_bps,
                min_deviation_bps = self.config.min_deviation_bps(),
                "Deviation gate closed"
            );
            return Err(below_threshold);
        }

        // Eligible with nothing to sell only happens with a zero threshold on target.
        let instruction = plan_swap(&snapshot, &self.config).ok_or(below_threshold)?;
        Ok((snapshot, decision, instruction))
    }
}
