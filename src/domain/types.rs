// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::domain::constants::BPS_DENOMINATOR;
use crate::domain::error::AppError;
use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two legs of the reserve: `A` is the stable asset, `B` the yield-bearing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Asset {
    A,
    B,
}

impl Asset {
    pub fn other(self) -> Asset {
        match self {
            Asset::A => Asset::B,
            Asset::B => Asset::A,
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::A => f.write_str("A"),
            Asset::B => f.write_str("B"),
        }
    }
}

/// Reserve balances read for a single decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveSnapshot {
    pub balance_a: U256,
    pub balance_b: U256,
}

impl ReserveSnapshot {
    pub fn new(balance_a: U256, balance_b: U256) -> Self {
        Self {
            balance_a,
            balance_b,
        }
    }

    pub fn total(&self) -> U256 {
        self.balance_a.saturating_add(self.balance_b)
    }

    pub fn balance(&self, asset: Asset) -> U256 {
        match asset {
            Asset::A => self.balance_a,
            Asset::B => self.balance_b,
        }
    }
}

/// Rebalance parameters, fixed for the lifetime of an executor.
///
/// The target ratio is held in basis points of asset A; asset B's share is the
/// complement, so the two always sum to exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceConfig {
    target_ratio_a_bps: u64,
    min_deviation_bps: u64,
    min_interval_secs: u64,
}

impl RebalanceConfig {
    pub fn new(
        target_ratio_a_bps: u64,
        min_deviation_bps: u64,
        min_interval_secs: u64,
    ) -> Result<Self, AppError> {
        if target_ratio_a_bps == 0 || target_ratio_a_bps >= BPS_DENOMINATOR {
            return Err(AppError::Validation {
                field: "target_ratio_a_bps".into(),
                message: format!(
                    "must be strictly between 0 and {BPS_DENOMINATOR}, got {target_ratio_a_bps}"
                ),
            });
        }
        Ok(Self {
            target_ratio_a_bps,
            min_deviation_bps,
            min_interval_secs,
        })
    }

    pub fn target_ratio_a_bps(&self) -> u64 {
        self.target_ratio_a_bps
    }

    pub fn target_ratio_b_bps(&self) -> u64 {
        BPS_DENOMINATOR - self.target_ratio_a_bps
    }

    pub fn min_deviation_bps(&self) -> u64 {
        self.min_deviation_bps
    }

    pub fn min_interval_secs(&self) -> u64 {
        self.min_interval_secs
    }
}

/// Persisted executor state. `last_rebalance_timestamp` is 0 until the first
/// successful rebalance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorState {
    pub last_rebalance_timestamp: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionReason {
    Ok,
    TimeGateNotElapsed,
    DeviationBelowThreshold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceDecision {
    /// Share of asset A in the reserve, WAD scaled (1e18 == 100%).
    pub current_ratio_a_wad: U256,
    pub deviation_bps: u64,
    pub eligible: bool,
    pub reason: DecisionReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapInstruction {
    pub sell_asset: Asset,
    pub sell_amount: U256,
    pub buy_asset: Asset,
}

impl SwapInstruction {
    pub fn new(sell_asset: Asset, sell_amount: U256) -> Self {
        Self {
            sell_asset,
            sell_amount,
            buy_asset: sell_asset.other(),
        }
    }
}

/// What the swap venue reports back for an executed instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapReceipt {
    pub received: U256,
}

/// Completion record emitted after a successful rebalance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceRecord {
    pub timestamp: u64,
    pub instruction: SwapInstruction,
    pub received: U256,
    pub deviation_bps_before: u64,
    pub pre: ReserveSnapshot,
    pub post: ReserveSnapshot,
}

/// Dry-run outcome: both gates passed and this is the trade that would be sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalancePreview {
    pub now: u64,
    pub snapshot: ReserveSnapshot,
    pub decision: RebalanceDecision,
    pub instruction: SwapInstruction,
    pub projected: ReserveSnapshot,
}

/// Read-only view of where the executor stands relative to both gates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceStatus {
    pub now: u64,
    pub state: ExecutorState,
    pub next_eligible_at: u64,
    pub snapshot: ReserveSnapshot,
    pub decision: RebalanceDecision,
    pub instruction: Option<SwapInstruction>,
}
