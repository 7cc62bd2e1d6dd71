// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::domain::constants::{BPS_DENOMINATOR, WAD};
use crate::domain::error::RebalanceError;
use crate::domain::types::{
    Asset, DecisionReason, RebalanceConfig, RebalanceDecision, ReserveSnapshot,
};
use alloy::primitives::U256;

/// Stateless ratio arithmetic. All quantities stay integers; scaling happens
/// before any division.
pub struct RatioEvaluator;

impl RatioEvaluator {
    pub fn evaluate(
        snapshot: &ReserveSnapshot,
        config: &RebalanceConfig,
    ) -> Result<RebalanceDecision, RebalanceError> {
        let total = snapshot.total();
        if total.is_zero() {
            return Err(RebalanceError::EmptyReserve);
        }

        let current_ratio_a_wad = Self::current_ratio_a_wad(snapshot, total);
        let deviation_bps = Self::deviation_bps(snapshot, config.target_ratio_a_bps(), total);
        let eligible = deviation_bps >= config.min_deviation_bps();

        Ok(RebalanceDecision {
            current_ratio_a_wad,
            deviation_bps,
            eligible,
            reason: if eligible {
                DecisionReason::Ok
            } else {
                DecisionReason::DeviationBelowThreshold
            },
        })
    }

    /// `balance_a / total` as a WAD, floored.
    pub fn current_ratio_a_wad(snapshot: &ReserveSnapshot, total: U256) -> U256 {
        if total.is_zero() {
            return U256::ZERO;
        }
        snapshot.balance_a.saturating_mul(WAD) / total
    }

    /// `|balance_a / total - target|` in basis points, rounded half up.
    pub fn deviation_bps(snapshot: &ReserveSnapshot, target_ratio_a_bps: u64, total: U256) -> u64 {
        if total.is_zero() {
            return 0;
        }
        let (_, gap) = weighted_gap(snapshot, target_ratio_a_bps);
        let rounded = gap.saturating_add(total / U256::from(2u64)) / total;
        rounded.saturating_to::<u64>()
    }
}

/// Signed distance from target, scaled by `BPS_DENOMINATOR * total`:
/// `|balance_a * 10_000 - target_bps * total|`, tagged with the over-weighted
/// asset. A reserve exactly on target reports `B` with a zero gap.
pub(crate) fn weighted_gap(snapshot: &ReserveSnapshot, target_ratio_a_bps: u64) -> (Asset, U256) {
    let scaled_a = snapshot
        .balance_a
        .saturating_mul(U256::from(BPS_DENOMINATOR));
    let scaled_target = snapshot
        .total()
        .saturating_mul(U256::from(target_ratio_a_bps));
    if scaled_a > scaled_target {
        (Asset::A, scaled_a - scaled_target)
    } else {
        (Asset::B, scaled_target - scaled_a)
    }
}
