// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::domain::constants::BPS_DENOMINATOR;
use crate::domain::types::{Asset, RebalanceConfig, ReserveSnapshot, SwapInstruction};
use crate::services::rebalancer::evaluator::weighted_gap;
use alloy::primitives::U256;

/// Size the single trade that brings the reserve back to the target ratio,
/// assuming par execution.
///
/// Selling A: `balance_a - target * total`, floored. Selling B is symmetric.
/// Flooring never pushes the reserve past the target. Returns `None` when the
/// floored amount is zero.
pub fn plan_swap(snapshot: &ReserveSnapshot, config: &RebalanceConfig) -> Option<SwapInstruction> {
    let (over_weighted, gap) = weighted_gap(snapshot, config.target_ratio_a_bps());
    let sell_amount = gap / U256::from(BPS_DENOMINATOR);
    if sell_amount.is_zero() {
        return None;
    }
    Some(SwapInstruction::new(over_weighted, sell_amount))
}

/// Balances after `instruction` executes at par.
pub fn projected_post_trade(
    snapshot: &ReserveSnapshot,
    instruction: &SwapInstruction,
) -> ReserveSnapshot {
    let amount = instruction.sell_amount;
    match instruction.sell_asset {
        Asset::A => ReserveSnapshot::new(
            snapshot.balance_a.saturating_sub(amount),
            snapshot.balance_b.saturating_add(amount),
        ),
        Asset::B => ReserveSnapshot::new(
            snapshot.balance_a.saturating_add(amount),
            snapshot.balance_b.saturating_sub(amount),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::rebalancer::evaluator::RatioEvaluator;

    fn snap(a: u64, b: u64) -> ReserveSnapshot {
        ReserveSnapshot::new(U256::from(a), U256::from(b))
    }

    fn cfg(target: u64) -> RebalanceConfig {
        RebalanceConfig::new(target, 0, 0).unwrap()
    }

    #[test]
    fn sells_excess_stable_to_reach_even_split() {
        let s = snap(7_000, 3_000);
        let ix = plan_swap(&s, &cfg(5_000)).unwrap();
        assert_eq!(ix.sell_asset, Asset::A);
        assert_eq!(ix.buy_asset, Asset::B);
        assert_eq!(ix.sell_amount, U256::from(2_000u64));
        assert_eq!(projected_post_trade(&s, &ix), snap(5_000, 5_000));
    }

    #[test]
    fn all_stable_reserve_sells_thirty_percent() {
        let ix = plan_swap(&snap(10_000, 0), &cfg(7_000)).unwrap();
        assert_eq!(ix.sell_asset, Asset::A);
        assert_eq!(ix.sell_amount, U256::from(3_000u64));
    }

    #[test]
    fn underweight_stable_sells_yield_asset() {
        let s = snap(6_000, 4_000);
        let ix = plan_swap(&s, &cfg(7_000)).unwrap();
        assert_eq!(ix.sell_asset, Asset::B);
        assert_eq!(ix.buy_asset, Asset::A);
        assert_eq!(ix.sell_amount, U256::from(1_000u64));
        assert_eq!(projected_post_trade(&s, &ix), snap(7_000, 3_000));
    }

    #[test]
    fn on_target_plans_nothing() {
        assert!(plan_swap(&snap(7_000, 3_000), &cfg(7_000)).is_none());
    }

    #[test]
    fn rounding_never_overshoots_target() {
        let config = cfg(7_000);
        for (a, b) in [(1u64, 2u64), (13, 1), (999, 1_001), (123_457, 7), (5, 94_321)] {
            let s = snap(a, b);
            let Some(ix) = plan_swap(&s, &config) else {
                continue;
            };
            let before = weighted_gap(&s, config.target_ratio_a_bps());
            let after_snap = projected_post_trade(&s, &ix);
            let after = weighted_gap(&after_snap, config.target_ratio_a_bps());
            // still on the same side of the target (or exactly on it)
            assert!(after.1.is_zero() || after.0 == before.0, "overshoot for {a}/{b}");
            assert!(after.1 < before.1);
            let dev = RatioEvaluator::deviation_bps(&after_snap, 7_000, after_snap.total());
            assert!(dev <= RatioEvaluator::deviation_bps(&s, 7_000, s.total()));
        }
    }
}
