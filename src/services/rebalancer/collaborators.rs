// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

//! Seams between the rebalancer and the outside world. The executor never
//! moves funds itself: balances are read through a [`ReserveSource`] and every
//! transfer goes through a [`SwapVenue`] or [`StakingVenue`].

use crate::domain::error::AppError;
use crate::domain::types::{Asset, SwapInstruction, SwapReceipt};
use alloy::primitives::U256;
use std::future::Future;

/// Read access to the treasury reserve.
pub trait ReserveSource: Send + Sync {
    /// Current reserve balance of `asset`, in the unit the ratio is computed in.
    fn balance_of(&self, asset: Asset) -> impl Future<Output = Result<U256, AppError>> + Send;
}

/// Executes a sell of one reserve asset for the other. Slippage protection and
/// authorization against the reserve are the venue's concern; a failure here
/// must leave the reserve untouched.
pub trait SwapVenue: Send + Sync {
    fn swap(
        &self,
        instruction: &SwapInstruction,
    ) -> impl Future<Output = Result<SwapReceipt, AppError>> + Send;
}

/// Reserve balance of the wrapped native token awaiting deposit.
pub trait WrappedBalanceSource: Send + Sync {
    fn wrapped_balance(&self) -> impl Future<Output = Result<U256, AppError>> + Send;
}

/// Converts wrapped native held by the reserve into the yield-bearing asset.
pub trait StakingVenue: Send + Sync {
    /// Stake `amount` of wrapped native; returns the yield asset received.
    fn stake_wrapped(&self, amount: U256) -> impl Future<Output = Result<U256, AppError>> + Send;
}

/// Venue for read-only runs (`status`, `--dry-run`): rejects every swap.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOnlySwapVenue;

impl SwapVenue for ReadOnlySwapVenue {
    async fn swap(&self, instruction: &SwapInstruction) -> Result<SwapReceipt, AppError> {
        Err(AppError::Initialization(format!(
            "read-only mode: refusing to sell {} of asset {}",
            instruction.sell_amount, instruction.sell_asset
        )))
    }
}
