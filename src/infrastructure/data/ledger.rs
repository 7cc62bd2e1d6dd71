// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::domain::error::AppError;
use crate::domain::types::{Asset, ReserveSnapshot, SwapInstruction, SwapReceipt};
use crate::services::rebalancer::collaborators::{
    ReserveSource, StakingVenue, SwapVenue, WrappedBalanceSource,
};
use alloy::primitives::U256;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct LedgerState {
    balance_a: U256,
    balance_b: U256,
    wrapped: U256,
    swap_failure: Option<String>,
    swaps: Vec<SwapInstruction>,
}

/// In-memory reserve that trades at par. Clones share one ledger, so the same
/// instance can serve as both the reserve and the swap venue of an executor.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReserve {
    inner: Arc<Mutex<LedgerState>>,
}

impl InMemoryReserve {
    pub fn new(balance_a: U256, balance_b: U256) -> Self {
        let reserve = Self::default();
        reserve.set_balances(balance_a, balance_b);
        reserve
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_balances(&self, balance_a: U256, balance_b: U256) {
        let mut ledger = self.lock();
        ledger.balance_a = balance_a;
        ledger.balance_b = balance_b;
    }

    pub fn set_wrapped(&self, amount: U256) {
        self.lock().wrapped = amount;
    }

    pub fn balances(&self) -> ReserveSnapshot {
        let ledger = self.lock();
        ReserveSnapshot::new(ledger.balance_a, ledger.balance_b)
    }

    pub fn wrapped(&self) -> U256 {
        self.lock().wrapped
    }

    /// Make every following swap fail with `reason` until cleared.
    pub fn fail_swaps(&self, reason: impl Into<String>) {
        self.lock().swap_failure = Some(reason.into());
    }

    pub fn clear_swap_failure(&self) {
        self.lock().swap_failure = None;
    }

    /// Successfully executed swaps, oldest first.
    pub fn executed_swaps(&self) -> Vec<SwapInstruction> {
        self.lock().swaps.clone()
    }
}

impl ReserveSource for InMemoryReserve {
    async fn balance_of(&self, asset: Asset) -> Result<U256, AppError> {
        Ok(self.balances().balance(asset))
    }
}

impl SwapVenue for InMemoryReserve {
    async fn swap(&self, instruction: &SwapInstruction) -> Result<SwapReceipt, AppError> {
        let mut ledger = self.lock();
        if let Some(reason) = ledger.swap_failure.clone() {
            return Err(AppError::Transaction {
                hash: "in-memory".into(),
                reason,
            });
        }

        let amount = instruction.sell_amount;
        let available = match instruction.sell_asset {
            Asset::A => ledger.balance_a,
            Asset::B => ledger.balance_b,
        };
        if available < amount {
            return Err(AppError::InsufficientFunds {
                required: amount.to_string(),
                available: available.to_string(),
            });
        }

        match instruction.sell_asset {
            Asset::A => {
                ledger.balance_a -= amount;
                ledger.balance_b = ledger.balance_b.saturating_add(amount);
            }
            Asset::B => {
                ledger.balance_b -= amount;
                ledger.balance_a = ledger.balance_a.saturating_add(amount);
            }
        }
        ledger.swaps.push(*instruction);
        Ok(SwapReceipt { received: amount })
    }
}

impl WrappedBalanceSource for InMemoryReserve {
    async fn wrapped_balance(&self) -> Result<U256, AppError> {
        Ok(self.wrapped())
    }
}

impl StakingVenue for InMemoryReserve {
    async fn stake_wrapped(&self, amount: U256) -> Result<U256, AppError> {
        let mut ledger = self.lock();
        if ledger.wrapped < amount {
            return Err(AppError::InsufficientFunds {
                required: amount.to_string(),
                available: ledger.wrapped.to_string(),
            });
        }
        ledger.wrapped -= amount;
        ledger.balance_b = ledger.balance_b.saturating_add(amount);
        Ok(amount)
    }
}
