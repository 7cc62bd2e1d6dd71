// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

pub mod collaborators;
pub mod evaluator;
pub mod executor;
pub mod planning;

pub use collaborators::{
    ReadOnlySwapVenue, ReserveSource, StakingVenue, SwapVenue, WrappedBalanceSource,
};
pub use evaluator::RatioEvaluator;
pub use executor::RebalanceExecutor;
pub use planning::{plan_swap, projected_post_trade};
