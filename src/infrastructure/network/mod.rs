// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

pub mod liquidity;
pub use liquidity::reserves;

pub mod pricing;
pub use pricing::price_feed;

pub mod provider;
pub mod staking;
pub mod swapper;
