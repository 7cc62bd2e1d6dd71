// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use alloy::primitives::{Address, U256, address};

// =============================================================================
// FIXED-POINT SCALES
// =============================================================================

/// Denominator for every basis-point quantity (ratios, thresholds, slippage).
pub const BPS_DENOMINATOR: u64 = 10_000;

/// 1e18, the scale of WAD fixed-point ratios and of normalized value units.
pub const WAD: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// Decimals of the common value unit reserve balances are normalized into.
pub const VALUE_DECIMALS: u8 = 18;

// =============================================================================
// REBALANCE DEFAULTS
// =============================================================================

/// 70% stable / 30% yield-bearing.
pub const DEFAULT_TARGET_RATIO_A_BPS: u64 = 7_000;
pub const DEFAULT_MIN_DEVIATION_BPS: u64 = 500;
/// 30 days.
pub const DEFAULT_MIN_INTERVAL_SECS: u64 = 2_592_000;

// =============================================================================
// NETWORK CONSTANTS
// =============================================================================

pub const CHAIN_ETHEREUM: u64 = 1;
pub const CHAIN_HARDHAT: u64 = 31_337;

// Mainnet assets
pub const USDC_MAINNET: Address = address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
pub const STETH_MAINNET: Address = address!("ae7ab96520DE3A18E5e111B5EaAb095312D7fE84");
pub const WETH_MAINNET: Address = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");

// Yam treasury reserves
pub const RESERVES_MAINNET: Address = address!("97990B693835da58A281636296D2Bf02787DEa17");

// Chainlink aggregators (USD denominated)
pub const USDC_USD_FEED_MAINNET: Address = address!("8fFfFfd4AfB6115b954Bd326cbe7B4BA576818f6");
pub const STETH_USD_FEED_MAINNET: Address = address!("CfE54B5cD566aB89272946F602D76Ea879CAb4a8");

// Uniswap V3
pub const UNIV3_ROUTER_MAINNET: Address = address!("E592427A0AEce92De3Edee1F18E0157C05861564");
pub const UNIV3_QUOTER_MAINNET: Address = address!("b27308f9F90D607463bb33eA1BeBb41C27CE5AB6");

pub const DEFAULT_V3_FEE_TIER: u32 = 500;

/// Chainlink answers older than this are logged as stale.
pub const PRICE_FEED_STALENESS_SECS: u64 = 3_600 * 25;
