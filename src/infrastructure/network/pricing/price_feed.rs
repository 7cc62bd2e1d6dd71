// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::common::retry::{RetryPolicy, retry_async};
use crate::common::time_utils::current_unix;
use crate::domain::constants::{PRICE_FEED_STALENESS_SECS, VALUE_DECIMALS};
use crate::domain::error::AppError;
use crate::domain::types::Asset;
use crate::infrastructure::data::abi::AggregatorV3Interface;
use alloy::primitives::{Address, U256};
use alloy::providers::Provider;

/// On-chain identity of one reserve asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSpec {
    pub address: Address,
    pub decimals: u8,
    /// Chainlink aggregator pricing the token; `None` values it at par.
    pub price_feed: Option<Address>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPair {
    pub a: TokenSpec,
    pub b: TokenSpec,
}

impl TokenPair {
    pub fn get(&self, asset: Asset) -> &TokenSpec {
        match asset {
            Asset::A => &self.a,
            Asset::B => &self.b,
        }
    }
}

fn pow10(exp: u8) -> U256 {
    U256::from(10u64).pow(U256::from(exp))
}

fn rescale(amount: U256, from_decimals: u8, to_decimals: u8) -> U256 {
    if from_decimals <= to_decimals {
        amount.saturating_mul(pow10(to_decimals - from_decimals))
    } else {
        amount / pow10(from_decimals - to_decimals)
    }
}

/// Price of one whole token in the common value unit.
///
/// Reserve balances are converted into 18-decimal value units before the
/// ratio is computed, so a 6-decimal stable and an 18-decimal staked-ETH token
/// compare by worth rather than by raw count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceQuote {
    answer: U256,
    decimals: u8,
}

impl PriceQuote {
    pub const PAR: PriceQuote = PriceQuote {
        answer: U256::from_limbs([1, 0, 0, 0]),
        decimals: 0,
    };

    pub fn new(answer: U256, decimals: u8) -> Result<Self, AppError> {
        if answer.is_zero() {
            return Err(AppError::Validation {
                field: "price".into(),
                message: "price feed answered zero".into(),
            });
        }
        Ok(Self { answer, decimals })
    }

    pub fn answer(&self) -> U256 {
        self.answer
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    /// Raw token units to value units, floored.
    pub fn to_value(&self, raw: U256, token_decimals: u8) -> U256 {
        rescale(raw, token_decimals, VALUE_DECIMALS).saturating_mul(self.answer)
            / pow10(self.decimals)
    }

    /// Value units back to raw token units, floored.
    pub fn to_raw(&self, value: U256, token_decimals: u8) -> U256 {
        let whole = value.saturating_mul(pow10(self.decimals)) / self.answer;
        rescale(whole, VALUE_DECIMALS, token_decimals)
    }
}

/// Current quote for `token`: the Chainlink answer when a feed is configured,
/// par otherwise. Stale answers are used but logged.
pub async fn fetch_quote<P>(provider: &P, token: &TokenSpec) -> Result<PriceQuote, AppError>
where
    P: Provider + Clone,
{
    let Some(feed) = token.price_feed else {
        return Ok(PriceQuote::PAR);
    };

    let contract = AggregatorV3Interface::new(feed, provider.clone());
    let contract_for_decimals = contract.clone();
    let decimals: u8 = retry_async(
        move |_| {
            let c = contract_for_decimals.clone();
            async move { c.decimals().call().await }
        },
        RetryPolicy::default(),
    )
    .await
    .map_err(|e| AppError::Connection(format!("Chainlink decimals failed: {}", e)))?;

    let latest = retry_async(
        move |_| {
            let c = contract.clone();
            async move { c.latestRoundData().call().await }
        },
        RetryPolicy::default(),
    )
    .await
    .map_err(|e| AppError::Connection(format!("Chainlink price failed: {}", e)))?;

    // Chainlink answers are int256; non-positive means the feed is broken.
    if latest.answer.is_negative() || latest.answer.is_zero() {
        return Err(AppError::Connection(format!(
            "Chainlink feed {feed:#x} returned non-positive answer {}",
            latest.answer
        )));
    }

    let updated_at = latest.updatedAt.saturating_to::<u64>();
    let age = current_unix().saturating_sub(updated_at);
    if age > PRICE_FEED_STALENESS_SECS {
        tracing::warn!(target: "price_feed", feed = %feed, age, "Chainlink price stale");
    }

    PriceQuote::new(latest.answer.into_raw(), decimals)
}
