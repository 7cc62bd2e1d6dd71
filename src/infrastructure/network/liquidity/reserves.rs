// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::common::retry::{RetryPolicy, retry_async};
use crate::domain::error::AppError;
use crate::domain::types::Asset;
use crate::infrastructure::data::abi::IERC20;
use crate::infrastructure::network::price_feed::{TokenPair, fetch_quote};
use crate::services::rebalancer::collaborators::{ReserveSource, WrappedBalanceSource};
use alloy::primitives::{Address, U256};
use alloy::providers::Provider;

/// The treasury reserve as seen on chain: ERC20 balances held by the reserve
/// contract, valued through each token's price feed.
#[derive(Clone)]
pub struct OnchainReserve<P> {
    provider: P,
    reserve: Address,
    tokens: TokenPair,
    wrapped_native: Address,
}

impl<P> OnchainReserve<P>
where
    P: Provider + Clone,
{
    pub fn new(provider: P, reserve: Address, tokens: TokenPair, wrapped_native: Address) -> Self {
        Self {
            provider,
            reserve,
            tokens,
            wrapped_native,
        }
    }

    pub fn reserve_address(&self) -> Address {
        self.reserve
    }

    /// Raw ERC20 balance of the reserve, in token base units.
    pub async fn raw_balance(&self, token: Address) -> Result<U256, AppError> {
        let contract = IERC20::new(token, self.provider.clone());
        let owner = self.reserve;
        retry_async(
            move |_| {
                let c = contract.clone();
                async move { c.balanceOf(owner).call().await }
            },
            RetryPolicy::default(),
        )
        .await
        .map_err(|e| AppError::Connection(format!("Reserve balance of {token:#x} failed: {}", e)))
    }
}

impl<P> ReserveSource for OnchainReserve<P>
where
    P: Provider + Clone,
{
    async fn balance_of(&self, asset: Asset) -> Result<U256, AppError> {
        let token = self.tokens.get(asset);
        let raw = self.raw_balance(token.address).await?;
        let quote = fetch_quote(&self.provider, token).await?;
        let value = quote.to_value(raw, token.decimals);
        tracing::debug!(
            target: "reserve",
            asset = %asset,
            token = %token.address,
            raw = %raw,
            value = %value,
            "Reserve balance"
        );
        Ok(value)
    }
}

impl<P> WrappedBalanceSource for OnchainReserve<P>
where
    P: Provider + Clone,
{
    async fn wrapped_balance(&self) -> Result<U256, AppError> {
        self.raw_balance(self.wrapped_native).await
    }
}
