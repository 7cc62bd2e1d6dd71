// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::common::retry::{RetryPolicy, retry_async};
use crate::common::time_utils::current_unix;
use crate::domain::constants::BPS_DENOMINATOR;
use crate::domain::error::AppError;
use crate::domain::types::{Asset, SwapInstruction, SwapReceipt};
use crate::infrastructure::data::abi::{IERC20, UniV3Quoter, UniV3Router};
use crate::infrastructure::network::price_feed::{TokenPair, TokenSpec, fetch_quote};
use crate::infrastructure::network::provider::{TxOutcome, confirm, settle};
use crate::services::rebalancer::collaborators::SwapVenue;
use alloy::primitives::{Address, U256};
use alloy::providers::Provider;

const MAX_V3_FEE: u32 = 0x00FF_FFFF;

/// Uniswap V3 route between the two reserve assets. `fees` are listed in the
/// A -> B direction, one per hop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRoute {
    pub router: Address,
    pub quoter: Address,
    pub intermediate: Option<Address>,
    pub fees: Vec<u32>,
    pub slippage_bps: u64,
    pub deadline_secs: u64,
}

impl SwapRoute {
    /// Encoded V3 path selling `sell` for the other asset of `tokens`.
    pub fn path(&self, sell: Asset, tokens: &TokenPair) -> Result<Vec<u8>, AppError> {
        let mut hops = vec![tokens.a.address];
        hops.extend(self.intermediate);
        hops.push(tokens.b.address);
        let mut fees = self.fees.clone();
        if sell == Asset::B {
            hops.reverse();
            fees.reverse();
        }
        encode_v3_path(&hops, &fees)
    }

    /// Quoted output less the configured slippage allowance.
    pub fn min_out(&self, quoted: U256) -> U256 {
        let keep = BPS_DENOMINATOR.saturating_sub(self.slippage_bps);
        quoted.saturating_mul(U256::from(keep)) / U256::from(BPS_DENOMINATOR)
    }
}

/// `token (20) | fee (3) | token (20) | ...` as consumed by `exactInput`.
pub fn encode_v3_path(tokens: &[Address], fees: &[u32]) -> Result<Vec<u8>, AppError> {
    if tokens.len() < 2 || fees.len() + 1 != tokens.len() {
        return Err(AppError::Validation {
            field: "swap_path_fees".into(),
            message: format!(
                "{} tokens need {} fee tiers, got {}",
                tokens.len(),
                tokens.len().saturating_sub(1),
                fees.len()
            ),
        });
    }
    let mut path = Vec::with_capacity(tokens.len() * 20 + fees.len() * 3);
    for (idx, token) in tokens.iter().enumerate() {
        path.extend_from_slice(token.as_slice());
        if let Some(fee) = fees.get(idx) {
            if *fee > MAX_V3_FEE {
                return Err(AppError::Validation {
                    field: "swap_path_fees".into(),
                    message: format!("fee tier {fee} does not fit uint24"),
                });
            }
            path.extend_from_slice(&fee.to_be_bytes()[1..]);
        }
    }
    Ok(path)
}

/// Executes rebalance swaps from the vault wallet: pulls the sell amount out of
/// the reserve under the governance-granted allowance, swaps it on Uniswap V3
/// and sends the proceeds straight back to the reserve.
pub struct OnchainSwapper<P> {
    provider: P,
    vault: Address,
    reserve: Address,
    tokens: TokenPair,
    route: SwapRoute,
}

impl<P> OnchainSwapper<P>
where
    P: Provider + Clone,
{
    pub fn new(provider: P, vault: Address, reserve: Address, tokens: TokenPair, route: SwapRoute) -> Self {
        Self {
            provider,
            vault,
            reserve,
            tokens,
            route,
        }
    }

    async fn reserve_balance(&self, token: Address) -> Result<U256, AppError> {
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
        .map_err(|e| AppError::Connection(format!("Balance of {token:#x} failed: {}", e)))
    }

    async fn quote(&self, path: Vec<u8>, amount_in: U256) -> Result<U256, AppError> {
        let quoter = UniV3Quoter::new(self.route.quoter, self.provider.clone());
        retry_async(
            move |_| {
                let q = quoter.clone();
                let p = path.clone();
                async move { q.quoteExactInput(p.into(), amount_in).call().await }
            },
            RetryPolicy::default(),
        )
        .await
        .map_err(|e| AppError::Connection(format!("V3 path quote failed: {}", e)))
    }

    /// Pulled funds go back to the reserve when the swap itself fails.
    async fn refund(&self, token: Address, amount: U256) {
        let erc20 = IERC20::new(token, self.provider.clone());
        match confirm("swap", "refund", erc20.transfer(self.reserve, amount).send().await).await {
            Ok(_) => tracing::info!(target: "swap", token = %token, amount = %amount, "Refunded pulled funds to reserve"),
            Err(e) => tracing::error!(
                target: "swap",
                token = %token,
                amount = %amount,
                vault = %self.vault,
                error = %e,
                "Refund to reserve failed; funds remain in vault"
            ),
        }
    }

    /// Quote, approve and record the reserve's buy-side balance. Nothing here
    /// spends the pulled input, so any failure is refundable.
    async fn prepare(&self, instruction: &SwapInstruction, amount_in: U256) -> Result<PreparedSwap, AppError> {
        let sell = self.tokens.get(instruction.sell_asset);
        let buy = self.tokens.get(instruction.buy_asset);
        let path = self.route.path(instruction.sell_asset, &self.tokens)?;

        let quoted = self.quote(path.clone(), amount_in).await?;
        let min_out = self.route.min_out(quoted);

        let token_in = IERC20::new(sell.address, self.provider.clone());
        confirm("swap", "approve", token_in.approve(self.route.router, amount_in).send().await).await?;

        let buy_before = self.reserve_balance(buy.address).await?;
        Ok(PreparedSwap {
            path,
            quoted,
            min_out,
            buy_before,
        })
    }

    /// Proceeds of the swap in value units, from the reserve balance delta.
    async fn measure_received(&self, buy: &TokenSpec, before: U256) -> Result<U256, AppError> {
        let after = self.reserve_balance(buy.address).await?;
        let quote = fetch_quote(&self.provider, buy).await?;
        Ok(quote.to_value(after.saturating_sub(before), buy.decimals))
    }
}

struct PreparedSwap {
    path: Vec<u8>,
    quoted: U256,
    min_out: U256,
    buy_before: U256,
}

/// How the pulled input is handled once `exactInput` has been sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Settlement {
    /// The router never executed; the vault still holds the input.
    Refund,
    Settled,
    /// May have executed. Treated as settled so the sale is never repeated.
    Unknown,
}

fn settlement(outcome: &TxOutcome) -> Settlement {
    match outcome {
        TxOutcome::NotSent(_) | TxOutcome::Reverted(_) => Settlement::Refund,
        TxOutcome::Confirmed(_) => Settlement::Settled,
        TxOutcome::Unconfirmed { .. } => Settlement::Unknown,
    }
}

/// Measured proceeds, or the slippage floor when the post-swap read failed.
/// The swap already executed at this point, so a read failure is not an error.
fn proceeds_or_floor(
    measured: Result<U256, AppError>,
    route: &SwapRoute,
    instruction: &SwapInstruction,
) -> U256 {
    match measured {
        Ok(received) => received,
        Err(e) => {
            // Same slippage allowance the router enforced through amountOutMinimum.
            let floor = route.min_out(instruction.sell_amount);
            tracing::warn!(
                target: "swap",
                error = %e,
                estimate = %floor,
                "Swap settled but proceeds unreadable; recording slippage floor"
            );
            floor
        }
    }
}

impl<P> SwapVenue for OnchainSwapper<P>
where
    P: Provider + Clone,
{
    async fn swap(&self, instruction: &SwapInstruction) -> Result<SwapReceipt, AppError> {
        let sell = *self.tokens.get(instruction.sell_asset);
        let buy = *self.tokens.get(instruction.buy_asset);

        let sell_quote = fetch_quote(&self.provider, &sell).await?;
        let amount_in = sell_quote.to_raw(instruction.sell_amount, sell.decimals);
        if amount_in.is_zero() {
            return Err(AppError::Validation {
                field: "sell_amount".into(),
                message: format!(
                    "{} value units round to zero {:#x} base units",
                    instruction.sell_amount, sell.address
                ),
            });
        }

        let token_in = IERC20::new(sell.address, self.provider.clone());
        confirm(
            "swap",
            "transferFrom",
            token_in
                .transferFrom(self.reserve, self.vault, amount_in)
                .send()
                .await,
        )
        .await?;

        let prepared = match self.prepare(instruction, amount_in).await {
            Ok(prepared) => prepared,
            Err(e) => {
                self.refund(sell.address, amount_in).await;
                return Err(e);
            }
        };

        let router = UniV3Router::new(self.route.router, self.provider.clone());
        let params = UniV3Router::ExactInputParams {
            path: prepared.path.into(),
            recipient: self.reserve,
            deadline: U256::from(current_unix().saturating_add(self.route.deadline_secs)),
            amountIn: amount_in,
            amountOutMinimum: prepared.min_out,
        };
        let outcome = settle(router.exactInput(params).send().await).await;
        match settlement(&outcome) {
            Settlement::Refund => {
                self.refund(sell.address, amount_in).await;
                return Err(outcome.failure("swap", "exactInput"));
            }
            Settlement::Unknown => tracing::error!(
                target: "swap",
                amount_in = %amount_in,
                error = %outcome.failure("swap", "exactInput"),
                "Swap receipt unavailable; treating as executed, check vault {} manually",
                self.vault
            ),
            Settlement::Settled => {}
        }

        let measured = self.measure_received(&buy, prepared.buy_before).await;
        let received = proceeds_or_floor(measured, &self.route, instruction);
        tracing::info!(
            target: "swap",
            amount_in = %amount_in,
            quoted = %prepared.quoted,
            min_out = %prepared.min_out,
            received = %received,
            "Swap settled into reserve"
        );
        Ok(SwapReceipt { received })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::B256;

    fn token(byte: u8, decimals: u8) -> TokenSpec {
        TokenSpec {
            address: Address::from([byte; 20]),
            decimals,
            price_feed: None,
        }
    }

    fn route(intermediate: Option<Address>, fees: Vec<u32>) -> SwapRoute {
        SwapRoute {
            router: Address::from([0xAA; 20]),
            quoter: Address::from([0xBB; 20]),
            intermediate,
            fees,
            slippage_bps: 50,
            deadline_secs: 300,
        }
    }

    #[test]
    fn single_hop_path_layout() {
        let pair = TokenPair {
            a: token(1, 6),
            b: token(2, 18),
        };
        let path = route(None, vec![500]).path(Asset::A, &pair).unwrap();
        assert_eq!(path.len(), 43);
        assert_eq!(&path[..20], &[1u8; 20]);
        assert_eq!(&path[20..23], &[0x00, 0x01, 0xf4]);
        assert_eq!(&path[23..], &[2u8; 20]);
    }

    #[test]
    fn selling_b_reverses_tokens_and_fees() {
        let pair = TokenPair {
            a: token(1, 6),
            b: token(2, 18),
        };
        let mid = Address::from([3u8; 20]);
        let path = route(Some(mid), vec![500, 10_000]).path(Asset::B, &pair).unwrap();
        assert_eq!(path.len(), 66);
        assert_eq!(&path[..20], &[2u8; 20]);
        assert_eq!(&path[20..23], &[0x00, 0x27, 0x10]);
        assert_eq!(&path[23..43], &[3u8; 20]);
        assert_eq!(&path[43..46], &[0x00, 0x01, 0xf4]);
        assert_eq!(&path[46..], &[1u8; 20]);
    }

    #[test]
    fn fee_count_must_match_hops() {
        let pair = TokenPair {
            a: token(1, 6),
            b: token(2, 18),
        };
        let err = route(Some(Address::from([3u8; 20])), vec![500])
            .path(Asset::A, &pair)
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
        assert!(encode_v3_path(&[Address::ZERO, Address::ZERO], &[0x0100_0000]).is_err());
    }

    #[test]
    fn min_out_applies_slippage() {
        let r = route(None, vec![500]);
        assert_eq!(r.min_out(U256::from(10_000u64)), U256::from(9_950u64));
    }

    #[test]
    fn pulled_input_is_refunded_only_when_the_router_never_ran() {
        let hash = B256::repeat_byte(9);
        assert_eq!(settlement(&TxOutcome::NotSent("underpriced".into())), Settlement::Refund);
        assert_eq!(settlement(&TxOutcome::Reverted(hash)), Settlement::Refund);
        assert_eq!(settlement(&TxOutcome::Confirmed(hash)), Settlement::Settled);
    }

    #[test]
    fn mined_swap_with_lost_receipt_is_never_refunded() {
        let outcome = TxOutcome::Unconfirmed {
            hash: B256::repeat_byte(9),
            reason: "receipt wait timed out".into(),
        };
        assert_eq!(settlement(&outcome), Settlement::Unknown);
        assert_ne!(settlement(&outcome), Settlement::Refund);
    }

    #[test]
    fn unreadable_proceeds_fall_back_to_slippage_floor() {
        let r = route(None, vec![500]);
        let instruction = SwapInstruction::new(Asset::A, U256::from(2_000u64));
        let measured = proceeds_or_floor(Ok(U256::from(1_990u64)), &r, &instruction);
        assert_eq!(measured, U256::from(1_990u64));

        let lost = Err(AppError::Connection("balanceOf timed out".into()));
        assert_eq!(proceeds_or_floor(lost, &r, &instruction), U256::from(1_990u64));
    }
}
