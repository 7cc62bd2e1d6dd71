// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::common::retry::{RetryPolicy, retry_async};
use crate::domain::error::AppError;
use crate::infrastructure::data::abi::{IERC20, ILido, IWETH};
use crate::infrastructure::network::provider::{TxOutcome, confirm, settle};
use crate::services::rebalancer::collaborators::StakingVenue;
use alloy::network::Ethereum;
use alloy::primitives::{Address, U256};
use alloy::providers::{PendingTransactionBuilder, Provider};

type Submitted = Result<PendingTransactionBuilder<Ethereum>, alloy::contract::Error>;

/// Deposit transactions in the order they are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DepositStep {
    Pull,
    Unwrap,
    Submit,
    Return,
}

impl DepositStep {
    fn name(self) -> &'static str {
        match self {
            DepositStep::Pull => "transferFrom",
            DepositStep::Unwrap => "withdraw",
            DepositStep::Submit => "submit",
            DepositStep::Return => "transfer",
        }
    }
}

/// Reserve funds left in the vault when a deposit stops part way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stranded {
    Weth(U256),
    Eth(U256),
    Steth(U256),
}

/// What the vault holds if `step` never executed.
fn stranded_before(step: DepositStep, amount: U256, minted: U256) -> Option<Stranded> {
    match step {
        DepositStep::Pull => None,
        DepositStep::Unwrap => Some(Stranded::Weth(amount)),
        DepositStep::Submit => Some(Stranded::Eth(amount)),
        DepositStep::Return => Some(Stranded::Steth(minted)),
    }
}

/// Turns reserve WETH into stETH: pull, unwrap, submit to Lido, return the
/// minted stETH to the reserve.
pub struct LidoStaker<P> {
    provider: P,
    vault: Address,
    reserve: Address,
    weth: Address,
    steth: Address,
    referral: Address,
}

impl<P> LidoStaker<P>
where
    P: Provider + Clone,
{
    pub fn new(
        provider: P,
        vault: Address,
        reserve: Address,
        weth: Address,
        steth: Address,
        referral: Address,
    ) -> Self {
        Self {
            provider,
            vault,
            reserve,
            weth,
            steth,
            referral,
        }
    }

    async fn vault_steth_balance(&self) -> Result<U256, AppError> {
        let contract = IERC20::new(self.steth, self.provider.clone());
        let owner = self.vault;
        retry_async(
            move |_| {
                let c = contract.clone();
                async move { c.balanceOf(owner).call().await }
            },
            RetryPolicy::default(),
        )
        .await
        .map_err(|e| AppError::Connection(format!("stETH balance failed: {}", e)))
    }

    async fn run_step(&self, step: DepositStep, amount: U256, minted: U256, submitted: Submitted) -> Result<(), AppError> {
        let outcome = settle(submitted).await;
        if let TxOutcome::Confirmed(hash) = &outcome {
            tracing::debug!(target: "staking", step = step.name(), tx = %hash, "Deposit step confirmed");
            return Ok(());
        }

        let err = outcome.failure("staking", step.name());
        if !outcome.had_no_effect() {
            tracing::error!(
                target: "staking",
                step = step.name(),
                amount = %amount,
                vault = %self.vault,
                error = %err,
                "Deposit step unconfirmed; vault balances need manual reconciliation"
            );
        } else if let Some(held) = stranded_before(step, amount, minted) {
            self.return_stranded(held).await;
        }
        Err(err)
    }

    async fn return_stranded(&self, held: Stranded) {
        let result = match held {
            Stranded::Weth(amount) => self.send_to_reserve(self.weth, amount).await,
            Stranded::Eth(amount) => self.rewrap_to_reserve(amount).await,
            Stranded::Steth(amount) => self.send_to_reserve(self.steth, amount).await,
        };
        match result {
            Ok(()) => tracing::info!(target: "staking", held = ?held, "Returned stranded funds to reserve"),
            Err(e) => tracing::error!(
                target: "staking",
                held = ?held,
                vault = %self.vault,
                error = %e,
                "Returning stranded funds failed; funds remain in vault"
            ),
        }
    }

    async fn rewrap_to_reserve(&self, amount: U256) -> Result<(), AppError> {
        let weth = IWETH::new(self.weth, self.provider.clone());
        confirm("staking", "deposit", weth.deposit().value(amount).send().await).await?;
        self.send_to_reserve(self.weth, amount).await
    }

    async fn send_to_reserve(&self, token: Address, amount: U256) -> Result<(), AppError> {
        let erc20 = IERC20::new(token, self.provider.clone());
        confirm("staking", "refund", erc20.transfer(self.reserve, amount).send().await).await?;
        Ok(())
    }
}

impl<P> StakingVenue for LidoStaker<P>
where
    P: Provider + Clone,
{
    async fn stake_wrapped(&self, amount: U256) -> Result<U256, AppError> {
        let weth_token = IERC20::new(self.weth, self.provider.clone());
        let weth = IWETH::new(self.weth, self.provider.clone());
        let lido = ILido::new(self.steth, self.provider.clone());
        let steth = IERC20::new(self.steth, self.provider.clone());
        let none = U256::ZERO;

        let pull = weth_token.transferFrom(self.reserve, self.vault, amount).send().await;
        self.run_step(DepositStep::Pull, amount, none, pull).await?;
        let unwrap = weth.withdraw(amount).send().await;
        self.run_step(DepositStep::Unwrap, amount, none, unwrap).await?;

        let before = match self.vault_steth_balance().await {
            Ok(before) => before,
            Err(e) => {
                self.return_stranded(Stranded::Eth(amount)).await;
                return Err(e);
            }
        };
        let submit = lido.submit(self.referral).value(amount).send().await;
        self.run_step(DepositStep::Submit, amount, none, submit).await?;

        // stETH share rounding can mint a wei or two less than submitted.
        let minted = match self.vault_steth_balance().await {
            Ok(after) => after.saturating_sub(before),
            Err(e) => {
                tracing::error!(
                    target: "staking",
                    approx = %amount,
                    vault = %self.vault,
                    error = %e,
                    "Minted stETH unreadable; stETH remains in vault"
                );
                return Err(e);
            }
        };

        let back = steth.transfer(self.reserve, minted).send().await;
        self.run_step(DepositStep::Return, amount, minted, back).await?;
        tracing::info!(target: "staking", amount = %amount, minted = %minted, "stETH returned to reserve");
        Ok(minted)
    }
}
