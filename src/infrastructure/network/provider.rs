// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::domain::error::AppError;
use alloy::eips::BlockNumberOrTag;
use alloy::network::{Ethereum, EthereumWallet};
use alloy::primitives::{Address, B256};
use alloy::providers::{
    DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder, RootProvider,
};
use alloy::signers::local::PrivateKeySigner;
use std::str::FromStr;
use url::Url;

pub type HttpProvider = RootProvider<Ethereum>;
pub type SigningProvider = DynProvider<Ethereum>;

pub struct ConnectionFactory;

impl ConnectionFactory {
    /// Read-only provider for balance and price reads.
    pub fn http(rpc_url: &str) -> Result<HttpProvider, AppError> {
        let url = parse_rpc_url(rpc_url)?;
        Ok(RootProvider::new_http(url))
    }

    /// Wallet-filled provider for the vault that moves reserve funds.
    /// Returns the provider with the vault address it signs for.
    pub fn signing(rpc_url: &str, wallet_key: &str) -> Result<(SigningProvider, Address), AppError> {
        let url = parse_rpc_url(rpc_url)?;
        let signer = PrivateKeySigner::from_str(wallet_key.trim())
            .map_err(|e| AppError::Config(format!("Invalid wallet key: {}", e)))?;
        let vault = signer.address();
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url)
            .erased();
        Ok((provider, vault))
    }
}

fn parse_rpc_url(rpc_url: &str) -> Result<Url, AppError> {
    Url::parse(rpc_url.trim()).map_err(|e| AppError::Config(format!("Invalid RPC URL: {}", e)))
}

/// Timestamp of the latest block; the clock the rebalance gates run on.
pub async fn latest_block_timestamp<P: Provider>(provider: &P) -> Result<u64, AppError> {
    let block = provider
        .get_block_by_number(BlockNumberOrTag::Latest)
        .await
        .map_err(|e| AppError::Connection(format!("Latest block fetch failed: {}", e)))?
        .ok_or_else(|| AppError::Connection("Latest block unavailable".into()))?;
    Ok(block.header.timestamp)
}

/// Terminal state of a submitted transaction as far as this process can tell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxOutcome {
    /// Rejected before broadcast.
    NotSent(String),
    Confirmed(B256),
    Reverted(B256),
    /// Broadcast but no receipt came back; it may still have been mined.
    Unconfirmed { hash: B256, reason: String },
}

impl TxOutcome {
    /// True when the transaction cannot have changed any balance.
    pub fn had_no_effect(&self) -> bool {
        matches!(self, TxOutcome::NotSent(_) | TxOutcome::Reverted(_))
    }

    pub fn failure(&self, scope: &str, step: &str) -> AppError {
        match self {
            TxOutcome::NotSent(reason) => AppError::Transaction {
                hash: String::new(),
                reason: format!("{scope}/{step} submission failed: {reason}"),
            },
            TxOutcome::Confirmed(hash) => AppError::Transaction {
                hash: format!("{hash:#x}"),
                reason: format!("{scope}/{step} confirmed"),
            },
            TxOutcome::Reverted(hash) => AppError::Transaction {
                hash: format!("{hash:#x}"),
                reason: format!("{scope}/{step} reverted"),
            },
            TxOutcome::Unconfirmed { hash, reason } => AppError::Transaction {
                hash: format!("{hash:#x}"),
                reason: format!("{scope}/{step} receipt failed: {reason}"),
            },
        }
    }

    pub fn into_result(self, scope: &str, step: &str) -> Result<B256, AppError> {
        match self {
            TxOutcome::Confirmed(hash) => Ok(hash),
            other => Err(other.failure(scope, step)),
        }
    }
}

/// Wait for a submitted transaction and classify how it ended.
pub async fn settle(
    submitted: Result<PendingTransactionBuilder<Ethereum>, alloy::contract::Error>,
) -> TxOutcome {
    let pending = match submitted {
        Ok(pending) => pending,
        Err(e) => return TxOutcome::NotSent(e.to_string()),
    };
    let hash = *pending.tx_hash();
    match pending.get_receipt().await {
        Ok(receipt) if receipt.status() => TxOutcome::Confirmed(hash),
        Ok(_) => TxOutcome::Reverted(hash),
        Err(e) => TxOutcome::Unconfirmed {
            hash,
            reason: e.to_string(),
        },
    }
}

/// Wait for a submitted transaction and require a successful receipt.
/// `scope` names the adapter and `step` the call, both only for errors and logs.
pub async fn confirm(
    scope: &'static str,
    step: &'static str,
    submitted: Result<PendingTransactionBuilder<Ethereum>, alloy::contract::Error>,
) -> Result<B256, AppError> {
    let hash = settle(submitted).await.into_result(scope, step)?;
    tracing::info!(target: "tx", scope, step, tx = %hash, "Transaction confirmed");
    Ok(hash)
}
