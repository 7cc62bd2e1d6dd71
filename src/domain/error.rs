// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::domain::types::SwapInstruction;
use alloy::primitives::U256;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("Connection failed to endpoint: {0}")]
    Connection(String),

    #[error("Transaction failed: {hash:?}, reason: {reason}")]
    Transaction { hash: String, reason: String },

    #[error("Insufficient funds. Required: {required}, Available: {available}")]
    InsufficientFunds { required: String, available: String },

    #[error("Validation failed for field {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Address {0} is invalid or not checksummed")]
    InvalidAddress(String),

    #[error(transparent)]
    Rebalance(#[from] RebalanceError),

    #[error(transparent)]
    Unknown(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

/// Outcomes of a rebalance attempt other than success. None of them leave the
/// executor state modified.
#[derive(Error, Debug)]
pub enum RebalanceError {
    #[error("Reserve is empty: combined balance of both assets is zero")]
    EmptyReserve,

    // Surfaced on-chain as YIP210__MinimumRebalancePercentageNotReached.
    #[error(
        "Minimum rebalance interval not elapsed: now={now}, last={last}, interval={min_interval}s, retry at {retry_at}"
    )]
    MinimumIntervalNotElapsed {
        now: u64,
        last: u64,
        min_interval: u64,
        retry_at: u64,
    },

    #[error("Deviation {deviation_bps} bps is below the {min_deviation_bps} bps threshold")]
    DeviationBelowThreshold {
        deviation_bps: u64,
        min_deviation_bps: u64,
    },

    #[error("Reserve balance read failed: {0}")]
    ReserveUnavailable(#[source] Box<AppError>),

    #[error(
        "Swap selling {amount} of asset {sell} failed: {source}",
        amount = .instruction.sell_amount,
        sell = .instruction.sell_asset
    )]
    SwapExecutionFailed {
        instruction: SwapInstruction,
        #[source]
        source: Box<AppError>,
    },

    #[error("No wrapped native balance in the reserve to deposit")]
    NothingToDeposit,

    #[error("Deposit of {amount} wrapped native into the yield asset failed: {source}")]
    DepositFailed {
        amount: U256,
        #[source]
        source: Box<AppError>,
    },
}

impl RebalanceError {
    /// Whether calling again later can succeed without operator action.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, RebalanceError::EmptyReserve)
    }

    /// Expected rejections from the time or deviation gate.
    pub fn is_gate_rejection(&self) -> bool {
        matches!(
            self,
            RebalanceError::MinimumIntervalNotElapsed { .. }
                | RebalanceError::DeviationBelowThreshold { .. }
        )
    }
}
