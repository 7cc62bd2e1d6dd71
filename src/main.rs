// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use alloy::primitives::U256;
use clap::{Parser, Subcommand};
use serde::Serialize;
use treasury_rebalancer::app::config::RebalancerSettings;
use treasury_rebalancer::app::logging::setup_logging;
use treasury_rebalancer::common::time_utils::current_unix;
use treasury_rebalancer::core::{ReadOnlySwapVenue, RebalanceExecutor};
use treasury_rebalancer::data::ledger::InMemoryReserve;
use treasury_rebalancer::data::state_store::StateStore;
use treasury_rebalancer::domain::error::{AppError, RebalanceError};
use treasury_rebalancer::domain::types::{ExecutorState, RebalanceRecord};
use treasury_rebalancer::network::provider::{ConnectionFactory, latest_block_timestamp};
use treasury_rebalancer::network::reserves::OnchainReserve;
use treasury_rebalancer::network::staking::LidoStaker;
use treasury_rebalancer::network::swapper::OnchainSwapper;

#[derive(Parser, Debug)]
#[command(author, version, about = "treasury reserve rebalancer")]
struct Cli {
    /// Path to config file (default: ./config.toml if present)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Emit JSON logs (overrides config)
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rebalance the reserve if both the time and deviation gates pass
    Execute {
        /// Evaluate gates and size the trade without sending transactions
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Show reserve balances, deviation and time-gate status
    Status,
    /// Stake the reserve's idle WETH into stETH
    DepositSteth,
    /// Run the engine against an in-memory par-priced reserve
    Simulate {
        #[arg(long)]
        balance_a: u128,
        #[arg(long)]
        balance_b: u128,
        /// Timestamp of the previous rebalance
        #[arg(long, default_value_t = 0)]
        last: u64,
        /// Evaluation time (default: now)
        #[arg(long)]
        now: Option<u64>,
    },
}

#[derive(Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
enum Outcome<T: Serialize> {
    Rebalanced { record: RebalanceRecord },
    Preview { preview: T },
    Rejected { reason: String, retryable: bool },
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let body = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::Initialization(format!("Failed to encode output: {e}")))?;
    println!("{body}");
    Ok(())
}

/// Gate rejections are normal outcomes for a cron-driven caller; anything else
/// is surfaced as a failure.
fn report_rejection(err: RebalanceError) -> Result<(), AppError> {
    if err.is_gate_rejection() {
        tracing::info!(target: "rebalance", reason = %err, "Rebalance not due");
        return print_json(&Outcome::<()>::Rejected {
            reason: err.to_string(),
            retryable: true,
        });
    }
    Err(err.into())
}

async fn run_execute(settings: &RebalancerSettings, dry_run: bool) -> Result<(), AppError> {
    let config = settings.rebalance_config()?;
    let store = StateStore::new(settings.state_path());
    let state = store.load()?;

    let http = ConnectionFactory::http(&settings.rpc_url)?;
    let reserve = OnchainReserve::new(
        http.clone(),
        settings.reserve_address,
        settings.token_pair(),
        settings.weth_token,
    );
    let now = latest_block_timestamp(&http).await?;

    if dry_run {
        let executor = RebalanceExecutor::with_state(config, state, reserve, ReadOnlySwapVenue);
        return match executor.preview_at(now).await {
            Ok(preview) => print_json(&Outcome::Preview { preview }),
            Err(e) => report_rejection(e),
        };
    }

    let (signer, vault) = ConnectionFactory::signing(&settings.rpc_url, settings.wallet_key_value()?)?;
    tracing::info!(target: "config", vault = %vault, reserve = %settings.reserve_address, "Live execution");
    let swapper = OnchainSwapper::new(
        signer,
        vault,
        settings.reserve_address,
        settings.token_pair(),
        settings.swap_route(),
    );
    let mut executor = RebalanceExecutor::with_state(config, state, reserve, swapper);
    match executor.execute_at(now).await {
        Ok(record) => {
            store.save(&executor.state())?;
            print_json(&Outcome::<()>::Rebalanced { record })
        }
        Err(e) => report_rejection(e),
    }
}

async fn run_status(settings: &RebalancerSettings) -> Result<(), AppError> {
    let config = settings.rebalance_config()?;
    let state = StateStore::new(settings.state_path()).load()?;
    let http = ConnectionFactory::http(&settings.rpc_url)?;
    let reserve = OnchainReserve::new(
        http.clone(),
        settings.reserve_address,
        settings.token_pair(),
        settings.weth_token,
    );
    let now = latest_block_timestamp(&http).await?;
    let executor = RebalanceExecutor::with_state(config, state, reserve, ReadOnlySwapVenue);
    let status = executor.status_at(now).await?;
    print_json(&status)
}

async fn run_deposit(settings: &RebalancerSettings) -> Result<(), AppError> {
    let config = settings.rebalance_config()?;
    let http = ConnectionFactory::http(&settings.rpc_url)?;
    let reserve = OnchainReserve::new(
        http,
        settings.reserve_address,
        settings.token_pair(),
        settings.weth_token,
    );
    let (signer, vault) = ConnectionFactory::signing(&settings.rpc_url, settings.wallet_key_value()?)?;
    let staker = LidoStaker::new(
        signer,
        vault,
        settings.reserve_address,
        settings.weth_token,
        settings.yield_token,
        settings.lido_referral,
    );
    let executor = RebalanceExecutor::new(config, reserve.clone(), ReadOnlySwapVenue);
    let minted = executor.deposit_wrapped_into_yield(&reserve, &staker).await?;
    print_json(&serde_json::json!({ "outcome": "deposited", "minted": minted }))
}

async fn run_simulate(
    settings: &RebalancerSettings,
    balance_a: u128,
    balance_b: u128,
    last: u64,
    now: Option<u64>,
) -> Result<(), AppError> {
    let config = settings.rebalance_config()?;
    let ledger = InMemoryReserve::new(U256::from(balance_a), U256::from(balance_b));
    let state = ExecutorState {
        last_rebalance_timestamp: last,
    };
    let mut executor = RebalanceExecutor::with_state(config, state, ledger.clone(), ledger);
    match executor.execute_at(now.unwrap_or_else(current_unix)).await {
        Ok(record) => print_json(&Outcome::<()>::Rebalanced { record }),
        Err(e) => print_json(&Outcome::<()>::Rejected {
            retryable: e.is_retryable(),
            reason: e.to_string(),
        }),
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let cli = Cli::parse();

    let settings = RebalancerSettings::load_with_path(cli.config.as_deref())?;
    setup_logging(settings.log_level(), cli.log_json || settings.log_json);
    tracing::debug!(
        target: "config",
        chain_id = settings.chain_id,
        target_ratio_a_bps = settings.target_ratio_a_bps,
        min_deviation_bps = settings.min_deviation_bps,
        min_interval_secs = settings.min_interval_secs,
        "Settings loaded"
    );

    match cli.command {
        Command::Execute { dry_run } => run_execute(&settings, dry_run).await,
        Command::Status => run_status(&settings).await,
        Command::DepositSteth => run_deposit(&settings).await,
        Command::Simulate {
            balance_a,
            balance_b,
            last,
            now,
        } => run_simulate(&settings, balance_a, balance_b, last, now).await,
    }
}
