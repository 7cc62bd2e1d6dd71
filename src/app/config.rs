// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::common::data_path::resolve_data_path;
use crate::domain::constants;
use crate::domain::error::AppError;
use crate::domain::types::RebalanceConfig;
use crate::infrastructure::network::price_feed::{TokenPair, TokenSpec};
use crate::infrastructure::network::swapper::SwapRoute;
use alloy::primitives::Address;
use config::{Config, Environment, File};
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct RebalancerSettings {
    // General
    #[serde(default = "default_false")]
    pub debug: bool,
    #[serde(default = "default_false")]
    pub log_json: bool,
    pub data_dir: Option<String>,
    #[serde(default = "default_state_path")]
    pub state_path: String,

    // Network
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,

    // Identity (only needed for live execution)
    pub wallet_key: Option<String>,

    // Reserve and assets
    #[serde(default = "default_reserve")]
    pub reserve_address: Address,
    #[serde(default = "default_stable_token")]
    pub stable_token: Address,
    #[serde(default = "default_stable_decimals")]
    pub stable_decimals: u8,
    pub stable_price_feed: Option<Address>,
    #[serde(default = "default_yield_token")]
    pub yield_token: Address,
    #[serde(default = "default_yield_decimals")]
    pub yield_decimals: u8,
    pub yield_price_feed: Option<Address>,
    #[serde(default = "default_weth_token")]
    pub weth_token: Address,
    /// Referral passed to Lido on stETH deposits.
    #[serde(default)]
    pub lido_referral: Address,

    // Swap routing
    #[serde(default = "default_swap_router")]
    pub swap_router: Address,
    #[serde(default = "default_swap_quoter")]
    pub swap_quoter: Address,
    pub swap_intermediate: Option<Address>,
    /// Comma-separated string or array of V3 fee tiers, A -> B order.
    #[serde(default = "default_swap_path_fees", deserialize_with = "deserialize_fee_list")]
    pub swap_path_fees: Vec<u32>,
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: u64,
    #[serde(default = "default_swap_deadline_secs")]
    pub swap_deadline_secs: u64,

    // Rebalance policy
    #[serde(default = "default_target_ratio_a_bps")]
    pub target_ratio_a_bps: u64,
    #[serde(default = "default_min_deviation_bps")]
    pub min_deviation_bps: u64,
    #[serde(default = "default_min_interval_secs")]
    pub min_interval_secs: u64,
}

// Defaults
fn default_false() -> bool {
    false
}
fn default_state_path() -> String {
    "rebalancer_state.json".to_string()
}
fn default_rpc_url() -> String {
    "http://127.0.0.1:8545".to_string()
}
fn default_chain_id() -> u64 {
    constants::CHAIN_ETHEREUM
}
fn default_reserve() -> Address {
    constants::RESERVES_MAINNET
}
fn default_stable_token() -> Address {
    constants::USDC_MAINNET
}
fn default_stable_decimals() -> u8 {
    6
}
fn default_yield_token() -> Address {
    constants::STETH_MAINNET
}
fn default_yield_decimals() -> u8 {
    18
}
fn default_weth_token() -> Address {
    constants::WETH_MAINNET
}
fn default_swap_router() -> Address {
    constants::UNIV3_ROUTER_MAINNET
}
fn default_swap_quoter() -> Address {
    constants::UNIV3_QUOTER_MAINNET
}
fn default_swap_path_fees() -> Vec<u32> {
    vec![constants::DEFAULT_V3_FEE_TIER]
}
fn default_slippage_bps() -> u64 {
    50
}
fn default_swap_deadline_secs() -> u64 {
    300
}
fn default_target_ratio_a_bps() -> u64 {
    constants::DEFAULT_TARGET_RATIO_A_BPS
}
fn default_min_deviation_bps() -> u64 {
    constants::DEFAULT_MIN_DEVIATION_BPS
}
fn default_min_interval_secs() -> u64 {
    constants::DEFAULT_MIN_INTERVAL_SECS
}

fn parse_fee_list(raw: &str) -> Result<Vec<u32>, AppError> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u32>()
                .map_err(|_| AppError::Config(format!("Invalid fee tier '{s}' in swap_path_fees")))
        })
        .collect()
}

fn deserialize_fee_list<'de, D>(deserializer: D) -> Result<Vec<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{Error, SeqAccess, Visitor};
    use std::fmt;

    struct FeeVisitor;

    impl<'de> Visitor<'de> for FeeVisitor {
        type Value = Vec<u32>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a sequence of fee tiers or a comma-separated string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: Error,
        {
            parse_fee_list(v).map_err(E::custom)
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: Error,
        {
            u32::try_from(v)
                .map(|fee| vec![fee])
                .map_err(|_| E::custom(format!("fee tier {v} out of range")))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: Error,
        {
            u32::try_from(v)
                .map(|fee| vec![fee])
                .map_err(|_| E::custom(format!("fee tier {v} out of range")))
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            let mut out = Vec::new();
            while let Some(elem) = seq.next_element::<u32>()? {
                out.push(elem);
            }
            Ok(out)
        }
    }

    deserializer.deserialize_any(FeeVisitor)
}

impl RebalancerSettings {
    pub fn load_with_path(path: Option<&str>) -> Result<Self, AppError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let mut builder = Config::builder();
        if let Some(selected_path) = path {
            builder = builder.add_source(File::from(Path::new(selected_path)).required(true));
        } else {
            builder = builder.add_source(File::with_name("config").required(false));
        }
        // Deterministic precedence: CLI (in main) > env/.env > config file.
        builder = builder.add_source(Environment::default());

        let settings: RebalancerSettings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load() -> Result<Self, AppError> {
        Self::load_with_path(None)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        self.rebalance_config()?;
        if self.slippage_bps >= constants::BPS_DENOMINATOR {
            return Err(AppError::Validation {
                field: "slippage_bps".into(),
                message: format!("must be below {}", constants::BPS_DENOMINATOR),
            });
        }
        let hops = 1 + usize::from(self.swap_intermediate.is_some());
        if self.swap_path_fees.len() != hops {
            return Err(AppError::Validation {
                field: "swap_path_fees".into(),
                message: format!(
                    "route has {hops} hop(s) but {} fee tier(s) configured",
                    self.swap_path_fees.len()
                ),
            });
        }
        if self.stable_token == self.yield_token {
            return Err(AppError::Validation {
                field: "yield_token".into(),
                message: "must differ from stable_token".into(),
            });
        }
        Ok(())
    }

    pub fn rebalance_config(&self) -> Result<RebalanceConfig, AppError> {
        RebalanceConfig::new(
            self.target_ratio_a_bps,
            self.min_deviation_bps,
            self.min_interval_secs,
        )
    }

    pub fn token_pair(&self) -> TokenPair {
        TokenPair {
            a: TokenSpec {
                address: self.stable_token,
                decimals: self.stable_decimals,
                price_feed: self.stable_price_feed,
            },
            b: TokenSpec {
                address: self.yield_token,
                decimals: self.yield_decimals,
                price_feed: self.yield_price_feed,
            },
        }
    }

    pub fn swap_route(&self) -> SwapRoute {
        SwapRoute {
            router: self.swap_router,
            quoter: self.swap_quoter,
            intermediate: self.swap_intermediate,
            fees: self.swap_path_fees.clone(),
            slippage_bps: self.slippage_bps,
            deadline_secs: self.swap_deadline_secs,
        }
    }

    pub fn wallet_key_value(&self) -> Result<&str, AppError> {
        self.wallet_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AppError::Config("WALLET_KEY is missing".to_string()))
    }

    pub fn state_path(&self) -> PathBuf {
        resolve_data_path(&self.state_path, self.data_dir.as_deref())
    }

    pub fn log_level(&self) -> &'static str {
        if self.debug { "debug" } else { "info" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::{Mutex, OnceLock};

    fn env_lock_guard() -> std::sync::MutexGuard<'static, ()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        ENV_LOCK
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    fn write_config(name: &str, body: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "treasury-rebalancer-config-{}-{}",
            std::process::id(),
            name
        ));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn file_values_override_defaults() {
        let _guard = env_lock_guard();
        let path = write_config(
            "file",
            r#"
target_ratio_a_bps = 5000
min_deviation_bps = 100
min_interval_secs = 3600
swap_intermediate = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"
swap_path_fees = [500, 10000]
"#,
        );
        let settings = RebalancerSettings::load_with_path(path.to_str()).unwrap();
        let config = settings.rebalance_config().unwrap();
        assert_eq!(config.target_ratio_a_bps(), 5_000);
        assert_eq!(config.min_deviation_bps(), 100);
        assert_eq!(config.min_interval_secs(), 3_600);
        assert_eq!(settings.swap_path_fees, vec![500, 10_000]);
        assert_eq!(settings.stable_token, constants::USDC_MAINNET);
        assert_eq!(settings.token_pair().b.decimals, 18);
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn defaults_follow_seventy_thirty_policy() {
        let _guard = env_lock_guard();
        let path = write_config("defaults", "debug = true\n");
        let settings = RebalancerSettings::load_with_path(path.to_str()).unwrap();
        let config = settings.rebalance_config().unwrap();
        assert_eq!(config.target_ratio_a_bps(), 7_000);
        assert_eq!(config.target_ratio_b_bps(), 3_000);
        assert_eq!(config.min_deviation_bps(), 500);
        assert_eq!(settings.log_level(), "debug");
        assert_eq!(settings.swap_route().fees, vec![500]);
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn invalid_target_ratio_is_rejected() {
        let _guard = env_lock_guard();
        let path = write_config("invalid", "target_ratio_a_bps = 10000\n");
        let err = RebalancerSettings::load_with_path(path.to_str()).unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "target_ratio_a_bps"));
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn fee_count_must_match_route() {
        let _guard = env_lock_guard();
        let path = write_config("fees", "swap_path_fees = \"500,3000\"\n");
        let err = RebalancerSettings::load_with_path(path.to_str()).unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "swap_path_fees"));
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn fee_list_parser_accepts_commas_and_spaces() {
        assert_eq!(parse_fee_list("500, 3000 10000").unwrap(), vec![500, 3_000, 10_000]);
        assert!(parse_fee_list("500,abc").is_err());
    }

    #[test]
    fn wallet_key_required_only_when_asked() {
        let _guard = env_lock_guard();
        let path = write_config("wallet", "rpc_url = \"http://localhost:8545\"\n");
        let mut settings = RebalancerSettings::load_with_path(path.to_str()).unwrap();
        settings.wallet_key = Some("   ".into());
        assert!(settings.wallet_key_value().is_err());
        settings.wallet_key = Some("0xabc".into());
        assert_eq!(settings.wallet_key_value().unwrap(), "0xabc");
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn state_path_resolves_under_data_dir() {
        let _guard = env_lock_guard();
        let path = write_config(
            "state",
            "data_dir = \"/srv/treasury\"\nstate_path = \"data/state.json\"\n",
        );
        let settings = RebalancerSettings::load_with_path(path.to_str()).unwrap();
        assert_eq!(settings.state_path(), PathBuf::from("/srv/treasury/state.json"));
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
