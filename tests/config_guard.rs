// SPDX-License-Identifier: MIT
// Guards against committing a vault key into any of the TOML configs.

use regex::Regex;
use std::fs;
use std::path::Path;

/// Fail CI if config files contain 64-hex private keys or a wallet_key entry.
#[test]
fn no_committed_wallet_keys_in_configs() {
    let hex_key = Regex::new(r"0x?[a-fA-F0-9]{64}").unwrap();
    let wallet_key = Regex::new(r"^\s*wallet_key\s*=").unwrap();
    let candidates = [
        "config.toml",
        "config.example.toml",
        "config.prod.toml",
        "config.dev.toml",
    ];
    for file in candidates {
        if !Path::new(file).exists() {
            continue;
        }
        let body = fs::read_to_string(file).expect("read config");
        for (idx, line) in body.lines().enumerate() {
            if hex_key.is_match(line) {
                panic!("Secret-looking hex in {} at line {}", file, idx + 1);
            }
            if wallet_key.is_match(line) {
                panic!("wallet_key set in {} at line {}; use WALLET_KEY", file, idx + 1);
            }
        }
    }
}
