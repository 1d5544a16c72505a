use serde::Deserialize;
use std::env;
use std::time::Duration;

use crate::constants::{
    CURRENT_TURN_POLL_MS, DEFAULT_GAME_REGISTRY_ID, DEFAULT_GAS_BUDGET, DEFAULT_MODULE_NAME,
    DEFAULT_PACKAGE_ID, DEFAULT_RECEIPT_BACKOFF_MS, DEFAULT_RECEIPT_POLL_ATTEMPTS,
    DEFAULT_SESSION_FILE, DEFAULT_SUI_RPC_URL, GAMES_LIST_POLL_MS, GAME_STATE_POLL_MS,
    ROUND_INFO_POLL_MS,
};
use crate::utils::{env_non_empty, env_parse_or, is_object_id};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Blockchain
    pub sui_rpc_url: String,

    // Contract
    pub package_id: String,
    pub game_registry_id: String,
    pub module_name: String,

    // Signing
    pub sui_private_key: Option<String>,
    pub gas_budget: u64,

    // Receipt lookup after create_game
    pub receipt_poll_attempts: usize,
    pub receipt_backoff_ms: u64,

    // Polling
    pub game_state_poll_ms: u64,
    pub round_info_poll_ms: u64,
    pub current_turn_poll_ms: u64,
    pub games_list_poll_ms: u64,

    // Session persistence
    pub session_file: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        Ok(Config {
            sui_rpc_url: env::var("SUI_RPC_URL")
                .unwrap_or_else(|_| DEFAULT_SUI_RPC_URL.to_string()),

            package_id: env::var("PENALSUI_PACKAGE_ID")
                .unwrap_or_else(|_| DEFAULT_PACKAGE_ID.to_string()),
            game_registry_id: env::var("PENALSUI_REGISTRY_ID")
                .unwrap_or_else(|_| DEFAULT_GAME_REGISTRY_ID.to_string()),
            module_name: env::var("PENALSUI_MODULE")
                .unwrap_or_else(|_| DEFAULT_MODULE_NAME.to_string()),

            sui_private_key: env_non_empty("SUI_PRIVATE_KEY"),
            gas_budget: env_parse_or("GAS_BUDGET", DEFAULT_GAS_BUDGET)?,

            receipt_poll_attempts: env_parse_or(
                "RECEIPT_POLL_ATTEMPTS",
                DEFAULT_RECEIPT_POLL_ATTEMPTS,
            )?,
            receipt_backoff_ms: env_parse_or("RECEIPT_BACKOFF_MS", DEFAULT_RECEIPT_BACKOFF_MS)?,

            game_state_poll_ms: env_parse_or("GAME_STATE_POLL_MS", GAME_STATE_POLL_MS)?,
            round_info_poll_ms: env_parse_or("ROUND_INFO_POLL_MS", ROUND_INFO_POLL_MS)?,
            current_turn_poll_ms: env_parse_or("CURRENT_TURN_POLL_MS", CURRENT_TURN_POLL_MS)?,
            games_list_poll_ms: env_parse_or("GAMES_LIST_POLL_MS", GAMES_LIST_POLL_MS)?,

            session_file: env::var("PENALSUI_SESSION_FILE")
                .unwrap_or_else(|_| DEFAULT_SESSION_FILE.to_string()),
        })
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let rpc = self.sui_rpc_url.trim();
        if rpc.is_empty() {
            anyhow::bail!("SUI_RPC_URL is empty");
        }
        let parsed = url::Url::parse(rpc)?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            anyhow::bail!("SUI_RPC_URL must be http(s), got {}", parsed.scheme());
        }
        if !is_object_id(&self.package_id) {
            anyhow::bail!("PENALSUI_PACKAGE_ID is not a valid object id");
        }
        if !is_object_id(&self.game_registry_id) {
            anyhow::bail!("PENALSUI_REGISTRY_ID is not a valid object id");
        }
        if self.module_name.trim().is_empty() {
            anyhow::bail!("PENALSUI_MODULE is empty");
        }
        if self.receipt_poll_attempts == 0 {
            anyhow::bail!("RECEIPT_POLL_ATTEMPTS must be > 0");
        }

        if self.package_id.starts_with("0x0000") {
            tracing::warn!("Using placeholder package id");
        }
        if self.game_registry_id.starts_with("0x0000") {
            tracing::warn!("Using placeholder game registry id");
        }
        if self.gas_budget == 0 {
            tracing::warn!("GAS_BUDGET is 0; transactions will be rejected by the node");
        }
        if self.game_state_poll_ms == 0
            || self.round_info_poll_ms == 0
            || self.current_turn_poll_ms == 0
            || self.games_list_poll_ms == 0
        {
            tracing::warn!("Poll intervals should be > 0");
        }

        Ok(())
    }

    pub fn is_testnet(&self) -> bool {
        let url = self.sui_rpc_url.to_ascii_lowercase();
        url.contains("testnet") || url.contains("devnet") || url.contains("localhost")
            || url.contains("127.0.0.1")
    }

    pub fn game_state_interval(&self) -> Duration {
        Duration::from_millis(self.game_state_poll_ms.max(1))
    }

    pub fn round_info_interval(&self) -> Duration {
        Duration::from_millis(self.round_info_poll_ms.max(1))
    }

    pub fn current_turn_interval(&self) -> Duration {
        Duration::from_millis(self.current_turn_poll_ms.max(1))
    }

    pub fn games_list_interval(&self) -> Duration {
        Duration::from_millis(self.games_list_poll_ms.max(1))
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        sui_rpc_url: "http://localhost:9000".to_string(),
        package_id: DEFAULT_PACKAGE_ID.to_string(),
        game_registry_id: DEFAULT_GAME_REGISTRY_ID.to_string(),
        module_name: DEFAULT_MODULE_NAME.to_string(),
        sui_private_key: None,
        gas_budget: DEFAULT_GAS_BUDGET,
        receipt_poll_attempts: DEFAULT_RECEIPT_POLL_ATTEMPTS,
        receipt_backoff_ms: 1,
        game_state_poll_ms: 20,
        round_info_poll_ms: 10,
        current_turn_poll_ms: 10,
        games_list_poll_ms: 50,
        session_file: "unused.json".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_test_config_is_valid() {
        assert!(test_config().validate().is_ok());
        assert!(test_config().is_testnet());
    }

    #[test]
    fn validate_rejects_bad_rpc_scheme() {
        let mut config = test_config();
        config.sui_rpc_url = "ws://localhost:9000".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_malformed_package_id() {
        let mut config = test_config();
        config.package_id = "0xnothex".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_attempts() {
        let mut config = test_config();
        config.receipt_poll_attempts = 0;
        assert!(config.validate().is_err());
    }
}
