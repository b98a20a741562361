//! Bot configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mintgate_gateway::discord::DISCORD_API_BASE;
use mintgate_market::{RetryPolicy, TokenLabel, COINGECKO_API_BASE};
use mintgate_oracle::solana::MAINNET_RPC_URL;
use mintgate_oracle::EligibleSet;
use mintgate_types::TokenId;
use mintgate_utils::LogFormat;
use mintgate_verification::VerifierSettings;

use crate::BotError;

/// Configuration for one bot instance (one guild, one role).
///
/// Every field has a default so an empty file parses. [`BotConfig::validate`]
/// is what rejects an unusable configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BotConfig {
    /// Directory holding the LMDB registry.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB map size in bytes.
    #[serde(default = "default_lmdb_map_size")]
    pub lmdb_map_size: usize,

    /// Solana JSON-RPC endpoint.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    #[serde(default = "default_discord_api_base")]
    pub discord_api_base: String,

    #[serde(default = "default_market_api_base")]
    pub market_api_base: String,

    /// Bot token. Only from env or CLI; never written back to TOML.
    #[serde(default, skip_serializing)]
    pub bot_token: String,

    #[serde(default)]
    pub application_id: String,

    /// Hex Ed25519 key Discord signs interactions with.
    #[serde(default)]
    pub public_key: String,

    #[serde(default)]
    pub guild_id: String,

    /// Role granted to verified holders.
    #[serde(default)]
    pub role_id: String,

    /// Channel for the daily market report. No report when unset.
    #[serde(default)]
    pub report_channel_id: Option<String>,

    /// Eligible mints listed inline.
    #[serde(default)]
    pub verified_mints: Vec<String>,

    /// JSON file with an array of eligible mints, merged with `verified_mints`.
    #[serde(default)]
    pub verified_mints_file: Option<PathBuf>,

    /// Address of the interactions endpoint.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    #[serde(default = "default_challenge_deadline_secs")]
    pub challenge_deadline_secs: u64,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_watchdog_period_secs")]
    pub watchdog_period_secs: u64,

    /// Concurrent owner lookups per watchdog pass.
    #[serde(default = "default_watchdog_fan_out")]
    pub watchdog_fan_out: usize,

    #[serde(default = "default_market_max_attempts")]
    pub market_max_attempts: u32,

    #[serde(default = "default_market_backoff_secs")]
    pub market_backoff_secs: u64,

    /// CoinGecko coin id of the token.
    #[serde(default = "default_coin_id")]
    pub coin_id: String,

    #[serde(default)]
    pub token_label: TokenLabel,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Serve Prometheus metrics at `/metrics`.
    #[serde(default)]
    pub enable_metrics: bool,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./mintgate_data")
}

fn default_lmdb_map_size() -> usize {
    1 << 30
}

fn default_rpc_url() -> String {
    MAINNET_RPC_URL.to_string()
}

fn default_discord_api_base() -> String {
    DISCORD_API_BASE.to_string()
}

fn default_market_api_base() -> String {
    COINGECKO_API_BASE.to_string()
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_challenge_deadline_secs() -> u64 {
    600
}

fn default_poll_interval_secs() -> u64 {
    3
}

fn default_watchdog_period_secs() -> u64 {
    6 * 60 * 60
}

fn default_watchdog_fan_out() -> usize {
    8
}

fn default_market_max_attempts() -> u32 {
    5
}

fn default_market_backoff_secs() -> u64 {
    10
}

fn default_coin_id() -> String {
    "only1".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl BotConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, BotError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| BotError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, BotError> {
        toml::from_str(s).map_err(|e| BotError::Config(e.to_string()))
    }

    /// Serialize the configuration to TOML. The bot token is left out.
    pub fn to_toml_string(&self) -> Result<String, BotError> {
        toml::to_string_pretty(self).map_err(|e| BotError::Config(e.to_string()))
    }

    /// Inline mints plus the ones in `verified_mints_file`, trimmed and
    /// de-duplicated.
    pub fn eligible_set(&self) -> Result<EligibleSet, BotError> {
        let mut mints: Vec<String> = self.verified_mints.clone();
        if let Some(path) = &self.verified_mints_file {
            let content = std::fs::read_to_string(path)
                .map_err(|e| BotError::Config(format!("{}: {e}", path.display())))?;
            let listed: Vec<String> = serde_json::from_str(&content).map_err(|e| {
                BotError::Config(format!("{}: expected a JSON array of mints: {e}", path.display()))
            })?;
            mints.extend(listed);
        }
        Ok(mints
            .iter()
            .map(|m| m.trim())
            .filter(|m| !m.is_empty())
            .map(TokenId::new)
            .collect())
    }

    pub fn verifier_settings(&self) -> Result<VerifierSettings, BotError> {
        Ok(VerifierSettings {
            eligible: self.eligible_set()?,
            challenge_deadline: Duration::from_secs(self.challenge_deadline_secs),
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            watchdog_period: Duration::from_secs(self.watchdog_period_secs),
            watchdog_fan_out: self.watchdog_fan_out,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.market_max_attempts,
            backoff: Duration::from_secs(self.market_backoff_secs),
        }
    }

    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> Result<(), BotError> {
        let required = [
            ("bot_token", &self.bot_token),
            ("application_id", &self.application_id),
            ("guild_id", &self.guild_id),
            ("role_id", &self.role_id),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(BotError::Config(format!("{name} must be set")));
            }
        }
        mintgate_interactions::parse_public_key(&self.public_key)
            .map_err(|e| BotError::Config(format!("public_key: {e}")))?;
        if self.eligible_set()?.is_empty() {
            return Err(BotError::Config(
                "no eligible mints: set verified_mints or verified_mints_file".into(),
            ));
        }
        let periods = [
            ("challenge_deadline_secs", self.challenge_deadline_secs),
            ("poll_interval_secs", self.poll_interval_secs),
            ("watchdog_period_secs", self.watchdog_period_secs),
        ];
        for (name, secs) in periods {
            if secs == 0 {
                return Err(BotError::Config(format!("{name} must be greater than zero")));
            }
        }
        if self.poll_interval_secs >= self.challenge_deadline_secs {
            return Err(BotError::Config(
                "poll_interval_secs must be shorter than challenge_deadline_secs".into(),
            ));
        }
        if self.watchdog_fan_out == 0 {
            return Err(BotError::Config("watchdog_fan_out must be at least 1".into()));
        }
        if self.market_max_attempts == 0 {
            return Err(BotError::Config("market_max_attempts must be at least 1".into()));
        }
        Ok(())
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            lmdb_map_size: default_lmdb_map_size(),
            rpc_url: default_rpc_url(),
            discord_api_base: default_discord_api_base(),
            market_api_base: default_market_api_base(),
            bot_token: String::new(),
            application_id: String::new(),
            public_key: String::new(),
            guild_id: String::new(),
            role_id: String::new(),
            report_channel_id: None,
            verified_mints: Vec::new(),
            verified_mints_file: None,
            listen_addr: default_listen_addr(),
            challenge_deadline_secs: default_challenge_deadline_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            watchdog_period_secs: default_watchdog_period_secs(),
            watchdog_fan_out: default_watchdog_fan_out(),
            market_max_attempts: default_market_max_attempts(),
            market_backoff_secs: default_market_backoff_secs(),
            coin_id: default_coin_id(),
            token_label: TokenLabel::default(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            enable_metrics: false,
        }
    }
}
