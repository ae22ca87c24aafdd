//! Ledger configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use multirewards_types::Address;
use multirewards_utils::LogFormat;

use crate::controller::MultiRewards;
use crate::error::RewardsError;

/// A reward stream to register at startup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    pub token: Address,
    pub distributor: Address,
    /// Funding period length in seconds.
    #[serde(default = "default_duration")]
    pub duration: u64,
}

/// Configuration for a MultiRewards ledger.
///
/// Loaded from a TOML file via [`LedgerConfig::from_toml_file`] or built
/// programmatically with [`LedgerConfig::new`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Identity allowed to register streams, pause, and recover assets.
    pub owner: Address,

    /// The principal token participants stake.
    pub staking_token: Address,

    /// Holder of all custodied tokens.
    pub custody: Address,

    /// Start with staking paused.
    #[serde(default)]
    pub paused: bool,

    /// Directory for the LMDB ledger store.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Streams registered by the owner when the ledger is created.
    #[serde(default)]
    pub streams: Vec<StreamConfig>,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_duration() -> u64 {
    604_800
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./multirewards_data")
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl LedgerConfig {
    pub fn new(owner: Address, staking_token: Address, custody: Address) -> Self {
        Self {
            owner,
            staking_token,
            custody,
            paused: false,
            data_dir: default_data_dir(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            streams: Vec::new(),
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, RewardsError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| RewardsError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, RewardsError> {
        toml::from_str(s).map_err(|e| RewardsError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, RewardsError> {
        toml::to_string_pretty(self).map_err(|e| RewardsError::Config(e.to_string()))
    }
}

impl MultiRewards {
    /// Build a ledger from configuration, registering its streams as the owner.
    pub fn from_config(config: &LedgerConfig) -> Result<Self, RewardsError> {
        let mut ledger = Self::new(config.owner, config.staking_token, config.custody);
        for stream in &config.streams {
            ledger.register_stream(&config.owner, stream.token, stream.distributor, stream.duration)?;
        }
        ledger.set_paused(&config.owner, config.paused)?;
        Ok(ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        owner = "0x0101010101010101010101010101010101010101"
        staking_token = "0x0202020202020202020202020202020202020202"
        custody = "0x0303030303030303030303030303030303030303"
    "#;

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = LedgerConfig::from_toml_str(MINIMAL).expect("should parse");
        assert_eq!(config.owner, Address::repeat_byte(1));
        assert!(!config.paused);
        assert!(config.streams.is_empty());
        assert_eq!(config.log_format, LogFormat::Human);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.data_dir, PathBuf::from("./multirewards_data"));
    }

    #[test]
    fn missing_identity_is_a_config_error() {
        let result = LedgerConfig::from_toml_str("paused = true");
        assert!(matches!(result, Err(RewardsError::Config(_))));
    }

    #[test]
    fn malformed_address_is_rejected() {
        let toml = MINIMAL.replace("0x0101010101010101010101010101010101010101", "0x01");
        assert!(LedgerConfig::from_toml_str(&toml).is_err());
    }

    #[test]
    fn log_format_is_typed() {
        let config =
            LedgerConfig::from_toml_str(&format!("log_format = \"json\"\n{MINIMAL}")).unwrap();
        assert_eq!(config.log_format, LogFormat::Json);

        let bad = LedgerConfig::from_toml_str(&format!("log_format = \"xml\"\n{MINIMAL}"));
        assert!(matches!(bad, Err(RewardsError::Config(_))));
    }

    #[test]
    fn streams_parse_with_default_duration() {
        let toml = format!(
            r#"{MINIMAL}
            [[streams]]
            token = "0x1010101010101010101010101010101010101010"
            distributor = "0x2020202020202020202020202020202020202020"

            [[streams]]
            token = "0x1111111111111111111111111111111111111111"
            distributor = "0x2020202020202020202020202020202020202020"
            duration = 86400
            "#
        );
        let config = LedgerConfig::from_toml_str(&toml).expect("should parse");
        assert_eq!(config.streams.len(), 2);
        assert_eq!(config.streams[0].duration, 604_800);
        assert_eq!(config.streams[1].duration, 86_400);
    }

    #[test]
    fn config_round_trips_through_toml() {
        let mut config = LedgerConfig::new(
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            Address::repeat_byte(3),
        );
        config.paused = true;
        config.streams.push(StreamConfig {
            token: Address::repeat_byte(0x10),
            distributor: Address::repeat_byte(0x20),
            duration: 3_600,
        });
        let toml_str = config.to_toml_string().unwrap();
        let parsed = LedgerConfig::from_toml_str(&toml_str).expect("should parse");
        assert!(parsed.paused);
        assert_eq!(parsed.streams, config.streams);
    }

    #[test]
    fn from_config_registers_streams() {
        let mut config = LedgerConfig::new(
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            Address::repeat_byte(3),
        );
        config.paused = true;
        for n in [0x10, 0x11] {
            config.streams.push(StreamConfig {
                token: Address::repeat_byte(n),
                distributor: Address::repeat_byte(0x20),
                duration: 100,
            });
        }
        let ledger = MultiRewards::from_config(&config).unwrap();
        assert_eq!(ledger.reward_token_length(), 2);
        assert_eq!(ledger.reward_tokens(1), Some(Address::repeat_byte(0x11)));
        assert!(ledger.is_paused());
    }

    #[test]
    fn duplicate_configured_stream_fails() {
        let mut config = LedgerConfig::new(
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            Address::repeat_byte(3),
        );
        let stream = StreamConfig {
            token: Address::repeat_byte(0x10),
            distributor: Address::repeat_byte(0x20),
            duration: 100,
        };
        config.streams = vec![stream.clone(), stream];
        assert!(matches!(
            MultiRewards::from_config(&config),
            Err(RewardsError::AlreadyRegistered(_))
        ));
    }
}
