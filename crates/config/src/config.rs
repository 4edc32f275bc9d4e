use std::{fs, path::Path, path::PathBuf, time::Duration};

use bitcoin::Network;
use secp256k1::PublicKey;
use serde::{Deserialize, Serialize};
use vault_primitives::constants::{DEFAULT_CONFIRMATIONS, DEFAULT_HISTORY_LIMIT};

use crate::errors::ConfigError;

/// Default value for `poll_interval_ms` in [`WatcherConfig`].
const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

/// Default value for `reorg_lookback` in [`WatcherConfig`].
const DEFAULT_REORG_LOOKBACK: usize = 12;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Hex compressed key of the withdrawal vault.  Optional since it is derived
    /// from `mpc_root_pubkey`; if set it must match the derived key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vault_pubkey: Option<String>,

    /// Hex compressed root key of the signer network.
    pub mpc_root_pubkey: String,

    /// Hex compressed key attestations are signed with.
    pub signer_pubkey: String,

    /// Closed sessions remembered per caller.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Bound on the total of signed deposit inputs per session, none by default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deposit_input_cap_sats: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Confirmations before a spend is attested.
    #[serde(default = "default_confirmations")]
    pub confirmations: u32,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Recent blocks remembered for reorg detection.
    #[serde(default = "default_reorg_lookback")]
    pub reorg_lookback: usize,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            confirmations: DEFAULT_CONFIRMATIONS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            reorg_lookback: DEFAULT_REORG_LOOKBACK,
        }
    }
}

impl WatcherConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitcoindConfig {
    pub rpc_url: String,
    pub rpc_user: String,
    pub rpc_password: String,
    pub network: Network,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Directory path for file-based logging.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,

    /// Prefix for log file names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file_prefix: Option<String>,

    /// Use JSON format for logs instead of compact format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_format: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    pub ledger: LedgerConfig,

    #[serde(default)]
    pub watcher: WatcherConfig,

    /// Only needed by services that follow the chain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitcoind: Option<BitcoindConfig>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

fn default_confirmations() -> u32 {
    DEFAULT_CONFIRMATIONS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_reorg_lookback() -> usize {
    DEFAULT_REORG_LOOKBACK
}

fn parse_pubkey(field: &'static str, s: &str) -> Result<PublicKey, ConfigError> {
    s.parse::<PublicKey>()
        .map_err(|e| ConfigError::InvalidPubkey {
            field,
            reason: e.to_string(),
        })
}

impl LedgerConfig {
    pub fn mpc_root_pubkey(&self) -> Result<PublicKey, ConfigError> {
        parse_pubkey("ledger.mpc_root_pubkey", &self.mpc_root_pubkey)
    }

    pub fn signer_pubkey(&self) -> Result<PublicKey, ConfigError> {
        parse_pubkey("ledger.signer_pubkey", &self.signer_pubkey)
    }

    pub fn vault_pubkey(&self) -> Result<Option<PublicKey>, ConfigError> {
        self.vault_pubkey
            .as_deref()
            .map(|s| parse_pubkey("ledger.vault_pubkey", s))
            .transpose()
    }
}

impl VaultConfig {
    /// Parses and validates a TOML config.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.ledger.mpc_root_pubkey()?;
        self.ledger.signer_pubkey()?;
        self.ledger.vault_pubkey()?;

        if self.ledger.history_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "ledger.history_limit",
                reason: "must be at least 1".to_owned(),
            });
        }
        if self.watcher.confirmations == 0 {
            return Err(ConfigError::InvalidValue {
                field: "watcher.confirmations",
                reason: "must be at least 1".to_owned(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use super::*;

    const ROOT: &str = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";
    const SIGNER: &str = "02c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5";

    #[test]
    fn test_config_load() {
        let config_string = format!(
            r#"
            [ledger]
            mpc_root_pubkey = "{ROOT}"
            signer_pubkey = "{SIGNER}"
            deposit_input_cap_sats = 100000000

            [watcher]
            confirmations = 3

            [bitcoind]
            rpc_url = "http://localhost:18332"
            rpc_user = "vault"
            rpc_password = "vault"
            network = "regtest"

            [logging]
            log_dir = "/var/log/vault"
            json_format = true
        "#
        );

        let config = VaultConfig::from_toml_str(&config_string).unwrap();
        assert_eq!(config.ledger.history_limit, 5);
        assert_eq!(config.ledger.deposit_input_cap_sats, Some(100_000_000));
        assert!(config.ledger.vault_pubkey().unwrap().is_none());
        assert_eq!(config.watcher.confirmations, 3);
        assert_eq!(config.watcher.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.watcher.reorg_lookback, 12);
        assert_eq!(config.bitcoind.unwrap().network, Network::Regtest);
        assert_eq!(config.logging.json_format, Some(true));
    }

    #[test]
    fn test_minimal_config_defaults() {
        let config = VaultConfig::from_toml_str(&format!(
            r#"
            [ledger]
            mpc_root_pubkey = "{ROOT}"
            signer_pubkey = "{SIGNER}"
        "#
        ))
        .unwrap();
        assert_eq!(config.ledger.history_limit, DEFAULT_HISTORY_LIMIT);
        assert_eq!(config.watcher.confirmations, DEFAULT_CONFIRMATIONS);
        assert_eq!(config.watcher.confirmations, WatcherConfig::default().confirmations);
        assert!(config.bitcoind.is_none());
        assert!(config.ledger.deposit_input_cap_sats.is_none());
    }

    #[test]
    fn test_rejects_bad_values() {
        let err = VaultConfig::from_toml_str(&format!(
            r#"
            [ledger]
            mpc_root_pubkey = "abcd"
            signer_pubkey = "{SIGNER}"
        "#
        ))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidPubkey {
                field: "ledger.mpc_root_pubkey",
                ..
            }
        ));

        let err = VaultConfig::from_toml_str(&format!(
            r#"
            [ledger]
            mpc_root_pubkey = "{ROOT}"
            signer_pubkey = "{SIGNER}"

            [watcher]
            confirmations = 0
        "#
        ))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "watcher.confirmations",
                ..
            }
        ));
    }

    #[test]
    fn test_load_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "[ledger]\nmpc_root_pubkey = \"{ROOT}\"\nsigner_pubkey = \"{SIGNER}\"\n"
        )
        .unwrap();

        let config = VaultConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.ledger.signer_pubkey().unwrap().to_string(), SIGNER);

        assert!(matches!(
            VaultConfig::load_from_path("/nonexistent/vault.toml"),
            Err(ConfigError::Io(_))
        ));
    }
}
