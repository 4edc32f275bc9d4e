//! Configuration of the vault bridge services.

mod config;
mod errors;

pub use config::{BitcoindConfig, LedgerConfig, LoggingConfig, VaultConfig, WatcherConfig};
pub use errors::ConfigError;
