//! The signer's side of the bridge: signs ledger payloads, watches the outpoints
//! it signed for and attests to their spends once confirmed.

pub mod errors;
pub mod reader;
pub mod signer;
pub mod watcher;

pub use errors::WatcherError;
pub use reader::{backfill, BitcoindFetcher, BlockFetcher, ChainFollower, FollowerConfig};
pub use signer::LocalSigner;
pub use watcher::OutpointWatcher;
