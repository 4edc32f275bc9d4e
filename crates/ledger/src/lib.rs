//! Host-ledger side of the vault bridge.
//!
//! Tracks withdrawal and deposit signing sessions, enforces the balance and input
//! accumulation rules, and settles sessions from signer attestations.

mod deposit;
mod errors;
mod history;
mod ledger;
mod manifest;
mod params;
mod resolve;
mod session;
mod store;
mod withdraw;

pub use deposit::DepositRequest;
pub use errors::LedgerError;
pub use history::{HistoryEntry, SessionKind, SessionOutcome};
pub use ledger::{SessionLedger, SignInputRequest};
pub use manifest::{InputManifest, InputSlot};
pub use params::LedgerParams;
pub use session::{DepositSession, SessionCore, SessionStatus, WithdrawSession};
pub use store::{LedgerStore, MemLedgerStore};
pub use vault_primitives::constants::DEFAULT_HISTORY_LIMIT;
pub use withdraw::WithdrawRequest;

#[cfg(test)]
mod test_utils;
