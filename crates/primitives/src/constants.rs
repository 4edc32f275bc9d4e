//! Protocol constants.

/// The only sighash type the bridge authorizes, `SIGHASH_ALL`.
pub const SIGHASH_ALL: u32 = 0x01;

/// Domain separator for transaction-shape commitments.
pub const TX_COMMIT_DOMAIN: &[u8] = b"vault-bridge/tx-commit/v1";

/// Domain separator for per-caller session identifiers.
pub const SESSION_ID_DOMAIN: &[u8] = b"vault-bridge/session-id/v1";

/// Domain separator for outpoint-spent attestations.
pub const ATTESTATION_DOMAIN: &[u8] = b"vault-bridge/outpoint-spent/v1";

/// Recommended confirmation depth before the signer attests to a spend.
pub const DEFAULT_CONFIRMATIONS: u32 = 6;

/// Closed sessions kept in each caller's history unless configured otherwise.
pub const DEFAULT_HISTORY_LIMIT: usize = 5;

/// Consensus limit on the size of a script, in bytes.
pub const MAX_SCRIPT_SIZE: usize = 10_000;
