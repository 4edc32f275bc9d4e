use thiserror::Error;
use vault_commitment::CommitmentError;
use vault_primitives::TxCommit;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SigningError {
    #[error("payload shape does not match its tx commit (expected {expected}, got {got})")]
    ShapeMismatch { expected: TxCommit, got: TxCommit },

    #[error("commitment: {0}")]
    Commitment(#[from] CommitmentError),

    #[error("invalid recovery id {0}")]
    InvalidRecoveryId(u8),

    #[error("malformed signature")]
    MalformedSignature,

    #[error("signature does not recover to the expected key")]
    InvalidSignature,

    #[error("script code does not belong to key {0}")]
    ScriptCodeMismatch(String),

    #[error("key derivation: {0}")]
    Derivation(String),

    #[error("encoding: {0}")]
    Encoding(String),

    #[error("signer unavailable: {0}")]
    Unavailable(String),
}
