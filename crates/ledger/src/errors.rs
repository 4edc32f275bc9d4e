use thiserror::Error;
use vault_primitives::{Buf32, OutpointRef, SessionId};

use crate::session::SessionStatus;

/// Rejections of the session ledger.  Every rejection leaves the store untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("insufficient balance: need {needed} sats, have {available}")]
    InsufficientBalance { needed: u64, available: u64 },

    /// Signing this input would authorize more value than the transaction spends.
    #[error("input total exceeded: {authorized} already authorized + {requested} > {limit}")]
    InputTotalExceeded {
        authorized: u64,
        requested: u64,
        limit: u64,
    },

    #[error("outpoint mismatch at input {index}: expected {expected}, got {got}")]
    OutpointMismatch {
        index: u32,
        expected: OutpointRef,
        got: OutpointRef,
    },

    #[error("sequence mismatch at input {index}: expected {expected:#x}, got {got:#x}")]
    SequenceMismatch { index: u32, expected: u32, got: u32 },

    /// The completed input manifest does not hash to the committed
    /// `hash_prevouts`/`hash_sequence`.
    #[error("input manifest does not match committed hashes")]
    CommitmentMismatch,

    /// Refunding requires a verified manifest, otherwise the caller could have
    /// signed inputs of a different transaction.
    #[error("refund blocked: input manifest not verified")]
    RefundBlocked,

    #[error("invalid attestation signature")]
    InvalidSignature,

    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    #[error("session {0} exists with different parameters")]
    SessionConflict(SessionId),

    /// Session ids are single-use, a closed session cannot be opened again.
    #[error("session {0} already closed")]
    SessionClosed(SessionId),

    /// The vault outputs of this spend were already credited to a deposit.
    #[error("spend {0} already credited")]
    SpendAlreadyCredited(Buf32),

    #[error("caller does not own session")]
    NotSessionOwner,

    #[error("session not active ({0:?})")]
    SessionNotActive(SessionStatus),

    #[error("input index {index} out of bounds ({num_inputs} inputs)")]
    InputIndexOutOfBounds { index: u32, num_inputs: u32 },

    #[error("change output does not pay the vault")]
    InvalidChangeOutput,

    #[error("invalid outputs: {0}")]
    InvalidOutputs(&'static str),

    #[error("transaction must have at least one input")]
    NoInputs,

    #[error("no output pays the vault")]
    VaultOutputNotFound,

    #[error("unsupported sighash type {0:#x}")]
    UnsupportedSighashType(u32),

    #[error("script code does not match the signing key")]
    ScriptCodeMismatch,

    #[error("attested outpoint does not match session input")]
    AttestationOutpointMismatch,

    #[error("cannot cancel once inputs are signed")]
    CancelNotAllowed,

    #[error("arithmetic overflow")]
    Overflow,

    #[error("key derivation: {0}")]
    Derivation(String),
}
