//! Deterministic transaction-shape commitments and BIP143 digests.
//!
//! Everything here is pure: given the same transaction fields every party (the
//! ledger, the signer and the watch engine) derives the same bytes.

pub mod bip143;
pub mod errors;
pub mod shape;

pub use bip143::{hash_outputs, hash_prevouts, hash_sequence, segwit_v0_sighash, InputSigData};
pub use errors::CommitmentError;
pub use shape::{compute_session_id, compute_tx_commit, TxShape};
