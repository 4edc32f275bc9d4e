//! Contract between the session ledger and the external threshold signer.
//!
//! The ledger hands out [`SigningPayload`]s, never bare digests. A signer rebuilds
//! the BIP143 digest from the payload itself and answers with a [`Signature`].
//! Once a signed outpoint is spent on chain the signer reports it back with an
//! [`OutpointSpentAttestation`].

pub mod attestation;
pub mod derivation;
pub mod errors;
pub mod payload;
pub mod signature;
pub mod signer;

pub use attestation::{AttestationBody, OutpointSpentAttestation};
pub use derivation::{
    derive_child_pubkey, derive_child_secret, p2wpkh_script, p2wpkh_script_code, KeyPath,
};
pub use errors::SigningError;
pub use payload::SigningPayload;
pub use signature::Signature;
pub use signer::PayloadSigner;
