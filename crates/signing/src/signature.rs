use arbitrary::Arbitrary;
use borsh::{BorshDeserialize, BorshSerialize};
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use serde::{Deserialize, Serialize};

use crate::errors::SigningError;

/// A recoverable ECDSA signature as returned by the signer network.
///
/// `s` is not guaranteed to be low; the witness assembler normalizes it.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Arbitrary,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub struct Signature {
    pub r: [u8; 32],
    pub s: [u8; 32],
    pub recovery_id: u8,
}

impl Signature {
    pub fn new(r: [u8; 32], s: [u8; 32], recovery_id: u8) -> Self {
        Self { r, s, recovery_id }
    }

    pub fn compact(&self) -> [u8; 64] {
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(&self.r);
        buf[32..].copy_from_slice(&self.s);
        buf
    }

    pub fn to_recoverable(&self) -> Result<RecoverableSignature, SigningError> {
        let recovery_id = RecoveryId::from_i32(self.recovery_id as i32)
            .map_err(|_| SigningError::InvalidRecoveryId(self.recovery_id))?;
        RecoverableSignature::from_compact(&self.compact(), recovery_id)
            .map_err(|_| SigningError::MalformedSignature)
    }
}

impl From<RecoverableSignature> for Signature {
    fn from(sig: RecoverableSignature) -> Self {
        let (recovery_id, compact) = sig.serialize_compact();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&compact[..32]);
        s.copy_from_slice(&compact[32..]);
        Self {
            r,
            s,
            recovery_id: recovery_id.to_i32() as u8,
        }
    }
}
