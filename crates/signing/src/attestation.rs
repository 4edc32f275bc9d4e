//! Signed statements that a watched outpoint was spent on chain.

use arbitrary::Arbitrary;
use borsh::{BorshDeserialize, BorshSerialize};
use secp256k1::{Message, PublicKey, SecretKey, SECP256K1};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use vault_primitives::{constants::ATTESTATION_DOMAIN, Buf32, OutpointRef, TxCommit, VaultTxOut};

use crate::{errors::SigningError, signature::Signature};

/// The attested facts, signed as `sha256(DOMAIN || borsh(body))`.
#[derive(
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
pub struct AttestationBody {
    pub outpoint_txid: Buf32,
    pub outpoint_vout: u32,
    pub spending_txid: Buf32,
    pub spending_tx_commit: TxCommit,
    pub block_height: u64,
    pub actual_outputs: Vec<VaultTxOut>,
}

impl AttestationBody {
    pub fn outpoint(&self) -> OutpointRef {
        OutpointRef::new(self.outpoint_txid, self.outpoint_vout)
    }

    pub fn digest(&self) -> Result<Buf32, SigningError> {
        let encoded = borsh::to_vec(self).map_err(|e| SigningError::Encoding(e.to_string()))?;
        let mut hasher = Sha256::new();
        hasher.update(ATTESTATION_DOMAIN);
        hasher.update(&encoded);
        Ok(Buf32::new(hasher.finalize().into()))
    }

    pub fn sign(self, signer_sk: &SecretKey) -> Result<OutpointSpentAttestation, SigningError> {
        let msg = Message::from_digest(self.digest()?.into_inner());
        let sig = SECP256K1.sign_ecdsa_recoverable(&msg, signer_sk);
        Ok(OutpointSpentAttestation {
            body: self,
            signer_signature: sig.into(),
        })
    }
}

/// An attestation is about an outpoint, not a session, so one attestation can
/// resolve every session that references the outpoint.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct OutpointSpentAttestation {
    pub body: AttestationBody,
    pub signer_signature: Signature,
}

impl OutpointSpentAttestation {
    pub fn outpoint(&self) -> OutpointRef {
        self.body.outpoint()
    }

    pub fn spending_tx_commit(&self) -> &TxCommit {
        &self.body.spending_tx_commit
    }

    /// Recovers the signing key and checks it against the configured signer key.
    pub fn verify(&self, signer_pk: &PublicKey) -> Result<(), SigningError> {
        let msg = Message::from_digest(self.body.digest()?.into_inner());
        let recoverable = self.signer_signature.to_recoverable()?;
        let recovered = SECP256K1
            .recover_ecdsa(&msg, &recoverable)
            .map_err(|_| SigningError::InvalidSignature)?;

        if &recovered != signer_pk {
            return Err(SigningError::InvalidSignature);
        }
        Ok(())
    }
}
