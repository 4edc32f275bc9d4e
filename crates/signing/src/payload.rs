use bitcoin::ScriptBuf;
use serde::{Deserialize, Serialize};
use vault_commitment::{segwit_v0_sighash, InputSigData, TxShape};
use vault_primitives::{Buf32, OutpointRef, TxCommit};

use crate::{derivation::KeyPath, errors::SigningError};

/// Everything a signer needs to rebuild and check the BIP143 preimage of one input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningPayload {
    pub tx_commit: TxCommit,
    pub hash_prevouts: Buf32,
    pub hash_sequence: Buf32,
    pub hash_outputs: Buf32,
    pub n_version: i32,
    pub n_locktime: u32,
    pub sighash_type: u32,
    /// Txid in internal byte order.
    pub outpoint_txid: Buf32,
    pub outpoint_vout: u32,
    pub amount_sats: u64,
    pub sequence: u32,
    pub script_code: ScriptBuf,
    pub key_path: KeyPath,
}

impl SigningPayload {
    pub fn shape(&self) -> TxShape {
        TxShape {
            n_version: self.n_version,
            n_locktime: self.n_locktime,
            sighash_type: self.sighash_type,
            hash_prevouts: self.hash_prevouts,
            hash_sequence: self.hash_sequence,
            hash_outputs: self.hash_outputs,
        }
    }

    pub fn outpoint(&self) -> OutpointRef {
        OutpointRef::new(self.outpoint_txid, self.outpoint_vout)
    }

    /// Checks that the shape fields hash to the committed `tx_commit`.
    pub fn validate_shape(&self) -> Result<(), SigningError> {
        let got = self.shape().tx_commit();
        if got != self.tx_commit {
            return Err(SigningError::ShapeMismatch {
                expected: self.tx_commit,
                got,
            });
        }
        Ok(())
    }

    /// BIP143 digest of this input.
    pub fn sighash(&self) -> Result<Buf32, SigningError> {
        let input = InputSigData {
            outpoint: self.outpoint(),
            script_code: self.script_code.clone(),
            amount_sats: self.amount_sats,
            sequence: self.sequence,
        };
        Ok(segwit_v0_sighash(&self.shape(), &input)?)
    }
}

#[cfg(test)]
mod tests {
    use vault_commitment::compute_tx_commit;
    use vault_primitives::constants::SIGHASH_ALL;

    use super::*;

    fn payload() -> SigningPayload {
        let hp = Buf32::new([1; 32]);
        let hs = Buf32::new([2; 32]);
        let ho = Buf32::new([3; 32]);
        SigningPayload {
            tx_commit: compute_tx_commit(2, 0, SIGHASH_ALL, &hp, &hs, &ho),
            hash_prevouts: hp,
            hash_sequence: hs,
            hash_outputs: ho,
            n_version: 2,
            n_locktime: 0,
            sighash_type: SIGHASH_ALL,
            outpoint_txid: Buf32::new([9; 32]),
            outpoint_vout: 1,
            amount_sats: 10_000,
            sequence: 0xffff_fffd,
            script_code: ScriptBuf::from(vec![0x76, 0xa9]),
            key_path: KeyPath::Vault,
        }
    }

    #[test]
    fn test_validate_shape() {
        let mut p = payload();
        p.validate_shape().unwrap();

        p.hash_outputs = Buf32::new([4; 32]);
        assert!(matches!(
            p.validate_shape(),
            Err(SigningError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_sighash_binds_amount() {
        let p = payload();
        let mut q = p.clone();
        q.amount_sats += 1;
        assert_ne!(p.sighash().unwrap(), q.sighash().unwrap());
    }

    #[test]
    fn test_serde_roundtrip_keeps_key_path() {
        let p = payload();
        let json = serde_json::to_string(&p).unwrap();
        let back: SigningPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
