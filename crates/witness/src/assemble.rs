use bitcoin::{consensus::encode::serialize, ecdsa, sighash::EcdsaSighashType, Transaction, Witness};
use secp256k1::PublicKey;
use tracing::*;

use crate::{errors::WitnessError, low_s::normalize_low_s};

/// DER-encodes `(r, low_s(s))` followed by the `SIGHASH_ALL` byte.
pub fn encode_signature(r: &[u8; 32], s: &[u8; 32]) -> Result<Vec<u8>, WitnessError> {
    let sig = ecdsa::Signature {
        signature: normalize_low_s(r, s)?,
        sighash_type: EcdsaSighashType::All,
    };
    Ok(sig.to_vec())
}

/// Builds the two-element `[sig, pubkey]` witness stack of a P2WPKH spend.
pub fn p2wpkh_witness(sig: &[u8], pubkey: &PublicKey) -> Witness {
    let mut witness = Witness::new();
    witness.push(sig);
    witness.push(pubkey.serialize());
    witness
}

/// Attaches one witness per input to a copy of the unsigned transaction.
pub fn finalize_transaction(
    unsigned: &Transaction,
    witnesses: Vec<Witness>,
) -> Result<Transaction, WitnessError> {
    if witnesses.len() != unsigned.input.len() {
        return Err(WitnessError::WitnessCountMismatch {
            expected: unsigned.input.len(),
            got: witnesses.len(),
        });
    }

    let mut tx = unsigned.clone();
    for (txin, witness) in tx.input.iter_mut().zip(witnesses) {
        txin.witness = witness;
    }

    debug!(txid = %tx.compute_txid(), inputs = tx.input.len(), "finalized transaction");
    Ok(tx)
}

/// Hex of the consensus serialization, ready for `sendrawtransaction`.
pub fn serialize_for_broadcast(tx: &Transaction) -> String {
    hex::encode(serialize(tx))
}

#[cfg(test)]
mod tests {
    use bitcoin::{
        absolute::LockTime, hashes::Hash, transaction::Version, Amount, OutPoint, ScriptBuf,
        Sequence, TxIn, TxOut, Txid,
    };
    use secp256k1::{Message, SecretKey, SECP256K1};

    use super::*;
    use crate::low_s::is_low_s;

    fn unsigned_tx(n_inputs: usize) -> Transaction {
        Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input: (0..n_inputs)
                .map(|i| TxIn {
                    previous_output: OutPoint {
                        txid: Txid::from_byte_array([i as u8; 32]),
                        vout: 0,
                    },
                    script_sig: ScriptBuf::new(),
                    sequence: Sequence::MAX,
                    witness: Witness::new(),
                })
                .collect(),
            output: vec![TxOut {
                value: Amount::from_sat(1_000),
                script_pubkey: ScriptBuf::new(),
            }],
        }
    }

    #[test]
    fn test_high_s_signature_is_normalized_and_verifies() {
        let sk = SecretKey::from_slice(&[0x5a; 32]).unwrap();
        let pk = sk.public_key(SECP256K1);
        let msg = Message::from_digest([42; 32]);

        let compact = SECP256K1.sign_ecdsa(&msg, &sk).serialize_compact();
        let r: [u8; 32] = compact[..32].try_into().unwrap();
        let low_s: [u8; 32] = compact[32..].try_into().unwrap();

        // The high-S twin, n - s.
        let high_s = SecretKey::from_slice(&low_s).unwrap().negate().secret_bytes();
        let mut twin = [0u8; 64];
        twin[..32].copy_from_slice(&r);
        twin[32..].copy_from_slice(&high_s);
        let twin = secp256k1::ecdsa::Signature::from_compact(&twin).unwrap();
        assert!(!is_low_s(&twin));

        let der = encode_signature(&r, &high_s).unwrap();
        assert_eq!(*der.last().unwrap(), 0x01);

        let parsed = ecdsa::Signature::from_slice(&der).unwrap();
        let parsed_compact = parsed.signature.serialize_compact();
        assert_eq!(&parsed_compact[32..], &low_s);
        SECP256K1
            .verify_ecdsa(&msg, &parsed.signature, &pk)
            .unwrap();
    }

    #[test]
    fn test_zero_scalar_rejected() {
        assert_eq!(
            encode_signature(&[1; 32], &[0; 32]),
            Err(WitnessError::InvalidScalar)
        );
    }

    #[test]
    fn test_witness_shape_and_finalize() {
        let sk = SecretKey::from_slice(&[7; 32]).unwrap();
        let pk = sk.public_key(SECP256K1);
        let witness = p2wpkh_witness(&[0x30, 0x01], &pk);
        assert_eq!(witness.len(), 2);
        assert_eq!(witness.nth(1).unwrap(), &pk.serialize()[..]);

        let tx = unsigned_tx(2);
        let err = finalize_transaction(&tx, vec![witness.clone()]).unwrap_err();
        assert_eq!(
            err,
            WitnessError::WitnessCountMismatch {
                expected: 2,
                got: 1
            }
        );

        let signed = finalize_transaction(&tx, vec![witness.clone(), witness]).unwrap();
        assert!(signed.input.iter().all(|i| i.witness.len() == 2));
        // Witness data does not change the txid.
        assert_eq!(signed.compute_txid(), tx.compute_txid());
        assert!(serialize_for_broadcast(&signed).len() > serialize_for_broadcast(&tx).len());
    }
}
