//! BIP143 intermediate hashes and the per-input signature digest.

use bitcoin::{
    consensus::encode::serialize,
    hashes::{sha256d, Hash},
    OutPoint, ScriptBuf, TxOut,
};
use vault_primitives::{constants::SIGHASH_ALL, Buf32, OutpointRef, VaultTxOut};

use crate::{errors::CommitmentError, shape::TxShape};

/// Per-input fields that go into the BIP143 preimage next to the shared shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputSigData {
    pub outpoint: OutpointRef,
    pub script_code: ScriptBuf,
    pub amount_sats: u64,
    pub sequence: u32,
}

fn dsha256(data: &[u8]) -> Buf32 {
    Buf32::new(sha256d::Hash::hash(data).to_byte_array())
}

/// `dsha256` over the concatenated 36-byte outpoints, txids in internal order.
pub fn hash_prevouts(outpoints: &[OutpointRef]) -> Buf32 {
    let mut buf = Vec::with_capacity(outpoints.len() * 36);
    for op in outpoints {
        buf.extend_from_slice(&serialize(&OutPoint::from(*op)));
    }
    dsha256(&buf)
}

/// `dsha256` over the concatenated little-endian `nSequence` values.
pub fn hash_sequence(sequences: &[u32]) -> Buf32 {
    let mut buf = Vec::with_capacity(sequences.len() * 4);
    for seq in sequences {
        buf.extend_from_slice(&seq.to_le_bytes());
    }
    dsha256(&buf)
}

/// `dsha256` over the consensus-serialized outputs.
pub fn hash_outputs(outputs: &[VaultTxOut]) -> Buf32 {
    hash_bitcoin_outputs(outputs.iter().map(VaultTxOut::inner))
}

pub(crate) fn hash_bitcoin_outputs<'a>(outputs: impl Iterator<Item = &'a TxOut>) -> Buf32 {
    let mut buf = Vec::new();
    for out in outputs {
        buf.extend_from_slice(&serialize(out));
    }
    dsha256(&buf)
}

/// Computes the BIP143 signature digest of one input.
///
/// Only `SIGHASH_ALL` is supported, so the three intermediate hashes are always
/// taken from the shape as-is.
pub fn segwit_v0_sighash(shape: &TxShape, input: &InputSigData) -> Result<Buf32, CommitmentError> {
    if shape.sighash_type != SIGHASH_ALL {
        return Err(CommitmentError::UnsupportedSighashType(shape.sighash_type));
    }

    let mut preimage = Vec::with_capacity(4 + 32 * 3 + 36 + 26 + 8 + 4 + 4 + 4);
    preimage.extend_from_slice(&shape.n_version.to_le_bytes());
    preimage.extend_from_slice(shape.hash_prevouts.as_bytes());
    preimage.extend_from_slice(shape.hash_sequence.as_bytes());
    preimage.extend_from_slice(&serialize(&OutPoint::from(input.outpoint)));
    // Script serialization carries the varint length prefix.
    preimage.extend_from_slice(&serialize(&input.script_code));
    preimage.extend_from_slice(&input.amount_sats.to_le_bytes());
    preimage.extend_from_slice(&input.sequence.to_le_bytes());
    preimage.extend_from_slice(shape.hash_outputs.as_bytes());
    preimage.extend_from_slice(&shape.n_locktime.to_le_bytes());
    preimage.extend_from_slice(&shape.sighash_type.to_le_bytes());

    Ok(dsha256(&preimage))
}

#[cfg(test)]
mod tests {
    use bitcoin::{
        absolute::LockTime, hashes::Hash, sighash::SighashCache, transaction::Version, Amount,
        EcdsaSighashType, PubkeyHash, Sequence, Transaction, TxIn, Txid, Witness,
    };

    use super::*;

    fn sample_tx() -> Transaction {
        let input = |byte: u8, vout: u32, seq: u32| TxIn {
            previous_output: OutPoint {
                txid: Txid::from_byte_array([byte; 32]),
                vout,
            },
            script_sig: ScriptBuf::new(),
            sequence: Sequence(seq),
            witness: Witness::new(),
        };
        Transaction {
            version: Version::TWO,
            lock_time: LockTime::from_consensus(812_000),
            input: vec![input(0x11, 0, 0xffff_fffd), input(0x22, 7, 0xffff_fffe)],
            output: vec![
                TxOut {
                    value: Amount::from_sat(5_000),
                    script_pubkey: ScriptBuf::new_p2pkh(&PubkeyHash::from_byte_array([3; 20])),
                },
                TxOut {
                    value: Amount::from_sat(4_000),
                    script_pubkey: ScriptBuf::from(vec![0x00, 0x14]),
                },
            ],
        }
    }

    #[test]
    fn test_sighash_matches_sighash_cache() {
        let tx = sample_tx();
        let shape = TxShape::from_transaction(&tx);
        let script_code = ScriptBuf::new_p2pkh(&PubkeyHash::from_byte_array([9; 20]));

        for (idx, amount) in [(0usize, 6_000u64), (1, 4_000)] {
            let expected = SighashCache::new(&tx)
                .p2wpkh_signature_hash(
                    idx,
                    &ScriptBuf::new_p2wpkh(&bitcoin::WPubkeyHash::from_byte_array([9; 20])),
                    Amount::from_sat(amount),
                    EcdsaSighashType::All,
                )
                .unwrap();

            let txin = &tx.input[idx];
            let ours = segwit_v0_sighash(
                &shape,
                &InputSigData {
                    outpoint: txin.previous_output.into(),
                    script_code: script_code.clone(),
                    amount_sats: amount,
                    sequence: txin.sequence.0,
                },
            )
            .unwrap();

            assert_eq!(ours.into_inner(), expected.to_byte_array());
        }
    }

    #[test]
    fn test_sighash_rejects_non_all() {
        let mut shape = TxShape::from_transaction(&sample_tx());
        shape.sighash_type = 0x83;
        let input = InputSigData {
            outpoint: OutpointRef::new(Buf32::zero(), 0),
            script_code: ScriptBuf::new(),
            amount_sats: 1,
            sequence: 0,
        };
        assert_eq!(
            segwit_v0_sighash(&shape, &input),
            Err(CommitmentError::UnsupportedSighashType(0x83))
        );
    }

    #[test]
    fn test_hash_prevouts_is_order_sensitive() {
        let a = OutpointRef::new(Buf32::new([1; 32]), 0);
        let b = OutpointRef::new(Buf32::new([2; 32]), 1);
        assert_ne!(hash_prevouts(&[a, b]), hash_prevouts(&[b, a]));
    }
}
