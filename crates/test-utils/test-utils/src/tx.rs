//! Unsigned transaction builders.

use bitcoin::{
    absolute::LockTime, hashes::Hash, transaction::Version, OutPoint, ScriptBuf, Sequence,
    Transaction, TxIn, TxOut, Txid, Witness,
};
use vault_commitment::TxShape;
use vault_primitives::{OutpointRef, VaultTxOut};

/// An input together with the prevout amount the signer must commit to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestInput {
    pub outpoint: OutPoint,
    pub amount_sats: u64,
    pub sequence: u32,
}

impl TestInput {
    pub fn outpoint_ref(&self) -> OutpointRef {
        self.outpoint.into()
    }
}

/// `n` inputs with distinct txids, each worth `amount_sats`.
pub fn make_inputs(n: usize, amount_sats: u64) -> Vec<TestInput> {
    (0..n)
        .map(|i| {
            let mut txid = [0u8; 32];
            txid[..8].copy_from_slice(&(i as u64 + 1).to_le_bytes());
            TestInput {
                outpoint: OutPoint {
                    txid: Txid::from_byte_array(txid),
                    vout: (i % 3) as u32,
                },
                amount_sats,
                sequence: Sequence::ENABLE_RBF_NO_LOCKTIME.0,
            }
        })
        .collect()
}

pub fn txout(value_sats: u64, script_pubkey: ScriptBuf) -> VaultTxOut {
    VaultTxOut::new(value_sats, script_pubkey)
}

pub fn build_unsigned_tx(inputs: &[TestInput], outputs: &[VaultTxOut]) -> Transaction {
    Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: inputs
            .iter()
            .map(|i| TxIn {
                previous_output: i.outpoint,
                script_sig: ScriptBuf::new(),
                sequence: Sequence(i.sequence),
                witness: Witness::new(),
            })
            .collect(),
        output: outputs.iter().cloned().map(TxOut::from).collect(),
    }
}

pub fn shape_of(inputs: &[TestInput], outputs: &[VaultTxOut]) -> TxShape {
    TxShape::from_transaction(&build_unsigned_tx(inputs, outputs))
}

/// A transaction spending `outpoint` to `outputs`, unrelated to any vault session.
pub fn spend_of(outpoint: OutPoint, outputs: Vec<TxOut>) -> Transaction {
    Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: outpoint,
            script_sig: ScriptBuf::new(),
            sequence: Sequence::MAX,
            witness: Witness::new(),
        }],
        output: outputs,
    }
}
