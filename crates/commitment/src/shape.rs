//! Transaction shape and the commitments derived from it.

use bitcoin::Transaction;
use sha2::{Digest, Sha256};
use vault_primitives::{
    constants::{SESSION_ID_DOMAIN, SIGHASH_ALL, TX_COMMIT_DOMAIN},
    Buf32, CallerId, OutpointRef, SessionId, TxCommit,
};

use crate::bip143::{hash_bitcoin_outputs, hash_prevouts, hash_sequence};

/// The BIP143-relevant fields of a transaction that are shared by every input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TxShape {
    pub n_version: i32,
    pub n_locktime: u32,
    pub sighash_type: u32,
    pub hash_prevouts: Buf32,
    pub hash_sequence: Buf32,
    pub hash_outputs: Buf32,
}

impl TxShape {
    /// Re-derives the shape of an observed transaction, assuming `SIGHASH_ALL`.
    pub fn from_transaction(tx: &Transaction) -> Self {
        let outpoints: Vec<OutpointRef> = tx
            .input
            .iter()
            .map(|txin| OutpointRef::from(txin.previous_output))
            .collect();
        let sequences: Vec<u32> = tx.input.iter().map(|txin| txin.sequence.0).collect();

        Self {
            n_version: tx.version.0,
            n_locktime: tx.lock_time.to_consensus_u32(),
            sighash_type: SIGHASH_ALL,
            hash_prevouts: hash_prevouts(&outpoints),
            hash_sequence: hash_sequence(&sequences),
            hash_outputs: hash_bitcoin_outputs(tx.output.iter()),
        }
    }

    pub fn tx_commit(&self) -> TxCommit {
        compute_tx_commit(
            self.n_version,
            self.n_locktime,
            self.sighash_type,
            &self.hash_prevouts,
            &self.hash_sequence,
            &self.hash_outputs,
        )
    }
}

/// `sha256(DOMAIN || nVersion || nLockTime || sighashType || hashPrevouts || hashSequence || hashOutputs)`
pub fn compute_tx_commit(
    n_version: i32,
    n_locktime: u32,
    sighash_type: u32,
    hash_prevouts: &Buf32,
    hash_sequence: &Buf32,
    hash_outputs: &Buf32,
) -> TxCommit {
    let mut hasher = Sha256::new();
    hasher.update(TX_COMMIT_DOMAIN);
    hasher.update(n_version.to_le_bytes());
    hasher.update(n_locktime.to_le_bytes());
    hasher.update(sighash_type.to_le_bytes());
    hasher.update(hash_prevouts.as_bytes());
    hasher.update(hash_sequence.as_bytes());
    hasher.update(hash_outputs.as_bytes());
    TxCommit::from(Buf32::new(hasher.finalize().into()))
}

/// `sha256(SESSION_DOMAIN || TxCommit || caller)`
pub fn compute_session_id(tx_commit: &TxCommit, caller: &CallerId) -> SessionId {
    let mut hasher = Sha256::new();
    hasher.update(SESSION_ID_DOMAIN);
    hasher.update(tx_commit.as_ref());
    hasher.update(caller.as_ref());
    SessionId::from(Buf32::new(hasher.finalize().into()))
}
