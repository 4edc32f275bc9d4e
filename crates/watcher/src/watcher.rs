//! Outpoint watch engine.
//!
//! Tracks outpoints, never sessions.  When a block spends a watched outpoint the
//! spend is held as pending until it has the configured number of confirmations,
//! then signed and emitted exactly once.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    mem,
};

use bitcoin::{hashes::Hash, Block, Transaction};
use parking_lot::Mutex;
use secp256k1::SecretKey;
use tokio::sync::broadcast;
use tracing::*;
use vault_commitment::TxShape;
use vault_primitives::{Buf32, OutpointRef, VaultTxOut};
use vault_signing::{AttestationBody, OutpointSpentAttestation};

use crate::errors::WatcherError;

const ATTESTATION_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Default)]
struct WatchState {
    watched: HashSet<OutpointRef>,

    /// Spends seen but not yet deep enough, keyed by the height of the spending block.
    pending: BTreeMap<u64, Vec<AttestationBody>>,

    /// Everything attested so far. Kept for the lifetime of the watcher: it is
    /// what `replay_block` rebuilds from and what stops a spent outpoint from
    /// being watched again. Restarting from chain data goes through `backfill`.
    emitted: HashMap<OutpointRef, OutpointSpentAttestation>,

    tip: Option<u64>,
}

impl WatchState {
    fn is_pending(&self, outpoint: &OutpointRef) -> bool {
        self.pending
            .values()
            .flatten()
            .any(|body| &body.outpoint() == outpoint)
    }
}

#[derive(Debug)]
pub struct OutpointWatcher {
    confirmations: u32,
    signer_sk: SecretKey,
    state: Mutex<WatchState>,
    attestation_tx: broadcast::Sender<OutpointSpentAttestation>,
}

impl OutpointWatcher {
    pub fn new(signer_sk: SecretKey, confirmations: u32) -> Result<Self, WatcherError> {
        if confirmations == 0 {
            return Err(WatcherError::ZeroConfirmations);
        }
        let (attestation_tx, _) = broadcast::channel(ATTESTATION_CHANNEL_CAPACITY);
        Ok(Self {
            confirmations,
            signer_sk,
            state: Mutex::new(WatchState::default()),
            attestation_tx,
        })
    }

    pub fn confirmations(&self) -> u32 {
        self.confirmations
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OutpointSpentAttestation> {
        self.attestation_tx.subscribe()
    }

    /// Starts watching an outpoint.  Returns `false` if it was already watched,
    /// has a spend waiting for confirmations, or has already been attested.
    pub fn watch(&self, outpoint: OutpointRef) -> bool {
        let mut state = self.state.lock();
        if state.emitted.contains_key(&outpoint) || state.is_pending(&outpoint) {
            return false;
        }
        let added = state.watched.insert(outpoint);
        if added {
            trace!(%outpoint, "watching outpoint");
        }
        added
    }

    pub fn is_watched(&self, outpoint: &OutpointRef) -> bool {
        self.state.lock().watched.contains(outpoint)
    }

    pub fn num_watched(&self) -> usize {
        self.state.lock().watched.len()
    }

    pub fn num_pending(&self) -> usize {
        self.state.lock().pending.values().map(Vec::len).sum()
    }

    pub fn tip(&self) -> Option<u64> {
        self.state.lock().tip
    }

    /// Previously emitted attestation for an outpoint, if any.
    pub fn attestation_for(&self, outpoint: &OutpointRef) -> Option<OutpointSpentAttestation> {
        self.state.lock().emitted.get(outpoint).cloned()
    }

    /// Scans a block at `height` for spends of watched outpoints and emits every
    /// pending spend that reached the confirmation depth.
    pub fn process_block(
        &self,
        height: u64,
        block: &Block,
    ) -> Result<Vec<OutpointSpentAttestation>, WatcherError> {
        let mut state = self.state.lock();

        for tx in &block.txdata {
            for txin in &tx.input {
                let outpoint = OutpointRef::from(txin.previous_output);
                if !state.watched.remove(&outpoint) {
                    continue;
                }
                let body = spend_body(tx, outpoint, height);
                debug!(%outpoint, %height, spending_txid = %tx.compute_txid(), "watched outpoint spent");
                state.pending.entry(height).or_default().push(body);
            }
        }

        state.tip = Some(state.tip.map_or(height, |t| t.max(height)));
        self.emit_matured(&mut state)
    }

    /// Forgets everything above `height`.  Spends seen in reverted blocks go back
    /// to being watched.
    pub fn revert_to(&self, height: u64) {
        let mut state = self.state.lock();
        let reverted = state.pending.split_off(&height.saturating_add(1));
        for body in reverted.into_values().flatten() {
            let outpoint = body.outpoint();
            debug!(%outpoint, %height, "spend reverted, watching again");
            state.watched.insert(outpoint);
        }
        if state.tip.is_some_and(|t| t > height) {
            state.tip = Some(height);
        }
    }

    /// Rebuilds the attestations of already attested outpoints spent in `block`.
    ///
    /// Signing is deterministic, so this yields the same attestations that were
    /// emitted originally.  Nothing is broadcast.
    pub fn replay_block(
        &self,
        height: u64,
        block: &Block,
    ) -> Result<Vec<OutpointSpentAttestation>, WatcherError> {
        let state = self.state.lock();
        let mut out = Vec::new();
        for tx in &block.txdata {
            for txin in &tx.input {
                let outpoint = OutpointRef::from(txin.previous_output);
                if state.emitted.contains_key(&outpoint) {
                    out.push(spend_body(tx, outpoint, height).sign(&self.signer_sk)?);
                }
            }
        }
        Ok(out)
    }

    fn emit_matured(
        &self,
        state: &mut WatchState,
    ) -> Result<Vec<OutpointSpentAttestation>, WatcherError> {
        let Some(tip) = state.tip else {
            return Ok(Vec::new());
        };

        // `tip - h + 1 >= confirmations`, ie. `h <= tip + 1 - confirmations`.
        let Some(max_height) = tip.saturating_add(1).checked_sub(self.confirmations as u64) else {
            return Ok(Vec::new());
        };
        let still_pending = state.pending.split_off(&max_height.saturating_add(1));
        let matured = mem::replace(&mut state.pending, still_pending);

        let mut emitted = Vec::new();
        for body in matured.into_values().flatten() {
            let outpoint = body.outpoint();
            if state.emitted.contains_key(&outpoint) {
                continue;
            }
            let att = body.sign(&self.signer_sk)?;
            state.emitted.insert(outpoint, att.clone());

            info!(%outpoint, height = att.body.block_height, "attesting outpoint spend");
            // No subscribers is fine, the attestation stays available for replay.
            let _ = self.attestation_tx.send(att.clone());
            emitted.push(att);
        }
        Ok(emitted)
    }
}

fn spend_body(tx: &Transaction, outpoint: OutpointRef, height: u64) -> AttestationBody {
    AttestationBody {
        outpoint_txid: outpoint.txid,
        outpoint_vout: outpoint.vout,
        spending_txid: Buf32::new(tx.compute_txid().to_byte_array()),
        spending_tx_commit: TxShape::from_transaction(tx).tx_commit(),
        block_height: height,
        actual_outputs: tx.output.iter().cloned().map(VaultTxOut::from).collect(),
    }
}
