//! Session records kept by the ledger.

use bitcoin::ScriptBuf;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use vault_commitment::TxShape;
use vault_primitives::{Buf32, CallerId, SessionId, TxCommit};
use vault_signing::{KeyPath, OutpointSpentAttestation, SigningPayload};

use crate::{
    errors::LedgerError,
    manifest::{InputManifest, InputSlot},
};

#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub enum SessionStatus {
    Active,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Active)
    }
}

/// State shared by withdrawal and deposit sessions.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SessionCore {
    pub session_id: SessionId,
    pub tx_commit: TxCommit,
    pub caller: CallerId,
    pub hash_prevouts: Buf32,
    pub hash_sequence: Buf32,
    pub hash_outputs: Buf32,
    pub n_version: i32,
    pub n_locktime: u32,
    pub sighash_type: u32,
    pub manifest: InputManifest,
    pub inputs_verified: bool,
    pub status: SessionStatus,
}

/// What the ledger decided about a slot write, computed before anything is applied.
#[derive(Copy, Clone, Debug)]
pub(crate) struct SlotWrite {
    pub(crate) index: u32,
    pub(crate) slot: InputSlot,
    pub(crate) verifies_manifest: bool,
}

impl SessionCore {
    pub(crate) fn new(session_id: SessionId, caller: CallerId, shape: &TxShape, num_inputs: u32) -> Self {
        Self {
            session_id,
            tx_commit: shape.tx_commit(),
            caller,
            hash_prevouts: shape.hash_prevouts,
            hash_sequence: shape.hash_sequence,
            hash_outputs: shape.hash_outputs,
            n_version: shape.n_version,
            n_locktime: shape.n_locktime,
            sighash_type: shape.sighash_type,
            manifest: InputManifest::new(num_inputs),
            inputs_verified: false,
            status: SessionStatus::Active,
        }
    }

    pub fn num_inputs(&self) -> u32 {
        self.manifest.num_inputs()
    }

    pub fn inputs_filled(&self) -> u32 {
        self.manifest.filled()
    }

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

    pub(crate) fn ensure_owner(&self, caller: &CallerId) -> Result<(), LedgerError> {
        if &self.caller != caller {
            return Err(LedgerError::NotSessionOwner);
        }
        Ok(())
    }

    pub(crate) fn ensure_active(&self) -> Result<(), LedgerError> {
        if self.status.is_terminal() {
            return Err(LedgerError::SessionNotActive(self.status));
        }
        Ok(())
    }

    /// Validates an input write against the manifest, including the commitment
    /// check if this write is the one that completes it.
    pub(crate) fn plan_slot_write(
        &self,
        index: u32,
        slot: InputSlot,
    ) -> Result<SlotWrite, LedgerError> {
        if index >= self.num_inputs() {
            return Err(LedgerError::InputIndexOutOfBounds {
                index,
                num_inputs: self.num_inputs(),
            });
        }

        self.manifest.check_write(index, &slot)?;

        let mut verifies_manifest = false;
        if !self.inputs_verified && self.manifest.completes_with(index) {
            let (hp, hs) = self
                .manifest
                .hashes_with(index, &slot)
                .ok_or(LedgerError::CommitmentMismatch)?;
            if hp != self.hash_prevouts || hs != self.hash_sequence {
                return Err(LedgerError::CommitmentMismatch);
            }
            verifies_manifest = true;
        }

        Ok(SlotWrite {
            index,
            slot,
            verifies_manifest,
        })
    }

    pub(crate) fn apply_slot_write(&mut self, write: SlotWrite) {
        self.manifest.write(write.index, write.slot);
        if write.verifies_manifest {
            self.inputs_verified = true;
        }
    }

    pub(crate) fn payload(
        &self,
        slot: &InputSlot,
        amount_sats: u64,
        script_code: ScriptBuf,
        key_path: KeyPath,
    ) -> SigningPayload {
        SigningPayload {
            tx_commit: self.tx_commit,
            hash_prevouts: self.hash_prevouts,
            hash_sequence: self.hash_sequence,
            hash_outputs: self.hash_outputs,
            n_version: self.n_version,
            n_locktime: self.n_locktime,
            sighash_type: self.sighash_type,
            outpoint_txid: slot.outpoint.txid,
            outpoint_vout: slot.outpoint.vout,
            amount_sats,
            sequence: slot.sequence,
            script_code,
            key_path,
        }
    }

    /// The attested outpoint must be the one recorded at `input_index`.
    pub(crate) fn check_attested_input(
        &self,
        attestation: &OutpointSpentAttestation,
        input_index: u32,
    ) -> Result<(), LedgerError> {
        match self.manifest.get(input_index) {
            Some(slot) if slot.outpoint == attestation.outpoint() => Ok(()),
            _ => Err(LedgerError::AttestationOutpointMismatch),
        }
    }

    pub(crate) fn matches_commitment(&self, attestation: &OutpointSpentAttestation) -> bool {
        attestation.spending_tx_commit() == &self.tx_commit
    }
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct WithdrawSession {
    pub core: SessionCore,
    pub declared_fee: u64,
    /// `sum(outputs) + declared_fee`, the most the inputs may add up to.
    pub expected_input_total: u64,
    /// `outputs[0] + declared_fee`, debited from the caller at creation.
    pub user_cost: u64,
    pub authorized_input_total: u64,
}

impl WithdrawSession {
    pub fn session_id(&self) -> &SessionId {
        &self.core.session_id
    }

    pub fn status(&self) -> SessionStatus {
        self.core.status
    }
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct DepositSession {
    pub core: SessionCore,
    /// Running total of signed input amounts, only bounded when a deposit cap is
    /// configured.
    pub signed_input_total: u64,
}

impl DepositSession {
    pub fn session_id(&self) -> &SessionId {
        &self.core.session_id
    }

    pub fn status(&self) -> SessionStatus {
        self.core.status
    }
}
