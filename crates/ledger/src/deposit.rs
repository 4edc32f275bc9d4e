//! Deposit sessions: the caller sweeps UTXOs at their derived deposit key into the vault.

use bitcoin::Script;
use tracing::*;
use vault_commitment::{compute_session_id, hash_outputs, TxShape};
use vault_primitives::{constants::SIGHASH_ALL, Buf32, CallerId, SessionId, VaultTxOut};
use vault_signing::{KeyPath, SigningPayload};

use crate::{
    errors::LedgerError,
    ledger::{SessionLedger, SignInputRequest},
    manifest::InputSlot,
    session::{DepositSession, SessionCore},
    store::LedgerStore,
};

/// Arguments of [`SessionLedger::create_deposit_session`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DepositRequest {
    pub outputs: Vec<VaultTxOut>,
    pub hash_prevouts: Buf32,
    pub hash_sequence: Buf32,
    pub n_version: i32,
    pub n_locktime: u32,
    pub sighash_type: u32,
    pub num_inputs: u32,
}

impl<S: LedgerStore> SessionLedger<S> {
    /// Opens a deposit session.  Nothing is debited; the caller is credited on claim.
    pub fn create_deposit_session(
        &self,
        caller: &CallerId,
        req: DepositRequest,
    ) -> Result<SessionId, LedgerError> {
        if req.sighash_type != SIGHASH_ALL {
            return Err(LedgerError::UnsupportedSighashType(req.sighash_type));
        }
        if req.num_inputs == 0 {
            return Err(LedgerError::NoInputs);
        }
        if req.outputs.is_empty() {
            return Err(LedgerError::InvalidOutputs("no outputs"));
        }

        let vault_script = self.params.vault_script();
        if !req.outputs.iter().any(|o| o.script_pubkey() == vault_script) {
            return Err(LedgerError::VaultOutputNotFound);
        }
        let vault_value = vault_output_total(&req.outputs, vault_script)?;

        let shape = TxShape {
            n_version: req.n_version,
            n_locktime: req.n_locktime,
            sighash_type: req.sighash_type,
            hash_prevouts: req.hash_prevouts,
            hash_sequence: req.hash_sequence,
            hash_outputs: hash_outputs(&req.outputs),
        };
        let tx_commit = shape.tx_commit();
        let session_id = compute_session_id(&tx_commit, caller);

        let mut store = self.store.lock();
        if let Some(existing) = store.deposit_session(&session_id) {
            if existing.core.num_inputs() == req.num_inputs && !existing.core.status.is_terminal() {
                debug!(%session_id, "deposit session already open");
                return Ok(session_id);
            }
            return Err(LedgerError::SessionConflict(session_id));
        }
        if store.is_session_closed(&session_id) {
            return Err(LedgerError::SessionClosed(session_id));
        }

        store.put_deposit_session(DepositSession {
            core: SessionCore::new(session_id, *caller, &shape, req.num_inputs),
            signed_input_total: 0,
        });

        info!(
            %session_id,
            %caller,
            %tx_commit,
            %vault_value,
            num_inputs = req.num_inputs,
            "opened deposit session"
        );
        Ok(session_id)
    }

    /// Authorizes one deposit input.  The input must be locked to the caller's own
    /// derived deposit key.
    pub fn sign_deposit_input(
        &self,
        caller: &CallerId,
        session_id: &SessionId,
        req: SignInputRequest,
    ) -> Result<SigningPayload, LedgerError> {
        let deposit_script_code = self.params.deposit_script_code(caller)?;

        let mut store = self.store.lock();
        let session = store
            .deposit_session_mut(session_id)
            .ok_or(LedgerError::SessionNotFound(*session_id))?;

        session.core.ensure_owner(caller)?;
        session.core.ensure_active()?;
        if req.input_index >= session.core.num_inputs() {
            return Err(LedgerError::InputIndexOutOfBounds {
                index: req.input_index,
                num_inputs: session.core.num_inputs(),
            });
        }
        if req.script_code != deposit_script_code {
            return Err(LedgerError::ScriptCodeMismatch);
        }

        let slot = InputSlot {
            outpoint: req.outpoint,
            sequence: req.sequence,
        };
        let write = session.core.plan_slot_write(req.input_index, slot)?;

        let new_total = session
            .signed_input_total
            .checked_add(req.amount_sats)
            .ok_or(LedgerError::Overflow)?;
        if let Some(cap) = self.params.deposit_input_cap_sats() {
            if new_total > cap {
                return Err(LedgerError::InputTotalExceeded {
                    authorized: session.signed_input_total,
                    requested: req.amount_sats,
                    limit: cap,
                });
            }
        }

        session.core.apply_slot_write(write);
        session.signed_input_total = new_total;

        debug!(
            %session_id,
            index = req.input_index,
            outpoint = %req.outpoint,
            amount_sats = req.amount_sats,
            "authorized deposit input"
        );
        if write.verifies_manifest {
            info!(%session_id, "deposit input manifest verified");
        }

        Ok(session
            .core
            .payload(&slot, req.amount_sats, req.script_code, KeyPath::Caller(*caller)))
    }
}

/// Sum of the outputs paying `vault_script`.
pub(crate) fn vault_output_total(
    outputs: &[VaultTxOut],
    vault_script: &Script,
) -> Result<u64, LedgerError> {
    outputs
        .iter()
        .filter(|o| o.script_pubkey().as_script() == vault_script)
        .try_fold(0u64, |acc, o| acc.checked_add(o.value_sats()))
        .ok_or(LedgerError::Overflow)
}

#[cfg(test)]
mod tests {
    use vault_test_utils::{
        keys::{caller, deposit_script_code, recipient_script, vault_script, vault_script_code},
        tx::make_inputs,
    };

    use super::*;
    use crate::{
        params::LedgerParams,
        store::MemLedgerStore,
        test_utils::{create_test_ledger, create_test_params, deposit_request, sign_request},
    };

    #[test]
    fn test_requires_vault_output() {
        let alice = caller(1);
        let ledger = create_test_ledger();
        let outputs = vec![VaultTxOut::new(10_000, recipient_script())];
        assert_eq!(
            ledger.create_deposit_session(&alice, deposit_request(&make_inputs(1, 10_500), &outputs)),
            Err(LedgerError::VaultOutputNotFound)
        );
    }

    #[test]
    fn test_create_never_debits_and_is_idempotent() {
        let alice = caller(1);
        let ledger = create_test_ledger();
        let outputs = vec![VaultTxOut::new(10_000, vault_script())];
        let req = deposit_request(&make_inputs(2, 5_100), &outputs);

        let id = ledger.create_deposit_session(&alice, req.clone()).unwrap();
        assert_eq!(ledger.create_deposit_session(&alice, req), Ok(id));
        assert_eq!(ledger.balance(&alice), 0);
    }

    #[test]
    fn test_inputs_must_belong_to_caller() {
        let alice = caller(1);
        let bob = caller(2);
        let ledger = create_test_ledger();
        let inputs = make_inputs(2, 5_100);
        let outputs = vec![VaultTxOut::new(10_000, vault_script())];
        let id = ledger
            .create_deposit_session(&alice, deposit_request(&inputs, &outputs))
            .unwrap();

        for wrong in [vault_script_code(), deposit_script_code(&bob)] {
            assert_eq!(
                ledger.sign_deposit_input(&alice, &id, sign_request(0, &inputs[0], wrong)),
                Err(LedgerError::ScriptCodeMismatch)
            );
        }

        let payload = ledger
            .sign_deposit_input(&alice, &id, sign_request(0, &inputs[0], deposit_script_code(&alice)))
            .unwrap();
        assert_eq!(payload.key_path, KeyPath::Caller(alice));
        payload.validate_shape().unwrap();
    }

    #[test]
    fn test_no_accumulation_bound_by_default() {
        let alice = caller(1);
        let ledger = create_test_ledger();
        let inputs = make_inputs(2, 1_000_000);
        let outputs = vec![VaultTxOut::new(10_000, vault_script())];
        let id = ledger
            .create_deposit_session(&alice, deposit_request(&inputs, &outputs))
            .unwrap();

        for (i, input) in inputs.iter().enumerate() {
            ledger
                .sign_deposit_input(
                    &alice,
                    &id,
                    sign_request(i as u32, input, deposit_script_code(&alice)),
                )
                .unwrap();
        }
        let session = ledger.deposit_session(&id).unwrap();
        assert!(session.core.inputs_verified);
        assert_eq!(session.signed_input_total, 2_000_000);
    }

    #[test]
    fn test_configured_cap_applies() {
        let alice = caller(1);
        let params: LedgerParams = create_test_params().with_deposit_input_cap(Some(1_500_000));
        let ledger = SessionLedger::new(params, MemLedgerStore::new());
        let inputs = make_inputs(2, 1_000_000);
        let outputs = vec![VaultTxOut::new(10_000, vault_script())];
        let id = ledger
            .create_deposit_session(&alice, deposit_request(&inputs, &outputs))
            .unwrap();

        let code = deposit_script_code(&alice);
        ledger
            .sign_deposit_input(&alice, &id, sign_request(0, &inputs[0], code.clone()))
            .unwrap();
        assert_eq!(
            ledger.sign_deposit_input(&alice, &id, sign_request(1, &inputs[1], code)),
            Err(LedgerError::InputTotalExceeded {
                authorized: 1_000_000,
                requested: 1_000_000,
                limit: 1_500_000
            })
        );
    }
}
