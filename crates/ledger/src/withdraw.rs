//! Withdrawal sessions: the caller spends vault UTXOs to an output of their choosing.

use tracing::*;
use vault_commitment::{compute_session_id, hash_outputs, TxShape};
use vault_primitives::{constants::SIGHASH_ALL, Buf32, CallerId, SessionId, VaultTxOut};
use vault_signing::{KeyPath, SigningPayload};

use crate::{
    errors::LedgerError,
    history::{HistoryEntry, SessionKind, SessionOutcome},
    ledger::{credit_balance, record_history, SessionLedger, SignInputRequest},
    manifest::InputSlot,
    session::{SessionCore, WithdrawSession},
    store::LedgerStore,
};

/// Arguments of [`SessionLedger::create_withdraw_session`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WithdrawRequest {
    /// `outputs[0]` pays the recipient, the optional `outputs[1]` is change back to the vault.
    pub outputs: Vec<VaultTxOut>,
    pub declared_fee: u64,
    pub hash_prevouts: Buf32,
    pub hash_sequence: Buf32,
    pub n_version: i32,
    pub n_locktime: u32,
    pub sighash_type: u32,
    pub num_inputs: u32,
}

/// Amounts derived from a withdrawal's outputs and fee.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct WithdrawAmounts {
    expected_input_total: u64,
    user_cost: u64,
}

impl<S: LedgerStore> SessionLedger<S> {
    /// Opens a withdrawal session and debits the caller's cost up front.
    ///
    /// Repeating the call with identical parameters returns the existing session
    /// without a second debit.
    pub fn create_withdraw_session(
        &self,
        caller: &CallerId,
        req: WithdrawRequest,
    ) -> Result<SessionId, LedgerError> {
        if req.sighash_type != SIGHASH_ALL {
            return Err(LedgerError::UnsupportedSighashType(req.sighash_type));
        }
        if req.num_inputs == 0 {
            return Err(LedgerError::NoInputs);
        }
        let amounts = self.check_withdraw_outputs(&req.outputs, req.declared_fee)?;

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

        if let Some(existing) = store.withdraw_session(&session_id) {
            if existing.declared_fee == req.declared_fee
                && existing.core.num_inputs() == req.num_inputs
                && !existing.core.status.is_terminal()
            {
                debug!(%session_id, "withdraw session already open");
                return Ok(session_id);
            }
            return Err(LedgerError::SessionConflict(session_id));
        }
        if store.is_session_closed(&session_id) {
            return Err(LedgerError::SessionClosed(session_id));
        }

        let available = store.balance(caller);
        if available < amounts.user_cost {
            return Err(LedgerError::InsufficientBalance {
                needed: amounts.user_cost,
                available,
            });
        }

        store.set_balance(caller, available - amounts.user_cost);
        store.put_withdraw_session(WithdrawSession {
            core: SessionCore::new(session_id, *caller, &shape, req.num_inputs),
            declared_fee: req.declared_fee,
            expected_input_total: amounts.expected_input_total,
            user_cost: amounts.user_cost,
            authorized_input_total: 0,
        });

        info!(
            %session_id,
            %caller,
            %tx_commit,
            user_cost = amounts.user_cost,
            expected_input_total = amounts.expected_input_total,
            num_inputs = req.num_inputs,
            "opened withdraw session"
        );
        Ok(session_id)
    }

    fn check_withdraw_outputs(
        &self,
        outputs: &[VaultTxOut],
        declared_fee: u64,
    ) -> Result<WithdrawAmounts, LedgerError> {
        let (recipient, change) = match outputs {
            [recipient] => (recipient, None),
            [recipient, change] => (recipient, Some(change)),
            [] => return Err(LedgerError::InvalidOutputs("no outputs")),
            _ => return Err(LedgerError::InvalidOutputs("more than two outputs")),
        };

        if recipient.value_sats() == 0 {
            return Err(LedgerError::InvalidOutputs("zero-value recipient output"));
        }
        if let Some(change) = change {
            if change.script_pubkey() != self.params.vault_script() {
                return Err(LedgerError::InvalidChangeOutput);
            }
        }

        let output_total = outputs
            .iter()
            .try_fold(0u64, |acc, o| acc.checked_add(o.value_sats()))
            .ok_or(LedgerError::Overflow)?;
        let expected_input_total = output_total
            .checked_add(declared_fee)
            .ok_or(LedgerError::Overflow)?;
        let user_cost = recipient
            .value_sats()
            .checked_add(declared_fee)
            .ok_or(LedgerError::Overflow)?;

        Ok(WithdrawAmounts {
            expected_input_total,
            user_cost,
        })
    }

    /// Authorizes one input of a withdrawal and returns the payload for the signer.
    ///
    /// Fails with [`LedgerError::InputTotalExceeded`] if the amount would push the
    /// authorized total past what the committed outputs and fee need, which is
    /// what stops a caller from inflating the fee with extra vault inputs.
    pub fn sign_withdraw_input(
        &self,
        caller: &CallerId,
        session_id: &SessionId,
        req: SignInputRequest,
    ) -> Result<SigningPayload, LedgerError> {
        let mut store = self.store.lock();
        let session = store
            .withdraw_session_mut(session_id)
            .ok_or(LedgerError::SessionNotFound(*session_id))?;

        session.core.ensure_owner(caller)?;
        session.core.ensure_active()?;
        if req.input_index >= session.core.num_inputs() {
            return Err(LedgerError::InputIndexOutOfBounds {
                index: req.input_index,
                num_inputs: session.core.num_inputs(),
            });
        }
        if &req.script_code != self.params.vault_script_code() {
            return Err(LedgerError::ScriptCodeMismatch);
        }

        let slot = InputSlot {
            outpoint: req.outpoint,
            sequence: req.sequence,
        };
        let write = session.core.plan_slot_write(req.input_index, slot)?;

        let new_total = session
            .authorized_input_total
            .checked_add(req.amount_sats)
            .ok_or(LedgerError::Overflow)?;
        if new_total > session.expected_input_total {
            return Err(LedgerError::InputTotalExceeded {
                authorized: session.authorized_input_total,
                requested: req.amount_sats,
                limit: session.expected_input_total,
            });
        }

        session.core.apply_slot_write(write);
        session.authorized_input_total = new_total;

        debug!(
            %session_id,
            index = req.input_index,
            outpoint = %req.outpoint,
            amount_sats = req.amount_sats,
            authorized = new_total,
            "authorized withdraw input"
        );
        if write.verifies_manifest {
            info!(%session_id, "withdraw input manifest verified");
        }

        Ok(session
            .core
            .payload(&slot, req.amount_sats, req.script_code, KeyPath::Vault))
    }

    /// Refunds and closes a session no input of which has been signed yet.
    pub fn cancel_withdraw_session(
        &self,
        caller: &CallerId,
        session_id: &SessionId,
    ) -> Result<u64, LedgerError> {
        let mut store = self.store.lock();
        let session = store
            .withdraw_session(session_id)
            .ok_or(LedgerError::SessionNotFound(*session_id))?;

        session.core.ensure_owner(caller)?;
        session.core.ensure_active()?;
        if session.authorized_input_total != 0 {
            return Err(LedgerError::CancelNotAllowed);
        }

        let refund = session.user_cost;
        credit_balance(&mut *store, caller, refund)?;
        store.remove_withdraw_session(session_id);
        store.mark_session_closed(*session_id);
        record_history(
            &mut *store,
            caller,
            HistoryEntry {
                session_id: *session_id,
                kind: SessionKind::Withdraw,
                outcome: SessionOutcome::Cancelled,
                amount_sats: refund,
                spending_txid: None,
            },
            self.params.history_limit(),
        );

        info!(%session_id, %caller, %refund, "cancelled withdraw session");
        Ok(refund)
    }
}
