//! Settles sessions from the signer's outpoint-spent attestations.
//!
//! Anyone may relay an attestation, since the signer's signature is what
//! authenticates it.  Balance effects always go to the session owner.

use tracing::*;
use vault_primitives::SessionId;
use vault_signing::OutpointSpentAttestation;

use crate::{
    deposit::vault_output_total,
    errors::LedgerError,
    history::{HistoryEntry, SessionKind, SessionOutcome},
    ledger::{credit_balance, record_history, SessionLedger},
    session::SessionStatus,
    store::LedgerStore,
};

impl<S: LedgerStore> SessionLedger<S> {
    /// Resolves a withdrawal against an attestation for one of its inputs.
    ///
    /// A spend by the committed transaction completes the session and the debit
    /// stays spent.  A spend by anything else refunds the user cost, but only if
    /// the manifest was verified; otherwise the signed inputs may belong to a
    /// different transaction and [`LedgerError::RefundBlocked`] is returned.
    pub fn complete_withdraw_session(
        &self,
        session_id: &SessionId,
        attestation: &OutpointSpentAttestation,
        input_index: u32,
    ) -> Result<SessionStatus, LedgerError> {
        let mut store = self.store.lock();
        let session = store
            .withdraw_session(session_id)
            .ok_or(LedgerError::SessionNotFound(*session_id))?;
        session.core.ensure_active()?;

        attestation
            .verify(self.params.signer_pubkey())
            .map_err(|_| LedgerError::InvalidSignature)?;

        session.core.check_attested_input(attestation, input_index)?;

        let owner = session.core.caller;
        let user_cost = session.user_cost;
        let spending_txid = Some(attestation.body.spending_txid);

        let (status, outcome) = if session.core.matches_commitment(attestation) {
            (SessionStatus::Completed, SessionOutcome::Completed)
        } else if session.core.inputs_verified {
            credit_balance(&mut *store, &owner, user_cost)?;
            (SessionStatus::Failed, SessionOutcome::Failed)
        } else {
            warn!(%session_id, outpoint = %attestation.outpoint(), "refund blocked on unverified manifest");
            return Err(LedgerError::RefundBlocked);
        };

        store.remove_withdraw_session(session_id);
        store.mark_session_closed(*session_id);
        record_history(
            &mut *store,
            &owner,
            HistoryEntry {
                session_id: *session_id,
                kind: SessionKind::Withdraw,
                outcome,
                amount_sats: user_cost,
                spending_txid,
            },
            self.params.history_limit(),
        );

        info!(%session_id, caller = %owner, ?status, "resolved withdraw session");
        Ok(status)
    }

    /// Claims a deposit against an attestation for one of its inputs.
    ///
    /// On a spend by the committed transaction the owner is credited with the
    /// attested outputs that pay the vault.  A foreign spend closes the session as
    /// failed without balance effect, again only once the manifest is verified.
    pub fn claim_deposit_session(
        &self,
        session_id: &SessionId,
        attestation: &OutpointSpentAttestation,
        input_index: u32,
    ) -> Result<SessionStatus, LedgerError> {
        let mut store = self.store.lock();
        let session = store
            .deposit_session(session_id)
            .ok_or(LedgerError::SessionNotFound(*session_id))?;
        session.core.ensure_active()?;

        attestation
            .verify(self.params.signer_pubkey())
            .map_err(|_| LedgerError::InvalidSignature)?;

        session.core.check_attested_input(attestation, input_index)?;

        let owner = session.core.caller;
        let txid = attestation.body.spending_txid;
        let spending_txid = Some(txid);

        let (status, outcome, credited) = if session.core.matches_commitment(attestation) {
            // Several callers may share one deposit transaction, but its vault
            // outputs are credited once.
            if store.is_spend_credited(&txid) {
                warn!(%session_id, spending_txid = %txid, "deposit spend already credited");
                return Err(LedgerError::SpendAlreadyCredited(txid));
            }
            let credited =
                vault_output_total(&attestation.body.actual_outputs, self.params.vault_script())?;
            credit_balance(&mut *store, &owner, credited)?;
            store.mark_spend_credited(txid);
            (SessionStatus::Completed, SessionOutcome::Completed, credited)
        } else if session.core.inputs_verified {
            (SessionStatus::Failed, SessionOutcome::Failed, 0)
        } else {
            warn!(%session_id, outpoint = %attestation.outpoint(), "deposit failure blocked on unverified manifest");
            return Err(LedgerError::RefundBlocked);
        };

        store.remove_deposit_session(session_id);
        store.mark_session_closed(*session_id);
        record_history(
            &mut *store,
            &owner,
            HistoryEntry {
                session_id: *session_id,
                kind: SessionKind::Deposit,
                outcome,
                amount_sats: credited,
                spending_txid,
            },
            self.params.history_limit(),
        );

        info!(%session_id, caller = %owner, ?status, %credited, "resolved deposit session");
        Ok(status)
    }
}
