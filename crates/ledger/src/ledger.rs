use bitcoin::ScriptBuf;
use parking_lot::Mutex;
use tracing::*;
use vault_primitives::{CallerId, OutpointRef, SessionId};

use crate::{
    errors::LedgerError,
    history::{push_bounded, HistoryEntry},
    params::LedgerParams,
    session::{DepositSession, WithdrawSession},
    store::LedgerStore,
};

/// Per-input arguments of `sign_*_input`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignInputRequest {
    pub input_index: u32,
    pub outpoint: OutpointRef,
    pub amount_sats: u64,
    pub sequence: u32,
    pub script_code: ScriptBuf,
}

/// The session state machine of the host ledger.
///
/// Every operation takes the store lock once, validates against the locked state
/// and only then writes, so concurrent calls behave like a serial schedule.
#[derive(Debug)]
pub struct SessionLedger<S> {
    pub(crate) params: LedgerParams,
    pub(crate) store: Mutex<S>,
}

impl<S: LedgerStore> SessionLedger<S> {
    pub fn new(params: LedgerParams, store: S) -> Self {
        Self {
            params,
            store: Mutex::new(store),
        }
    }

    pub fn params(&self) -> &LedgerParams {
        &self.params
    }

    pub fn balance(&self, caller: &CallerId) -> u64 {
        self.store.lock().balance(caller)
    }

    /// Credits a caller's balance from outside the bridge flows.
    pub fn credit(&self, caller: &CallerId, amount_sats: u64) -> Result<u64, LedgerError> {
        let mut store = self.store.lock();
        let new_balance = credit_balance(&mut *store, caller, amount_sats)?;
        debug!(%caller, %amount_sats, %new_balance, "credited balance");
        Ok(new_balance)
    }

    /// Closed sessions of `caller`, newest first.
    pub fn history(&self, caller: &CallerId) -> Vec<HistoryEntry> {
        self.store.lock().history(caller).to_vec()
    }

    pub fn withdraw_session(&self, id: &SessionId) -> Option<WithdrawSession> {
        self.store.lock().withdraw_session(id).cloned()
    }

    pub fn deposit_session(&self, id: &SessionId) -> Option<DepositSession> {
        self.store.lock().deposit_session(id).cloned()
    }

    /// Consumes the ledger, returning the underlying store.
    pub fn into_store(self) -> S {
        self.store.into_inner()
    }
}

pub(crate) fn credit_balance<S: LedgerStore + ?Sized>(
    store: &mut S,
    caller: &CallerId,
    amount_sats: u64,
) -> Result<u64, LedgerError> {
    let new_balance = store
        .balance(caller)
        .checked_add(amount_sats)
        .ok_or(LedgerError::Overflow)?;
    store.set_balance(caller, new_balance);
    Ok(new_balance)
}

pub(crate) fn record_history<S: LedgerStore + ?Sized>(
    store: &mut S,
    caller: &CallerId,
    entry: HistoryEntry,
    limit: usize,
) {
    push_bounded(store.history_mut(caller), entry, limit);
}
