//! Host-ledger record store.

use std::collections::{HashMap, HashSet};

use vault_primitives::{Buf32, CallerId, SessionId};

use crate::{
    history::HistoryEntry,
    session::{DepositSession, WithdrawSession},
};

/// Record store of the host ledger.
///
/// The ledger serializes access to the store, so implementations need no
/// internal locking.  Writes are applied only after an operation has fully
/// validated, which makes each operation atomic from the store's view.
pub trait LedgerStore: Send {
    fn withdraw_session(&self, id: &SessionId) -> Option<&WithdrawSession>;

    fn withdraw_session_mut(&mut self, id: &SessionId) -> Option<&mut WithdrawSession>;

    fn put_withdraw_session(&mut self, session: WithdrawSession);

    fn remove_withdraw_session(&mut self, id: &SessionId) -> Option<WithdrawSession>;

    fn deposit_session(&self, id: &SessionId) -> Option<&DepositSession>;

    fn deposit_session_mut(&mut self, id: &SessionId) -> Option<&mut DepositSession>;

    fn put_deposit_session(&mut self, session: DepositSession);

    fn remove_deposit_session(&mut self, id: &SessionId) -> Option<DepositSession>;

    fn balance(&self, caller: &CallerId) -> u64;

    fn set_balance(&mut self, caller: &CallerId, amount: u64);

    fn history(&self, caller: &CallerId) -> &[HistoryEntry];

    fn history_mut(&mut self, caller: &CallerId) -> &mut Vec<HistoryEntry>;

    /// Whether a session with this id was ever closed.  Closed ids stay closed.
    fn is_session_closed(&self, id: &SessionId) -> bool;

    fn mark_session_closed(&mut self, id: SessionId);

    /// Whether the vault outputs of this spending transaction were already
    /// credited to some deposit.
    fn is_spend_credited(&self, spending_txid: &Buf32) -> bool;

    fn mark_spend_credited(&mut self, spending_txid: Buf32);
}

#[derive(Debug, Default)]
pub struct MemLedgerStore {
    withdrawals: HashMap<SessionId, WithdrawSession>,
    deposits: HashMap<SessionId, DepositSession>,
    balances: HashMap<CallerId, u64>,
    histories: HashMap<CallerId, Vec<HistoryEntry>>,
    closed: HashSet<SessionId>,
    credited_spends: HashSet<Buf32>,
}

impl MemLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_open_sessions(&self) -> usize {
        self.withdrawals.len() + self.deposits.len()
    }
}

impl LedgerStore for MemLedgerStore {
    fn withdraw_session(&self, id: &SessionId) -> Option<&WithdrawSession> {
        self.withdrawals.get(id)
    }

    fn withdraw_session_mut(&mut self, id: &SessionId) -> Option<&mut WithdrawSession> {
        self.withdrawals.get_mut(id)
    }

    fn put_withdraw_session(&mut self, session: WithdrawSession) {
        self.withdrawals.insert(*session.session_id(), session);
    }

    fn remove_withdraw_session(&mut self, id: &SessionId) -> Option<WithdrawSession> {
        self.withdrawals.remove(id)
    }

    fn deposit_session(&self, id: &SessionId) -> Option<&DepositSession> {
        self.deposits.get(id)
    }

    fn deposit_session_mut(&mut self, id: &SessionId) -> Option<&mut DepositSession> {
        self.deposits.get_mut(id)
    }

    fn put_deposit_session(&mut self, session: DepositSession) {
        self.deposits.insert(*session.session_id(), session);
    }

    fn remove_deposit_session(&mut self, id: &SessionId) -> Option<DepositSession> {
        self.deposits.remove(id)
    }

    fn balance(&self, caller: &CallerId) -> u64 {
        self.balances.get(caller).copied().unwrap_or(0)
    }

    fn set_balance(&mut self, caller: &CallerId, amount: u64) {
        self.balances.insert(*caller, amount);
    }

    fn history(&self, caller: &CallerId) -> &[HistoryEntry] {
        self.histories.get(caller).map(Vec::as_slice).unwrap_or(&[])
    }

    fn history_mut(&mut self, caller: &CallerId) -> &mut Vec<HistoryEntry> {
        self.histories.entry(*caller).or_default()
    }

    fn is_session_closed(&self, id: &SessionId) -> bool {
        self.closed.contains(id)
    }

    fn mark_session_closed(&mut self, id: SessionId) {
        self.closed.insert(id);
    }

    fn is_spend_credited(&self, spending_txid: &Buf32) -> bool {
        self.credited_spends.contains(spending_txid)
    }

    fn mark_spend_credited(&mut self, spending_txid: Buf32) {
        self.credited_spends.insert(spending_txid);
    }
}
