//! Bounded per-caller record of closed sessions.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use vault_primitives::{Buf32, SessionId};

#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub enum SessionKind {
    Withdraw,
    Deposit,
}

#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub enum SessionOutcome {
    /// The committed transaction confirmed.
    Completed,

    /// A different transaction spent the input.  Withdrawals are refunded.
    Failed,

    /// Cancelled by the owner before any input was signed.
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub session_id: SessionId,
    pub kind: SessionKind,
    pub outcome: SessionOutcome,
    /// Withdrawals: the user cost.  Deposits: the amount credited.
    pub amount_sats: u64,
    pub spending_txid: Option<Buf32>,
}

/// Puts `entry` at the front and drops the oldest entries beyond `limit`.
pub(crate) fn push_bounded(history: &mut Vec<HistoryEntry>, entry: HistoryEntry, limit: usize) {
    history.insert(0, entry);
    history.truncate(limit);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(n: u8) -> HistoryEntry {
        HistoryEntry {
            session_id: SessionId::from([n; 32]),
            kind: SessionKind::Withdraw,
            outcome: SessionOutcome::Completed,
            amount_sats: n as u64,
            spending_txid: None,
        }
    }

    #[test]
    fn test_newest_first_and_bounded() {
        let mut h = Vec::new();
        for n in 0..7 {
            push_bounded(&mut h, entry(n), 5);
        }
        assert_eq!(h.len(), 5);
        let amounts: Vec<_> = h.iter().map(|e| e.amount_sats).collect();
        assert_eq!(amounts, vec![6, 5, 4, 3, 2]);
    }
}
