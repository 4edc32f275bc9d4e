//! Identifier newtypes.

use arbitrary::Arbitrary;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::buf::Buf32;

/// Authenticated identity of a host-ledger caller.
#[derive(
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Arbitrary,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub struct CallerId(Buf32);

impl_buf_wrapper!(CallerId, Buf32, 32);

/// Commitment to the full shape of a transaction, independent of who asked to sign it.
#[derive(
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Arbitrary,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub struct TxCommit(Buf32);

impl_buf_wrapper!(TxCommit, Buf32, 32);

/// Host-ledger key for a signing session, unique per `(TxCommit, caller)`.
#[derive(
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Arbitrary,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub struct SessionId(Buf32);

impl_buf_wrapper!(SessionId, Buf32, 32);

impl CallerId {
    pub fn inner(&self) -> &Buf32 {
        &self.0
    }
}

impl TxCommit {
    pub fn inner(&self) -> &Buf32 {
        &self.0
    }
}

impl SessionId {
    pub fn inner(&self) -> &Buf32 {
        &self.0
    }
}
