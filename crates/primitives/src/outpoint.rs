use std::fmt;

use arbitrary::Arbitrary;
use bitcoin::{hashes::Hash, OutPoint, Txid};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::buf::Buf32;

/// Outpoint of a bitcoin tx, with the txid kept in internal (serialization) byte order.
#[derive(
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Arbitrary,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub struct OutpointRef {
    pub txid: Buf32,
    pub vout: u32,
}

impl OutpointRef {
    pub fn new(txid: Buf32, vout: u32) -> Self {
        Self { txid, vout }
    }

    /// Txid as shown by block explorers, ie. byte-reversed hex.
    pub fn display_txid(&self) -> String {
        let mut bytes = self.txid.0;
        bytes.reverse();
        hex::encode(bytes)
    }
}

impl From<OutPoint> for OutpointRef {
    fn from(value: OutPoint) -> Self {
        Self {
            txid: Buf32::new(value.txid.to_byte_array()),
            vout: value.vout,
        }
    }
}

impl From<OutpointRef> for OutPoint {
    fn from(value: OutpointRef) -> Self {
        OutPoint {
            txid: Txid::from_byte_array(value.txid.0),
            vout: value.vout,
        }
    }
}

// Print txid in little endian like everyone else does.
impl fmt::Debug for OutpointRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutpointRef")
            .field("txid", &self.display_txid())
            .field("vout", &self.vout)
            .finish()
    }
}

impl fmt::Display for OutpointRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.display_txid(), self.vout)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_display_matches_bitcoin_outpoint() {
        let txid =
            Txid::from_str("4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b")
                .unwrap();
        let op = OutPoint { txid, vout: 3 };
        let ours = OutpointRef::from(op);
        assert_eq!(ours.to_string(), op.to_string());
        assert_eq!(OutPoint::from(ours), op);
    }
}
