use std::io::{self, Read, Write};

use arbitrary::{Arbitrary, Unstructured};
use bitcoin::{Amount, ScriptBuf, TxOut};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::constants::MAX_SCRIPT_SIZE;

/// A wrapper around [`bitcoin::TxOut`] that implements borsh and arbitrary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultTxOut(TxOut);

impl VaultTxOut {
    pub fn new(value_sats: u64, script_pubkey: ScriptBuf) -> Self {
        Self(TxOut {
            value: Amount::from_sat(value_sats),
            script_pubkey,
        })
    }

    pub fn inner(&self) -> &TxOut {
        &self.0
    }

    pub fn value_sats(&self) -> u64 {
        self.0.value.to_sat()
    }

    pub fn script_pubkey(&self) -> &ScriptBuf {
        &self.0.script_pubkey
    }
}

impl From<TxOut> for VaultTxOut {
    fn from(value: TxOut) -> Self {
        Self(value)
    }
}

impl From<VaultTxOut> for TxOut {
    fn from(value: VaultTxOut) -> Self {
        value.0
    }
}

impl BorshSerialize for VaultTxOut {
    fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        BorshSerialize::serialize(&self.0.value.to_sat(), writer)?;

        let script_bytes = self.0.script_pubkey.as_bytes();
        BorshSerialize::serialize(&(script_bytes.len() as u64), writer)?;
        writer.write_all(script_bytes)?;

        Ok(())
    }
}

impl BorshDeserialize for VaultTxOut {
    fn deserialize_reader<R: Read>(reader: &mut R) -> io::Result<Self> {
        let value = u64::deserialize_reader(reader)?;

        let script_len = u64::deserialize_reader(reader)?;
        let script_len = usize::try_from(script_len)
            .ok()
            .filter(|len| *len <= MAX_SCRIPT_SIZE)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("script length {script_len} exceeds {MAX_SCRIPT_SIZE} bytes"),
                )
            })?;
        let mut script_bytes = vec![0u8; script_len];
        reader.read_exact(&mut script_bytes)?;

        Ok(Self::new(value, ScriptBuf::from(script_bytes)))
    }
}

impl<'a> Arbitrary<'a> for VaultTxOut {
    fn arbitrary(u: &mut Unstructured<'a>) -> arbitrary::Result<Self> {
        // Keep values in the money range so sums don't overflow in tests.
        let value = u.int_in_range(0..=21_000_000 * 100_000_000u64)?;
        let script_len = usize::arbitrary(u)? % 64;
        let script_bytes = u.bytes(script_len)?;
        Ok(Self::new(value, ScriptBuf::from(script_bytes.to_vec())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_borsh_layout() {
        let out = VaultTxOut::new(5_000, ScriptBuf::from(vec![0x00, 0x14, 0xaa]));
        let bytes = borsh::to_vec(&out).unwrap();
        assert_eq!(&bytes[..8], &5_000u64.to_le_bytes());
        assert_eq!(&bytes[8..16], &3u64.to_le_bytes());
        assert_eq!(&bytes[16..], &[0x00, 0x14, 0xaa]);

        let back: VaultTxOut = borsh::from_slice(&bytes).unwrap();
        assert_eq!(back, out);
    }

    #[test]
    fn test_oversized_script_len_rejected() {
        let mut bytes = 5_000u64.to_le_bytes().to_vec();
        bytes.extend_from_slice(&u64::MAX.to_le_bytes());
        let err = borsh::from_slice::<VaultTxOut>(&bytes).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        let mut bytes = 5_000u64.to_le_bytes().to_vec();
        bytes.extend_from_slice(&(MAX_SCRIPT_SIZE as u64 + 1).to_le_bytes());
        bytes.extend(vec![0u8; MAX_SCRIPT_SIZE + 1]);
        let err = borsh::from_slice::<VaultTxOut>(&bytes).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_max_size_script_accepted() {
        let out = VaultTxOut::new(1, ScriptBuf::from(vec![0x51; MAX_SCRIPT_SIZE]));
        let bytes = borsh::to_vec(&out).unwrap();
        let back: VaultTxOut = borsh::from_slice(&bytes).unwrap();
        assert_eq!(back.script_pubkey().len(), MAX_SCRIPT_SIZE);
    }
}
