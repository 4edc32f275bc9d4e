//! Fixed-size record of the inputs authorized so far.

use borsh::{BorshDeserialize, BorshSerialize};
use vault_commitment::{hash_prevouts, hash_sequence};
use vault_primitives::{Buf32, OutpointRef};

use crate::errors::LedgerError;

#[derive(Copy, Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct InputSlot {
    pub outpoint: OutpointRef,
    pub sequence: u32,
}

/// Input slots of a session.
///
/// Allocated once with `num_inputs` empty slots and never resized, so a slot index
/// always corresponds to the same transaction input.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct InputManifest {
    slots: Vec<Option<InputSlot>>,
    filled: u32,
}

impl InputManifest {
    pub fn new(num_inputs: u32) -> Self {
        Self {
            slots: vec![None; num_inputs as usize],
            filled: 0,
        }
    }

    pub fn num_inputs(&self) -> u32 {
        self.slots.len() as u32
    }

    pub fn filled(&self) -> u32 {
        self.filled
    }

    pub fn is_complete(&self) -> bool {
        self.filled == self.num_inputs()
    }

    pub fn get(&self, index: u32) -> Option<&InputSlot> {
        self.slots.get(index as usize).and_then(Option::as_ref)
    }

    /// Checks a write against the slot.
    ///
    /// Returns `true` if the slot is still empty and the write would fill it.
    pub fn check_write(&self, index: u32, slot: &InputSlot) -> Result<bool, LedgerError> {
        let entry = self
            .slots
            .get(index as usize)
            .ok_or(LedgerError::InputIndexOutOfBounds {
                index,
                num_inputs: self.num_inputs(),
            })?;

        let Some(existing) = entry else {
            return Ok(true);
        };

        if existing.outpoint != slot.outpoint {
            return Err(LedgerError::OutpointMismatch {
                index,
                expected: existing.outpoint,
                got: slot.outpoint,
            });
        }
        if existing.sequence != slot.sequence {
            return Err(LedgerError::SequenceMismatch {
                index,
                expected: existing.sequence,
                got: slot.sequence,
            });
        }
        Ok(false)
    }

    /// Whether filling `index` would complete the manifest.
    pub fn completes_with(&self, index: u32) -> bool {
        self.get(index).is_none() && self.filled + 1 == self.num_inputs()
    }

    /// `(hash_prevouts, hash_sequence)` of the manifest as it would be after
    /// writing `pending` to `index`.  `None` if any other slot is still empty.
    pub fn hashes_with(&self, index: u32, pending: &InputSlot) -> Option<(Buf32, Buf32)> {
        let mut outpoints = Vec::with_capacity(self.slots.len());
        let mut sequences = Vec::with_capacity(self.slots.len());
        for (i, slot) in self.slots.iter().enumerate() {
            let slot = if i == index as usize {
                pending
            } else {
                slot.as_ref()?
            };
            outpoints.push(slot.outpoint);
            sequences.push(slot.sequence);
        }
        Some((hash_prevouts(&outpoints), hash_sequence(&sequences)))
    }

    /// Writes a slot previously accepted by [`Self::check_write`].
    pub(crate) fn write(&mut self, index: u32, slot: InputSlot) {
        let entry = &mut self.slots[index as usize];
        if entry.is_none() {
            self.filled += 1;
        }
        *entry = Some(slot);
    }
}
