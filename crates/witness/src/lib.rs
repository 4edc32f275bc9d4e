//! Turns raw `(r, s)` signatures from the signer into broadcastable P2WPKH spends.

mod assemble;
mod errors;
mod low_s;

pub use assemble::{encode_signature, finalize_transaction, p2wpkh_witness, serialize_for_broadcast};
pub use errors::WitnessError;
pub use low_s::{is_low_s, normalize_low_s};
