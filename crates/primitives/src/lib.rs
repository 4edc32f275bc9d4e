//! Collection of data types shared by every component of the vault bridge.

#[macro_use]
mod macros;

pub mod buf;
pub mod constants;
pub mod errors;
pub mod ids;
pub mod outpoint;
pub mod txout;

pub use buf::Buf32;
pub use errors::ParseError;
pub use ids::{CallerId, SessionId, TxCommit};
pub use outpoint::OutpointRef;
pub use txout::VaultTxOut;
