//! Errors during parsing of primitive types.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ParseError {
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("invalid length: expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },
}
