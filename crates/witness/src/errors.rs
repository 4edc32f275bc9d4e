use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WitnessError {
    #[error("signature scalar out of range")]
    InvalidScalar,

    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    #[error("witness count mismatch (expected {expected}, got {got})")]
    WitnessCountMismatch { expected: usize, got: usize },
}
