use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommitmentError {
    #[error("unsupported sighash type {0:#x}")]
    UnsupportedSighashType(u32),
}
