use thiserror::Error;
use vault_signing::SigningError;

#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("signing attestation: {0}")]
    Signing(#[from] SigningError),

    #[error("confirmation depth must be at least 1")]
    ZeroConfirmations,
}
