use crate::{errors::SigningError, payload::SigningPayload, signature::Signature};

/// Seam to the external threshold signer.
///
/// Implementations must rebuild the digest from the payload rather than trust a
/// caller-provided one, and must start watching the payload's outpoint.
pub trait PayloadSigner {
    fn sign_payload(&self, payload: &SigningPayload) -> Result<Signature, SigningError>;
}
