use secp256k1::ecdsa::Signature;

use crate::errors::WitnessError;

/// Parses a big-endian `(r, s)` pair, normalizing `s` to `min(s, n - s)`.
pub fn normalize_low_s(r: &[u8; 32], s: &[u8; 32]) -> Result<Signature, WitnessError> {
    if s.iter().all(|b| *b == 0) || r.iter().all(|b| *b == 0) {
        return Err(WitnessError::InvalidScalar);
    }

    let mut compact = [0u8; 64];
    compact[..32].copy_from_slice(r);
    compact[32..].copy_from_slice(s);

    let mut sig = Signature::from_compact(&compact)
        .map_err(|e| WitnessError::MalformedSignature(e.to_string()))?;
    sig.normalize_s();
    Ok(sig)
}

/// Whether `s <= n/2`, as required for relay.
pub fn is_low_s(sig: &Signature) -> bool {
    let mut normalized = *sig;
    normalized.normalize_s();
    normalized == *sig
}
