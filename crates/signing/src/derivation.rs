//! Additive key derivation from the signer network's root key.
//!
//! `epsilon = sha256("vault v1 epsilon derivation:" || predecessor || ":" || path)` and
//! `child = root + epsilon * G`. The signer holds the matching secret, so the same
//! tweak applied to the root secret yields the child secret.

use std::fmt;

use arbitrary::Arbitrary;
use bitcoin::{CompressedPublicKey, ScriptBuf};
use borsh::{BorshDeserialize, BorshSerialize};
use secp256k1::{PublicKey, Scalar, SecretKey, SECP256K1};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use vault_primitives::CallerId;

use crate::errors::SigningError;

const EPSILON_PREFIX: &str = "vault v1 epsilon derivation:";

const VAULT_PREDECESSOR: &str = "vault";
const VAULT_PATH: &str = "root";
const DEPOSIT_PATH: &str = "deposit";

/// Names which derived key signs a payload.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Arbitrary,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub enum KeyPath {
    /// The global withdrawal vault key.
    Vault,

    /// A caller's deposit key.
    Caller(CallerId),
}

impl KeyPath {
    fn derivation_string(&self) -> String {
        let (predecessor, path) = match self {
            KeyPath::Vault => (VAULT_PREDECESSOR.to_owned(), VAULT_PATH),
            KeyPath::Caller(id) => (id.to_string(), DEPOSIT_PATH),
        };
        format!("{EPSILON_PREFIX}{predecessor}:{path}")
    }

    fn epsilon(&self) -> Result<Scalar, SigningError> {
        let digest: [u8; 32] = Sha256::digest(self.derivation_string().as_bytes()).into();
        Scalar::from_be_bytes(digest).map_err(|e| SigningError::Derivation(e.to_string()))
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPath::Vault => f.write_str("vault"),
            KeyPath::Caller(id) => write!(f, "caller:{id}"),
        }
    }
}

pub fn derive_child_pubkey(root: &PublicKey, path: &KeyPath) -> Result<PublicKey, SigningError> {
    root.add_exp_tweak(SECP256K1, &path.epsilon()?)
        .map_err(|e| SigningError::Derivation(e.to_string()))
}

pub fn derive_child_secret(root: &SecretKey, path: &KeyPath) -> Result<SecretKey, SigningError> {
    root.add_tweak(&path.epsilon()?)
        .map_err(|e| SigningError::Derivation(e.to_string()))
}

/// BIP143 script code of a P2WPKH output, `OP_DUP OP_HASH160 <h160> OP_EQUALVERIFY OP_CHECKSIG`.
pub fn p2wpkh_script_code(pubkey: &PublicKey) -> ScriptBuf {
    ScriptBuf::new_p2pkh(&CompressedPublicKey(*pubkey).pubkey_hash())
}

/// `OP_0 <h160>` output script paying the key.
pub fn p2wpkh_script(pubkey: &PublicKey) -> ScriptBuf {
    ScriptBuf::new_p2wpkh(&CompressedPublicKey(*pubkey).wpubkey_hash())
}

#[cfg(test)]
mod tests {
    use vault_primitives::Buf32;

    use super::*;

    fn root() -> SecretKey {
        SecretKey::from_slice(&[0x11; 32]).unwrap()
    }

    #[test]
    fn test_public_and_secret_derivation_agree() {
        let root_sk = root();
        let root_pk = root_sk.public_key(SECP256K1);

        for path in [KeyPath::Vault, KeyPath::Caller(CallerId::from([3; 32]))] {
            let child_sk = derive_child_secret(&root_sk, &path).unwrap();
            let child_pk = derive_child_pubkey(&root_pk, &path).unwrap();
            assert_eq!(child_sk.public_key(SECP256K1), child_pk);
            assert_ne!(child_pk, root_pk);
        }
    }

    #[test]
    fn test_callers_get_distinct_keys() {
        let root_pk = root().public_key(SECP256K1);
        let a = derive_child_pubkey(&root_pk, &KeyPath::Caller(CallerId::from([1; 32]))).unwrap();
        let b = derive_child_pubkey(&root_pk, &KeyPath::Caller(CallerId::from([2; 32]))).unwrap();
        let v = derive_child_pubkey(&root_pk, &KeyPath::Vault).unwrap();
        assert_ne!(a, b);
        assert_ne!(a, v);
    }

    #[test]
    fn test_derivation_string_format() {
        let id = CallerId::from(Buf32::new([0xab; 32]));
        assert_eq!(
            KeyPath::Caller(id).derivation_string(),
            format!("vault v1 epsilon derivation:{}:deposit", "ab".repeat(32))
        );
        assert_eq!(
            KeyPath::Vault.derivation_string(),
            "vault v1 epsilon derivation:vault:root"
        );
    }

    #[test]
    fn test_scripts() {
        let pk = root().public_key(SECP256K1);
        let code = p2wpkh_script_code(&pk);
        let spk = p2wpkh_script(&pk);
        assert!(code.is_p2pkh());
        assert!(spk.is_p2wpkh());
        // Both commit to the same hash160.
        assert_eq!(&code.as_bytes()[3..23], &spk.as_bytes()[2..22]);
    }
}
