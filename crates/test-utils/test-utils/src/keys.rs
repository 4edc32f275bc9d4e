//! Fixed test keys and the scripts derived from them.

use bitcoin::ScriptBuf;
use secp256k1::{PublicKey, SecretKey, SECP256K1};
use vault_primitives::CallerId;
use vault_signing::{derive_child_pubkey, p2wpkh_script, p2wpkh_script_code, KeyPath};

/// Root secret of the stand-in signer network.
pub fn mpc_root_secret() -> SecretKey {
    SecretKey::from_slice(&[0x11; 32]).expect("valid secret key")
}

pub fn mpc_root_pubkey() -> PublicKey {
    mpc_root_secret().public_key(SECP256K1)
}

/// Key the signer uses for attestations.
pub fn signer_secret() -> SecretKey {
    SecretKey::from_slice(&[0x22; 32]).expect("valid secret key")
}

pub fn signer_pubkey() -> PublicKey {
    signer_secret().public_key(SECP256K1)
}

pub fn caller(n: u8) -> CallerId {
    CallerId::from([n; 32])
}

pub fn vault_pubkey() -> PublicKey {
    derive_child_pubkey(&mpc_root_pubkey(), &KeyPath::Vault).expect("vault key derivation")
}

pub fn vault_script() -> ScriptBuf {
    p2wpkh_script(&vault_pubkey())
}

pub fn vault_script_code() -> ScriptBuf {
    p2wpkh_script_code(&vault_pubkey())
}

pub fn deposit_pubkey(caller: &CallerId) -> PublicKey {
    derive_child_pubkey(&mpc_root_pubkey(), &KeyPath::Caller(*caller))
        .expect("deposit key derivation")
}

pub fn deposit_script_code(caller: &CallerId) -> ScriptBuf {
    p2wpkh_script_code(&deposit_pubkey(caller))
}

/// A P2WPKH script of some unrelated key, for recipient outputs.
pub fn recipient_script() -> ScriptBuf {
    let sk = SecretKey::from_slice(&[0x77; 32]).expect("valid secret key");
    p2wpkh_script(&sk.public_key(SECP256K1))
}
