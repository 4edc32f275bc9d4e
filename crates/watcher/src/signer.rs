use std::sync::Arc;

use secp256k1::{Message, SecretKey, SECP256K1};
use tracing::*;
use vault_signing::{
    derive_child_secret, p2wpkh_script_code, PayloadSigner, Signature, SigningError,
    SigningPayload,
};

use crate::watcher::OutpointWatcher;

/// Single-key stand-in for the threshold signer network.
///
/// Holds the root secret all vault keys derive from and feeds every outpoint it
/// signs for into the watch engine.
#[derive(Debug)]
pub struct LocalSigner {
    root_sk: SecretKey,
    watcher: Arc<OutpointWatcher>,
}

impl LocalSigner {
    pub fn new(root_sk: SecretKey, watcher: Arc<OutpointWatcher>) -> Self {
        Self { root_sk, watcher }
    }

    pub fn watcher(&self) -> &Arc<OutpointWatcher> {
        &self.watcher
    }
}

impl PayloadSigner for LocalSigner {
    fn sign_payload(&self, payload: &SigningPayload) -> Result<Signature, SigningError> {
        payload.validate_shape()?;

        let child_sk = derive_child_secret(&self.root_sk, &payload.key_path)?;
        let child_pk = child_sk.public_key(SECP256K1);
        if p2wpkh_script_code(&child_pk) != payload.script_code {
            return Err(SigningError::ScriptCodeMismatch(payload.key_path.to_string()));
        }

        let sighash = payload.sighash()?;
        let sig = SECP256K1.sign_ecdsa_recoverable(&Message::from_digest(sighash.into_inner()), &child_sk);

        let outpoint = payload.outpoint();
        self.watcher.watch(outpoint);
        debug!(%outpoint, key_path = %payload.key_path, tx_commit = %payload.tx_commit, "signed payload");

        Ok(sig.into())
    }
}
