use bitcoin::ScriptBuf;
use secp256k1::PublicKey;
use vault_primitives::{constants::DEFAULT_HISTORY_LIMIT, CallerId};
use vault_signing::{derive_child_pubkey, p2wpkh_script, p2wpkh_script_code, KeyPath};

use crate::errors::LedgerError;

/// Static parameters of a ledger instance.
#[derive(Clone, Debug)]
pub struct LedgerParams {
    mpc_root_pubkey: PublicKey,
    signer_pubkey: PublicKey,
    vault_pubkey: PublicKey,
    vault_script: ScriptBuf,
    vault_script_code: ScriptBuf,
    history_limit: usize,
    deposit_input_cap_sats: Option<u64>,
}

impl LedgerParams {
    /// Derives the vault key from the signer network's root key.
    pub fn new(mpc_root_pubkey: PublicKey, signer_pubkey: PublicKey) -> Result<Self, LedgerError> {
        let vault_pubkey = derive_child_pubkey(&mpc_root_pubkey, &KeyPath::Vault)
            .map_err(|e| LedgerError::Derivation(e.to_string()))?;
        Ok(Self {
            mpc_root_pubkey,
            signer_pubkey,
            vault_pubkey,
            vault_script: p2wpkh_script(&vault_pubkey),
            vault_script_code: p2wpkh_script_code(&vault_pubkey),
            history_limit: DEFAULT_HISTORY_LIMIT,
            deposit_input_cap_sats: None,
        })
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn with_deposit_input_cap(mut self, cap_sats: Option<u64>) -> Self {
        self.deposit_input_cap_sats = cap_sats;
        self
    }

    pub fn mpc_root_pubkey(&self) -> &PublicKey {
        &self.mpc_root_pubkey
    }

    pub fn signer_pubkey(&self) -> &PublicKey {
        &self.signer_pubkey
    }

    pub fn vault_pubkey(&self) -> &PublicKey {
        &self.vault_pubkey
    }

    /// Output script every change and deposit output must pay.
    pub fn vault_script(&self) -> &ScriptBuf {
        &self.vault_script
    }

    pub fn vault_script_code(&self) -> &ScriptBuf {
        &self.vault_script_code
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    pub fn deposit_input_cap_sats(&self) -> Option<u64> {
        self.deposit_input_cap_sats
    }

    /// Script code of the key a caller's deposit inputs are locked to.
    pub fn deposit_script_code(&self, caller: &CallerId) -> Result<ScriptBuf, LedgerError> {
        let pk = derive_child_pubkey(&self.mpc_root_pubkey, &KeyPath::Caller(*caller))
            .map_err(|e| LedgerError::Derivation(e.to_string()))?;
        Ok(p2wpkh_script_code(&pk))
    }
}
