use bitcoin::{hashes::Hash, ScriptBuf, Transaction};
use vault_commitment::TxShape;
use vault_primitives::{constants::SIGHASH_ALL, Buf32, CallerId, OutpointRef, VaultTxOut};
use vault_signing::{AttestationBody, OutpointSpentAttestation};
use vault_test_utils::{
    keys::{mpc_root_pubkey, signer_pubkey, signer_secret, vault_script, vault_script_code},
    tx::{shape_of, TestInput},
};

use crate::{
    DepositRequest, LedgerParams, MemLedgerStore, SessionLedger, SignInputRequest,
    WithdrawRequest,
};

pub(crate) fn create_test_params() -> LedgerParams {
    LedgerParams::new(mpc_root_pubkey(), signer_pubkey()).unwrap()
}

pub(crate) fn create_test_ledger() -> SessionLedger<MemLedgerStore> {
    SessionLedger::new(create_test_params(), MemLedgerStore::new())
}

pub(crate) fn funded_ledger(caller: &CallerId, balance: u64) -> SessionLedger<MemLedgerStore> {
    let ledger = create_test_ledger();
    ledger.credit(caller, balance).unwrap();
    ledger
}

/// Recipient output followed by vault change.
pub(crate) fn withdraw_outputs(recipient: u64, change: u64) -> Vec<VaultTxOut> {
    vec![
        VaultTxOut::new(recipient, vault_test_utils::keys::recipient_script()),
        VaultTxOut::new(change, vault_script()),
    ]
}

pub(crate) fn withdraw_request(
    inputs: &[TestInput],
    outputs: &[VaultTxOut],
    fee: u64,
) -> WithdrawRequest {
    let shape = shape_of(inputs, outputs);
    WithdrawRequest {
        outputs: outputs.to_vec(),
        declared_fee: fee,
        hash_prevouts: shape.hash_prevouts,
        hash_sequence: shape.hash_sequence,
        n_version: shape.n_version,
        n_locktime: shape.n_locktime,
        sighash_type: SIGHASH_ALL,
        num_inputs: inputs.len() as u32,
    }
}

pub(crate) fn deposit_request(inputs: &[TestInput], outputs: &[VaultTxOut]) -> DepositRequest {
    let shape = shape_of(inputs, outputs);
    DepositRequest {
        outputs: outputs.to_vec(),
        hash_prevouts: shape.hash_prevouts,
        hash_sequence: shape.hash_sequence,
        n_version: shape.n_version,
        n_locktime: shape.n_locktime,
        sighash_type: SIGHASH_ALL,
        num_inputs: inputs.len() as u32,
    }
}

pub(crate) fn sign_request(index: u32, input: &TestInput, script_code: ScriptBuf) -> SignInputRequest {
    SignInputRequest {
        input_index: index,
        outpoint: input.outpoint_ref(),
        amount_sats: input.amount_sats,
        sequence: input.sequence,
        script_code,
    }
}

pub(crate) fn vault_sign_request(index: u32, input: &TestInput) -> SignInputRequest {
    sign_request(index, input, vault_script_code())
}

/// Attestation by the test signer that `spent` was consumed by `spending_tx`.
pub(crate) fn attest(spending_tx: &Transaction, spent: OutpointRef) -> OutpointSpentAttestation {
    let shape = TxShape::from_transaction(spending_tx);
    AttestationBody {
        outpoint_txid: spent.txid,
        outpoint_vout: spent.vout,
        spending_txid: Buf32::new(spending_tx.compute_txid().to_byte_array()),
        spending_tx_commit: shape.tx_commit(),
        block_height: 100,
        actual_outputs: spending_tx.output.iter().cloned().map(VaultTxOut::from).collect(),
    }
    .sign(&signer_secret())
    .unwrap()
}
