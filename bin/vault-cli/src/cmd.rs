//! Subcommand implementations.

use std::{env, str::FromStr, sync::Arc};

use anyhow::{anyhow, bail, Context};
use bitcoin::{consensus::encode::deserialize_hex, OutPoint, Transaction};
use bitcoind_async_client::{Auth, Client};
use secp256k1::{PublicKey, SecretKey, SECP256K1};
use tokio::sync::broadcast::error::RecvError;
use tracing::*;
use vault_commitment::{compute_session_id, TxShape};
use vault_common::logging::{self, FileLoggingConfig, LoggerConfig};
use vault_config::{LoggingConfig, VaultConfig};
use vault_ledger::LedgerParams;
use vault_primitives::{CallerId, OutpointRef};
use vault_signing::{derive_child_pubkey, p2wpkh_script, KeyPath};
use vault_watcher::{BitcoindFetcher, ChainFollower, FollowerConfig, OutpointWatcher};

use crate::args::{SubcCheckConfig, SubcDepositScript, SubcTxCommit, SubcWatch, Subcommand};

const SIGNER_KEY_ENVVAR: &str = "VAULT_SIGNER_KEY";

pub(crate) fn exec_subc(subc: Subcommand) -> anyhow::Result<()> {
    match subc {
        Subcommand::TxCommit(cmd) => exec_tx_commit(cmd),
        Subcommand::DepositScript(cmd) => exec_deposit_script(cmd),
        Subcommand::CheckConfig(cmd) => exec_check_config(cmd),
        Subcommand::Watch(cmd) => exec_watch(cmd),
    }
}

fn exec_tx_commit(cmd: SubcTxCommit) -> anyhow::Result<()> {
    let tx: Transaction = deserialize_hex(cmd.tx_hex.trim()).context("decoding transaction")?;
    let shape = TxShape::from_transaction(&tx);
    let tx_commit = shape.tx_commit();

    println!("txid:          {}", tx.compute_txid());
    println!("hashPrevouts:  {}", shape.hash_prevouts);
    println!("hashSequence:  {}", shape.hash_sequence);
    println!("hashOutputs:   {}", shape.hash_outputs);
    println!("tx_commit:     {tx_commit}");

    if let Some(caller) = cmd.caller {
        let caller = CallerId::from_str(&caller).map_err(|e| anyhow!("invalid caller id: {e}"))?;
        println!("session_id:    {}", compute_session_id(&tx_commit, &caller));
    }
    Ok(())
}

fn exec_deposit_script(cmd: SubcDepositScript) -> anyhow::Result<()> {
    let root = PublicKey::from_str(&cmd.root_pubkey).context("invalid root pubkey")?;
    let caller =
        CallerId::from_str(&cmd.caller).map_err(|e| anyhow!("invalid caller id: {e}"))?;
    let pubkey = derive_child_pubkey(&root, &KeyPath::Caller(caller))?;

    println!("pubkey: {pubkey}");
    println!("script: {}", p2wpkh_script(&pubkey).to_hex_string());
    Ok(())
}

fn exec_check_config(cmd: SubcCheckConfig) -> anyhow::Result<()> {
    let config = VaultConfig::load_from_path(&cmd.path)?;
    let params = ledger_params(&config)?;

    println!("config ok");
    println!("vault pubkey: {}", params.vault_pubkey());
    println!("vault script: {}", params.vault_script().to_hex_string());
    Ok(())
}

/// Builds ledger params, checking a configured vault key against the derived one.
fn ledger_params(config: &VaultConfig) -> anyhow::Result<LedgerParams> {
    let params = LedgerParams::new(
        config.ledger.mpc_root_pubkey()?,
        config.ledger.signer_pubkey()?,
    )?
    .with_history_limit(config.ledger.history_limit)
    .with_deposit_input_cap(config.ledger.deposit_input_cap_sats);

    if let Some(vault_pubkey) = config.ledger.vault_pubkey()? {
        if &vault_pubkey != params.vault_pubkey() {
            bail!(
                "configured vault pubkey {vault_pubkey} does not match derived {}",
                params.vault_pubkey()
            );
        }
    }
    Ok(params)
}

fn logger_config(service_name: &str, logging: &LoggingConfig) -> LoggerConfig {
    let json = logging.json_format.unwrap_or(false);
    let mut config = LoggerConfig::new(service_name.to_owned()).with_json_logging(json);
    if let Some(dir) = &logging.log_dir {
        let prefix = logging
            .log_file_prefix
            .clone()
            .unwrap_or_else(|| service_name.to_owned());
        config = config.with_file_logging(
            FileLoggingConfig::new(dir.clone(), prefix).with_json_format(json),
        );
    }
    config
}

fn load_signer_key(expected: &PublicKey) -> anyhow::Result<SecretKey> {
    let raw = env::var(SIGNER_KEY_ENVVAR).with_context(|| format!("{SIGNER_KEY_ENVVAR} not set"))?;
    let bytes = hex::decode(raw.trim()).context("signer key is not hex")?;
    let sk = SecretKey::from_slice(&bytes).context("invalid signer key")?;
    if &sk.public_key(SECP256K1) != expected {
        bail!("signer key does not match configured signer pubkey");
    }
    Ok(sk)
}

fn exec_watch(cmd: SubcWatch) -> anyhow::Result<()> {
    let config = VaultConfig::load_from_path(&cmd.config)?;
    let _guard = logging::init(logger_config("vault-watcher", &config.logging));

    let params = ledger_params(&config)?;
    let signer_sk = load_signer_key(params.signer_pubkey())?;
    let bitcoind = config
        .bitcoind
        .as_ref()
        .ok_or_else(|| anyhow!("missing [bitcoind] section"))?;

    let watcher = Arc::new(OutpointWatcher::new(signer_sk, config.watcher.confirmations)?);
    for op in &cmd.outpoint {
        let outpoint = OutPoint::from_str(op).with_context(|| format!("invalid outpoint {op}"))?;
        watcher.watch(OutpointRef::from(outpoint));
    }

    let client = Client::new(
        bitcoind.rpc_url.clone(),
        Auth::UserPass(bitcoind.rpc_user.clone(), bitcoind.rpc_password.clone()),
        None,
        None,
        None,
    )
    .map_err(|e| anyhow!("failed to create bitcoin rpc client: {e}"))?;

    let follower = ChainFollower::new(
        BitcoindFetcher::new(Arc::new(client)),
        watcher.clone(),
        cmd.start_height,
        FollowerConfig {
            poll_interval: config.watcher.poll_interval(),
            reorg_lookback: config.watcher.reorg_lookback,
        },
    );
    let mut atts = watcher.subscribe();

    tokio::runtime::Runtime::new()?.block_on(async move {
        let log_task = async {
            loop {
                match atts.recv().await {
                    Ok(att) => info!(
                        outpoint = %att.outpoint(),
                        spending_txid = %att.body.spending_txid,
                        block_height = att.body.block_height,
                        "outpoint spend attested"
                    ),
                    Err(RecvError::Lagged(n)) => warn!(%n, "attestation log lagged"),
                    Err(RecvError::Closed) => break,
                }
            }
        };

        tokio::select! {
            res = follower.run() => res,
            _ = log_task => Ok(()),
        }
    })
}
