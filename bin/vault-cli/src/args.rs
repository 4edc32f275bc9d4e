//! Command line arguments for the `vault-cli` binary.

use std::path::PathBuf;

use argh::FromArgs;

/// Args.
#[derive(FromArgs)]
pub(crate) struct Args {
    #[argh(subcommand)]
    pub(crate) subc: Subcommand,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand)]
pub(crate) enum Subcommand {
    TxCommit(SubcTxCommit),
    DepositScript(SubcDepositScript),
    CheckConfig(SubcCheckConfig),
    Watch(SubcWatch),
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(
    subcommand,
    name = "tx-commit",
    description = "prints the BIP143 hashes and commitment of a raw transaction"
)]
pub(crate) struct SubcTxCommit {
    #[argh(positional, description = "consensus-encoded transaction hex")]
    pub(crate) tx_hex: String,

    #[argh(option, description = "caller id, also prints the session id")]
    pub(crate) caller: Option<String>,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(
    subcommand,
    name = "deposit-script",
    description = "prints the deposit address script of a caller"
)]
pub(crate) struct SubcDepositScript {
    #[argh(option, description = "signer network root pubkey (hex)")]
    pub(crate) root_pubkey: String,

    #[argh(option, description = "caller id (hex)")]
    pub(crate) caller: String,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(
    subcommand,
    name = "check-config",
    description = "validates a config file"
)]
pub(crate) struct SubcCheckConfig {
    #[argh(positional, description = "config path")]
    pub(crate) path: PathBuf,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(
    subcommand,
    name = "watch",
    description = "follows bitcoind and logs spend attestations, reads key from envvar VAULT_SIGNER_KEY"
)]
pub(crate) struct SubcWatch {
    #[argh(positional, description = "config path")]
    pub(crate) config: PathBuf,

    #[argh(option, description = "height to start following from")]
    pub(crate) start_height: u64,

    #[argh(
        option,
        description = "outpoints to watch, as txid:vout",
        short = 'o'
    )]
    pub(crate) outpoint: Vec<String>,
}
