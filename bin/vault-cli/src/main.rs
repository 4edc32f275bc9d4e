//! Operator tool for the vault bridge.

mod args;
mod cmd;

use std::process;

use args::Args;
use cmd::exec_subc;

fn main() {
    let args: Args = argh::from_env();
    let inner = || -> anyhow::Result<()> {
        exec_subc(args.subc)?;
        Ok(())
    };
    if let Err(e) = inner() {
        eprintln!("ERROR\n{e:?}");
        process::exit(1);
    }
}
