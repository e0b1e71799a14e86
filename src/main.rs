#![doc = include_str!("../README.md")]

mod cmd;

use {
    crate::cmd::MainCmd,
    anyhow::{Context, Result},
};

fn main() -> Result<()> {
    env_logger::init();

    let cmd: MainCmd = argh::from_env();
    cmd.run().context("failed to run subcommand")
}
