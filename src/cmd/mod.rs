pub mod bundle;

use {
    anyhow::Result,
    argh::FromArgs,
    bundle::BundleSubCmd,
};

pub trait SubCmd {
    fn run(&self) -> anyhow::Result<()>;
}

/// The jspack CLI tool.
#[derive(FromArgs)]
#[argh(help_triggers("-h", "--help", "help"))]
pub struct MainCmd {
    #[argh(subcommand)]
    nested: Cmd,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Cmd {
    Bundle(BundleSubCmd),
}

impl MainCmd {
    /// Run the nested command.
    pub fn run(&self) -> Result<()> {
        match &self.nested {
            Cmd::Bundle(bundle_cmd) => bundle_cmd.run(),
        }
    }
}
