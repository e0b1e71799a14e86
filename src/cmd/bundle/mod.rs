mod config;
mod context;
mod graph;
mod phases;
mod source;

use {
    crate::cmd::{
        SubCmd,
        bundle::{config::Config, context::BundlerContext},
    },
    anyhow::{Context, Result},
    argh::FromArgs,
    phases::BundlingPhase,
    std::path::{Path, PathBuf},
};

/// Bundle an entry file and all of its imports into a single output file.
#[derive(FromArgs)]
#[argh(subcommand, name = "bundle")]
pub struct BundleSubCmd {
    #[argh(option, short = 'c', default = "String::from(\"jspack.toml\")")]
    /// path to the configuration file
    config: String,

    #[argh(option, short = 'o')]
    /// output directory, overrides the configured one
    out_dir: Option<String>,

    #[argh(option, short = 'n')]
    /// output file name, overrides the configured one
    filename: Option<String>,

    #[argh(positional)]
    /// entry file path, overrides the configured one
    entry: Option<String>,
}

impl SubCmd for BundleSubCmd {
    fn run(&self) -> Result<()> {
        let config = Config::resolve(
            Path::new(&self.config),
            self.entry.clone(),
            self.out_dir.clone().map(PathBuf::from),
            self.filename.clone(),
        )
        .context("failed to resolve bundler configuration")?;

        let mut ctx = BundlerContext::new(config).context("failed to create bundler context")?;

        Bundler::new(&mut ctx)?
            .build_graph()?
            .emit_bundle()?
            .complete_bundling()
    }
}

#[derive(Debug)]
struct Bundler<'a, P: BundlingPhase = phases::BuildGraph> {
    ctx: &'a mut BundlerContext,
    state: P,
}

impl<'a> Bundler<'a> {
    fn new(ctx: &'a mut BundlerContext) -> Result<Self> {
        Ok(Self {
            ctx,
            state: phases::BuildGraph {},
        })
    }
}
