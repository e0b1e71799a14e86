use {
    crate::cmd::bundle::config::Config,
    anyhow::{Result, ensure},
    std::path::{Path, PathBuf},
};

/// State shared by all bundling phases.
#[derive(Debug)]
pub struct BundlerContext {
    /// Resolved configuration.
    pub config: Config,

    /// Destination file path.
    ///
    /// The file itself is created only once the dependency graph is
    /// complete, so a failed run leaves no partial artifact behind.
    pub dst: PathBuf,
}

impl BundlerContext {
    pub fn new(config: Config) -> Result<Self> {
        // Validate the entry path early, before any work is done.
        ensure!(
            Path::new(&config.entry).exists(),
            "entry file {} not found",
            config.entry
        );

        let dst = config.output.path.join(&config.output.filename);

        Ok(Self { config, dst })
    }
}
