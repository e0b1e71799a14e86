use {
    crate::cmd::bundle::{Bundler, phases::BundlingPhase},
    anyhow::Result,
};

/// Marks the end of the bundling process.
pub struct CompleteBundling {}

impl BundlingPhase for CompleteBundling {}

impl Bundler<'_, CompleteBundling> {
    pub fn complete_bundling(self) -> Result<()> {
        println!(
            "Entry {:?} bundled successfully into {:?}",
            self.ctx.config.entry, self.ctx.dst
        );

        Ok(())
    }
}
