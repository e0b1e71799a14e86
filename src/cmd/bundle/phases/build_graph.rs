use {
    crate::cmd::bundle::{
        Bundler,
        graph::DependencyGraph,
        phases::{self, BundlingPhase},
        source::build_module,
    },
    anyhow::{Context, Result},
    log::debug,
    std::collections::{HashSet, VecDeque},
    tap::Tap,
};

/// Visits the entry file and every transitively imported file, producing
/// the flat dependency graph.
#[derive(Debug, Default)]
pub struct BuildGraph {}

impl BundlingPhase for BuildGraph {}

impl<'a> Bundler<'a, BuildGraph> {
    pub fn build_graph(self) -> Result<Bundler<'a, phases::EmitBundle>> {
        let entry = self.ctx.config.entry.clone();
        println!("Bundling {entry} -> {}", self.ctx.dst.display());

        let graph = build_dependency_graph(&entry)?;
        println!("Visited {} module(s)", graph.len());

        Ok(Bundler {
            ctx: self.ctx,
            state: phases::EmitBundle { graph },
        })
    }
}

/// Worklist traversal over the import graph rooted at `entry`.
///
/// Every path is parsed and lowered exactly once: a path imported from
/// several files is skipped on later encounters, while the edge itself
/// stays recorded in each importer's dependency map. The first failure
/// aborts the whole traversal.
pub fn build_dependency_graph(entry: &str) -> Result<DependencyGraph> {
    let mut records = Vec::new();
    let mut visited = HashSet::new();
    let mut worklist = VecDeque::from([entry.to_string()]);

    while let Some(file_path) = worklist.pop_front() {
        if !visited.insert(file_path.clone()) {
            continue;
        }

        let record = build_module(&file_path)
            .context(format!("failed to build module {file_path}"))?
            .tap(|record| {
                debug!(
                    "visited {} ({} dependencies)",
                    record.file_path,
                    record.dependencies.len()
                );
            });

        for resolved in record.dependencies.values() {
            if !visited.contains(resolved) {
                worklist.push_back(resolved.clone());
            }
        }
        records.push(record);
    }

    Ok(DependencyGraph::from_records(records))
}
