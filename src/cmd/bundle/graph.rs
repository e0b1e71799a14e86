use indexmap::IndexMap;

/// Map from the literal import specifier text, as written in the source,
/// to the resolved file path.
pub type Dependencies = IndexMap<String, String>;

/// Per-file unit of build output.
///
/// One record is produced per visited file and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct ModuleRecord {
    /// Resolved, normalized path of the file; the graph key.
    pub file_path: String,

    /// Imports declared by the file.
    pub dependencies: Dependencies,

    /// Lowered, module-syntax-free code.
    pub code: String,
}

/// A module record minus its own key.
#[derive(Debug, Clone)]
pub struct ModuleEntry {
    pub dependencies: Dependencies,
    pub code: String,
}

/// Flat map from resolved file path to the module's dependency map and
/// lowered code.
///
/// Insertion-ordered, so the rendered artifact is deterministic for a
/// given traversal order.
#[derive(Debug, Default)]
pub struct DependencyGraph(IndexMap<String, ModuleEntry>);

impl DependencyGraph {
    /// Fold module records into the flat graph, keyed by file path.
    ///
    /// A later record for the same path overwrites an earlier one.
    pub fn from_records(records: Vec<ModuleRecord>) -> Self {
        let mut graph = IndexMap::new();
        for record in records {
            graph.insert(record.file_path, ModuleEntry {
                dependencies: record.dependencies,
                code: record.code,
            });
        }
        Self(graph)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ModuleEntry)> {
        self.0.iter()
    }

    #[cfg(test)]
    pub fn contains_path(&self, file_path: &str) -> bool {
        self.0.contains_key(file_path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}
