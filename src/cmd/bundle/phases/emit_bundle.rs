use {
    crate::cmd::bundle::{
        Bundler,
        graph::DependencyGraph,
        phases::{self, BundlingPhase},
        source::js_string,
    },
    anyhow::{Context, Result},
    std::{
        fs::File,
        io::{BufWriter, Write},
    },
};

/// Wraps the finished graph in the runtime loader and writes the
/// artifact.
#[derive(Debug)]
pub struct EmitBundle {
    pub graph: DependencyGraph,
}

impl BundlingPhase for EmitBundle {}

impl<'a> Bundler<'a, EmitBundle> {
    pub fn emit_bundle(self) -> Result<Bundler<'a, phases::CompleteBundling>> {
        let artifact = render_bundle(&self.state.graph, &self.ctx.config.entry)?;

        // The output directory must already exist; nothing is created
        // implicitly, and an existing artifact is overwritten.
        let file = File::create(&self.ctx.dst).context(format!(
            "failed to create output file {}",
            self.ctx.dst.display()
        ))?;
        let mut out = BufWriter::new(file);
        out.write_all(artifact.as_bytes())
            .context("failed to write bundle")?;
        out.flush().context("failed to flush bundle")?;

        Ok(Bundler {
            ctx: self.ctx,
            state: phases::CompleteBundling {},
        })
    }
}

/// The module loader embedded in every artifact.
///
/// `require` builds a fresh `exports` per call and a `localRequire` that
/// resolves specifiers through the calling module's own dependency map,
/// then invokes the module factory with those two bindings only.
const RUNTIME: &str = "  function require(filePath) {
    var module = modules[filePath];
    if (!module) {
      throw new Error(\"module not found: \" + filePath);
    }
    var exports = {};
    function localRequire(specifier) {
      return require(module.dependencies[specifier]);
    }
    module.factory(localRequire, exports);
    return exports;
  }
";

/// Render the self-executing closure over the serialized graph.
///
/// Each module is embedded as a factory function literal over
/// `(require, exports)`, so no code text is evaluated at runtime; the
/// factories are plain functions compiled when the artifact loads.
/// Execution starts by requiring the entry path.
pub fn render_bundle(graph: &DependencyGraph, entry: &str) -> Result<String> {
    let mut out = String::from("(function(modules) {\n");
    out.push_str(RUNTIME);
    out.push_str(&format!("  require({});\n", js_string(entry)));
    out.push_str("})({\n");

    for (file_path, module) in graph.iter() {
        let dependencies = serde_json::to_string(&module.dependencies)
            .context(format!("failed to serialize dependency map of {file_path}"))?;
        out.push_str(&format!(
            "  {}: {{\n    factory: function(require, exports) {{\n{}\n    }},\n    dependencies: {},\n  }},\n",
            js_string(file_path),
            module.code,
            dependencies,
        ));
    }

    out.push_str("});\n");
    Ok(out)
}
