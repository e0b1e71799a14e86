use {
    crate::cmd::bundle::graph::{Dependencies, ModuleRecord},
    anyhow::{Context, Result, bail},
    oxc_allocator::Allocator,
    oxc_ast::{
        Visit,
        ast::{
            BindingPatternKind,
            Declaration,
            ExportAllDeclaration,
            ExportNamedDeclaration,
            ImportDeclaration,
            ImportDeclarationSpecifier,
            ModuleExportName,
            Program,
            Statement,
        },
        visit::walk,
    },
    oxc_parser::Parser,
    oxc_span::{GetSpan, SourceType, Span},
    std::fs,
};

/// Read, parse, and lower a single file into a module record.
///
/// A missing file or a parse error is fatal; resolution of the file's
/// own specifiers is deferred to the moment they are visited.
pub fn build_module(file_path: &str) -> Result<ModuleRecord> {
    let source = fs::read_to_string(file_path)
        .context(format!("failed to read source file {file_path}"))?;

    let allocator = Allocator::default();
    let parsed = Parser::new(&allocator, &source, SourceType::default().with_module(true)).parse();
    if parsed.panicked || !parsed.errors.is_empty() {
        let reason = parsed
            .errors
            .first()
            .map(ToString::to_string)
            .unwrap_or_else(|| String::from("parser gave up"));
        bail!("failed to parse {file_path}: {reason}");
    }

    let dependencies = extract_dependencies(&parsed.program, file_path);
    let code = lower_module(&parsed.program, &source);

    Ok(ModuleRecord {
        file_path: file_path.to_string(),
        dependencies,
        code,
    })
}

/// Resolve an import specifier against the directory of the importing
/// file.
///
/// Resolution is purely textual: forward slashes only, `.` and `..`
/// segments collapsed, a `./` prefix reapplied (kept absolute when the
/// importer is absolute). No extension inference, no index-file
/// fallback, no package resolution.
pub fn resolve_specifier(importer: &str, specifier: &str) -> String {
    let absolute = importer.starts_with('/');
    let trimmed = importer.trim_start_matches("./");
    let dir = match trimmed.rfind('/') {
        Some(idx) => &trimmed[..idx],
        None => "",
    };

    let mut segments: Vec<&str> = dir
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();
    for segment in specifier.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_none_or(|s| *s == "..") {
                    segments.push("..");
                } else {
                    segments.pop();
                }
            }
            segment => segments.push(segment),
        }
    }

    let joined = segments.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        format!("./{joined}")
    }
}

/// Walk the whole program and collect every static import specifier,
/// resolved against the importing file.
///
/// Re-export declarations pull in their source module as well, since the
/// lowered code requires it at runtime. A repeated specifier silently
/// overwrites the earlier entry.
pub fn extract_dependencies(program: &Program<'_>, file_path: &str) -> Dependencies {
    let mut collector = DependencyCollector {
        file_path,
        dependencies: Dependencies::new(),
    };
    collector.visit_program(program);
    collector.dependencies
}

struct DependencyCollector<'s> {
    file_path: &'s str,
    dependencies: Dependencies,
}

impl DependencyCollector<'_> {
    fn record(&mut self, specifier: &str) {
        let resolved = resolve_specifier(self.file_path, specifier);
        self.dependencies.insert(specifier.to_string(), resolved);
    }
}

impl<'a> Visit<'a> for DependencyCollector<'_> {
    fn visit_import_declaration(&mut self, node: &ImportDeclaration<'a>) {
        self.record(node.source.value.as_str());
        walk::walk_import_declaration(self, node);
    }

    fn visit_export_named_declaration(&mut self, node: &ExportNamedDeclaration<'a>) {
        if let Some(source) = &node.source {
            self.record(source.value.as_str());
        }
        walk::walk_export_named_declaration(self, node);
    }

    fn visit_export_all_declaration(&mut self, node: &ExportAllDeclaration<'a>) {
        self.record(node.source.value.as_str());
        walk::walk_export_all_declaration(self, node);
    }
}

/// Rewrite the module's import/export syntax into `require`/`exports`
/// form, leaving all other code untouched.
///
/// The result has no module-syntax dependency and runs in any scope that
/// binds `require` and `exports`. Import bindings are hoisted in a real
/// module system, so their lowered `require` bindings are emitted at the
/// top of the body rather than in source order.
pub fn lower_module(program: &Program<'_>, source: &str) -> String {
    let mut edits: Vec<(Span, String)> = Vec::new();
    let mut prelude = String::new();
    let mut temps = 0usize;

    for stmt in &program.body {
        match stmt {
            Statement::ImportDeclaration(decl) => {
                prelude.push_str(&lower_import(decl, &mut temps));
                prelude.push('\n');
                edits.push((decl.span, String::new()));
            }
            Statement::ExportNamedDeclaration(decl) => {
                edits.extend(lower_export_named(decl, &mut temps));
            }
            Statement::ExportDefaultDeclaration(decl) => {
                // Turn the `export default` prefix into an assignment and
                // keep the declaration text as the assigned expression.
                let prefix = Span::new(decl.span.start, decl.declaration.span().start);
                edits.push((prefix, String::from("exports.default = ")));
            }
            Statement::ExportAllDeclaration(decl) => {
                let source = js_string(decl.source.value.as_str());
                let text = match &decl.exported {
                    Some(name) => {
                        format!("{} = require({source});", member("exports", export_name(name)))
                    }
                    None => format!("Object.assign(exports, require({source}));"),
                };
                edits.push((decl.span, text));
            }
            _ => {}
        }
    }

    let body = apply_edits(source, edits);
    if prelude.is_empty() {
        body
    } else {
        prelude + &body
    }
}

fn lower_import(decl: &ImportDeclaration<'_>, temps: &mut usize) -> String {
    let source = js_string(decl.source.value.as_str());

    // Bare import, executed for side effects only.
    let Some(specifiers) = &decl.specifiers else {
        return format!("require({source});");
    };
    if specifiers.is_empty() {
        return format!("require({source});");
    }

    // Require once, then derive every binding from the temporary: the
    // runtime executes a module anew on each `require` call, so a single
    // declaration must not trigger it twice.
    let temp = next_temp(temps);
    let mut out = format!("var {temp} = require({source});");
    for specifier in specifiers {
        match specifier {
            ImportDeclarationSpecifier::ImportDefaultSpecifier(default) => {
                out.push_str(&format!(" var {} = {temp}.default;", default.local.name));
            }
            ImportDeclarationSpecifier::ImportNamespaceSpecifier(namespace) => {
                out.push_str(&format!(" var {} = {temp};", namespace.local.name));
            }
            ImportDeclarationSpecifier::ImportSpecifier(named) => {
                out.push_str(&format!(
                    " var {} = {};",
                    named.local.name,
                    member(&temp, export_name(&named.imported)),
                ));
            }
        }
    }
    out
}

fn lower_export_named(decl: &ExportNamedDeclaration<'_>, temps: &mut usize) -> Vec<(Span, String)> {
    // `export <declaration>`: strip the keyword, keep the declaration,
    // then publish every bound name right after it.
    if let Some(declaration) = &decl.declaration {
        let keyword = Span::new(decl.span.start, declaration.span().start);
        let mut assignments = String::new();
        for name in declared_names(declaration) {
            assignments.push_str(&format!("\nexports.{name} = {name};"));
        }
        let end = Span::new(decl.span.end, decl.span.end);
        return vec![(keyword, String::new()), (end, assignments)];
    }

    // `export { ... }`, optionally re-exported from another module.
    let mut out = String::new();
    let temp = decl.source.as_ref().map(|source| {
        let temp = next_temp(temps);
        out.push_str(&format!(
            "var {temp} = require({}); ",
            js_string(source.value.as_str())
        ));
        temp
    });
    for specifier in &decl.specifiers {
        let local = export_name(&specifier.local);
        let value = match &temp {
            Some(temp) => member(temp, local),
            None => local.to_string(),
        };
        out.push_str(&format!(
            "{} = {value}; ",
            member("exports", export_name(&specifier.exported))
        ));
    }
    vec![(decl.span, out.trim_end().to_string())]
}

/// Names bound by a declaration, in source order.
fn declared_names(declaration: &Declaration<'_>) -> Vec<String> {
    match declaration {
        Declaration::VariableDeclaration(var) => {
            let mut names = Vec::new();
            for declarator in &var.declarations {
                collect_binding_names(&declarator.id.kind, &mut names);
            }
            names
        }
        Declaration::FunctionDeclaration(function) => {
            function.id.iter().map(|id| id.name.to_string()).collect()
        }
        Declaration::ClassDeclaration(class) => {
            class.id.iter().map(|id| id.name.to_string()).collect()
        }
        _ => Vec::new(),
    }
}

fn collect_binding_names(kind: &BindingPatternKind<'_>, names: &mut Vec<String>) {
    match kind {
        BindingPatternKind::BindingIdentifier(ident) => names.push(ident.name.to_string()),
        BindingPatternKind::ObjectPattern(object) => {
            for property in &object.properties {
                collect_binding_names(&property.value.kind, names);
            }
            if let Some(rest) = &object.rest {
                collect_binding_names(&rest.argument.kind, names);
            }
        }
        BindingPatternKind::ArrayPattern(array) => {
            for element in array.elements.iter().flatten() {
                collect_binding_names(&element.kind, names);
            }
            if let Some(rest) = &array.rest {
                collect_binding_names(&rest.argument.kind, names);
            }
        }
        BindingPatternKind::AssignmentPattern(assignment) => {
            collect_binding_names(&assignment.left.kind, names);
        }
    }
}

fn export_name<'a>(name: &'a ModuleExportName<'a>) -> &'a str {
    match name {
        ModuleExportName::IdentifierName(ident) => ident.name.as_str(),
        ModuleExportName::IdentifierReference(ident) => ident.name.as_str(),
        ModuleExportName::StringLiteral(literal) => literal.value.as_str(),
    }
}

/// Member access on `object`, using bracket syntax when the property is
/// not a plain identifier.
fn member(object: &str, property: &str) -> String {
    if is_identifier(property) {
        format!("{object}.{property}")
    } else {
        format!("{object}[{}]", js_string(property))
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn next_temp(temps: &mut usize) -> String {
    let name = format!("__dep_{temps}");
    *temps += 1;
    name
}

/// Escape a string into a double-quoted JavaScript literal.
pub fn js_string(value: &str) -> String {
    serde_json::to_string(value).expect("string serialization is infallible")
}

/// Splice replacement texts into the source. Spans must not overlap.
fn apply_edits(source: &str, mut edits: Vec<(Span, String)>) -> String {
    edits.sort_by_key(|(span, _)| (span.start, span.end));

    let mut out = String::with_capacity(source.len());
    let mut cursor = 0usize;
    for (span, text) in edits {
        out.push_str(&source[cursor..span.start as usize]);
        out.push_str(&text);
        cursor = span.end as usize;
    }
    out.push_str(&source[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_and<T>(source: &str, check: impl FnOnce(&Program<'_>) -> T) -> T {
        let allocator = Allocator::default();
        let parsed =
            Parser::new(&allocator, source, SourceType::default().with_module(true)).parse();
        assert!(parsed.errors.is_empty(), "fixture must parse cleanly");
        check(&parsed.program)
    }

    fn lower(source: &str) -> String {
        parse_and(source, |program| lower_module(program, source))
    }

    fn dependencies_of(source: &str, file_path: &str) -> Dependencies {
        parse_and(source, |program| extract_dependencies(program, file_path))
    }

    #[test]
    fn resolution_is_relative_to_importer_directory() {
        assert_eq!(resolve_specifier("a/b/c.js", "./d"), "./a/b/d");
        assert_eq!(resolve_specifier("./src/index.js", "./util.js"), "./src/util.js");
        assert_eq!(resolve_specifier("./src/index.js", "../lib/a.js"), "./lib/a.js");
        assert_eq!(resolve_specifier("index.js", "./util.js"), "./util.js");
    }

    #[test]
    fn resolution_keeps_absolute_importers_absolute() {
        assert_eq!(
            resolve_specifier("/tmp/app/index.js", "./util.js"),
            "/tmp/app/util.js"
        );
        assert_eq!(
            resolve_specifier("/tmp/app/src/index.js", "../util.js"),
            "/tmp/app/util.js"
        );
    }

    #[test]
    fn resolution_does_not_infer_extensions() {
        assert_eq!(resolve_specifier("./index.js", "./util"), "./util");
    }

    #[test]
    fn imports_are_collected_with_literal_specifiers_as_keys() {
        let deps = dependencies_of(
            "import a from \"./a.js\";\nimport { b } from \"../b.js\";\n",
            "./src/index.js",
        );

        assert_eq!(deps.get("./a.js").map(String::as_str), Some("./src/a.js"));
        assert_eq!(deps.get("../b.js").map(String::as_str), Some("./b.js"));
    }

    #[test]
    fn reexport_sources_are_collected() {
        let deps = dependencies_of(
            "export { a } from \"./a.js\";\nexport * from \"./b.js\";\n",
            "./index.js",
        );

        assert_eq!(deps.len(), 2);
        assert!(deps.contains_key("./a.js"));
        assert!(deps.contains_key("./b.js"));
    }

    #[test]
    fn repeated_specifier_overwrites_the_entry() {
        let deps = dependencies_of(
            "import a from \"./a.js\";\nimport { b } from \"./a.js\";\n",
            "./index.js",
        );

        assert_eq!(deps.len(), 1);
    }

    #[test]
    fn default_import_is_lowered_to_require() {
        let out = lower("import greet from \"./greet.js\";\ngreet();\n");

        assert!(out.contains("var __dep_0 = require(\"./greet.js\");"));
        assert!(out.contains("var greet = __dep_0.default;"));
        assert!(!out.contains("import"));
    }

    #[test]
    fn named_and_namespace_imports_are_lowered() {
        let out = lower("import { a, b as c } from \"./x.js\";\nimport * as ns from \"./y.js\";\n");

        assert!(out.contains("var a = __dep_0.a;"));
        assert!(out.contains("var c = __dep_0.b;"));
        assert!(out.contains("var ns = __dep_1;"));
    }

    #[test]
    fn bare_import_keeps_only_the_side_effect() {
        let out = lower("import \"./setup.js\";\n");

        assert!(out.contains("require(\"./setup.js\");"));
        assert!(!out.contains("import"));
        assert!(!out.contains("var "));
    }

    #[test]
    fn one_import_declaration_requires_its_module_once() {
        let out = lower("import greet, { a } from \"./x.js\";\n");

        assert_eq!(out.matches("require(").count(), 1);
        assert!(out.contains("var greet = __dep_0.default;"));
        assert!(out.contains("var a = __dep_0.a;"));
    }

    #[test]
    fn lowered_requires_are_hoisted_above_earlier_code() {
        // `f()` before the import declaration is valid in a module
        // system, since import bindings hoist.
        let out = lower("f();\nimport { f } from \"./a.js\";\n");

        let require_pos = out.find("require(\"./a.js\")").unwrap();
        let call_pos = out.find("f();").unwrap();
        assert!(require_pos < call_pos);
    }

    #[test]
    fn exported_declarations_are_published() {
        let out = lower("export const a = 1, b = 2;\nexport function f() {}\n");

        assert!(out.contains("const a = 1, b = 2;"));
        assert!(out.contains("exports.a = a;"));
        assert!(out.contains("exports.b = b;"));
        assert!(out.contains("exports.f = f;"));
        assert!(!out.contains("export "));
    }

    #[test]
    fn destructured_export_publishes_every_binding() {
        let out = lower("export const { a, b: c } = pair();\n");

        assert!(out.contains("exports.a = a;"));
        assert!(out.contains("exports.c = c;"));
    }

    #[test]
    fn default_export_becomes_an_assignment() {
        let out = lower("export default function greet() {}\n");

        assert!(out.contains("exports.default = function greet() {}"));
        assert!(!out.contains("export default"));
    }

    #[test]
    fn export_lists_and_reexports_are_lowered() {
        let out = lower("const a = 1;\nexport { a };\nexport { b } from \"./b.js\";\n");

        assert!(out.contains("exports.a = a;"));
        assert!(out.contains("var __dep_0 = require(\"./b.js\");"));
        assert!(out.contains("exports.b = __dep_0.b;"));
    }

    #[test]
    fn export_star_copies_the_source_exports() {
        let out = lower("export * from \"./all.js\";\n");

        assert!(out.contains("Object.assign(exports, require(\"./all.js\"));"));
    }

    #[test]
    fn build_module_fails_on_missing_file() {
        let err = build_module("./definitely-missing.js").unwrap_err().to_string();
        assert!(err.contains("failed to read source file"));
    }

    #[test]
    fn build_module_fails_on_syntax_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.js");
        std::fs::write(&path, "import from from;;;(").unwrap();

        let err = build_module(path.to_str().unwrap()).unwrap_err().to_string();
        assert!(err.contains("failed to parse"));
    }

    #[test]
    fn js_string_escapes_quotes() {
        assert_eq!(js_string("a\"b"), "\"a\\\"b\"");
    }
}
