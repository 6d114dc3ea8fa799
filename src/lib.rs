//! Convert Terraform HCL configurations into CDK for Terraform programs.
//!
//! The pipeline: parse HCL, validate the block grammar, register every
//! top-level block as a node in a dependency graph, discover cross-block
//! references, emit declarations in topological order, frame them with the
//! imports they need, and lower the result to the requested language.
//!
//! Parsing is delegated to the `hcl` crate and provider schemas are an
//! input; the crate itself performs no I/O.

pub mod ast;
pub mod emit;
pub mod error;
pub mod expr;
pub mod graph;
pub mod imports;
pub mod languages;
pub mod plan;
pub mod refs;
pub mod render;
pub mod schema;
pub mod scope;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use ast::SourceFile;
use expr::ExprCtx;
use graph::{DependencyGraph, Node, NodeKind};
use hcl::{Body, Expression};
use plan::Plan;
use scope::{NodeId, Scope};

pub use error::{ConvertError, Diagnostic, Severity};
pub use imports::CODE_MARKER;
pub use languages::Language;
pub use schema::{BindingsCache, ProviderSchemaCatalog};

/// Class name the framed program declares.
const STACK_CLASS_NAME: &str = "MyConvertedCode";

pub struct ConvertOptions<'a> {
    pub language: Language,
    pub provider_schema: &'a ProviderSchemaCatalog,
    /// Fully-qualified base class of the emitted code container.
    pub code_container: String,
    /// Fail instead of returning best-effort output when a lowering backend
    /// reports an error.
    pub throw_on_translation_error: bool,
}

impl<'a> ConvertOptions<'a> {
    pub fn new(language: Language, provider_schema: &'a ProviderSchemaCatalog) -> Self {
        Self {
            language,
            provider_schema,
            code_container: "cdktf.TerraformStack".to_string(),
            throw_on_translation_error: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub number_of_modules: usize,
    pub number_of_providers: usize,
    /// Declarations per resource type.
    pub resources: IndexMap<String, usize>,
    pub data: IndexMap<String, usize>,
    pub converted_lines: usize,
    pub language: Language,
}

#[derive(Debug, Clone)]
pub struct ConvertResult {
    /// The complete file: imports plus the framed class body.
    pub all: String,
    pub imports: String,
    pub code: String,
    /// Provider requirements actually referenced, as `source` or
    /// `source@version`.
    pub providers: Vec<String>,
    pub modules: Vec<String>,
    pub stats: Stats,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn convert(hcl_text: &str, options: &ConvertOptions<'_>) -> Result<ConvertResult, ConvertError> {
    let body: Body = hcl::from_str(hcl_text)?;
    let plan = Plan::from_body(&body)?;

    let bindings = BindingsCache::new();
    let mut scope = Scope::new(options.provider_schema, &bindings);

    // Register every node before discovering any edge, so forward
    // references still constrain ordering.
    let mut graph = DependencyGraph::new();
    register_nodes(&plan, &mut graph);
    discover_edges(&mut graph)?;

    let order = graph.emission_order()?;

    let mut ctx = ExprCtx::new(&mut scope, &graph);
    let mut stmts = Vec::new();
    if let Some((backend_type, backend_body)) =
        plan.terraform.as_ref().and_then(|t| t.backend.as_ref())
    {
        stmts.push(emit::emit_backend(backend_type, backend_body, &mut ctx)?);
    }
    for id in &order {
        let node = graph
            .node(id)
            .ok_or_else(|| ConvertError::MissingNode(id.to_string()))?;
        stmts.extend(emit::emit(node, &mut ctx)?);
    }

    if !scope.missing_schemas.is_empty() {
        let missing: Vec<&str> = scope.missing_schemas.iter().map(String::as_str).collect();
        if let Some(first) = stmts
            .iter_mut()
            .find(|s| matches!(s, ast::Stmt::NewInstance { .. }))
        {
            first.set_leading_comment(format!(
                "No schema found for: {}; attributes were translated without type information. \
                 Add the providers and run \"cdktf get\".",
                missing.join(", ")
            ));
        }
    }

    let file = SourceFile {
        imports: imports::plan_imports(&stmts, &options.code_container),
        container: options.code_container.clone(),
        class_name: STACK_CLASS_NAME.to_string(),
        stmts,
    };

    let backend = languages::get_backend(options.language);
    let lowered = backend.lower(&file);
    if options.throw_on_translation_error {
        let errors = lowered.error_messages();
        if !errors.is_empty() {
            return Err(ConvertError::Lowering {
                language: options.language.to_string(),
                diagnostics: errors,
            });
        }
    }

    let providers = referenced_providers(&plan, &graph, options.provider_schema);
    let modules = referenced_modules(&plan);
    let stats = Stats {
        number_of_modules: plan.modules.values().map(Vec::len).sum(),
        number_of_providers: providers.len(),
        resources: per_type_counts(&plan.resources),
        data: per_type_counts(&plan.data),
        converted_lines: hcl_text.lines().count(),
        language: options.language,
    };

    let mut diagnostics = scope.diagnostics;
    diagnostics.extend(lowered.diagnostics);

    Ok(ConvertResult {
        all: lowered.rendered.all,
        imports: lowered.rendered.imports,
        code: lowered.rendered.code,
        providers,
        modules,
        stats,
        diagnostics,
    })
}

/// Conversion targeted at an existing project: the declarations slot into a
/// main file at the marker line and the requirements feed the project
/// configuration.
#[derive(Debug, Clone)]
pub struct ProjectConversion {
    pub code: String,
    pub imports: String,
    pub providers: Vec<String>,
    pub modules: Vec<String>,
    pub stats: Stats,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    #[serde(default)]
    pub terraform_providers: Vec<String>,
    #[serde(default)]
    pub terraform_modules: Vec<String>,
}

impl ProjectConversion {
    /// Insert the converted declarations into a main-file template, right
    /// after the marker line, matching its indentation.
    pub fn apply_to(&self, main_file: &str) -> String {
        let Some(marker_line) = main_file.lines().find(|l| l.contains(CODE_MARKER)) else {
            let mut out = main_file.to_string();
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&self.code);
            return out;
        };
        let indent: String = marker_line
            .chars()
            .take_while(|c| c.is_whitespace())
            .collect();
        let insertion = format!(
            "{marker_line}\n{}",
            render::indent_block(&self.code, &indent)
        );
        // Only the first marker is expanded.
        main_file.replacen(&format!("{marker_line}\n"), &insertion, 1)
    }

    /// Merge the referenced providers and modules into a project
    /// configuration, keeping existing entries.
    pub fn update_config(&self, config: &mut ProjectConfig) {
        for p in &self.providers {
            if !config.terraform_providers.contains(p) {
                config.terraform_providers.push(p.clone());
            }
        }
        for m in &self.modules {
            if !config.terraform_modules.contains(m) {
                config.terraform_modules.push(m.clone());
            }
        }
    }
}

pub fn convert_project(
    hcl_text: &str,
    options: &ConvertOptions<'_>,
) -> Result<ProjectConversion, ConvertError> {
    let result = convert(hcl_text, options)?;
    Ok(ProjectConversion {
        code: result.code,
        imports: result.imports,
        providers: result.providers,
        modules: result.modules,
        stats: result.stats,
    })
}

fn register_nodes(plan: &Plan, graph: &mut DependencyGraph) {
    for (name, configs) in &plan.providers {
        for (i, config) in configs.iter().enumerate() {
            let alias = config
                .attributes()
                .find(|a| a.key() == "alias")
                .and_then(|a| match a.expr() {
                    Expression::String(s) => Some(s.clone()),
                    _ => None,
                });
            let mut id = NodeId::provider(name, alias.as_deref());
            if graph.contains(&id) {
                id = id.indexed(i);
            }
            graph.add_node(Node {
                id,
                kind: NodeKind::Provider {
                    name: name.clone(),
                    alias,
                    config: config.clone(),
                },
            });
        }
    }

    for (name, config) in &plan.variables {
        graph.add_node(Node {
            id: NodeId::variable(name),
            kind: NodeKind::Variable {
                name: name.clone(),
                config: config.clone(),
            },
        });
    }

    // Colliding locals keys are last-wins; the first occurrence keeps the
    // position.
    let mut locals: IndexMap<&str, &Expression> = IndexMap::new();
    for (name, value) in &plan.locals {
        locals.insert(name.as_str(), value);
    }
    for (name, value) in locals {
        graph.add_node(Node {
            id: NodeId::local(name),
            kind: NodeKind::Local {
                name: name.to_string(),
                value: value.clone(),
            },
        });
    }

    for (name, configs) in &plan.modules {
        for (i, config) in configs.iter().enumerate() {
            let (id, name) = if i == 0 {
                (NodeId::module(name), name.clone())
            } else {
                (NodeId::module(name).indexed(i), format!("{name}_{i}"))
            };
            graph.add_node(Node {
                id,
                kind: NodeKind::Module {
                    name,
                    config: config.clone(),
                },
            });
        }
    }

    register_typed(&plan.resources, graph, false);
    register_typed(&plan.data, graph, true);

    for (name, config) in &plan.outputs {
        graph.add_node(Node {
            id: NodeId::output(name),
            kind: NodeKind::Output {
                name: name.clone(),
                config: config.clone(),
            },
        });
    }
}

fn register_typed(
    map: &IndexMap<String, IndexMap<String, Vec<Body>>>,
    graph: &mut DependencyGraph,
    is_data: bool,
) {
    for (ty, by_name) in map {
        for (name, configs) in by_name {
            for (i, config) in configs.iter().enumerate() {
                let base = if is_data {
                    NodeId::data(ty, name)
                } else {
                    NodeId::resource(ty, name)
                };
                let (id, name) = if i == 0 {
                    (base, name.clone())
                } else {
                    (base.indexed(i), format!("{name}_{i}"))
                };
                let kind = if is_data {
                    NodeKind::Data {
                        ty: ty.clone(),
                        name,
                        config: config.clone(),
                    }
                } else {
                    NodeKind::Resource {
                        ty: ty.clone(),
                        name,
                        config: config.clone(),
                    }
                };
                graph.add_node(Node { id, kind });
            }
        }
    }
}

fn discover_edges(graph: &mut DependencyGraph) -> Result<(), ConvertError> {
    let mut edges: Vec<(NodeId, NodeId)> = Vec::new();
    for node in graph.nodes() {
        let mut found = Vec::new();
        match &node.kind {
            NodeKind::Provider { config, .. }
            | NodeKind::Variable { config, .. }
            | NodeKind::Output { config, .. }
            | NodeKind::Module { config, .. }
            | NodeKind::Resource { config, .. }
            | NodeKind::Data { config, .. } => {
                refs::collect_body_refs(config, graph, &mut found);
            }
            NodeKind::Local { value, .. } => {
                refs::collect_expr_refs(value, graph, &mut found);
            }
        }
        for referencee in found {
            edges.push((referencee, node.id.clone()));
        }
    }
    for (referencee, referencer) in edges {
        graph.add_edge(&referencee, &referencer)?;
    }
    Ok(())
}

/// Providers actually referenced, in first-use order, as
/// `source[@version]`.
fn referenced_providers(
    plan: &Plan,
    graph: &DependencyGraph,
    catalog: &ProviderSchemaCatalog,
) -> Vec<String> {
    let mut names: IndexSet<&str> = IndexSet::new();
    for node in graph.nodes() {
        match &node.kind {
            NodeKind::Provider { name, .. } => {
                names.insert(name);
            }
            NodeKind::Resource { ty, .. } => {
                names.insert(emit::provider_for_type(ty));
            }
            NodeKind::Data { ty, .. } => {
                if ty != "terraform_remote_state" {
                    names.insert(emit::provider_for_type(ty));
                }
            }
            _ => {}
        }
    }
    names
        .into_iter()
        .map(|name| {
            let req = plan.provider_requirement(name, catalog);
            match req.version {
                Some(v) => format!("{}@{v}", req.source),
                None => req.source,
            }
        })
        .collect()
}

/// Distinct module sources, as `source[@version]`.
fn referenced_modules(plan: &Plan) -> Vec<String> {
    let mut out: IndexSet<String> = IndexSet::new();
    for configs in plan.modules.values() {
        for config in configs {
            let attr = |key: &str| {
                config
                    .attributes()
                    .find(|a| a.key() == key)
                    .and_then(|a| match a.expr() {
                        Expression::String(s) => Some(s.clone()),
                        _ => None,
                    })
            };
            let Some(source) = attr("source") else {
                continue;
            };
            out.insert(match attr("version") {
                Some(v) => format!("{source}@{v}"),
                None => source,
            });
        }
    }
    out.into_iter().collect()
}

fn per_type_counts(map: &IndexMap<String, IndexMap<String, Vec<Body>>>) -> IndexMap<String, usize> {
    map.iter()
        .map(|(ty, by_name)| (ty.clone(), by_name.values().map(Vec::len).sum()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_catalog() -> ProviderSchemaCatalog {
        ProviderSchemaCatalog::default()
    }

    #[test]
    fn empty_input_produces_no_code() {
        let catalog = empty_catalog();
        let options = ConvertOptions::new(Language::TypeScript, &catalog);
        let result = convert("", &options).unwrap();
        assert!(result.code.is_empty());
        assert!(result.imports.contains("cdktf"));
        assert_eq!(result.stats.converted_lines, 0);
    }

    #[test]
    fn empty_input_with_external_container_has_no_imports() {
        let catalog = empty_catalog();
        let mut options = ConvertOptions::new(Language::TypeScript, &catalog);
        options.code_container = "my.lib.BaseStack".to_string();
        let result = convert("", &options).unwrap();
        assert!(result.code.is_empty());
        assert!(result.imports.is_empty());
    }

    #[test]
    fn conversion_is_deterministic() {
        let catalog = empty_catalog();
        let options = ConvertOptions::new(Language::TypeScript, &catalog);
        let input = r#"
        variable "r" { type = string }
        output "o" { value = var.r }
        resource "null_resource" "a" {}
        "#;
        let a = convert(input, &options).unwrap();
        let b = convert(input, &options).unwrap();
        assert_eq!(a.all, b.all);
        assert_eq!(a.providers, b.providers);
    }

    #[test]
    fn converted_lines_counts_unterminated_last_line() {
        let catalog = empty_catalog();
        let options = ConvertOptions::new(Language::TypeScript, &catalog);
        assert_eq!(
            convert("locals { a = 1 }\n", &options)
                .unwrap()
                .stats
                .converted_lines,
            1
        );
        assert_eq!(
            convert("locals { a = 1 }", &options)
                .unwrap()
                .stats
                .converted_lines,
            1
        );
    }

    #[test]
    fn duplicate_locals_are_last_wins() {
        let catalog = empty_catalog();
        let options = ConvertOptions::new(Language::TypeScript, &catalog);
        let result = convert("locals { a = 1 }\nlocals { a = 2 }", &options).unwrap();
        assert_eq!(result.code.matches("const a").count(), 1);
        assert!(result.code.contains("const a = 2;"));
    }

    #[test]
    fn project_conversion_splices_at_the_marker() {
        let catalog = empty_catalog();
        let options = ConvertOptions::new(Language::TypeScript, &catalog);
        let project = convert_project("resource \"null_resource\" \"a\" {}", &options).unwrap();
        let main = "class X {\n  constructor() {\n    // define resources here\n  }\n}\n";
        let out = project.apply_to(main);
        assert!(out.contains(
            "// define resources here\n    const a = new NullResource(this, \"a\", {});"
        ));
    }

    #[test]
    fn project_conversion_updates_requirements() {
        let catalog = empty_catalog();
        let options = ConvertOptions::new(Language::TypeScript, &catalog);
        let project = convert_project("resource \"null_resource\" \"a\" {}", &options).unwrap();
        let mut config = ProjectConfig::default();
        project.update_config(&mut config);
        assert_eq!(config.terraform_providers, vec!["hashicorp/null"]);
        // idempotent
        project.update_config(&mut config);
        assert_eq!(config.terraform_providers.len(), 1);
    }
}
