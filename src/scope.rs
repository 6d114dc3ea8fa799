//! Per-conversion workspace: node ids, emitted identifiers, diagnostics.

use indexmap::{IndexMap, IndexSet};
use std::fmt;

use crate::error::Diagnostic;
use crate::schema::{BindingsCache, ProviderSchemaCatalog};

/// Stable identity of a top-level block: `<kind>.<name>[.<index>]`, e.g.
/// `resource.aws_vpc.main`, `var.region`, `out.url`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeId(String);

impl NodeId {
    pub fn provider(name: &str, alias: Option<&str>) -> Self {
        match alias {
            Some(a) => Self(format!("provider.{name}.{a}")),
            None => Self(format!("provider.{name}")),
        }
    }

    pub fn variable(name: &str) -> Self {
        Self(format!("var.{name}"))
    }

    pub fn local(name: &str) -> Self {
        Self(format!("local.{name}"))
    }

    pub fn output(name: &str) -> Self {
        Self(format!("out.{name}"))
    }

    pub fn module(name: &str) -> Self {
        Self(format!("module.{name}"))
    }

    pub fn resource(ty: &str, name: &str) -> Self {
        Self(format!("resource.{ty}.{name}"))
    }

    pub fn data(ty: &str, name: &str) -> Self {
        Self(format!("data.{ty}.{name}"))
    }

    /// Extra configurations of the same block get an index suffix.
    pub fn indexed(&self, index: usize) -> Self {
        Self(format!("{}.{index}", self.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Workspace for a single conversion. Nothing in here outlives the call.
pub struct Scope<'a> {
    pub catalog: &'a ProviderSchemaCatalog,
    pub bindings: &'a BindingsCache,
    /// Identifiers already used in the emitted program.
    constructs: IndexSet<String>,
    /// Logical node id -> emitted identifier.
    variables: IndexMap<NodeId, String>,
    pub has_token_coercion: bool,
    pub diagnostics: Vec<Diagnostic>,
    /// Providers referenced by the input but absent from the catalog.
    pub missing_schemas: IndexSet<String>,
}

impl<'a> Scope<'a> {
    pub fn new(catalog: &'a ProviderSchemaCatalog, bindings: &'a BindingsCache) -> Self {
        Self {
            catalog,
            bindings,
            constructs: IndexSet::new(),
            variables: IndexMap::new(),
            has_token_coercion: false,
            diagnostics: Vec::new(),
            missing_schemas: IndexSet::new(),
        }
    }

    /// The emitted identifier for a node, allocated on first use and stable
    /// afterwards. Collisions get `_1`, `_2`, ... in registration order.
    pub fn identifier_for(&mut self, id: &NodeId, preferred: &str) -> String {
        if let Some(existing) = self.variables.get(id) {
            return existing.clone();
        }
        let base = sanitize_identifier(preferred);
        let mut candidate = base.clone();
        let mut n = 0;
        while !self.constructs.insert(candidate.clone()) {
            n += 1;
            candidate = format!("{base}_{n}");
        }
        self.variables.insert(id.clone(), candidate.clone());
        candidate
    }

    /// Identifier for an already-registered node, if any.
    pub fn lookup_identifier(&self, id: &NodeId) -> Option<&str> {
        self.variables.get(id).map(String::as_str)
    }

    pub fn mark_token_coercion(&mut self) {
        self.has_token_coercion = true;
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{message}");
        self.diagnostics.push(Diagnostic::warning(message));
    }
}

/// Make a name safe as an identifier in the reference target language:
/// invalid characters become `_`, a leading digit gets a `_` prefix, and the
/// first letter is lowercased.
pub fn sanitize_identifier(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (i, ch) in name.chars().enumerate() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            if i == 0 {
                if ch.is_ascii_digit() {
                    out.push('_');
                }
                out.push(ch.to_ascii_lowercase());
            } else {
                out.push(ch);
            }
        } else {
            out.push('_');
        }
    }
    if out.is_empty() {
        out.push('_');
    }
    out
}

pub fn pascal_case(name: &str) -> String {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

pub fn camel_case(name: &str) -> String {
    let pascal = pascal_case(name);
    let mut chars = pascal.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => pascal,
    }
}

pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_lower = false;
    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
            prev_lower = false;
        } else if ch.is_ascii_alphanumeric() || ch == '_' {
            out.push(ch);
            prev_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
        } else {
            out.push('_');
            prev_lower = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{BindingsCache, ProviderSchemaCatalog};

    #[test]
    fn identifiers_are_stable_and_deduplicated() {
        let catalog = ProviderSchemaCatalog::default();
        let bindings = BindingsCache::new();
        let mut scope = Scope::new(&catalog, &bindings);

        let a = NodeId::resource("null_resource", "main");
        let b = NodeId::output("main");
        assert_eq!(scope.identifier_for(&a, "main"), "main");
        assert_eq!(scope.identifier_for(&b, "main"), "main_1");
        // idempotent per node
        assert_eq!(scope.identifier_for(&a, "main"), "main");
    }

    #[test]
    fn sanitizes_invalid_characters() {
        assert_eq!(sanitize_identifier("my-resource.1"), "my_resource_1");
        assert_eq!(sanitize_identifier("9lives"), "_9lives");
        assert_eq!(sanitize_identifier("Main"), "main");
    }

    #[test]
    fn case_differing_names_stay_distinct() {
        let catalog = ProviderSchemaCatalog::default();
        let bindings = BindingsCache::new();
        let mut scope = Scope::new(&catalog, &bindings);
        let a = scope.identifier_for(&NodeId::variable("Region"), "Region");
        let b = scope.identifier_for(&NodeId::variable("region"), "region");
        assert_eq!(a, "region");
        assert_eq!(b, "region_1");
    }

    #[test]
    fn pascal_and_camel_case() {
        assert_eq!(pascal_case("aws_vpc"), "AwsVpc");
        assert_eq!(pascal_case("null_resource"), "NullResource");
        assert_eq!(camel_case("cidr_block"), "cidrBlock");
        assert_eq!(camel_case("id"), "id");
    }

    #[test]
    fn snake_case_round_trips_hcl_names() {
        assert_eq!(snake_case("cidr_block"), "cidr_block");
        assert_eq!(snake_case("cidrBlock"), "cidr_block");
    }
}
