//! Per-block emitters: each node kind lowers to one construct declaration.
//!
//! Emitters are pure over (scope, node, graph); they run in topological
//! order so every identifier a declaration mentions has already been
//! allocated by the time it is printed.

use hcl::{Body, Expression};

use crate::ast::{ClassRef, Expr, Stmt};
use crate::error::ConvertError;
use crate::expr::{lower_body, ExprCtx};
use crate::graph::{Node, NodeKind};
use crate::refs::{leading_attrs, resolve_reference};
use crate::scope::{pascal_case, NodeId};

/// Meta-arguments every emitter handles outside the schema-driven path.
const META_ARGS: &[&str] = &["count", "for_each", "depends_on", "provider"];

pub fn emit(node: &Node, ctx: &mut ExprCtx<'_, '_>) -> Result<Vec<Stmt>, ConvertError> {
    let stmt = match &node.kind {
        NodeKind::Provider {
            name,
            alias,
            config,
        } => emit_provider(&node.id, name, alias.as_deref(), config, ctx)?,
        NodeKind::Variable { name, config } => emit_variable(&node.id, name, config, ctx)?,
        NodeKind::Local { name, value } => emit_local(&node.id, name, value, ctx)?,
        NodeKind::Output { name, config } => emit_output(&node.id, name, config, ctx)?,
        NodeKind::Module { name, config } => emit_module(&node.id, name, config, ctx)?,
        NodeKind::Resource { ty, name, config } => {
            emit_resource_like(&node.id, ty, name, config, ctx, false)?
        }
        NodeKind::Data { ty, name, config } => {
            emit_resource_like(&node.id, ty, name, config, ctx, true)?
        }
    };
    Ok(vec![stmt])
}

/// Backend declarations go first in the emitted body and bind no name.
pub fn emit_backend(ty: &str, body: &Body, ctx: &mut ExprCtx<'_, '_>) -> Result<Stmt, ConvertError> {
    let props = lower_body(body, None, &[], ctx)?;
    Ok(Stmt::NewInstance {
        ident: None,
        class: ClassRef::core(format!("{}Backend", pascal_case(ty))),
        logical_id: None,
        props,
        leading_comment: None,
    })
}

fn emit_provider(
    id: &NodeId,
    name: &str,
    alias: Option<&str>,
    config: &Body,
    ctx: &mut ExprCtx<'_, '_>,
) -> Result<Stmt, ConvertError> {
    let bindings = ctx.scope.bindings.lookup(name, ctx.scope.catalog);
    if !bindings.has_schema {
        ctx.scope.missing_schemas.insert(name.to_string());
    }
    let schema = ctx.scope.catalog.provider_block(name);
    let preferred = match alias {
        Some(a) => format!("{name}_{a}"),
        None => name.to_string(),
    };
    let ident = ctx.scope.identifier_for(id, &preferred);
    // The alias joins the logical name so aliased configurations stay
    // distinct in synthesized state.
    let logical = match alias {
        Some(a) => format!("{name}.{a}"),
        None => name.to_string(),
    };
    let props = lower_body(config, schema, &[], ctx)?;
    Ok(Stmt::NewInstance {
        ident: Some(ident),
        class: ClassRef::provider(
            &bindings.local_name,
            format!("{}Provider", pascal_case(name)),
        ),
        logical_id: Some(logical),
        props,
        leading_comment: None,
    })
}

fn emit_variable(
    id: &NodeId,
    name: &str,
    config: &Body,
    ctx: &mut ExprCtx<'_, '_>,
) -> Result<Stmt, ConvertError> {
    let ident = ctx.scope.identifier_for(id, name);
    let mut props = Vec::new();
    for attr in config.attributes() {
        match attr.key() {
            // The type expression is kept in its HCL spelling; the
            // framework re-parses it at synthesis.
            "type" => props.push(("type".to_string(), Expr::Str(attr.expr().to_string()))),
            key @ ("default" | "description" | "sensitive" | "nullable") => {
                props.push((key.to_string(), ctx.translate(attr.expr(), None)?))
            }
            other => ctx
                .scope
                .warn(format!("variable '{name}': attribute '{other}' was skipped")),
        }
    }
    for blk in config.blocks() {
        ctx.scope.warn(format!(
            "variable '{name}': '{}' block was skipped",
            blk.identifier()
        ));
    }
    Ok(Stmt::NewInstance {
        ident: Some(ident),
        class: ClassRef::core("TerraformVariable"),
        logical_id: Some(name.to_string()),
        props,
        leading_comment: None,
    })
}

fn emit_local(
    id: &NodeId,
    name: &str,
    value: &Expression,
    ctx: &mut ExprCtx<'_, '_>,
) -> Result<Stmt, ConvertError> {
    let ident = ctx.scope.identifier_for(id, name);
    Ok(Stmt::Const {
        ident,
        value: ctx.translate(value, None)?,
    })
}

fn emit_output(
    id: &NodeId,
    name: &str,
    config: &Body,
    ctx: &mut ExprCtx<'_, '_>,
) -> Result<Stmt, ConvertError> {
    let ident = ctx.scope.identifier_for(id, name);
    let mut props = Vec::new();
    for attr in config.attributes() {
        match attr.key() {
            key @ ("value" | "description" | "sensitive") => {
                props.push((key.to_string(), ctx.translate(attr.expr(), None)?))
            }
            "depends_on" => {
                if let Some(deps) = depends_on_list(attr.expr(), ctx) {
                    props.push(("depends_on".to_string(), deps));
                }
            }
            other => ctx
                .scope
                .warn(format!("output '{name}': attribute '{other}' was skipped")),
        }
    }
    Ok(Stmt::NewInstance {
        ident: Some(ident),
        class: ClassRef::core("TerraformOutput"),
        logical_id: Some(name.to_string()),
        props,
        leading_comment: None,
    })
}

fn emit_module(
    id: &NodeId,
    name: &str,
    config: &Body,
    ctx: &mut ExprCtx<'_, '_>,
) -> Result<Stmt, ConvertError> {
    let ident = ctx.scope.identifier_for(id, name);
    let source = config
        .attributes()
        .find(|a| a.key() == "source")
        .and_then(|a| match a.expr() {
            Expression::String(s) => Some(s.clone()),
            _ => None,
        })
        .unwrap_or_default();

    let mut props = meta_props(config, ctx)?;
    let skip = [&["source", "version", "providers"][..], META_ARGS].concat();
    props.extend(lower_body(config, None, &skip, ctx)?);
    Ok(Stmt::NewInstance {
        ident: Some(ident),
        class: ClassRef {
            name: crate::imports::module_class_name(&source),
            origin: crate::ast::ImportOrigin::Module(source),
        },
        logical_id: Some(name.to_string()),
        props,
        leading_comment: None,
    })
}

fn emit_resource_like(
    id: &NodeId,
    ty: &str,
    name: &str,
    config: &Body,
    ctx: &mut ExprCtx<'_, '_>,
    is_data: bool,
) -> Result<Stmt, ConvertError> {
    let ident = ctx.scope.identifier_for(id, name);

    // The remote-state data source is a framework construct, not a provider
    // binding.
    let class = if is_data && ty == "terraform_remote_state" {
        ClassRef::core("DataTerraformRemoteState")
    } else {
        let provider = provider_for_type(ty);
        let bindings = ctx.scope.bindings.lookup(provider, ctx.scope.catalog);
        if !bindings.has_schema {
            ctx.scope.missing_schemas.insert(provider.to_string());
        }
        let class_name = if is_data {
            format!("Data{}", pascal_case(ty))
        } else {
            pascal_case(ty)
        };
        ClassRef::provider(&bindings.local_name, class_name)
    };

    let provider = provider_for_type(ty);
    let schema = if is_data {
        ctx.scope.catalog.data_source_block(provider, ty)
    } else {
        ctx.scope.catalog.resource_block(provider, ty)
    };
    if schema.is_none() && ctx.scope.catalog.provider(provider).is_some() {
        ctx.scope.warn(format!(
            "no schema for {} '{ty}'; attributes translated without type information",
            if is_data { "data source" } else { "resource" }
        ));
    }

    let mut props = meta_props(config, ctx)?;
    props.extend(lower_body(config, schema, META_ARGS, ctx)?);
    Ok(Stmt::NewInstance {
        ident: Some(ident),
        class,
        logical_id: Some(name.to_string()),
        props,
        leading_comment: None,
    })
}

/// Lower the meta-arguments shared by resources, data sources and modules.
fn meta_props(
    config: &Body,
    ctx: &mut ExprCtx<'_, '_>,
) -> Result<Vec<(String, Expr)>, ConvertError> {
    let mut out = Vec::new();
    for attr in config.attributes() {
        match attr.key() {
            key @ ("count" | "for_each") => {
                ctx.scope.warn(format!(
                    "'{key}' meta-argument is kept as a plain property; iterator semantics are not translated"
                ));
                out.push((key.to_string(), ctx.translate(attr.expr(), None)?));
            }
            "depends_on" => {
                if let Some(deps) = depends_on_list(attr.expr(), ctx) {
                    out.push(("depends_on".to_string(), deps));
                }
            }
            "provider" => {
                if let Some(reference) = provider_reference(attr.expr(), ctx) {
                    out.push(("provider".to_string(), reference));
                } else {
                    ctx.scope
                        .warn("unresolved 'provider' meta-argument was skipped");
                }
            }
            _ => {}
        }
    }
    Ok(out)
}

/// `depends_on = [aws_vpc.main, module.net]` lowers to a list of construct
/// references.
fn depends_on_list(expr: &Expression, ctx: &mut ExprCtx<'_, '_>) -> Option<Expr> {
    let Expression::Array(items) = expr else {
        ctx.scope
            .warn("'depends_on' must be a list; the attribute was skipped");
        return None;
    };
    let mut deps = Vec::with_capacity(items.len());
    for item in items {
        let resolved = match item {
            Expression::Traversal(tr) => leading_attrs(tr)
                .and_then(|(root, attrs)| resolve_reference(&root, &attrs, ctx.graph))
                .map(|(node, _)| ctx.node_base_expr(&node)),
            _ => None,
        };
        match resolved {
            Some(e) => deps.push(e),
            None => ctx
                .scope
                .warn(format!("'depends_on' entry '{item}' was dropped")),
        }
    }
    Some(Expr::List(deps))
}

/// `provider = aws.west` resolves to the aliased provider configuration.
fn provider_reference(expr: &Expression, ctx: &mut ExprCtx<'_, '_>) -> Option<Expr> {
    let Expression::Traversal(tr) = expr else {
        return None;
    };
    let (root, attrs) = leading_attrs(tr)?;
    let id = NodeId::provider(&root, attrs.first().map(String::as_str));
    if ctx.graph.contains(&id) {
        Some(ctx.node_base_expr(&id))
    } else {
        None
    }
}

/// The provider a resource type belongs to: the prefix before the first
/// underscore (`aws_vpc` -> `aws`).
pub fn provider_for_type(ty: &str) -> &str {
    ty.split('_').next().unwrap_or(ty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::DependencyGraph;
    use crate::schema::{BindingsCache, ProviderSchemaCatalog};
    use crate::scope::Scope;

    fn emit_single(kind: NodeKind, id: NodeId) -> Stmt {
        let catalog = ProviderSchemaCatalog::default();
        let bindings = BindingsCache::new();
        let mut scope = Scope::new(&catalog, &bindings);
        let mut graph = DependencyGraph::new();
        graph.add_node(Node {
            id: id.clone(),
            kind: kind.clone(),
        });
        let mut ctx = ExprCtx::new(&mut scope, &graph);
        let node = Node { id, kind };
        emit(&node, &mut ctx).unwrap().remove(0)
    }

    #[test]
    fn resource_declaration_shape() {
        let body: Body = hcl::from_str("cidr_block = \"10.0.0.0/16\"").unwrap();
        let stmt = emit_single(
            NodeKind::Resource {
                ty: "aws_vpc".into(),
                name: "main".into(),
                config: body,
            },
            NodeId::resource("aws_vpc", "main"),
        );
        match stmt {
            Stmt::NewInstance {
                ident,
                class,
                logical_id,
                props,
                ..
            } => {
                assert_eq!(ident.as_deref(), Some("main"));
                assert_eq!(class.name, "AwsVpc");
                assert_eq!(logical_id.as_deref(), Some("main"));
                assert_eq!(props[0].0, "cidr_block");
            }
            other => panic!("expected instance, got {other:?}"),
        }
    }

    #[test]
    fn data_source_gets_data_prefix() {
        let stmt = emit_single(
            NodeKind::Data {
                ty: "aws_ami".into(),
                name: "ubuntu".into(),
                config: Body::builder().build(),
            },
            NodeId::data("aws_ami", "ubuntu"),
        );
        assert_eq!(stmt.class_ref().unwrap().name, "DataAwsAmi");
    }

    #[test]
    fn remote_state_is_a_core_construct() {
        let stmt = emit_single(
            NodeKind::Data {
                ty: "terraform_remote_state".into(),
                name: "shared".into(),
                config: Body::builder().build(),
            },
            NodeId::data("terraform_remote_state", "shared"),
        );
        let class = stmt.class_ref().unwrap();
        assert_eq!(class.name, "DataTerraformRemoteState");
        assert_eq!(class.origin, crate::ast::ImportOrigin::Core);
    }

    #[test]
    fn aliased_provider_logical_name() {
        let body: Body = hcl::from_str("alias = \"west\"\nregion = \"us-west-2\"").unwrap();
        let stmt = emit_single(
            NodeKind::Provider {
                name: "aws".into(),
                alias: Some("west".into()),
                config: body,
            },
            NodeId::provider("aws", Some("west")),
        );
        match stmt {
            Stmt::NewInstance {
                ident, logical_id, ..
            } => {
                assert_eq!(ident.as_deref(), Some("aws_west"));
                assert_eq!(logical_id.as_deref(), Some("aws.west"));
            }
            other => panic!("expected instance, got {other:?}"),
        }
    }

    #[test]
    fn backend_binds_no_identifier() {
        let body: Body = hcl::from_str("bucket = \"b\"").unwrap();
        let catalog = ProviderSchemaCatalog::default();
        let bindings = BindingsCache::new();
        let mut scope = Scope::new(&catalog, &bindings);
        let graph = DependencyGraph::new();
        let mut ctx = ExprCtx::new(&mut scope, &graph);
        let stmt = emit_backend("s3", &body, &mut ctx).unwrap();
        match stmt {
            Stmt::NewInstance {
                ident,
                class,
                logical_id,
                ..
            } => {
                assert_eq!(ident, None);
                assert_eq!(class.name, "S3Backend");
                assert_eq!(logical_id, None);
            }
            other => panic!("expected instance, got {other:?}"),
        }
    }
}
