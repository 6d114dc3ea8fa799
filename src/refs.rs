//! Reference discovery: find which registered nodes an expression mentions.
//!
//! A dotted reference matches a node by longest registered prefix, e.g.
//! `aws_vpc.main.subnets[0].id` resolves to `resource.aws_vpc.main`.
//! References to unregistered ids contribute no edges and are dropped with a
//! debug log; reserved iteration symbols never create edges at all.

use hcl::template::{Element, Template};
use hcl::{Body, Expression, Traversal, TraversalOperator};
use log::debug;

use crate::graph::DependencyGraph;
use crate::scope::NodeId;

/// Intra-block symbols that look like reference roots but are not nodes.
pub const RESERVED_PREFIXES: &[&str] = &["count", "each", "self", "path", "terraform"];

/// Root variable and the leading `GetAttr` chain of a traversal. The chain
/// stops at the first index or splat operator; those cannot extend a node id.
pub fn leading_attrs(tr: &Traversal) -> Option<(String, Vec<String>)> {
    let root = match &tr.expr {
        Expression::Variable(v) => v.as_str().to_string(),
        _ => return None,
    };
    let mut attrs = Vec::new();
    for op in &tr.operators {
        match op {
            TraversalOperator::GetAttr(name) => attrs.push(name.as_str().to_string()),
            _ => break,
        }
    }
    Some((root, attrs))
}

/// Longest-prefix match of a dotted reference against the registered nodes.
/// Returns the node id and how many parts (root included) the id consumed.
pub fn resolve_reference(
    root: &str,
    attrs: &[String],
    graph: &DependencyGraph,
) -> Option<(NodeId, usize)> {
    if RESERVED_PREFIXES.contains(&root) {
        return None;
    }
    let (candidate, consumed) = match root {
        "var" => (NodeId::variable(attrs.first()?), 2),
        "local" => (NodeId::local(attrs.first()?), 2),
        "module" => (NodeId::module(attrs.first()?), 2),
        "data" => {
            let [ty, name, ..] = attrs else { return None };
            (NodeId::data(ty, name), 3)
        }
        // Anything else is a resource type.
        resource_type => (NodeId::resource(resource_type, attrs.first()?), 2),
    };
    if graph.contains(&candidate) {
        Some((candidate, consumed))
    } else {
        debug!("dropping reference to unregistered node '{candidate}'");
        None
    }
}

/// Collect every resolvable reference in an expression, in encounter order.
pub fn collect_expr_refs(expr: &Expression, graph: &DependencyGraph, out: &mut Vec<NodeId>) {
    match expr {
        Expression::Traversal(tr) => {
            if let Some((root, attrs)) = leading_attrs(tr) {
                if let Some((node, _)) = resolve_reference(&root, &attrs, graph) {
                    if !out.contains(&node) {
                        out.push(node);
                    }
                }
            }
            // Index operands can reference other nodes too.
            for op in &tr.operators {
                if let TraversalOperator::Index(idx) = op {
                    collect_expr_refs(idx, graph, out);
                }
            }
        }
        Expression::TemplateExpr(t) => {
            if let Ok(tpl) = Template::from_expr(t) {
                for el in tpl.elements() {
                    if let Element::Interpolation(ip) = el {
                        collect_expr_refs(&ip.expr, graph, out);
                    }
                }
            }
        }
        Expression::Array(items) => {
            for item in items {
                collect_expr_refs(item, graph, out);
            }
        }
        Expression::Object(entries) => {
            for (key, value) in entries {
                if let hcl::ObjectKey::Expression(e) = key {
                    collect_expr_refs(e, graph, out);
                }
                collect_expr_refs(value, graph, out);
            }
        }
        Expression::FuncCall(call) => {
            for arg in &call.args {
                collect_expr_refs(arg, graph, out);
            }
        }
        Expression::Conditional(c) => {
            collect_expr_refs(&c.cond_expr, graph, out);
            collect_expr_refs(&c.true_expr, graph, out);
            collect_expr_refs(&c.false_expr, graph, out);
        }
        Expression::Operation(op) => match op.as_ref() {
            hcl::expr::Operation::Unary(u) => collect_expr_refs(&u.expr, graph, out),
            hcl::expr::Operation::Binary(b) => {
                collect_expr_refs(&b.lhs_expr, graph, out);
                collect_expr_refs(&b.rhs_expr, graph, out);
            }
        },
        Expression::ForExpr(fe) => {
            collect_expr_refs(&fe.collection_expr, graph, out);
            if let Some(key_expr) = &fe.key_expr {
                collect_expr_refs(key_expr, graph, out);
            }
            collect_expr_refs(&fe.value_expr, graph, out);
            if let Some(cond) = &fe.cond_expr {
                collect_expr_refs(cond, graph, out);
            }
        }
        Expression::Parenthesis(inner) => collect_expr_refs(inner, graph, out),
        _ => {}
    }
}

/// Collect references from a whole block body, nested blocks included.
pub fn collect_body_refs(body: &Body, graph: &DependencyGraph, out: &mut Vec<NodeId>) {
    for attr in body.attributes() {
        collect_expr_refs(attr.expr(), graph, out);
    }
    for blk in body.blocks() {
        collect_body_refs(blk.body(), graph, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Node, NodeKind};

    fn graph_with(ids: &[NodeId]) -> DependencyGraph {
        let mut g = DependencyGraph::new();
        for id in ids {
            g.add_node(Node {
                id: id.clone(),
                kind: NodeKind::Local {
                    name: id.to_string(),
                    value: Expression::Null,
                },
            });
        }
        g
    }

    fn refs_in(input: &str, graph: &DependencyGraph) -> Vec<NodeId> {
        let body: Body = hcl::from_str(input).unwrap();
        let mut out = Vec::new();
        collect_body_refs(&body, graph, &mut out);
        out
    }

    #[test]
    fn longest_prefix_match_over_traversals() {
        let g = graph_with(&[NodeId::resource("aws_vpc", "main")]);
        let out = refs_in("x = aws_vpc.main.subnets[0].id", &g);
        assert_eq!(out, vec![NodeId::resource("aws_vpc", "main")]);
    }

    #[test]
    fn finds_refs_inside_templates_and_objects() {
        let g = graph_with(&[NodeId::variable("region"), NodeId::local("prefix")]);
        let out = refs_in(
            "x = { name = \"${local.prefix}-${var.region}\" }",
            &g,
        );
        assert_eq!(out, vec![NodeId::local("prefix"), NodeId::variable("region")]);
    }

    #[test]
    fn reserved_prefixes_do_not_resolve() {
        let g = graph_with(&[NodeId::resource("count", "index")]);
        assert!(refs_in("x = count.index", &g).is_empty());
        assert!(refs_in("x = each.key", &g).is_empty());
        assert!(refs_in("x = self.private_ip", &g).is_empty());
    }

    #[test]
    fn unknown_references_are_dropped() {
        let g = graph_with(&[]);
        assert!(refs_in("x = aws_vpc.missing.id", &g).is_empty());
    }

    #[test]
    fn data_references_use_three_parts() {
        let g = graph_with(&[NodeId::data("aws_ami", "ubuntu")]);
        let out = refs_in("x = data.aws_ami.ubuntu.id", &g);
        assert_eq!(out, vec![NodeId::data("aws_ami", "ubuntu")]);
    }

    #[test]
    fn duplicates_collapse() {
        let g = graph_with(&[NodeId::variable("a")]);
        let out = refs_in("x = [var.a, var.a]", &g);
        assert_eq!(out.len(), 1);
    }
}
