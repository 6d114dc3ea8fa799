//! HCL expression translation.
//!
//! Turns parsed [`hcl::Expression`] trees into emitted-program expressions,
//! resolving references against the dependency graph and applying
//! schema-aware token coercion: when a declared attribute type is concrete
//! but the translated expression only produces a value at synthesis time, it
//! is wrapped in the matching framework coercion helper.

use hcl::expr::{BinaryOperator, HeredocStripMode, TemplateExpr, UnaryOperator};
use hcl::template::{Element, Template};
use hcl::{Block, Body, Expression, ObjectKey, Traversal, TraversalOperator};
use indexmap::IndexMap;

use crate::ast::{BinaryOp, Coercion, Expr, UnaryOp};
use crate::error::ConvertError;
use crate::graph::{DependencyGraph, NodeKind};
use crate::refs::{leading_attrs, resolve_reference, RESERVED_PREFIXES};
use crate::schema::{AttributeType, NestingMode, SchemaBlock};
use crate::scope::{NodeId, Scope};

/// Terraform builtins the framework function namespace covers. Anything
/// outside this list still lowers to a namespace call, with a warning.
const KNOWN_FUNCTIONS: &[&str] = &[
    "abs", "base64decode", "base64encode", "base64sha256", "basename", "can", "ceil", "chomp",
    "cidrhost", "cidrnetmask", "cidrsubnet", "cidrsubnets", "coalesce", "coalescelist", "compact",
    "concat", "contains", "csvdecode", "dirname", "distinct", "element", "file", "filebase64",
    "flatten", "floor", "format", "formatdate", "formatlist", "indent", "index", "join",
    "jsondecode", "jsonencode", "keys", "length", "log", "lookup", "lower", "max", "md5", "merge",
    "min", "parseint", "pathexpand", "pow", "range", "regex", "regexall", "replace", "reverse",
    "sha1", "sha256", "sha512", "signum", "slice", "sort", "split", "strrev", "substr", "sum",
    "templatefile", "timeadd", "timestamp", "title", "tobool", "tolist", "tomap", "tonumber",
    "toset", "tostring", "trim", "trimprefix", "trimspace", "trimsuffix", "try", "upper",
    "urlencode", "uuid", "values", "yamldecode", "yamlencode", "zipmap",
];

pub struct ExprCtx<'s, 'a> {
    pub scope: &'s mut Scope<'a>,
    pub graph: &'s DependencyGraph,
    /// Iteration variables currently in scope (for-expressions, dynamic
    /// blocks), innermost last.
    loop_vars: Vec<String>,
}

impl<'s, 'a> ExprCtx<'s, 'a> {
    pub fn new(scope: &'s mut Scope<'a>, graph: &'s DependencyGraph) -> Self {
        Self {
            scope,
            graph,
            loop_vars: Vec::new(),
        }
    }

    /// Translate an expression against an optional declared type.
    pub fn translate(
        &mut self,
        expr: &Expression,
        ty: Option<&AttributeType>,
    ) -> Result<Expr, ConvertError> {
        let out = self.translate_inner(expr, ty)?;
        Ok(self.coerce(out, ty))
    }

    fn translate_inner(
        &mut self,
        expr: &Expression,
        ty: Option<&AttributeType>,
    ) -> Result<Expr, ConvertError> {
        match expr {
            Expression::Null => Ok(Expr::Null),
            Expression::Bool(b) => Ok(Expr::Bool(*b)),
            Expression::Number(n) => Ok(Expr::Number(n.clone())),
            Expression::String(s) => Ok(Expr::Str(s.clone())),
            Expression::Array(items) => {
                let elem_ty = ty.and_then(AttributeType::element);
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.translate(item, elem_ty)?);
                }
                Ok(Expr::List(out))
            }
            Expression::Object(entries) => {
                let mut out = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = object_key_string(key);
                    let value_ty = match ty {
                        Some(AttributeType::Map(elem)) => Some(elem.as_ref()),
                        Some(AttributeType::Object(fields)) => fields.get(&key),
                        _ => None,
                    };
                    out.push((key, self.translate(value, value_ty)?));
                }
                // Typed objects take the schema's attribute spelling; plain
                // maps keep their keys verbatim.
                if matches!(ty, Some(AttributeType::Object(_))) {
                    Ok(Expr::Struct(out))
                } else {
                    Ok(Expr::Map(out))
                }
            }
            Expression::TemplateExpr(t) => self.translate_template_expr(t, ty),
            Expression::Variable(v) => {
                let name = v.as_str();
                if self.loop_vars.iter().any(|lv| lv == name) {
                    Ok(Expr::Ident(name.to_string()))
                } else {
                    self.scope
                        .warn(format!("bare variable '{name}' kept as-is in output"));
                    Ok(Expr::Raw(name.to_string()))
                }
            }
            Expression::Traversal(tr) => self.translate_traversal(tr),
            Expression::FuncCall(call) => {
                let name = call.name.as_str().to_string();
                if !KNOWN_FUNCTIONS.contains(&name.as_str()) {
                    self.scope.warn(format!(
                        "unknown function '{name}' passed through to the function namespace"
                    ));
                }
                if call.expand_final {
                    self.scope.warn(format!(
                        "argument expansion ('...') on '{name}' is not translated"
                    ));
                }
                let mut args = Vec::with_capacity(call.args.len());
                for arg in &call.args {
                    args.push(self.translate(arg, None)?);
                }
                Ok(Expr::FnCall { name, args })
            }
            Expression::Conditional(c) => Ok(Expr::Conditional {
                cond: Box::new(self.translate(&c.cond_expr, None)?),
                then: Box::new(self.translate(&c.true_expr, ty)?),
                otherwise: Box::new(self.translate(&c.false_expr, ty)?),
            }),
            Expression::Operation(op) => match op.as_ref() {
                hcl::expr::Operation::Unary(u) => Ok(Expr::Unary {
                    op: match u.operator {
                        UnaryOperator::Not => UnaryOp::Not,
                        UnaryOperator::Neg => UnaryOp::Neg,
                    },
                    expr: Box::new(self.translate(&u.expr, None)?),
                }),
                hcl::expr::Operation::Binary(b) => Ok(Expr::Binary {
                    op: binary_op(b.operator),
                    lhs: Box::new(self.translate(&b.lhs_expr, None)?),
                    rhs: Box::new(self.translate(&b.rhs_expr, None)?),
                }),
            },
            Expression::ForExpr(fe) => {
                let value_var = fe.value_var.as_str().to_string();
                let key_var = fe.key_var.as_ref().map(|k| k.as_str().to_string());
                let collection = Box::new(self.translate(&fe.collection_expr, None)?);

                self.loop_vars.push(value_var.clone());
                if let Some(k) = &key_var {
                    self.loop_vars.push(k.clone());
                }
                let result = (|| {
                    let cond = match &fe.cond_expr {
                        Some(c) => Some(Box::new(self.translate(c, None)?)),
                        None => None,
                    };
                    let value = Box::new(self.translate(&fe.value_expr, None)?);
                    match &fe.key_expr {
                        Some(key_expr) => {
                            if fe.grouping {
                                self.scope.warn(
                                    "grouping for-expression ('...') loses grouping in output",
                                );
                            }
                            let key = Box::new(self.translate(key_expr, None)?);
                            Ok(Expr::ForMap {
                                value_var: value_var.clone(),
                                key_var: key_var.clone(),
                                collection,
                                cond,
                                key,
                                value,
                            })
                        }
                        None => Ok(Expr::ForList {
                            value_var: value_var.clone(),
                            key_var: key_var.clone(),
                            collection,
                            cond,
                            body: value,
                        }),
                    }
                })();
                if key_var.is_some() {
                    self.loop_vars.pop();
                }
                self.loop_vars.pop();
                result
            }
            Expression::Parenthesis(inner) => {
                Ok(Expr::Paren(Box::new(self.translate(inner, ty)?)))
            }
            other => {
                self.scope
                    .warn(format!("unsupported expression kept as-is: {other}"));
                Ok(Expr::Raw(other.to_string()))
            }
        }
    }

    fn translate_template_expr(
        &mut self,
        t: &TemplateExpr,
        ty: Option<&AttributeType>,
    ) -> Result<Expr, ConvertError> {
        match t {
            TemplateExpr::QuotedString(_) => {
                let tpl = Template::from_expr(t)?;
                self.translate_template(tpl.elements(), ty)
            }
            TemplateExpr::Heredoc(h) => {
                let text = match h.strip {
                    HeredocStripMode::Indent => strip_indent(&h.template),
                    HeredocStripMode::None => h.template.clone(),
                };
                if !text.contains("${") && !text.contains("%{") {
                    return Ok(Expr::Heredoc(text));
                }
                let tpl: Template = text.parse()?;
                self.translate_template(tpl.elements(), ty)
            }
        }
    }

    fn translate_template(
        &mut self,
        elements: &[Element],
        ty: Option<&AttributeType>,
    ) -> Result<Expr, ConvertError> {
        // A lone interpolation is the inner expression, not a string concat.
        if let [Element::Interpolation(ip)] = elements {
            return self.translate(&ip.expr, ty);
        }
        let mut parts = Vec::with_capacity(elements.len());
        for el in elements {
            match el {
                Element::Literal(s) => parts.push(Expr::Str(s.clone())),
                Element::Interpolation(ip) => parts.push(self.translate(&ip.expr, None)?),
                Element::Directive(_) => {
                    self.scope
                        .warn("template directive (%{ ... }) kept as-is in output");
                    parts.push(Expr::Raw("%{ directive }".to_string()));
                }
            }
        }
        Ok(Expr::Concat(parts))
    }

    fn translate_traversal(&mut self, tr: &Traversal) -> Result<Expr, ConvertError> {
        let source = Expression::Traversal(Box::new(tr.clone())).to_string();
        let Some((root, attrs)) = leading_attrs(tr) else {
            self.scope
                .warn(format!("unsupported reference kept as-is: {source}"));
            return Ok(Expr::Raw(source));
        };

        // Iteration variables shadow everything.
        let (mut acc, consumed_ops) = if self.loop_vars.iter().any(|lv| lv == &root) {
            (Expr::Ident(root.clone()), 0)
        } else if RESERVED_PREFIXES.contains(&root.as_str()) {
            // count.index, each.key, self.* are intra-block; kept literal.
            return Ok(Expr::Raw(source));
        } else {
            match resolve_reference(&root, &attrs, self.graph) {
                Some((node, consumed)) => {
                    let base = self.node_base_expr(&node);
                    (base, consumed - 1)
                }
                None => {
                    self.scope
                        .warn(format!("unresolved reference kept as-is: {source}"));
                    return Ok(Expr::Raw(source));
                }
            }
        };

        let mut ops = tr.operators.iter().skip(consumed_ops).peekable();
        while let Some(op) = ops.next() {
            match op {
                TraversalOperator::GetAttr(name) => {
                    acc = Expr::Member {
                        target: Box::new(acc),
                        attr: name.as_str().to_string(),
                    };
                }
                TraversalOperator::Index(idx) => {
                    acc = Expr::Index {
                        target: Box::new(acc),
                        index: Box::new(self.translate(idx, None)?),
                    };
                }
                TraversalOperator::LegacyIndex(n) => {
                    acc = Expr::Index {
                        target: Box::new(acc),
                        index: Box::new(Expr::Number(hcl::Number::from(*n))),
                    };
                }
                TraversalOperator::AttrSplat | TraversalOperator::FullSplat => {
                    let mut path = Vec::new();
                    while let Some(TraversalOperator::GetAttr(name)) = ops.peek() {
                        path.push(name.as_str().to_string());
                        ops.next();
                    }
                    acc = Expr::Splat {
                        target: Box::new(acc),
                        path,
                    };
                }
            }
        }
        Ok(acc)
    }

    /// The expression a node id resolves to at its use site.
    pub(crate) fn node_base_expr(&mut self, id: &NodeId) -> Expr {
        let Some(node) = self.graph.node(id) else {
            // resolve_reference only returns registered nodes
            return Expr::Raw(id.to_string());
        };
        let preferred = match &node.kind {
            NodeKind::Provider { name, .. } => name.clone(),
            NodeKind::Variable { name, .. }
            | NodeKind::Local { name, .. }
            | NodeKind::Output { name, .. }
            | NodeKind::Module { name, .. }
            | NodeKind::Resource { name, .. }
            | NodeKind::Data { name, .. } => name.clone(),
        };
        let ident = self.scope.identifier_for(id, &preferred);
        match &node.kind {
            // A variable reference reads the construct's value.
            NodeKind::Variable { .. } => Expr::Member {
                target: Box::new(Expr::Ident(ident)),
                attr: "value".to_string(),
            },
            _ => Expr::Ident(ident),
        }
    }

    fn coerce(&mut self, expr: Expr, ty: Option<&AttributeType>) -> Expr {
        let Some(ty) = ty else { return expr };
        if !yields_token(&expr) {
            return expr;
        }
        let kind = match ty {
            AttributeType::String => Coercion::AsString,
            AttributeType::Number => Coercion::AsNumber,
            AttributeType::List(elem) | AttributeType::Set(elem) => match elem.as_ref() {
                AttributeType::Number => Coercion::AsNumberList,
                _ => Coercion::AsList,
            },
            AttributeType::Map(elem) => match elem.as_ref() {
                AttributeType::String => Coercion::AsStringMap,
                _ => Coercion::AsAny,
            },
            _ => return expr,
        };
        self.scope.mark_token_coercion();
        Expr::Coerce {
            kind,
            expr: Box::new(expr),
        }
    }
}

/// Whether a translated expression produces a framework token rather than a
/// plain value: attribute references, projections, and function calls are
/// only resolved at synthesis time.
fn yields_token(expr: &Expr) -> bool {
    match expr {
        Expr::Member { .. } | Expr::Splat { .. } | Expr::FnCall { .. } => true,
        Expr::Index { target, .. } => yields_token(target),
        Expr::Paren(inner) => yields_token(inner),
        _ => false,
    }
}

fn binary_op(op: BinaryOperator) -> BinaryOp {
    match op {
        BinaryOperator::Eq => BinaryOp::Eq,
        BinaryOperator::NotEq => BinaryOp::NotEq,
        BinaryOperator::Less => BinaryOp::Lt,
        BinaryOperator::LessEq => BinaryOp::LtEq,
        BinaryOperator::Greater => BinaryOp::Gt,
        BinaryOperator::GreaterEq => BinaryOp::GtEq,
        BinaryOperator::And => BinaryOp::And,
        BinaryOperator::Or => BinaryOp::Or,
        BinaryOperator::Plus => BinaryOp::Add,
        BinaryOperator::Minus => BinaryOp::Sub,
        BinaryOperator::Mul => BinaryOp::Mul,
        BinaryOperator::Div => BinaryOp::Div,
        BinaryOperator::Mod => BinaryOp::Mod,
    }
}

fn object_key_string(key: &ObjectKey) -> String {
    match key {
        ObjectKey::Identifier(id) => id.as_str().to_string(),
        ObjectKey::Expression(Expression::String(s)) => s.clone(),
        ObjectKey::Expression(e) => e.to_string(),
        _ => String::new(),
    }
}

/// Strip the common leading whitespace of all non-blank lines, the `<<-`
/// heredoc rule.
pub fn strip_indent(text: &str) -> String {
    let indent = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    if indent == 0 {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        let (content, newline) = match line.strip_suffix('\n') {
            Some(c) => (c, "\n"),
            None => (line, ""),
        };
        if content.trim().is_empty() {
            out.push_str(content.trim_start());
        } else {
            out.push_str(&content[indent.min(content.len())..]);
        }
        out.push_str(newline);
    }
    out
}

/// Lower a block body to a property list against an optional schema block.
/// Attribute types drive coercion; nested block schemas drive recursion.
/// Keys in `skip` (meta-arguments the caller handles itself) are left out.
pub fn lower_body(
    body: &Body,
    schema: Option<&SchemaBlock>,
    skip: &[&str],
    ctx: &mut ExprCtx<'_, '_>,
) -> Result<Vec<(String, Expr)>, ConvertError> {
    let mut props = Vec::new();

    for attr in body.attributes() {
        let key = attr.key();
        if skip.contains(&key) {
            continue;
        }
        let ty = schema
            .and_then(|s| s.attributes.get(key))
            .map(|a| &a.r#type);
        props.push((key.to_string(), ctx.translate(attr.expr(), ty)?));
    }

    // Group nested blocks by identifier, first appearance wins the position.
    let mut grouped: IndexMap<&str, Vec<&Block>> = IndexMap::new();
    for blk in body.blocks() {
        grouped.entry(blk.identifier()).or_default().push(blk);
    }

    for (ident, blocks) in grouped {
        if ident == "dynamic" {
            for blk in blocks {
                if let Some((name, value)) = lower_dynamic_block(blk, schema, ctx)? {
                    props.push((name, value));
                }
            }
            continue;
        }
        if skip.contains(&ident) {
            continue;
        }
        if blocks.iter().any(|b| !b.labels().is_empty()) {
            ctx.scope.warn(format!(
                "labeled nested block '{ident}' is not translated and was skipped"
            ));
            continue;
        }
        let nested = schema.and_then(|s| s.block_types.get(ident));
        let nested_schema = nested.map(|n| &n.block);
        let single = matches!(
            nested.map(|n| n.nesting_mode),
            Some(NestingMode::Single) | Some(NestingMode::Group)
        );
        if single {
            if blocks.len() > 1 {
                ctx.scope.warn(format!(
                    "nested block '{ident}' appears {} times but is single-valued; keeping the first",
                    blocks.len()
                ));
            }
            let inner = lower_body(blocks[0].body(), nested_schema, &[], ctx)?;
            props.push((ident.to_string(), Expr::Struct(inner)));
        } else {
            let mut items = Vec::with_capacity(blocks.len());
            for blk in blocks {
                items.push(Expr::Struct(lower_body(blk.body(), nested_schema, &[], ctx)?));
            }
            props.push((ident.to_string(), Expr::List(items)));
        }
    }

    Ok(props)
}

/// `dynamic "x" { for_each = ... content { ... } }` becomes an iteration
/// over `for_each` producing the content objects.
fn lower_dynamic_block(
    blk: &Block,
    schema: Option<&SchemaBlock>,
    ctx: &mut ExprCtx<'_, '_>,
) -> Result<Option<(String, Expr)>, ConvertError> {
    let Some(label) = blk.labels().first() else {
        ctx.scope
            .warn("dynamic block without a label was skipped");
        return Ok(None);
    };
    let name = label.as_str().to_string();
    let Some(for_each) = blk.body().attributes().find(|a| a.key() == "for_each") else {
        ctx.scope.warn(format!(
            "dynamic block '{name}' has no for_each and was skipped"
        ));
        return Ok(None);
    };
    let Some(content) = blk.body().blocks().find(|b| b.identifier() == "content") else {
        ctx.scope.warn(format!(
            "dynamic block '{name}' has no content block and was skipped"
        ));
        return Ok(None);
    };

    let collection = Box::new(ctx.translate(for_each.expr(), None)?);
    let nested_schema = schema
        .and_then(|s| s.block_types.get(name.as_str()))
        .map(|n| &n.block);

    // Inside content the iterator is named after the block label.
    ctx.loop_vars.push(name.clone());
    let inner = lower_body(content.body(), nested_schema, &[], ctx);
    ctx.loop_vars.pop();

    Ok(Some((
        name.clone(),
        Expr::ForList {
            value_var: name,
            key_var: None,
            collection,
            cond: None,
            body: Box::new(Expr::Struct(inner?)),
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Node;
    use crate::schema::{BindingsCache, ProviderSchemaCatalog};

    fn graph_with(nodes: Vec<Node>) -> DependencyGraph {
        let mut g = DependencyGraph::new();
        for n in nodes {
            g.add_node(n);
        }
        g
    }

    fn resource_node(ty: &str, name: &str) -> Node {
        Node {
            id: NodeId::resource(ty, name),
            kind: NodeKind::Resource {
                ty: ty.to_string(),
                name: name.to_string(),
                config: Body::builder().build(),
            },
        }
    }

    fn parse_expr(input: &str) -> Expression {
        let body: Body = hcl::from_str(&format!("x = {input}")).unwrap();
        body.attributes().next().unwrap().expr().clone()
    }

    fn translate(
        input: &str,
        ty: Option<&AttributeType>,
        graph: &DependencyGraph,
    ) -> (Expr, bool) {
        let catalog = ProviderSchemaCatalog::default();
        let bindings = BindingsCache::new();
        let mut scope = Scope::new(&catalog, &bindings);
        let mut ctx = ExprCtx::new(&mut scope, graph);
        let out = ctx.translate(&parse_expr(input), ty).unwrap();
        (out, scope.has_token_coercion)
    }

    #[test]
    fn literals_pass_through() {
        let g = graph_with(vec![]);
        assert_eq!(translate("\"hello\"", None, &g).0, Expr::Str("hello".into()));
        assert_eq!(translate("true", None, &g).0, Expr::Bool(true));
        assert_eq!(translate("null", None, &g).0, Expr::Null);
    }

    #[test]
    fn lone_interpolation_unwraps() {
        let g = graph_with(vec![resource_node("aws_vpc", "main")]);
        let (out, _) = translate("\"${aws_vpc.main.id}\"", None, &g);
        assert_eq!(
            out,
            Expr::Member {
                target: Box::new(Expr::Ident("main".into())),
                attr: "id".into()
            }
        );
    }

    #[test]
    fn mixed_template_concatenates() {
        let g = graph_with(vec![resource_node("aws_vpc", "main")]);
        let (out, _) = translate("\"vpc-${aws_vpc.main.id}!\"", None, &g);
        match out {
            Expr::Concat(parts) => {
                assert_eq!(parts.len(), 3);
                assert_eq!(parts[0], Expr::Str("vpc-".into()));
                assert_eq!(parts[2], Expr::Str("!".into()));
            }
            other => panic!("expected concat, got {other:?}"),
        }
    }

    #[test]
    fn computed_reference_coerces_to_declared_primitive() {
        let g = graph_with(vec![resource_node("aws_vpc", "main")]);
        let (out, flagged) = translate("aws_vpc.main.id", Some(&AttributeType::String), &g);
        assert!(flagged);
        match out {
            Expr::Coerce { kind, .. } => assert_eq!(kind, Coercion::AsString),
            other => panic!("expected coercion, got {other:?}"),
        }
    }

    #[test]
    fn literal_needs_no_coercion() {
        let g = graph_with(vec![]);
        let (out, flagged) = translate("\"plain\"", Some(&AttributeType::String), &g);
        assert!(!flagged);
        assert_eq!(out, Expr::Str("plain".into()));
    }

    #[test]
    fn map_elements_coerce_individually() {
        let g = graph_with(vec![resource_node("null_resource", "a")]);
        let ty = AttributeType::Map(Box::new(AttributeType::String));
        let (out, flagged) = translate("{ id = null_resource.a.id }", Some(&ty), &g);
        assert!(flagged);
        match out {
            Expr::Map(entries) => match &entries[0].1 {
                Expr::Coerce { kind, .. } => assert_eq!(*kind, Coercion::AsString),
                other => panic!("expected coerced element, got {other:?}"),
            },
            other => panic!("expected map, got {other:?}"),
        }
    }

    #[test]
    fn splat_becomes_projection() {
        let g = graph_with(vec![resource_node("aws_subnet", "all")]);
        let (out, _) = translate("aws_subnet.all[*].id", None, &g);
        assert_eq!(
            out,
            Expr::Splat {
                target: Box::new(Expr::Ident("all".into())),
                path: vec!["id".into()]
            }
        );
    }

    #[test]
    fn reserved_roots_stay_literal() {
        let g = graph_with(vec![]);
        let (out, _) = translate("count.index", None, &g);
        assert_eq!(out, Expr::Raw("count.index".into()));
    }

    #[test]
    fn function_calls_enter_the_fn_namespace() {
        let g = graph_with(vec![NodeId::variable("xs")].into_iter().map(|id| Node {
            id: id.clone(),
            kind: NodeKind::Variable {
                name: "xs".into(),
                config: Body::builder().build(),
            },
        }).collect());
        let (out, _) = translate("length(var.xs)", None, &g);
        match out {
            Expr::FnCall { name, args } => {
                assert_eq!(name, "length");
                assert_eq!(args.len(), 1);
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn for_expression_maps_to_comprehension() {
        let g = graph_with(vec![NodeId::variable("xs")].into_iter().map(|id| Node {
            id: id.clone(),
            kind: NodeKind::Variable {
                name: "xs".into(),
                config: Body::builder().build(),
            },
        }).collect());
        let (out, _) = translate("[for s in var.xs : upper(s)]", None, &g);
        match out {
            Expr::ForList { value_var, body, .. } => {
                assert_eq!(value_var, "s");
                match *body {
                    Expr::FnCall { ref name, ref args } => {
                        assert_eq!(name, "upper");
                        assert_eq!(args[0], Expr::Ident("s".into()));
                    }
                    ref other => panic!("expected call body, got {other:?}"),
                }
            }
            other => panic!("expected list comprehension, got {other:?}"),
        }
    }

    #[test]
    fn conditional_and_arithmetic() {
        let g = graph_with(vec![]);
        let (out, _) = translate("1 + 2 > 2 ? \"a\" : \"b\"", None, &g);
        assert!(matches!(out, Expr::Conditional { .. }));
    }

    #[test]
    fn strip_indent_removes_common_prefix() {
        let text = "    line one\n      indented\n    last\n";
        assert_eq!(strip_indent(text), "line one\n  indented\nlast\n");
    }

    #[test]
    fn dynamic_block_lowers_to_iteration() {
        let g = graph_with(vec![NodeId::variable("rules")].into_iter().map(|id| Node {
            id: id.clone(),
            kind: NodeKind::Variable {
                name: "rules".into(),
                config: Body::builder().build(),
            },
        }).collect());
        let body: Body = hcl::from_str(
            r#"
            dynamic "ingress" {
              for_each = var.rules
              content {
                from_port = ingress.value.port
              }
            }
            "#,
        )
        .unwrap();
        let catalog = ProviderSchemaCatalog::default();
        let bindings = BindingsCache::new();
        let mut scope = Scope::new(&catalog, &bindings);
        let mut ctx = ExprCtx::new(&mut scope, &g);
        let props = lower_body(&body, None, &[], &mut ctx).unwrap();
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].0, "ingress");
        match &props[0].1 {
            Expr::ForList { value_var, body, .. } => {
                assert_eq!(value_var, "ingress");
                assert!(matches!(body.as_ref(), Expr::Struct(_)));
            }
            other => panic!("expected iteration, got {other:?}"),
        }
    }
}
