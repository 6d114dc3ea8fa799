use super::{Language, LanguageBackend, Lowered};
use crate::ast::{Coercion, Expr, Import, ImportOrigin, SourceFile, Stmt, UnaryOp};
use crate::error::Diagnostic;
use crate::imports::{module_dir_name, PROVIDER_IMPORT_HINT};
use crate::render::{indent_block, Rendered};
use crate::scope::pascal_case;

pub struct GoBackend;

impl LanguageBackend for GoBackend {
    fn language(&self) -> Language {
        Language::Go
    }

    fn file_extension(&self) -> &'static str {
        "go"
    }

    fn lower(&self, file: &SourceFile) -> Lowered {
        let mut r = GoRenderer {
            diagnostics: Vec::new(),
        };
        if !file.container.starts_with("cdktf.") {
            r.diagnostics.push(Diagnostic::warning(format!(
                "custom code container '{}' is not representable in Go; using a stack factory function",
                file.container
            )));
        }
        let imports = render_imports(&file.imports);
        let code = r.render_stmts(&file.stmts, 0);

        let mut all = String::new();
        if !imports.is_empty() {
            all.push_str(&imports);
            all.push('\n');
        }
        all.push_str(&format!(
            "func New{}(scope constructs.Construct, name *string) cdktf.TerraformStack {{\n",
            file.class_name
        ));
        all.push_str("\tstack := cdktf.NewTerraformStack(scope, name)\n");
        all.push_str("\t// define resources here\n");
        all.push_str(&indent_block(&code, "\t"));
        all.push_str("\treturn stack\n}\n");

        Lowered {
            rendered: Rendered { imports, code, all },
            diagnostics: r.diagnostics,
        }
    }
}

fn render_imports(imports: &[Import]) -> String {
    let mut lines = Vec::new();
    let mut hint = false;
    for import in imports {
        match import {
            Import::Constructs { .. } => {
                lines.push("\"github.com/aws/constructs-go/constructs/v10\"".to_string());
                lines.push("\"github.com/aws/jsii-runtime-go\"".to_string());
            }
            Import::Core { .. } => {
                lines.push("\"github.com/hashicorp/terraform-cdk-go/cdktf\"".to_string());
            }
            Import::Provider {
                local_name,
                comment,
                ..
            } => {
                hint = hint || comment.is_some();
                lines.push(format!(
                    "{local_name} \"cdk.tf/go/stack/generated/{local_name}\""
                ));
            }
            Import::Module { source, .. } => {
                let dir = module_dir_name(source);
                lines.push(format!("{dir} \"cdk.tf/go/stack/generated/modules/{dir}\""));
            }
        }
    }
    if lines.is_empty() {
        return String::new();
    }
    let mut out = String::new();
    if hint {
        out.push_str(&format!("// {PROVIDER_IMPORT_HINT}\n"));
    }
    out.push_str("import (\n");
    for line in lines {
        out.push_str(&format!("\t{line}\n"));
    }
    out.push_str(")\n");
    out
}

struct GoRenderer {
    diagnostics: Vec<Diagnostic>,
}

impl GoRenderer {
    fn render_stmts(&mut self, stmts: &[Stmt], indent: usize) -> String {
        let mut out = String::new();
        for stmt in stmts {
            out.push_str(&self.render_stmt(stmt, indent));
        }
        out
    }

    fn render_stmt(&mut self, stmt: &Stmt, indent: usize) -> String {
        let pad = "\t".repeat(indent);
        match stmt {
            Stmt::Const { ident, value } => {
                format!("{pad}{ident} := {}\n", self.expr(value, indent))
            }
            Stmt::NewInstance {
                ident,
                class,
                logical_id,
                props,
                leading_comment,
            } => {
                let mut out = String::new();
                if let Some(c) = leading_comment {
                    out.push_str(&format!("{pad}// {c}\n"));
                }
                out.push_str(&pad);
                if let Some(i) = ident {
                    out.push_str(&format!("{i} := "));
                }
                let package = match &class.origin {
                    ImportOrigin::Provider(p) => p.clone(),
                    ImportOrigin::Module(source) => module_dir_name(source),
                    _ => "cdktf".to_string(),
                };
                let mut args = vec!["stack".to_string()];
                if let Some(l) = logical_id {
                    args.push(format!("jsii.String({})", quoted(l)));
                }
                args.push(self.config_struct(&package, &class.name, props, indent));
                out.push_str(&format!(
                    "{package}.New{}({})\n",
                    class.name,
                    args.join(", ")
                ));
                out
            }
        }
    }

    fn config_struct(
        &mut self,
        package: &str,
        class: &str,
        props: &[(String, Expr)],
        indent: usize,
    ) -> String {
        if props.is_empty() {
            return format!("&{package}.{class}Config{{}}");
        }
        let inner_pad = "\t".repeat(indent + 1);
        let mut out = format!("&{package}.{class}Config{{\n");
        for (key, value) in props {
            out.push_str(&format!(
                "{inner_pad}{}: {},\n",
                pascal_case(key),
                self.expr(value, indent + 1)
            ));
        }
        out.push_str(&format!("{}}}", "\t".repeat(indent)));
        out
    }

    fn map_literal(&mut self, entries: &[(String, Expr)], indent: usize) -> String {
        let all_strings = entries
            .iter()
            .all(|(_, v)| matches!(v, Expr::Str(_) | Expr::Coerce { kind: Coercion::AsString, .. }));
        let value_type = if all_strings { "*string" } else { "interface{}" };
        let inner_pad = "\t".repeat(indent + 1);
        let mut out = format!("&map[string]{value_type}{{\n");
        for (key, value) in entries {
            out.push_str(&format!(
                "{inner_pad}{}: {},\n",
                quoted(key),
                self.expr(value, indent + 1)
            ));
        }
        out.push_str(&format!("{}}}", "\t".repeat(indent)));
        out
    }

    fn expr(&mut self, e: &Expr, indent: usize) -> String {
        match e {
            Expr::Null => "nil".to_string(),
            Expr::Bool(b) => format!("jsii.Bool({b})"),
            Expr::Number(n) => format!("jsii.Number({n})"),
            Expr::Str(s) => format!("jsii.String({})", quoted(s)),
            Expr::Heredoc(s) => {
                if s.contains('`') {
                    format!("jsii.String({})", quoted(s))
                } else {
                    format!("jsii.String(`{s}`)")
                }
            }
            Expr::Concat(parts) => {
                // No template strings in Go; join through the framework.
                let rendered: Vec<String> =
                    parts.iter().map(|p| self.expr(p, indent)).collect();
                format!(
                    "cdktf.Fn_Join(jsii.String(\"\"), &[]*string{{{}}})",
                    rendered.join(", ")
                )
            }
            Expr::List(items) => {
                let all_strings = items.iter().any(|i| matches!(i, Expr::Str(_)))
                    && items.iter().all(|i| matches!(i, Expr::Str(_)));
                let rendered: Vec<String> = items.iter().map(|i| self.expr(i, indent)).collect();
                if all_strings {
                    format!("&[]*string{{{}}}", rendered.join(", "))
                } else {
                    format!("&[]interface{{}}{{{}}}", rendered.join(", "))
                }
            }
            Expr::Map(entries) | Expr::Struct(entries) => self.map_literal(entries, indent),
            Expr::Ident(name) => name.clone(),
            Expr::Member { target, attr } => {
                format!("{}.{}()", self.expr(target, indent), pascal_case(attr))
            }
            Expr::Index { target, index } => {
                format!("{}[{}]", self.expr(target, indent), self.expr(index, indent))
            }
            Expr::FnCall { name, args } => {
                let rendered: Vec<String> = args.iter().map(|a| self.expr(a, indent)).collect();
                format!("cdktf.Fn_{}({})", pascal_case(name), rendered.join(", "))
            }
            Expr::Coerce { kind, expr: inner } => {
                let method = match kind {
                    Coercion::AsString => "Token_AsString",
                    Coercion::AsNumber => "Token_AsNumber",
                    Coercion::AsList => "Token_AsList",
                    Coercion::AsNumberList => "Token_AsNumberList",
                    Coercion::AsStringMap => "Token_AsStringMap",
                    Coercion::AsAny => "Token_AsAny",
                };
                format!("cdktf.{method}({})", self.expr(inner, indent))
            }
            Expr::Splat { target, path } => {
                let mut segments = vec![format!("jsii.String({})", quoted("*"))];
                segments.extend(path.iter().map(|p| format!("jsii.String({})", quoted(p))));
                format!(
                    "cdktf.PropertyAccess({}, &[]interface{{}}{{{}}})",
                    self.expr(target, indent),
                    segments.join(", ")
                )
            }
            Expr::Unary { op, expr: inner } => {
                let symbol = match op {
                    UnaryOp::Not => "!",
                    UnaryOp::Neg => "-",
                };
                format!("{symbol}{}", self.operand(inner, indent))
            }
            Expr::Binary { op, lhs, rhs } => format!(
                "{} {} {}",
                self.operand(lhs, indent),
                op.symbol(),
                self.operand(rhs, indent)
            ),
            Expr::Conditional {
                cond,
                then,
                otherwise,
            } => {
                // Go has no conditional expression; fold into a closure.
                format!(
                    "func() interface{{}} {{ if {} {{ return {} }}; return {} }}()",
                    self.expr(cond, indent),
                    self.expr(then, indent),
                    self.expr(otherwise, indent)
                )
            }
            Expr::ForList { .. } | Expr::ForMap { .. } => {
                self.diagnostics.push(Diagnostic::error(
                    "for-expressions cannot be lowered to Go; emitted a placeholder".to_string(),
                ));
                "nil /* for-expression */".to_string()
            }
            Expr::Paren(inner) => format!("({})", self.expr(inner, indent)),
            Expr::Raw(text) => text.clone(),
        }
    }

    fn operand(&mut self, e: &Expr, indent: usize) -> String {
        match e {
            Expr::Binary { .. } => format!("({})", self.expr(e, indent)),
            _ => self.expr(e, indent),
        }
    }
}

fn quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ClassRef;

    #[test]
    fn resource_uses_the_provider_package() {
        let mut r = GoRenderer {
            diagnostics: Vec::new(),
        };
        let stmt = Stmt::NewInstance {
            ident: Some("main".to_string()),
            class: ClassRef::provider("null", "NullResource"),
            logical_id: Some("a".to_string()),
            props: Vec::new(),
            leading_comment: None,
        };
        assert_eq!(
            r.render_stmt(&stmt, 0),
            "main := null.NewNullResource(stack, jsii.String(\"a\"), &null.NullResourceConfig{})\n"
        );
    }

    #[test]
    fn for_expressions_are_error_diagnostics() {
        let mut r = GoRenderer {
            diagnostics: Vec::new(),
        };
        let e = Expr::ForList {
            value_var: "v".to_string(),
            key_var: None,
            collection: Box::new(Expr::Ident("xs".to_string())),
            cond: None,
            body: Box::new(Expr::Ident("v".to_string())),
        };
        assert_eq!(r.expr(&e, 0), "nil /* for-expression */");
        assert_eq!(r.diagnostics.len(), 1);
        assert_eq!(
            r.diagnostics[0].severity,
            crate::error::Severity::Error
        );
    }

    #[test]
    fn strings_wrap_in_jsii() {
        let mut r = GoRenderer {
            diagnostics: Vec::new(),
        };
        assert_eq!(r.expr(&Expr::Str("x".into()), 0), "jsii.String(\"x\")");
        assert_eq!(
            r.expr(&Expr::Number(hcl::Number::from(3)), 0),
            "jsii.Number(3)"
        );
    }
}
