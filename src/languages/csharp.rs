use super::{Language, LanguageBackend, Lowered};
use crate::ast::{Coercion, Expr, Import, SourceFile, Stmt, UnaryOp};
use crate::error::Diagnostic;
use crate::imports::{base_class, module_dir_name, PROVIDER_IMPORT_HINT};
use crate::render::{indent_block, Rendered};
use crate::scope::{camel_case, pascal_case};

pub struct CSharpBackend;

impl LanguageBackend for CSharpBackend {
    fn language(&self) -> Language {
        Language::CSharp
    }

    fn file_extension(&self) -> &'static str {
        "cs"
    }

    fn lower(&self, file: &SourceFile) -> Lowered {
        let mut r = CSharpRenderer {
            diagnostics: Vec::new(),
        };
        let imports = r.render_imports(&file.imports, !file.stmts.is_empty());
        let code = r.render_stmts(&file.stmts, 0);

        let mut all = String::new();
        if !imports.is_empty() {
            all.push_str(&imports);
            all.push('\n');
        }
        all.push_str(&format!(
            "class {} : {}\n{{\n",
            file.class_name,
            base_class(&file.container)
        ));
        all.push_str(&format!(
            "    public {}(Construct scope, string name) : base(scope, name)\n    {{\n",
            file.class_name
        ));
        all.push_str("        // define resources here\n");
        all.push_str(&indent_block(&code, "        "));
        all.push_str("    }\n}\n");

        Lowered {
            rendered: Rendered { imports, code, all },
            diagnostics: r.diagnostics,
        }
    }
}

struct CSharpRenderer {
    diagnostics: Vec<Diagnostic>,
}

impl CSharpRenderer {
    fn render_imports(&mut self, imports: &[Import], has_code: bool) -> String {
        let mut out = String::new();
        for import in imports {
            match import {
                Import::Constructs { .. } => out.push_str("using Constructs;\n"),
                Import::Core { .. } => out.push_str("using HashiCorp.Cdktf;\n"),
                Import::Provider {
                    local_name,
                    comment,
                    ..
                } => {
                    if comment.is_some() {
                        out.push_str(&format!("// {PROVIDER_IMPORT_HINT}\n"));
                    }
                    out.push_str(&format!("using Gen.Providers.{};\n", pascal_case(local_name)));
                }
                Import::Module { source, .. } => {
                    out.push_str(&format!(
                        "using Gen.Modules.{};\n",
                        pascal_case(&module_dir_name(source))
                    ));
                }
            }
        }
        if has_code {
            out.push_str("using System.Collections.Generic;\n");
            out.push_str("using System.Linq;\n");
        }
        out
    }

    fn render_stmts(&mut self, stmts: &[Stmt], indent: usize) -> String {
        let mut out = String::new();
        for stmt in stmts {
            out.push_str(&self.render_stmt(stmt, indent));
        }
        out
    }

    fn render_stmt(&mut self, stmt: &Stmt, indent: usize) -> String {
        let pad = " ".repeat(indent);
        match stmt {
            Stmt::Const { ident, value } => {
                format!("{pad}var {ident} = {};\n", self.expr(value, indent))
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
                    out.push_str(&format!("var {i} = "));
                }
                let mut args = vec!["this".to_string()];
                if let Some(l) = logical_id {
                    args.push(string_literal(l));
                }
                if props.is_empty() {
                    out.push_str(&format!("new {}({});\n", class.name, args.join(", ")));
                } else {
                    args.push(self.config_object(&class.name, props, indent));
                    out.push_str(&format!("new {}({});\n", class.name, args.join(", ")));
                }
                out
            }
        }
    }

    fn config_object(&mut self, class: &str, props: &[(String, Expr)], indent: usize) -> String {
        let inner_pad = " ".repeat(indent + 4);
        let mut out = format!("new {class}Config {{\n");
        for (key, value) in props {
            out.push_str(&format!(
                "{inner_pad}{} = {},\n",
                pascal_case(key),
                self.expr(value, indent + 4)
            ));
        }
        out.push_str(&format!("{}}}", " ".repeat(indent)));
        out
    }

    fn dictionary(&mut self, entries: &[(String, Expr)], indent: usize, attribute_keys: bool) -> String {
        if entries.is_empty() {
            return "new Dictionary<string, object> {}".to_string();
        }
        let inner_pad = " ".repeat(indent + 4);
        let mut out = String::from("new Dictionary<string, object> {\n");
        for (key, value) in entries {
            let key = if attribute_keys {
                string_literal(&camel_case(key))
            } else {
                string_literal(key)
            };
            out.push_str(&format!(
                "{inner_pad}{{ {key}, {} }},\n",
                self.expr(value, indent + 4)
            ));
        }
        out.push_str(&format!("{}}}", " ".repeat(indent)));
        out
    }

    fn expr(&mut self, e: &Expr, indent: usize) -> String {
        match e {
            Expr::Null => "null".to_string(),
            Expr::Bool(b) => b.to_string(),
            Expr::Number(n) => n.to_string(),
            Expr::Str(s) => string_literal(s),
            Expr::Heredoc(s) => string_literal(s),
            Expr::Concat(parts) => {
                let mut out = String::from("$\"");
                for part in parts {
                    match part {
                        Expr::Str(s) | Expr::Heredoc(s) => {
                            out.push_str(&escape_interpolated(s))
                        }
                        other => out.push_str(&format!("{{{}}}", self.expr(other, indent))),
                    }
                }
                out.push('"');
                out
            }
            Expr::List(items) => {
                let rendered: Vec<String> = items.iter().map(|i| self.expr(i, indent)).collect();
                format!("new [] {{ {} }}", rendered.join(", "))
            }
            Expr::Map(entries) => self.dictionary(entries, indent, false),
            Expr::Struct(entries) => self.dictionary(entries, indent, true),
            Expr::Ident(name) => camel_case(name),
            Expr::Member { target, attr } => {
                format!("{}.{}", self.expr(target, indent), pascal_case(attr))
            }
            Expr::Index { target, index } => {
                format!("{}[{}]", self.expr(target, indent), self.expr(index, indent))
            }
            Expr::FnCall { name, args } => {
                let rendered: Vec<String> = args.iter().map(|a| self.expr(a, indent)).collect();
                format!("Fn.{}({})", pascal_case(name), rendered.join(", "))
            }
            Expr::Coerce { kind, expr: inner } => {
                let method = match kind {
                    Coercion::AsString => "AsString",
                    Coercion::AsNumber => "AsNumber",
                    Coercion::AsList => "AsList",
                    Coercion::AsNumberList => "AsNumberList",
                    Coercion::AsStringMap => "AsStringMap",
                    Coercion::AsAny => "AsAny",
                };
                format!("Token.{method}({})", self.expr(inner, indent))
            }
            Expr::Splat { target, path } => {
                let mut segments = vec![string_literal("*")];
                segments.extend(path.iter().map(|p| string_literal(p)));
                format!(
                    "Fn.PropertyAccess({}, new [] {{ {} }})",
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
            } => format!(
                "{} ? {} : {}",
                self.operand(cond, indent),
                self.operand(then, indent),
                self.operand(otherwise, indent)
            ),
            Expr::ForList {
                value_var,
                key_var,
                collection,
                cond,
                body,
            } => {
                if key_var.is_some() {
                    self.diagnostics.push(Diagnostic::warning(
                        "keyed for-expression has no direct C# form; approximated over values",
                    ));
                }
                let source = self.expr(collection, indent);
                let filtered = match cond {
                    Some(c) => {
                        let cond = self.expr(c, indent);
                        format!("{source}.Where({value_var} => {cond})")
                    }
                    None => source,
                };
                format!(
                    "{filtered}.Select({value_var} => {}).ToList()",
                    self.expr(body, indent)
                )
            }
            Expr::ForMap { .. } => {
                self.diagnostics.push(Diagnostic::warning(
                    "object for-expression has no direct C# form; emitted a placeholder",
                ));
                "null /* object for-expression */".to_string()
            }
            Expr::Paren(inner) => format!("({})", self.expr(inner, indent)),
            Expr::Raw(text) => text.clone(),
        }
    }

    fn operand(&mut self, e: &Expr, indent: usize) -> String {
        match e {
            Expr::Binary { .. } | Expr::Conditional { .. } => {
                format!("({})", self.expr(e, indent))
            }
            _ => self.expr(e, indent),
        }
    }
}

fn string_literal(s: &str) -> String {
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

fn escape_interpolated(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('{', "{{")
        .replace('}', "}}")
        .replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ClassRef;

    #[test]
    fn props_go_through_a_config_object() {
        let mut r = CSharpRenderer {
            diagnostics: Vec::new(),
        };
        let stmt = Stmt::NewInstance {
            ident: Some("main".to_string()),
            class: ClassRef::provider("aws", "AwsVpc"),
            logical_id: Some("main".to_string()),
            props: vec![("cidr_block".to_string(), Expr::Str("10.0.0.0/16".into()))],
            leading_comment: None,
        };
        let rendered = r.render_stmt(&stmt, 0);
        assert!(rendered.contains("new AwsVpc(this, \"main\", new AwsVpcConfig {"));
        assert!(rendered.contains("CidrBlock = \"10.0.0.0/16\","));
    }

    #[test]
    fn empty_props_skip_the_config_object() {
        let mut r = CSharpRenderer {
            diagnostics: Vec::new(),
        };
        let stmt = Stmt::NewInstance {
            ident: None,
            class: ClassRef::provider("null", "NullResource"),
            logical_id: Some("a".to_string()),
            props: Vec::new(),
            leading_comment: None,
        };
        assert_eq!(
            r.render_stmt(&stmt, 0),
            "new NullResource(this, \"a\");\n"
        );
    }
}
