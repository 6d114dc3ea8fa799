use super::{Language, LanguageBackend, Lowered};
use crate::ast::{Coercion, Expr, Import, SourceFile, Stmt, UnaryOp};
use crate::imports::{base_class, module_dir_name, PROVIDER_IMPORT_HINT};
use crate::render::Rendered;
use crate::scope::snake_case;

pub struct PythonBackend;

impl LanguageBackend for PythonBackend {
    fn language(&self) -> Language {
        Language::Python
    }

    fn file_extension(&self) -> &'static str {
        "py"
    }

    fn lower(&self, file: &SourceFile) -> Lowered {
        let imports = render_imports(&file.imports);
        let code = render_stmts(&file.stmts, 0);

        let mut all = String::new();
        if !imports.is_empty() {
            all.push_str(&imports);
            all.push('\n');
        }
        all.push_str(&format!(
            "class {}({}):\n",
            file.class_name,
            base_class(&file.container)
        ));
        all.push_str("    def __init__(self, scope, name):\n");
        all.push_str("        super().__init__(scope, name)\n");
        all.push_str("        # define resources here\n");
        all.push_str(&crate::render::indent_block(&code, "        "));

        Lowered {
            rendered: Rendered { imports, code, all },
            diagnostics: Vec::new(),
        }
    }
}

fn render_imports(imports: &[Import]) -> String {
    let mut out = String::new();
    for import in imports {
        match import {
            Import::Constructs { symbols } => {
                out.push_str(&format!("from constructs import {}\n", symbols.join(", ")));
            }
            Import::Core { symbols } => {
                // Helper functions keep their snake-case spelling.
                let symbols: Vec<String> = symbols
                    .iter()
                    .map(|s| {
                        if s.chars().next().is_some_and(|c| c.is_lowercase()) {
                            snake_case(s)
                        } else {
                            s.clone()
                        }
                    })
                    .collect();
                out.push_str(&format!("from cdktf import {}\n", symbols.join(", ")));
            }
            Import::Provider {
                local_name,
                symbols,
                comment,
            } => {
                if comment.is_some() {
                    out.push_str(&format!("# {PROVIDER_IMPORT_HINT}\n"));
                }
                out.push_str(&format!(
                    "from imports.{local_name} import {}\n",
                    symbols.join(", ")
                ));
            }
            Import::Module { class, source } => {
                out.push_str(&format!(
                    "from imports.{} import {class}\n",
                    snake_case(&module_dir_name(source))
                ));
            }
        }
    }
    out
}

fn render_stmts(stmts: &[Stmt], indent: usize) -> String {
    let mut out = String::new();
    for stmt in stmts {
        out.push_str(&render_stmt(stmt, indent));
    }
    out
}

fn render_stmt(stmt: &Stmt, indent: usize) -> String {
    let pad = " ".repeat(indent);
    match stmt {
        Stmt::Const { ident, value } => format!("{pad}{ident} = {}\n", expr(value, indent)),
        Stmt::NewInstance {
            ident,
            class,
            logical_id,
            props,
            leading_comment,
        } => {
            let mut out = String::new();
            if let Some(c) = leading_comment {
                out.push_str(&format!("{pad}# {c}\n"));
            }
            out.push_str(&pad);
            if let Some(i) = ident {
                out.push_str(&format!("{i} = "));
            }
            let mut head = format!("{}(self", class.name);
            if let Some(l) = logical_id {
                head.push_str(&format!(", {}", string_literal(l)));
            }
            if props.is_empty() {
                out.push_str(&format!("{head})\n"));
            } else {
                out.push_str(&format!("{head},\n"));
                let arg_pad = " ".repeat(indent + 4);
                for (key, value) in props {
                    out.push_str(&format!(
                        "{arg_pad}{}={},\n",
                        snake_case(key),
                        expr(value, indent + 4)
                    ));
                }
                out.push_str(&format!("{pad})\n"));
            }
            out
        }
    }
}

fn dict_literal(entries: &[(String, Expr)], indent: usize, attribute_keys: bool) -> String {
    if entries.is_empty() {
        return "{}".to_string();
    }
    let inner_pad = " ".repeat(indent + 4);
    let mut out = String::from("{\n");
    for (key, value) in entries {
        let key = if attribute_keys {
            string_literal(&snake_case(key))
        } else {
            string_literal(key)
        };
        out.push_str(&format!("{inner_pad}{key}: {},\n", expr(value, indent + 4)));
    }
    out.push_str(&format!("{}}}", " ".repeat(indent)));
    out
}

fn expr(e: &Expr, indent: usize) -> String {
    match e {
        Expr::Null => "None".to_string(),
        Expr::Bool(true) => "True".to_string(),
        Expr::Bool(false) => "False".to_string(),
        Expr::Number(n) => n.to_string(),
        Expr::Str(s) => string_literal(s),
        Expr::Heredoc(s) => format!("\"\"\"{s}\"\"\""),
        Expr::Concat(parts) => {
            let mut out = String::from("f\"");
            for part in parts {
                match part {
                    Expr::Str(s) | Expr::Heredoc(s) => {
                        out.push_str(&escape_fstring_literal(s));
                    }
                    other => out.push_str(&format!("{{{}}}", expr(other, indent))),
                }
            }
            out.push('"');
            out
        }
        Expr::List(items) => {
            let rendered: Vec<String> = items.iter().map(|i| expr(i, indent)).collect();
            format!("[{}]", rendered.join(", "))
        }
        Expr::Map(entries) => dict_literal(entries, indent, false),
        Expr::Struct(entries) => dict_literal(entries, indent, true),
        Expr::Ident(name) => snake_case(name),
        Expr::Member { target, attr } => {
            format!("{}.{}", expr(target, indent), snake_case(attr))
        }
        Expr::Index { target, index } => {
            format!("{}[{}]", expr(target, indent), expr(index, indent))
        }
        Expr::FnCall { name, args } => {
            let rendered: Vec<String> = args.iter().map(|a| expr(a, indent)).collect();
            format!("Fn.{}({})", snake_case(name), rendered.join(", "))
        }
        Expr::Coerce { kind, expr: inner } => {
            let method = match kind {
                Coercion::AsString => "as_string",
                Coercion::AsNumber => "as_number",
                Coercion::AsList => "as_list",
                Coercion::AsNumberList => "as_number_list",
                Coercion::AsStringMap => "as_string_map",
                Coercion::AsAny => "as_any",
            };
            format!("Token.{method}({})", expr(inner, indent))
        }
        Expr::Splat { target, path } => {
            let mut segments = vec![string_literal("*")];
            segments.extend(path.iter().map(|p| string_literal(p)));
            format!(
                "property_access({}, [{}])",
                expr(target, indent),
                segments.join(", ")
            )
        }
        Expr::Unary { op, expr: inner } => match op {
            UnaryOp::Not => format!("not {}", operand(inner, indent)),
            UnaryOp::Neg => format!("-{}", operand(inner, indent)),
        },
        Expr::Binary { op, lhs, rhs } => {
            let symbol = match op {
                crate::ast::BinaryOp::And => "and",
                crate::ast::BinaryOp::Or => "or",
                other => other.symbol(),
            };
            format!(
                "{} {} {}",
                operand(lhs, indent),
                symbol,
                operand(rhs, indent)
            )
        }
        Expr::Conditional {
            cond,
            then,
            otherwise,
        } => format!(
            "{} if {} else {}",
            operand(then, indent),
            operand(cond, indent),
            operand(otherwise, indent)
        ),
        Expr::ForList {
            value_var,
            key_var,
            collection,
            cond,
            body,
        } => {
            let iterator = match key_var {
                Some(k) => format!("for {k}, {value_var} in {}.items()", expr(collection, indent)),
                None => format!("for {value_var} in {}", expr(collection, indent)),
            };
            let filter = match cond {
                Some(c) => format!(" if {}", expr(c, indent)),
                None => String::new(),
            };
            format!("[{} {iterator}{filter}]", expr(body, indent))
        }
        Expr::ForMap {
            value_var,
            key_var,
            collection,
            cond,
            key,
            value,
        } => {
            let iterator = match key_var {
                Some(k) => format!("for {k}, {value_var} in {}.items()", expr(collection, indent)),
                None => format!("for {value_var} in {}", expr(collection, indent)),
            };
            let filter = match cond {
                Some(c) => format!(" if {}", expr(c, indent)),
                None => String::new(),
            };
            format!(
                "{{{}: {} {iterator}{filter}}}",
                expr(key, indent),
                expr(value, indent)
            )
        }
        Expr::Paren(inner) => format!("({})", expr(inner, indent)),
        Expr::Raw(text) => text.clone(),
    }
}

fn operand(e: &Expr, indent: usize) -> String {
    match e {
        Expr::Binary { .. } | Expr::Conditional { .. } => format!("({})", expr(e, indent)),
        _ => expr(e, indent),
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

fn escape_fstring_literal(s: &str) -> String {
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
    fn renders_keyword_arguments() {
        let stmt = Stmt::NewInstance {
            ident: Some("main".to_string()),
            class: ClassRef::provider("aws", "AwsVpc"),
            logical_id: Some("main".to_string()),
            props: vec![("cidr_block".to_string(), Expr::Str("10.0.0.0/16".into()))],
            leading_comment: None,
        };
        let rendered = render_stmt(&stmt, 0);
        assert!(rendered.starts_with("main = AwsVpc(self, \"main\",\n"));
        assert!(rendered.contains("    cidr_block=\"10.0.0.0/16\",\n"));
    }

    #[test]
    fn conditionals_flip_to_python_order() {
        let e = Expr::Conditional {
            cond: Box::new(Expr::Ident("ok".into())),
            then: Box::new(Expr::Str("a".into())),
            otherwise: Box::new(Expr::Str("b".into())),
        };
        assert_eq!(expr(&e, 0), "\"a\" if ok else \"b\"");
    }

    #[test]
    fn coercion_uses_snake_methods() {
        let e = Expr::Coerce {
            kind: Coercion::AsString,
            expr: Box::new(Expr::Ident("x".into())),
        };
        assert_eq!(expr(&e, 0), "Token.as_string(x)");
    }
}
