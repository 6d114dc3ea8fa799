//! Serialization of the framed AST into the reference target language
//! (TypeScript). Other backends consume the same AST; this one defines the
//! layout conventions: two-space indent, one declaration per statement,
//! multi-line property objects.

use crate::ast::{Expr, Import, SourceFile, Stmt};
use crate::imports::{base_class, module_import_path, CODE_MARKER};
use crate::scope::camel_case;

#[derive(Debug, Clone, Default)]
pub struct Rendered {
    pub imports: String,
    pub code: String,
    pub all: String,
}

pub fn render_typescript(file: &SourceFile) -> Rendered {
    let imports = render_imports(&file.imports);
    let code = render_stmts(&file.stmts, 0);

    let mut all = String::new();
    if !imports.is_empty() {
        all.push_str(&imports);
        all.push('\n');
    }
    all.push_str(&format!(
        "class {} extends {} {{\n",
        file.class_name,
        base_class(&file.container)
    ));
    all.push_str("  constructor(scope: Construct, name: string) {\n");
    all.push_str("    super(scope, name);\n");
    all.push_str(&format!("    {CODE_MARKER}\n"));
    all.push_str(&indent_block(&code, "    "));
    all.push_str("  }\n}\n");

    Rendered { imports, code, all }
}

/// Shift every non-empty line of an already-rendered block by `pad`. Lines
/// inside a block all derive their leading whitespace from the same base
/// indent, so shifting the block is equivalent to rendering it deeper.
pub fn indent_block(text: &str, pad: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        if line.trim().is_empty() {
            out.push_str(line);
        } else {
            out.push_str(pad);
            out.push_str(line);
        }
    }
    out
}

fn render_imports(imports: &[Import]) -> String {
    let mut out = String::new();
    for import in imports {
        match import {
            Import::Constructs { symbols } => {
                out.push_str(&format!(
                    "import {{ {} }} from \"constructs\";\n",
                    symbols.join(", ")
                ));
            }
            Import::Core { symbols } => {
                out.push_str(&format!(
                    "import {{ {} }} from \"cdktf\";\n",
                    symbols.join(", ")
                ));
            }
            Import::Provider {
                local_name,
                symbols,
                comment,
            } => {
                if let Some(c) = comment {
                    out.push_str(&format!("/*{c}*/\n"));
                }
                out.push_str(&format!(
                    "import {{ {} }} from \"./.gen/providers/{local_name}\";\n",
                    symbols.join(", ")
                ));
            }
            Import::Module { class, source } => {
                out.push_str(&format!(
                    "import {{ {class} }} from \"{}\";\n",
                    module_import_path(source)
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
        Stmt::Const { ident, value } => {
            format!("{pad}const {ident} = {};\n", expr(value, indent))
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
                out.push_str(&format!("{pad}/*{c}*/\n"));
            }
            if let Some(i) = ident {
                out.push_str(&format!("{pad}const {i} = "));
            } else {
                out.push_str(&pad);
            }
            let mut args = vec!["this".to_string()];
            if let Some(l) = logical_id {
                args.push(string_literal(l));
            }
            args.push(object_literal(props, indent, false));
            out.push_str(&format!("new {}({});\n", class.name, args.join(", ")));
            out
        }
    }
}

fn object_literal(entries: &[(String, Expr)], indent: usize, verbatim_keys: bool) -> String {
    if entries.is_empty() {
        return "{}".to_string();
    }
    let inner_pad = " ".repeat(indent + 2);
    let mut out = String::from("{\n");
    for (key, value) in entries {
        let rendered_key = if verbatim_keys {
            string_literal(key)
        } else {
            camel_case(key)
        };
        out.push_str(&format!(
            "{inner_pad}{rendered_key}: {},\n",
            expr(value, indent + 2)
        ));
    }
    out.push_str(&format!("{}}}", " ".repeat(indent)));
    out
}

fn expr(e: &Expr, indent: usize) -> String {
    match e {
        Expr::Null => "null".to_string(),
        Expr::Bool(b) => b.to_string(),
        Expr::Number(n) => n.to_string(),
        Expr::Str(s) => string_literal(s),
        Expr::Heredoc(s) => template_literal_text(s),
        Expr::Concat(parts) => {
            let mut out = String::from("`");
            for part in parts {
                match part {
                    Expr::Str(s) | Expr::Heredoc(s) => out.push_str(&escape_template(s)),
                    other => out.push_str(&format!("${{{}}}", expr(other, indent))),
                }
            }
            out.push('`');
            out
        }
        Expr::List(items) => {
            if items
                .iter()
                .any(|i| matches!(i, Expr::Map(_) | Expr::Struct(_)))
            {
                let inner_pad = " ".repeat(indent + 2);
                let mut out = String::from("[\n");
                for item in items {
                    out.push_str(&format!("{inner_pad}{},\n", expr(item, indent + 2)));
                }
                out.push_str(&format!("{}]", " ".repeat(indent)));
                out
            } else {
                let rendered: Vec<String> = items.iter().map(|i| expr(i, indent)).collect();
                format!("[{}]", rendered.join(", "))
            }
        }
        Expr::Map(entries) => object_literal(entries, indent, true),
        Expr::Struct(entries) => object_literal(entries, indent, false),
        Expr::Ident(name) => name.clone(),
        Expr::Member { target, attr } => format!("{}.{}", expr(target, indent), camel_case(attr)),
        Expr::Index { target, index } => {
            format!("{}[{}]", expr(target, indent), expr(index, indent))
        }
        Expr::FnCall { name, args } => {
            let rendered: Vec<String> = args.iter().map(|a| expr(a, indent)).collect();
            format!("Fn.{}({})", camel_case(name), rendered.join(", "))
        }
        Expr::Coerce { kind, expr: inner } => {
            format!("Token.{}({})", kind.method(), expr(inner, indent))
        }
        Expr::Splat { target, path } => {
            let mut segments = vec![string_literal("*")];
            segments.extend(path.iter().map(|p| string_literal(p)));
            format!(
                "propertyAccess({}, [{}])",
                expr(target, indent),
                segments.join(", ")
            )
        }
        Expr::Unary { op, expr: inner } => {
            let symbol = match op {
                crate::ast::UnaryOp::Not => "!",
                crate::ast::UnaryOp::Neg => "-",
            };
            format!("{symbol}{}", operand(inner, indent))
        }
        Expr::Binary { op, lhs, rhs } => {
            format!(
                "{} {} {}",
                operand(lhs, indent),
                op.symbol(),
                operand(rhs, indent)
            )
        }
        Expr::Conditional {
            cond,
            then,
            otherwise,
        } => format!(
            "{} ? {} : {}",
            operand(cond, indent),
            operand(then, indent),
            operand(otherwise, indent)
        ),
        Expr::ForList {
            value_var,
            key_var,
            collection,
            cond,
            body,
        } => {
            let (source, params) = match key_var {
                Some(k) => (
                    format!("Object.entries({})", expr(collection, indent)),
                    format!("([{k}, {value_var}])"),
                ),
                None => (expr(collection, indent), format!("({value_var})")),
            };
            let filtered = match cond {
                Some(c) => format!("{source}.filter({params} => {})", expr(c, indent)),
                None => source,
            };
            format!("{filtered}.map({params} => {})", expr(body, indent))
        }
        Expr::ForMap {
            value_var,
            key_var,
            collection,
            cond,
            key,
            value,
        } => {
            let (source, params) = match key_var {
                Some(k) => (
                    format!("Object.entries({})", expr(collection, indent)),
                    format!("([{k}, {value_var}])"),
                ),
                None => (expr(collection, indent), format!("({value_var})")),
            };
            let filtered = match cond {
                Some(c) => format!("{source}.filter({params} => {})", expr(c, indent)),
                None => source,
            };
            format!(
                "Object.fromEntries({filtered}.map({params} => [{}, {}]))",
                expr(key, indent),
                expr(value, indent)
            )
        }
        Expr::Paren(inner) => format!("({})", expr(inner, indent)),
        Expr::Raw(text) => text.clone(),
    }
}

/// Operands of operators get parenthesized when they are operators
/// themselves, so the printed precedence matches the parsed one.
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

fn template_literal_text(s: &str) -> String {
    format!("`{}`", escape_template(s))
}

fn escape_template(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('`', "\\`")
        .replace("${", "\\${")
}
