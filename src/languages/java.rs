use super::{Language, LanguageBackend, Lowered};
use crate::ast::{Coercion, Expr, Import, SourceFile, Stmt, UnaryOp};
use crate::error::Diagnostic;
use crate::imports::{base_class, module_dir_name, PROVIDER_IMPORT_HINT};
use crate::render::Rendered;
use crate::scope::{camel_case, pascal_case, snake_case};

pub struct JavaBackend;

/// Package segments that collide with Java keywords get a suffix.
const JAVA_RESERVED: &[&str] = &["null", "class", "new", "import", "package", "int", "do"];

impl LanguageBackend for JavaBackend {
    fn language(&self) -> Language {
        Language::Java
    }

    fn file_extension(&self) -> &'static str {
        "java"
    }

    fn lower(&self, file: &SourceFile) -> Lowered {
        let mut r = JavaRenderer {
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
            "public class {} extends {} {{\n",
            file.class_name,
            base_class(&file.container)
        ));
        all.push_str(&format!(
            "    public {}(final Construct scope, final String name) {{\n",
            file.class_name
        ));
        all.push_str("        super(scope, name);\n");
        all.push_str("        // define resources here\n");
        all.push_str(&crate::render::indent_block(&code, "        "));
        all.push_str("    }\n}\n");

        Lowered {
            rendered: Rendered { imports, code, all },
            diagnostics: r.diagnostics,
        }
    }
}

fn package_segment(name: &str) -> String {
    let safe = snake_case(name);
    if JAVA_RESERVED.contains(&safe.as_str()) {
        format!("{safe}_provider")
    } else {
        safe
    }
}

struct JavaRenderer {
    diagnostics: Vec<Diagnostic>,
}

impl JavaRenderer {
    fn render_imports(&mut self, imports: &[Import], has_code: bool) -> String {
        let mut out = String::new();
        for import in imports {
            match import {
                Import::Constructs { .. } => {
                    out.push_str("import software.constructs.Construct;\n");
                }
                Import::Core { symbols } => {
                    let mut fn_imported = false;
                    for sym in symbols {
                        // Helper functions live on the Fn class.
                        if sym.chars().next().is_some_and(|c| c.is_lowercase()) {
                            if !fn_imported && !symbols.contains(&"Fn".to_string()) {
                                out.push_str("import com.hashicorp.cdktf.Fn;\n");
                                fn_imported = true;
                            }
                        } else {
                            out.push_str(&format!("import com.hashicorp.cdktf.{sym};\n"));
                        }
                    }
                }
                Import::Provider {
                    local_name,
                    symbols,
                    comment,
                } => {
                    if comment.is_some() {
                        out.push_str(&format!("// {PROVIDER_IMPORT_HINT}\n"));
                    }
                    for sym in symbols {
                        out.push_str(&format!(
                            "import imports.{}.{sym};\n",
                            package_segment(local_name)
                        ));
                    }
                }
                Import::Module { class, source } => {
                    out.push_str(&format!(
                        "import imports.{}.{class};\n",
                        package_segment(&module_dir_name(source))
                    ));
                }
            }
        }
        if has_code {
            out.push_str("import java.util.*;\n");
            out.push_str("import java.util.stream.*;\n");
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
                match logical_id {
                    Some(l) => {
                        // Named constructs go through the generated builder.
                        out.push_str(&format!(
                            "{}.Builder.create(this, {})",
                            class.name,
                            string_literal(l)
                        ));
                        let arg_pad = " ".repeat(indent + 8);
                        for (key, value) in props {
                            out.push_str(&format!(
                                "\n{arg_pad}.{}({})",
                                camel_case(key),
                                self.expr(value, indent + 8)
                            ));
                        }
                        out.push_str(&format!("\n{arg_pad}.build();\n"));
                    }
                    None => {
                        out.push_str(&format!(
                            "new {}(this, {}Config.builder()",
                            class.name, class.name
                        ));
                        let arg_pad = " ".repeat(indent + 8);
                        for (key, value) in props {
                            out.push_str(&format!(
                                "\n{arg_pad}.{}({})",
                                camel_case(key),
                                self.expr(value, indent + 8)
                            ));
                        }
                        out.push_str(&format!("\n{arg_pad}.build());\n"));
                    }
                }
                out
            }
        }
    }

    fn map_literal(&mut self, entries: &[(String, Expr)], indent: usize, attribute_keys: bool) -> String {
        let rendered: Vec<String> = entries
            .iter()
            .map(|(k, v)| {
                let key = if attribute_keys {
                    string_literal(&camel_case(k))
                } else {
                    string_literal(k)
                };
                format!("{key}, {}", self.expr(v, indent))
            })
            .collect();
        format!("Map.of({})", rendered.join(", "))
    }

    fn expr(&mut self, e: &Expr, indent: usize) -> String {
        match e {
            Expr::Null => "null".to_string(),
            Expr::Bool(b) => b.to_string(),
            Expr::Number(n) => n.to_string(),
            Expr::Str(s) => string_literal(s),
            Expr::Heredoc(s) => string_literal(s),
            Expr::Concat(parts) => {
                let rendered: Vec<String> = parts
                    .iter()
                    .map(|p| match p {
                        Expr::Str(s) | Expr::Heredoc(s) => string_literal(s),
                        other => self.expr(other, indent),
                    })
                    .collect();
                rendered.join(" + ")
            }
            Expr::List(items) => {
                let rendered: Vec<String> = items.iter().map(|i| self.expr(i, indent)).collect();
                format!("List.of({})", rendered.join(", "))
            }
            Expr::Map(entries) => self.map_literal(entries, indent, false),
            Expr::Struct(entries) => self.map_literal(entries, indent, true),
            Expr::Ident(name) => camel_case(name),
            Expr::Member { target, attr } => format!(
                "{}.get{}()",
                self.expr(target, indent),
                pascal_case(attr)
            ),
            Expr::Index { target, index } => format!(
                "{}.get({})",
                self.expr(target, indent),
                self.expr(index, indent)
            ),
            Expr::FnCall { name, args } => {
                let rendered: Vec<String> = args.iter().map(|a| self.expr(a, indent)).collect();
                format!("Fn.{}({})", camel_case(name), rendered.join(", "))
            }
            Expr::Coerce { kind, expr: inner } => {
                let method = match kind {
                    Coercion::AsString => "asString",
                    Coercion::AsNumber => "asNumber",
                    Coercion::AsList => "asList",
                    Coercion::AsNumberList => "asNumberList",
                    Coercion::AsStringMap => "asStringMap",
                    Coercion::AsAny => "asAny",
                };
                format!("Token.{method}({})", self.expr(inner, indent))
            }
            Expr::Splat { target, path } => {
                let mut segments = vec![string_literal("*")];
                segments.extend(path.iter().map(|p| string_literal(p)));
                format!(
                    "Fn.propertyAccess({}, List.of({}))",
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
                        "keyed for-expression has no direct Java form; approximated over values",
                    ));
                }
                let source = self.expr(collection, indent);
                let filtered = match cond {
                    Some(c) => {
                        let cond = self.expr(c, indent);
                        format!("{source}.stream().filter({value_var} -> {cond})")
                    }
                    None => format!("{source}.stream()"),
                };
                format!(
                    "{filtered}.map({value_var} -> {}).collect(Collectors.toList())",
                    self.expr(body, indent)
                )
            }
            Expr::ForMap { .. } => {
                self.diagnostics.push(Diagnostic::warning(
                    "object for-expression has no direct Java form; emitted a placeholder",
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ClassRef;

    #[test]
    fn named_constructs_use_the_builder() {
        let mut r = JavaRenderer {
            diagnostics: Vec::new(),
        };
        let stmt = Stmt::NewInstance {
            ident: Some("main".to_string()),
            class: ClassRef::provider("null", "NullResource"),
            logical_id: Some("a".to_string()),
            props: Vec::new(),
            leading_comment: None,
        };
        let rendered = r.render_stmt(&stmt, 0);
        assert!(rendered.contains("NullResource.Builder.create(this, \"a\")"));
        assert!(rendered.contains(".build();"));
    }

    #[test]
    fn reserved_package_names_get_a_suffix() {
        assert_eq!(package_segment("null"), "null_provider");
        assert_eq!(package_segment("aws"), "aws");
    }

    #[test]
    fn object_for_expression_reports_a_diagnostic() {
        let mut r = JavaRenderer {
            diagnostics: Vec::new(),
        };
        let e = Expr::ForMap {
            value_var: "v".to_string(),
            key_var: None,
            collection: Box::new(Expr::Ident("xs".to_string())),
            cond: None,
            key: Box::new(Expr::Ident("v".to_string())),
            value: Box::new(Expr::Ident("v".to_string())),
        };
        let _ = r.expr(&e, 0);
        assert_eq!(r.diagnostics.len(), 1);
    }
}
