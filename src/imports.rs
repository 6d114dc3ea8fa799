//! Import planning: compute the minimal import set from what the emitted
//! statements actually use.

use indexmap::{IndexMap, IndexSet};

use crate::ast::{visit_exprs, ClassRef, Expr, Import, ImportOrigin, Stmt};
use crate::scope::pascal_case;

/// Comment attached to the first provider import.
pub const PROVIDER_IMPORT_HINT: &str = "Provider bindings are generated by running \"cdktf get\".";

/// Marker line the declarations are inserted after, both in framed output
/// and in project conversion.
pub const CODE_MARKER: &str = "// define resources here";

pub fn plan_imports(stmts: &[Stmt], container: &str) -> Vec<Import> {
    let framework_container = container.starts_with("cdktf.");

    let mut core: IndexSet<String> = IndexSet::new();
    if framework_container {
        core.insert(base_class(container).to_string());
    }

    let mut providers: IndexMap<String, IndexSet<String>> = IndexMap::new();
    let mut modules: IndexMap<String, String> = IndexMap::new();

    for stmt in stmts {
        if let Some(ClassRef { name, origin }) = stmt.class_ref() {
            match origin {
                ImportOrigin::Core => {
                    core.insert(name.clone());
                }
                ImportOrigin::Provider(p) => {
                    providers.entry(p.clone()).or_default().insert(name.clone());
                }
                ImportOrigin::Module(source) => {
                    modules.entry(source.clone()).or_insert_with(|| name.clone());
                }
                ImportOrigin::Constructs | ImportOrigin::External => {}
            }
        }
    }

    // Framework helpers referenced inside expressions.
    visit_exprs(stmts, &mut |e| match e {
        Expr::FnCall { .. } => {
            core.insert("Fn".to_string());
        }
        Expr::Coerce { .. } => {
            core.insert("Token".to_string());
        }
        Expr::Splat { .. } => {
            core.insert("propertyAccess".to_string());
        }
        _ => {}
    });

    let mut out = Vec::new();
    if !stmts.is_empty() || framework_container {
        out.push(Import::Constructs {
            symbols: vec!["Construct".to_string()],
        });
    }
    if !core.is_empty() {
        out.push(Import::Core {
            symbols: core.into_iter().collect(),
        });
    }
    for (i, (provider, symbols)) in providers.into_iter().enumerate() {
        out.push(Import::Provider {
            local_name: provider,
            symbols: symbols.into_iter().collect(),
            comment: (i == 0).then(|| PROVIDER_IMPORT_HINT.to_string()),
        });
    }
    for (source, class) in modules {
        out.push(Import::Module { class, source });
    }
    out
}

pub fn base_class(container: &str) -> &str {
    container.rsplit('.').next().unwrap_or(container)
}

fn is_local_source(source: &str) -> bool {
    source.starts_with("./") || source.starts_with("../")
}

/// The directory segment a module source binds under: the last path segment
/// for local sources, the module name for registry addresses
/// (`terraform-aws-modules/vpc/aws` -> `vpc`).
pub fn module_dir_name(source: &str) -> String {
    let trimmed = source.trim_end_matches('/');
    let segments: Vec<&str> = trimmed
        .split('/')
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .collect();
    let segment = if !is_local_source(source) && segments.len() >= 3 {
        segments[segments.len() - 2]
    } else {
        segments.last().copied().unwrap_or("module")
    };
    segment.to_string()
}

pub fn module_class_name(source: &str) -> String {
    pascal_case(&module_dir_name(source))
}

/// Where a module binding is imported from in the reference language.
pub fn module_import_path(source: &str) -> String {
    if is_local_source(source) {
        source.to_string()
    } else {
        format!("./.gen/modules/{}", module_dir_name(source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Coercion;

    fn instance(class: ClassRef) -> Stmt {
        Stmt::NewInstance {
            ident: None,
            class,
            logical_id: None,
            props: Vec::new(),
            leading_comment: None,
        }
    }

    #[test]
    fn empty_program_with_framework_container_still_imports() {
        let imports = plan_imports(&[], "cdktf.TerraformStack");
        assert_eq!(imports.len(), 2);
        assert!(matches!(&imports[0], Import::Constructs { .. }));
        match &imports[1] {
            Import::Core { symbols } => assert_eq!(symbols, &vec!["TerraformStack".to_string()]),
            other => panic!("expected core import, got {other:?}"),
        }
    }

    #[test]
    fn empty_program_with_external_container_imports_nothing() {
        assert!(plan_imports(&[], "my.lib.BaseStack").is_empty());
    }

    #[test]
    fn coercion_pulls_in_the_token_helper() {
        let stmt = Stmt::Const {
            ident: "x".to_string(),
            value: Expr::Coerce {
                kind: Coercion::AsString,
                expr: Box::new(Expr::Ident("y".to_string())),
            },
        };
        let imports = plan_imports(&[stmt], "cdktf.TerraformStack");
        match &imports[1] {
            Import::Core { symbols } => assert!(symbols.contains(&"Token".to_string())),
            other => panic!("expected core import, got {other:?}"),
        }
    }

    #[test]
    fn first_provider_import_carries_the_hint() {
        let stmts = vec![
            instance(ClassRef::provider("null", "NullResource")),
            instance(ClassRef::provider("aws", "AwsVpc")),
        ];
        let imports = plan_imports(&stmts, "cdktf.TerraformStack");
        let provider_imports: Vec<_> = imports
            .iter()
            .filter_map(|i| match i {
                Import::Provider {
                    local_name,
                    comment,
                    ..
                } => Some((local_name.as_str(), comment.is_some())),
                _ => None,
            })
            .collect();
        assert_eq!(provider_imports, vec![("null", true), ("aws", false)]);
    }

    #[test]
    fn module_sources_deduplicate() {
        let class = module_class_name("terraform-aws-modules/vpc/aws");
        assert_eq!(class, "Vpc");
        let stmts = vec![
            instance(ClassRef {
                name: class.clone(),
                origin: ImportOrigin::Module("terraform-aws-modules/vpc/aws".to_string()),
            }),
            instance(ClassRef {
                name: class,
                origin: ImportOrigin::Module("terraform-aws-modules/vpc/aws".to_string()),
            }),
        ];
        let imports = plan_imports(&stmts, "cdktf.TerraformStack");
        let count = imports
            .iter()
            .filter(|i| matches!(i, Import::Module { .. }))
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn local_module_paths_pass_through() {
        assert_eq!(module_import_path("./net"), "./net");
        assert_eq!(
            module_import_path("terraform-aws-modules/vpc/aws"),
            "./.gen/modules/vpc"
        );
        assert_eq!(module_class_name("./net"), "Net");
    }
}
