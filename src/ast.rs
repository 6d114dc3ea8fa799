//! Language-neutral AST for the emitted program.
//!
//! Emitters build this tree; each lowering backend serializes it to one
//! surface syntax. Attribute and property names are kept in their HCL
//! spelling; backends apply their own naming convention when printing.

use hcl::Number;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Null,
    Bool(bool),
    Number(Number),
    Str(String),
    /// Multi-line string from a heredoc, indentation already stripped.
    Heredoc(String),
    /// Template with more than one part. `Str` parts are literal text.
    Concat(Vec<Expr>),
    List(Vec<Expr>),
    /// Free-form object literal; keys keep their HCL spelling and are never
    /// renamed.
    Map(Vec<(String, Expr)>),
    /// Schema-shaped object (nested block contents, typed objects); keys are
    /// attribute names and follow the target language's naming convention.
    Struct(Vec<(String, Expr)>),
    /// An emitted binding.
    Ident(String),
    /// Attribute access on a construct or object; `attr` is the HCL name.
    Member { target: Box<Expr>, attr: String },
    Index { target: Box<Expr>, index: Box<Expr> },
    /// Terraform function call, lowered into the framework `Fn` namespace.
    FnCall { name: String, args: Vec<Expr> },
    /// Framework token coercion helper.
    Coerce { kind: Coercion, expr: Box<Expr> },
    /// `x[*].path` projection, lowered to the framework property-access
    /// helper.
    Splat { target: Box<Expr>, path: Vec<String> },
    Unary { op: UnaryOp, expr: Box<Expr> },
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Conditional { cond: Box<Expr>, then: Box<Expr>, otherwise: Box<Expr> },
    /// `[for v in coll : body if cond]`
    ForList {
        value_var: String,
        key_var: Option<String>,
        collection: Box<Expr>,
        cond: Option<Box<Expr>>,
        body: Box<Expr>,
    },
    /// `{for k, v in coll : key => value}`
    ForMap {
        value_var: String,
        key_var: Option<String>,
        collection: Box<Expr>,
        cond: Option<Box<Expr>>,
        key: Box<Expr>,
        value: Box<Expr>,
    },
    Paren(Box<Expr>),
    /// Source text carried through untranslated (unresolved references,
    /// reserved iteration symbols).
    Raw(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    AsString,
    AsNumber,
    AsList,
    AsNumberList,
    AsStringMap,
    AsAny,
}

impl Coercion {
    /// Method name on the framework `Token` helper, reference-language
    /// spelling.
    pub fn method(&self) -> &'static str {
        match self {
            Coercion::AsString => "asString",
            Coercion::AsNumber => "asNumber",
            Coercion::AsList => "asList",
            Coercion::AsNumberList => "asNumberList",
            Coercion::AsStringMap => "asStringMap",
            Coercion::AsAny => "asAny",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
        }
    }
}

/// Where a construct class is imported from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ImportOrigin {
    /// The `constructs` package.
    Constructs,
    /// The framework core package.
    Core,
    /// Generated provider bindings, keyed by local provider name.
    Provider(String),
    /// Generated module bindings, keyed by module source.
    Module(String),
    /// Supplied by the embedding program (custom code container).
    External,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassRef {
    pub name: String,
    pub origin: ImportOrigin,
}

impl ClassRef {
    pub fn core(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            origin: ImportOrigin::Core,
        }
    }

    pub fn provider(provider: &str, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            origin: ImportOrigin::Provider(provider.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `const <ident> = new <Class>(scope, "<logical>", { ...props });`
    /// Backends have no logical id and no binding.
    NewInstance {
        ident: Option<String>,
        class: ClassRef,
        logical_id: Option<String>,
        props: Vec<(String, Expr)>,
        leading_comment: Option<String>,
    },
    /// Local value: `const <ident> = <value>;`
    Const { ident: String, value: Expr },
}

impl Stmt {
    pub fn class_ref(&self) -> Option<&ClassRef> {
        match self {
            Stmt::NewInstance { class, .. } => Some(class),
            Stmt::Const { .. } => None,
        }
    }

    pub fn set_leading_comment(&mut self, comment: String) {
        if let Stmt::NewInstance { leading_comment, .. } = self {
            *leading_comment = Some(comment);
        }
    }
}

/// One planned import line. Symbol lists are in first-use order.
#[derive(Debug, Clone, PartialEq)]
pub enum Import {
    Constructs { symbols: Vec<String> },
    Core { symbols: Vec<String> },
    Provider {
        local_name: String,
        symbols: Vec<String>,
        /// The first provider import carries the `cdktf get` hint.
        comment: Option<String>,
    },
    Module { class: String, source: String },
}

/// The framed program: imports, then a class body in the configured
/// container, statements in emission order.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub imports: Vec<Import>,
    /// e.g. `cdktf.TerraformStack`.
    pub container: String,
    pub class_name: String,
    pub stmts: Vec<Stmt>,
}

impl SourceFile {
    pub fn base_class(&self) -> &str {
        self.container
            .rsplit('.')
            .next()
            .unwrap_or(self.container.as_str())
    }
}

/// Walk every expression in a statement list. Used by the import planner to
/// find framework helper usage.
pub fn visit_exprs<'a>(stmts: &'a [Stmt], f: &mut dyn FnMut(&'a Expr)) {
    fn walk<'a>(e: &'a Expr, f: &mut dyn FnMut(&'a Expr)) {
        f(e);
        match e {
            Expr::Concat(parts) | Expr::List(parts) => {
                for p in parts {
                    walk(p, f);
                }
            }
            Expr::Map(entries) | Expr::Struct(entries) => {
                for (_, v) in entries {
                    walk(v, f);
                }
            }
            Expr::Member { target, .. } => walk(target, f),
            Expr::Index { target, index } => {
                walk(target, f);
                walk(index, f);
            }
            Expr::FnCall { args, .. } => {
                for a in args {
                    walk(a, f);
                }
            }
            Expr::Coerce { expr, .. } | Expr::Unary { expr, .. } | Expr::Paren(expr) => {
                walk(expr, f)
            }
            Expr::Splat { target, .. } => walk(target, f),
            Expr::Binary { lhs, rhs, .. } => {
                walk(lhs, f);
                walk(rhs, f);
            }
            Expr::Conditional { cond, then, otherwise } => {
                walk(cond, f);
                walk(then, f);
                walk(otherwise, f);
            }
            Expr::ForList { collection, cond, body, .. } => {
                walk(collection, f);
                if let Some(c) = cond {
                    walk(c, f);
                }
                walk(body, f);
            }
            Expr::ForMap { collection, cond, key, value, .. } => {
                walk(collection, f);
                if let Some(c) = cond {
                    walk(c, f);
                }
                walk(key, f);
                walk(value, f);
            }
            Expr::Null
            | Expr::Bool(_)
            | Expr::Number(_)
            | Expr::Str(_)
            | Expr::Heredoc(_)
            | Expr::Ident(_)
            | Expr::Raw(_) => {}
        }
    }

    for stmt in stmts {
        match stmt {
            Stmt::NewInstance { props, .. } => {
                for (_, v) in props {
                    walk(v, f);
                }
            }
            Stmt::Const { value, .. } => walk(value, f),
        }
    }
}
