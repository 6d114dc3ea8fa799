//! The reference backend: TypeScript is what the framed AST serializes to,
//! so lowering is the identity.

use super::{Language, LanguageBackend, Lowered};
use crate::ast::SourceFile;
use crate::render::render_typescript;

pub struct TypeScriptBackend;

impl LanguageBackend for TypeScriptBackend {
    fn language(&self) -> Language {
        Language::TypeScript
    }

    fn file_extension(&self) -> &'static str {
        "ts"
    }

    fn lower(&self, file: &SourceFile) -> Lowered {
        Lowered {
            rendered: render_typescript(file),
            diagnostics: Vec::new(),
        }
    }
}
