//! Lowering dispatch: one backend per target language, each serializing the
//! framed AST to its surface syntax.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::ast::SourceFile;
use crate::error::{ConvertError, Diagnostic, Severity};
use crate::render::Rendered;

pub mod csharp;
pub mod go;
pub mod java;
pub mod python;
pub mod typescript;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[value(name = "typescript", alias = "ts")]
    TypeScript,
    #[value(name = "python", alias = "py")]
    Python,
    Java,
    #[value(name = "csharp", alias = "cs")]
    CSharp,
    Go,
}

impl Language {
    pub fn name(&self) -> &'static str {
        match self {
            Language::TypeScript => "typescript",
            Language::Python => "python",
            Language::Java => "java",
            Language::CSharp => "csharp",
            Language::Go => "go",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Language {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "typescript" | "ts" => Ok(Language::TypeScript),
            "python" | "py" => Ok(Language::Python),
            "java" => Ok(Language::Java),
            "csharp" | "cs" => Ok(Language::CSharp),
            "go" => Ok(Language::Go),
            other => Err(ConvertError::UnsupportedLanguage(other.to_string())),
        }
    }
}

/// A lowered program plus whatever the backend could not express cleanly.
#[derive(Debug, Clone, Default)]
pub struct Lowered {
    pub rendered: Rendered,
    pub diagnostics: Vec<Diagnostic>,
}

impl Lowered {
    pub fn error_messages(&self) -> Vec<String> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .map(|d| d.message.clone())
            .collect()
    }
}

pub trait LanguageBackend {
    fn language(&self) -> Language;
    fn file_extension(&self) -> &'static str;
    fn lower(&self, file: &SourceFile) -> Lowered;
}

pub fn get_backend(language: Language) -> Box<dyn LanguageBackend> {
    match language {
        Language::TypeScript => Box::new(typescript::TypeScriptBackend),
        Language::Python => Box::new(python::PythonBackend),
        Language::Java => Box::new(java::JavaBackend),
        Language::CSharp => Box::new(csharp::CSharpBackend),
        Language::Go => Box::new(go::GoBackend),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_round_trips_through_names() {
        for lang in [
            Language::TypeScript,
            Language::Python,
            Language::Java,
            Language::CSharp,
            Language::Go,
        ] {
            assert_eq!(lang.name().parse::<Language>().unwrap(), lang);
        }
        assert!(matches!(
            "cobol".parse::<Language>(),
            Err(ConvertError::UnsupportedLanguage(_))
        ));
    }

    #[test]
    fn every_language_has_a_backend() {
        for lang in [
            Language::TypeScript,
            Language::Python,
            Language::Java,
            Language::CSharp,
            Language::Go,
        ] {
            assert_eq!(get_backend(lang).language(), lang);
        }
    }
}
