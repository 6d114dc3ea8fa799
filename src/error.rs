use serde::Serialize;
use thiserror::Error;

/// Everything that can abort a conversion.
///
/// Warnings never abort; they are collected as [`Diagnostic`]s on the result
/// instead.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("failed to parse HCL input: {0}; check that the file is valid Terraform syntax")]
    Parse(#[from] hcl::Error),

    /// The parsed input does not match the Terraform block grammar. `path`
    /// is the structured location of the offending node.
    #[error("invalid configuration at '{}': expected {expected}", .path.join("."))]
    SchemaConformance { path: Vec<String>, expected: String },

    /// No emittable node remained but the pending set was non-empty.
    #[error("dependency cycle between: {}", .unvisited.join(", "))]
    CycleDetected { unvisited: Vec<String> },

    /// An edge was added to a node that was never registered. Reference
    /// discovery only matches registered nodes, so hitting this means a bug
    /// in discovery rather than bad input.
    #[error("internal: edge added to unregistered node '{0}'")]
    MissingNode(String),

    #[error("unsupported target language '{0}': expected typescript, python, java, csharp or go")]
    UnsupportedLanguage(String),

    /// Only raised when the caller opted into strict lowering.
    #[error("lowering to {language} failed:\n{}", .diagnostics.join("\n"))]
    Lowering {
        language: String,
        diagnostics: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// A non-fatal finding attached to a successful conversion, or an error
/// finding from a lowering backend.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }
}
