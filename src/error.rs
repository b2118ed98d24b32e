//! Error types for the ICSS compiler

use crate::diagnostics::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompilerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error in {file} at line {line}: {message}")]
    Parse { file: String, line: usize, message: String },

    #[error("Semantic errors in {file}:{}", format_diagnostics(.diagnostics))]
    Semantic { file: String, diagnostics: Vec<Diagnostic> },

    #[error("Variable error in {file} at line {line}: {message}")]
    Variable { file: String, line: usize, message: String },

    #[error("Code generation error: {message}")]
    CodeGen { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },
}

pub type Result<T> = std::result::Result<T, CompilerError>;

fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    let mut out = String::new();
    for diagnostic in diagnostics {
        out.push_str("\n  ");
        out.push_str(&diagnostic.to_string());
    }
    out
}

impl CompilerError {
    pub fn parse(file: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            file: file.into(),
            line,
            message: message.into(),
        }
    }

    pub fn semantic(file: impl Into<String>, diagnostics: Vec<Diagnostic>) -> Self {
        Self::Semantic {
            file: file.into(),
            diagnostics,
        }
    }

    pub fn variable(file: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::Variable {
            file: file.into(),
            line,
            message: message.into(),
        }
    }

    pub fn codegen(message: impl Into<String>) -> Self {
        Self::CodeGen {
            message: message.into(),
        }
    }

    /// Diagnostics carried by a rejected program, empty for every other error
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Self::Semantic { diagnostics, .. } => diagnostics,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{NodeId, Span};

    #[test]
    fn test_semantic_error_lists_every_diagnostic() {
        let err = CompilerError::semantic(
            "site.icss",
            vec![
                Diagnostic::new(NodeId::new(1), Span::new(2, 5), "unknown variable: Foo"),
                Diagnostic::new(NodeId::new(4), Span::new(3, 5), "property 'margin' is not allowed"),
            ],
        );

        let rendered = err.to_string();
        assert!(rendered.starts_with("Semantic errors in site.icss:"));
        assert!(rendered.contains("2:5: unknown variable: Foo"));
        assert!(rendered.contains("3:5: property 'margin' is not allowed"));
        assert_eq!(err.diagnostics().len(), 2);
    }

    #[test]
    fn test_parse_error_display() {
        let err = CompilerError::parse("a.icss", 7, "Expected ';'");
        assert_eq!(err.to_string(), "Parse error in a.icss at line 7: Expected ';'");
        assert!(err.diagnostics().is_empty());
    }
}
