// Parser module - turns Java source text into the tree model
use std::path::Path;

use thiserror::Error;

use crate::ast::{CompilationUnit, Expr, Member};

pub mod java;
pub mod lexer;

pub use java::JavaParser;

/// Errors raised while reading source text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Lexical error at {line}:{column}: {message}")]
    Lex {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Syntax error at {line}:{column}: expected {expected}, found {found}")]
    Syntax {
        line: usize,
        column: usize,
        expected: String,
        found: String,
    },

    #[error("Unsupported construct at {line}:{column}: {construct}")]
    Unsupported {
        line: usize,
        column: usize,
        construct: String,
    },
}

/// 1-based line and column of a byte offset
pub fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let before = &source[..offset.min(source.len())];
    let line = before.matches('\n').count() + 1;
    let column = match before.rfind('\n') {
        Some(pos) => before[pos + 1..].chars().count() + 1,
        None => before.chars().count() + 1,
    };
    (line, column)
}

impl ParseError {
    pub fn lex(source: &str, offset: usize, message: impl Into<String>) -> Self {
        let (line, column) = line_col(source, offset);
        ParseError::Lex {
            line,
            column,
            message: message.into(),
        }
    }

    pub fn syntax(
        source: &str,
        offset: usize,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        let (line, column) = line_col(source, offset);
        ParseError::Syntax {
            line,
            column,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn unsupported(source: &str, offset: usize, construct: impl Into<String>) -> Self {
        let (line, column) = line_col(source, offset);
        ParseError::Unsupported {
            line,
            column,
            construct: construct.into(),
        }
    }
}

/// Trait for all source parsers
pub trait Parser: Send + Sync {
    /// Parse a whole compilation unit
    fn parse(&mut self, source: &str) -> Result<CompilationUnit, ParseError>;

    /// Parse a sequence of class body declarations
    fn parse_members(&mut self, source: &str) -> Result<Vec<Member>, ParseError>;

    /// Parse a single expression
    fn parse_expression(&mut self, source: &str) -> Result<Expr, ParseError>;

    /// Parse a file
    fn parse_file(&mut self, path: &Path) -> anyhow::Result<CompilationUnit> {
        let source = std::fs::read_to_string(path)?;
        Ok(self.parse(&source)?)
    }

    /// Get parser name for debugging
    fn name(&self) -> &'static str;
}

/// Create a parser for a source language
pub fn create_parser(language: &str) -> anyhow::Result<Box<dyn Parser>> {
    match language {
        "java" => Ok(Box::new(JavaParser::new())),
        _ => anyhow::bail!("Unknown parser type: {}", language),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col() {
        let source = "package a;\nimport b;\n  class";
        assert_eq!(line_col(source, 0), (1, 1));
        assert_eq!(line_col(source, 11), (2, 1));
        assert_eq!(line_col(source, source.len() - 5), (3, 3));
    }

    #[test]
    fn test_create_parser() {
        let parser = create_parser("java").expect("java parser");
        assert_eq!(parser.name(), "java");
        assert!(create_parser("kotlin").is_err());
    }
}
