//! # Recast Core
//!
//! Core of the recast source rewriting toolkit, including:
//! - Tree model for Java compilation units and a source printer
//! - A Java-subset parser
//! - Cursor-based traversal with pass-scoped messages
//! - Template synthesis, import management and layout formatting
//! - The `FixCwe338` recipe, which moves `RandomUtil` classes onto `SecureRandom`
//! - Recipe runner and file tracer for batch rewriting
//!
//! The command-line driver lives in the `recast-cli` crate.

#![warn(clippy::all)]

pub mod ast;
pub mod cursor;
pub mod format;
pub mod imports;
pub mod matcher;
pub mod parser;
pub mod recipes;
pub mod template;
pub mod tracer;
pub mod visitor;

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

// Re-export commonly used types
pub use ast::{ClassDecl, CompilationUnit, Expr, Member, ToSource};
pub use cursor::{AfterVisit, Cursor, MessageBoard, PassId, TraversalPass};
pub use format::{AutoFormat, Formatter};
pub use parser::{create_parser, JavaParser, ParseError, Parser};
pub use recipes::{FixCwe338, SecureRandomOptions};
pub use template::{JavaTemplateSynthesizer, Template, TemplateError, TemplateSynthesizer};
pub use tracer::{FileTracer, Recipe, RecipeRunner, RunnerConfig, UnitOutcome};
pub use visitor::TreeVisitor;

/// Recast version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize tracing for recast components at the default `info` level
pub fn init_tracing() {
    init_tracing_at("info");
}

/// Initialize tracing with `level` as the default for `recast_core`
///
/// `RUST_LOG` still takes precedence for anything it names. Calling this a
/// second time is a no-op.
pub fn init_tracing_at(level: &str) {
    let mut filter = EnvFilter::from_default_env();
    match format!("recast_core={level}").parse() {
        Ok(directive) => filter = filter.add_directive(directive),
        Err(err) => eprintln!("Ignoring log level {level:?}: {err}"),
    }
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Top-level configuration, loadable from JSON
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecastConfig {
    /// Options for the secure-random recipe
    pub recipe: SecureRandomOptions,
    /// File discovery and execution settings
    pub runner: RunnerConfig,
}

impl RecastConfig {
    /// Load a configuration file; missing keys keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|err| RecastError::Config(format!("{}: {err}", path.display())))
    }
}

/// Error types for recast core operations
#[derive(thiserror::Error, Debug)]
pub enum RecastError {
    /// A recipe could not build its replacement code
    #[error("Recipe {recipe} failed: {source}")]
    TransformationFailure {
        recipe: String,
        #[source]
        source: TemplateError,
    },

    /// A class the recipe must rewrite holds a legacy call in code the
    /// parser kept verbatim
    #[error("Recipe {recipe} cannot rewrite unparsed statement: {statement}")]
    UnsupportedStatement { recipe: String, statement: String },

    /// Source text could not be parsed
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for recast core operations
pub type Result<T> = std::result::Result<T, RecastError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_fill_missing_keys() {
        let config: RecastConfig =
            serde_json::from_str(r#"{ "recipe": { "seed_bytes": 32 } }"#).expect("config");
        assert_eq!(config.recipe.seed_bytes, 32);
        assert_eq!(config.recipe.target_class, "RandomUtil");
        assert_eq!(config.runner, RunnerConfig::default());
    }

    #[test]
    fn test_config_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("recast.json");
        std::fs::write(&path, r#"{ "runner": { "dry_run": true } }"#).expect("write");
        let config = RecastConfig::from_file(&path).expect("load");
        assert!(config.runner.dry_run);

        std::fs::write(&path, "{ not json").expect("write");
        assert!(matches!(
            RecastConfig::from_file(&path),
            Err(RecastError::Config(_))
        ));
    }
}
