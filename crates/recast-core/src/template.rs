/*!
# Template Synthesis

Turns snippet text into typed tree fragments. A `Template` carries the
snippet with positional `#{}` placeholders, the parameter values, the
fully-qualified types the snippet needs, and where the result will be
inserted. A `TemplateSynthesizer` checks the required types against what it
can resolve and parses the rendered text into members or an expression.

Recipes only see the `TemplateSynthesizer` trait; `JavaTemplateSynthesizer`
is the implementation backed by the Java parser and a `TypeCatalog`.
*/

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::ast::{Expr, Member};
use crate::parser::{JavaParser, ParseError, Parser};

const PLACEHOLDER: &str = "#{}";

/// Where a synthesized fragment goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Coordinate {
    ClassBodyStart,
    ClassBodyEnd,
    /// Replaces an expression in place
    Replace,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Template text failed to parse: {0}")]
    Parse(#[from] ParseError),

    #[error("Template requires type {0}, which is not on the classpath")]
    UnresolvedImport(String),

    #[error("Template has {expected} placeholders but {found} parameters were supplied")]
    ParameterMismatch { expected: usize, found: usize },

    #[error("Expected {expected} from template, got {found}")]
    WrongFragment {
        expected: &'static str,
        found: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    snippet: String,
    params: Vec<String>,
    imports: Vec<String>,
    coordinate: Coordinate,
}

impl Template {
    pub fn new(snippet: impl Into<String>) -> Self {
        Self {
            snippet: snippet.into(),
            params: Vec::new(),
            imports: Vec::new(),
            coordinate: Coordinate::ClassBodyEnd,
        }
    }

    /// Append the value for the next `#{}` placeholder
    pub fn param(mut self, value: impl ToString) -> Self {
        self.params.push(value.to_string());
        self
    }

    /// Declare a fully-qualified type the snippet refers to
    pub fn import(mut self, fqn: impl Into<String>) -> Self {
        self.imports.push(fqn.into());
        self
    }

    pub fn coordinate(mut self, coordinate: Coordinate) -> Self {
        self.coordinate = coordinate;
        self
    }

    pub fn imports(&self) -> &[String] {
        &self.imports
    }

    pub fn at(&self) -> Coordinate {
        self.coordinate
    }

    pub fn placeholder_count(&self) -> usize {
        self.snippet.matches(PLACEHOLDER).count()
    }

    /// Snippet with every placeholder substituted in order
    pub fn render(&self) -> Result<String, TemplateError> {
        let expected = self.placeholder_count();
        if expected != self.params.len() {
            return Err(TemplateError::ParameterMismatch {
                expected,
                found: self.params.len(),
            });
        }

        let mut rendered = String::with_capacity(self.snippet.len());
        for (i, piece) in self.snippet.split(PLACEHOLDER).enumerate() {
            rendered.push_str(piece);
            if let Some(value) = self.params.get(i) {
                rendered.push_str(value);
            }
        }
        Ok(rendered)
    }
}

/// Result of synthesizing a template
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    Members(Vec<Member>),
    Expression(Expr),
}

impl Fragment {
    fn describe(&self) -> &'static str {
        match self {
            Fragment::Members(_) => "class members",
            Fragment::Expression(_) => "an expression",
        }
    }

    pub fn into_members(self) -> Result<Vec<Member>, TemplateError> {
        match self {
            Fragment::Members(members) => Ok(members),
            other => Err(TemplateError::WrongFragment {
                expected: "class members",
                found: other.describe(),
            }),
        }
    }

    pub fn into_expression(self) -> Result<Expr, TemplateError> {
        match self {
            Fragment::Expression(expr) => Ok(expr),
            other => Err(TemplateError::WrongFragment {
                expected: "an expression",
                found: other.describe(),
            }),
        }
    }
}

/// Turns templates into tree fragments
pub trait TemplateSynthesizer: Send + Sync {
    fn synthesize(&self, template: &Template) -> Result<Fragment, TemplateError>;
}

/// Types a synthesizer can resolve, standing in for a compile classpath
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCatalog {
    types: BTreeSet<String>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, fqn: impl Into<String>) -> Self {
        self.types.insert(fqn.into());
        self
    }

    pub fn contains(&self, fqn: &str) -> bool {
        self.types.contains(fqn)
    }

    /// JDK random types plus both Commons Lang generations
    pub fn commons_lang() -> Self {
        Self::new()
            .with_type("java.util.Random")
            .with_type("java.security.SecureRandom")
            .with_type("org.apache.commons.lang.RandomStringUtils")
            .with_type("org.apache.commons.lang3.RandomStringUtils")
    }
}

/// Synthesizer backed by the Java parser
#[derive(Debug, Clone)]
pub struct JavaTemplateSynthesizer {
    catalog: TypeCatalog,
}

impl JavaTemplateSynthesizer {
    pub fn new(catalog: TypeCatalog) -> Self {
        Self { catalog }
    }
}

impl Default for JavaTemplateSynthesizer {
    fn default() -> Self {
        Self::new(TypeCatalog::commons_lang())
    }
}

impl TemplateSynthesizer for JavaTemplateSynthesizer {
    fn synthesize(&self, template: &Template) -> Result<Fragment, TemplateError> {
        if let Some(missing) = template
            .imports()
            .iter()
            .find(|fqn| !self.catalog.contains(fqn))
        {
            return Err(TemplateError::UnresolvedImport(missing.clone()));
        }

        let text = template.render()?;
        let mut parser = JavaParser::new();
        let fragment = match template.at() {
            Coordinate::ClassBodyStart | Coordinate::ClassBodyEnd => {
                Fragment::Members(parser.parse_members(&text)?)
            }
            Coordinate::Replace => Fragment::Expression(parser.parse_expression(&text)?),
        };
        debug!(coordinate = ?template.at(), fragment = fragment.describe(), "Synthesized template");
        Ok(fragment)
    }
}
