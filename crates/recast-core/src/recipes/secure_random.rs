/*!
# FixCwe338 - Secure Random Strings

Rewrites `RandomUtil` classes that build random strings with Commons Lang
`RandomStringUtils` (backed by the weak shared `java.util.Random`) so they
draw from a seeded `java.security.SecureRandom` instead.

The recipe runs in two passes over a unit:

1. `ApplicabilityFilter` marks every top-level class named `RandomUtil` in a
   unit that declares a package.
2. `SecureRandomVisitor` rewrites marked classes: every legacy call becomes
   a call to a private helper, existing fields are replaced by the
   `SECURE_RANDOM`/`DEF_COUNT` pair and a static seeding block, and the
   required imports and a format pass are queued as after-visits.

A class that already declares `SECURE_RANDOM` is left alone, which makes a
second run a no-op. Because of that guard a partial rewrite would be
permanent, so a marked class holding a legacy call inside a statement the
parser kept verbatim fails the unit with `UnsupportedStatement` instead.

Known limitation: every field of a rewritten class is dropped, not only the
`DEF_COUNT` constant that the synthesized one replaces.
*/

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::ast::{
    ClassDecl, CompilationUnit, Expr, Import, Marker, Member, MethodCall, NodeRef, Statement,
};
use crate::cursor::{AfterVisit, Cursor};
use crate::matcher::{LegacyCallMatcher, LEGACY_NAMESPACE, MODERN_NAMESPACE, RANDOM_STRING_UTILS};
use crate::template::{
    Coordinate, Fragment, JavaTemplateSynthesizer, Template, TemplateError, TemplateSynthesizer,
};
use crate::tracer::patterns::{
    AstPattern, ClassNameMatcher, FieldNameMatcher, ImportPackageMatcher, PatternMatcher,
};
use crate::tracer::Recipe;
use crate::visitor::{walk_class, walk_compilation_unit, walk_statement, TreeVisitor};
use crate::{RecastError, Result};

use super::move_tail_to_front;

/// Cursor message posted when the unit imports from the legacy namespace
pub const COMMONS_LANG_2: &str = "COMMONS_LANG_2";

pub const SECURE_RANDOM_TYPE: &str = "java.security.SecureRandom";

/// Members synthesized ahead of the helper, which end up first in the body
const LEADING_MEMBERS: usize = 3;

const RECIPE_NAME: &str = "FixCwe338";

/// Names and constants used by the rewrite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecureRandomOptions {
    /// Simple name of the classes to rewrite
    pub target_class: String,
    /// Field whose presence means the class was already rewritten
    pub sentinel_field: String,
    pub count_field: String,
    /// Value of the count constant
    pub default_count: u32,
    /// Number of bytes used to seed the generator
    pub seed_bytes: u32,
    pub helper_method: String,
}

impl Default for SecureRandomOptions {
    fn default() -> Self {
        Self {
            target_class: "RandomUtil".to_string(),
            sentinel_field: "SECURE_RANDOM".to_string(),
            count_field: "DEF_COUNT".to_string(),
            default_count: 20,
            seed_bytes: 64,
            helper_method: "generateRandomAlphanumericString".to_string(),
        }
    }
}

impl SecureRandomOptions {
    /// Helper method, generator field, count field and seeding block
    fn members_template(&self) -> Template {
        let Self {
            sentinel_field: random,
            count_field: count,
            helper_method: helper,
            ..
        } = self;

        Template::new(format!(
            "private static String {helper}() {{\n\
             \x20   return RandomStringUtils.random({count}, 0, 0, true, true, null, {random});\n\
             }}\n\
             private static final SecureRandom {random} = new SecureRandom();\n\
             private static final int {count} = #{{}};\n\
             static {{\n\
             \x20   {random}.nextBytes(new byte[#{{}}]);\n\
             }}\n"
        ))
        .param(self.default_count)
        .param(self.seed_bytes)
        .import(SECURE_RANDOM_TYPE)
        .coordinate(Coordinate::ClassBodyEnd)
    }

    fn call_template(&self) -> Template {
        Template::new(format!("{}()", self.helper_method)).coordinate(Coordinate::Replace)
    }
}

/// Use a cryptographically strong pseudo-random number generator
#[derive(Clone)]
pub struct FixCwe338 {
    options: SecureRandomOptions,
    synthesizer: Arc<dyn TemplateSynthesizer>,
}

impl FixCwe338 {
    pub fn new(options: SecureRandomOptions) -> Self {
        Self {
            options,
            synthesizer: Arc::new(JavaTemplateSynthesizer::default()),
        }
    }

    /// Replace the template synthesizer
    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn TemplateSynthesizer>) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    pub fn options(&self) -> &SecureRandomOptions {
        &self.options
    }
}

impl Default for FixCwe338 {
    fn default() -> Self {
        Self::new(SecureRandomOptions::default())
    }
}

impl std::fmt::Debug for FixCwe338 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixCwe338")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Recipe for FixCwe338 {
    fn name(&self) -> &'static str {
        RECIPE_NAME
    }

    fn display_name(&self) -> &'static str {
        "Fix CWE-338 with `SecureRandom`"
    }

    fn description(&self) -> &'static str {
        "Use a cryptographically strong pseudo-random number generator (PRNG)."
    }

    fn applicability_test(&self) -> Option<Box<dyn TreeVisitor>> {
        Some(Box::new(ApplicabilityFilter::new(
            RECIPE_NAME,
            &self.options.target_class,
        )))
    }

    fn visitor(&self) -> Box<dyn TreeVisitor> {
        Box::new(SecureRandomVisitor::new(
            RECIPE_NAME,
            self.options.clone(),
            Arc::clone(&self.synthesizer),
        ))
    }
}

/// Marks top-level target classes in units that declare a package
pub struct ApplicabilityFilter {
    recipe: &'static str,
    target: ClassNameMatcher,
}

impl ApplicabilityFilter {
    pub fn new(recipe: &'static str, target_class: &str) -> Self {
        Self {
            recipe,
            target: PatternMatcher::class_named(target_class),
        }
    }
}

impl TreeVisitor for ApplicabilityFilter {
    fn visit_compilation_unit(
        &mut self,
        unit: CompilationUnit,
        cursor: &Cursor,
    ) -> Result<CompilationUnit> {
        // Scratch files without a package are never rewritten
        if unit.package.is_none() {
            debug!(recipe = self.recipe, "Skipping unit without package declaration");
            return Ok(unit);
        }
        walk_compilation_unit(self, unit, cursor)
    }

    fn visit_class(&mut self, class: ClassDecl, _cursor: &Cursor) -> Result<ClassDecl> {
        if !self.target.matches(NodeRef::Class(&class)) {
            return Ok(class);
        }
        debug!(recipe = self.recipe, class = %class.name, "Marking class as applicable");
        let markers = class.markers.clone().add_if_absent(Marker::SearchResult {
            recipe: self.recipe.to_string(),
        });
        Ok(class.with_markers(markers))
    }
}

/// Rewrites classes marked by `ApplicabilityFilter`
pub struct SecureRandomVisitor {
    recipe: &'static str,
    options: SecureRandomOptions,
    synthesizer: Arc<dyn TemplateSynthesizer>,
    legacy_import: ImportPackageMatcher,
    sentinel: FieldNameMatcher,
    calls: Option<LegacyCallMatcher>,
}

impl SecureRandomVisitor {
    pub fn new(
        recipe: &'static str,
        options: SecureRandomOptions,
        synthesizer: Arc<dyn TemplateSynthesizer>,
    ) -> Self {
        let sentinel = PatternMatcher::field_named(&options.sentinel_field);
        Self {
            recipe,
            options,
            synthesizer,
            legacy_import: PatternMatcher::import_from(LEGACY_NAMESPACE),
            sentinel,
            calls: None,
        }
    }

    fn failure(&self, source: TemplateError) -> RecastError {
        RecastError::TransformationFailure {
            recipe: self.recipe.to_string(),
            source,
        }
    }

    fn in_marked_class(&self, cursor: &Cursor) -> bool {
        cursor
            .ancestors()
            .any(|frame| frame.markers.has_search_result(self.recipe))
    }

    fn has_sentinel(&self, class: &ClassDecl) -> bool {
        class
            .body
            .iter()
            .any(|member| self.sentinel.matches(NodeRef::from_member(member)))
    }

    fn synthesize_members(&self) -> Result<Vec<Member>> {
        self.synthesizer
            .synthesize(&self.options.members_template())
            .and_then(Fragment::into_members)
            .map_err(|err| self.failure(err))
    }
}

impl TreeVisitor for SecureRandomVisitor {
    fn visit_compilation_unit(
        &mut self,
        unit: CompilationUnit,
        cursor: &Cursor,
    ) -> Result<CompilationUnit> {
        self.calls = Some(LegacyCallMatcher::for_unit(&unit));
        walk_compilation_unit(self, unit, cursor)
    }

    fn visit_import(&mut self, import: Import, cursor: &Cursor) -> Result<Import> {
        if self.legacy_import.matches(NodeRef::Import(&import)) {
            debug!(import = %import.name, "Unit imports from the legacy namespace");
            cursor.put_message(COMMONS_LANG_2, true);
        }
        Ok(import)
    }

    fn visit_class(&mut self, class: ClassDecl, cursor: &Cursor) -> Result<ClassDecl> {
        if !class.markers.has_search_result(self.recipe) {
            return walk_class(self, class, cursor);
        }
        if self.has_sentinel(&class) {
            debug!(class = %class.name, "Class already uses SecureRandom");
            return Ok(class);
        }

        let class = walk_class(self, class, cursor)?;
        let ClassDecl { body, .. } = class;
        let mut body: Vec<Member> = body.into_iter().filter(|member| !member.is_field()).collect();
        body.extend(self.synthesize_members()?);
        let body = move_tail_to_front(body, LEADING_MEMBERS);

        cursor.do_after_visit(AfterVisit::AddImport(SECURE_RANDOM_TYPE.to_string()));
        let namespace = match cursor.poll_message(COMMONS_LANG_2) {
            Some(_) => LEGACY_NAMESPACE,
            None => MODERN_NAMESPACE,
        };
        cursor.do_after_visit(AfterVisit::AddImport(format!(
            "{namespace}.{RANDOM_STRING_UTILS}"
        )));
        cursor.do_after_visit(AfterVisit::Format {
            class: class.name.clone(),
        });

        info!(class = %class.name, namespace, "Rewrote class to use SecureRandom");
        Ok(ClassDecl { body, ..class })
    }

    fn visit_statement(&mut self, statement: Statement, cursor: &Cursor) -> Result<Statement> {
        if let Statement::Raw(text) = &statement {
            let mentions_legacy = self
                .calls
                .as_ref()
                .is_some_and(|calls| calls.mentioned_in(text));
            if mentions_legacy && self.in_marked_class(cursor) {
                warn!(statement = %text, "Legacy call inside unparsed statement");
                return Err(RecastError::UnsupportedStatement {
                    recipe: self.recipe.to_string(),
                    statement: text.clone(),
                });
            }
        }
        walk_statement(self, statement, cursor)
    }

    fn visit_method_call(&mut self, call: MethodCall, cursor: &Cursor) -> Result<Expr> {
        let is_legacy = self
            .calls
            .as_ref()
            .is_some_and(|calls| calls.matches_call(&call));
        if !is_legacy || !self.in_marked_class(cursor) {
            return Ok(Expr::MethodCall(call));
        }

        debug!(method = %call.name, "Replacing legacy random call");
        self.synthesizer
            .synthesize(&self.options.call_template())
            .and_then(Fragment::into_expression)
            .map_err(|err| self.failure(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ToSource;
    use crate::cursor::MessageBoard;
    use crate::parser::{JavaParser, Parser};
    use crate::template::TypeCatalog;
    use crate::visitor::visit_unit;

    fn parse(source: &str) -> CompilationUnit {
        JavaParser::new().parse(source).expect("parse")
    }

    fn filter(unit: CompilationUnit) -> CompilationUnit {
        let board = MessageBoard::new();
        let pass = board.begin_pass();
        let mut filter = ApplicabilityFilter::new(RECIPE_NAME, "RandomUtil");
        let unit = visit_unit(&mut filter, unit, &pass).expect("filter");
        pass.finish();
        unit
    }

    fn rewrite(
        unit: CompilationUnit,
        synthesizer: Arc<dyn TemplateSynthesizer>,
    ) -> Result<(CompilationUnit, Vec<AfterVisit>)> {
        let board = MessageBoard::new();
        let pass = board.begin_pass();
        let mut visitor =
            SecureRandomVisitor::new(RECIPE_NAME, SecureRandomOptions::default(), synthesizer);
        let unit = visit_unit(&mut visitor, unit, &pass)?;
        Ok((unit, pass.finish()))
    }

    #[test]
    fn test_filter_marks_only_target_classes() {
        let unit = filter(parse(
            "package a;\nclass RandomUtil {\n    class RandomUtil {\n    }\n}\nclass Other {\n}\n",
        ));
        assert!(unit.types[0].markers.has_search_result(RECIPE_NAME));
        assert!(!unit.types[1].markers.has_search_result(RECIPE_NAME));
        match &unit.types[0].body[0] {
            Member::Class(inner) => assert!(inner.markers.is_empty()),
            other => panic!("unexpected member {other:?}"),
        }
    }

    #[test]
    fn test_filter_skips_units_without_package() {
        let unit = filter(parse("class RandomUtil {\n}\n"));
        assert!(unit.types[0].markers.is_empty());
    }

    #[test]
    fn test_rewrite_queues_imports_and_format() {
        let unit = filter(parse(
            "package a;\nimport org.apache.commons.lang.RandomStringUtils;\nclass RandomUtil {\n    private static int x = 1;\n    String key() {\n        return RandomStringUtils.randomNumeric(x);\n    }\n}\n",
        ));
        let (unit, after) =
            rewrite(unit, Arc::new(JavaTemplateSynthesizer::default())).expect("rewrite");

        assert_eq!(
            after,
            vec![
                AfterVisit::AddImport("java.security.SecureRandom".into()),
                AfterVisit::AddImport("org.apache.commons.lang.RandomStringUtils".into()),
                AfterVisit::Format {
                    class: "RandomUtil".into()
                },
            ]
        );

        let names: Vec<_> = unit.types[0].body.iter().map(Member::name).collect();
        assert_eq!(
            names,
            vec![
                Some("SECURE_RANDOM"),
                Some("DEF_COUNT"),
                None,
                Some("key"),
                Some("generateRandomAlphanumericString"),
            ]
        );
        assert!(unit.types[0].to_source().contains("return generateRandomAlphanumericString();"));
    }

    #[test]
    fn test_calls_outside_marked_class_are_kept() {
        let unit = filter(parse(
            "package a;\nimport org.apache.commons.lang3.RandomStringUtils;\nclass Other {\n    String key() {\n        return RandomStringUtils.randomNumeric(5);\n    }\n}\n",
        ));
        let before = unit.clone();
        let (unit, after) =
            rewrite(unit, Arc::new(JavaTemplateSynthesizer::default())).expect("rewrite");
        assert_eq!(unit, before);
        assert!(after.is_empty());
    }

    #[test]
    fn test_missing_type_is_a_transformation_failure() {
        let unit = filter(parse("package a;\nclass RandomUtil {\n}\n"));
        let synthesizer = Arc::new(JavaTemplateSynthesizer::new(TypeCatalog::new()));
        let err = rewrite(unit, synthesizer).unwrap_err();
        match err {
            RecastError::TransformationFailure { recipe, source } => {
                assert_eq!(recipe, RECIPE_NAME);
                assert_eq!(
                    source,
                    TemplateError::UnresolvedImport(SECURE_RANDOM_TYPE.into())
                );
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_legacy_call_in_unparsed_statement_fails() {
        let unit = filter(parse(
            "package a;\nimport org.apache.commons.lang3.RandomStringUtils;\nclass RandomUtil {\n    void warm(List<Integer> sizes) {\n        sizes.forEach(n -> RandomStringUtils.randomNumeric(n));\n    }\n}\n",
        ));
        let err = rewrite(unit, Arc::new(JavaTemplateSynthesizer::default())).unwrap_err();
        match err {
            RecastError::UnsupportedStatement { recipe, statement } => {
                assert_eq!(recipe, RECIPE_NAME);
                assert_eq!(statement, "sizes.forEach(n -> RandomStringUtils.randomNumeric(n));");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_unparsed_statement_without_legacy_call_is_kept() {
        let unit = filter(parse(
            "package a;\nimport org.apache.commons.lang3.RandomStringUtils;\nclass RandomUtil {\n    void warm(List<Integer> sizes) {\n        sizes.forEach(n -> log(n));\n    }\n}\n",
        ));
        let (unit, _) =
            rewrite(unit, Arc::new(JavaTemplateSynthesizer::default())).expect("rewrite");
        assert!(unit.types[0].to_source().contains("sizes.forEach(n -> log(n));"));
    }
}
