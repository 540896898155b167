/*!
# RecipeRunner - Two-Phase Recipe Execution

Runs recipes over one compilation unit at a time. For every recipe:

1. the applicability test runs in its own traversal pass and marks the
   declarations the recipe wants;
2. if anything was marked, the rewrite visitor runs in a second pass;
3. the after-visits queued during that pass are applied (imports first,
   then formatting of the named classes);
4. markers are stripped and the result is compared with the input.

The input unit is never modified; on error the caller still holds it.
*/

use std::time::Instant;

use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, warn};

use crate::ast::{ClassDecl, CompilationUnit, Member};
use crate::cursor::{AfterVisit, MessageBoard};
use crate::format::{AutoFormat, Formatter};
use crate::imports::ensure_import;
use crate::visitor::visit_unit;
use crate::Result;

use super::rules::{Recipe, RuleStats};

/// Progress of one top-level class through a recipe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ClassState {
    /// Not selected by the applicability test
    Unmarked,
    /// Selected, but the rewrite left it as it was
    Applicable,
    Mutated,
    /// Mutated and reformatted
    Formatted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassReport {
    pub recipe: String,
    pub class: String,
    pub state: ClassState,
}

/// Result of running every recipe over one unit
#[derive(Debug, Clone, PartialEq)]
pub enum UnitOutcome {
    /// No recipe selected anything in the unit
    NotApplicable,
    Unchanged {
        classes: Vec<ClassReport>,
    },
    Changed {
        unit: CompilationUnit,
        classes: Vec<ClassReport>,
    },
}

impl UnitOutcome {
    pub fn classes(&self) -> &[ClassReport] {
        match self {
            UnitOutcome::NotApplicable => &[],
            UnitOutcome::Unchanged { classes } | UnitOutcome::Changed { classes, .. } => classes,
        }
    }

    pub fn is_changed(&self) -> bool {
        matches!(self, UnitOutcome::Changed { .. })
    }

    /// The rewritten unit, if there is one
    pub fn into_unit(self) -> Option<CompilationUnit> {
        match self {
            UnitOutcome::Changed { unit, .. } => Some(unit),
            _ => None,
        }
    }
}

struct RecipeRun {
    unit: CompilationUnit,
    classes: Vec<ClassReport>,
}

/// Runs recipes over compilation units
///
/// Shared between worker threads; statistics are kept in a concurrent map.
pub struct RecipeRunner {
    recipes: Vec<Box<dyn Recipe>>,
    formatter: Box<dyn Formatter>,
    stats: DashMap<String, RuleStats>,
}

impl RecipeRunner {
    pub fn new() -> Self {
        Self {
            recipes: Vec::new(),
            formatter: Box::new(AutoFormat),
            stats: DashMap::new(),
        }
    }

    /// Replace the formatter used for `AfterVisit::Format`
    pub fn with_formatter(mut self, formatter: Box<dyn Formatter>) -> Self {
        self.formatter = formatter;
        self
    }

    /// Builder form of `add_recipe`
    pub fn with_recipe(mut self, recipe: Box<dyn Recipe>) -> Self {
        self.add_recipe(recipe);
        self
    }

    /// Add a recipe, keeping recipes sorted by priority (higher first)
    pub fn add_recipe(&mut self, recipe: Box<dyn Recipe>) {
        let name = recipe.name().to_string();
        self.stats.insert(name.clone(), RuleStats::new(name));
        self.recipes.push(recipe);
        self.recipes
            .sort_by_key(|recipe| std::cmp::Reverse(recipe.priority()));
    }

    pub fn recipes(&self) -> impl Iterator<Item = &dyn Recipe> {
        self.recipes.iter().map(|recipe| recipe.as_ref())
    }

    /// Snapshot of per-recipe statistics, ordered by recipe name
    pub fn stats(&self) -> Vec<RuleStats> {
        let mut stats: Vec<RuleStats> = self.stats.iter().map(|entry| entry.value().clone()).collect();
        stats.sort_by(|a, b| a.rule_name.cmp(&b.rule_name));
        stats
    }

    /// Run every recipe over `unit` in priority order
    pub fn run(&self, unit: &CompilationUnit) -> Result<UnitOutcome> {
        let mut current = unit.clone();
        let mut applicable = false;
        let mut classes = Vec::new();

        for recipe in &self.recipes {
            let start = Instant::now();
            let result = self.run_recipe(recipe.as_ref(), &current);
            let mut stats = self
                .stats
                .entry(recipe.name().to_string())
                .or_insert_with(|| RuleStats::new(recipe.name().to_string()));

            match result {
                Ok(None) => {}
                Ok(Some(run)) => {
                    stats.applications += 1;
                    stats.total_time_ms += start.elapsed().as_millis() as u64;
                    if run.unit != current {
                        stats.transformations += 1;
                    }
                    applicable = true;
                    classes.extend(run.classes);
                    current = run.unit;
                }
                Err(err) => {
                    stats.errors += 1;
                    warn!(recipe = recipe.name(), error = %err, "Recipe failed");
                    return Err(err);
                }
            }
        }

        Ok(if !applicable {
            UnitOutcome::NotApplicable
        } else if current == *unit {
            UnitOutcome::Unchanged { classes }
        } else {
            UnitOutcome::Changed {
                unit: current,
                classes,
            }
        })
    }

    /// `None` when the applicability test marked nothing
    fn run_recipe(&self, recipe: &dyn Recipe, unit: &CompilationUnit) -> Result<Option<RecipeRun>> {
        let board = MessageBoard::new();

        let (candidate, marked) = match recipe.applicability_test() {
            Some(mut test) => {
                let pass = board.begin_pass();
                let filtered = visit_unit(test.as_mut(), unit.clone(), &pass)?;
                pass.finish();

                let marked: Vec<String> = filtered
                    .types
                    .iter()
                    .filter(|class| class.markers.has_search_result(recipe.name()))
                    .map(|class| class.name.clone())
                    .collect();
                if marked.is_empty() {
                    debug!(recipe = recipe.name(), "Recipe not applicable to unit");
                    return Ok(None);
                }
                (filtered, Some(marked))
            }
            None => (unit.clone(), None),
        };

        let pass = board.begin_pass();
        let mut visitor = recipe.visitor();
        let rewritten = visit_unit(visitor.as_mut(), candidate, &pass)?;
        let after_visits = pass.finish();

        let (rewritten, formatted) = self.apply_after_visits(rewritten, after_visits);
        let CompilationUnit {
            package,
            imports,
            types,
        } = rewritten;
        let result = CompilationUnit {
            package,
            imports,
            types: types.into_iter().map(strip_markers).collect(),
        };

        let classes = unit
            .types
            .iter()
            .map(|class| ClassReport {
                recipe: recipe.name().to_string(),
                class: class.name.clone(),
                state: class_state(class, &result, marked.as_deref(), &formatted),
            })
            .collect();

        Ok(Some(RecipeRun {
            unit: result,
            classes,
        }))
    }

    /// Apply queued work; returns the unit and the names of formatted classes
    fn apply_after_visits(
        &self,
        unit: CompilationUnit,
        after_visits: Vec<AfterVisit>,
    ) -> (CompilationUnit, Vec<String>) {
        let mut unit = unit;
        let mut formatted = Vec::new();

        for visit in after_visits {
            match visit {
                AfterVisit::AddImport(fqn) => unit = ensure_import(unit, &fqn),
                AfterVisit::Format { class } => formatted.push(class),
            }
        }
        if formatted.is_empty() {
            return (unit, formatted);
        }

        let CompilationUnit {
            package,
            imports,
            types,
        } = unit;
        let types = types
            .into_iter()
            .map(|class| {
                if formatted.contains(&class.name) {
                    self.formatter.format_class(class)
                } else {
                    class
                }
            })
            .collect();
        let unit = CompilationUnit {
            package,
            imports: self.formatter.format_imports(imports),
            types,
        };
        (unit, formatted)
    }
}

impl Default for RecipeRunner {
    fn default() -> Self {
        Self::new()
    }
}

fn strip_markers(class: ClassDecl) -> ClassDecl {
    let ClassDecl { body, markers, .. } = class;
    let body = body
        .into_iter()
        .map(|member| match member {
            Member::Class(inner) => Member::Class(strip_markers(inner)),
            other => other,
        })
        .collect();
    ClassDecl {
        body,
        markers: markers.without_search_results(),
        ..class
    }
}

fn class_state(
    before: &ClassDecl,
    result: &CompilationUnit,
    marked: Option<&[String]>,
    formatted: &[String],
) -> ClassState {
    if marked.is_some_and(|names| !names.contains(&before.name)) {
        return ClassState::Unmarked;
    }
    if formatted.contains(&before.name) {
        return ClassState::Formatted;
    }
    match result.class(&before.name) {
        Some(after) if after == before => ClassState::Applicable,
        _ => ClassState::Mutated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, MethodCall, ToSource};
    use crate::cursor::Cursor;
    use crate::parser::{JavaParser, Parser};
    use crate::visitor::TreeVisitor;

    /// Renames every `legacy()` call to `modern()`, everywhere
    struct RenameCalls;

    struct RenameVisitor;

    impl TreeVisitor for RenameVisitor {
        fn visit_method_call(&mut self, call: MethodCall, cursor: &Cursor) -> Result<Expr> {
            if call.name == "legacy" {
                cursor.do_after_visit(AfterVisit::AddImport("com.example.Modern".into()));
                return Ok(Expr::MethodCall(MethodCall {
                    name: "modern".into(),
                    ..call
                }));
            }
            Ok(Expr::MethodCall(call))
        }
    }

    impl Recipe for RenameCalls {
        fn name(&self) -> &'static str {
            "RenameCalls"
        }

        fn display_name(&self) -> &'static str {
            "Rename calls"
        }

        fn description(&self) -> &'static str {
            "Renames legacy() to modern()."
        }

        fn visitor(&self) -> Box<dyn TreeVisitor> {
            Box::new(RenameVisitor)
        }
    }

    fn parse(source: &str) -> CompilationUnit {
        JavaParser::new().parse(source).expect("parse")
    }

    #[test]
    fn test_recipe_without_applicability_test() {
        let runner = RecipeRunner::new().with_recipe(Box::new(RenameCalls));
        let unit = parse("package a;\nclass A {\n    void f() {\n        legacy();\n    }\n}\n");

        let outcome = runner.run(&unit).expect("run");
        assert!(outcome.is_changed());
        assert_eq!(outcome.classes()[0].state, ClassState::Mutated);
        let text = outcome.into_unit().expect("unit").to_source();
        assert!(text.contains("import com.example.Modern;"));
        assert!(text.contains("modern();"));

        let stats = runner.stats();
        assert_eq!(stats[0].applications, 1);
        assert_eq!(stats[0].transformations, 1);
    }

    #[test]
    fn test_untouched_unit_is_unchanged() {
        let runner = RecipeRunner::new().with_recipe(Box::new(RenameCalls));
        let unit = parse("package a;\nclass A {\n    void f() {\n        other();\n    }\n}\n");

        let outcome = runner.run(&unit).expect("run");
        assert_eq!(
            outcome,
            UnitOutcome::Unchanged {
                classes: vec![ClassReport {
                    recipe: "RenameCalls".into(),
                    class: "A".into(),
                    state: ClassState::Applicable,
                }]
            }
        );
    }

    #[test]
    fn test_runner_without_recipes() {
        let unit = parse("package a;\nclass A {\n}\n");
        assert_eq!(
            RecipeRunner::default().run(&unit).expect("run"),
            UnitOutcome::NotApplicable
        );
    }
}
