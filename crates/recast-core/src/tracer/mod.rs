/*!
# Tracer - Recipe Execution over Source Trees

Runs rewrite recipes over parsed compilation units and over whole source
trees on disk.

## Architecture

- `Recipe`: Trait for defining rewrite recipes (applicability test + visitor)
- `RecipeRunner`: Two-phase execution of recipes over one unit
- `FileTracer`: File discovery, parallel execution and in-place writes
- Pattern matching utilities for read-only tree searches

## Example Usage

```rust,no_run
use recast_core::recipes::FixCwe338;
use recast_core::tracer::{FileTracer, RecipeRunner, RunnerConfig};

let runner = RecipeRunner::new().with_recipe(Box::new(FixCwe338::default()));
let tracer = FileTracer::new(runner, RunnerConfig::default())?.dry_run(true);
let summary = tracer.transform_directory("src/main/java")?;
println!("{} files would change", summary.files_transformed);
# Ok::<(), anyhow::Error>(())
```
*/

pub mod file_tracer;
pub mod patterns;
pub mod recipe_runner;
pub mod rules;

// Re-export main types
pub use file_tracer::{FileReport, FileStatus, FileTracer, FileTransformationSummary, RunnerConfig};
pub use patterns::{AstPattern, PatternMatcher, TreeWalker};
pub use recipe_runner::{ClassReport, ClassState, RecipeRunner, UnitOutcome};
pub use rules::{Recipe, RuleStats};

// Common result type for batch transformations
pub type TransformResult<T> = anyhow::Result<T>;
