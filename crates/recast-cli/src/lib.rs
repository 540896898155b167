//! Recast CLI - command-line driver for the secure-random recipe
//!
//! Builds a `FileTracer` from a configuration file plus command-line
//! overrides, runs it over the given paths and renders the summary.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::Serialize;

use recast_core::recipes::FixCwe338;
use recast_core::tracer::{
    FileStatus, FileTracer, FileTransformationSummary, RecipeRunner, RuleStats,
};
use recast_core::RecastConfig;

/// How the run summary is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(anyhow!("Unknown output format: {other}")),
        }
    }
}

/// Options collected from the command line
#[derive(Debug, Clone, Default)]
pub struct CliOptions {
    pub paths: Vec<PathBuf>,
    pub config: Option<PathBuf>,
    pub dry_run: bool,
    pub jobs: Option<usize>,
    pub format: OutputFormat,
}

impl CliOptions {
    /// Configuration file contents with command-line overrides applied
    pub fn resolve_config(&self) -> Result<RecastConfig> {
        let mut config = match &self.config {
            Some(path) => RecastConfig::from_file(path)?,
            None => RecastConfig::default(),
        };
        if self.dry_run {
            config.runner.dry_run = true;
        }
        if let Some(jobs) = self.jobs {
            config.runner.jobs = Some(jobs);
        }
        Ok(config)
    }
}

/// Outcome of one invocation
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub summary: FileTransformationSummary,
    pub stats: Vec<RuleStats>,
}

impl RunReport {
    pub fn success(&self) -> bool {
        self.summary.success()
    }
}

/// Run the recipe over every path in `options`
pub fn run(options: &CliOptions) -> Result<RunReport> {
    let config = options.resolve_config()?;
    let runner = RecipeRunner::new().with_recipe(Box::new(FixCwe338::new(config.recipe)));
    let tracer = FileTracer::new(runner, config.runner)?;

    let paths = if options.paths.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        options.paths.clone()
    };
    let summary = tracer.transform_paths(&paths)?;
    Ok(RunReport {
        summary,
        stats: tracer.stats(),
    })
}

/// Render a report in the requested format
pub fn render(report: &RunReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Text => Ok(render_text(report)),
    }
}

fn render_text(report: &RunReport) -> String {
    let summary = &report.summary;
    let mut out = String::new();
    let verb = if summary.dry_run { "Would change" } else { "Changed" };

    for file in &summary.files {
        match &file.status {
            FileStatus::Changed => {
                let _ = writeln!(out, "{verb}: {}", file.path.display());
            }
            FileStatus::Failed(message) => {
                let _ = writeln!(out, "Failed: {}: {message}", file.path.display());
            }
            FileStatus::Unchanged | FileStatus::NotApplicable => {}
        }
    }

    let _ = writeln!(
        out,
        "{} files processed, {} {}, {} not applicable, {} failed",
        summary.files_processed,
        summary.files_transformed,
        if summary.dry_run { "would change" } else { "changed" },
        summary.files_not_applicable,
        summary.errors.len()
    );
    for stats in &report.stats {
        let _ = writeln!(
            out,
            "  {}: {} applicable, {} changed, {} errors ({:.1} ms avg)",
            stats.rule_name,
            stats.applications,
            stats.transformations,
            stats.errors,
            stats.average_time_ms()
        );
    }
    out
}
