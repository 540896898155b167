/*!
# FileTracer - Batch Rewriting of Source Trees

Finds source files under the given paths, runs a `RecipeRunner` over each
one in parallel and writes changed files back in place. Files are
independent: a failure is recorded in the summary and leaves that file
untouched.
*/

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::ast::ToSource;
use crate::parser::create_parser;

use super::recipe_runner::{ClassReport, RecipeRunner, UnitOutcome};
use super::rules::RuleStats;
use super::TransformResult;

/// File discovery and execution settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Extensions of files to process, without the dot
    pub extensions: Vec<String>,
    /// Directory names never descended into
    pub skip_dirs: Vec<String>,
    /// Regular expressions matched against file paths to exclude
    pub exclude_patterns: Vec<String>,
    /// Compute results without writing files
    pub dry_run: bool,
    /// Worker threads; rayon's default when unset
    pub jobs: Option<usize>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["java".to_string()],
            skip_dirs: vec!["target".to_string(), "build".to_string(), ".git".to_string()],
            exclude_patterns: Vec::new(),
            dry_run: false,
            jobs: None,
        }
    }
}

/// What happened to one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    NotApplicable,
    Unchanged,
    /// Rewritten, or would be in dry-run mode
    Changed,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub status: FileStatus,
    pub classes: Vec<ClassReport>,
}

impl FileReport {
    fn failed(path: &Path, message: String) -> Self {
        Self {
            path: path.to_path_buf(),
            status: FileStatus::Failed(message),
            classes: Vec::new(),
        }
    }
}

/// File-based rewriting system
pub struct FileTracer {
    runner: RecipeRunner,
    config: RunnerConfig,
    exclude: Vec<Regex>,
}

impl FileTracer {
    pub fn new(runner: RecipeRunner, config: RunnerConfig) -> TransformResult<Self> {
        let exclude = config
            .exclude_patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).with_context(|| format!("Invalid exclude pattern {pattern:?}"))
            })
            .collect::<TransformResult<Vec<_>>>()?;
        Ok(Self {
            runner,
            config,
            exclude,
        })
    }

    /// Enable dry-run mode (results are computed but files are not written)
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.config.dry_run = enabled;
        self
    }

    /// Set the number of worker threads
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.config.jobs = Some(jobs);
        self
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn runner(&self) -> &RecipeRunner {
        &self.runner
    }

    /// Get per-recipe statistics
    pub fn stats(&self) -> Vec<RuleStats> {
        self.runner.stats()
    }

    /// Transform all matching files under a directory
    pub fn transform_directory<P: AsRef<Path>>(
        &self,
        dir: P,
    ) -> TransformResult<FileTransformationSummary> {
        self.transform_paths(&[dir.as_ref().to_path_buf()])
    }

    /// Transform files and directories; directories are searched recursively
    pub fn transform_paths(
        &self,
        paths: &[PathBuf],
    ) -> TransformResult<FileTransformationSummary> {
        let mut files = Vec::new();
        for path in paths {
            files.extend(self.collect_files(path)?);
        }
        files.sort();
        files.dedup();
        debug!(count = files.len(), "Collected source files");

        let mut summary = FileTransformationSummary::new();
        summary.dry_run = self.config.dry_run;
        for report in self.process(&files) {
            summary.record(report);
        }
        Ok(summary)
    }

    /// Source files under `root`, or `root` itself if it is a source file
    pub fn collect_files<P: AsRef<Path>>(&self, root: P) -> TransformResult<Vec<PathBuf>> {
        let root = root.as_ref();
        if !root.exists() {
            return Err(anyhow!("Path does not exist: {}", root.display()));
        }

        let mut files = Vec::new();
        if root.is_dir() {
            self.collect_recursive(root, &mut files)?;
        } else if self.should_process_file(root) {
            files.push(root.to_path_buf());
        }
        files.sort();
        Ok(files)
    }

    fn collect_recursive(&self, dir: &Path, files: &mut Vec<PathBuf>) -> TransformResult<()> {
        for entry in fs::read_dir(dir).with_context(|| format!("Reading {}", dir.display()))? {
            let path = entry?.path();
            if path.is_dir() {
                if self.should_skip_dir(&path) {
                    debug!(dir = %path.display(), "Skipping directory");
                } else {
                    self.collect_recursive(&path, files)?;
                }
            } else if self.should_process_file(&path) {
                files.push(path);
            }
        }
        Ok(())
    }

    fn should_skip_dir(&self, path: &Path) -> bool {
        path.file_name()
            .map(|name| name.to_string_lossy())
            .is_some_and(|name| self.config.skip_dirs.iter().any(|skip| *skip == name))
    }

    /// Check if a file should be processed based on its extension and the exclude patterns
    fn should_process_file(&self, path: &Path) -> bool {
        let Some(extension) = path.extension() else {
            return false;
        };
        let ext_str = extension.to_string_lossy().to_lowercase();
        if !self
            .config
            .extensions
            .iter()
            .any(|ext| ext.to_lowercase() == ext_str)
        {
            return false;
        }
        let display = path.to_string_lossy();
        !self.exclude.iter().any(|pattern| pattern.is_match(&display))
    }

    fn process(&self, files: &[PathBuf]) -> Vec<FileReport> {
        let run = || -> Vec<FileReport> { files.par_iter().map(|path| self.report(path)).collect() };
        match self.config.jobs {
            Some(jobs) => match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
                Ok(pool) => pool.install(run),
                Err(err) => {
                    warn!(jobs, error = %err, "Could not build thread pool, using the global pool");
                    run()
                }
            },
            None => run(),
        }
    }

    fn report(&self, path: &Path) -> FileReport {
        match self.transform_file(path) {
            Ok(report) => report,
            Err(err) => {
                warn!(file = %path.display(), error = %format!("{err:#}"), "Failed to transform file");
                FileReport::failed(path, format!("{err:#}"))
            }
        }
    }

    /// Transform a single file in place
    pub fn transform_file<P: AsRef<Path>>(&self, path: P) -> TransformResult<FileReport> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
        let (status, classes) = self.transform_source(&source, path)?;
        Ok(FileReport {
            path: path.to_path_buf(),
            status,
            classes,
        })
    }

    fn transform_source(
        &self,
        source: &str,
        path: &Path,
    ) -> TransformResult<(FileStatus, Vec<ClassReport>)> {
        let mut parser = create_parser("java")?;
        let unit = parser.parse(source)?;
        let outcome = self.runner.run(&unit)?;
        let classes = outcome.classes().to_vec();

        let status = match outcome {
            UnitOutcome::NotApplicable => {
                debug!(file = %path.display(), "No recipe applies");
                FileStatus::NotApplicable
            }
            UnitOutcome::Unchanged { .. } => FileStatus::Unchanged,
            UnitOutcome::Changed { unit, .. } => {
                let text = unit.to_source();
                if text == source {
                    FileStatus::Unchanged
                } else {
                    if !self.config.dry_run {
                        write_atomically(path, &text)?;
                    }
                    info!(file = %path.display(), dry_run = self.config.dry_run, "Transformed file");
                    FileStatus::Changed
                }
            }
        };
        Ok((status, classes))
    }
}

/// Replace `path` with `contents` through a temporary file in the same directory
fn write_atomically(path: &Path, contents: &str) -> TransformResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Creating temporary file in {}", dir.display()))?;
    temp.write_all(contents.as_bytes())?;
    temp.persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("Writing {}", path.display()))?;
    Ok(())
}

/// Summary of file transformation results
#[derive(Debug, Default, Clone, Serialize)]
pub struct FileTransformationSummary {
    pub files_processed: u64,
    pub files_transformed: u64,
    pub files_not_applicable: u64,
    pub dry_run: bool,
    pub files: Vec<FileReport>,
    pub errors: Vec<String>,
}

impl FileTransformationSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, report: FileReport) {
        self.files_processed += 1;
        match &report.status {
            FileStatus::Changed => self.files_transformed += 1,
            FileStatus::NotApplicable => self.files_not_applicable += 1,
            FileStatus::Failed(message) => self
                .errors
                .push(format!("Error processing {}: {message}", report.path.display())),
            FileStatus::Unchanged => {}
        }
        self.files.push(report);
    }

    pub fn merge(&mut self, other: FileTransformationSummary) {
        self.files_processed += other.files_processed;
        self.files_transformed += other.files_transformed;
        self.files_not_applicable += other.files_not_applicable;
        self.files.extend(other.files);
        self.errors.extend(other.errors);
    }

    pub fn changed_files(&self) -> impl Iterator<Item = &Path> {
        self.files
            .iter()
            .filter(|report| report.status == FileStatus::Changed)
            .map(|report| report.path.as_path())
    }

    pub fn success_rate(&self) -> f64 {
        if self.files_processed == 0 {
            0.0
        } else {
            (self.files_transformed as f64) / (self.files_processed as f64)
        }
    }

    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracer(config: RunnerConfig) -> FileTracer {
        FileTracer::new(RecipeRunner::new(), config).expect("tracer")
    }

    #[test]
    fn test_collect_files_filters_and_skips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        fs::create_dir_all(root.join("src/util")).expect("mkdir");
        fs::create_dir_all(root.join("target/gen")).expect("mkdir");
        fs::write(root.join("src/util/RandomUtil.java"), "class A {}").expect("write");
        fs::write(root.join("src/util/Generated.java"), "class B {}").expect("write");
        fs::write(root.join("src/util/notes.txt"), "").expect("write");
        fs::write(root.join("target/gen/Copy.java"), "class C {}").expect("write");

        let config = RunnerConfig {
            exclude_patterns: vec!["Generated\\.java$".to_string()],
            ..RunnerConfig::default()
        };
        let files = tracer(config).collect_files(root).expect("collect");
        assert_eq!(files, vec![root.join("src/util/RandomUtil.java")]);
    }

    #[test]
    fn test_invalid_exclude_pattern() {
        let config = RunnerConfig {
            exclude_patterns: vec!["(".to_string()],
            ..RunnerConfig::default()
        };
        assert!(FileTracer::new(RecipeRunner::new(), config).is_err());
    }

    #[test]
    fn test_missing_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(tracer(RunnerConfig::default())
            .collect_files(dir.path().join("missing"))
            .is_err());
    }

    #[test]
    fn test_summary_merge() {
        let mut summary = FileTransformationSummary::new();
        summary.record(FileReport {
            path: PathBuf::from("A.java"),
            status: FileStatus::Changed,
            classes: Vec::new(),
        });
        let mut other = FileTransformationSummary::new();
        other.record(FileReport::failed(Path::new("B.java"), "boom".to_string()));

        summary.merge(other);
        assert_eq!(summary.files_processed, 2);
        assert_eq!(summary.success_rate(), 0.5);
        assert!(!summary.success());
        assert_eq!(summary.changed_files().collect::<Vec<_>>(), vec![Path::new("A.java")]);
    }
}
