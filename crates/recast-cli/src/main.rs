use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Arg, ArgAction, Command};
use recast_cli::{render, run, CliOptions, OutputFormat};
use recast_core::init_tracing_at;

fn main() -> Result<ExitCode> {
    // Parse command line arguments
    let matches = Command::new("recast")
        .version(recast_core::VERSION)
        .about("Rewrites RandomUtil classes to draw random strings from SecureRandom")
        .arg(
            Arg::new("paths")
                .value_name("PATHS")
                .help("Files or directories to rewrite (default: current directory)")
                .value_parser(clap::value_parser!(PathBuf))
                .num_args(0..),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("JSON configuration file")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Report what would change without writing files")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("jobs")
                .long("jobs")
                .short('j')
                .value_name("N")
                .help("Number of worker threads")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .value_name("FORMAT")
                .help("Summary format")
                .value_parser(["text", "json"])
                .default_value("text"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Enable debug logging")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    // Initialize logging
    init_tracing_at(if matches.get_flag("verbose") { "debug" } else { "info" });

    let format: OutputFormat = matches
        .get_one::<String>("format")
        .map(|format| format.parse())
        .transpose()?
        .unwrap_or_default();
    let options = CliOptions {
        paths: matches
            .get_many::<PathBuf>("paths")
            .map(|paths| paths.cloned().collect())
            .unwrap_or_default(),
        config: matches.get_one::<PathBuf>("config").cloned(),
        dry_run: matches.get_flag("dry-run"),
        jobs: matches.get_one::<usize>("jobs").copied(),
        format,
    };

    let report = run(&options)?;
    print!("{}", render(&report, options.format)?);

    Ok(if report.success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
