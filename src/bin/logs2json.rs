//! Command line conversion of ANT-MOC logs to JSON record snapshots
//!
//! Parses every log file once and saves the typed field values as one JSON
//! file per log. The snapshots are read back much faster than the raw logs,
//! e.g. by `logextract --format json`.
//!
//! # Usage
//!
//! ```text
//! Usage: logs2json <paths>... [options]
//! ```
//!
//! ### > How to convert a directory of logs
//!
//! ```bash
//! logs2json "log/**/*.log" --output db/
//! ```
//!
//! ### > How to dump the field definitions used
//!
//! ```bash
//! logs2json --dump-fields fields.json
//! ```

// standard libraries
use std::path::PathBuf;

// crate modules
use antmocdata::log::{DatabaseOptions, FieldRegistry, LogDatabase, LogFormat};
use antmocdata::utils::*;

// external crates
use anyhow::{Context, Result};
use clap::{arg, Parser};
use log::*;

#[doc(hidden)]
fn main() -> Result<()> {
    // set up the command line interface and match arguments
    let cli: Cli = Cli::parse();

    // set up logging (+2 to make Info the default)
    let verbosity = cli.verbose as usize + 2;
    logging_init(verbosity, cli.quiet);

    let mut registry = FieldRegistry::with_defaults();
    if let Some(path) = &cli.fields {
        registry.load_file(path)?;
    }

    if let Some(path) = &cli.dump_fields {
        info!("Writing field definitions to {}", path.display());
        std::fs::write(path, registry.to_json()?)
            .with_context(|| f!("Could not write {}", path.display()))?;
        if cli.paths.is_empty() {
            return Ok(());
        }
    }

    // find the log files, the cache keeps them for the save
    let mut database = LogDatabase::with_registry(registry);
    if cli.quiet || cli.verbose > 1 {
        database.disable_progress();
    }
    database.setup(&DatabaseOptions {
        filenames: cli.paths.clone(),
        format: LogFormat::Text,
        cache: true,
    });

    if database.is_empty() {
        warn!("No log files found");
        return Ok(());
    }

    // per-file failures are only listed, the rest is still saved
    match database.save(&cli.output) {
        Ok(n_saved) => info!("Saved {n_saved} record(s) to {}", cli.output.display()),
        Err(e) => {
            error!("{e}");
            info!(
                "Saved {} record(s) to {}",
                database.len() - e.failures.len(),
                cli.output.display()
            );
        }
    }

    Ok(())
}

#[allow(rustdoc::invalid_rust_codeblocks)]
/// Convert ANT-MOC log files to JSON record snapshots
///
/// Examples
/// --------
///
///  Typical use:
///     $ logs2json "log/**/*.log" -o db/
///
///  Use extra field definitions:
///     $ logs2json "log/**/*.log" --fields my_fields.json
///
///  Dump the default field definitions as a starting point:
///     $ logs2json --dump-fields fields.json
///
/// Notes
/// -----
///
/// Snapshot files are named by a hash of the log path, so converting the
/// same logs again overwrites the previous snapshots.
#[doc(hidden)]
#[derive(Parser)]
#[command(
    verbatim_doc_comment,
    arg_required_else_help(true),
    before_help(banner()),
    after_help("Typical use: logs2json \"log/**/*.log\" -o db/\n\nNOTE: --help shows more detail and examples"),
    term_width(70),
    override_usage("logs2json <paths>... [options]")
)]
struct Cli {
    // * Positional
    /// Log files, directories, or glob patterns
    #[arg(name = "paths")]
    paths: Vec<String>,

    // * Optional
    /// Directory for the snapshot files
    #[arg(short, long)]
    #[arg(default_value = "logdb")]
    #[arg(value_name = "dir")]
    output: PathBuf,

    /// Additional field definitions (JSON)
    #[arg(long)]
    #[arg(value_name = "path")]
    fields: Option<PathBuf>,

    /// Write the field definitions in use to a file
    #[arg(long)]
    #[arg(value_name = "path")]
    dump_fields: Option<PathBuf>,

    // * Flags
    /// Verbose logging (-v, -vv)
    ///
    /// If specified, the default log level of INFO is increased to DEBUG (-v)
    /// or TRACE (-vv). Errors and Warnings are always logged unless in quiet
    /// (-q) mode.
    #[arg(short, long)]
    #[arg(action = clap::ArgAction::Count)]
    verbose: u8,

    /// Supress all log output (overrules --verbose)
    #[arg(short, long)]
    quiet: bool,
}

#[doc(hidden)]
fn banner() -> String {
    let mut s = f!("{:-<1$}\n", "", 70);
    s += &f!("{:^70}\n", "ANT-MOC :: LogsToJson");
    s += &f!("{:-<1$}", "", 70);
    s
}

#[doc(hidden)]
fn logging_init(verbosity: usize, quiet: bool) {
    stderrlog::new()
        .modules(vec![
            module_path!(),
            "antmocdata::log",
            "antmocdata::readers",
        ])
        .quiet(quiet)
        .verbosity(verbosity)
        .show_level(false)
        .color(stderrlog::ColorChoice::Never)
        .timestamp(stderrlog::Timestamp::Off)
        .init()
        .unwrap();
}
