//! Command line extraction of records from ANT-MOC log files
//!
//! Scans a collection of log files for the fields of interest, filters them,
//! and writes one row per matching log to a delimited table.
//!
//! # Usage
//!
//! ```text
//! Usage: logextract [options]
//! ```
//!
//! Help is printed with the `-h` flag, and `--help` will show examples, default
//! values, and any important behaviour.
//!
//! ## Field specs
//!
//! A spec is a field name regex with an optional comparison. Without a
//! comparison the fields are written to the table, with one the records are
//! filtered.
//!
//! ### > How to extract a few fields from every log
//!
//! ```bash
//! logextract -f "log/**/*.log" -e File Azims Polars Keff TotalTime
//! ```
//!
//! ### > How to filter records
//!
//! ```bash
//! # Only runs with 64 azimuthal angles and more than 2 polar angles
//! logextract -e File ".*Time" "Azims==64" "Polars>2"
//! ```
//!
//! ### > How to see which fields exist
//!
//! ```bash
//! logextract --help-fields
//! ```
//!
//! ## Reusing parsed logs
//!
//! Parsing thousands of logs is slow, so the parsed records can be saved with
//! `--savedb` and read back with `--format json`.
//!
//! ```bash
//! logextract -f "log/**/*.log" --savedb db/ -e File
//! logextract -f db/ --format json -e File Keff --sortby Keff
//! ```

// standard libraries
use std::path::PathBuf;

// crate modules
use antmocdata::log::{
    DatabaseOptions, Extractor, ExtractorOptions, FieldRegistry, LogDatabase, LogFormat, Query,
};
use antmocdata::utils::*;

// external crates
use anyhow::Result;
use clap::{arg, Parser, ValueEnum};
use log::*;

#[doc(hidden)]
fn main() -> Result<()> {
    // set up the command line interface and match arguments
    let cli: Cli = Cli::parse();

    // set up logging (+2 to make Info the default)
    let verbosity = cli.verbose as usize + 2;
    logging_init(verbosity, cli.quiet);

    // field definitions, defaults plus anything from the user
    let registry = registry_init(&cli)?;
    if cli.help_fields {
        println!("{}", registry.help());
        return Ok(());
    }

    // find the log files
    let mut database = LogDatabase::with_registry(registry);
    if cli.quiet || cli.verbose > 1 {
        database.disable_progress();
    }
    database.setup(&database_options(&cli));

    // failures are reported once at the end, so keep going
    if cli.cache {
        if let Err(e) = database.cache_all() {
            warn!("{} file(s) could not be cached", e.failures.len());
        }
    }

    if let Some(directory) = &cli.savedb {
        info!("Saving parsed records to {}", directory.display());
        if let Err(e) = database.save(directory) {
            warn!("{} record(s) could not be saved", e.failures.len());
        }
    }

    // query and write the table
    if cli.strict {
        Query::parse(&cli.specs)?.check_resolved(database.registry())?;
    }
    let mut extractor = Extractor::new(&mut database, extractor_options(&cli));
    let report = extractor.extract()?;

    info!("\n{report}");

    if !report.failures.is_empty() {
        error!("{} file(s) could not be read:", report.failures.len());
        for failure in &report.failures {
            error!("  - {failure}");
        }
    }

    Ok(())
}

#[allow(rustdoc::invalid_rust_codeblocks)]
/// Extract records from ANT-MOC log files
///
/// Examples
/// --------
///
///  Typical use:
///     $ logextract -f "log/**/*.log" -e File Azims Keff
///
///  Filter on field values:
///     $ logextract -e File ".*Time" "Azims==64" "Polars>2"
///
///  Overwrite the output and sort by a field:
///     $ logextract -e File Keff --sortby Keff --truncate
///
///  Save parsed logs and reuse them later:
///     $ logextract -f "log/**/*.log" --savedb db/
///     $ logextract -f db/ --format json -e File Keff
///
///  List every known field:
///     $ logextract --help-fields
///
/// Notes
/// -----
///
/// Field names are regular expressions matched against the whole name, so
/// '.*Time' selects every timing field.
///
/// Equality matches the parsed value in its plain form ('6' for 6.000,
/// '1e-5' for 1.0E-05) against the right hand side as a regex. Numbers also
/// match when both sides are equal numerically, so 'Tolerance==1.0E-05'
/// works. The other comparisons are numeric if both sides are numbers and
/// lexicographic otherwise.
///
/// Logs missing a field are excluded by any filter on that field, and show
/// an empty cell for a projected field.
#[doc(hidden)]
#[derive(Parser)]
#[command(
    verbatim_doc_comment,
    before_help(banner()),
    after_help("Typical use: logextract -f \"log/**/*.log\" -e File Azims Keff\n\nNOTE: --help shows more detail and examples"),
    term_width(70),
    hide_possible_values(true),
    override_usage("logextract [options]")
)]
struct Cli {
    // * Optional
    /// Log files, directories, or glob patterns
    ///
    /// Globs support '*', '?', and '**' for any number of directories.
    /// Directories include every file inside them.
    #[arg(help_heading("Database options"))]
    #[arg(short, long, num_args(1..))]
    #[arg(default_values_t = vec!["log/**/*.log".to_string()])]
    #[arg(value_name = "path")]
    filenames: Vec<String>,

    /// Format of the log files
    ///
    /// Available formats:
    ///     > text (default)
    ///     > json
    #[arg(help_heading("Database options"))]
    #[arg(short = 'x', long, value_enum)]
    #[arg(hide_default_value(true))]
    #[arg(default_value_t = CliFormat::Text)]
    #[arg(verbatim_doc_comment)]
    #[arg(value_name = "format")]
    format: CliFormat,

    /// Parse every log before querying
    #[arg(help_heading("Database options"))]
    #[arg(long)]
    cache: bool,

    /// Save parsed records to a directory
    ///
    /// One JSON file is written per log, and can be read back with
    /// '--format json'.
    #[arg(help_heading("Database options"))]
    #[arg(long)]
    #[arg(value_name = "dir")]
    savedb: Option<PathBuf>,

    /// Additional field definitions (JSON)
    ///
    /// Definitions with the name of an existing field replace it.
    #[arg(help_heading("Database options"))]
    #[arg(long)]
    #[arg(value_name = "path")]
    fields: Option<PathBuf>,

    /// Field specs to query
    ///
    /// e.g. File Azims ".*Time" "Polars>2"
    #[arg(help_heading("Query options"))]
    #[arg(short = 'e', long, num_args(1..))]
    #[arg(default_values_t = vec![".*".to_string()])]
    #[arg(value_name = "spec")]
    specs: Vec<String>,

    /// Sort records by a field
    #[arg(help_heading("Query options"))]
    #[arg(long)]
    #[arg(value_name = "field")]
    sortby: Option<String>,

    /// Fail if a spec matches no field
    #[arg(help_heading("Query options"))]
    #[arg(long)]
    strict: bool,

    /// Name of the output file
    #[arg(help_heading("Output options"))]
    #[arg(short, long)]
    #[arg(default_value = "antmoc-records.csv")]
    #[arg(value_name = "path")]
    output: PathBuf,

    /// Delimiter between cells
    #[arg(help_heading("Output options"))]
    #[arg(long)]
    #[arg(default_value = ",")]
    #[arg(value_name = "str")]
    delimiter: String,

    /// Overwrite the output rather than append
    #[arg(help_heading("Output options"))]
    #[arg(long)]
    truncate: bool,

    /// Only print the summary
    #[arg(help_heading("Output options"))]
    #[arg(long)]
    summary: bool,

    /// List the available fields and exit
    #[arg(long)]
    help_fields: bool,

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

// Wrapper for the log file format
#[doc(hidden)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum CliFormat {
    Text,
    Json,
}

#[doc(hidden)]
fn banner() -> String {
    let mut s = f!("{:-<1$}\n", "", 70);
    s += &f!("{:^70}\n", "ANT-MOC :: LogExtract");
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

#[doc(hidden)]
fn registry_init(cli: &Cli) -> Result<FieldRegistry> {
    let mut registry = FieldRegistry::with_defaults();
    if let Some(path) = &cli.fields {
        let n_fields = registry.load_file(path)?;
        info!("Loaded {n_fields} field definition(s) from {}", path.display());
    }
    Ok(registry)
}

#[doc(hidden)]
fn database_options(cli: &Cli) -> DatabaseOptions {
    DatabaseOptions {
        filenames: cli.filenames.clone(),
        format: match cli.format {
            CliFormat::Text => LogFormat::Text,
            CliFormat::Json => LogFormat::Json,
        },
        cache: cli.cache,
    }
}

#[doc(hidden)]
fn extractor_options(cli: &Cli) -> ExtractorOptions {
    ExtractorOptions {
        specs: cli.specs.clone(),
        sort_by: cli.sortby.clone(),
        delimiter: cli.delimiter.clone(),
        output: cli.output.clone(),
        truncate: cli.truncate,
        summary: cli.summary,
    }
}
