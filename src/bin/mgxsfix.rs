//! Command line checks and fixes for multi-group cross-section libraries
//!
//! Loads a JSON or XML material library, reports inconsistencies between the total
//! cross section and its components, finds negative values, and optionally
//! writes a repaired copy.
//!
//! # Usage
//!
//! ```text
//! Usage: mgxsfix <path> [options]
//! ```
//!
//! ### > How to check a library
//!
//! ```bash
//! mgxsfix mgxs.json --check-sigma-t --check-negative
//! ```
//!
//! ### > How to rebuild the total cross sections
//!
//! ```bash
//! mgxsfix mgxs.json --fix sigma-t -o mgxs_fixed.json
//! ```

// standard libraries
use std::path::PathBuf;

// crate modules
use antmocdata::mgxs::{Fix, MaterialLibrary};
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

    let mut library = MaterialLibrary::load_file(&cli.path)?;
    info!(
        "Found {} material(s) with {} group(s)",
        library.len(),
        library.ngroups
    );

    if cli.print {
        for material in &library.materials {
            info!("{material}");
        }
    }

    if cli.check_sigma_t {
        let report = library.check_sigma_t(cli.tolerance)?;
        match report.is_good() {
            true => info!("{report}"),
            false => warn!("{report}"),
        }
    }

    if cli.check_negative {
        let negatives = library.check_negative_xs();
        match negatives.is_empty() {
            true => info!("No negative cross sections"),
            false => {
                warn!("Found {} negative value(s):", negatives.len());
                for negative in &negatives {
                    warn!("    {negative}");
                }
            }
        }
    }

    if let Some(fix) = cli.fix {
        let fix = match fix {
            CliFix::SigmaS => Fix::SigmaS,
            CliFix::SigmaT => Fix::SigmaT,
        };
        info!("Applying {fix:?} fix");
        library.fix(fix)?;

        let path = cli.output.clone().unwrap_or(get_output_path(&cli));
        library.dump_file(path)?;
    }

    Ok(())
}

#[allow(rustdoc::invalid_rust_codeblocks)]
/// Check and fix multi-group cross-section libraries
///
/// Examples
/// --------
///
///  Run every check:
///     $ mgxsfix mgxs.json --check-sigma-t --check-negative
///
///  Loosen the sigma_t tolerance:
///     $ mgxsfix mgxs.json --check-sigma-t --tolerance 1e-8
///
///  Rebuild 'total' from absorption and scattering:
///     $ mgxsfix mgxs.json --fix sigma-t -o fixed.json
///
///  Balance the scatter matrix against 'transport':
///     $ mgxsfix mgxs.json --fix sigma-s
///
/// Notes
/// -----
///
/// The expected sigma_t is absorption plus the row sums of the 0th order
/// scatter matrix. Both 'total' and 'transport' are checked if present.
///
/// Libraries ending in '.xml' are read and written in the materials.xml
/// layout, anything else as JSON.
///
/// Without --output the fixed library is written next to the input with a
/// '_fixed' suffix and the same extension.
#[doc(hidden)]
#[derive(Parser)]
#[command(
    verbatim_doc_comment,
    arg_required_else_help(true),
    before_help(banner()),
    after_help("Typical use: mgxsfix mgxs.json --check-sigma-t --check-negative\n\nNOTE: --help shows more detail and examples"),
    term_width(70),
    hide_possible_values(true),
    override_usage("mgxsfix <path> [options]")
)]
struct Cli {
    // * Positional
    /// Path to the JSON or XML material library
    #[arg(name = "path")]
    path: PathBuf,

    // * Optional
    /// Check sigma_t against its components
    #[arg(help_heading("Check options"))]
    #[arg(long)]
    check_sigma_t: bool,

    /// Absolute tolerance of the sigma_t check
    #[arg(help_heading("Check options"))]
    #[arg(long)]
    #[arg(default_value_t = 1e-13)]
    #[arg(value_name = "value")]
    tolerance: f64,

    /// Report every negative cross section
    #[arg(help_heading("Check options"))]
    #[arg(long)]
    check_negative: bool,

    /// Print every material
    #[arg(help_heading("Check options"))]
    #[arg(long)]
    print: bool,

    /// Repair the library and write it out
    ///
    /// Available fixes:
    ///     > sigma-t (rebuild 'total')
    ///     > sigma-s (adjust the scatter diagonal)
    #[arg(help_heading("Fix options"))]
    #[arg(long, value_enum)]
    #[arg(verbatim_doc_comment)]
    #[arg(value_name = "fix")]
    fix: Option<CliFix>,

    /// Path of the fixed library
    #[arg(help_heading("Fix options"))]
    #[arg(short, long)]
    #[arg(value_name = "path")]
    output: Option<PathBuf>,

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

// Wrapper for the library fixes
#[doc(hidden)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum CliFix {
    SigmaS,
    SigmaT,
}

#[doc(hidden)]
fn banner() -> String {
    let mut s = f!("{:-<1$}\n", "", 70);
    s += &f!("{:^70}\n", "ANT-MOC :: MgxsFix");
    s += &f!("{:-<1$}", "", 70);
    s
}

#[doc(hidden)]
fn logging_init(verbosity: usize, quiet: bool) {
    stderrlog::new()
        .modules(vec![module_path!(), "antmocdata::mgxs"])
        .quiet(quiet)
        .verbosity(verbosity)
        .show_level(false)
        .color(stderrlog::ColorChoice::Never)
        .timestamp(stderrlog::Timestamp::Off)
        .init()
        .unwrap();
}

#[doc(hidden)]
fn get_output_path(cli: &Cli) -> PathBuf {
    let stem = cli
        .path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or(String::from("mgxs"));
    let extension = cli
        .path
        .extension()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or(String::from("json"));
    let path = cli.path.with_file_name(f!("{stem}_fixed.{extension}"));
    debug!("Set output path to {}", path.display());
    path
}
