//! Command line conversion of ANT-MOC reaction rates to VTK formats
//!
//! Reads the lattice arrays of a solution `.vtu` file and writes them as a
//! rectilinear grid with real dimensions, ready for Paraview or Visit.
//!
//! # Usage
//!
//! ```text
//! Usage: rx2vtk <path> [options]
//! ```
//!
//! ### > How to convert every array
//!
//! ```bash
//! rx2vtk reaction_rates.vtu --pitch 1.26 1.26 1.0
//! ```
//!
//! ### > How to convert only the fission rates, normalised
//!
//! ```bash
//! rx2vtk reaction_rates.vtu --filters "Fission" --normalize
//! ```

// standard libraries
use std::path::PathBuf;

// crate modules
use antmocdata::solution::{read_vtu, Solution};
use antmocdata::utils::*;
use antmocdata::vtk::{write_vtk, SolutionToVtk, SolutionToVtkBuilder, VtkFormat};

// external crates
use anyhow::Result;
use clap::{arg, Parser, ValueEnum};
use log::*;
use vtkio::model::ByteOrder;

#[doc(hidden)]
fn main() -> Result<()> {
    // set up the command line interface and match arguments
    let cli: Cli = Cli::parse();

    // set up logging (+2 to make Info the default)
    let verbosity = cli.verbose as usize + 2;
    logging_init(verbosity, cli.quiet);

    // Get the solution arrays
    info!("Reading {}", cli.path.display());
    let mut solution = read_vtu(&cli.path, &cli.filters)?;
    if solution.is_empty() {
        warn!("No arrays matched the filters {:?}", cli.filters);
        return Ok(());
    }

    debug!("{solution}");

    if let Some(scale) = cli.scale {
        info!("Scaling results by {:.5e}", scale);
        scale_solution(&mut solution, scale);
    }

    // Generate the vtk and write to file
    info!("Converting {} array(s) to VTK object", solution.len());
    let convertor = converter_init(&cli);
    let vtk = convertor.convert(&solution)?;

    let path = get_output_path(&cli);

    info!("Writing VTK to {}", path.display());
    write_vtk(vtk, path, cli.format)?;

    Ok(())
}

#[allow(rustdoc::invalid_rust_codeblocks)]
/// Conversion of ANT-MOC reaction rate files to visual toolkit formats
///
/// Examples
/// --------
///
///  Typical use:
///     $ rx2vtk reaction_rates.vtu -o rx
///
///  Set the real lattice dimensions:
///     $ rx2vtk reaction_rates.vtu        \
///               --pitch 1.26 1.26 10.0   \
///               --origin -32.13 -32.13 0.0
///
///  Only the fission rates, normalised to a mean of 1:
///     $ rx2vtk reaction_rates.vtu --filters "Fission" --normalize
///
///  Output legacy in ascii format:
///     $ rx2vtk reaction_rates.vtu --format legacy-ascii
///
/// Notes
/// -----
///
/// Filters are regular expressions, an array is kept if any of them
/// matches part of its name. Without filters every array is converted,
/// including 'Valid Indices'.
///
/// Normalisation divides by the mean of the non-zero cells, so empty
/// moderator regions do not drag the average down.
///
/// The y axis is flipped back to the orientation of the input file.
#[doc(hidden)]
#[derive(Parser)]
#[command(
    verbatim_doc_comment,
    arg_required_else_help(true),
    before_help(banner()),
    after_help("Typical use: rx2vtk reaction_rates.vtu -o rx\n\nNOTE: --help shows more detail and examples"),
    term_width(70),
    hide_possible_values(true),
    override_usage("rx2vtk <path> [options]")
)]
struct Cli {
    // * Positional
    /// Path to input .vtu file
    #[arg(name = "path")]
    path: PathBuf,

    // * Optional
    /// Regex filters for array names
    ///
    /// e.g. "Fission" "^Avg.*Flux"
    #[arg(help_heading("Solution options"))]
    #[arg(long, num_args(1..))]
    #[arg(value_name = "regex")]
    filters: Vec<String>,

    /// Normalise each array to a mean of 1
    #[arg(help_heading("Solution options"))]
    #[arg(long)]
    normalize: bool,

    /// Multiply all results by a constant
    #[arg(help_heading("Solution options"))]
    #[arg(long)]
    #[arg(value_name = "value")]
    scale: Option<f64>,

    /// Lattice pitch in x, y, z
    #[arg(help_heading("Vtk options"))]
    #[arg(long, num_args(3))]
    #[arg(allow_hyphen_values(true))]
    #[arg(value_names(["x", "y", "z"]))]
    pitch: Option<Vec<f64>>,

    /// Coordinates of the lower corner
    #[arg(help_heading("Vtk options"))]
    #[arg(long, num_args(3))]
    #[arg(allow_hyphen_values(true))]
    #[arg(value_names(["x", "y", "z"]))]
    origin: Option<Vec<f64>>,

    /// Name of output file (excl. extension)
    ///
    /// Defaults to 'rx', the extension is added from the format.
    #[arg(help_heading("Vtk options"))]
    #[arg(short, long)]
    #[arg(value_name = "path")]
    output: Option<String>,

    /// VTK output format
    ///
    /// Available visual toolkit file formats:
    ///     > xml (default)
    ///     > legacy-ascii
    ///     > legacy-binary
    #[arg(help_heading("Vtk options"))]
    #[arg(short, long, value_enum)]
    #[arg(hide_default_value(true))]
    #[arg(default_value_t = VtkFormat::Xml)]
    #[arg(verbatim_doc_comment)]
    #[arg(value_name = "format")]
    format: VtkFormat,

    /// Byte ordering
    ///
    /// Visit only reads big endian, most sytems are little endian.
    /// Defaults to big endian for convenience over performance.
    ///     > big-endian (default)
    ///     > little-endian
    #[arg(help_heading("Vtk options"))]
    #[arg(long, value_enum)]
    #[arg(hide_default_value(true))]
    #[arg(default_value_t = CliByteOrder::BigEndian)]
    #[arg(verbatim_doc_comment)]
    #[arg(value_name = "endian")]
    endian: CliByteOrder,

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

// Wrapper for byte order used by vtkio
#[doc(hidden)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum CliByteOrder {
    BigEndian,
    LittleEndian,
}

#[doc(hidden)]
fn banner() -> String {
    let mut s = f!("{:-<1$}\n", "", 70);
    s += &f!("{:^70}\n", "ANT-MOC :: RxToVtk");
    s += &f!("{:-<1$}", "", 70);
    s
}

#[doc(hidden)]
fn logging_init(verbosity: usize, quiet: bool) {
    stderrlog::new()
        .modules(vec![
            module_path!(),
            "antmocdata::readers",
            "antmocdata::solution",
            "antmocdata::vtk",
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
fn converter_init(cli: &Cli) -> SolutionToVtk {
    let mut builder = SolutionToVtkBuilder::new().normalize(cli.normalize);

    if let Some([x, y, z]) = cli.pitch.as_deref() {
        builder = builder.pitch([*x, *y, *z]);
    }

    if let Some([x, y, z]) = cli.origin.as_deref() {
        builder = builder.origin([*x, *y, *z]);
    }

    builder = builder.byte_order(match cli.endian {
        CliByteOrder::LittleEndian => ByteOrder::LittleEndian,
        CliByteOrder::BigEndian => ByteOrder::BigEndian,
    });

    builder.build()
}

#[doc(hidden)]
fn scale_solution(solution: &mut Solution, factor: f64) {
    for (_, array) in solution.arrays.iter_mut() {
        array.scale(factor);
    }
}

#[doc(hidden)]
fn get_output_path(cli: &Cli) -> PathBuf {
    let name = cli.output.clone().unwrap_or(String::from("rx"));
    let path = PathBuf::from(f!("{name}.{}", cli.format.extension()));
    debug!("Set output path to {}", path.display());
    path
}
