//! # The antmocdata crate
//!
//! A collection of data tools for the ANT-MOC neutron transport code
//!
//! ## Installation
//!
//! Direct install from the repository:
//!
//! ```shell
//! cargo install --path .
//! ```
//!
//! ## Overview
//!
//! The crate contains several command line tools for common tasks around
//! ANT-MOC runs: collecting results from piles of log files, converting
//! reaction rates for plotting, and checking cross-section libraries.
//!
//! | Command line | Description                                               |
//! | ------------ | --------------------------------------------------------- |
//! | `logextract` | Query log files and write matching records to a table     |
//! | `logs2json`  | Parse log files once and save them as JSON snapshots      |
//! | `rx2vtk`     | Convert a reaction rate `.vtu` file to VTK formats        |
//! | `mgxsfix`    | Check and fix a multi-group cross-section library         |
//!
//! All tools are documented with detailed `--help` messages, including
//! examples for common use cases.
//!
//! ### Log fields
//!
//! Every quantity of interest in a log is a [Field](crate::log::Field), a
//! name and type with one or more regex patterns. The default set covers
//! geometry, solver settings, decomposition, resources, and timings, and can
//! be extended or replaced from a JSON file.
//!
//! | Query spec   | Meaning                                         |
//! | ------------ | ----------------------------------------------- |
//! | `Azims`      | output the `Azims` field                        |
//! | `.*Time`     | output every field ending in `Time`             |
//! | `Azims==64`  | only logs where `Azims` is exactly `64`         |
//! | `Polars>2`   | only logs with more than two polar angles       |
//!
//! ## Advanced use
//!
//! The command line tools are thin wrappers, the library does the work.
//!
//! ```rust
//! use antmocdata::log::{FieldRegistry, Query};
//!
//! // the default field definitions
//! let registry = FieldRegistry::with_defaults();
//!
//! // projections and filters, expanded against the registry
//! let query = Query::parse(["File", ".*Time", "Polars>2"]).unwrap();
//! let resolved = query.resolve(&registry);
//! assert!(resolved.columns().contains(&"TotalTime".to_string()));
//! ```
//!
//! As an overview:
//! - The [log] module contains the field registry, log records, the query
//! language, the lazily cached database of log files, and the extractor.
//! - The [solution] module loads reaction rates from `.vtu` files into dense
//! 3D arrays.
//! - The [vtk] module writes solution arrays to VTK formats for plotting.
//! - The [mgxs] module holds multi-group cross-section materials and the
//! library checks and fixes.
//!
//! In the background, `regex` drives the field extraction, `nom` parses the
//! solution files, `clap` is used for the command line interface, and `vtkio`
//! allows conversions to various plot formats.
//!
//! The file readers are re-exported for convenience.

// Public facing modules
pub mod log;
pub mod mgxs;
pub mod solution;
pub mod utils;
pub mod vtk;

// note that docs are hidden to prevent confusing the current simple API
pub mod readers;

// Re-exports of useful data structures
#[doc(inline)]
pub use crate::readers::{read_log, read_vtu};
