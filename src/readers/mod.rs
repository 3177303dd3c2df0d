#![doc(hidden)]
//! Library of readers and common functions for various file formats

// crate modules
use crate::log::{FieldRegistry, LogRecord};
use crate::solution::Solution;

// standard library
use std::path::Path;

// external crates
use anyhow::Result;

// files under the readers module
mod log_file;
pub mod parsers;
mod vtu_file;

// inline the reader structs for a nice API
#[doc(inline)]
pub use crate::readers::log_file::{
    file_metadata, LogFileReader, FILE, FILE_SIZE, FILE_TIMESTAMP, JOB_ID,
};

#[doc(inline)]
pub use crate::readers::vtu_file::{VtuReader, VALID_INDICES};

/// Read a single ANT-MOC log with the default field definitions
///
/// Returns a [LogRecord] of every field found in the file at `path`, plus the
/// filesystem metadata fields.
///
/// - `path` - Path to the log file, can be [&str], [String], [Path], etc...
///
/// Example
/// ```ignore
/// let record = antmocdata::read_log("log/12345-c5g7.log")?;
/// println!("{:?}", record.get("Keff"));
/// ```
pub fn read_log<P: AsRef<Path>>(path: P) -> Result<LogRecord> {
    let registry = FieldRegistry::with_defaults();
    LogFileReader::new(&registry).parse(path.as_ref())
}

/// Read the reaction rates of an ANT-MOC `.vtu` file
///
/// Returns a [Solution] holding a dense `[z][j][k]` array for every data
/// array whose name matches at least one of the `filters` regexes. All arrays
/// are read if `filters` is empty.
///
/// - `path` - Path to the `.vtu` file, can be [&str], [String], [Path], etc...
/// - `filters` - Regexes searched for anywhere in the array names
///
/// Example
/// ```ignore
/// let solution = antmocdata::read_vtu("rx.vtu", &["^Avg Fission RX$"])?;
/// ```
pub fn read_vtu<P: AsRef<Path>, S: AsRef<str>>(path: P, filters: &[S]) -> Result<Solution> {
    VtuReader::new()
        .with_filters(filters)?
        .parse(path.as_ref())
}
