//! Error types for log field extraction and querying
//!
//! Failures are isolated by scope. A bad field definition rejects the whole
//! `load` call, a bad query string is rejected before any file is touched, a
//! field that fails to coerce is simply absent, and per-file failures are
//! collected into a single [DatabaseError] so other files are unaffected.

// standard library
use std::path::PathBuf;

// crate modules
use crate::log::DType;
use crate::utils::f;

// external crates
use itertools::Itertools;
use thiserror::Error;

/// Malformed field definition
#[derive(Debug, Error)]
pub enum DefinitionError {
    /// The definition source could not be read
    #[error("failed to read field definitions from {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The source is not a JSON object or array of objects
    #[error("field definitions are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A descriptor is missing a required attribute, or one has the wrong type
    #[error("field descriptor #{index} is malformed: {source}")]
    Descriptor {
        index: usize,
        source: serde_json::Error,
    },

    /// A field name must not be empty
    #[error("field descriptor #{index} has an empty name")]
    EmptyName { index: usize },

    /// A pattern that does not compile
    #[error("field '{field}' has an invalid pattern '{pattern}': {source}")]
    Pattern {
        field: String,
        pattern: String,
        source: Box<regex::Error>,
    },

    /// An output format outside of the supported subset
    #[error("field '{field}' has an unsupported format '{fmt}'")]
    Format { field: String, fmt: String },
}

/// A captured string that does not parse as the field type
#[derive(Debug, Clone, PartialEq, Error)]
#[error("'{raw}' is not a valid {dtype} value")]
pub struct CoercionError {
    pub raw: String,
    pub dtype: DType,
}

/// Malformed or unusable field spec
#[derive(Debug, Error)]
pub enum QueryError {
    /// The spec string could not be split into name, operator, and value
    #[error("failed to unpack field spec '{spec}': {reason}")]
    Malformed { spec: String, reason: &'static str },

    /// The name or value regex does not compile
    #[error("field spec '{spec}' contains an invalid regex: {source}")]
    Pattern {
        spec: String,
        source: Box<regex::Error>,
    },

    /// Raised by strict callers when a name pattern matches no field
    #[error("no field name matches pattern '{0}'")]
    Unresolved(String),
}

/// Reason a single member file failed
#[derive(Debug, Clone, PartialEq)]
pub struct FileFailure {
    pub path: PathBuf,
    pub reason: String,
}

impl FileFailure {
    pub fn new<P: AsRef<std::path::Path>>(path: P, reason: String) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            reason,
        }
    }
}

impl std::fmt::Display for FileFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.reason)
    }
}

/// Aggregate of every file that could not be read or parsed
///
/// Always produced after all other files have been processed.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{} file(s) failed:\n{}", .failures.len(), list_failures(.failures))]
pub struct DatabaseError {
    pub failures: Vec<FileFailure>,
}

impl DatabaseError {
    /// Returns an error only if there is at least one failure
    pub fn from_failures(failures: Vec<FileFailure>) -> Result<(), DatabaseError> {
        if failures.is_empty() {
            Ok(())
        } else {
            Err(DatabaseError { failures })
        }
    }

    /// Paths of the files that failed, in processing order
    pub fn paths(&self) -> Vec<&PathBuf> {
        self.failures.iter().map(|failure| &failure.path).collect()
    }
}

fn list_failures(failures: &[FileFailure]) -> String {
    failures.iter().map(|failure| f!("  - {failure}")).join("\n")
}
