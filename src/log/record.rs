//! Parsed representation of a single log file

// standard library
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// crate modules
use crate::log::{FieldRegistry, Value};
use crate::readers::LogFileReader;

// external crates
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// One log file as a mapping of field name to typed value
///
/// Only fields that matched somewhere in the file are present, there are no
/// null values. The derived metadata fields (`File`, `FileTimeStamp`,
/// `FileSize`) are always present for records read from text logs.
///
/// Records are immutable once built.
///
/// ```ignore
/// let registry = FieldRegistry::with_defaults();
/// let record = LogRecord::parse("log/12345-c5g7.log", &registry)?;
/// if let Some(keff) = record.get("Keff") {
///     println!("{keff}");
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    path: PathBuf,
    fields: BTreeMap<String, Value>,
}

impl LogRecord {
    pub(crate) fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            fields: BTreeMap::new(),
        }
    }

    pub(crate) fn with_fields<P: AsRef<Path>>(path: P, fields: BTreeMap<String, Value>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            fields,
        }
    }

    pub(crate) fn insert(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_string(), value);
    }

    /// Scan a text log against every field in the registry
    pub fn parse<P: AsRef<Path>>(path: P, registry: &FieldRegistry) -> Result<LogRecord> {
        LogFileReader::new(registry).parse(path.as_ref())
    }

    /// Source file the record was built from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Value of a field, `None` if the field is absent
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Present fields, sorted by name
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl std::fmt::Display for LogRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        writeln!(f, "LogRecord {{")?;
        writeln!(f, "    path: {}", self.path.display())?;
        for (name, value) in &self.fields {
            writeln!(f, "    {name}: {value}")?;
        }
        write!(f, "}}")
    }
}
