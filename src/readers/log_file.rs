//! Reader for plain text ANT-MOC log files
//!
//! Every line is tried against every field of the registry. When several
//! lines match the same field, the last one wins, so values reported once per
//! iteration (k_eff, residuals, iteration counts) end up at their final state.

// standard library
use std::fs;
use std::path::Path;

// crate modules
use crate::log::{FieldRegistry, LogRecord, Value};
use crate::utils::f;

// external crates
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use log::trace;

/// Name of the field holding the file path
pub const FILE: &str = "File";
/// Name of the field holding the modification time
pub const FILE_TIMESTAMP: &str = "FileTimeStamp";
/// Name of the field holding the file size in KB
pub const FILE_SIZE: &str = "FileSize";
/// Name of the field taken from a leading `<digits>-` in the file name
pub const JOB_ID: &str = "JobId";

/// Extracts a [LogRecord] from a text log using a [FieldRegistry]
#[derive(Debug)]
pub struct LogFileReader<'a> {
    registry: &'a FieldRegistry,
}

impl<'a> LogFileReader<'a> {
    pub fn new(registry: &'a FieldRegistry) -> Self {
        Self { registry }
    }

    /// Parses a log file, including the filesystem metadata fields
    ///
    /// Fails only if the file can not be inspected or read. Invalid UTF-8 is
    /// replaced rather than rejected.
    pub fn parse(&self, path: &Path) -> Result<LogRecord> {
        let bytes = fs::read(path).with_context(|| f!("Could not read {}", path.display()))?;
        let content = String::from_utf8_lossy(&bytes);

        let mut record = self.parse_content(path, &content);

        // metadata last, so a content pattern can never shadow it
        for (name, value) in file_metadata(path)? {
            record.insert(name, value);
        }

        Ok(record)
    }

    /// Parses log content without touching the filesystem
    pub fn parse_content(&self, path: &Path, content: &str) -> LogRecord {
        let fields: Vec<_> = self.registry.fields().filter(|f| !f.is_metadata()).collect();

        // last raw capture for each field
        let mut captured: Vec<Option<&str>> = vec![None; fields.len()];

        for line in content.lines() {
            for (i, field) in fields.iter().enumerate() {
                if let Some(raw) = field.capture(line) {
                    captured[i] = Some(raw);
                }
            }
        }

        let mut record = LogRecord::new(path);
        for (field, raw) in fields.iter().zip(captured) {
            let Some(raw) = raw else { continue };
            match Value::coerce(raw, field.dtype()) {
                Ok(value) => record.insert(field.name(), value),
                Err(e) => trace!("{}: field '{}' left absent, {e}", path.display(), field.name()),
            }
        }

        record
    }
}

/// Fields derived from the filesystem rather than the log content
///
/// `File`, `FileTimeStamp`, and `FileSize` are always returned. `JobId` is
/// only returned for file names like `12345-case.log`.
pub fn file_metadata(path: &Path) -> Result<Vec<(&'static str, Value)>> {
    let stat = fs::metadata(path).with_context(|| f!("Could not inspect {}", path.display()))?;

    let mut metadata = vec![(FILE, Value::Str(path.display().to_string()))];

    let timestamp = match stat.modified() {
        Ok(time) => DateTime::<Local>::from(time)
            .format("%Y-%m-%d %H:%M:%S%.6f")
            .to_string(),
        Err(_) => String::new(),
    };
    metadata.push((FILE_TIMESTAMP, Value::Str(timestamp)));
    metadata.push((FILE_SIZE, Value::Float(stat.len() as f64 / 1000.0)));

    if let Some(job_id) = job_id(path) {
        metadata.push((JOB_ID, Value::Str(job_id)));
    }

    Ok(metadata)
}

/// Job id from a file name starting with digits followed by a dash
fn job_id(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let digits: String = name.chars().take_while(|c| c.is_ascii_digit()).collect();
    match name[digits.len()..].starts_with('-') && !digits.is_empty() {
        true => Some(digits),
        false => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::{DType, Field};
    use std::io::Write;

    fn registry() -> FieldRegistry {
        let mut registry = FieldRegistry::with_defaults();
        registry.add(Field::new("Marker", DType::Int, &[r"marker\s*=\s*(\S+)"]).unwrap());
        registry
    }

    #[test]
    fn last_matching_line_wins() {
        let content = "\
line one
line two
marker = 3
line four
line five
line six
line seven
line eight
marker = 9
line ten
";
        let registry = registry();
        let record = LogFileReader::new(&registry).parse_content(Path::new("a.log"), content);
        assert_eq!(record.get("Marker"), Some(&Value::Int(9)));
    }

    #[test]
    fn failed_coercion_leaves_field_absent() {
        let content = "marker = not-a-number\nazimuthal angles = 32\n";
        let registry = registry();
        let record = LogFileReader::new(&registry).parse_content(Path::new("a.log"), content);
        assert!(!record.contains("Marker"));
        assert_eq!(record.get("Azims"), Some(&Value::Int(32)));
    }

    #[test]
    fn defaults_read_typical_lines() {
        let content = "\
[  NORMAL ]  Number of azimuthal angles = 32
[  NORMAL ]  Azimuthal ray spacing = 0.05
[  NORMAL ]  Number of polar angles = 6
[  NORMAL ]  Z-spacing = 0.75
[  NORMAL ]  Number of energy groups = 7
[  NORMAL ]  Total number of FSRs = 12345
[  NORMAL ]  Number of extruded FSRs = 678
[  NORMAL ]  Convergence threshold = 1.0E-05
[  NORMAL ]  Iteration 1: k_eff = 0.987654  res = 1.0E-02
[  NORMAL ]  Iteration 2: k_eff = 1.001234  res = 3.0E-06
[  RESULT ]  Total time to solution = 1.234E+02 sec
";
        let registry = registry();
        let record = LogFileReader::new(&registry).parse_content(Path::new("a.log"), content);

        assert_eq!(record.get("Azims"), Some(&Value::Int(32)));
        assert_eq!(record.get("XYSpacing"), Some(&Value::Float(0.05)));
        assert_eq!(record.get("Polars"), Some(&Value::Int(6)));
        assert_eq!(record.get("ZSpacing"), Some(&Value::Float(0.75)));
        assert_eq!(record.get("Groups"), Some(&Value::Int(7)));
        assert_eq!(record.get("FSRs"), Some(&Value::Int(12345)));
        assert_eq!(record.get("ExtFSRs"), Some(&Value::Int(678)));
        assert_eq!(record.get("Tolerance"), Some(&Value::Float(1.0e-5)));
        assert_eq!(record.get("Iterations"), Some(&Value::Int(2)));
        assert_eq!(record.get("Keff"), Some(&Value::Float(1.001234)));
        assert_eq!(record.get("Residual"), Some(&Value::Float(3.0e-6)));
        assert_eq!(record.get("TotalTime"), Some(&Value::Float(123.4)));
        assert!(!record.contains("Tracks3D"));
    }

    #[test]
    fn metadata_is_always_present() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("31623-c5g7.log");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(&[b'x'; 2500]).unwrap();
        drop(file);

        let registry = registry();
        let record = LogFileReader::new(&registry).parse(&path).unwrap();

        assert_eq!(record.get(FILE), Some(&Value::Str(path.display().to_string())));
        assert_eq!(record.get(FILE_SIZE), Some(&Value::Float(2.5)));
        assert_eq!(record.get(JOB_ID), Some(&Value::Str("31623".into())));
        match record.get(FILE_TIMESTAMP) {
            Some(Value::Str(s)) => assert_eq!(s.len(), "2020-11-16 12:00:00.000000".len()),
            other => panic!("unexpected timestamp {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_an_error() {
        let registry = registry();
        let reader = LogFileReader::new(&registry);
        assert!(reader.parse(Path::new("/definitely/not/here.log")).is_err());
    }

    #[test]
    fn job_id_needs_digits_and_dash() {
        assert_eq!(job_id(Path::new("dir/123-run.log")), Some("123".into()));
        assert_eq!(job_id(Path::new("123run.log")), None);
        assert_eq!(job_id(Path::new("-run.log")), None);
        assert_eq!(job_id(Path::new("run-123.log")), None);
    }
}
