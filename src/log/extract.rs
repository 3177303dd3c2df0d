//! Write query results as a delimited table
//!
//! The [Extractor] runs a query over a [LogDatabase] and writes every matching
//! record as one row, with a header of the projected field names. Values are
//! rendered with the output format of their field, absent values are empty
//! cells.
//!
//! ```ignore
//! let mut database = LogDatabase::new();
//! database.setup(&DatabaseOptions::default());
//!
//! let options = ExtractorOptions {
//!     specs: vec!["File".into(), "Azims".into(), "Keff".into()],
//!     truncate: true,
//!     ..Default::default()
//! };
//! let report = Extractor::new(&mut database, options).extract()?;
//! println!("{report}");
//! ```

// standard library
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

// crate modules
use crate::log::{FieldRegistry, FileFailure, LogDatabase, Query, QueryError, QueryResult, Row};
use crate::utils::f;

// external crates
use anyhow::{Context, Result};
use itertools::Itertools;
use log::{debug, info};

/// Options for an [Extractor]
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractorOptions {
    /// Field specs making up the query
    pub specs: Vec<String>,
    /// Optional field to sort rows by
    pub sort_by: Option<String>,
    /// Cell delimiter
    pub delimiter: String,
    /// Output table
    pub output: PathBuf,
    /// Overwrite rather than append to the output
    pub truncate: bool,
    /// Only log the summary, not every record
    pub summary: bool,
}

impl Default for ExtractorOptions {
    fn default() -> Self {
        Self {
            specs: vec![".*".to_string()],
            sort_by: None,
            delimiter: ",".to_string(),
            output: PathBuf::from("antmoc-records.csv"),
            truncate: false,
            summary: false,
        }
    }
}

/// Outcome of an extraction
#[derive(Debug, Clone)]
pub struct ExtractReport {
    /// Where the table went, if anywhere
    pub output: Option<PathBuf>,
    /// Number of rows written
    pub n_records: usize,
    /// Files with absent projected fields and the names of those fields
    pub broken: Vec<(PathBuf, Vec<String>)>,
    /// Files that could not be read at all
    pub failures: Vec<FileFailure>,
    /// Wall time of query and output
    pub elapsed: Duration,
}

impl ExtractReport {
    /// Number of rows with at least one absent field
    pub fn n_broken(&self) -> usize {
        self.broken.len()
    }
}

impl std::fmt::Display for ExtractReport {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if !self.broken.is_empty() {
            writeln!(f, "Records with broken fields:")?;
            for (path, fields) in &self.broken {
                let wrapped = textwrap::indent(&textwrap::fill(&fields.join(", "), 72), "    ");
                write!(f, "{}:\n{}", path.display(), wrapped)?;
                if !wrapped.ends_with('\n') {
                    writeln!(f)?;
                }
            }
            writeln!(f)?;
        }

        if !self.failures.is_empty() {
            writeln!(f, "Unreadable files:")?;
            for failure in &self.failures {
                writeln!(f, "    {failure}")?;
            }
            writeln!(f)?;
        }

        if let Some(output) = &self.output {
            writeln!(f, "Output file: {}", output.display())?;
        }
        writeln!(f, "Number of records: {}", self.n_records)?;
        writeln!(f, "Records with broken fields: {}", self.n_broken())?;
        write!(f, "Elapsed time: {:.3} s", self.elapsed.as_secs_f64())
    }
}

/// Runs a query and writes the rows as a delimited table
#[derive(Debug)]
pub struct Extractor<'a> {
    database: &'a mut LogDatabase,
    options: ExtractorOptions,
}

impl<'a> Extractor<'a> {
    pub fn new(database: &'a mut LogDatabase, options: ExtractorOptions) -> Self {
        Self { database, options }
    }

    pub fn options(&self) -> &ExtractorOptions {
        &self.options
    }

    /// Query built from the spec strings and sort field
    pub fn query(&self) -> Result<Query, QueryError> {
        let query = Query::parse(&self.options.specs)?;
        Ok(match &self.options.sort_by {
            Some(field) => query.sort_by(field),
            None => query,
        })
    }

    /// Query the database and write the table to the output file
    ///
    /// The file is truncated or appended to depending on the options. Each
    /// run writes its own header row. A malformed query leaves the file
    /// untouched.
    pub fn extract(&mut self) -> Result<ExtractReport> {
        let query = self.query()?;
        let output = self.options.output.clone();
        debug!("Writing records to {}", output.display());

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(!self.options.truncate)
            .truncate(self.options.truncate)
            .open(&output)
            .with_context(|| f!("Could not open {}", output.display()))?;

        let mut report = self.write_rows(&query, get_writer(file))?;
        report.output = Some(output);
        Ok(report)
    }

    /// Query the database and write the table to any sink
    pub fn write_to<W: Write>(&mut self, writer: W) -> Result<ExtractReport> {
        let query = self.query()?;
        self.write_rows(&query, writer)
    }

    fn write_rows<W: Write>(&mut self, query: &Query, mut writer: W) -> Result<ExtractReport> {
        let timer = Instant::now();
        let result = self.database.query(query);

        let table = render_table(&result, self.database.registry());
        let delimiter = &self.options.delimiter;
        for (i, cells) in table.iter().enumerate() {
            let line = cells.iter().map(|cell| quote(cell, delimiter)).join(delimiter);
            writeln!(writer, "{line}")?;
            if !self.options.summary {
                match i {
                    0 => info!("Records:\n{line}"),
                    _ => info!("{line}"),
                }
            }
        }
        writer.flush()?;

        let report = ExtractReport {
            output: None,
            n_records: result.len(),
            broken: broken_fields(result.rows()),
            failures: result.failures().to_vec(),
            elapsed: timer.elapsed(),
        };

        if !report.failures.is_empty() {
            info!("{} file(s) could not be read", report.failures.len());
        }
        Ok(report)
    }
}

/// Header and rendered rows of a query result
///
/// Every cell is formatted with the output format of its field.
pub fn render_table(result: &QueryResult, registry: &FieldRegistry) -> Vec<Vec<String>> {
    let mut table = vec![result.columns().to_vec()];

    for row in result.rows() {
        let cells = result
            .columns()
            .iter()
            .zip(row.values())
            .map(|(name, value)| match (value, registry.get(name)) {
                (Some(value), Some(field)) => field.render(value),
                (Some(value), None) => value.to_string(),
                (None, _) => String::new(),
            })
            .collect();
        table.push(cells);
    }

    table
}

/// Quote a cell if it would otherwise break the table
fn quote(cell: &str, delimiter: &str) -> String {
    let needs_quotes = (!delimiter.is_empty() && cell.contains(delimiter))
        || cell.contains(['"', '\n', '\r']);

    match needs_quotes {
        true => f!("\"{}\"", cell.replace('"', "\"\"")),
        false => cell.to_string(),
    }
}

fn broken_fields(rows: &[Row]) -> Vec<(PathBuf, Vec<String>)> {
    rows.iter()
        .filter(|row| !row.broken().is_empty())
        .map(|row| (row.path().to_path_buf(), row.broken().to_vec()))
        .collect()
}

#[doc(hidden)]
fn get_writer(file: File) -> BufWriter<File> {
    BufWriter::new(file)
}

/// Convenience wrapper, extract records from the logs matched by `filenames`
///
/// Uses the default field definitions and no caching. The progress bars are
/// disabled.
pub fn extract_records<P: AsRef<Path>>(
    filenames: &[&str],
    specs: &[&str],
    output: P,
) -> Result<ExtractReport> {
    let mut database = LogDatabase::new();
    database.disable_progress();
    database.add_paths(filenames);

    let options = ExtractorOptions {
        specs: specs.iter().map(|s| s.to_string()).collect(),
        output: output.as_ref().to_path_buf(),
        truncate: true,
        summary: true,
        ..Default::default()
    };
    Extractor::new(&mut database, options).extract()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::{DatabaseOptions, LogFormat};
    use rstest::rstest;
    use std::fs;

    fn database(dir: &Path) -> LogDatabase {
        let mut database = LogDatabase::new();
        database.disable_progress();
        database.setup(&DatabaseOptions {
            filenames: vec![f!("{}/*.log", dir.display())],
            format: LogFormat::Text,
            cache: true,
        });
        database
    }

    #[test]
    fn end_to_end_single_log() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("run.log"),
            "azimuthal angles = 32\niteration 10 k_eff = 1.001234\n",
        )
        .unwrap();

        let mut database = database(dir.path());
        let options = ExtractorOptions {
            specs: vec!["Azims".into(), "Keff".into()],
            ..Default::default()
        };

        let mut buffer = Vec::new();
        let report = Extractor::new(&mut database, options).write_to(&mut buffer).unwrap();

        assert_eq!(String::from_utf8(buffer).unwrap(), "Azims,Keff\n32,1.001234\n");
        assert_eq!(report.n_records, 1);
        assert_eq!(report.n_broken(), 0);
    }

    #[test]
    fn absent_values_are_empty_cells() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.log"), "azimuthal angles = 4\n").unwrap();
        fs::write(dir.path().join("b.log"), "number of polar angles = 6\n").unwrap();

        let mut database = database(dir.path());
        let options = ExtractorOptions {
            specs: vec!["Azims".into(), "Polars".into(), "Nothing".into()],
            delimiter: " | ".into(),
            ..Default::default()
        };

        let mut buffer = Vec::new();
        let report = Extractor::new(&mut database, options).write_to(&mut buffer).unwrap();

        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "Azims | Polars\n4 | \n | 6\n"
        );
        assert_eq!(report.n_broken(), 2);
        assert_eq!(report.broken[0].1, vec!["Polars".to_string()]);
        assert!(report.to_string().contains("Records with broken fields: 2"));
    }

    #[test]
    fn filter_only_fields_are_not_columns() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.log"), "azimuthal angles = 4\nnumber of polar angles = 2\n").unwrap();
        fs::write(dir.path().join("b.log"), "azimuthal angles = 8\nnumber of polar angles = 6\n").unwrap();

        let mut database = database(dir.path());
        let options = ExtractorOptions {
            specs: vec!["Polars>2".into(), "Azims".into()],
            ..Default::default()
        };

        let mut buffer = Vec::new();
        Extractor::new(&mut database, options).write_to(&mut buffer).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "Azims\n8\n");
    }

    #[test]
    fn malformed_specs_fail_before_reading() {
        let mut database = LogDatabase::new();
        database.disable_progress();
        database.add_file("/no/such/file.log");

        let options = ExtractorOptions {
            specs: vec!["Azims==".into()],
            ..Default::default()
        };
        let mut buffer = Vec::new();
        assert!(Extractor::new(&mut database, options).write_to(&mut buffer).is_err());
        assert!(buffer.is_empty());
    }

    #[test]
    fn malformed_specs_keep_existing_output() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("run.log"), "azimuthal angles = 16\n").unwrap();
        let output = dir.path().join("records.csv");
        fs::write(&output, "precious,results\n1,2\n").unwrap();

        let mut database = database(dir.path());
        let options = ExtractorOptions {
            specs: vec!["Azims==".into()],
            output: output.clone(),
            truncate: true,
            summary: true,
            ..Default::default()
        };
        assert!(Extractor::new(&mut database, options).extract().is_err());
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "precious,results\n1,2\n"
        );
    }

    #[rstest]
    #[case("plain", ",", "plain")]
    #[case("a,b", ",", "\"a,b\"")]
    #[case("say \"hi\"", ",", "\"say \"\"hi\"\"\"")]
    #[case("a,b", " | ", "a,b")]
    #[case("two\nlines", ",", "\"two\nlines\"")]
    fn quoting(#[case] cell: &str, #[case] delimiter: &str, #[case] expected: &str) {
        assert_eq!(quote(cell, delimiter), expected);
    }

    #[test]
    fn truncate_or_append() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("run.log"), "azimuthal angles = 16\n").unwrap();
        let output = dir.path().join("records.csv");

        let run = |truncate: bool| {
            let mut database = database(dir.path());
            let options = ExtractorOptions {
                specs: vec!["Azims".into()],
                output: output.clone(),
                truncate,
                summary: true,
                ..Default::default()
            };
            Extractor::new(&mut database, options).extract().unwrap()
        };

        run(true);
        run(false);
        assert_eq!(fs::read_to_string(&output).unwrap(), "Azims\n16\nAzims\n16\n");

        let report = run(true);
        assert_eq!(fs::read_to_string(&output).unwrap(), "Azims\n16\n");
        assert_eq!(report.output.as_deref(), Some(output.as_path()));
    }

    #[test]
    fn values_use_field_formats() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("run.log"),
            "Convergence threshold = 0.00001\nTotal time to solution = 12.5 sec\n",
        )
        .unwrap();

        let output = dir.path().join("records.csv");
        let pattern = f!("{}/*.log", dir.path().display());
        extract_records(&[&pattern], &["Tolerance"], &output).unwrap();
        assert_eq!(fs::read_to_string(&output).unwrap(), "Tolerance\n1.0E-05\n");
    }
}
