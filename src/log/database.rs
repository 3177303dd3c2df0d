//! Lazy, optionally caching collection of log files
//!
//! A [LogDatabase] knows its member files after [LogDatabase::setup] but does
//! not read any of them until a record is needed. Records are parsed on demand
//! by queries, or all at once by [LogDatabase::cache_all].
//!
//! The cache is an explicit map from path to [LogRecord]:
//!     - a cached record is always used as is, it is never re-parsed
//!     - with caching enabled, records parsed by a query are stored
//!     - with caching disabled, records parsed by a query are dropped
//!     - [LogDatabase::invalidate] and [LogDatabase::invalidate_all] drop entries
//!
//! Failures are per file. A file that can not be read is reported in the
//! returned [DatabaseError] or [QueryResult::failures] and everything else
//! carries on.
//!
//! ```ignore
//! let mut database = LogDatabase::new();
//! database.setup(&DatabaseOptions::default());
//! database.cache_all()?;
//!
//! let query = Query::parse(["File", "Azims", "Keff", "Polars>2"])?;
//! for row in database.query(&query).rows() {
//!     println!("{:?}", row.values());
//! }
//! ```

// standard library
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

// crate modules
use crate::log::{
    DatabaseError, FieldRegistry, FileFailure, LogRecord, Query, ResolvedQuery, Value,
};
use crate::readers::LogFileReader;
use crate::utils::{compare_mixed, f};

// external crates
use kdam::{Bar, BarBuilder, BarExt};
use log::{debug, info, trace, warn};
use serde::{Deserialize, Serialize};

/// Format of the member files of a database
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Raw ANT-MOC log text, fields are found by regex
    #[default]
    Text,
    /// A saved record snapshot, see [LogDatabase::save]
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// Options for building a [LogDatabase]
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseOptions {
    /// Glob patterns, file paths, or directories
    pub filenames: Vec<String>,
    /// Format of every member file
    pub format: LogFormat,
    /// Store records parsed during queries
    pub cache: bool,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            filenames: vec!["log/**/*.log".to_string()],
            format: LogFormat::Text,
            cache: false,
        }
    }
}

/// On-disk form of one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Path of the original log file
    pub source: PathBuf,
    /// Position of the file in the database it was saved from
    pub position: usize,
    /// Format the record was originally read from
    pub format: LogFormat,
    /// Typed field values
    pub fields: BTreeMap<String, Value>,
}

impl Snapshot {
    /// Stable snapshot file name for a source path
    ///
    /// First 16 hex digits of the blake3 hash of the path, so the same
    /// source always maps to the same file.
    pub fn file_name(source: &Path) -> String {
        let hash = blake3::hash(source.to_string_lossy().as_bytes());
        f!("{}.json", &hash.to_hex()[..16])
    }

    pub fn read(path: &Path) -> anyhow::Result<Snapshot> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn into_record(self) -> LogRecord {
        LogRecord::with_fields(self.source, self.fields)
    }
}

/// One matching file of a query
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    path: PathBuf,
    values: Vec<Option<Value>>,
    broken: Vec<String>,
    key: Option<Value>,
}

impl Row {
    /// Source file of the row
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Projected values in column order, `None` for absent fields
    pub fn values(&self) -> &[Option<Value>] {
        &self.values
    }

    /// Projected fields that were absent from the record
    pub fn broken(&self) -> &[String] {
        &self.broken
    }
}

/// Rows of a query along with any per-file failures
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    columns: Vec<String>,
    rows: Vec<Row>,
    failures: Vec<FileFailure>,
}

impl QueryResult {
    /// Projected field names, in query order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn failures(&self) -> &[FileFailure] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows with at least one absent projected field
    pub fn n_broken(&self) -> usize {
        self.rows.iter().filter(|row| !row.broken.is_empty()).count()
    }

    /// Aggregate of the files that could not be read
    pub fn error(&self) -> Result<(), DatabaseError> {
        DatabaseError::from_failures(self.failures.clone())
    }
}

/// Collection of log files queryable by field specs
#[derive(Debug)]
pub struct LogDatabase {
    /// Field definitions used to parse text logs
    registry: FieldRegistry,
    /// Member files in discovery order
    files: Vec<PathBuf>,
    /// Canonical forms of the members, for de-duplication
    seen: HashSet<PathBuf>,
    /// Format of the member files
    format: LogFormat,
    /// Store records parsed during queries?
    cache_enabled: bool,
    /// Parsed records by member path
    cache: HashMap<PathBuf, LogRecord>,
    /// Disable progress bar?
    disable_progress: bool,
}

impl Default for LogDatabase {
    fn default() -> Self {
        Self::with_registry(FieldRegistry::with_defaults())
    }
}

impl LogDatabase {
    /// Empty database using the default field definitions
    pub fn new() -> Self {
        Default::default()
    }

    /// Empty database using a custom registry
    pub fn with_registry(registry: FieldRegistry) -> Self {
        Self {
            registry,
            files: Vec::new(),
            seen: HashSet::new(),
            format: LogFormat::Text,
            cache_enabled: false,
            cache: HashMap::new(),
            disable_progress: false,
        }
    }

    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    /// Mutable access to the field definitions
    ///
    /// Cached records were parsed with the old definitions, call
    /// [LogDatabase::invalidate_all] to have them re-parsed.
    pub fn registry_mut(&mut self) -> &mut FieldRegistry {
        &mut self.registry
    }

    /// Do not print the progress bars
    pub fn disable_progress(&mut self) {
        debug!("Progress bar disabled");
        self.disable_progress = true;
    }

    /// Discover member files and reset the cache configuration
    ///
    /// Nothing is parsed. Returns the number of member files.
    pub fn setup(&mut self, options: &DatabaseOptions) -> usize {
        self.files.clear();
        self.seen.clear();
        self.cache.clear();
        self.format = options.format;
        self.cache_enabled = options.cache;

        let n_files = self.add_paths(&options.filenames);
        info!("LogDB: {n_files} {} file(s) found", self.format);
        n_files
    }

    /// Add members from glob patterns, file paths, or directories
    ///
    /// A literal path that does not exist is logged and skipped. Returns the
    /// number of files added.
    pub fn add_paths<S: AsRef<str>>(&mut self, patterns: &[S]) -> usize {
        let mut n_added = 0;
        for pattern in patterns {
            let pattern = pattern.as_ref();
            debug!("Searching for '{pattern}'");
            for path in discover(pattern) {
                if self.add_file(path) {
                    n_added += 1;
                }
            }
        }
        n_added
    }

    /// Add a single member file, returns false for duplicates
    pub fn add_file<P: AsRef<Path>>(&mut self, path: P) -> bool {
        let path = path.as_ref();
        let canonical = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        if !self.seen.insert(canonical) {
            trace!("Skipping duplicate {}", path.display());
            return false;
        }
        self.files.push(path.to_path_buf());
        true
    }

    /// Member files in discovery order
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn format(&self) -> LogFormat {
        self.format
    }

    pub fn set_format(&mut self, format: LogFormat) {
        self.format = format;
    }

    /// Turn storing of records parsed by queries on or off
    pub fn set_cache(&mut self, enabled: bool) {
        self.cache_enabled = enabled;
    }

    pub fn is_caching(&self) -> bool {
        self.cache_enabled
    }

    /// Number of records currently cached
    pub fn n_cached(&self) -> usize {
        self.cache.len()
    }

    /// Cached record of a member, if any
    pub fn cached(&self, path: &Path) -> Option<&LogRecord> {
        self.cache.get(path)
    }

    /// Drop the cached record of one member, true if there was one
    pub fn invalidate(&mut self, path: &Path) -> bool {
        self.cache.remove(path).is_some()
    }

    /// Drop every cached record
    pub fn invalidate_all(&mut self) {
        debug!("Dropping {} cached record(s)", self.cache.len());
        self.cache.clear();
    }

    /// Parse and store the record of every member not cached yet
    ///
    /// Continues past unreadable files. Returns the number of records cached,
    /// or the aggregate of the files that failed.
    pub fn cache_all(&mut self) -> Result<usize, DatabaseError> {
        info!("LogDB: caching {} file(s)", self.files.len());
        let mut failures = Vec::new();
        let mut progress_bar = self.init_progress_bar(self.files.len(), " files");

        for path in &self.files {
            progress_bar.update(1).ok();
            if self.cache.contains_key(path) {
                continue;
            }
            match read_member(&self.registry, self.format, path) {
                Ok(record) => {
                    self.cache.insert(path.clone(), record);
                }
                Err(failure) => {
                    warn!("{failure}");
                    failures.push(failure);
                }
            }
        }
        self.finish_progress_bar();

        info!("LogDB: current cached files = {}", self.cache.len());
        DatabaseError::from_failures(failures)?;
        Ok(self.cache.len())
    }

    /// Run a query over every member, in discovery order
    ///
    /// Specs that resolve to no field are logged and ignored. Rows are sorted
    /// if the query names a sort field.
    pub fn query(&mut self, query: &Query) -> QueryResult {
        info!("LogDB: querying {} file(s)", self.files.len());
        info!("LogDB: field specs = {query}");

        let resolved = query.resolve(&self.registry);
        let mut result = QueryResult {
            columns: resolved.columns().to_vec(),
            ..Default::default()
        };
        let mut progress_bar = self.init_progress_bar(self.files.len(), " files");

        for path in &self.files {
            progress_bar.update(1).ok();

            let record = match self.cache.get(path) {
                Some(record) => Cow::Borrowed(record),
                None => match read_member(&self.registry, self.format, path) {
                    Ok(record) => Cow::Owned(record),
                    Err(failure) => {
                        warn!("{failure}");
                        result.failures.push(failure);
                        continue;
                    }
                },
            };

            if resolved.matches(&record) {
                result.rows.push(make_row(&resolved, &record, query.sort_field()));
            }

            if let Cow::Owned(record) = record {
                if self.cache_enabled {
                    self.cache.insert(path.clone(), record);
                }
            }
        }
        self.finish_progress_bar();

        if let Some(field) = query.sort_field() {
            debug!("Sorting {} row(s) by {field}", result.rows.len());
            result.rows.sort_by(|a, b| compare_keys(a.key.as_ref(), b.key.as_ref()));
        }

        debug!("LogDB: {} matching record(s)", result.rows.len());
        info!("LogDB: current cached files = {}", self.cache.len());
        result
    }

    /// Write one snapshot file per member into a directory
    ///
    /// Members that are not cached yet are parsed first, and cached if
    /// caching is enabled. Existing snapshots of the same sources are
    /// overwritten. Returns the number of snapshots written.
    pub fn save<P: AsRef<Path>>(&mut self, directory: P) -> Result<usize, DatabaseError> {
        let directory = directory.as_ref();
        info!(
            "LogDB: saving {} record(s) to {}",
            self.files.len(),
            directory.display()
        );

        if let Err(e) = fs::create_dir_all(directory) {
            return Err(DatabaseError {
                failures: vec![FileFailure::new(directory, f!("could not create directory: {e}"))],
            });
        }

        let mut failures = Vec::new();
        let mut n_saved = 0;
        let mut progress_bar = self.init_progress_bar(self.files.len(), " files");

        for (position, path) in self.files.iter().enumerate() {
            progress_bar.update(1).ok();

            let record = match self.cache.get(path) {
                Some(record) => Cow::Borrowed(record),
                None => match read_member(&self.registry, self.format, path) {
                    Ok(record) => Cow::Owned(record),
                    Err(failure) => {
                        warn!("{failure}");
                        failures.push(failure);
                        continue;
                    }
                },
            };

            let snapshot = Snapshot {
                source: path.clone(),
                position,
                format: self.format,
                fields: record.fields().clone(),
            };
            let target = directory.join(Snapshot::file_name(path));
            trace!("{} => {}", path.display(), target.display());

            match write_snapshot(&target, &snapshot) {
                Ok(()) => n_saved += 1,
                Err(e) => {
                    let failure = FileFailure::new(&target, f!("{e:#}"));
                    warn!("{failure}");
                    failures.push(failure);
                }
            }

            if let Cow::Owned(record) = record {
                if self.cache_enabled {
                    self.cache.insert(path.clone(), record);
                }
            }
        }
        self.finish_progress_bar();

        DatabaseError::from_failures(failures)?;
        Ok(n_saved)
    }

    /// Rebuild members and cache from a snapshot directory
    ///
    /// Replaces the current members. Files are ordered by their saved
    /// position, and every restored record is cached so no log is re-parsed.
    /// Unreadable snapshots are reported once all others are restored.
    pub fn restore<P: AsRef<Path>>(&mut self, directory: P) -> Result<usize, DatabaseError> {
        let directory = directory.as_ref();
        info!("LogDB: restoring records from {}", directory.display());

        let entries = fs::read_dir(directory).map_err(|e| DatabaseError {
            failures: vec![FileFailure::new(directory, f!("could not read directory: {e}"))],
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut failures = Vec::new();
        let mut snapshots = Vec::with_capacity(paths.len());
        for path in paths {
            match Snapshot::read(&path) {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(e) => {
                    let failure = FileFailure::new(&path, f!("{e:#}"));
                    warn!("{failure}");
                    failures.push(failure);
                }
            }
        }
        snapshots.sort_by_key(|snapshot| snapshot.position);

        self.files.clear();
        self.seen.clear();
        self.cache.clear();
        if let Some(snapshot) = snapshots.first() {
            self.format = snapshot.format;
        }

        for snapshot in snapshots {
            let source = snapshot.source.clone();
            if self.add_file(&source) {
                self.cache.insert(source, snapshot.into_record());
            }
        }

        info!("LogDB: {} record(s) restored", self.cache.len());
        DatabaseError::from_failures(failures)?;
        Ok(self.files.len())
    }

    /// Initialise a progress bar, which may be disabled
    fn init_progress_bar(&self, total: usize, unit: &str) -> Bar {
        BarBuilder::default()
            .total(total)
            .delay(0.0)
            .unit(unit)
            .disable(self.disable_progress)
            .build()
            .unwrap_or_else(|_| Bar::new(total))
    }

    /// Clean spacing after a visible progress bar
    fn finish_progress_bar(&self) {
        if !self.disable_progress {
            eprintln!()
        }
    }
}

/// Parse one member file in the given format
fn read_member(
    registry: &FieldRegistry,
    format: LogFormat,
    path: &Path,
) -> Result<LogRecord, FileFailure> {
    trace!("Reading {}", path.display());
    let record = match format {
        LogFormat::Text => LogFileReader::new(registry).parse(path),
        LogFormat::Json => Snapshot::read(path).map(Snapshot::into_record),
    };
    record.map_err(|e| FileFailure::new(path, f!("{e:#}")))
}

fn write_snapshot(target: &Path, snapshot: &Snapshot) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(snapshot)?;
    fs::write(target, json)?;
    Ok(())
}

fn make_row(resolved: &ResolvedQuery, record: &LogRecord, sort_field: Option<&str>) -> Row {
    let values = resolved.project(record);
    let broken = resolved
        .columns()
        .iter()
        .zip(&values)
        .filter(|(_, value)| value.is_none())
        .map(|(name, _)| name.clone())
        .collect();

    Row {
        path: record.path().to_path_buf(),
        values,
        broken,
        key: sort_field.and_then(|field| record.get(field).cloned()),
    }
}

/// Sort order of rows, absent keys last
fn compare_keys(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => {
            compare_mixed(&a.to_string(), &b.to_string()).unwrap_or(Ordering::Equal)
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Files named by a glob, a literal file, or a directory, sorted
fn discover(pattern: &str) -> Vec<PathBuf> {
    let path = Path::new(pattern);

    if !is_glob(pattern) {
        if path.is_file() {
            return vec![path.to_path_buf()];
        }
        if path.is_dir() {
            let mut files = Vec::new();
            walk(path, &mut files);
            files.sort();
            return files;
        }
        warn!("{pattern} does not exist, skipped");
        return Vec::new();
    }

    let pattern = trim_current_dir(pattern);
    let root = glob_root(pattern);
    let mut files = Vec::new();
    walk(root, &mut files);

    let mut matched: Vec<PathBuf> = files
        .into_iter()
        .map(|file| match file.strip_prefix(".") {
            Ok(relative) => relative.to_path_buf(),
            Err(_) => file,
        })
        .filter(|file| glob_match::glob_match(pattern, &file.to_string_lossy()))
        .collect();
    matched.sort();

    if matched.is_empty() {
        warn!("No files match '{pattern}'");
    }
    matched
}

/// Collect every file under a directory, recursively
///
/// Symlinks to files are kept, symlinks to directories are not followed.
fn walk(directory: &Path, files: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Could not read {}: {e}", directory.display());
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_dir() {
            walk(&path, files);
        } else if file_type.is_file() || (file_type.is_symlink() && path.is_file()) {
            files.push(path);
        } else if file_type.is_symlink() {
            debug!("Not following link {}", path.display());
        }
    }
}

/// Drop any leading `./` so a glob matches the paths found by [walk]
fn trim_current_dir(mut pattern: &str) -> &str {
    while let Some(rest) = pattern.strip_prefix("./") {
        pattern = rest.trim_start_matches('/');
    }
    pattern
}

/// Quick check for whether a string looks like a glob rather than a path
fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

/// Static leading directory of a glob, where the search can start
fn glob_root(pattern: &str) -> &Path {
    let cut = pattern.find(['*', '?', '[', '{']).unwrap_or(pattern.len());
    match pattern[..cut].rfind('/') {
        Some(i) if i > 0 => Path::new(&pattern[..i]),
        Some(_) => Path::new("/"),
        None => Path::new("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    const LOG_A: &str = "\
[  NORMAL ]  Number of azimuthal angles = 32
[  NORMAL ]  Number of polar angles = 2
[  NORMAL ]  Iteration 10: k_eff = 1.001234  res = 3.0E-06
";

    const LOG_B: &str = "\
[  NORMAL ]  Number of azimuthal angles = 64
[  NORMAL ]  Number of polar angles = 6
[  NORMAL ]  Iteration 12: k_eff = 1.186789  res = 1.0E-06
";

    const LOG_C: &str = "\
[  NORMAL ]  Number of azimuthal angles = 640
[  NORMAL ]  Number of polar angles = 4
";

    #[fixture]
    fn logs() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("log/nested")).unwrap();
        fs::write(dir.path().join("log/100-a.log"), LOG_A).unwrap();
        fs::write(dir.path().join("log/nested/200-b.log"), LOG_B).unwrap();
        fs::write(dir.path().join("log/300-c.log"), LOG_C).unwrap();
        fs::write(dir.path().join("log/notes.txt"), "not a log").unwrap();
        dir
    }

    fn database(dir: &TempDir, cache: bool) -> LogDatabase {
        let mut database = LogDatabase::new();
        database.disable_progress();
        database.setup(&DatabaseOptions {
            filenames: vec![f!("{}/log/**/*.log", dir.path().display())],
            format: LogFormat::Text,
            cache,
        });
        database
    }

    fn values(result: &QueryResult) -> Vec<Vec<Option<Value>>> {
        result.rows().iter().map(|row| row.values().to_vec()).collect()
    }

    #[rstest]
    fn setup_discovers_without_parsing(logs: TempDir) {
        let database = database(&logs, true);
        assert_eq!(database.len(), 3);
        assert_eq!(database.n_cached(), 0);
        assert!(database.files().iter().all(|p| p.extension().unwrap() == "log"));
    }

    #[rstest]
    fn directories_and_duplicates(logs: TempDir) {
        let mut database = LogDatabase::new();
        let dir = logs.path().join("log");
        let literal = dir.join("100-a.log");
        let n_added = database.add_paths(&[
            dir.display().to_string(),
            literal.display().to_string(),
            "/no/such/file.log".to_string(),
        ]);
        assert_eq!(n_added, 4);
        assert_eq!(database.len(), 4);
    }

    #[test]
    fn empty_database_gives_no_rows() {
        let mut database = LogDatabase::new();
        database.disable_progress();
        let result = database.query(&Query::parse(["Azims"]).unwrap());
        assert!(result.is_empty());
        assert!(result.error().is_ok());
        assert_eq!(database.cache_all().unwrap(), 0);
    }

    #[rstest]
    fn query_filters_and_projects(logs: TempDir) {
        let mut database = database(&logs, false);
        let query = Query::parse(["Azims", "Keff", "Polars>2"]).unwrap();
        let result = database.query(&query);

        assert_eq!(result.columns(), &["Azims", "Keff"]);
        assert_eq!(
            values(&result),
            vec![
                vec![Some(Value::Int(640)), None],
                vec![Some(Value::Int(64)), Some(Value::Float(1.186789))],
            ]
        );
        assert_eq!(result.n_broken(), 1);
        assert_eq!(result.rows()[0].broken(), &["Keff"]);
        assert_eq!(database.n_cached(), 0);
    }

    #[rstest]
    fn query_caches_when_enabled(logs: TempDir) {
        let mut database = database(&logs, true);
        let query = Query::parse(["Azims=64"]).unwrap();
        let result = database.query(&query);
        assert_eq!(result.len(), 1);
        assert_eq!(database.n_cached(), 3);

        let path = database.files()[0].clone();
        assert!(database.invalidate(&path));
        assert_eq!(database.n_cached(), 2);
        database.invalidate_all();
        assert_eq!(database.n_cached(), 0);
    }

    #[rstest]
    fn cached_records_are_not_reparsed(logs: TempDir) {
        let mut database = database(&logs, true);
        database.cache_all().unwrap();

        // changes on disk are invisible until invalidated
        let path = logs.path().join("log/100-a.log");
        fs::write(&path, "[  NORMAL ]  Number of azimuthal angles = 8\n").unwrap();

        let query = Query::parse(["Azims"]).unwrap();
        assert_eq!(database.query(&query).rows()[0].values(), &[Some(Value::Int(32))]);

        database.invalidate_all();
        assert_eq!(database.query(&query).rows()[0].values(), &[Some(Value::Int(8))]);
    }

    #[rstest]
    fn missing_file_does_not_stop_caching(logs: TempDir) {
        let mut database = database(&logs, true);
        let missing = logs.path().join("log/300-c.log");
        fs::remove_file(&missing).unwrap();

        let error = database.cache_all().unwrap_err();
        assert_eq!(error.paths(), vec![&missing]);
        assert_eq!(database.n_cached(), 2);

        let result = database.query(&Query::parse(["Azims"]).unwrap());
        assert_eq!(result.len(), 2);
        assert_eq!(result.failures().len(), 1);
        assert!(result.error().is_err());
    }

    #[rstest]
    fn sorted_rows(logs: TempDir) {
        let mut database = database(&logs, false);
        let query = Query::parse(["Azims"]).unwrap().sort_by("Keff");
        let result = database.query(&query);
        assert_eq!(
            values(&result),
            vec![
                vec![Some(Value::Int(32))],
                vec![Some(Value::Int(64))],
                vec![Some(Value::Int(640))],
            ]
        );

        let query = Query::parse(["Azims"]).unwrap().sort_by("Polars");
        let result = database.query(&query);
        assert_eq!(result.rows()[0].values(), &[Some(Value::Int(32))]);
        assert_eq!(result.rows()[2].values(), &[Some(Value::Int(64))]);
    }

    #[rstest]
    fn save_and_restore_round_trip(logs: TempDir) {
        let mut original = database(&logs, true);
        original.cache_all().unwrap();

        let snapshots = logs.path().join("db");
        assert_eq!(original.save(&snapshots).unwrap(), 3);
        // saving again overwrites
        assert_eq!(original.save(&snapshots).unwrap(), 3);
        assert_eq!(fs::read_dir(&snapshots).unwrap().count(), 3);

        // raw logs are no longer needed
        fs::remove_dir_all(logs.path().join("log")).unwrap();

        let mut restored = LogDatabase::new();
        restored.disable_progress();
        assert_eq!(restored.restore(&snapshots).unwrap(), 3);
        assert_eq!(restored.files(), original.files());

        let query = Query::parse(["File", "FileSize", "JobId", "Azims", "Keff", "Residual"]).unwrap();
        let expected = original.query(&query);
        let actual = restored.query(&query);
        assert_eq!(expected.rows(), actual.rows());
        assert!(actual.error().is_ok());
    }

    #[rstest]
    fn json_members_read_snapshots(logs: TempDir) {
        let mut original = database(&logs, false);
        let snapshots = logs.path().join("db");
        original.save(&snapshots).unwrap();

        let mut database = LogDatabase::new();
        database.disable_progress();
        database.setup(&DatabaseOptions {
            filenames: vec![snapshots.display().to_string()],
            format: LogFormat::Json,
            cache: false,
        });
        assert_eq!(database.len(), 3);

        let result = database.query(&Query::parse(["Azims==64"]).unwrap());
        assert_eq!(result.len(), 1);
        assert!(result.rows()[0].path().ends_with("200-b.log"));
    }

    #[test]
    fn snapshot_names_are_stable() {
        let a = Snapshot::file_name(Path::new("log/100-a.log"));
        let b = Snapshot::file_name(Path::new("log/100-a.log"));
        let c = Snapshot::file_name(Path::new("log/200-b.log"));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 16 + ".json".len());
    }

    #[test]
    fn glob_roots() {
        assert!(is_glob("log/**/*.log"));
        assert!(!is_glob("log/run.log"));
        assert_eq!(glob_root("log/**/*.log"), Path::new("log"));
        assert_eq!(glob_root("*.log"), Path::new("."));
        assert_eq!(glob_root("/data/logs/*.txt"), Path::new("/data/logs"));
        assert_eq!(trim_current_dir("./log/*.log"), "log/*.log");
        assert_eq!(trim_current_dir(".//./*.log"), "*.log");
        assert_eq!(trim_current_dir("/abs/*.log"), "/abs/*.log");
    }

    #[test]
    fn current_dir_prefix_is_optional() {
        // tests run from the package root
        let plain = discover("data/*.json");
        assert_eq!(plain, vec![PathBuf::from("data/default_fields.json")]);
        assert_eq!(discover("./data/*.json"), plain);
        assert_eq!(discover("././data/*.json"), plain);
    }

    #[cfg(unix)]
    #[rstest]
    fn directory_links_are_not_followed(logs: TempDir) {
        let log = logs.path().join("log");
        std::os::unix::fs::symlink(&log, log.join("nested/loop")).unwrap();
        std::os::unix::fs::symlink(log.join("100-a.log"), log.join("linked.log")).unwrap();

        let found = discover(&f!("{}/**/*.log", log.display()));
        let names: Vec<_> = found.iter().map(|p| p.file_name().unwrap()).collect();
        assert_eq!(names, ["100-a.log", "300-c.log", "linked.log", "200-b.log"]);
    }

    #[test]
    fn absent_sort_keys_go_last() {
        let one = Value::Int(1);
        let two = Value::Float(2.0);
        assert_eq!(compare_keys(Some(&one), Some(&two)), Ordering::Less);
        assert_eq!(compare_keys(None, Some(&one)), Ordering::Greater);
        assert_eq!(compare_keys(Some(&one), None), Ordering::Less);
    }
}
