//! Field extraction and queries over ANT-MOC log files
//!
//! Logs are plain text with one fact per line. Each [Field] of a
//! [FieldRegistry] pairs a name and type with regex patterns, and every log
//! file becomes a [LogRecord] of the fields found in it. A [LogDatabase]
//! groups many files, parses them lazily, optionally caches the records, and
//! answers [Query]s made of [FieldSpec] strings. The [Extractor] writes query
//! results as a delimited table.
//!
//! ```ignore
//! use antmocdata::log::{DatabaseOptions, Extractor, ExtractorOptions, LogDatabase};
//!
//! let mut database = LogDatabase::new();
//! database.setup(&DatabaseOptions {
//!     filenames: vec!["log/**/*.log".into()],
//!     ..Default::default()
//! });
//!
//! let options = ExtractorOptions {
//!     specs: vec!["File".into(), "Azims".into(), "Keff".into(), "Polars>2".into()],
//!     ..Default::default()
//! };
//! let report = Extractor::new(&mut database, options).extract()?;
//! ```

mod database;
mod error;
mod extract;
mod field;
mod registry;
mod record;
mod spec;

#[doc(inline)]
pub use database::{DatabaseOptions, LogDatabase, LogFormat, QueryResult, Row, Snapshot};

#[doc(inline)]
pub use error::{CoercionError, DatabaseError, DefinitionError, FileFailure, QueryError};

#[doc(inline)]
pub use extract::{extract_records, render_table, ExtractReport, Extractor, ExtractorOptions};

#[doc(inline)]
pub use field::{Align, DType, Field, FieldDescriptor, FieldFormat, Presentation, Value};

#[doc(inline)]
pub use registry::{FieldRegistry, DEFAULT_FIELDS};

#[doc(inline)]
pub use record::LogRecord;

#[doc(inline)]
pub use spec::{FieldSpec, Op, Predicate, Query, ResolvedQuery};
