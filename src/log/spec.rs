//! Field specs, the query language for log records
//!
//! A field spec is a compact `<field-name-regex>[<op><value>]` string. Without
//! an operator the spec is a projection, it selects the matching fields for
//! output. With an operator it is a filter on every matching field.
//!
//! | Spec              | Meaning                                              |
//! | ----------------- | ---------------------------------------------------- |
//! | `Azims`           | output `Azims`                                       |
//! | `.*Time`          | output every field ending in `Time`                  |
//! | `Azims==64`       | keep records where `Azims` fully matches regex `64`  |
//! | `Azims=64`        | same as above                                        |
//! | `Polars>2`        | keep records where `Polars` is greater than 2        |
//! | `CaseName<=c5g7`  | lexicographic comparison for non-numeric values      |
//!
//! Equality passes on a case-insensitive full match of the value's natural
//! string form (`6`, not `6.000000`, and `1e-5` for tiny floats) against the
//! right hand side as a regex. A numeric value also passes when the right
//! hand side parses to the same number, so `Tolerance==1.0E-05` and
//! `Tolerance==0.00001` both match. The ordering operators compare
//! numerically when both sides parse as numbers, and as strings otherwise.
//! A record without the field fails every filter on it.
//!
//! A [Query] is an ordered list of specs combined with AND.
//!
//! ```rust
//! # use antmocdata::log::{FieldRegistry, Query};
//! let registry = FieldRegistry::with_defaults();
//! let query = Query::parse(["File", "Azims", "Polars>2"]).unwrap();
//! let resolved = query.resolve(&registry);
//! assert_eq!(resolved.columns(), &["File", "Azims"]);
//! ```

// standard library
use std::cmp::Ordering;
use std::str::FromStr;

// crate modules
use crate::log::{Field, FieldRegistry, LogRecord, QueryError, Value};
use crate::utils::{compare_mixed, f};

// external crates
use itertools::Itertools;
use log::warn;
use regex::{Regex, RegexBuilder};

/// Comparison operator of a filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Op {
    pub fn as_str(&self) -> &'static str {
        match self {
            Op::Eq => "==",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
        }
    }

    /// Split a leading operator off a string, two character operators first
    fn split(s: &str) -> Option<(Op, &str)> {
        [
            ("==", Op::Eq),
            ("<=", Op::Le),
            (">=", Op::Ge),
            ("<", Op::Lt),
            (">", Op::Gt),
            ("=", Op::Eq),
        ]
        .into_iter()
        .find_map(|(token, op)| s.strip_prefix(token).map(|rest| (op, rest)))
    }
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Operator and right hand side of a filter
#[derive(Debug, Clone)]
pub struct Predicate {
    op: Op,
    value: String,
    re_value: Option<Regex>,
}

impl Predicate {
    fn new(spec: &str, op: Op, value: &str) -> Result<Predicate, QueryError> {
        let re_value = match op {
            Op::Eq => Some(
                RegexBuilder::new(&f!("^(?:{value})$"))
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| QueryError::Pattern {
                        spec: spec.to_string(),
                        source: Box::new(e),
                    })?,
            ),
            _ => None,
        };

        Ok(Predicate {
            op,
            value: value.to_string(),
            re_value,
        })
    }

    pub fn op(&self) -> Op {
        self.op
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Test a field value, an absent value never passes
    pub fn test(&self, value: Option<&Value>) -> bool {
        let Some(value) = value else {
            return false;
        };
        let text = value.to_string();

        if let Some(re_value) = &self.re_value {
            return re_value.is_match(&text) || self.equals_number(value);
        }

        match compare_mixed(&text, &self.value) {
            None => false,
            Some(ordering) => match self.op {
                Op::Lt => ordering == Ordering::Less,
                Op::Le => ordering != Ordering::Greater,
                Op::Gt => ordering == Ordering::Greater,
                Op::Ge => ordering != Ordering::Less,
                Op::Eq => ordering == Ordering::Equal,
            },
        }
    }
}

impl Predicate {
    /// Numeric equality, so `1.0E-05`, `1e-5` and `0.00001` are the same
    fn equals_number(&self, value: &Value) -> bool {
        let Ok(rhs) = self.value.trim().parse::<f64>() else {
            return false;
        };
        match value {
            Value::Int(i) => *i as f64 == rhs,
            Value::Float(v) => *v == rhs,
            Value::Str(_) => false,
        }
    }
}

impl std::fmt::Display for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}{}", self.op, self.value)
    }
}

/// A single projection or filter clause
#[derive(Debug, Clone)]
pub struct FieldSpec {
    name: String,
    re_name: Regex,
    predicate: Option<Predicate>,
}

impl FieldSpec {
    /// Unpack a spec string into name pattern, operator, and value
    pub fn parse(spec: &str) -> Result<FieldSpec, QueryError> {
        let malformed = |reason| QueryError::Malformed {
            spec: spec.to_string(),
            reason,
        };

        let trimmed = spec.trim();
        if trimmed.is_empty() {
            return Err(malformed("the spec is empty"));
        }

        let (name, predicate) = match trimmed.find(['<', '=', '>']) {
            None => (trimmed, None),
            Some(0) => return Err(malformed("the field name is missing")),
            Some(i) => {
                let (op, value) = Op::split(&trimmed[i..]).ok_or(malformed("unknown operator"))?;
                let value = value.trim();
                if value.is_empty() {
                    return Err(malformed("an op or value is missing"));
                }
                if value.contains(['<', '=', '>']) {
                    return Err(malformed("the value contains an operator"));
                }
                (trimmed[..i].trim_end(), Some(Predicate::new(spec, op, value)?))
            }
        };

        let re_name = Regex::new(&f!("^(?:{name})$")).map_err(|e| QueryError::Pattern {
            spec: spec.to_string(),
            source: Box::new(e),
        })?;

        Ok(FieldSpec {
            name: name.to_string(),
            re_name,
            predicate,
        })
    }

    /// The field name pattern as written
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn predicate(&self) -> Option<&Predicate> {
        self.predicate.as_ref()
    }

    /// True for specs without an operator
    pub fn is_projection(&self) -> bool {
        self.predicate.is_none()
    }

    /// Fields of the registry selected by the name pattern
    pub fn resolve<'r>(&self, registry: &'r FieldRegistry) -> Vec<&'r Field> {
        registry.resolve_regex(&self.re_name)
    }
}

impl FromStr for FieldSpec {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldSpec::parse(s)
    }
}

impl std::fmt::Display for FieldSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match &self.predicate {
            Some(predicate) => write!(f, "{}{}", self.name, predicate),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Ordered list of specs, combined with AND
///
/// Optionally carries a field to sort the result rows by. The sort field
/// does not need to be projected.
#[derive(Debug, Clone, Default)]
pub struct Query {
    specs: Vec<FieldSpec>,
    sort_by: Option<String>,
}

impl Query {
    pub fn new(specs: Vec<FieldSpec>) -> Self {
        Self {
            specs,
            sort_by: None,
        }
    }

    /// Sort rows by a field, numerically where possible, absent values last
    pub fn sort_by(mut self, field: &str) -> Self {
        self.sort_by = Some(field.to_string());
        self
    }

    pub fn sort_field(&self) -> Option<&str> {
        self.sort_by.as_deref()
    }

    /// Parse every spec string, failing on the first malformed one
    pub fn parse<I, S>(specs: I) -> Result<Query, QueryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let specs = specs
            .into_iter()
            .map(|s| FieldSpec::parse(s.as_ref()))
            .collect::<Result<Vec<FieldSpec>, QueryError>>()?;
        Ok(Query::new(specs))
    }

    pub fn specs(&self) -> &[FieldSpec] {
        &self.specs
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Strict check that every spec selects at least one field
    pub fn check_resolved(&self, registry: &FieldRegistry) -> Result<(), QueryError> {
        match self.specs.iter().find(|spec| spec.resolve(registry).is_empty()) {
            Some(spec) => Err(QueryError::Unresolved(spec.name().to_string())),
            None => Ok(()),
        }
    }

    /// Expand name patterns against a registry
    ///
    /// Specs that select nothing are kept aside and logged. They filter
    /// nothing and add no columns.
    pub fn resolve(&self, registry: &FieldRegistry) -> ResolvedQuery {
        let mut resolved = ResolvedQuery::default();

        for spec in &self.specs {
            let fields = spec.resolve(registry);
            if fields.is_empty() {
                warn!("No field name matches pattern '{}'", spec.name());
                resolved.unresolved.push(spec.to_string());
                continue;
            }

            for field in fields {
                match &spec.predicate {
                    None => resolved.columns.push(field.name().to_string()),
                    Some(predicate) => resolved
                        .filters
                        .push((field.name().to_string(), predicate.clone())),
                }
            }
        }

        resolved
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.specs.iter().join(", "))
    }
}

/// A query with concrete field names, ready to run against records
#[derive(Debug, Clone, Default)]
pub struct ResolvedQuery {
    columns: Vec<String>,
    filters: Vec<(String, Predicate)>,
    unresolved: Vec<String>,
}

impl ResolvedQuery {
    /// Projected field names, in query order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Concrete (field, predicate) pairs
    pub fn filters(&self) -> &[(String, Predicate)] {
        &self.filters
    }

    /// Specs that matched no field in the registry
    pub fn unresolved(&self) -> &[String] {
        &self.unresolved
    }

    /// True if the record passes every filter
    pub fn matches(&self, record: &LogRecord) -> bool {
        self.filters
            .iter()
            .all(|(name, predicate)| predicate.test(record.get(name)))
    }

    /// Projected values of a record, `None` for absent fields
    pub fn project(&self, record: &LogRecord) -> Vec<Option<Value>> {
        self.columns
            .iter()
            .map(|name| record.get(name).cloned())
            .collect()
    }
}
