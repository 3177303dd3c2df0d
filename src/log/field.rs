//! Field definitions and typed field values
//!
//! A [Field] is a named, typed extraction rule. The rule is pure data: an
//! ordered list of case-insensitive regex patterns tried against each line of
//! a log, the declared [DType] the captured text is coerced into, and an
//! output [FieldFormat] used when the value is written to a table.
//!
//! Fields are usually defined in JSON, one descriptor per field:
//!
//! ```json
//! {
//!   "name": "Azims",
//!   "dtype": "int",
//!   "fmt": "{:d}",
//!   "patterns": ["azimuthal angles\\s*=\\s*([0-9]+)"],
//!   "doc": "Number of azimuthal angles"
//! }
//! ```
//!
//! Only `name` and `dtype` are required. A single pattern string is accepted
//! in place of a list, and an empty pattern list defines a metadata-only field
//! that is filled from the filesystem rather than the log content.

// crate modules
use crate::log::{CoercionError, DefinitionError};
use crate::utils::{f, NumberFmt};

// external crates
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Deserializer, Serialize};

/// Declared type of a field value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DType {
    #[serde(rename = "str")]
    Str,
    #[serde(rename = "int")]
    Int,
    #[serde(rename = "float")]
    Float,
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            DType::Str => "str",
            DType::Int => "int",
            DType::Float => "float",
        };
        write!(f, "{s}")
    }
}

/// A typed field value
///
/// Serialised untagged so that snapshots read as plain JSON. Integers and
/// floats survive the round trip because JSON floats always carry a decimal
/// point or exponent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    /// Coerce captured text into the declared type
    ///
    /// Surrounding whitespace is ignored for every type.
    ///
    /// ```rust
    /// # use antmocdata::log::{DType, Value};
    /// assert_eq!(Value::coerce(" 32 ", DType::Int), Ok(Value::Int(32)));
    /// assert_eq!(Value::coerce("1.0e-5", DType::Float), Ok(Value::Float(1.0e-5)));
    /// assert!(Value::coerce("x", DType::Int).is_err());
    /// ```
    pub fn coerce(raw: &str, dtype: DType) -> Result<Value, CoercionError> {
        let text = raw.trim();
        let error = || CoercionError {
            raw: raw.to_string(),
            dtype,
        };

        match dtype {
            DType::Str => Ok(Value::Str(text.to_string())),
            DType::Int => text.parse::<i64>().map(Value::Int).map_err(|_| error()),
            DType::Float => text.parse::<f64>().map(Value::Float).map_err(|_| error()),
        }
    }

    /// Numeric view of the value, parsing strings where possible
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(v) => Some(*v),
            Value::Str(s) => s.trim().parse::<f64>().ok(),
        }
    }

    /// The declared type this value was coerced into
    pub fn dtype(&self) -> DType {
        match self {
            Value::Int(_) => DType::Int,
            Value::Float(_) => DType::Float,
            Value::Str(_) => DType::Str,
        }
    }
}

/// Natural string form, e.g. `6` rather than `6.000000`
///
/// Very small or very large floats use the short exponent form, `1e-5`
/// rather than `0.00001`.
impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) if *v == 0.0 || !v.is_finite() => write!(f, "{v}"),
            Value::Float(v) if (1e-4..1e16).contains(&v.abs()) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v:e}"),
            Value::Str(s) => write!(f, "{s}"),
        }
    }
}

/// Alignment of a formatted value within its width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
    Center,
}

/// Presentation type of an output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presentation {
    /// `{}`, natural string form
    Plain,
    /// `{:s}`
    Str,
    /// `{:d}`
    Int,
    /// `{:.Nf}`, fixed point
    Fixed,
    /// `{:.Ne}`, scientific
    Exp,
    /// `{:.NE}`, scientific with upper case exponent
    ExpUpper,
}

/// Output format of a field value
///
/// Supports the small subset of python-style format strings used by field
/// definitions: `{[:[align][width][.precision][type]]}` where align is one of
/// `<`, `>`, `^` and type is one of `s`, `d`, `f`, `e`, `E`.
///
/// ```rust
/// # use antmocdata::log::{FieldFormat, Value};
/// let fmt = FieldFormat::parse("{:.5E}").unwrap();
/// assert_eq!(fmt.render(&Value::Float(1.123456789e3)), "1.12346E+03");
///
/// let fmt = FieldFormat::parse("{:>6d}").unwrap();
/// assert_eq!(fmt.render(&Value::Int(42)), "    42");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFormat {
    spec: String,
    align: Option<Align>,
    width: usize,
    precision: Option<usize>,
    presentation: Presentation,
}

impl Default for FieldFormat {
    fn default() -> Self {
        Self {
            spec: "{}".to_string(),
            align: None,
            width: 0,
            precision: None,
            presentation: Presentation::Plain,
        }
    }
}

impl FieldFormat {
    /// Parse a format string, `None` if outside the supported subset
    pub fn parse(spec: &str) -> Option<FieldFormat> {
        let inner = spec.strip_prefix('{')?.strip_suffix('}')?;
        let mut format = FieldFormat {
            spec: spec.to_string(),
            ..Default::default()
        };

        if inner.is_empty() {
            return Some(format);
        }

        let mut rest = inner.strip_prefix(':')?;

        // [align]
        format.align = match rest.chars().next() {
            Some('<') => Some(Align::Left),
            Some('>') => Some(Align::Right),
            Some('^') => Some(Align::Center),
            _ => None,
        };
        if format.align.is_some() {
            rest = &rest[1..];
        }

        // [width]
        let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits > 0 {
            format.width = rest[..digits].parse().ok()?;
            rest = &rest[digits..];
        }

        // [.precision]
        if let Some(after_dot) = rest.strip_prefix('.') {
            let digits = after_dot.chars().take_while(|c| c.is_ascii_digit()).count();
            if digits == 0 {
                return None;
            }
            format.precision = Some(after_dot[..digits].parse().ok()?);
            rest = &after_dot[digits..];
        }

        // [type]
        format.presentation = match rest {
            "" => Presentation::Plain,
            "s" => Presentation::Str,
            "d" => Presentation::Int,
            "f" => Presentation::Fixed,
            "e" => Presentation::Exp,
            "E" => Presentation::ExpUpper,
            _ => return None,
        };

        // precision makes no sense for integers
        if format.presentation == Presentation::Int && format.precision.is_some() {
            return None;
        }

        Some(format)
    }

    /// The original format string
    pub fn as_str(&self) -> &str {
        &self.spec
    }

    /// Render a value with this format
    ///
    /// Strings that are not numbers are never forced through a numeric
    /// presentation, they are just padded.
    pub fn render(&self, value: &Value) -> String {
        let precision = self.precision.unwrap_or(6);

        let text = match (self.presentation, value) {
            (Presentation::Plain, _) | (Presentation::Str, _) => match (self.precision, value) {
                // python truncates strings to the precision
                (Some(p), Value::Str(s)) => s.chars().take(p).collect(),
                _ => value.to_string(),
            },
            (Presentation::Int, Value::Float(v)) if v.fract() == 0.0 => f!("{}", *v as i64),
            (Presentation::Int, _) => value.to_string(),
            (_, Value::Str(s)) if s.trim().parse::<f64>().is_err() => s.clone(),
            (Presentation::Fixed, v) => f!("{:.*}", precision, v.as_f64().unwrap_or_default()),
            (Presentation::Exp, v) => v.as_f64().unwrap_or_default().sci(precision, 2),
            (Presentation::ExpUpper, v) => v.as_f64().unwrap_or_default().sci_upper(precision, 2),
        };

        self.pad(text, value)
    }

    fn pad(&self, text: String, value: &Value) -> String {
        let width = self.width;
        // python default alignment: numbers right, strings left
        let align = self.align.unwrap_or(match value {
            Value::Str(_) => Align::Left,
            _ => Align::Right,
        });

        match align {
            Align::Left => f!("{text:<width$}"),
            Align::Right => f!("{text:>width$}"),
            Align::Center => f!("{text:^width$}"),
        }
    }
}

impl std::fmt::Display for FieldFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.spec)
    }
}

/// Serialisable description of a field, as found in definition files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub dtype: DType,
    #[serde(default = "default_fmt")]
    pub fmt: String,
    #[serde(default, deserialize_with = "one_or_many")]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub doc: String,
}

fn default_fmt() -> String {
    "{}".to_string()
}

/// Accept either `"pattern"` or `["pattern", ...]`
fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(pattern) => vec![pattern],
        OneOrMany::Many(patterns) => patterns,
    })
}

/// A compiled field definition
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    dtype: DType,
    fmt: FieldFormat,
    patterns: Vec<Regex>,
    doc: String,
}

impl Field {
    /// Create a field from a name, type, and list of patterns
    ///
    /// ```rust
    /// # use antmocdata::log::{DType, Field};
    /// let field = Field::new("Azims", DType::Int, &[r"azimuthal angles\s*=\s*([0-9]+)"])
    ///     .unwrap()
    ///     .with_doc("Number of azimuthal angles");
    /// assert_eq!(field.capture("Number of azimuthal angles = 32"), Some("32"));
    /// ```
    pub fn new(name: &str, dtype: DType, patterns: &[&str]) -> Result<Field, DefinitionError> {
        Field::try_from(FieldDescriptor {
            name: name.to_string(),
            dtype,
            fmt: default_fmt(),
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            doc: String::new(),
        })
    }

    /// Replace the output format
    pub fn with_fmt(mut self, fmt: &str) -> Result<Field, DefinitionError> {
        self.fmt = FieldFormat::parse(fmt).ok_or_else(|| DefinitionError::Format {
            field: self.name.clone(),
            fmt: fmt.to_string(),
        })?;
        Ok(self)
    }

    /// Replace the documentation string
    pub fn with_doc(mut self, doc: &str) -> Field {
        self.doc = doc.to_string();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn fmt(&self) -> &FieldFormat {
        &self.fmt
    }

    pub fn patterns(&self) -> &[Regex] {
        &self.patterns
    }

    pub fn doc(&self) -> &str {
        &self.doc
    }

    /// True for fields filled from file metadata rather than log content
    pub fn is_metadata(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Try each pattern in order against a line, first match wins
    ///
    /// The first participating capture group is the captured text, or the
    /// whole match for patterns without groups.
    pub fn capture<'t>(&self, line: &'t str) -> Option<&'t str> {
        self.patterns.iter().find_map(|pattern| {
            let captures = pattern.captures(line)?;
            captures
                .iter()
                .skip(1)
                .flatten()
                .next()
                .or_else(|| captures.get(0))
                .map(|m| m.as_str())
        })
    }

    /// Render a value with the field output format
    pub fn render(&self, value: &Value) -> String {
        self.fmt.render(value)
    }

    /// Back to the serialisable form
    pub fn descriptor(&self) -> FieldDescriptor {
        FieldDescriptor {
            name: self.name.clone(),
            dtype: self.dtype,
            fmt: self.fmt.as_str().to_string(),
            patterns: self.patterns.iter().map(|p| p.as_str().to_string()).collect(),
            doc: self.doc.clone(),
        }
    }
}

impl TryFrom<FieldDescriptor> for Field {
    type Error = DefinitionError;

    fn try_from(descriptor: FieldDescriptor) -> Result<Self, Self::Error> {
        let FieldDescriptor {
            name,
            dtype,
            fmt,
            patterns,
            doc,
        } = descriptor;

        let fmt = FieldFormat::parse(&fmt).ok_or_else(|| DefinitionError::Format {
            field: name.clone(),
            fmt: fmt.clone(),
        })?;

        let patterns = patterns
            .iter()
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| DefinitionError::Pattern {
                        field: name.clone(),
                        pattern: pattern.clone(),
                        source: Box::new(e),
                    })
            })
            .collect::<Result<Vec<Regex>, DefinitionError>>()?;

        Ok(Field {
            name,
            dtype,
            fmt,
            patterns,
            doc,
        })
    }
}
