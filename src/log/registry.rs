//! Registry of known log fields
//!
//! The registry is an explicit, ordered, mutable mapping from field name to
//! [Field]. Adding or loading a field whose name already exists replaces the
//! old definition entirely and keeps its position, new names are appended.
//! Nothing is merged attribute by attribute.
//!
//! The registry is set up before any parsing happens and only read while logs
//! are being scanned.
//!
//! ```rust
//! # use antmocdata::log::{DType, Field, FieldRegistry};
//! let mut registry = FieldRegistry::with_defaults();
//! assert!(registry.get("Azims").is_some());
//!
//! // replace a default definition
//! let azims = Field::new("Azims", DType::Int, &[r"azims\s*=\s*(\d+)"]).unwrap();
//! registry.add(azims);
//! assert_eq!(registry.get("Azims").unwrap().patterns().len(), 1);
//! ```

// standard library
use std::collections::HashMap;
use std::path::Path;

// crate modules
use crate::log::{DefinitionError, Field, FieldDescriptor, QueryError};
use crate::utils::f;

// external crates
use log::{debug, trace};
use regex::Regex;

/// Built-in field definitions for ANT-MOC logs
pub const DEFAULT_FIELDS: &str = include_str!("../../data/default_fields.json");

/// Ordered collection of field definitions, unique by name
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    fields: Vec<Field>,
    index: HashMap<String, usize>,
}

impl FieldRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Default::default()
    }

    /// Registry holding the built-in ANT-MOC field definitions
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .load_str(DEFAULT_FIELDS)
            .expect("built-in field definitions must be valid");
        registry
    }

    /// Load and merge field definitions from a JSON string
    ///
    /// The source is either an array of descriptors or a single descriptor
    /// object. Every descriptor is validated before anything is merged, so a
    /// failure leaves the registry untouched. Returns the number of fields
    /// loaded.
    pub fn load_str(&mut self, json: &str) -> Result<usize, DefinitionError> {
        let value: serde_json::Value = serde_json::from_str(json)?;

        let items = match value {
            serde_json::Value::Array(items) => items,
            object => vec![object],
        };

        let descriptors = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                serde_json::from_value::<FieldDescriptor>(item)
                    .map_err(|source| DefinitionError::Descriptor { index, source })
            })
            .collect::<Result<Vec<FieldDescriptor>, DefinitionError>>()?;

        self.load(descriptors)
    }

    /// Load and merge field definitions from a JSON file
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<usize, DefinitionError> {
        let path = path.as_ref();
        debug!("Loading field definitions from {}", path.display());
        let json = std::fs::read_to_string(path).map_err(|source| DefinitionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_str(&json)
    }

    /// Load and merge a list of descriptors
    ///
    /// All-or-nothing: the registry is only modified once every descriptor
    /// compiled.
    pub fn load(&mut self, descriptors: Vec<FieldDescriptor>) -> Result<usize, DefinitionError> {
        let mut fields = Vec::with_capacity(descriptors.len());
        for (index, descriptor) in descriptors.into_iter().enumerate() {
            if descriptor.name.trim().is_empty() {
                return Err(DefinitionError::EmptyName { index });
            }
            fields.push(Field::try_from(descriptor)?);
        }

        let n_fields = fields.len();
        for field in fields {
            self.add(field);
        }

        debug!("Loaded {n_fields} field definition(s)");
        Ok(n_fields)
    }

    /// Insert a field, replacing any existing field of the same name
    ///
    /// Returns the replaced definition if there was one.
    pub fn add(&mut self, field: Field) -> Option<Field> {
        match self.index.get(field.name()) {
            Some(&i) => {
                trace!("Replacing field '{}'", field.name());
                Some(std::mem::replace(&mut self.fields[i], field))
            }
            None => {
                trace!("Adding field '{}'", field.name());
                self.index.insert(field.name().to_string(), self.fields.len());
                self.fields.push(field);
                None
            }
        }
    }

    /// Field by exact name
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All fields whose full name matches the regex pattern, in registry order
    ///
    /// No match is an empty list rather than an error.
    pub fn resolve(&self, name_pattern: &str) -> Result<Vec<&Field>, QueryError> {
        let regex = Regex::new(&f!("^(?:{name_pattern})$")).map_err(|e| QueryError::Pattern {
            spec: name_pattern.to_string(),
            source: Box::new(e),
        })?;
        Ok(self.resolve_regex(&regex))
    }

    /// Same as [FieldRegistry::resolve] for an already anchored regex
    pub fn resolve_regex(&self, regex: &Regex) -> Vec<&Field> {
        self.fields
            .iter()
            .filter(|field| regex.is_match(field.name()))
            .collect()
    }

    /// Iterate over fields in registry order
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    /// Field names in registry order
    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|field| field.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Dump all definitions in the same JSON layout they are loaded from
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let descriptors: Vec<FieldDescriptor> = self.fields.iter().map(|f| f.descriptor()).collect();
        serde_json::to_string_pretty(&descriptors)
    }

    /// Table of available fields, `name (dtype) : doc`
    pub fn help(&self) -> String {
        let wname = self.fields.iter().map(|f| f.name().len()).max().unwrap_or(0);
        let wtype = self
            .fields
            .iter()
            .map(|f| f.dtype().to_string().len() + 2)
            .max()
            .unwrap_or(0);

        let mut s = String::from("Available fields:\n");
        for field in &self.fields {
            let dtype = f!("({})", field.dtype());
            s += &f!("{:<wname$}{:<wtype$} : {}\n", field.name(), dtype, field.doc());
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::DType;

    #[test]
    fn defaults_are_valid() {
        let registry = FieldRegistry::with_defaults();
        assert!(registry.len() >= 45);
        for name in ["File", "FileTimeStamp", "FileSize", "JobId", "Azims", "Keff"] {
            assert!(registry.contains(name), "missing default field {name}");
        }
        assert!(registry.get("File").unwrap().is_metadata());
    }

    #[test]
    fn second_load_replaces_entirely() {
        let mut registry = FieldRegistry::new();
        registry
            .load_str(r#"[{"name": "Azims", "dtype": "int", "fmt": "{:d}", "patterns": ["a = (\\d+)", "b = (\\d+)"], "doc": "first"}]"#)
            .unwrap();
        registry
            .load_str(r#"{"name": "Azims", "dtype": "str", "patterns": "c = (\\d+)"}"#)
            .unwrap();

        let field = registry.get("Azims").unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(field.dtype(), DType::Str);
        assert_eq!(field.fmt().as_str(), "{}");
        assert_eq!(field.patterns().len(), 1);
        assert_eq!(field.doc(), "");
    }

    #[test]
    fn replacement_keeps_position() {
        let mut registry = FieldRegistry::new();
        registry.add(Field::new("A", DType::Str, &[]).unwrap());
        registry.add(Field::new("B", DType::Str, &[]).unwrap());
        let old = registry.add(Field::new("A", DType::Int, &[]).unwrap());

        assert_eq!(old.unwrap().dtype(), DType::Str);
        assert_eq!(registry.names(), vec!["A", "B"]);
        assert_eq!(registry.get("A").unwrap().dtype(), DType::Int);
    }

    #[test]
    fn failed_load_leaves_registry_untouched() {
        let mut registry = FieldRegistry::new();
        registry.add(Field::new("Keep", DType::Str, &[]).unwrap());

        let bad_pattern = r#"[{"name": "New", "dtype": "str"}, {"name": "Bad", "dtype": "str", "patterns": ["(oops"]}]"#;
        assert!(matches!(
            registry.load_str(bad_pattern),
            Err(DefinitionError::Pattern { .. })
        ));

        let missing_dtype = r#"[{"name": "New", "dtype": "str"}, {"name": "NoType"}]"#;
        assert!(matches!(
            registry.load_str(missing_dtype),
            Err(DefinitionError::Descriptor { index: 1, .. })
        ));

        let missing_name = r#"[{"dtype": "str"}]"#;
        assert!(registry.load_str(missing_name).is_err());

        let empty_name = r#"[{"name": " ", "dtype": "str"}]"#;
        assert!(matches!(
            registry.load_str(empty_name),
            Err(DefinitionError::EmptyName { index: 0 })
        ));

        assert_eq!(registry.names(), vec!["Keep"]);
    }

    #[test]
    fn resolve_matches_full_names() {
        let registry = FieldRegistry::with_defaults();

        let times = registry.resolve(".*Time").unwrap();
        assert!(!times.is_empty());
        assert!(times.iter().all(|f| f.name().ends_with("Time")));

        // anchored, so a prefix is not enough
        assert!(registry.resolve("Azim").unwrap().is_empty());
        assert_eq!(registry.resolve("Azims").unwrap().len(), 1);
        assert!(registry.resolve("NoSuchField").unwrap().is_empty());
        assert!(registry.resolve("(").is_err());
    }

    #[test]
    fn json_dump_reloads_identically() {
        let registry = FieldRegistry::with_defaults();
        let json = registry.to_json().unwrap();

        let mut reloaded = FieldRegistry::new();
        reloaded.load_str(&json).unwrap();

        let original: Vec<FieldDescriptor> = registry.fields().map(|f| f.descriptor()).collect();
        let copy: Vec<FieldDescriptor> = reloaded.fields().map(|f| f.descriptor()).collect();
        assert_eq!(original, copy);
    }

    #[test]
    fn help_lists_every_field() {
        let registry = FieldRegistry::with_defaults();
        let help = registry.help();
        for name in registry.names() {
            assert!(help.contains(name));
        }
        assert!(help.contains("(int)"));
    }
}
