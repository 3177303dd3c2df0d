// standard library
use std::collections::HashSet;
use std::path::Path;

// crate modules
use crate::mgxs::{Material, MgxsError};
use crate::utils::NumberFmt;

// external crates
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// Which inconsistency [MaterialLibrary::fix] should repair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fix {
    /// Adjust the scatter matrix diagonal to match `transport`
    SigmaS,
    /// Rebuild `total` from absorption and scattering
    SigmaT,
}

/// Materials sharing one energy group structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialLibrary {
    /// Number of energy groups of every material
    pub ngroups: usize,
    /// Materials in file order
    pub materials: Vec<Material>,
}

impl MaterialLibrary {
    pub fn new(ngroups: usize) -> Self {
        Self {
            ngroups,
            materials: Vec::new(),
        }
    }

    /// Parse and validate a library from JSON
    ///
    /// Materials without a group count inherit the library's.
    pub fn load_str(json: &str) -> Result<Self, MgxsError> {
        let mut library: MaterialLibrary = serde_json::from_str(json)?;
        for material in library.materials.iter_mut() {
            if material.ngroups == 0 {
                material.ngroups = library.ngroups;
            }
        }
        library.validate()?;
        debug!(
            "Loaded {} material(s) with {} group(s)",
            library.materials.len(),
            library.ngroups
        );
        Ok(library)
    }

    /// Read a library, as XML if the extension is `.xml` and JSON otherwise
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self, MgxsError> {
        let path = path.as_ref();
        info!("Reading materials from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|source| MgxsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match is_xml(path) {
            true => Self::load_xml_str(&content),
            false => Self::load_str(&content),
        }
    }

    /// Serialise to JSON, refusing materials with a different group count
    pub fn to_json(&self) -> Result<String, MgxsError> {
        self.validate()?;
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write a library, as XML if the extension is `.xml` and JSON otherwise
    pub fn dump_file<P: AsRef<Path>>(&self, path: P) -> Result<(), MgxsError> {
        let path = path.as_ref();
        info!("Writing materials to {}", path.display());
        let content = match is_xml(path) {
            true => self.to_xml()?,
            false => self.to_json()?,
        };
        std::fs::write(path, content).map_err(|source| MgxsError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Group counts, unique names, and array lengths
    pub fn validate(&self) -> Result<(), MgxsError> {
        let mut names = HashSet::new();
        for material in &self.materials {
            if material.ngroups != self.ngroups {
                return Err(MgxsError::GroupMismatch {
                    material: material.name.clone(),
                    ngroups: self.ngroups,
                    found: material.ngroups,
                });
            }
            if !names.insert(material.name.as_str()) {
                return Err(MgxsError::Duplicate(material.name.clone()));
            }
            material.validate()?;
        }
        Ok(())
    }

    /// Material by name
    pub fn get(&self, name: &str) -> Option<&Material> {
        self.materials.iter().find(|m| m.name == name)
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Apply a fix to every material
    pub fn fix(&mut self, fix: Fix) -> Result<(), MgxsError> {
        for material in self.materials.iter_mut() {
            debug!("Fixing {fix:?} of '{}'", material.name);
            match fix {
                Fix::SigmaS => material.fix_scatter_matrix()?,
                Fix::SigmaT => material.fix_sigma_total()?,
            }
        }
        Ok(())
    }

    /// Find `total`/`transport` values below absorption plus scattering
    ///
    /// A value is reported if it is smaller than expected by more than
    /// `tolerance`. Materials with neither array are listed as missing.
    pub fn check_sigma_t(&self, tolerance: f64) -> Result<SigmaTReport, MgxsError> {
        let mut report = SigmaTReport::default();

        for material in &self.materials {
            let candidates: Vec<(&str, &[f64])> = ["total", "transport"]
                .into_iter()
                .filter_map(|xs| material.get(xs).map(|values| (xs, values)))
                .collect();

            if candidates.is_empty() {
                warn!("Material '{}' is missing a sigma_t", material.name);
                report.missing.push(material.name.clone());
                continue;
            }

            let expected = material.build_sigma_total()?;
            for (xs, values) in candidates {
                for (group, (actual, expected)) in values.iter().zip(&expected).enumerate() {
                    if *actual < expected - tolerance {
                        report.deficits.push(SigmaTDeficit {
                            material: material.name.clone(),
                            xs: xs.to_string(),
                            group: group + 1,
                            actual: *actual,
                            expected: *expected,
                        });
                    }
                }
            }
        }

        Ok(report)
    }

    /// Find every negative cross-section value
    ///
    /// Scatter matrix entries are reported for the 0th order only, with both
    /// the outgoing and incoming group.
    pub fn check_negative_xs(&self) -> Vec<NegativeXs> {
        let mut negatives = Vec::new();

        for material in &self.materials {
            let ng = material.ngroups;
            for (xs, values) in material.items() {
                let is_scatter = xs.contains("scatter");
                let n_values = match is_scatter {
                    true => ng * ng,
                    false => ng,
                };

                for (i, value) in values.iter().take(n_values).enumerate() {
                    if *value >= 0.0 {
                        continue;
                    }
                    let groups = match is_scatter {
                        true => (i / ng + 1, Some(i % ng + 1)),
                        false => (i + 1, None),
                    };
                    negatives.push(NegativeXs {
                        material: material.name.clone(),
                        xs: xs.to_string(),
                        groups,
                        value: *value,
                    });
                }
            }
        }

        negatives
    }
}

fn is_xml(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
}

/// A `total` or `transport` value below the expected sum
#[derive(Debug, Clone, PartialEq)]
pub struct SigmaTDeficit {
    pub material: String,
    pub xs: String,
    /// 1-based group index
    pub group: usize,
    pub actual: f64,
    pub expected: f64,
}

/// Outcome of [MaterialLibrary::check_sigma_t]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SigmaTReport {
    pub deficits: Vec<SigmaTDeficit>,
    /// Materials with neither `total` nor `transport`
    pub missing: Vec<String>,
}

impl SigmaTReport {
    pub fn is_good(&self) -> bool {
        self.deficits.is_empty() && self.missing.is_empty()
    }
}

impl std::fmt::Display for SigmaTReport {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.is_good() {
            return write!(f, "All materials have a valid sigma_t");
        }
        if !self.deficits.is_empty() {
            writeln!(f, "Total XS smaller than expected (material, array, group, actual, expected):")?;
            for d in &self.deficits {
                writeln!(
                    f,
                    "    {} '{}' {} {} {}",
                    d.material,
                    d.xs,
                    d.group,
                    d.actual.sci_upper(5, 2),
                    d.expected.sci_upper(5, 2)
                )?;
            }
        }
        if !self.missing.is_empty() {
            writeln!(f, "Materials missing a sigma_t: {:?}", self.missing)?;
        }
        Ok(())
    }
}

/// A negative cross-section value
#[derive(Debug, Clone, PartialEq)]
pub struct NegativeXs {
    pub material: String,
    pub xs: String,
    /// 1-based group, and the second group for scatter matrix entries
    pub groups: (usize, Option<usize>),
    pub value: f64,
}

impl std::fmt::Display for NegativeXs {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let value = self.value.sci_upper(5, 2);
        match self.groups {
            (g, Some(h)) => write!(f, "{} '{}' ({g}, {h}) {value}", self.material, self.xs),
            (g, None) => write!(f, "{} '{}' ({g}) {value}", self.material, self.xs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const LIBRARY: &str = r#"{
        "ngroups": 2,
        "materials": [
            {
                "name": "UO2",
                "info": "fuel",
                "data": {
                    "absorption": [0.25, 0.5],
                    "transport": [1.0, 1.0],
                    "scatter matrix": [0.5, 0.25, -0.125, 1.0]
                }
            },
            {
                "name": "Water",
                "ngroups": 2,
                "data": {
                    "absorption": [0.0, 0.5],
                    "scatter matrix": [1.0, 0.0, 0.0, 2.0]
                }
            }
        ]
    }"#;

    #[test]
    fn load_inherits_group_count() {
        let library = MaterialLibrary::load_str(LIBRARY).unwrap();
        assert_eq!(library.len(), 2);
        assert_eq!(library.get("UO2").unwrap().ngroups, 2);
        assert_eq!(library.get("UO2").unwrap().info, "fuel");
    }

    #[test]
    fn load_rejects_bad_data() {
        let unknown = LIBRARY.replace("\"transport\"", "\"sigma_x\"");
        assert!(matches!(
            MaterialLibrary::load_str(&unknown),
            Err(MgxsError::UnknownXs(_))
        ));

        let short = LIBRARY.replace("[0.0, 0.5]", "[0.0]");
        assert!(matches!(
            MaterialLibrary::load_str(&short),
            Err(MgxsError::Length { .. })
        ));

        let duplicate = LIBRARY.replace("\"Water\"", "\"UO2\"");
        assert!(matches!(
            MaterialLibrary::load_str(&duplicate),
            Err(MgxsError::Duplicate(_))
        ));

        assert!(MaterialLibrary::load_str("not json").is_err());
    }

    #[test]
    fn dump_refuses_mismatched_groups() {
        let mut library = MaterialLibrary::load_str(LIBRARY).unwrap();
        library.materials.push(Material::new("Odd", 3));
        assert!(matches!(
            library.to_json(),
            Err(MgxsError::GroupMismatch { found: 3, .. })
        ));
    }

    #[rstest]
    #[case("materials.json", "{")]
    #[case("materials.xml", "<?xml")]
    #[case("MATERIALS.XML", "<?xml")]
    fn file_round_trip(#[case] name: &str, #[case] start: &str) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);

        let library = MaterialLibrary::load_str(LIBRARY).unwrap();
        library.dump_file(&path).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().starts_with(start));
        assert_eq!(MaterialLibrary::load_file(&path).unwrap(), library);
    }

    #[test]
    fn sigma_t_check() {
        let library = MaterialLibrary::load_str(LIBRARY).unwrap();
        let report = library.check_sigma_t(1e-13).unwrap();

        // UO2 expected [1.0, 1.375], transport [1.0, 1.0]
        assert_eq!(report.deficits.len(), 1);
        assert_eq!(report.deficits[0].group, 2);
        assert_eq!(report.deficits[0].expected, 1.375);
        assert_eq!(report.missing, vec!["Water".to_string()]);
        assert!(!report.is_good());
    }

    #[test]
    fn negative_values_are_located() {
        let library = MaterialLibrary::load_str(LIBRARY).unwrap();
        let negatives = library.check_negative_xs();
        assert_eq!(negatives.len(), 1);
        assert_eq!(negatives[0].material, "UO2");
        assert_eq!(negatives[0].groups, (2, Some(1)));
        assert_eq!(negatives[0].to_string(), "UO2 'scatter matrix' (2, 1) -1.25000E-01");
    }

    #[test]
    fn fixes_apply_to_every_material_with_data() {
        let mut library = MaterialLibrary::load_str(LIBRARY).unwrap();
        library.fix(Fix::SigmaT).unwrap();
        assert_eq!(library.get("Water").unwrap().get("total"), Some(&[1.0, 2.5][..]));

        // transport of UO2 is still short, total is not
        let report = library.check_sigma_t(1e-13).unwrap();
        assert!(report.missing.is_empty());
        assert_eq!(report.deficits.len(), 1);
        assert_eq!(report.deficits[0].xs, "transport");

        // Water has no transport to balance against
        assert!(library.fix(Fix::SigmaS).is_err());
    }
}
