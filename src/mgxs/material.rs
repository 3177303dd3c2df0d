// standard library
use std::collections::BTreeMap;

// crate modules
use crate::mgxs::MgxsError;
use crate::utils::{f, NumberFmt};

// external crates
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Cross-section names used by ANT-MOC
///
/// `transport` is an alternative to `total`, they are never used together in
/// a single run.
pub const XS_NAMES: [&str; 7] = [
    "absorption",
    "fission",
    "total",
    "transport",
    "nu-fission",
    "chi",
    "scatter matrix",
];

const ABSORPTION: &str = "absorption";
const TOTAL: &str = "total";
const TRANSPORT: &str = "transport";
const SCATTER: &str = "scatter matrix";

/// Named cross sections of a single material
///
/// ```rust
/// # use antmocdata::mgxs::Material;
/// let mut material = Material::new("EEZO", 2).with_info("Element Zero");
/// material.set("absorption", vec![0.1, 0.2]).unwrap();
/// material.set("scatter matrix", vec![0.5, 0.1, 0.0, 0.8]).unwrap();
///
/// assert_eq!(material.build_sigma_total().unwrap(), vec![0.7, 1.0]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Unique identifier within a library
    pub name: String,
    /// Optional description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub info: String,
    /// Number of energy groups
    #[serde(default)]
    pub ngroups: usize,
    /// Cross-section arrays by name
    #[serde(default)]
    data: BTreeMap<String, Vec<f64>>,
}

impl Material {
    pub fn new(name: &str, ngroups: usize) -> Self {
        Self {
            name: name.to_string(),
            info: String::new(),
            ngroups,
            data: BTreeMap::new(),
        }
    }

    pub fn with_info(mut self, info: &str) -> Self {
        self.info = info.to_string();
        self
    }

    /// Cross section by name, `None` if not defined
    pub fn get(&self, xs: &str) -> Option<&[f64]> {
        self.data.get(xs).map(|v| v.as_slice())
    }

    /// Cross section by name, an error if not defined
    pub fn xs(&self, xs: &str) -> Result<&[f64], MgxsError> {
        self.get(xs).ok_or_else(|| MgxsError::MissingXs {
            material: self.name.clone(),
            xs: xs.to_string(),
        })
    }

    /// Define or replace a cross section
    ///
    /// The name must be one of [XS_NAMES], and the length must be `ngroups`,
    /// or a multiple of `ngroups²` for the scatter matrix.
    pub fn set(&mut self, xs: &str, values: Vec<f64>) -> Result<(), MgxsError> {
        self.check(xs, &values)?;
        self.data.insert(xs.to_string(), values);
        Ok(())
    }

    /// Defined cross sections, sorted by name
    pub fn items(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.data.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn contains(&self, xs: &str) -> bool {
        self.data.contains_key(xs)
    }

    /// Check every stored array against the group structure
    pub fn validate(&self) -> Result<(), MgxsError> {
        self.data.iter().try_for_each(|(xs, values)| self.check(xs, values))
    }

    fn check(&self, xs: &str, values: &[f64]) -> Result<(), MgxsError> {
        if !XS_NAMES.contains(&xs) {
            return Err(MgxsError::UnknownXs(xs.to_string()));
        }

        let ng = self.ngroups;
        let (fits, expected) = match xs {
            SCATTER => (
                ng > 0 && !values.is_empty() && values.len() % (ng * ng) == 0,
                f!("a multiple of {}", ng * ng),
            ),
            _ => (values.len() == ng, ng.to_string()),
        };

        match fits {
            true => Ok(()),
            false => Err(MgxsError::Length {
                material: self.name.clone(),
                xs: xs.to_string(),
                expected,
                found: values.len(),
            }),
        }
    }

    /// Number of Legendre orders in the scatter matrix
    pub fn n_orders(&self) -> usize {
        let n = self.ngroups * self.ngroups;
        match (self.get(SCATTER), n) {
            (Some(values), n) if n > 0 => values.len() / n,
            _ => 0,
        }
    }

    /// Scatter matrix of one Legendre order, row-major
    pub fn scatter_matrix(&self, order: usize) -> Result<&[f64], MgxsError> {
        let n = self.ngroups * self.ngroups;
        let values = self.xs(SCATTER)?;
        values
            .get(order * n..(order + 1) * n)
            .ok_or_else(|| MgxsError::Length {
                material: self.name.clone(),
                xs: SCATTER.to_string(),
                expected: f!("at least {}", (order + 1) * n),
                found: values.len(),
            })
    }

    /// `absorption` plus the row sums of the 0th order scatter matrix
    pub fn build_sigma_total(&self) -> Result<Vec<f64>, MgxsError> {
        let scatter = self.scatter_matrix(0)?;
        let absorption = self.xs(ABSORPTION)?;

        Ok(absorption
            .iter()
            .zip(scatter.chunks(self.ngroups))
            .map(|(a, row)| a + row.iter().sum::<f64>())
            .collect())
    }

    /// Replace `total` with the sum of absorption and scattering
    pub fn fix_sigma_total(&mut self) -> Result<(), MgxsError> {
        let sigma_total = self.build_sigma_total()?;
        self.data.insert(TOTAL.to_string(), sigma_total);
        Ok(())
    }

    /// Add `transport - sigma_total` to the diagonal of the 0th order scatter
    ///
    /// Afterwards the transport cross section equals absorption plus the
    /// 0th order scattering, group by group.
    pub fn fix_scatter_matrix(&mut self) -> Result<(), MgxsError> {
        let delta: Vec<f64> = self
            .xs(TRANSPORT)?
            .iter()
            .zip(self.build_sigma_total()?)
            .map(|(transport, total)| transport - total)
            .collect();

        let ng = self.ngroups;
        if let Some(scatter) = self.data.get_mut(SCATTER) {
            for (g, d) in delta.iter().enumerate() {
                scatter[g * ng + g] += d;
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for Material {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        writeln!(f, "Material:")?;
        writeln!(f, "    name = '{}'", self.name)?;
        writeln!(f, "    info = '{}'", self.info)?;
        writeln!(f, "    number of groups = {}", self.ngroups)?;
        writeln!(f, "    cross-sections:")?;
        for (name, values) in &self.data {
            let values = values.iter().map(|v| v.sci(5, 2)).join(" ");
            writeln!(f, "    {name: <14} = [{values}]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn material() -> Material {
        let mut material = Material::new("UO2", 2);
        material.set("absorption", vec![0.25, 0.5]).unwrap();
        material.set("transport", vec![1.0, 2.0]).unwrap();
        // two orders, the second must be ignored
        material
            .set("scatter matrix", vec![0.5, 0.25, 0.0, 1.0, 9.0, 9.0, 9.0, 9.0])
            .unwrap();
        material
    }

    #[test]
    fn set_checks_names_and_lengths() {
        let mut material = Material::new("M", 2);
        assert!(matches!(
            material.set("sigma_x", vec![1.0, 2.0]),
            Err(MgxsError::UnknownXs(_))
        ));
        assert!(matches!(
            material.set("fission", vec![1.0]),
            Err(MgxsError::Length { found: 1, .. })
        ));
        assert!(material.set("scatter matrix", vec![1.0; 6]).is_err());
        assert!(material.set("scatter matrix", vec![1.0; 8]).is_ok());
        assert_eq!(material.n_orders(), 2);
    }

    #[test]
    fn sigma_total_uses_zeroth_order() {
        let material = material();
        assert_eq!(material.build_sigma_total().unwrap(), vec![1.0, 1.5]);
    }

    #[test]
    fn fix_sigma_total_replaces_total() {
        let mut material = material();
        material.fix_sigma_total().unwrap();
        assert_eq!(material.get("total"), Some(&[1.0, 1.5][..]));
    }

    #[test]
    fn fix_scatter_matrix_balances_transport() {
        let mut material = material();
        material.fix_scatter_matrix().unwrap();

        // delta = transport - sigma_total = [0.0, 0.5]
        assert_eq!(material.scatter_matrix(0).unwrap(), &[0.5, 0.25, 0.0, 1.5]);
        assert_eq!(material.scatter_matrix(1).unwrap(), &[9.0; 4]);
        assert_eq!(material.build_sigma_total().unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn missing_arrays_are_errors() {
        let mut material = Material::new("Empty", 2);
        assert!(matches!(
            material.build_sigma_total(),
            Err(MgxsError::MissingXs { .. })
        ));
        assert!(material.fix_scatter_matrix().is_err());
        assert!(material.scatter_matrix(0).is_err());
    }
}
