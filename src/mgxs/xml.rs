//! XML form of a material library
//!
//! Materials are listed under a `materials` root, with the cross sections of
//! each one under `macroscopic`:
//!
//! ```xml
//! <materials ngroups="2">
//!   <material name="UO2" label="fuel" set="1" density="0.07">
//!     <nuclide id="92235" radio="7.2E-4"/>
//!     <macroscopic>
//!       <absorption>0.01 0.1</absorption>
//!       <nu>2.4 2.4</nu>
//!       <fission>0.005 0.08</fission>
//!       <scattering>0.15 0.02 0.0 0.7</scattering>
//!     </macroscopic>
//!   </material>
//! </materials>
//! ```
//!
//! The `scattering` tag holds the `scatter matrix`. When both `nu` and
//! `fission` are given, `nu-fission` is their product. Nuclide weights and the
//! `set`, `density`, and `temperature` attributes are not part of a
//! [MaterialLibrary] and are skipped.
//!
//! Without an `ngroups` attribute on the root, the group count is taken from
//! the first group-wise array in the file.

// standard library
use std::borrow::Cow;

// crate modules
use crate::mgxs::{Material, MaterialLibrary, MgxsError, XS_NAMES};
use crate::utils::f;

// external crates
use itertools::Itertools;
use log::{debug, warn};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

const SCATTERING_TAG: &str = "scattering";
const SCATTER: &str = "scatter matrix";

impl MaterialLibrary {
    /// Parse and validate a library from XML
    pub fn load_xml_str(xml: &str) -> Result<Self, MgxsError> {
        let mut reader = Reader::from_str(xml);
        let mut ngroups: Option<usize> = None;
        let mut pending: Vec<PendingMaterial> = Vec::new();
        let mut current: Option<PendingMaterial> = None;
        let mut in_macroscopic = false;
        let mut xs_tag: Option<String> = None;
        let mut text = String::new();

        loop {
            match reader.read_event().map_err(xml_error)? {
                Event::Start(e) => match e.name().as_ref() {
                    b"materials" => ngroups = group_count(&e)?,
                    b"material" => current = Some(PendingMaterial::from_element(&e)?),
                    b"macroscopic" => in_macroscopic = current.is_some(),
                    tag if in_macroscopic => {
                        xs_tag = Some(String::from_utf8_lossy(tag).into_owned());
                        text.clear();
                    }
                    tag => debug!("Skipping <{}>", String::from_utf8_lossy(tag)),
                },
                Event::Empty(e) => match e.name().as_ref() {
                    b"materials" => ngroups = group_count(&e)?,
                    b"material" => pending.push(PendingMaterial::from_element(&e)?),
                    tag => debug!("Skipping <{}/>", String::from_utf8_lossy(tag)),
                },
                Event::Text(t) if xs_tag.is_some() => {
                    text.push_str(&t.unescape().map_err(xml_error)?);
                }
                Event::End(e) => {
                    if let Some(tag) = xs_tag.take() {
                        if let Some(material) = current.as_mut() {
                            let values = material.parse_values(&tag, &text)?;
                            material.arrays.push((tag, values));
                        }
                        continue;
                    }
                    match e.name().as_ref() {
                        b"macroscopic" => in_macroscopic = false,
                        b"material" => pending.extend(current.take()),
                        _ => (),
                    }
                }
                Event::Eof => break,
                _ => (),
            }
        }

        let ngroups = ngroups
            .or_else(|| pending.iter().find_map(|m| m.group_count()))
            .unwrap_or(0);

        let mut library = MaterialLibrary::new(ngroups);
        for material in pending {
            library.materials.push(material.build(ngroups)?);
        }
        library.validate()?;
        debug!(
            "Loaded {} material(s) with {} group(s)",
            library.materials.len(),
            library.ngroups
        );
        Ok(library)
    }

    /// Serialise to XML, refusing materials with a different group count
    ///
    /// Values are written in their shortest exact form, so a library reads
    /// back unchanged.
    pub fn to_xml(&self) -> Result<String, MgxsError> {
        self.validate()?;

        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        let ngroups = self.ngroups.to_string();

        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_error)?;
        writer
            .write_event(Event::Start(
                BytesStart::new("materials").with_attributes([("ngroups", ngroups.as_str())]),
            ))
            .map_err(xml_error)?;

        for material in &self.materials {
            let mut start = BytesStart::new("material");
            start.push_attribute(("name", material.name.as_str()));
            if !material.info.is_empty() {
                start.push_attribute(("label", material.info.as_str()));
            }

            if material.items().next().is_none() {
                writer.write_event(Event::Empty(start)).map_err(xml_error)?;
                continue;
            }

            writer.write_event(Event::Start(start)).map_err(xml_error)?;
            writer
                .write_event(Event::Start(BytesStart::new("macroscopic")))
                .map_err(xml_error)?;

            for (xs, values) in material.items() {
                let tag = match xs {
                    SCATTER => SCATTERING_TAG,
                    _ => xs,
                };
                let text = values.iter().join(" ");
                writer
                    .write_event(Event::Start(BytesStart::new(tag)))
                    .map_err(xml_error)?;
                writer
                    .write_event(Event::Text(BytesText::new(&text)))
                    .map_err(xml_error)?;
                writer
                    .write_event(Event::End(BytesEnd::new(tag)))
                    .map_err(xml_error)?;
            }

            writer
                .write_event(Event::End(BytesEnd::new("macroscopic")))
                .map_err(xml_error)?;
            writer
                .write_event(Event::End(BytesEnd::new("material")))
                .map_err(xml_error)?;
        }

        writer
            .write_event(Event::End(BytesEnd::new("materials")))
            .map_err(xml_error)?;

        String::from_utf8(writer.into_inner()).map_err(xml_error)
    }
}

/// A `material` element as read, before the group count is known
#[derive(Debug, Default)]
struct PendingMaterial {
    name: String,
    info: String,
    arrays: Vec<(String, Vec<f64>)>,
}

impl PendingMaterial {
    fn from_element(e: &BytesStart) -> Result<Self, MgxsError> {
        let name = attribute(e, "name")?
            .ok_or_else(|| MgxsError::Xml("<material> without a name attribute".into()))?;
        let info = attribute(e, "label")?.unwrap_or_default();
        Ok(Self {
            name: name.into_owned(),
            info: info.into_owned(),
            arrays: Vec::new(),
        })
    }

    fn parse_values(&self, tag: &str, text: &str) -> Result<Vec<f64>, MgxsError> {
        text.split_whitespace()
            .map(|v| {
                v.parse::<f64>().map_err(|_| {
                    MgxsError::Xml(f!(
                        "<{tag}> of material '{}' has a non-numeric value '{v}'",
                        self.name
                    ))
                })
            })
            .collect()
    }

    /// Length of the first group-wise array
    fn group_count(&self) -> Option<usize> {
        self.arrays
            .iter()
            .find(|(tag, values)| tag != SCATTERING_TAG && !values.is_empty())
            .map(|(_, values)| values.len())
    }

    fn build(self, ngroups: usize) -> Result<Material, MgxsError> {
        let mut material = Material::new(&self.name, ngroups).with_info(&self.info);
        let mut nu: Option<Vec<f64>> = None;

        for (tag, values) in self.arrays {
            match tag.as_str() {
                SCATTERING_TAG => material.set(SCATTER, values)?,
                "nu" => nu = Some(values),
                xs if XS_NAMES.contains(&xs) => material.set(xs, values)?,
                xs => warn!("Skipping unknown cross section <{xs}> of '{}'", self.name),
            }
        }

        if let (Some(nu), Some(fission)) = (nu, material.get("fission")) {
            if nu.len() != fission.len() {
                return Err(MgxsError::Length {
                    material: self.name,
                    xs: "nu".into(),
                    expected: fission.len().to_string(),
                    found: nu.len(),
                });
            }
            let nu_fission = nu.iter().zip(fission).map(|(n, f)| n * f).collect();
            material.set("nu-fission", nu_fission)?;
        }

        Ok(material)
    }
}

fn attribute<'a>(e: &'a BytesStart, key: &str) -> Result<Option<Cow<'a, str>>, MgxsError> {
    match e.try_get_attribute(key).map_err(xml_error)? {
        Some(attr) => Ok(Some(attr.unescape_value().map_err(xml_error)?)),
        None => Ok(None),
    }
}

fn group_count(e: &BytesStart) -> Result<Option<usize>, MgxsError> {
    match attribute(e, "ngroups")? {
        Some(n) => n
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| MgxsError::Xml(f!("ngroups '{n}' is not an integer"))),
        None => Ok(None),
    }
}

fn xml_error<E: std::fmt::Display>(e: E) -> MgxsError {
    MgxsError::Xml(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<materials>
  <material name="UO2" label="fuel" set="1" density="0.0723" temperature="600K">
    <nuclide id="9223500" radio="7.2018E-4"/>
    <nuclide id="92238" radio="2.2-2"/>
    <macroscopic>
      <absorption>0.01 0.1</absorption>
      <nu> 2.5 2.4 </nu>
      <fission>0.004
               0.05</fission>
      <total>0.2 0.9</total>
      <scattering>0.15 0.02 0.0 0.7</scattering>
      <kappa>1.0 1.0</kappa>
    </macroscopic>
  </material>
  <material name="Water"/>
</materials>
"#;

    #[test]
    fn reads_material_layout() {
        let library = MaterialLibrary::load_xml_str(SAMPLE).unwrap();
        assert_eq!(library.ngroups, 2);
        assert_eq!(library.len(), 2);

        let fuel = library.get("UO2").unwrap();
        assert_eq!(fuel.info, "fuel");
        assert_eq!(fuel.ngroups, 2);
        assert_eq!(fuel.get("absorption"), Some(&[0.01, 0.1][..]));
        assert_eq!(fuel.get("scatter matrix"), Some(&[0.15, 0.02, 0.0, 0.7][..]));
        assert_eq!(fuel.get("nu-fission"), Some(&[2.5 * 0.004, 2.4 * 0.05][..]));
        assert_eq!(fuel.get("nu"), None);
        assert_eq!(fuel.get("kappa"), None);

        let water = library.get("Water").unwrap();
        assert_eq!(water.ngroups, 2);
        assert_eq!(water.items().count(), 0);
    }

    #[test]
    fn xml_round_trip() {
        let mut library = MaterialLibrary::new(2);
        let mut fuel = Material::new("UO2", 2).with_info("fuel & clad <3>");
        fuel.set("absorption", vec![0.1, 1.0e-300]).unwrap();
        fuel.set("total", vec![1.0 / 3.0, 2.5]).unwrap();
        fuel.set("scatter matrix", vec![0.5, 0.1, 0.0, 0.8, 0.01, 0.0, 0.0, 0.02]).unwrap();
        library.materials.push(fuel);
        library.materials.push(Material::new("Void", 2));

        let xml = library.to_xml().unwrap();
        assert!(xml.contains("<materials ngroups=\"2\">"));
        assert!(xml.contains("<scattering>"));
        assert_eq!(MaterialLibrary::load_xml_str(&xml).unwrap(), library);
    }

    #[test]
    fn root_group_count_wins() {
        let xml = r#"<materials ngroups="3">
            <material name="A"><macroscopic><chi>1 0</chi></macroscopic></material>
        </materials>"#;
        assert!(matches!(
            MaterialLibrary::load_xml_str(xml),
            Err(MgxsError::Length { .. })
        ));
    }

    #[rstest]
    #[case(r#"<materials><material label="x"/></materials>"#)]
    #[case(r#"<materials ngroups="two"/>"#)]
    #[case(r#"<materials><material name="A"><macroscopic><chi>1 x</chi></macroscopic></material></materials>"#)]
    #[case(r#"<materials><material name="A"><macroscopic><nu>1 2</nu><fission>1 2 3</fission></macroscopic></material></materials>"#)]
    #[case(r#"<materials><material name="A"/><material name="A"/></materials>"#)]
    #[case(r#"<materials><material name="A"><macroscopic><chi>1 0</chi></materials>"#)]
    fn malformed_xml_is_an_error(#[case] xml: &str) {
        assert!(MaterialLibrary::load_xml_str(xml).is_err());
    }
}
