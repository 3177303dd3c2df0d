// standard library
use std::fs;
use std::path::Path;

// crate modules
use crate::readers::parsers::{self, Element};
use crate::solution::{Array3, Solution};
use crate::utils::f;

// external crates
use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info, trace};
use regex::Regex;

/// Name of the array mapping each value to its lattice cell
pub const VALID_INDICES: &str = "Valid Indices";

/// Reader for ANT-MOC reaction rate `.vtu` files
///
/// The `Piece` element carries the lattice extent as `Extent="nx ny nz"` and
/// the number of cells per layer as `NumberOfCellsXY`. Every `DataArray` under
/// `CellData` holds `nz * NumberOfCellsXY` ASCII values, and the
/// `Valid Indices` array gives the flat lattice index of each one.
///
/// Arrays are kept if their name matches at least one filter regex anywhere
/// in the name. With no filters every array is kept, including the
/// `Valid Indices` themselves.
///
/// Example:
/// ```ignore
///     let reader = VtuReader::new().with_filters(&["Fission"])?;
///     let solution = reader.parse(Path::new("rx.vtu"))?;
/// ```
#[derive(Debug, Default)]
pub struct VtuReader {
    filters: Vec<Regex>,
}

impl VtuReader {
    pub fn new() -> Self {
        Default::default()
    }

    /// Only keep arrays with a name matching at least one of the patterns
    pub fn with_filters<S: AsRef<str>>(mut self, filters: &[S]) -> Result<Self> {
        self.filters = filters
            .iter()
            .map(|pattern| {
                let pattern = pattern.as_ref();
                Regex::new(pattern).with_context(|| f!("Invalid array filter '{pattern}'"))
            })
            .collect::<Result<Vec<Regex>>>()?;
        Ok(self)
    }

    /// Read and convert a `.vtu` file
    pub fn parse(&self, path: &Path) -> Result<Solution> {
        let content =
            fs::read_to_string(path).with_context(|| f!("Could not read {}", path.display()))?;
        self.parse_str(&content)
            .with_context(|| f!("Failed to load {}", path.display()))
    }

    /// Convert the content of a `.vtu` file
    pub fn parse_str(&self, content: &str) -> Result<Solution> {
        let (piece, _) = parsers::find_element(content, "Piece")
            .ok_or_else(|| anyhow!("No complete <Piece> element found"))?;

        let extent = Self::extent(&piece)?;
        let [nx, ny, nz] = extent;
        info!("Mesh dimensions = [{nx}, {ny}, {nz}]");

        let n_cells_xy: usize = piece
            .attribute("NumberOfCellsXY")
            .ok_or_else(|| anyhow!("<Piece> has no NumberOfCellsXY attribute"))?
            .trim()
            .parse()
            .context("NumberOfCellsXY is not an integer")?;

        let (cell_data, _) = parsers::find_element(piece.body, "CellData")
            .ok_or_else(|| anyhow!("No <CellData> element found"))?;
        let data_arrays = parsers::find_elements(cell_data.body, "DataArray");

        let n_cells = [ny, nz]
            .iter()
            .try_fold(nx, |n, &d| n.checked_mul(d))
            .ok_or_else(|| anyhow!("Extent [{nx}, {ny}, {nz}] is too large"))?;
        if n_cells_xy > nx * ny {
            bail!("NumberOfCellsXY={n_cells_xy} exceeds the {nx}x{ny} layer");
        }

        let n_values = nz * n_cells_xy;
        let valid_indices = Self::valid_indices(&data_arrays, n_values)?;
        check_indices(&valid_indices, n_cells)?;

        let mut solution = Solution::new(extent);
        let mut skipped = Vec::new();

        for data_array in &data_arrays {
            let name = data_array
                .attribute("Name")
                .ok_or_else(|| anyhow!("<DataArray> without a Name attribute"))?;

            if !self.is_wanted(name) {
                skipped.push(name);
                continue;
            }

            trace!("Converting '{name}'");
            let values = Self::values(name, data_array.body, n_values)?;

            let mut array = Array3::try_zeros([nz, ny, nx])
                .ok_or_else(|| anyhow!("Could not allocate {n_cells} cells for '{name}'"))?;
            for (count, (value, index)) in values.iter().zip(&valid_indices).enumerate() {
                let z = count / n_cells_xy.max(1);
                let x = index % nx;
                let y = index / nx % ny;
                let j = ny - 1 - y;
                array[[z, j, x]] = *value;
            }
            solution.arrays.push((name.to_string(), array));
        }

        debug!("Imported data array(s): {:?}", solution.names());
        debug!("Skipped data array(s): {skipped:?}");
        Ok(solution)
    }

    fn is_wanted(&self, name: &str) -> bool {
        self.filters.is_empty() || self.filters.iter().any(|re| re.is_match(name))
    }

    fn extent(piece: &Element) -> Result<[usize; 3]> {
        let text = piece
            .attribute("Extent")
            .ok_or_else(|| anyhow!("<Piece> has no Extent attribute"))?;

        let (_, extent) =
            parsers::extent(text).map_err(|_| anyhow!("Extent '{text}' is not three integers"))?;

        if extent.contains(&0) {
            bail!("Extent '{text}' has an empty dimension");
        }
        Ok(extent)
    }

    /// Flat lattice index of every value
    fn valid_indices(data_arrays: &[Element], n_values: usize) -> Result<Vec<usize>> {
        let data_array = data_arrays
            .iter()
            .find(|array| array.attribute("Name") == Some(VALID_INDICES))
            .ok_or_else(|| anyhow!("No '{VALID_INDICES}' data array found"))?;

        let indices = Self::values(VALID_INDICES, data_array.body, n_values)?
            .into_iter()
            .map(|v| match v >= 0.0 && v.fract() == 0.0 {
                true => Ok(v as usize),
                false => Err(anyhow!("'{VALID_INDICES}' contains an invalid index {v}")),
            })
            .collect::<Result<Vec<usize>>>()?;

        Ok(indices)
    }

    /// First `n_values` numbers of an array body
    fn values(name: &str, body: &str, n_values: usize) -> Result<Vec<f64>> {
        let values = body
            .split_whitespace()
            .take(n_values)
            .map(|v| {
                v.parse::<f64>()
                    .with_context(|| f!("'{name}' contains a non-numeric value '{v}'"))
            })
            .collect::<Result<Vec<f64>>>()?;

        if values.len() < n_values {
            bail!(
                "'{name}' has {} value(s), expected {n_values}",
                values.len()
            );
        }
        Ok(values)
    }
}

/// Every index must address a cell of the lattice
fn check_indices(indices: &[usize], n_cells: usize) -> Result<()> {
    match indices.iter().find(|&&i| i >= n_cells) {
        Some(i) => Err(anyhow!(
            "'{VALID_INDICES}' index {i} is outside of the {n_cells} cell mesh"
        )),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    /// 3 x 2 lattice with 2 layers, only 4 cells per layer are valid
    const SAMPLE: &str = r#"<?xml version="1.0"?>
<VTKFile type="UnstructuredGrid" version="0.1" byte_order="LittleEndian">
  <UnstructuredGrid>
    <Piece NumberOfPoints="0" NumberOfCells="8" Extent="3 2 2" NumberOfCellsXY="4">
      <Points>
        <DataArray type="Float64" NumberOfComponents="3" format="ascii"></DataArray>
      </Points>
      <CellData Scalars="scalars">
        <DataArray type="Int32" Name="Valid Indices" format="ascii">
          0 1 3 5
          6 7 9 11
        </DataArray>
        <DataArray type="Float64" Name="Avg Fission RX" format="ascii">
          1.0 2.0 3.0 4.0
          5.0 6.0 7.0 8.0
        </DataArray>
        <DataArray type="Float64" Name="Avg Total RX" format="ascii">
          0.5 0.5 0.5 0.5 0.5 0.5 0.5 0.5
        </DataArray>
      </CellData>
    </Piece>
  </UnstructuredGrid>
</VTKFile>
"#;

    #[test]
    fn arrays_are_mapped_with_reversed_y() {
        let solution = VtuReader::new().parse_str(SAMPLE).unwrap();
        assert_eq!(solution.extent, [3, 2, 2]);
        assert_eq!(solution.names(), vec!["Valid Indices", "Avg Fission RX", "Avg Total RX"]);

        let fission = solution.get("Avg Fission RX").unwrap();
        assert_eq!(fission.shape(), [2, 2, 3]);

        // layer 0: idx 0 (x0,y0), 1 (x1,y0), 3 (x0,y1), 5 (x2,y1)
        assert_eq!(fission.get(0, 1, 0), Some(1.0));
        assert_eq!(fission.get(0, 1, 1), Some(2.0));
        assert_eq!(fission.get(0, 0, 0), Some(3.0));
        assert_eq!(fission.get(0, 0, 2), Some(4.0));
        assert_eq!(fission.get(0, 1, 2), Some(0.0));

        // layer 1: idx 6 (x0,y0), 7 (x1,y0), 9 (x0,y1), 11 (x2,y1)
        assert_eq!(fission.get(1, 1, 0), Some(5.0));
        assert_eq!(fission.get(1, 0, 2), Some(8.0));
        assert_eq!(fission.sum(), 36.0);
    }

    #[test]
    fn filters_select_arrays() {
        let reader = VtuReader::new().with_filters(&["^Avg Fission RX$"]).unwrap();
        let solution = reader.parse_str(SAMPLE).unwrap();
        assert_eq!(solution.names(), vec!["Avg Fission RX"]);

        let reader = VtuReader::new().with_filters(&["Total", "Fission"]).unwrap();
        assert_eq!(reader.parse_str(SAMPLE).unwrap().len(), 2);

        assert!(VtuReader::new().with_filters(&["("]).is_err());
    }

    #[test]
    fn malformed_files_are_errors() {
        let reader = VtuReader::new();

        let no_extent = SAMPLE.replace(r#"Extent="3 2 2""#, "");
        assert!(reader.parse_str(&no_extent).is_err());

        let no_cells = SAMPLE.replace(r#"NumberOfCellsXY="4""#, "");
        assert!(reader.parse_str(&no_cells).is_err());

        let too_few = SAMPLE.replace("5.0 6.0 7.0 8.0", "5.0 6.0");
        assert!(reader.parse_str(&too_few).is_err());

        let not_numbers = SAMPLE.replace("5.0 6.0", "five six");
        assert!(reader.parse_str(&not_numbers).is_err());

        let outside = SAMPLE.replace("6 7 9 11", "6 7 9 12");
        assert!(reader.parse_str(&outside).is_err());

        let no_indices = SAMPLE.replace("Valid Indices", "Something Else");
        assert!(reader.parse_str(&no_indices).is_err());

        assert!(reader.parse_str("<VTKFile></VTKFile>").is_err());
    }

    #[rstest]
    #[case("4294967296 4294967296 2", "4")]
    #[case("18446744073709551615 2 1", "4")]
    #[case("100000 100000 100000", "4")]
    #[case("3 2 2", "7")]
    #[case("3 2 200000000000000", "0")]
    fn oversized_meshes_are_errors(#[case] extent: &str, #[case] n_cells_xy: &str) {
        let content = SAMPLE
            .replace(r#"Extent="3 2 2""#, &f!(r#"Extent="{extent}""#))
            .replace(r#"NumberOfCellsXY="4""#, &f!(r#"NumberOfCellsXY="{n_cells_xy}""#));
        assert!(VtuReader::new().parse_str(&content).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(VtuReader::new().parse(Path::new("/no/such/rx.vtu")).is_err());
    }
}
