//! Conversion of solution arrays to VTK formats for plotting
//!
//! Reaction rates live on a regular lattice, so they are written as a
//! rectilinear grid with one cell per lattice cell. The y axis is restored to
//! the orientation of the original `.vtu` file.
//!
//! ```ignore
//! use antmocdata::solution::read_vtu;
//! use antmocdata::vtk::{write_vtk, SolutionToVtkBuilder, VtkFormat};
//!
//! let solution = read_vtu("rx.vtu", &["Fission"])?;
//! let convertor = SolutionToVtkBuilder::new().pitch([1.26, 1.26, 1.0]).build();
//! let vtk = convertor.convert(&solution)?;
//! write_vtk(vtk, "rx.vtr", VtkFormat::Xml)?;
//! ```

// standard library
use std::path::Path;

// crate modules
use crate::solution::{Array3, Solution};
use crate::utils::f;

// external crates
use anyhow::{anyhow, bail, Result};
use clap::ValueEnum;
use log::{debug, trace};
use vtkio::model::{
    Attribute, Attributes, ByteOrder, Coordinates, DataArray, DataSet, ElementType, Extent,
    IOBuffer, RectilinearGridPiece, Version, Vtk,
};

/// Supported VTK output formats
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum VtkFormat {
    /// Xml rectilinear grid, `.vtr`
    Xml,
    /// Legacy ascii, `.vtk`
    LegacyAscii,
    /// Legacy big endian binary, `.vtk`
    LegacyBinary,
}

impl VtkFormat {
    /// File extension expected by VTK readers
    pub fn extension(&self) -> &'static str {
        match self {
            VtkFormat::Xml => "vtr",
            _ => "vtk",
        }
    }
}

/// Converts a [Solution] to a rectilinear VTK grid
#[derive(Debug, Clone)]
pub struct SolutionToVtk {
    /// Lattice pitch in x, y, z
    pitch: [f64; 3],
    /// Coordinates of the lower corner
    origin: [f64; 3],
    /// Byte ordering of binary data
    byte_order: ByteOrder,
    /// Normalise each array before writing
    normalize: bool,
}

impl Default for SolutionToVtk {
    fn default() -> Self {
        Self {
            pitch: [1.0; 3],
            origin: [0.0; 3],
            byte_order: ByteOrder::BigEndian,
            normalize: false,
        }
    }
}

impl SolutionToVtk {
    pub fn new() -> Self {
        Default::default()
    }

    /// Build the VTK grid, one cell data array per solution array
    pub fn convert(&self, solution: &Solution) -> Result<Vtk> {
        let [nx, ny, nz] = solution.extent;
        if nx * ny * nz == 0 {
            bail!("Solution has an empty extent {:?}", solution.extent);
        }
        if self.pitch.iter().any(|p| *p <= 0.0) {
            bail!("Lattice pitch must be positive, found {:?}", self.pitch);
        }

        let cell = solution
            .arrays
            .iter()
            .map(|(name, array)| self.cell_array(name, array, solution.extent))
            .collect::<Result<Vec<Attribute>>>()?;

        debug!("Converted {} array(s) to cell data", cell.len());

        Ok(Vtk {
            version: Version::new((1, 0)),
            byte_order: self.byte_order,
            title: String::from("ANT-MOC solution"),
            file_path: None,
            data: DataSet::inline(RectilinearGridPiece {
                extent: Extent::Dims([nx as u32 + 1, ny as u32 + 1, nz as u32 + 1]),
                coords: Coordinates {
                    x: self.axis(0, nx),
                    y: self.axis(1, ny),
                    z: self.axis(2, nz),
                },
                data: Attributes {
                    point: Vec::new(),
                    cell,
                },
            }),
        })
    }

    /// Node coordinates along one axis
    fn axis(&self, axis: usize, n_cells: usize) -> IOBuffer {
        let (origin, pitch) = (self.origin[axis], self.pitch[axis]);
        IOBuffer::F64((0..=n_cells).map(|i| origin + i as f64 * pitch).collect())
    }

    /// Cell data in VTK order, x fastest and the y axis flipped back
    fn cell_array(&self, name: &str, array: &Array3, extent: [usize; 3]) -> Result<Attribute> {
        let [nx, ny, nz] = extent;
        if array.shape() != [nz, ny, nx] {
            bail!(
                "Array '{name}' has shape {:?}, expected {:?}",
                array.shape(),
                [nz, ny, nx]
            );
        }
        trace!("Writing cell data for '{name}'");

        let array = match self.normalize {
            true => array.normalized(),
            false => array.clone(),
        };

        let mut values = Vec::with_capacity(array.len());
        for z in 0..nz {
            for y in 0..ny {
                for x in 0..nx {
                    values.push(array[[z, ny - 1 - y, x]]);
                }
            }
        }

        Ok(Attribute::DataArray(DataArray {
            name: name.to_string(),
            elem: ElementType::Scalars {
                num_comp: 1,
                lookup_table: None,
            },
            data: IOBuffer::F64(values),
        }))
    }
}

/// Builder for [SolutionToVtk]
#[derive(Debug, Default)]
pub struct SolutionToVtkBuilder {
    convertor: SolutionToVtk,
}

impl SolutionToVtkBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn pitch(mut self, pitch: [f64; 3]) -> Self {
        self.convertor.pitch = pitch;
        self
    }

    pub fn origin(mut self, origin: [f64; 3]) -> Self {
        self.convertor.origin = origin;
        self
    }

    pub fn byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.convertor.byte_order = byte_order;
        self
    }

    pub fn normalize(mut self, normalize: bool) -> Self {
        self.convertor.normalize = normalize;
        self
    }

    pub fn build(self) -> SolutionToVtk {
        self.convertor
    }
}

/// Convert a solution with the default unit pitch
pub fn solution_to_vtk(solution: &Solution) -> Result<Vtk> {
    SolutionToVtk::new().convert(solution)
}

/// Write a VTK object to file in the chosen format
pub fn write_vtk<P: AsRef<Path>>(vtk: Vtk, path: P, format: VtkFormat) -> Result<()> {
    let path = path.as_ref();
    debug!("Writing {format:?} VTK to {}", path.display());

    match format {
        VtkFormat::Xml => vtk.export(path),
        VtkFormat::LegacyAscii => vtk.export_ascii(path),
        VtkFormat::LegacyBinary => vtk.export_be(path),
    }
    .map_err(|e| anyhow!(f!("Failed to write {}: {e:?}", path.display())))
}
