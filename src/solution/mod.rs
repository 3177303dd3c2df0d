//! Reaction rates and fluxes from ANT-MOC solution files
//!
//! ANT-MOC dumps reaction rates on a regular lattice mesh as a `.vtu` file.
//! [read_vtu] turns every data array of such a file into a dense [Array3]
//! indexed `[z][j][k]`, with the y axis reversed so that `j` runs top to
//! bottom like the rows of a printed lattice.
//!
//! ```text
//!   vtu axes          array axes
//!   z   y             z,i
//!   ▲  ▲              ▲
//!   │ /               │
//!   └───► x           └────► x,k
//!                    /
//!                   ▼
//!                  y,j
//! ```
//!
//! ```ignore
//! use antmocdata::solution::read_vtu;
//!
//! let solution = read_vtu("reaction_rates.vtu", &["^Avg Fission RX$"])?;
//! let fission = solution.get("Avg Fission RX").unwrap();
//! assert_eq!(fission.shape(), [45, 51, 51]);
//! ```

mod array;

#[doc(inline)]
pub use array::Array3;

#[doc(inline)]
pub use crate::readers::{read_vtu, VtuReader};

/// Named 3D arrays read from one solution file, in file order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Solution {
    /// Number of lattice cells in x, y, z
    pub extent: [usize; 3],
    /// Arrays by name
    pub arrays: Vec<(String, Array3)>,
}

impl Solution {
    pub fn new(extent: [usize; 3]) -> Self {
        Self {
            extent,
            arrays: Vec::new(),
        }
    }

    /// Array by exact name
    pub fn get(&self, name: &str) -> Option<&Array3> {
        self.arrays
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, array)| array)
    }

    /// Array names in file order
    pub fn names(&self) -> Vec<&str> {
        self.arrays.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }

    /// Normalise every array in place, see [Array3::normalized]
    pub fn normalize(&mut self) {
        for (_, array) in self.arrays.iter_mut() {
            *array = array.normalized();
        }
    }

    /// Keep only arrays whose name passes the predicate
    pub fn retain<F: FnMut(&str) -> bool>(&mut self, mut keep: F) {
        self.arrays.retain(|(name, _)| keep(name));
    }
}

impl std::fmt::Display for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let [nx, ny, nz] = self.extent;
        writeln!(f, "Solution on a {nx} x {ny} x {nz} mesh")?;
        for (name, array) in &self.arrays {
            writeln!(f, "    {name}: {array}")?;
        }
        Ok(())
    }
}
