// standard library
use std::ops::{Index, IndexMut};

// crate modules
use crate::utils::{f, vec_f64_max, vec_f64_min};

/// Dense 3D array of `f64`, indexed `[z][j][k]`
///
/// Data is stored row-major with `k` varying fastest, the same layout as a
/// C-ordered array of shape `(nz, ny, nx)`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Array3 {
    shape: [usize; 3],
    data: Vec<f64>,
}

impl Array3 {
    /// Zero-filled array of shape `[nz, ny, nx]`
    pub fn zeros(shape: [usize; 3]) -> Self {
        Self {
            shape,
            data: vec![0.0; shape.iter().product()],
        }
    }

    /// Zero-filled array, `None` if the size overflows or cannot be allocated
    pub fn try_zeros(shape: [usize; 3]) -> Option<Self> {
        let n = shape.iter().try_fold(1usize, |n, &d| n.checked_mul(d))?;
        let mut data = Vec::new();
        data.try_reserve_exact(n).ok()?;
        data.resize(n, 0.0);
        Some(Self { shape, data })
    }

    /// Wrap existing data, `None` if the length does not fit the shape
    pub fn from_vec(shape: [usize; 3], data: Vec<f64>) -> Option<Self> {
        match data.len() == shape.iter().product::<usize>() {
            true => Some(Self { shape, data }),
            false => None,
        }
    }

    /// `[nz, ny, nx]`
    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Flat index of `[z, j, k]`, `None` if out of bounds
    pub fn flat_index(&self, z: usize, j: usize, k: usize) -> Option<usize> {
        let [nz, ny, nx] = self.shape;
        match z < nz && j < ny && k < nx {
            true => Some((z * ny + j) * nx + k),
            false => None,
        }
    }

    pub fn get(&self, z: usize, j: usize, k: usize) -> Option<f64> {
        self.flat_index(z, j, k).map(|i| self.data[i])
    }

    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    pub fn count_nonzero(&self) -> usize {
        self.data.iter().filter(|v| **v != 0.0).count()
    }

    pub fn max(&self) -> Option<f64> {
        vec_f64_max(&self.data)
    }

    pub fn min(&self) -> Option<f64> {
        vec_f64_min(&self.data)
    }

    /// Scale so that the non-zero entries average to one
    ///
    /// Computes `data / sum * count_nonzero`. An array that sums to zero is
    /// returned unchanged.
    ///
    /// ```rust
    /// # use antmocdata::solution::Array3;
    /// let array = Array3::from_vec([1, 1, 4], vec![1.0, 3.0, 0.0, 4.0]).unwrap();
    /// assert_eq!(array.normalized().data(), &[0.375, 1.125, 0.0, 1.5]);
    /// ```
    pub fn normalized(&self) -> Array3 {
        let sum = self.sum();
        if sum == 0.0 {
            return self.clone();
        }
        let factor = self.count_nonzero() as f64 / sum;
        Array3 {
            shape: self.shape,
            data: self.data.iter().map(|v| v * factor).collect(),
        }
    }

    /// Multiply every entry by a constant
    pub fn scale(&mut self, factor: f64) {
        self.data.iter_mut().for_each(|v| *v *= factor);
    }

    /// Slice at one `z` layer, rows of `j`
    pub fn layer(&self, z: usize) -> Option<Vec<&[f64]>> {
        let [nz, ny, nx] = self.shape;
        if z >= nz {
            return None;
        }
        let start = z * ny * nx;
        Some(self.data[start..start + ny * nx].chunks(nx.max(1)).collect())
    }
}

impl Index<[usize; 3]> for Array3 {
    type Output = f64;

    fn index(&self, [z, j, k]: [usize; 3]) -> &f64 {
        let [nz, ny, nx] = self.shape;
        match self.flat_index(z, j, k) {
            Some(i) => &self.data[i],
            None => panic!("index [{z}, {j}, {k}] out of bounds for shape [{nz}, {ny}, {nx}]"),
        }
    }
}

impl IndexMut<[usize; 3]> for Array3 {
    fn index_mut(&mut self, [z, j, k]: [usize; 3]) -> &mut f64 {
        let [nz, ny, nx] = self.shape;
        match self.flat_index(z, j, k) {
            Some(i) => &mut self.data[i],
            None => panic!("index [{z}, {j}, {k}] out of bounds for shape [{nz}, {ny}, {nx}]"),
        }
    }
}

impl std::fmt::Display for Array3 {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let [nz, ny, nx] = self.shape;
        let range = match (self.min(), self.max()) {
            (Some(min), Some(max)) => f!("{min:.5e} to {max:.5e}"),
            _ => "empty".to_string(),
        };
        write!(f, "Array3 [{nz}, {ny}, {nx}], {range}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexing_is_row_major() {
        let mut array = Array3::zeros([2, 3, 4]);
        array[[1, 2, 3]] = 7.0;
        array[[0, 1, 0]] = 1.0;

        assert_eq!(array.len(), 24);
        assert_eq!(array.data()[23], 7.0);
        assert_eq!(array.data()[4], 1.0);
        assert_eq!(array.get(1, 2, 3), Some(7.0));
        assert_eq!(array.get(2, 0, 0), None);
        assert_eq!(array.layer(0).unwrap()[1], &[1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn normalized_nonzero_mean_is_one() {
        let array = Array3::from_vec([1, 2, 2], vec![2.0, 0.0, 4.0, 6.0]).unwrap();
        let normalized = array.normalized();
        assert_eq!(normalized.data(), &[0.5, 0.0, 1.0, 1.5]);
        assert_eq!(normalized.sum(), normalized.count_nonzero() as f64);
    }

    #[test]
    fn all_zero_array_is_unchanged() {
        let array = Array3::zeros([1, 2, 2]);
        assert_eq!(array.normalized(), array);
    }

    #[test]
    fn from_vec_checks_length() {
        assert!(Array3::from_vec([1, 2, 2], vec![1.0; 3]).is_none());
        assert!(Array3::from_vec([1, 2, 2], vec![1.0; 4]).is_some());
    }

    #[test]
    fn try_zeros_refuses_impossible_sizes() {
        assert_eq!(Array3::try_zeros([2, 3, 4]), Some(Array3::zeros([2, 3, 4])));
        assert!(Array3::try_zeros([usize::MAX, 2, 1]).is_none());
        assert!(Array3::try_zeros([1 << 30, 1 << 30, 1 << 10]).is_none());
        assert!(Array3::try_zeros([1 << 20, 1 << 20, 1 << 10]).is_none());
    }
}
