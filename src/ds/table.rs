use std::ops::{Index, IndexMut};

/// A dense row-major `[rows, cols]` table of `f64`, used for reward tables
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    data: Vec<f64>,
    rows: usize,
    cols: usize,
}

impl Matrix {
    /// Constructs a `Matrix` filled with zeros
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            data: vec![0.0; rows * cols],
            rows,
            cols,
        }
    }

    /// Constructs a `Matrix` from a flat row-major `Vec`
    ///
    /// **Panics** if `data.len() != rows * cols`
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Self {
        assert_eq!(data.len(), rows * cols, "Matrix data does not match shape [{}, {}].", rows, cols);
        Self { data, rows, cols }
    }

    /// Returns `[rows, cols]`
    pub fn shape(&self) -> [usize; 2] {
        [self.rows, self.cols]
    }

    pub fn row(&self, r: usize) -> &[f64] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    fn index(&self, (r, c): (usize, usize)) -> &Self::Output {
        assert!(c < self.cols, "Column {} out of bounds for {} columns.", c, self.cols);
        &self.data[r * self.cols + c]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (r, c): (usize, usize)) -> &mut Self::Output {
        assert!(c < self.cols, "Column {} out of bounds for {} columns.", c, self.cols);
        &mut self.data[r * self.cols + c]
    }
}

/// Builds a `Matrix` from nested rows
///
/// **Panics** if the rows are ragged
impl From<Vec<Vec<f64>>> for Matrix {
    fn from(rows: Vec<Vec<f64>>) -> Self {
        let n = rows.len();
        let m = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(n * m);
        for row in rows {
            assert_eq!(row.len(), m, "All rows must have the same length.");
            data.extend(row);
        }

        Self::from_vec(n, m, data)
    }
}

/// A dense row-major `[states, actions, next_states]` table of transition probabilities
///
/// Each innermost row `P[s, a, :]` is expected to be a discrete distribution over successor states.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor3 {
    data: Vec<f64>,
    shape: [usize; 3],
}

impl Tensor3 {
    /// Constructs a `Tensor3` filled with zeros
    pub fn zeros(shape: [usize; 3]) -> Self {
        Self {
            data: vec![0.0; shape.iter().product()],
            shape,
        }
    }

    /// Constructs a `Tensor3` from flat row-major data
    ///
    /// **Panics** if `data.len()` does not match the shape
    pub fn from_vec(shape: [usize; 3], data: Vec<f64>) -> Self {
        assert_eq!(
            data.len(),
            shape.iter().product::<usize>(),
            "Tensor data does not match shape {:?}.",
            shape
        );
        Self { data, shape }
    }

    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    /// The distribution `P[i, j, :]`
    pub fn row(&self, i: usize, j: usize) -> &[f64] {
        let [_, d1, d2] = self.shape;
        assert!(j < d1, "Index {} out of bounds for dimension of size {}.", j, d1);
        let start = (i * d1 + j) * d2;
        &self.data[start..start + d2]
    }

    pub fn row_mut(&mut self, i: usize, j: usize) -> &mut [f64] {
        let [_, d1, d2] = self.shape;
        assert!(j < d1, "Index {} out of bounds for dimension of size {}.", j, d1);
        let start = (i * d1 + j) * d2;
        &mut self.data[start..start + d2]
    }
}

impl Index<(usize, usize, usize)> for Tensor3 {
    type Output = f64;

    fn index(&self, (i, j, k): (usize, usize, usize)) -> &Self::Output {
        &self.row(i, j)[k]
    }
}

impl IndexMut<(usize, usize, usize)> for Tensor3 {
    fn index_mut(&mut self, (i, j, k): (usize, usize, usize)) -> &mut Self::Output {
        &mut self.row_mut(i, j)[k]
    }
}

/// Builds a `Tensor3` from nested `[i][j][k]` vectors
///
/// **Panics** if the nesting is ragged
impl From<Vec<Vec<Vec<f64>>>> for Tensor3 {
    fn from(nested: Vec<Vec<Vec<f64>>>) -> Self {
        let d0 = nested.len();
        let d1 = nested.first().map_or(0, Vec::len);
        let d2 = nested
            .first()
            .and_then(|m| m.first())
            .map_or(0, Vec::len);
        let mut data = Vec::with_capacity(d0 * d1 * d2);
        for matrix in nested {
            assert_eq!(matrix.len(), d1, "All matrices must have the same number of rows.");
            for row in matrix {
                assert_eq!(row.len(), d2, "All rows must have the same length.");
                data.extend(row);
            }
        }

        Self::from_vec([d0, d1, d2], data)
    }
}
