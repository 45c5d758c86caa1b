use std::fmt;

use crate::error::{Result, TensorError};

/// A dense, row-major matrix of f64 values.
///
/// The buffer always holds exactly `rows * cols` elements. A matrix with a
/// zero dimension has no backing storage and is treated as unallocated by
/// every kernel; `Matrix::default()` is that zero-value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// Create a matrix from row-major data.
    ///
    /// # Errors
    /// Returns `InvalidInput` if `data.len() != rows * cols`.
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        let expected = rows
            .checked_mul(cols)
            .ok_or_else(|| TensorError::InvalidInput(format!("{rows}x{cols} overflows usize")))?;
        if data.len() != expected {
            return Err(TensorError::InvalidInput(format!(
                "data length {} does not match {}x{} (expected {})",
                data.len(),
                rows,
                cols,
                expected
            )));
        }
        Ok(Matrix { rows, cols, data })
    }

    /// Create a zero-filled matrix. Zero-sized shapes get no storage.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        let data = if rows == 0 || cols == 0 {
            Vec::new()
        } else {
            vec![0.0; rows * cols]
        };
        Matrix { rows, cols, data }
    }

    /// Build a matrix from nested rows; all rows must have equal length.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().find(|r| r.len() != cols) {
            return Err(TensorError::InvalidInput(format!(
                "ragged rows: expected {} columns, found a row with {}",
                cols,
                bad.len()
            )));
        }
        Matrix::new(rows.len(), cols, rows.concat())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Returns true if the matrix owns a non-empty buffer.
    pub fn is_allocated(&self) -> bool {
        !self.data.is_empty()
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Returns row `i` as a slice.
    ///
    /// # Panics
    /// Panics if `i >= rows()`.
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Element at `(i, j)`.
    ///
    /// # Panics
    /// Panics if the index is out of bounds.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        assert!(i < self.rows && j < self.cols, "index ({i}, {j}) out of bounds");
        self.data[i * self.cols + j]
    }

    /// Set the element at `(i, j)`.
    ///
    /// # Panics
    /// Panics if the index is out of bounds.
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        assert!(i < self.rows && j < self.cols, "index ({i}, {j}) out of bounds");
        self.data[i * self.cols + j] = value;
    }

    /// Consume the matrix, returning its row-major buffer.
    pub fn into_data(self) -> Vec<f64> {
        self.data
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Matrix[{}x{}]", self.rows, self.cols)
    }
}

/// A dense vector of f64 values.
///
/// Follows the same convention as `Matrix`: an empty vector is unallocated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vector {
    data: Vec<f64>,
}

impl Vector {
    pub fn new(data: Vec<f64>) -> Self {
        Vector { data }
    }

    pub fn zeros(len: usize) -> Self {
        Vector {
            data: vec![0.0; len],
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_allocated(&self) -> bool {
        !self.data.is_empty()
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<f64> {
        self.data
    }
}

impl From<Vec<f64>> for Vector {
    fn from(data: Vec<f64>) -> Self {
        Vector::new(data)
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vector[{}]", self.data.len())
    }
}
