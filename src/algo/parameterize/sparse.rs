//! Sparse matrix storage.
//!
//! Matrices are assembled row by row in a [`SparseBuilder`], which supports
//! both accumulating and overwriting writes, and then frozen into a
//! [`CsrMatrix`] for the solver.

use std::collections::BTreeMap;

use nalgebra::DVector;

/// Compressed Sparse Row (CSR) matrix.
///
/// Column indices are sorted within each row.
#[derive(Debug, Clone)]
pub struct CsrMatrix {
    rows: usize,
    cols: usize,
    /// `row_ptr[i]..row_ptr[i + 1]` is the range of row `i` in `col_idx`/`values`.
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
}

impl CsrMatrix {
    /// Create a CSR matrix from triplets (row, col, value).
    ///
    /// Duplicate entries at the same (row, col) are summed.
    pub fn from_triplets(rows: usize, cols: usize, triplets: &[(usize, usize, f64)]) -> Self {
        let mut builder = SparseBuilder::new(rows, cols);
        for &(i, j, v) in triplets {
            builder.add_coef(i, j, v);
        }
        builder.build()
    }

    /// Get the number of rows.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.rows
    }

    /// Get the number of columns.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.cols
    }

    /// Get the number of stored entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Column indices and values of row `i`.
    #[inline]
    pub fn row(&self, i: usize) -> (&[usize], &[f64]) {
        let range = self.row_ptr[i]..self.row_ptr[i + 1];
        (&self.col_idx[range.clone()], &self.values[range])
    }

    /// Position of entry (i, j) in the value array, if stored.
    pub(crate) fn position(&self, i: usize, j: usize) -> Option<usize> {
        let (cols, _) = self.row(i);
        cols.binary_search(&j).ok().map(|k| self.row_ptr[i] + k)
    }

    /// Get entry (i, j); zero if not stored.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.position(i, j).map_or(0.0, |k| self.values[k])
    }

    /// Diagonal entries.
    pub fn diagonal(&self) -> DVector<f64> {
        let n = self.rows.min(self.cols);
        DVector::from_iterator(n, (0..n).map(|i| self.get(i, i)))
    }

    /// Sum of the entries of row `i`.
    pub fn row_sum(&self, i: usize) -> f64 {
        self.row(i).1.iter().sum()
    }

    pub(crate) fn row_ptr(&self) -> &[usize] {
        &self.row_ptr
    }

    pub(crate) fn col_idx(&self) -> &[usize] {
        &self.col_idx
    }

    pub(crate) fn values(&self) -> &[f64] {
        &self.values
    }

    /// Same sparsity pattern with new values.
    pub(crate) fn with_values(&self, values: Vec<f64>) -> CsrMatrix {
        debug_assert_eq!(values.len(), self.values.len());
        CsrMatrix {
            rows: self.rows,
            cols: self.cols,
            row_ptr: self.row_ptr.clone(),
            col_idx: self.col_idx.clone(),
            values,
        }
    }

    /// Multiply matrix by vector: y = A * x.
    pub fn mul_vec(&self, x: &DVector<f64>) -> DVector<f64> {
        assert_eq!(x.len(), self.cols, "Vector dimension mismatch");

        DVector::from_iterator(
            self.rows,
            (0..self.rows).map(|i| {
                let (cols, vals) = self.row(i);
                cols.iter().zip(vals).map(|(&j, &v)| v * x[j]).sum::<f64>()
            }),
        )
    }
}

/// Row-wise sparse matrix assembler.
///
/// `add_coef` accumulates into an entry, `set_coef` overwrites it. Writing
/// the same value twice through `set_coef` leaves the matrix unchanged.
#[derive(Debug, Clone)]
pub struct SparseBuilder {
    cols: usize,
    rows: Vec<BTreeMap<usize, f64>>,
}

impl SparseBuilder {
    /// Create an empty `rows` x `cols` builder.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            cols,
            rows: vec![BTreeMap::new(); rows],
        }
    }

    /// Add `value` to entry (i, j).
    #[inline]
    pub fn add_coef(&mut self, i: usize, j: usize, value: f64) {
        debug_assert!(j < self.cols, "column {} out of range", j);
        *self.rows[i].entry(j).or_insert(0.0) += value;
    }

    /// Overwrite entry (i, j) with `value`.
    #[inline]
    pub fn set_coef(&mut self, i: usize, j: usize, value: f64) {
        debug_assert!(j < self.cols, "column {} out of range", j);
        self.rows[i].insert(j, value);
    }

    /// Freeze into CSR form.
    pub fn build(self) -> CsrMatrix {
        let nnz = self.rows.iter().map(BTreeMap::len).sum();
        let mut row_ptr = Vec::with_capacity(self.rows.len() + 1);
        let mut col_idx = Vec::with_capacity(nnz);
        let mut values = Vec::with_capacity(nnz);

        row_ptr.push(0);
        for row in &self.rows {
            for (&j, &v) in row {
                col_idx.push(j);
                values.push(v);
            }
            row_ptr.push(col_idx.len());
        }

        CsrMatrix {
            rows: self.rows.len(),
            cols: self.cols,
            row_ptr,
            col_idx,
            values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csr_from_triplets_with_duplicates() {
        let triplets = [
            (0, 0, 2.0),
            (0, 0, 2.0),
            (0, 1, 1.0),
            (1, 0, 1.0),
            (1, 1, 3.0),
        ];
        let a = CsrMatrix::from_triplets(2, 2, &triplets);

        assert_eq!(a.nnz(), 4);
        assert_eq!(a.get(0, 0), 4.0);
        let y = a.mul_vec(&DVector::from_vec(vec![1.0, 1.0]));
        assert!((y[0] - 5.0).abs() < 1e-10);
        assert!((y[1] - 4.0).abs() < 1e-10);
    }

    #[test]
    fn test_empty_rows() {
        let a = CsrMatrix::from_triplets(3, 3, &[(2, 0, 1.0)]);
        assert_eq!(a.row(0).0.len(), 0);
        assert_eq!(a.row(1).0.len(), 0);
        assert_eq!(a.get(2, 0), 1.0);
        assert_eq!(a.get(1, 1), 0.0);
    }

    #[test]
    fn test_builder_add_and_set() {
        let mut builder = SparseBuilder::new(2, 2);
        builder.add_coef(0, 1, 0.5);
        builder.add_coef(0, 1, 0.25);
        builder.add_coef(0, 0, -0.75);
        builder.set_coef(1, 1, 1.0);
        builder.set_coef(1, 1, 1.0);

        let a = builder.build();
        assert_eq!(a.get(0, 1), 0.75);
        assert!(a.row_sum(0).abs() < 1e-15);
        assert_eq!(a.row(1), (&[1usize][..], &[1.0][..]));
        assert_eq!(a.diagonal(), DVector::from_vec(vec![-0.75, 1.0]));
    }

    #[test]
    fn test_set_overwrites_accumulated_value() {
        let mut builder = SparseBuilder::new(1, 1);
        builder.add_coef(0, 0, 3.0);
        builder.set_coef(0, 0, 1.0);
        assert_eq!(builder.build().get(0, 0), 1.0);
    }
}
