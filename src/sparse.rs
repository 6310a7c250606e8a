//! A small compressed-sparse-column matrix, hand-rolled for this crate.
//!
//! The network and routing matrices are all O(n) non-zero, square, and
//! either diagonal or strictly/unit lower-triangular. A general-purpose
//! sparse linear algebra crate would bring a lot of machinery (factorization,
//! iterative solvers, parallel kernels) that none of these matrices need:
//! the only numerical kernel the routing loop performs is a forward
//! substitution against a unit-lower-triangular matrix with at most two
//! non-zeros per column, so a minimal CSC type that supports that one
//! access pattern (iterate column j, touch its rows) is enough.

use crate::error::RouteError;

/// A square matrix in compressed sparse column form.
///
/// Column `j`'s non-zero entries are `rows[col_ptr[j]..col_ptr[j+1]]` /
/// `values[col_ptr[j]..col_ptr[j+1]]`. Within a column, entries are not
/// required to be row-sorted except where a specific algorithm (forward
/// substitution) depends on it.
#[derive(Debug, Clone, PartialEq)]
pub struct CscMatrix {
    n: usize,
    col_ptr: Vec<usize>,
    rows: Vec<usize>,
    values: Vec<f64>,
}

/// A single (row, col, value) entry used to assemble a `CscMatrix`.
#[derive(Debug, Clone, Copy)]
pub struct Triplet {
    pub row: usize,
    pub col: usize,
    pub value: f64,
}

impl CscMatrix {
    /// Builds a CSC matrix of shape `(n, n)` from an unordered list of
    /// triplets. Triplets naming the same `(row, col)` are summed, matching
    /// the usual `scipy.sparse` triplet-construction semantics.
    pub fn from_triplets(n: usize, mut triplets: Vec<Triplet>) -> Self {
        triplets.sort_by_key(|t| (t.col, t.row));

        let mut col_ptr = vec![0usize; n + 1];
        let mut rows = Vec::with_capacity(triplets.len());
        let mut values = Vec::with_capacity(triplets.len());

        let mut i = 0;
        for col in 0..n {
            while i < triplets.len() && triplets[i].col == col {
                let row = triplets[i].row;
                let mut value = triplets[i].value;
                i += 1;
                while i < triplets.len() && triplets[i].col == col && triplets[i].row == row {
                    value += triplets[i].value;
                    i += 1;
                }
                rows.push(row);
                values.push(value);
            }
            col_ptr[col + 1] = rows.len();
        }

        CscMatrix { n, col_ptr, rows, values }
    }

    /// An `n x n` identity matrix.
    pub fn identity(n: usize) -> Self {
        Self::diag(&vec![1.0; n])
    }

    /// An `n x n` diagonal matrix with the given diagonal entries.
    pub fn diag(diagonal: &[f64]) -> Self {
        let n = diagonal.len();
        let triplets = diagonal
            .iter()
            .enumerate()
            .filter(|(_, v)| **v != 0.0)
            .map(|(i, v)| Triplet { row: i, col: i, value: *v })
            .collect();
        Self::from_triplets(n, triplets)
    }

    pub fn n(&self) -> usize {
        self.n
    }

    /// Non-zero entries of column `j` as `(row, value)` pairs.
    pub fn column(&self, j: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let start = self.col_ptr[j];
        let end = self.col_ptr[j + 1];
        self.rows[start..end]
            .iter()
            .copied()
            .zip(self.values[start..end].iter().copied())
    }

    /// Number of stored (structurally non-zero) entries.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Returns the stored value at `(row, col)`, or `0.0` if not stored.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.column(col)
            .find(|(r, _)| *r == row)
            .map(|(_, v)| v)
            .unwrap_or(0.0)
    }

    /// `self + other`, element-wise, via triplet concatenation.
    pub fn add(&self, other: &CscMatrix) -> CscMatrix {
        assert_eq!(self.n, other.n, "matrix size mismatch in add()");
        let mut triplets = Vec::with_capacity(self.nnz() + other.nnz());
        for j in 0..self.n {
            for (row, value) in self.column(j) {
                triplets.push(Triplet { row, col: j, value });
            }
            for (row, value) in other.column(j) {
                triplets.push(Triplet { row, col: j, value });
            }
        }
        CscMatrix::from_triplets(self.n, triplets)
    }

    /// `diag(d) * self`, i.e. row `i` of `self` scaled by `d[i]`.
    ///
    /// This is the only matrix product the routing matrices ever need
    /// (`C1*N`, `C2*N`) because `C1`/`C2` are diagonal; a full sparse
    /// matrix-matrix product is unnecessary.
    pub fn scale_rows(&self, d: &[f64]) -> CscMatrix {
        assert_eq!(d.len(), self.n, "diagonal length mismatch in scale_rows()");
        let mut triplets = Vec::with_capacity(self.nnz());
        for j in 0..self.n {
            for (row, value) in self.column(j) {
                triplets.push(Triplet { row, col: j, value: value * d[row] });
            }
        }
        CscMatrix::from_triplets(self.n, triplets)
    }

    /// Dense matrix-vector product `self * x`.
    pub fn mat_vec(&self, x: &[f64]) -> Vec<f64> {
        assert_eq!(x.len(), self.n, "vector length mismatch in mat_vec()");
        let mut out = vec![0.0; self.n];
        for j in 0..self.n {
            let xj = x[j];
            if xj == 0.0 {
                continue;
            }
            for (row, value) in self.column(j) {
                out[row] += value * xj;
            }
        }
        out
    }

    /// Matrix-vector product `self * x`, accumulated into a caller-owned
    /// buffer so no allocation occurs. `out` is not cleared first; callers
    /// that want `self * x` alone must zero `out` beforehand.
    pub fn mat_vec_into(&self, x: &[f64], out: &mut [f64]) {
        assert_eq!(x.len(), self.n, "vector length mismatch in mat_vec_into()");
        assert_eq!(out.len(), self.n, "output length mismatch in mat_vec_into()");
        for j in 0..self.n {
            let xj = x[j];
            if xj == 0.0 {
                continue;
            }
            for (row, value) in self.column(j) {
                out[row] += value * xj;
            }
        }
    }

    /// Solves `self * x = rhs` by forward substitution, assuming `self` is
    /// unit-lower-triangular (diagonal entries, if stored at all, are
    /// ignored and treated as exactly 1). Writes into a caller-owned
    /// buffer so the sub-step solver never allocates.
    ///
    /// Because each column of a strictly-lower-triangular contributor has
    /// at most two stored rows (the diagonal plus at most one sub-diagonal
    /// entry coming from the network topology), this is implemented as a
    /// single left-to-right column sweep: column `j` is resolved as soon
    /// as its below-diagonal contributions from columns `< j` have all
    /// been applied.
    pub fn solve_unit_lower_triangular_into(
        &self,
        rhs: &[f64],
        out: &mut [f64],
    ) -> Result<(), RouteError> {
        assert_eq!(rhs.len(), self.n, "rhs length mismatch in solve");
        assert_eq!(out.len(), self.n, "out length mismatch in solve");

        out.copy_from_slice(rhs);

        for j in 0..self.n {
            let xj = out[j];
            if !xj.is_finite() {
                return Err(RouteError::SolverError {
                    message: format!("non-finite value produced at row {} during forward substitution", j),
                });
            }
            for (row, value) in self.column(j) {
                if row == j {
                    // Unit diagonal: contributes nothing extra.
                    continue;
                }
                if row < j {
                    return Err(RouteError::SolverError {
                        message: format!(
                            "back-edge detected: column {} has a non-zero above the diagonal at row {}",
                            j, row
                        ),
                    });
                }
                out[row] -= value * xj;
            }
        }
        Ok(())
    }
}
