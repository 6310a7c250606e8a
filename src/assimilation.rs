//! Assimilation window matrices: an interface-level computation relating a
//! window-mean discharge to window-mean forcing and the window's initial
//! discharge.
//!
//! This is consumed by an external data-assimilation process, not by the
//! outer driver (`driver.rs`); it sits outside the routing hot path, so
//! unlike the solver it is implemented against small dense `n x n`
//! matrices rather than specialized sparse kernels.

use crate::error::RouteError;
use crate::routing_matrices::RoutingMatrices;
use crate::sparse::CscMatrix;

/// A small dense column-major `n x n` matrix, used only by the
/// assimilation-window computation.
#[derive(Debug, Clone)]
pub struct DenseMatrix {
    n: usize,
    data: Vec<f64>,
}

impl DenseMatrix {
    pub fn zeros(n: usize) -> Self {
        DenseMatrix { n, data: vec![0.0; n * n] }
    }

    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n);
        for i in 0..n {
            m.set(i, i, 1.0);
        }
        m
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[col * self.n + row]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[col * self.n + row] = value;
    }

    pub fn col(&self, j: usize) -> &[f64] {
        &self.data[j * self.n..(j + 1) * self.n]
    }

    fn add_scaled(&mut self, scale: f64, other: &DenseMatrix) {
        for (a, b) in self.data.iter_mut().zip(other.data.iter()) {
            *a += scale * b;
        }
    }

    fn scale(&mut self, scale: f64) {
        for a in self.data.iter_mut() {
            *a *= scale;
        }
    }

    /// `self * other`, a plain dense matrix product. Only ever called on
    /// `n x n` assimilation-window matrices, which are small.
    pub fn mat_mul(&self, other: &DenseMatrix) -> DenseMatrix {
        assert_eq!(self.n, other.n);
        let n = self.n;
        let mut out = DenseMatrix::zeros(n);
        for j in 0..n {
            for k in 0..n {
                let b = other.get(k, j);
                if b == 0.0 {
                    continue;
                }
                for i in 0..n {
                    out.data[j * n + i] += self.get(i, k) * b;
                }
            }
        }
        out
    }
}

/// Solves `L * X = rhs` column by column via forward substitution,
/// returning the dense result `X`.
fn solve_dense(l: &CscMatrix, rhs: &DenseMatrix) -> Result<DenseMatrix, RouteError> {
    let n = l.n();
    let mut out = DenseMatrix::zeros(n);
    let mut col_out = vec![0.0; n];
    for j in 0..n {
        l.solve_unit_lower_triangular_into(rhs.col(j), &mut col_out)?;
        for i in 0..n {
            out.set(i, j, col_out[i]);
        }
    }
    Ok(out)
}

fn sparse_to_dense(m: &CscMatrix) -> DenseMatrix {
    let n = m.n();
    let mut out = DenseMatrix::zeros(n);
    for j in 0..n {
        for (row, value) in m.column(j) {
            out.set(row, j, value);
        }
    }
    out
}

/// Multiplies a sparse matrix by a dense matrix: `sparse * dense`.
fn sparse_mul_dense(sparse: &CscMatrix, dense: &DenseMatrix) -> DenseMatrix {
    let n = sparse.n();
    let mut out = DenseMatrix::zeros(n);
    for j in 0..n {
        let col = dense.col(j);
        let product = sparse.mat_vec(col);
        for i in 0..n {
            out.set(i, j, product[i]);
        }
    }
    out
}

/// The two operators `Aem`, `A0m` such that, for a window of `window`
/// consecutive routing sub-steps starting from discharge `q0` with
/// constant external inflow `qe_bar`, the window-mean discharge is
/// `q_bar = Aem * qe_bar + A0m * q0`.
pub struct WindowMatrices {
    pub aem: DenseMatrix,
    pub a0m: DenseMatrix,
}

/// Builds the window matrices by unrolling the sub-step recursion
/// symbolically `window` times, matching the closed-form sum used by the
/// reference assimilation tooling this is interoperable with.
pub fn build_window_matrices(matrices: &RoutingMatrices, window: u32) -> Result<WindowMatrices, RouteError> {
    if window == 0 {
        return Err(RouteError::ConfigError {
            message: "assimilation window must contain at least one sub-step".to_string(),
        });
    }
    let n = matrices.l.n();
    let bet = solve_dense(&matrices.l, &sparse_to_dense(&matrices.e))?;

    let mut a0m = DenseMatrix::zeros(n);
    let mut aem = DenseMatrix::zeros(n);
    let mut tmp = DenseMatrix::identity(n);

    for j in 0..window {
        a0m.add_scaled(1.0, &tmp);
        let weight = f64::from(window) - 1.0 - f64::from(j);
        aem.add_scaled(weight, &tmp);
        let o_tmp = sparse_mul_dense(&matrices.o, &tmp);
        tmp = solve_dense(&matrices.l, &o_tmp)?;
    }

    a0m.scale(1.0 / f64::from(window));
    let mut aem = aem.mat_mul(&bet);
    aem.scale(1.0 / f64::from(window));

    Ok(WindowMatrices { aem, a0m })
}
