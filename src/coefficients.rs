//! Muskingum C1, C2, C3 coefficient diagonals.

use crate::error::RouteError;
use crate::parameters::MuskingumParameters;
use crate::sparse::CscMatrix;

/// Tolerance for the `c1 + c2 + c3 == 1` roundoff check (invariant I1).
const COEFFICIENT_SUM_EPSILON: f64 = 1e-12;

/// The three Muskingum coefficient diagonals, each an `n x n` diagonal
/// matrix (stored via [`CscMatrix`] but only ever populated on the
/// diagonal).
pub struct MuskingumCoefficients {
    pub c1: CscMatrix,
    pub c2: CscMatrix,
    pub c3: CscMatrix,
    /// The raw diagonal values, kept around because [`crate::routing_matrices`]
    /// needs them for row-scaling rather than a full sparse product.
    pub c1_diag: Vec<f64>,
    pub c2_diag: Vec<f64>,
    pub c3_diag: Vec<f64>,
}

/// Builds C1, C2, C3 from per-reach K, X and the routing sub-step `dt`.
///
/// Fails with [`RouteError::ConfigError`] if any reach's denominator
/// `dt/2 + K(1-X)` is not strictly positive.
pub fn build_coefficients(params: &MuskingumParameters, dt: i32) -> Result<MuskingumCoefficients, RouteError> {
    let n = params.k.len();
    let dt = f64::from(dt);
    let mut c1_diag = Vec::with_capacity(n);
    let mut c2_diag = Vec::with_capacity(n);
    let mut c3_diag = Vec::with_capacity(n);

    for i in 0..n {
        let k = params.k[i];
        let x = params.x[i];
        let denom = dt / 2.0 + k * (1.0 - x);
        if denom <= 0.0 {
            return Err(RouteError::ConfigError {
                message: format!(
                    "reach at sub-basin position {} has a non-positive Muskingum denominator (dt/2 + K(1-X) = {})",
                    i, denom
                ),
            });
        }

        let c1 = (dt / 2.0 - k * x) / denom;
        let c2 = (dt / 2.0 + k * x) / denom;
        let c3 = (-dt / 2.0 + k * (1.0 - x)) / denom;

        debug_assert!(
            (c1 + c2 + c3 - 1.0).abs() <= COEFFICIENT_SUM_EPSILON,
            "c1+c2+c3 should equal 1 within roundoff"
        );

        c1_diag.push(c1);
        c2_diag.push(c2);
        c3_diag.push(c3);
    }

    Ok(MuskingumCoefficients {
        c1: CscMatrix::diag(&c1_diag),
        c2: CscMatrix::diag(&c2_diag),
        c3: CscMatrix::diag(&c3_diag),
        c1_diag,
        c2_diag,
        c3_diag,
    })
}
