//! Assembles the routing matrices L, E, O from the network matrix and the
//! Muskingum coefficient diagonals.

use crate::coefficients::MuskingumCoefficients;
use crate::sparse::CscMatrix;

/// `L = I - C1*N`, `E = C1 + C2`, `O = C3 + C2*N`.
///
/// `L` is unit-lower-triangular: `N` is strictly lower-triangular and `C1`
/// is diagonal, so `C1*N` is also strictly lower-triangular and `I - C1*N`
/// keeps a diagonal of exactly `1`.
pub struct RoutingMatrices {
    pub l: CscMatrix,
    pub e: CscMatrix,
    pub o: CscMatrix,
}

pub fn build_routing_matrices(network: &CscMatrix, coeffs: &MuskingumCoefficients) -> RoutingMatrices {
    let n = network.n();
    let identity = CscMatrix::identity(n);

    let c1_n = network.scale_rows(&coeffs.c1_diag);
    let c2_n = network.scale_rows(&coeffs.c2_diag);

    // I - C1*N: negate C1*N's values then add to the identity.
    let neg_c1_n = negate(&c1_n);
    let l = identity.add(&neg_c1_n);

    let e = coeffs.c1.add(&coeffs.c2);
    let o = coeffs.c3.add(&c2_n);

    RoutingMatrices { l, e, o }
}

fn negate(m: &CscMatrix) -> CscMatrix {
    let n = m.n();
    let mut triplets = Vec::with_capacity(m.nnz());
    for j in 0..n {
        for (row, value) in m.column(j) {
            triplets.push(crate::sparse::Triplet { row, col: j, value: -value });
        }
    }
    CscMatrix::from_triplets(n, triplets)
}
