//! Builds the sparse network matrix `N` of a sub-basin: `N[d, u] = 1` iff
//! reach `u`'s downstream neighbor is reach `d`, for `d` and `u` both in
//! the sub-basin.

use crate::sparse::{CscMatrix, Triplet};
use crate::topology::{Basin, Domain};

/// Builds `N`, strictly lower-triangular in the sub-basin ordering, with at
/// most one non-zero per column (each reach has at most one downstream
/// neighbor).
pub fn build_network_matrix(domain: &Domain, basin: &Basin) -> CscMatrix {
    let mut triplets = Vec::with_capacity(basin.len());
    for (j, &pos_in_domain) in basin.positions_in_domain.iter().enumerate() {
        let downstream = domain.downstream_of(pos_in_domain);
        if downstream != 0 {
            if let Some(&row) = basin.index.get(&downstream) {
                triplets.push(Triplet { row, col: j, value: 1.0 });
            }
        }
    }
    CscMatrix::from_triplets(basin.len(), triplets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::build_basin;

    #[test]
    fn five_reach_network_matches_worked_example() {
        let domain = Domain::new(vec![10, 20, 30, 40, 50], vec![30, 30, 50, 50, 0]);
        let basin = build_basin(&domain, vec![10, 20, 30, 40, 50]).unwrap();
        let n = build_network_matrix(&domain, &basin);

        assert_eq!(n.get(2, 0), 1.0); // 10 -> 30
        assert_eq!(n.get(2, 1), 1.0); // 20 -> 30
        assert_eq!(n.get(4, 2), 1.0); // 30 -> 50
        assert_eq!(n.get(4, 3), 1.0); // 40 -> 50
        assert_eq!(n.nnz(), 4);
    }

    #[test]
    fn each_column_has_at_most_one_entry() {
        let domain = Domain::new(vec![10, 20, 30, 40, 50], vec![30, 30, 50, 50, 0]);
        let basin = build_basin(&domain, vec![10, 20, 30, 40, 50]).unwrap();
        let n = build_network_matrix(&domain, &basin);
        for j in 0..n.n() {
            assert!(n.column(j).count() <= 1);
        }
    }
}
