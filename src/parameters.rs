//! Per-reach Muskingum parameters K and X, gathered into sub-basin order.

use crate::error::RouteError;
use crate::topology::Basin;

/// K (seconds) and X (dimensionless) aligned to the sub-basin ordering.
#[derive(Debug, Clone)]
pub struct MuskingumParameters {
    pub k: Vec<f64>,
    pub x: Vec<f64>,
}

/// Gathers domain-ordered K and X arrays into sub-basin order via `basin`'s
/// `positions_in_domain` (`B`).
///
/// Fails with [`RouteError::InvalidInput`] if either array's length does not
/// match the domain size implied by `basin`'s index positions.
pub fn gather_parameters(
    basin: &Basin,
    k_dom: &[f64],
    x_dom: &[f64],
    n_dom: usize,
) -> Result<MuskingumParameters, RouteError> {
    if k_dom.len() != x_dom.len() {
        return Err(RouteError::InvalidInput {
            source: "kpr_csv/xpr_csv".to_string(),
            message: format!(
                "k has {} rows but x has {} rows",
                k_dom.len(),
                x_dom.len()
            ),
        });
    }
    if k_dom.len() != n_dom {
        return Err(RouteError::InvalidInput {
            source: "kpr_csv/xpr_csv".to_string(),
            message: format!("k/x have {} rows but the domain has {} reaches", k_dom.len(), n_dom),
        });
    }

    let mut k = Vec::with_capacity(basin.len());
    let mut x = Vec::with_capacity(basin.len());
    for &pos in &basin.positions_in_domain {
        let kv = k_dom.get(pos).copied().ok_or_else(|| RouteError::InvalidInput {
            source: "kpr_csv".to_string(),
            message: format!("k has {} rows, which does not cover domain position {}", k_dom.len(), pos),
        })?;
        let xv = x_dom.get(pos).copied().ok_or_else(|| RouteError::InvalidInput {
            source: "xpr_csv".to_string(),
            message: format!("x has {} rows, which does not cover domain position {}", x_dom.len(), pos),
        })?;
        k.push(kv);
        x.push(xv);
    }

    Ok(MuskingumParameters { k, x })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{build_basin, Domain};

    #[test]
    fn gather_reorders_by_basin_positions() {
        let domain = Domain::new(vec![10, 20, 30], vec![30, 30, 0]);
        let basin = build_basin(&domain, vec![30, 10, 20]).unwrap();
        let k_dom = vec![1.0, 2.0, 3.0];
        let x_dom = vec![0.1, 0.2, 0.3];
        let params = gather_parameters(&basin, &k_dom, &x_dom, domain.len()).unwrap();
        assert_eq!(params.k, vec![3.0, 1.0, 2.0]);
        assert_eq!(params.x, vec![0.3, 0.1, 0.2]);
    }

    #[test]
    fn gather_rejects_length_mismatch() {
        let domain = Domain::new(vec![10, 20], vec![0, 0]);
        let basin = build_basin(&domain, vec![10, 20]).unwrap();
        let err = gather_parameters(&basin, &[1.0, 2.0], &[0.1], domain.len()).unwrap_err();
        assert!(matches!(err, RouteError::InvalidInput { .. }));
    }

    #[test]
    fn gather_rejects_length_longer_than_domain() {
        let domain = Domain::new(vec![10, 20], vec![0, 0]);
        let basin = build_basin(&domain, vec![10, 20]).unwrap();
        let err = gather_parameters(&basin, &[1.0, 2.0, 3.0], &[0.1, 0.2, 0.3], domain.len()).unwrap_err();
        assert!(matches!(err, RouteError::InvalidInput { .. }));
    }
}
