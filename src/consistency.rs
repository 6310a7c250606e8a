//! Checks that the sub-basin is internally consistent with the domain
//! topology: missing upstream/downstream neighbors (warnings) and
//! upstream-before-downstream sort order (fatal).

use crate::error::{report_warning, RouteError};
use crate::topology::{Basin, Domain};

/// Runs all three checks from the spec against `domain`/`basin`.
///
/// The missing-upstream and missing-downstream checks are non-fatal: they
/// print a `"WARNING - "` line per offending pair and continue. The sort
/// check is fatal: the first violation found is returned as a
/// [`RouteError::TopologyError`].
pub fn check_topology(domain: &Domain, basin: &Basin) -> Result<(), RouteError> {
    check_missing_upstream(domain, basin);
    check_missing_downstream(domain, basin);
    check_sort_order(domain, basin)
}

/// For every domain reach whose downstream is in the basin but the reach
/// itself is not, warn.
fn check_missing_upstream(domain: &Domain, basin: &Basin) {
    for (pos, &reach) in domain.reach_ids.iter().enumerate() {
        let downstream = domain.downstream_of(pos);
        if downstream != 0 && basin.index.contains_key(&downstream) && !basin.index.contains_key(&reach) {
            report_warning(&format!(
                "connectivity: {} is upstream of {} but is not in basin file",
                reach, downstream
            ));
        }
    }
}

/// For every basin reach whose downstream is not in the basin (and is not
/// the outlet), warn.
fn check_missing_downstream(domain: &Domain, basin: &Basin) {
    for &reach in &basin.reach_ids {
        let pos = domain.index[&reach];
        let downstream = domain.downstream_of(pos);
        if downstream != 0 && !basin.index.contains_key(&downstream) {
            report_warning(&format!(
                "connectivity: {} is downstream of {} but is not in basin file",
                downstream, reach
            ));
        }
    }
}

/// For every basin reach whose downstream is also in the basin, require
/// that the downstream reach sits at a strictly later position.
fn check_sort_order(domain: &Domain, basin: &Basin) -> Result<(), RouteError> {
    for &reach in &basin.reach_ids {
        let pos = domain.index[&reach];
        let downstream = domain.downstream_of(pos);
        if downstream == 0 {
            continue;
        }
        if let Some(&downstream_j) = basin.index.get(&downstream) {
            let reach_j = basin.index[&reach];
            if downstream_j < reach_j {
                return Err(RouteError::TopologyError { downstream, upstream: reach });
            }
        }
    }
    Ok(())
}

/// Verifies that forcing reach identifiers equal the domain's, in the same
/// order. Fails with [`RouteError::InvalidInput`] on any mismatch or
/// reordering.
pub fn check_forcing_reach_ids(domain: &Domain, forcing_reach_ids: &[u32]) -> Result<(), RouteError> {
    if forcing_reach_ids.len() != domain.len() {
        return Err(RouteError::InvalidInput {
            source: "Qex_ncf".to_string(),
            message: "the arrays have different sizes".to_string(),
        });
    }
    if forcing_reach_ids != domain.reach_ids.as_slice() {
        return Err(RouteError::InvalidInput {
            source: "Qex_ncf".to_string(),
            message: "the river IDs in con_csv and the forcing dataset differ".to_string(),
        });
    }
    Ok(())
}
