//! Domain and sub-basin topology: reach identifiers, downstream pointers,
//! and the index maps used to translate between domain order and
//! sub-basin order.

use std::collections::HashMap;

use crate::error::RouteError;

/// The full river domain as read from the connectivity source: reach
/// identifiers in file order, paired element-wise with their downstream
/// identifier (`0` meaning outlet).
#[derive(Debug, Clone)]
pub struct Domain {
    pub reach_ids: Vec<u32>,
    pub downstream_ids: Vec<u32>,
    /// Reach identifier -> position in `reach_ids`.
    pub index: HashMap<u32, usize>,
}

impl Domain {
    pub fn new(reach_ids: Vec<u32>, downstream_ids: Vec<u32>) -> Self {
        let mut index = HashMap::with_capacity(reach_ids.len());
        for (i, &id) in reach_ids.iter().enumerate() {
            index.insert(id, i);
        }
        Domain { reach_ids, downstream_ids, index }
    }

    pub fn len(&self) -> usize {
        self.reach_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reach_ids.is_empty()
    }

    pub fn downstream_of(&self, position: usize) -> u32 {
        self.downstream_ids[position]
    }
}

/// The selected, simulation-ordered sub-basin, plus the index maps
/// connecting it back to the domain.
#[derive(Debug, Clone)]
pub struct Basin {
    pub reach_ids: Vec<u32>,
    /// Reach identifier -> position in `reach_ids` (this is `H_bas`).
    pub index: HashMap<u32, usize>,
    /// `positions_in_domain[j]` is the position in the domain of the j-th
    /// sub-basin reach (this is `B`).
    pub positions_in_domain: Vec<usize>,
}

impl Basin {
    pub fn len(&self) -> usize {
        self.reach_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reach_ids.is_empty()
    }
}

/// Builds the sub-basin index maps from a domain and a selected,
/// caller-ordered list of sub-basin reach identifiers.
///
/// Fails with [`RouteError::InvalidInput`] naming the offending reach
/// identifier if any sub-basin reach is not present in the domain.
pub fn build_basin(domain: &Domain, basin_reach_ids: Vec<u32>) -> Result<Basin, RouteError> {
    let mut index = HashMap::with_capacity(basin_reach_ids.len());
    for (j, &id) in basin_reach_ids.iter().enumerate() {
        index.insert(id, j);
    }

    let mut positions_in_domain = Vec::with_capacity(basin_reach_ids.len());
    for &id in &basin_reach_ids {
        match domain.index.get(&id) {
            Some(&pos) => positions_in_domain.push(pos),
            None => {
                return Err(RouteError::InvalidInput {
                    source: "bas_csv".to_string(),
                    message: format!("reach {} is in the sub-basin file but not in con_csv", id),
                });
            }
        }
    }

    Ok(Basin { reach_ids: basin_reach_ids, index, positions_in_domain })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn five_reach_domain() -> Domain {
        Domain::new(vec![10, 20, 30, 40, 50], vec![30, 30, 50, 50, 0])
    }

    #[test]
    fn domain_index_maps_ids_to_position() {
        let d = five_reach_domain();
        assert_eq!(d.index[&30], 2);
        assert_eq!(d.downstream_of(0), 30);
    }

    #[test]
    fn build_basin_produces_b_array() {
        let d = five_reach_domain();
        let b = build_basin(&d, vec![10, 20, 30, 40, 50]).unwrap();
        assert_eq!(b.positions_in_domain, vec![0, 1, 2, 3, 4]);
        assert_eq!(b.index[&50], 4);
    }

    #[test]
    fn build_basin_rejects_unknown_reach() {
        let d = five_reach_domain();
        let err = build_basin(&d, vec![10, 99]).unwrap_err();
        assert!(matches!(err, RouteError::InvalidInput { .. }));
    }
}
