//! CSV readers for the domain connectivity table, the Muskingum parameter
//! tables, and the sub-basin reach list.

use std::path::Path;

use crate::error::RouteError;
use crate::topology::Domain;

/// Reads the connectivity table: two columns, `reach_id` and
/// `downstream_id` (`0` for an outlet), no header row, in domain order.
///
/// This mirrors the reference network-matrix builder's own connectivity
/// table reader: one row per reach, file order fixes domain order.
pub fn read_connectivity(path: &Path) -> Result<Domain, RouteError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| RouteError::InvalidInput {
            source: path.display().to_string(),
            message: format!("unable to open connectivity file: {}", e),
        })?;

    let mut reach_ids = Vec::new();
    let mut downstream_ids = Vec::new();

    for (line, result) in reader.records().enumerate() {
        let record = result.map_err(|e| RouteError::InvalidInput {
            source: path.display().to_string(),
            message: format!("error reading line {}: {}", line + 1, e),
        })?;
        let reach_id = parse_field(path, line, &record, 0)?;
        let downstream_id = parse_field(path, line, &record, 1)?;
        reach_ids.push(reach_id);
        downstream_ids.push(downstream_id);
    }

    if reach_ids.is_empty() {
        return Err(RouteError::InvalidInput {
            source: path.display().to_string(),
            message: "connectivity file contains no reaches".to_string(),
        });
    }

    Ok(Domain::new(reach_ids, downstream_ids))
}

/// Reads a one-column-per-reach parameter table (`k.csv` or `x.csv`), in
/// the same file order as `read_connectivity`'s domain, returning the
/// values in file order (the caller gathers them into sub-basin order via
/// `parameters::gather_parameters`).
pub fn read_parameter_column(path: &Path) -> Result<Vec<f64>, RouteError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| RouteError::InvalidInput {
            source: path.display().to_string(),
            message: format!("unable to open parameter file: {}", e),
        })?;

    let mut values = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = result.map_err(|e| RouteError::InvalidInput {
            source: path.display().to_string(),
            message: format!("error reading line {}: {}", line + 1, e),
        })?;
        let field = record.get(0).ok_or_else(|| RouteError::InvalidInput {
            source: path.display().to_string(),
            message: format!("line {} is empty", line + 1),
        })?;
        let value: f64 = field.trim().parse().map_err(|_| RouteError::InvalidInput {
            source: path.display().to_string(),
            message: format!("line {} is not a number: '{}'", line + 1, field),
        })?;
        values.push(value);
    }
    Ok(values)
}

/// Reads the sub-basin reach list: one reach identifier per line, in the
/// simulation order the solver will use.
pub fn read_basin_reach_ids(path: &Path) -> Result<Vec<u32>, RouteError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| RouteError::InvalidInput {
            source: path.display().to_string(),
            message: format!("unable to open basin file: {}", e),
        })?;

    let mut ids = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = result.map_err(|e| RouteError::InvalidInput {
            source: path.display().to_string(),
            message: format!("error reading line {}: {}", line + 1, e),
        })?;
        let id = parse_field(path, line, &record, 0)?;
        ids.push(id);
    }
    Ok(ids)
}

fn parse_field(path: &Path, line: usize, record: &csv::StringRecord, col: usize) -> Result<u32, RouteError> {
    let field = record.get(col).ok_or_else(|| RouteError::InvalidInput {
        source: path.display().to_string(),
        message: format!("line {} is missing column {}", line + 1, col + 1),
    })?;
    field.trim().parse().map_err(|_| RouteError::InvalidInput {
        source: path.display().to_string(),
        message: format!("line {} column {} is not a reach identifier: '{}'", line + 1, col + 1, field),
    })
}
