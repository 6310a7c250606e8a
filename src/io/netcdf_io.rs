//! netCDF adapters: reads the forcing and initial-state datasets, writes
//! the per-interval mean discharge and the final-state snapshot.
//!
//! Variable and dimension names follow the reference RAPID-family netCDF
//! conventions (`rivid`, `lon`, `lat`, `time`, `time_bnds`, `nv`, `Qout`),
//! since the forcing and output files produced by this crate are meant to
//! interoperate with the wider RAPID-family tooling ecosystem. File handles
//! close on drop (the crate's own `Drop` impl), which is the scoped
//! acquisition the spec calls for: every exit path, including early
//! returns on error, closes the handle for free.

use std::path::Path;

use crate::config::ForcingVariableName;
use crate::error::RouteError;

fn io_err(path: &Path, message: impl Into<String>) -> RouteError {
    RouteError::IOError { path: path.display().to_string(), message: message.into() }
}

fn invalid_input(path: &Path, message: impl Into<String>) -> RouteError {
    RouteError::InvalidInput { source: path.display().to_string(), message: message.into() }
}

/// The `rivid` dimension of a netCDF file, in file order.
pub fn read_rivid(path: &Path) -> Result<Vec<u32>, RouteError> {
    let file = netcdf::open(path).map_err(|e| invalid_input(path, format!("unable to open: {}", e)))?;
    let var = file
        .variable("rivid")
        .ok_or_else(|| invalid_input(path, "missing 'rivid' variable"))?;
    let raw = var
        .values::<i64>(None, None)
        .map_err(|e| invalid_input(path, format!("unable to read 'rivid': {}", e)))?;
    Ok(raw.iter().map(|&v| v as u32).collect())
}

/// Reads the `lon`/`lat` coordinate variables, in the same order as
/// `rivid`. Fails with [`RouteError::InvalidInput`] if either is missing.
fn read_lon_lat(file: &netcdf::File, path: &Path) -> Result<(Vec<f64>, Vec<f64>), RouteError> {
    let lon_var = file.variable("lon").ok_or_else(|| invalid_input(path, "missing 'lon' variable"))?;
    let lon = lon_var
        .values::<f64>(None, None)
        .map_err(|e| invalid_input(path, format!("unable to read 'lon': {}", e)))?
        .iter()
        .copied()
        .collect();

    let lat_var = file.variable("lat").ok_or_else(|| invalid_input(path, "missing 'lat' variable"))?;
    let lat = lat_var
        .values::<f64>(None, None)
        .map_err(|e| invalid_input(path, format!("unable to read 'lat': {}", e)))?
        .iter()
        .copied()
        .collect();

    Ok((lon, lat))
}

/// Reads the initial discharge state `Q00_ncf`: a single `Qout`-named
/// variable over the `rivid` dimension, no time dimension.
pub fn read_initial_state(path: &Path, domain_reach_ids: &[u32]) -> Result<Vec<f64>, RouteError> {
    let file = netcdf::open(path).map_err(|e| invalid_input(path, format!("unable to open: {}", e)))?;
    let rivid = read_rivid(path)?;
    if rivid != domain_reach_ids {
        return Err(invalid_input(
            path,
            "rivid order in the initial state file does not match the connectivity file",
        ));
    }
    let var = file
        .variable("Qout")
        .ok_or_else(|| invalid_input(path, "missing 'Qout' variable"))?;
    let raw = var
        .values::<f64>(None, None)
        .map_err(|e| invalid_input(path, format!("unable to read 'Qout': {}", e)))?;
    Ok(raw.iter().copied().collect())
}

/// A forcing dataset, opened once and read one interval at a time so a
/// whole-run forcing dataset is never loaded into memory at once.
pub struct ForcingReader {
    file: netcdf::File,
    var_name: String,
    rivid: Vec<u32>,
    lon: Vec<f64>,
    lat: Vec<f64>,
    time_values: Vec<i64>,
}

impl ForcingReader {
    /// Opens `path` and validates every dimension/variable the spec's
    /// forcing dataset contract requires: `rivid`-sized and `time`-sized
    /// dimensions, a length-2 bounds dimension (`nv`), and the `rivid`,
    /// `lon`, `lat`, `time`, `time_bnds` variables plus the resolved main
    /// variable. Fails with [`RouteError::InvalidInput`] naming whichever
    /// is missing.
    pub fn open(path: &Path, var_name_cfg: &ForcingVariableName) -> Result<Self, RouteError> {
        let file = netcdf::open(path).map_err(|e| invalid_input(path, format!("unable to open: {}", e)))?;
        let rivid = read_rivid(path)?;
        let (lon, lat) = read_lon_lat(&file, path)?;

        let nv = file
            .dimension("nv")
            .ok_or_else(|| invalid_input(path, "missing bounds dimension 'nv'"))?
            .len();
        if nv != 2 {
            return Err(invalid_input(path, format!("bounds dimension 'nv' has length {}, expected 2", nv)));
        }

        let time_var = file.variable("time").ok_or_else(|| invalid_input(path, "missing 'time' variable"))?;
        let time_values: Vec<i64> = time_var
            .values::<i64>(None, None)
            .map_err(|e| invalid_input(path, format!("unable to read 'time': {}", e)))?
            .iter()
            .copied()
            .collect();

        if file.variable("time_bnds").is_none() {
            return Err(invalid_input(path, "missing 'time_bnds' variable"));
        }

        let var_name = match var_name_cfg {
            ForcingVariableName::Pinned(name) => {
                if file.variable(name).is_none() {
                    return Err(invalid_input(path, format!("variable '{}' does not exist", name)));
                }
                name.clone()
            }
            ForcingVariableName::AutoDetect => {
                ["Qext", "Qout", "m3_riv"]
                    .iter()
                    .find(|name| file.variable(name).is_some())
                    .map(|name| name.to_string())
                    .ok_or_else(|| {
                        invalid_input(path, "none of 'Qext', 'Qout', 'm3_riv' are present")
                    })?
            }
        };

        let n_time = file
            .dimension("time")
            .ok_or_else(|| invalid_input(path, "missing 'time' dimension"))?
            .len();
        if n_time != time_values.len() {
            return Err(invalid_input(path, "'time' dimension length does not match the 'time' variable"));
        }

        Ok(ForcingReader { file, var_name, rivid, lon, lat, time_values })
    }

    pub fn rivid(&self) -> &[u32] {
        &self.rivid
    }

    pub fn lon(&self) -> &[f64] {
        &self.lon
    }

    pub fn lat(&self) -> &[f64] {
        &self.lat
    }

    pub fn n_intervals(&self) -> usize {
        self.time_values.len()
    }

    pub fn is_volume(&self) -> bool {
        self.var_name == "m3_riv"
    }

    /// Reads the main variable's row for forcing interval `t`, in file
    /// `rivid` order.
    pub fn read_interval(&self, t: usize) -> Result<Vec<f64>, RouteError> {
        let var = self
            .file
            .variable(&self.var_name)
            .ok_or_else(|| invalid_input(Path::new(&self.var_name), "forcing variable vanished"))?;
        let n = self.rivid.len();
        let raw = var
            .values::<f64>(Some(&[t, 0]), Some(&[1, n]))
            .map_err(|e| invalid_input(Path::new(&self.var_name), format!("unable to read interval {}: {}", t, e)))?;
        Ok(raw.iter().copied().collect())
    }

    /// Interval `t`'s epoch-seconds `time` coordinate value.
    pub fn time_value(&self, t: usize) -> i64 {
        self.time_values[t]
    }

    /// Reads interval `t`'s `[start, end]` epoch-second bounds from
    /// `time_bnds`.
    pub fn time_bnds(&self, t: usize) -> Result<(i64, i64), RouteError> {
        let var = self
            .file
            .variable("time_bnds")
            .ok_or_else(|| invalid_input(Path::new("time_bnds"), "missing 'time_bnds' variable"))?;
        let raw = var
            .values::<i64>(Some(&[t, 0]), Some(&[1, 2]))
            .map_err(|e| invalid_input(Path::new("time_bnds"), format!("unable to read interval {}: {}", t, e)))?;
        let mut it = raw.iter();
        let start = *it.next().ok_or_else(|| invalid_input(Path::new("time_bnds"), "missing start bound"))?;
        let end = *it.next().ok_or_else(|| invalid_input(Path::new("time_bnds"), "missing end bound"))?;
        Ok((start, end))
    }

    /// The forcing interval's elapsed real time in seconds, taken from the
    /// first interval's `time_bnds` (every interval is assumed to have the
    /// same length).
    pub fn interval_seconds(&self) -> Result<i64, RouteError> {
        let (start, end) = self.time_bnds(0)?;
        Ok(end - start)
    }
}

/// Writes the CF-conventions coordinate variables (`rivid`, `lon`, `lat`)
/// and the global attributes common to every dataset this crate writes.
fn write_coordinates(file: &mut netcdf::MutableFile, path: &Path, reach_ids: &[u32], lon: &[f64], lat: &[f64]) -> Result<(), RouteError> {
    let mut rivid_var = file
        .add_variable::<i64>("rivid", &["rivid"])
        .map_err(|e| io_err(path, format!("unable to add 'rivid' variable: {}", e)))?;
    let rivid_i64: Vec<i64> = reach_ids.iter().map(|&v| v as i64).collect();
    rivid_var
        .put_values(&rivid_i64, None)
        .map_err(|e| io_err(path, format!("unable to write 'rivid': {}", e)))?;

    let mut lon_var = file
        .add_variable::<f64>("lon", &["rivid"])
        .map_err(|e| io_err(path, format!("unable to add 'lon' variable: {}", e)))?;
    lon_var.put_values(lon, None).map_err(|e| io_err(path, format!("unable to write 'lon': {}", e)))?;

    let mut lat_var = file
        .add_variable::<f64>("lat", &["rivid"])
        .map_err(|e| io_err(path, format!("unable to add 'lat' variable: {}", e)))?;
    lat_var.put_values(lat, None).map_err(|e| io_err(path, format!("unable to write 'lat': {}", e)))?;

    file.add_attribute("Conventions", "CF-1.6")
        .map_err(|e| io_err(path, format!("unable to set 'Conventions' attribute: {}", e)))?;
    file.add_attribute("source", "river-route")
        .map_err(|e| io_err(path, format!("unable to set 'source' attribute: {}", e)))?;
    file.add_attribute("featureType", "timeSeries")
        .map_err(|e| io_err(path, format!("unable to set 'featureType' attribute: {}", e)))?;

    Ok(())
}

/// A writer for the mean-discharge output dataset `Qou_ncf`: scoped to the
/// sub-basin (`n = |R_bas|`), with the same time axis as the forcing.
/// Creates the `rivid`/`lon`/`lat`/`time`/`time_bnds` dimensions and
/// variables up front, then appends one interval's mean discharge at a
/// time.
pub struct MeanDischargeWriter {
    file: netcdf::MutableFile,
}

impl MeanDischargeWriter {
    pub fn create(path: &Path, basin_reach_ids: &[u32], basin_lon: &[f64], basin_lat: &[f64]) -> Result<Self, RouteError> {
        let mut file = netcdf::create(path).map_err(|e| io_err(path, format!("unable to create: {}", e)))?;

        file.add_dimension("rivid", basin_reach_ids.len())
            .map_err(|e| io_err(path, format!("unable to add 'rivid' dimension: {}", e)))?;
        file.add_unlimited_dimension("time")
            .map_err(|e| io_err(path, format!("unable to add 'time' dimension: {}", e)))?;
        file.add_dimension("nv", 2)
            .map_err(|e| io_err(path, format!("unable to add 'nv' dimension: {}", e)))?;

        write_coordinates(&mut file, path, basin_reach_ids, basin_lon, basin_lat)?;

        file.add_variable::<i64>("time", &["time"])
            .map_err(|e| io_err(path, format!("unable to add 'time' variable: {}", e)))?
            .put_attribute("bounds", "time_bnds")
            .map_err(|e| io_err(path, format!("unable to set 'bounds' attribute: {}", e)))?;

        file.add_variable::<f32>("Qout", &["time", "rivid"])
            .map_err(|e| io_err(path, format!("unable to add 'Qout' variable: {}", e)))?
            .put_attribute("units", "m3 s-1")
            .map_err(|e| io_err(path, format!("unable to set units attribute: {}", e)))?;

        file.add_variable::<i64>("time_bnds", &["time", "nv"])
            .map_err(|e| io_err(path, format!("unable to add 'time_bnds' variable: {}", e)))?;

        Ok(MeanDischargeWriter { file })
    }

    /// Appends one interval's mean discharge (in sub-basin `rivid` order),
    /// its `time` coordinate value, and its `[start, end]` epoch-seconds
    /// time bounds.
    pub fn write_interval(
        &mut self,
        t: usize,
        mean_q: &[f64],
        time_value: i64,
        start_seconds: i64,
        end_seconds: i64,
    ) -> Result<(), RouteError> {
        let mean_q_f32: Vec<f32> = mean_q.iter().map(|&v| v as f32).collect();

        let mut var = self
            .file
            .variable_mut("Qout")
            .ok_or_else(|| io_err(Path::new("Qout"), "variable vanished"))?;
        var.put_values(&mean_q_f32, Some(&[t, 0]))
            .map_err(|e| io_err(Path::new("Qout"), format!("unable to write interval {}: {}", t, e)))?;

        let mut time_var = self
            .file
            .variable_mut("time")
            .ok_or_else(|| io_err(Path::new("time"), "variable vanished"))?;
        time_var
            .put_values(&[time_value], Some(&[t]))
            .map_err(|e| io_err(Path::new("time"), format!("unable to write interval {}: {}", t, e)))?;

        let mut bnds = self
            .file
            .variable_mut("time_bnds")
            .ok_or_else(|| io_err(Path::new("time_bnds"), "variable vanished"))?;
        bnds.put_values(&[start_seconds, end_seconds], Some(&[t, 0]))
            .map_err(|e| io_err(Path::new("time_bnds"), format!("unable to write interval {}: {}", t, e)))?;
        Ok(())
    }
}

/// Writes the final-state snapshot `Qfi_ncf`: scoped to the full domain
/// (`n_dom`), a single time step at `t_M` (the last forcing interval's
/// upper bound), so it can be fed back in as `Q00_ncf` for a continuation
/// run.
pub fn write_final_state(
    path: &Path,
    domain_reach_ids: &[u32],
    domain_lon: &[f64],
    domain_lat: &[f64],
    q_final: &[f64],
    time_value: i64,
) -> Result<(), RouteError> {
    let mut file = netcdf::create(path).map_err(|e| io_err(path, format!("unable to create: {}", e)))?;
    file.add_dimension("rivid", domain_reach_ids.len())
        .map_err(|e| io_err(path, format!("unable to add 'rivid' dimension: {}", e)))?;
    file.add_dimension("time", 1)
        .map_err(|e| io_err(path, format!("unable to add 'time' dimension: {}", e)))?;

    write_coordinates(&mut file, path, domain_reach_ids, domain_lon, domain_lat)?;

    let mut time_var = file
        .add_variable::<i64>("time", &["time"])
        .map_err(|e| io_err(path, format!("unable to add 'time' variable: {}", e)))?;
    time_var
        .put_values(&[time_value], None)
        .map_err(|e| io_err(path, format!("unable to write 'time': {}", e)))?;

    let mut q_var = file
        .add_variable::<f64>("Qout", &["time", "rivid"])
        .map_err(|e| io_err(path, format!("unable to add 'Qout' variable: {}", e)))?;
    q_var
        .put_values(q_final, Some(&[0, 0]))
        .map_err(|e| io_err(path, format!("unable to write final state: {}", e)))?;

    Ok(())
}
