//! The outer run driver: loads every input, builds the routing matrices
//! once, then steps forward one forcing interval at a time until the
//! forcing dataset is exhausted or cancellation is requested.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::coefficients::build_coefficients;
use crate::config::RouteConfig;
use crate::consistency::{check_forcing_reach_ids, check_topology};
use crate::error::{report_warning, RouteError};
use crate::io::netcdf_io::{self, ForcingReader, MeanDischargeWriter};
use crate::io::tabular;
use crate::network::build_network_matrix;
use crate::parameters::gather_parameters;
use crate::routing_matrices::build_routing_matrices;
use crate::solver::{route_interval, SolverScratch};
use crate::timestep::sub_steps_per_interval;
use crate::topology::build_basin;

/// Runs a complete simulation from a loaded [`RouteConfig`].
///
/// `cancel` is polled once per forcing interval; setting it to `true` from
/// another thread stops the run after the most recently completed interval
/// and, if `emit_final_state` is set, writes the final-state snapshot for
/// that completed interval before returning `Ok(())`.
pub fn run(config: &RouteConfig, cancel: Arc<AtomicBool>) -> Result<(), RouteError> {
    log::info!("loading domain connectivity from {}", config.connectivity_csv);
    let domain = tabular::read_connectivity(Path::new(&config.connectivity_csv))?;

    log::info!("loading sub-basin reach list from {}", config.basin_csv);
    let basin_reach_ids = tabular::read_basin_reach_ids(Path::new(&config.basin_csv))?;
    let basin = build_basin(&domain, basin_reach_ids)?;

    check_topology(&domain, &basin)?;

    let k_dom = tabular::read_parameter_column(Path::new(&config.k_csv))?;
    let x_dom = tabular::read_parameter_column(Path::new(&config.x_csv))?;
    let params = gather_parameters(&basin, &k_dom, &x_dom, domain.len())?;

    let forcing = ForcingReader::open(Path::new(&config.forcing_path), &config.forcing_variable_name)?;
    check_forcing_reach_ids(&domain, forcing.rivid())?;

    let q_init_domain = netcdf_io::read_initial_state(Path::new(&config.initial_state_path), &domain.reach_ids)?;
    let mut q_state = gather_into_basin_order(&basin, &q_init_domain);

    let network = build_network_matrix(&domain, &basin);
    let coeffs = build_coefficients(&params, config.routing_dt_seconds)?;
    let matrices = build_routing_matrices(&network, &coeffs);

    let n = basin.len();
    let mut scratch = SolverScratch::new(n);
    let mut mean = vec![0.0; n];

    let sub_steps = sub_steps_per_interval(forcing.interval_seconds()?, config.routing_dt_seconds)?;
    log::info!("{} routing sub-steps per forcing interval", sub_steps);

    let n_intervals = forcing.n_intervals();
    let basin_lon = gather_into_basin_order(&basin, forcing.lon());
    let basin_lat = gather_into_basin_order(&basin, forcing.lat());
    let mut writer = MeanDischargeWriter::create(
        Path::new(&config.mean_discharge_output_path),
        &basin.reach_ids,
        &basin_lon,
        &basin_lat,
    )?;

    let mut last_end_seconds = forcing.time_bnds(0)?.0;

    for t in 0..n_intervals {
        if cancel.load(Ordering::Relaxed) {
            report_warning(&format!("run cancelled after {} of {} intervals", t, n_intervals));
            return emit_final_state(config, &domain, &basin, &forcing, &q_state, last_end_seconds);
        }

        let forcing_domain = forcing.read_interval(t)?;
        let mut forcing_basin = gather_into_basin_order(&basin, &forcing_domain);
        if config.forcing_is_volume || forcing.is_volume() {
            let (start_s, end_s) = forcing.time_bnds(t)?;
            let interval_seconds = (end_s - start_s) as f64;
            for v in forcing_basin.iter_mut() {
                *v /= interval_seconds;
            }
        }

        let q_fin = route_interval(&matrices, sub_steps, &q_state, &forcing_basin, &mut scratch, &mut mean)?;

        let (start_s, end_s) = forcing.time_bnds(t)?;
        log::debug!("interval {}/{}: {}", t + 1, n_intervals, format_interval(start_s, end_s));
        writer.write_interval(t, &mean, forcing.time_value(t), start_s, end_s)?;

        q_state = q_fin;
        last_end_seconds = end_s;
    }

    emit_final_state(config, &domain, &basin, &forcing, &q_state, last_end_seconds)
}

/// Writes the final-state snapshot (if enabled), scattering the
/// sub-basin-ordered discharge back to domain order.
fn emit_final_state(
    config: &RouteConfig,
    domain: &crate::topology::Domain,
    basin: &crate::topology::Basin,
    forcing: &ForcingReader,
    q_state: &[f64],
    time_value: i64,
) -> Result<(), RouteError> {
    if !config.emit_final_state {
        return Ok(());
    }
    let mut q_final_domain = vec![0.0; domain.len()];
    scatter_into_domain_order(basin, q_state, &mut q_final_domain);
    netcdf_io::write_final_state(
        Path::new(&config.final_state_output_path),
        &domain.reach_ids,
        forcing.lon(),
        forcing.lat(),
        &q_final_domain,
        time_value,
    )
}

/// Gathers a domain-ordered array into sub-basin order via `B`.
fn gather_into_basin_order(basin: &crate::topology::Basin, domain_ordered: &[f64]) -> Vec<f64> {
    basin.positions_in_domain.iter().map(|&pos| domain_ordered[pos]).collect()
}

/// Scatters a sub-basin-ordered array back into a domain-ordered buffer,
/// leaving domain reaches outside the sub-basin untouched (`0.0`).
fn scatter_into_domain_order(basin: &crate::topology::Basin, basin_ordered: &[f64], out: &mut [f64]) {
    for v in out.iter_mut() {
        *v = 0.0;
    }
    for (j, &pos) in basin.positions_in_domain.iter().enumerate() {
        out[pos] = basin_ordered[j];
    }
}

fn format_interval(start_seconds: i64, end_seconds: i64) -> String {
    let start = chrono::DateTime::<chrono::Utc>::from_timestamp(start_seconds, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| start_seconds.to_string());
    let end = chrono::DateTime::<chrono::Utc>::from_timestamp(end_seconds, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| end_seconds.to_string());
    format!("{} to {}", start, end)
}
