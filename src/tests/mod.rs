//! End-to-end scenario and invariant tests that exercise the full
//! topology-to-solver pipeline together, rather than one module at a
//! time. Per-module unit tests already cover each component's own
//! contract; these compose them the way the outer driver does.

#[cfg(test)]
mod pipeline {
    use crate::coefficients::build_coefficients;
    use crate::consistency::check_topology;
    use crate::network::build_network_matrix;
    use crate::parameters::{gather_parameters, MuskingumParameters};
    use crate::routing_matrices::build_routing_matrices;
    use crate::solver::{route_interval, SolverScratch};
    use crate::topology::{build_basin, Domain};

    struct Pipeline {
        params: MuskingumParameters,
        matrices: crate::routing_matrices::RoutingMatrices,
        n: usize,
    }

    fn build_pipeline(
        reach_ids: Vec<u32>,
        downstream_ids: Vec<u32>,
        basin_reach_ids: Vec<u32>,
        k: Vec<f64>,
        x: Vec<f64>,
        dt: i32,
    ) -> Pipeline {
        let domain = Domain::new(reach_ids, downstream_ids);
        let basin = build_basin(&domain, basin_reach_ids).unwrap();
        check_topology(&domain, &basin).unwrap();

        let params = gather_parameters(&basin, &k, &x, domain.len()).unwrap();
        let network = build_network_matrix(&domain, &basin);
        let coeffs = build_coefficients(&params, dt).unwrap();
        let matrices = build_routing_matrices(&network, &coeffs);
        let n = basin.len();
        Pipeline { params, matrices, n }
    }

    /// Scenario S1 run through the full topology-to-solver pipeline (every
    /// other module's test builds its own matrices by hand; this confirms
    /// the pieces actually compose the way the outer driver assembles them).
    #[test]
    fn scenario_s1_full_pipeline_matches_worked_example() {
        let pipeline = build_pipeline(
            vec![10, 20, 30, 40, 50],
            vec![30, 30, 50, 50, 0],
            vec![10, 20, 30, 40, 50],
            vec![9000.0; 5],
            vec![0.25; 5],
            900,
        );
        assert_eq!(pipeline.params.k.len(), 5);

        let mut scratch = SolverScratch::new(pipeline.n);
        let mut mean = vec![0.0; pipeline.n];
        let q_init = vec![0.0; pipeline.n];
        let qe = vec![1.0; pipeline.n];
        let q_fin = route_interval(&pipeline.matrices, 2, &q_init, &qe, &mut scratch, &mut mean).unwrap();

        let expected_mean = [0.0625, 0.0625, 0.03125, 0.0625, 0.0390625];
        for i in 0..5 {
            assert!((mean[i] - expected_mean[i]).abs() < 1e-9);
        }
        assert!(q_fin.iter().all(|&v| v.is_finite()));
    }

    /// Invariant I6: with constant forcing and zero initial state, repeated
    /// intervals converge to a steady state where q̄ == q_fin and every
    /// reach's steady discharge equals the constant forcing plus the sum
    /// of its upstream neighbors' steady discharge (mass conservation).
    #[test]
    fn invariant_i6_steady_state_recovers_mass_conservation() {
        // A simple chain: 10 -> 20 -> 30 (30 is the outlet).
        let pipeline = build_pipeline(
            vec![10, 20, 30],
            vec![20, 30, 0],
            vec![10, 20, 30],
            vec![3600.0; 3],
            vec![0.2; 3],
            3600,
        );

        let mut scratch = SolverScratch::new(pipeline.n);
        let mut mean = vec![0.0; pipeline.n];
        let mut q_state = vec![0.0; pipeline.n];
        let qe = vec![1.0; pipeline.n];

        let mut q_fin = q_state.clone();
        for _ in 0..2000 {
            q_fin = route_interval(&pipeline.matrices, 1, &q_state, &qe, &mut scratch, &mut mean).unwrap();
            q_state = q_fin.clone();
        }

        // Steady state: q̄ == q_fin within tolerance, and mass conservation
        // holds along the chain (10 has no upstream, 20's upstream is 10,
        // 30's upstream is 20).
        for i in 0..3 {
            assert!((mean[i] - q_fin[i]).abs() < 1e-6, "reach {} not converged", i);
        }
        assert!((q_fin[0] - 1.0).abs() < 1e-6);
        assert!((q_fin[1] - (1.0 + q_fin[0])).abs() < 1e-6);
        assert!((q_fin[2] - (1.0 + q_fin[1])).abs() < 1e-6);
    }

    /// A multi-interval run, composed the way the outer driver composes
    /// `route_interval` calls across forcing intervals, threading q_state
    /// forward without ever reallocating the scratch buffers.
    #[test]
    fn multi_interval_run_threads_state_forward_without_reallocating_scratch() {
        let pipeline = build_pipeline(
            vec![10, 20, 30, 40, 50],
            vec![30, 30, 50, 50, 0],
            vec![10, 20, 30, 40, 50],
            vec![9000.0; 5],
            vec![0.25; 5],
            900,
        );

        let mut scratch = SolverScratch::new(pipeline.n);
        let mut mean = vec![0.0; pipeline.n];
        let mut q_state = vec![0.0; pipeline.n];
        let forcing_per_interval = [vec![1.0; 5], vec![2.0; 5], vec![0.0; 5]];

        let mut means_by_interval = Vec::new();
        for qe in &forcing_per_interval {
            let q_fin = route_interval(&pipeline.matrices, 2, &q_state, qe, &mut scratch, &mut mean).unwrap();
            means_by_interval.push(mean.clone());
            q_state = q_fin;
        }

        assert_eq!(means_by_interval.len(), 3);
        // First interval matches the S1 worked example exactly.
        let expected_first = [0.0625, 0.0625, 0.03125, 0.0625, 0.0390625];
        for i in 0..5 {
            assert!((means_by_interval[0][i] - expected_first[i]).abs() < 1e-9);
        }
        // Discharge should rise when forcing doubles, then fall toward
        // zero once forcing is cut, but never go negative or non-finite.
        for means in &means_by_interval {
            assert!(means.iter().all(|&v| v.is_finite() && v >= 0.0));
        }
    }
}
