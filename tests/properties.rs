//! Behavioural properties of the oscillatory network engine
//!
//! Tests cover:
//! - Order parameter bounds
//! - Free-running and fully coupled networks
//! - Ensemble partitioning
//! - Divergence reporting of the solvers
//! - Hierarchical topology growth
//! - Pattern memory recall
//! - Handle ownership discipline

use oscnet::{
    allocate_sync_ensembles, build_hierarchical, global_order, local_order, ConnectionType,
    ConvergenceConfig, Ensembles, HandleRegistry, Integrator, LegionConfig, LegionNetwork,
    OdeSystem, RunStatus, SolverKind, SyncConfig, SyncDynamic, SyncError, SyncNetwork, SyncPr,
    SyncPrConfig, AdaptiveParams, Connectivity,
};

fn assert_partition(ensembles: &Ensembles, size: usize) {
    let mut seen = vec![0usize; size];
    for cluster in ensembles.iter() {
        assert!(!cluster.is_empty());
        for &i in cluster {
            seen[i] += 1;
        }
    }
    assert!(seen.iter().all(|&count| count == 1), "not a partition: {seen:?}");
}

#[cfg(test)]
mod free_running {
    use super::*;

    #[test]
    fn test_zero_coupling_free_runs_at_natural_frequency() {
        let config = SyncConfig::new(12, 0.0, ConnectionType::AllToAll)
            .with_frequency_factor(2.0)
            .with_seed(11);
        let mut net = SyncNetwork::new(config).unwrap();
        let start: Vec<f64> = (0..12).map(|i| 0.3 * i as f64).collect();
        net.set_phases(&start).unwrap();

        let dynamic = net.simulate_static(400, 40.0, SolverKind::Rk4, true).unwrap();
        assert_eq!(dynamic.len(), 401);

        for ((phase, freq), initial) in net.phases().iter().zip(net.frequencies()).zip(&start) {
            assert!((phase - (initial + freq * 40.0)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_fully_connected_identical_frequencies_converge() {
        for size in [2, 3, 8, 25] {
            let mut net = SyncNetwork::new(SyncConfig::new(size, 1.0, ConnectionType::AllToAll)).unwrap();
            let config = ConvergenceConfig::new(0.99).with_max_steps(1_000);
            let dynamic = net.simulate_dynamic(&config, SolverKind::Fast, false).unwrap();

            assert_eq!(dynamic.status(), RunStatus::Converged, "size {size}");
            assert!(net.sync_order() >= 0.99);
        }
    }

    #[test]
    fn test_unreachable_target_stops_on_plateau() {
        let config = SyncConfig::new(4, 1.0, ConnectionType::None);
        let mut net = SyncNetwork::new(config).unwrap();
        let dynamic = net
            .simulate_dynamic(&ConvergenceConfig::new(0.999), SolverKind::Rk4, true)
            .unwrap();
        assert_eq!(dynamic.status(), RunStatus::PlateauStopped);
        assert_eq!(net.status(), RunStatus::PlateauStopped);
    }
}

#[cfg(test)]
mod divergence {
    use super::*;

    /// dy/dt = y², finite-time blowup
    struct Blowup;

    impl OdeSystem for Blowup {
        fn dimension(&self) -> usize {
            1
        }
        fn derivative(&self, _t: f64, state: &[f64], out: &mut [f64]) {
            out[0] = state[0] * state[0];
        }
    }

    #[test]
    fn test_adaptive_solver_reports_divergence() {
        let mut integrator = Integrator::new(SolverKind::Rkf45, AdaptiveParams::default());
        let mut state = [1.0];
        let result = integrator.advance(&Blowup, 0.0, &mut state, 2.0, 0.01);
        assert!(matches!(result, Err(SyncError::Diverged { .. })));
    }

    #[test]
    fn test_network_status_diverged() {
        let config = SyncConfig::new(4, f64::MAX, ConnectionType::AllToAll);
        let mut net = SyncNetwork::new(config).unwrap();
        let result = net.simulate_static(10, 1.0, SolverKind::Rkf45, true);

        assert!(result.unwrap_err().is_divergence());
        assert_eq!(net.status(), RunStatus::Diverged);
    }

    #[test]
    fn test_well_posed_adaptive_run_is_finite() {
        let config = SyncConfig::new(16, 3.0, ConnectionType::GridFour).with_frequency_factor(1.0);
        let mut net = SyncNetwork::new(config).unwrap();
        let dynamic = net.simulate_static(100, 20.0, SolverKind::Rkf45, true).unwrap();

        assert!(dynamic.iter().all(|(_, s)| s.iter().all(|v| v.is_finite())));
        assert!(net.integrator().stats().accepted > 0);
    }
}

#[cfg(test)]
mod hierarchy {
    use super::*;

    #[test]
    fn test_two_separated_clusters() {
        let mut points = Vec::new();
        for i in 0..6 {
            let offset = i as f64 * 0.1;
            points.push(vec![offset, 0.2 * offset]);
            points.push(vec![20.0 + offset, 20.0 - offset]);
        }

        let topology = build_hierarchical(&points, 2, 3, 0.1, 1000).unwrap();
        assert_eq!(topology.components, 2);
        assert_eq!(topology.connectivity.component_count(), 2);
        assert!(topology.iterations <= 1000);
    }

    #[test]
    fn test_zero_target_rejected() {
        let points = vec![vec![0.0], vec![1.0]];
        assert!(matches!(
            build_hierarchical(&points, 0, 1, 0.1, 10),
            Err(SyncError::InvalidConfig(_))
        ));
    }
}

#[cfg(test)]
mod pattern_memory {
    use super::*;

    #[test]
    fn test_recall_beats_orthogonal_probe() {
        let pattern = vec![1.0, -1.0, -1.0, 1.0, 1.0, 1.0, -1.0, -1.0];
        let orthogonal = vec![1.0, -1.0, -1.0, 1.0, -1.0, -1.0, 1.0, 1.0];

        let mut memory = SyncPr::new(SyncPrConfig::new(8, 0.1, 0.1)).unwrap();
        memory.train(&[pattern.clone()]).unwrap();
        memory
            .simulate_static(40, 8.0, &pattern, SolverKind::Rk4, false)
            .unwrap();

        let recalled = memory.memory_order(&pattern).unwrap();
        let other = memory.memory_order(&orthogonal).unwrap();
        assert!(recalled > other);
        assert!(recalled > 0.99);
    }

    #[test]
    fn test_corrupted_probe_settles_on_trained_pattern() {
        let pattern = vec![1.0, -1.0, -1.0, 1.0, 1.0, 1.0, -1.0, -1.0];
        let mut probe = pattern.clone();
        probe[0] = -1.0;

        let mut memory = SyncPr::new(SyncPrConfig::new(8, 0.1, 0.1)).unwrap();
        memory.train(&[pattern.clone()]).unwrap();

        // The probe itself is never fully synchronous, so the run ends on
        // the plateau guard once the phases stop moving
        let dynamic = memory
            .simulate_dynamic(&probe, 0.99, SolverKind::Rk4, false, 0.1)
            .unwrap();
        assert_eq!(dynamic.status(), RunStatus::PlateauStopped);
        assert!(memory.memory_order(&pattern).unwrap() > 0.99);
    }
}

#[cfg(test)]
mod ownership {
    use super::*;

    #[test]
    fn test_create_simulate_destroy_leaves_nothing_live() {
        let mut networks = HandleRegistry::new();
        let mut memories = HandleRegistry::new();
        let mut legions = HandleRegistry::new();
        let mut dynamics: HandleRegistry<SyncDynamic> = HandleRegistry::new();

        for size in 1..=4 {
            let net = networks.create(
                SyncNetwork::new(SyncConfig::new(size, 1.0, ConnectionType::AllToAll)).unwrap(),
            );
            let dynamic = networks
                .get_mut(&net)
                .unwrap()
                .simulate_static(10, 1.0, SolverKind::Rk4, true)
                .unwrap();
            let result = dynamics.create(dynamic);
            assert_eq!(dynamics.get(&result).unwrap().width(), size);

            dynamics.destroy(result).unwrap();
            networks.destroy(net).unwrap();
        }

        let memory = memories.create(SyncPr::new(SyncPrConfig::new(4, 0.1, 0.1)).unwrap());
        memories.get_mut(&memory).unwrap().train(&[vec![1.0, 1.0, -1.0, -1.0]]).unwrap();
        memories.destroy(memory).unwrap();

        let legion = legions.create(LegionNetwork::new(LegionConfig::new(4, ConnectionType::GridFour)).unwrap());
        legions
            .get_mut(&legion)
            .unwrap()
            .simulate(10, 1.0, SolverKind::Fast, false, &[1.0; 4])
            .unwrap();
        legions.destroy(legion).unwrap();

        assert_eq!(networks.live(), 0);
        assert_eq!(networks.created(), 4);
        assert_eq!(dynamics.live(), 0);
        assert_eq!(dynamics.destroyed(), 4);
        assert_eq!(memories.live(), 0);
        assert_eq!(legions.live(), 0);
    }

    #[test]
    fn test_failed_creation_allocates_nothing() {
        let mut networks: HandleRegistry<SyncNetwork> = HandleRegistry::new();
        if let Ok(net) = SyncNetwork::new(SyncConfig::new(0, 1.0, ConnectionType::AllToAll)) {
            networks.create(net);
        }
        assert_eq!(networks.created(), 0);
    }
}

// Property-based tests
#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_global_order_bounded(phases in prop::collection::vec(-1.0e3f64..1.0e3, 1..64)) {
            let order = global_order(&phases);
            prop_assert!((0.0..=1.0).contains(&order));
        }

        #[test]
        fn prop_local_order_bounded(phases in prop::collection::vec(-50.0f64..50.0, 1..40)) {
            let conn = Connectivity::from_type(phases.len(), ConnectionType::ListBidir).unwrap();
            let order = local_order(&phases, &conn);
            prop_assert!((0.0..=1.0).contains(&order));
        }

        #[test]
        fn prop_ensembles_partition(
            phases in prop::collection::vec(-20.0f64..20.0, 1..80),
            tolerance in 0.0f64..7.0
        ) {
            let ensembles = allocate_sync_ensembles(&phases, tolerance);
            assert_partition(&ensembles, phases.len());
            prop_assert_eq!(ensembles.clone(), allocate_sync_ensembles(&phases, tolerance));
        }

        #[test]
        fn prop_all_to_all_converges(size in 2usize..24, solver in 0usize..3) {
            let solver = [SolverKind::Fast, SolverKind::Rk4, SolverKind::Rkf45][solver];
            let mut net = SyncNetwork::new(SyncConfig::new(size, 1.0, ConnectionType::AllToAll)).unwrap();
            let config = ConvergenceConfig::new(0.99).with_max_steps(1_000);
            let dynamic = net.simulate_dynamic(&config, solver, false).unwrap();
            prop_assert_eq!(dynamic.status(), RunStatus::Converged);
        }

        #[test]
        fn prop_hierarchy_finds_two_wells(
            left in prop::collection::vec((0.0f64..1.0, 0.0f64..1.0), 4..12),
            right in prop::collection::vec((0.0f64..1.0, 0.0f64..1.0), 4..12)
        ) {
            let points: Vec<Vec<f64>> = left
                .iter()
                .map(|&(x, y)| vec![x, y])
                .chain(right.iter().map(|&(x, y)| vec![x + 30.0, y + 30.0]))
                .collect();
            let topology = build_hierarchical(&points, 2, 3, 0.1, 1000).unwrap();
            prop_assert_eq!(topology.components, 2);
        }

        #[test]
        fn prop_recall_beats_orthogonal(half in prop::collection::vec(any::<bool>(), 2..8)) {
            let mut pattern: Vec<f64> = half.iter().map(|&b| if b { 1.0 } else { -1.0 }).collect();
            pattern.extend(half.iter().map(|&b| if b { -1.0 } else { 1.0 }));
            // Agrees on the first half, disagrees on the second
            let orthogonal: Vec<f64> = pattern
                .iter()
                .enumerate()
                .map(|(i, &p)| if i < half.len() { p } else { -p })
                .collect();

            let mut memory = SyncPr::new(SyncPrConfig::new(pattern.len(), 0.1, 0.1)).unwrap();
            memory.train(&[pattern.clone()]).unwrap();
            memory.simulate_static(40, 10.0, &pattern, SolverKind::Rk4, false).unwrap();

            let recalled = memory.memory_order(&pattern).unwrap();
            let other = memory.memory_order(&orthogonal).unwrap();
            prop_assert!(recalled > other, "recalled {} other {}", recalled, other);
        }
    }
}
