/// Moving-target evaluation and tiered body resolution
/// Uses mock body sources in place of a live ephemeris service
#[cfg(test)]
mod moving_target_tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration as StdDuration;

    use chrono::{DateTime, Duration, TimeZone, Utc};
    use ndarray::Array2;
    use rust_ephem_constraints::resolver::BodyId;
    use rust_ephem_constraints::utils::config::AU_TO_KM;
    use rust_ephem_constraints::{
        BodyResolver, BodySource, Constraint, ConstraintConfig, ConstraintError, EphemerisContext,
        EphemerisTable, MovingOptions, MovingTarget, OnFailure, PlatformKind, Resolution,
        ResolutionError, ResolveOptions, Tier, TimeGrid,
    };

    /// Body far out along +x; optionally without coverage at one instant
    struct MockService {
        calls: AtomicUsize,
        gap: Option<DateTime<Utc>>,
        delay: StdDuration,
    }

    impl MockService {
        fn new() -> Arc<Self> {
            Arc::new(MockService {
                calls: AtomicUsize::new(0),
                gap: None,
                delay: StdDuration::ZERO,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl BodySource for MockService {
        fn tier_name(&self) -> &'static str {
            "mock service"
        }

        fn locate(
            &self,
            _body: &BodyId,
            times: &[DateTime<Utc>],
        ) -> Result<Vec<Option<[f64; 3]>>, ResolutionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
            Ok(times
                .iter()
                .map(|t| (Some(*t) != self.gap).then_some([3.0 * AU_TO_KM, 0.0, 0.0]))
                .collect())
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 1, 0, 0, 0).unwrap()
    }

    fn table(n: usize) -> EphemerisTable {
        let grid = TimeGrid::generate(t0(), t0() + Duration::minutes(n as i64 - 1), 60).unwrap();
        let gcrs = Array2::from_shape_fn((n, 3), |(_, j)| if j == 2 { 7000.0 } else { 0.0 });
        let sun = Array2::from_shape_fn((n, 3), |(_, j)| if j == 1 { AU_TO_KM } else { 0.0 });
        let moon = Array2::from_shape_fn((n, 3), |(_, j)| if j == 1 { -384_400.0 } else { 0.0 });
        EphemerisTable::new(grid, PlatformKind::Spacecraft, gcrs, sun, moon).unwrap()
    }

    fn network_options() -> MovingOptions {
        MovingOptions {
            resolve: ResolveOptions::with_network(None),
            ..Default::default()
        }
    }

    #[test]
    fn test_network_result_is_cached() {
        let service = MockService::new();
        let resolver = BodyResolver::network_only(service.clone());
        let ctx = table(4);
        let target = MovingTarget::body("2P/Encke");

        let sun = Constraint::from_config(ConstraintConfig::sun(45.0)).unwrap();
        let moon = Constraint::from_config(ConstraintConfig::moon(20.0)).unwrap();
        let first = sun
            .evaluate_moving(&ctx, &target, Some(&resolver), &network_options())
            .unwrap();
        let second = moon
            .evaluate_moving(&ctx, &target, Some(&resolver), &network_options())
            .unwrap();

        assert_eq!(service.calls(), 1);
        assert_eq!(resolver.network_requests(), 1);
        assert_eq!(resolver.cache_len(), 1);
        assert_eq!(first.resolved_by, Some(Tier::Network));
        assert_eq!(second.resolved_by, Some(Tier::Network));
        assert!(first.unresolved_steps.is_empty());
        // Body on +x, Sun and Moon on ±y
        assert!(first.result.all_satisfied);
        assert!(second.result.all_satisfied);
        let ra = first.ras[0].unwrap();
        assert!(ra < 0.01 || ra > 359.99);
        assert!(first.decs[0].unwrap().abs() < 0.01);

        resolver.clear_cache();
        sun.evaluate_moving(&ctx, &target, Some(&resolver), &network_options())
            .unwrap();
        assert_eq!(service.calls(), 2);
    }

    #[test]
    fn test_concurrent_lookups_share_one_request() {
        let service = Arc::new(MockService {
            calls: AtomicUsize::new(0),
            gap: None,
            delay: StdDuration::from_millis(50),
        });
        let resolver = BodyResolver::network_only(service.clone());
        let ctx = table(3);
        let times = ctx.time_grid().as_slice().to_vec();

        thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    let outcome =
                        resolver.resolve("Ceres", &times, &ResolveOptions::with_network(None));
                    assert!(outcome.is_resolved());
                });
            }
        });
        assert_eq!(service.calls(), 1);
    }

    #[test]
    fn test_failure_at_one_step_only_marks_that_step() {
        let n = 5;
        let k = 2;
        let service = Arc::new(MockService {
            calls: AtomicUsize::new(0),
            gap: Some(t0() + Duration::minutes(k as i64)),
            delay: StdDuration::ZERO,
        });
        let resolver = BodyResolver::network_only(service.clone());
        let ctx = table(n);
        let constraint = Constraint::from_config(ConstraintConfig::sun(45.0)).unwrap();

        let out = constraint
            .evaluate_moving(&ctx, &MovingTarget::body("Vesta"), Some(&resolver), &network_options())
            .unwrap();
        assert_eq!(out.unresolved_steps, vec![k]);
        assert_eq!(out.result.satisfied, vec![true, true, false, true, true]);
        assert_eq!(out.ras[k], None);
        assert!(out.ras.iter().enumerate().all(|(i, ra)| i == k || ra.is_some()));
        assert_eq!(out.result.violations.len(), 1);
        assert_eq!(out.result.violations[0].start_time, t0() + Duration::minutes(2));
        assert_eq!(out.result.violations[0].end_time, t0() + Duration::minutes(3));
        assert_eq!(out.visibility.len(), 2);
        assert!(matches!(
            out.resolution_error,
            Some(ResolutionError::OutOfRange { .. })
        ));

        // Incomplete tracks are not cached
        assert_eq!(resolver.cache_len(), 0);

        let abort = MovingOptions {
            on_failure: OnFailure::Abort,
            ..network_options()
        };
        assert!(matches!(
            constraint.evaluate_moving(&ctx, &MovingTarget::body("Vesta"), Some(&resolver), &abort),
            Err(ConstraintError::Resolution(ResolutionError::OutOfRange { .. }))
        ));
        assert_eq!(service.calls(), 2);
    }

    #[test]
    fn test_network_tier_needs_opt_in() {
        let service = MockService::new();
        let resolver = BodyResolver::network_only(service.clone());
        let ctx = table(3);
        let constraint = Constraint::from_config(ConstraintConfig::sun(45.0)).unwrap();

        let out = constraint
            .evaluate_moving(
                &ctx,
                &MovingTarget::body("Pallas"),
                Some(&resolver),
                &MovingOptions::default(),
            )
            .unwrap();
        assert_eq!(out.unresolved_steps, vec![0, 1, 2]);
        assert!(matches!(
            out.resolution_error,
            Some(ResolutionError::NetworkDisabled { .. })
        ));
        assert_eq!(service.calls(), 0);
    }

    #[test]
    fn test_slow_network_times_out() {
        let service = Arc::new(MockService {
            calls: AtomicUsize::new(0),
            gap: None,
            delay: StdDuration::from_millis(500),
        });
        let resolver = BodyResolver::network_only(service);
        let times = table(2).time_grid().as_slice().to_vec();
        let outcome = resolver.resolve(
            "Hygiea",
            &times,
            &ResolveOptions::with_network(Some(StdDuration::from_millis(20))),
        );
        assert!(matches!(
            outcome.error(),
            Some(ResolutionError::Timeout { .. })
        ));
    }

    #[test]
    fn test_local_table_answers_before_network() {
        let n = 3;
        let jupiter = Array2::from_shape_fn((n, 3), |(_, j)| if j == 0 { 6.0e8 } else { 0.0 });
        let ctx = Arc::new(table(n).with_body("Jupiter", jupiter).unwrap());
        let service = MockService::new();
        let resolver = BodyResolver::new(ctx.clone()).with_network(service.clone());

        let times = ctx.time_grid().as_slice().to_vec();
        let outcome = resolver.resolve("599", &times, &ResolveOptions::with_network(None));
        assert!(matches!(outcome, Resolution::Local(_)));
        assert_eq!(service.calls(), 0);

        // Same key under another spelling is served from the cache
        let again = resolver.resolve("jupiter", &times, &ResolveOptions::local_only());
        assert!(matches!(again, Resolution::Local(_)));
        assert_eq!(resolver.cache_len(), 1);
    }

    #[test]
    fn test_explicit_coordinates_skip_the_resolver() {
        let ctx = table(3);
        let constraint = Constraint::from_config(ConstraintConfig::sun(45.0)).unwrap();
        let target = MovingTarget::from_parts(
            None,
            Some(vec![90.0, 60.0, 30.0]),
            Some(vec![0.0, 0.0, 0.0]),
        )
        .unwrap();
        let out = constraint
            .evaluate_moving(&ctx, &target, None, &MovingOptions::default())
            .unwrap();
        // Sun on +y (ra 90°)
        assert_eq!(out.result.satisfied, vec![false, false, true]);
        assert_eq!(out.resolved_by, None);
        assert_eq!(out.ras, vec![Some(90.0), Some(60.0), Some(30.0)]);
    }
}
