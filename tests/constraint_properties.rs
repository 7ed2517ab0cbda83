/// Property tests for the combinator algebra and the interval reducer
#[cfg(test)]
mod property_tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use ndarray::Array2;
    use proptest::prelude::*;
    use proptest::test_runner::TestCaseError;
    use rust_ephem_constraints::constraints::core::{track_violations, visibility_windows};
    use rust_ephem_constraints::utils::config::AU_TO_KM;
    use rust_ephem_constraints::utils::vector_math::angular_separation_radec;
    use rust_ephem_constraints::{
        Constraint, ConstraintConfig, ConstraintResult, ConstraintViolation, EphemerisTable,
        EvalOptions, Evaluation, PlatformKind, TimeGrid, VisibilityWindow,
    };

    const STEPS: usize = 12;

    /// Polar spacecraft with the Sun sweeping 15° per step along the equator
    fn sweeping_sun() -> EphemerisTable {
        let t0 = Utc.with_ymd_and_hms(2025, 3, 20, 0, 0, 0).unwrap();
        let grid =
            TimeGrid::generate(t0, t0 + Duration::minutes(STEPS as i64 - 1), 60).unwrap();
        let gcrs = Array2::from_shape_fn((STEPS, 3), |(_, j)| if j == 2 { 7000.0 } else { 0.0 });
        let sun = Array2::from_shape_fn((STEPS, 3), |(i, j)| {
            let angle = (15.0 * i as f64).to_radians();
            [AU_TO_KM * angle.cos(), AU_TO_KM * angle.sin(), 0.0][j]
        });
        let moon = Array2::from_shape_fn((STEPS, 3), |(i, j)| {
            let angle = (200.0 - 10.0 * i as f64).to_radians();
            [384_400.0 * angle.cos(), 0.0, 384_400.0 * angle.sin()][j]
        });
        EphemerisTable::new(grid, PlatformKind::Spacecraft, gcrs, sun, moon).unwrap()
    }

    fn primitive() -> impl Strategy<Value = ConstraintConfig> {
        prop_oneof![
            (0.0..180.0f64).prop_map(ConstraintConfig::sun),
            (0.0..180.0f64).prop_map(ConstraintConfig::moon),
            (-30.0..60.0f64).prop_map(ConstraintConfig::earth_limb),
            any::<bool>().prop_map(ConstraintConfig::eclipse),
        ]
    }

    fn evaluate(config: ConstraintConfig, ra: f64, dec: f64) -> ConstraintResult {
        Constraint::from_config(config)
            .unwrap()
            .evaluate(&sweeping_sun(), ra, dec, &EvalOptions::default())
            .unwrap()
    }

    fn runs(flags: &[bool], value: bool) -> usize {
        flags
            .iter()
            .enumerate()
            .filter(|&(i, &f)| f == value && (i == 0 || flags[i - 1] != value))
            .count()
    }

    fn minutes(n: usize) -> Vec<DateTime<Utc>> {
        let t0 = Utc.with_ymd_and_hms(2025, 3, 20, 0, 0, 0).unwrap();
        (0..n as i64).map(|i| t0 + Duration::minutes(i)).collect()
    }

    fn reduce(flags: &[bool]) -> (Vec<ConstraintViolation>, Vec<VisibilityWindow>) {
        let times = minutes(flags.len());
        let evals: Vec<Evaluation> = flags
            .iter()
            .map(|&ok| if ok { Evaluation::pass(1.0) } else { Evaluation::fail(0.5) })
            .collect();
        (
            track_violations(&times, &evals, |s| format!("sev {s}")),
            visibility_windows(&times, flags),
        )
    }

    /// Violations and windows are each ordered and disjoint, and together tile
    /// `times[0]..=times[last]` without gaps or overlaps
    fn check_partition(
        times: &[DateTime<Utc>],
        violations: &[ConstraintViolation],
        windows: &[VisibilityWindow],
    ) -> Result<(), TestCaseError> {
        for pair in violations.windows(2) {
            prop_assert!(pair[0].start_time < pair[1].start_time);
            prop_assert!(pair[0].end_time <= pair[1].start_time);
        }
        for pair in windows.windows(2) {
            prop_assert!(pair[0].start_time < pair[1].start_time);
            prop_assert!(pair[0].end_time <= pair[1].start_time);
        }

        let mut spans: Vec<(DateTime<Utc>, DateTime<Utc>)> = violations
            .iter()
            .map(|v| (v.start_time, v.end_time))
            .chain(windows.iter().map(|w| (w.start_time, w.end_time)))
            .collect();
        spans.sort();
        for (start, end) in &spans {
            prop_assert!(start <= end);
        }
        prop_assert_eq!(spans.first().map(|s| s.0), times.first().copied());
        prop_assert_eq!(spans.last().map(|s| s.1), times.last().copied());
        for pair in spans.windows(2) {
            prop_assert_eq!(pair[0].1, pair[1].0);
        }
        Ok(())
    }

    #[test]
    fn test_single_sample_grid_partition() {
        let times = minutes(1);
        for ok in [true, false] {
            let (violations, windows) = reduce(&[ok]);
            assert_eq!(violations.len(), usize::from(!ok));
            assert_eq!(windows.len(), usize::from(ok));
            check_partition(&times, &violations, &windows).unwrap();
        }
    }

    #[test]
    fn test_all_violated_grid_partition() {
        let times = minutes(5);
        let (violations, windows) = reduce(&[false; 5]);
        assert!(windows.is_empty());
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].start_time, times[0]);
        assert_eq!(violations[0].end_time, times[4]);
        check_partition(&times, &violations, &windows).unwrap();
    }

    proptest! {
        #[test]
        fn double_negation_is_identity(c in primitive(), ra in 0.0..360.0f64, dec in -89.0..89.0f64) {
            let plain = evaluate(c.clone(), ra, dec);
            let twice = evaluate(!!c, ra, dec);
            prop_assert_eq!(plain.satisfied, twice.satisfied);
            prop_assert_eq!(plain.severity, twice.severity);
        }

        #[test]
        fn and_or_are_idempotent(c in primitive(), ra in 0.0..360.0f64, dec in -89.0..89.0f64) {
            let plain = evaluate(c.clone(), ra, dec);
            let and = evaluate(c.clone() & c.clone(), ra, dec);
            let or = evaluate(c.clone() | c, ra, dec);
            prop_assert_eq!(&plain.satisfied, &and.satisfied);
            prop_assert_eq!(&plain.severity, &and.severity);
            prop_assert_eq!(&plain.satisfied, &or.satisfied);
            prop_assert_eq!(&plain.severity, &or.severity);
        }

        #[test]
        fn xor_of_two_is_disagreement(
            a in primitive(),
            b in primitive(),
            ra in 0.0..360.0f64,
            dec in -89.0..89.0f64,
        ) {
            let left = evaluate(a.clone(), ra, dec);
            let right = evaluate(b.clone(), ra, dec);
            let xor = evaluate(a ^ b, ra, dec);
            for i in 0..STEPS {
                prop_assert_eq!(xor.satisfied[i], left.satisfied[i] != right.satisfied[i]);
            }
        }

        #[test]
        fn reducer_partitions_the_grid(
            a in primitive(),
            b in primitive(),
            ra in 0.0..360.0f64,
            dec in -89.0..89.0f64,
        ) {
            let result = evaluate(a | !b, ra, dec);
            prop_assert_eq!(result.all_satisfied, result.violations.is_empty());
            prop_assert_eq!(result.all_satisfied, result.satisfied.iter().all(|&s| s));
            prop_assert_eq!(result.violations.len(), runs(&result.satisfied, false));
            prop_assert_eq!(result.visibility().len(), runs(&result.satisfied, true));
            for (s, &ok) in result.severity.iter().zip(&result.satisfied) {
                prop_assert!(*s >= 0.0);
                if ok {
                    prop_assert_eq!(*s, 0.0);
                }
            }
            for v in &result.violations {
                prop_assert!(v.max_severity >= 0.0);
            }
            check_partition(&result.times, &result.violations, &result.visibility())?;
        }

        #[test]
        fn reducer_tiles_any_series(flags in prop::collection::vec(any::<bool>(), 1..24)) {
            let (violations, windows) = reduce(&flags);
            prop_assert_eq!(violations.len(), runs(&flags, false));
            prop_assert_eq!(windows.len(), runs(&flags, true));
            check_partition(&minutes(flags.len()), &violations, &windows)?;
        }

        #[test]
        fn separation_is_symmetric(
            ra1 in 0.0..360.0f64,
            dec1 in -90.0..90.0f64,
            ra2 in 0.0..360.0f64,
            dec2 in -90.0..90.0f64,
        ) {
            let ab = angular_separation_radec(ra1, dec1, ra2, dec2);
            let ba = angular_separation_radec(ra2, dec2, ra1, dec1);
            prop_assert!((ab - ba).abs() < 1e-9);
            prop_assert!((0.0..=180.0).contains(&ab));
            prop_assert!(angular_separation_radec(ra1, dec1, ra1, dec1) < 1e-6);
            let antipode = angular_separation_radec(ra1, dec1, (ra1 + 180.0) % 360.0, -dec1);
            prop_assert!((antipode - 180.0).abs() < 1e-6);
        }
    }
}
