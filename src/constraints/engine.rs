//! Evaluation entry points
//!
//! [`Constraint`] is a validated, compiled configuration. It is immutable and
//! `Send + Sync`, so one instance can serve many evaluations in parallel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ndarray::Array2;
use rayon::prelude::*;
use tracing::debug;

use super::config::ConstraintConfig;
use super::core::{ConstraintResult, Evaluation};
use super::logical::{Node, Requirements};
use crate::ephemeris::{EphemerisContext, EphemerisSample};
use crate::error::{ConstraintError, Result};
use crate::utils::vector_math::{radec_to_unit_vector, radec_to_unit_vectors_batch, row3};

/// Cooperative cancellation flag shared between a caller and an evaluation
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

pub(crate) fn check_cancelled(token: Option<&CancellationToken>) -> Result<()> {
    match token {
        Some(t) if t.is_cancelled() => Err(ConstraintError::Cancelled),
        _ => Ok(()),
    }
}

/// Per-call evaluation options
#[derive(Debug, Clone)]
pub struct EvalOptions {
    /// Evaluate only these grid indices; must be strictly increasing
    pub time_indices: Option<Vec<usize>>,
    pub cancel: Option<CancellationToken>,
    /// Spread work across the rayon thread pool
    pub parallel: bool,
}

impl Default for EvalOptions {
    fn default() -> Self {
        EvalOptions {
            time_indices: None,
            cancel: None,
            parallel: true,
        }
    }
}

/// Satisfied flags and severities for many fixed targets
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    pub constraint_name: String,
    pub times: Vec<DateTime<Utc>>,
    /// (targets × times)
    pub satisfied: Array2<bool>,
    /// (targets × times), 0 where satisfied
    pub severity: Array2<f64>,
}

impl BatchResult {
    /// Whether a target satisfies the constraint at every evaluated instant
    pub fn all_satisfied(&self, target: usize) -> Option<bool> {
        (target < self.satisfied.nrows()).then(|| self.satisfied.row(target).iter().all(|&ok| ok))
    }
}

pub(crate) fn check_radec(ra: f64, dec: f64) -> Result<()> {
    if !ra.is_finite() || !dec.is_finite() || !(-90.0..=90.0).contains(&dec) {
        return Err(ConstraintError::config(format!(
            "invalid target coordinates (ra={ra}, dec={dec})"
        )));
    }
    Ok(())
}

/// A validated, compiled constraint tree
#[derive(Debug, Clone)]
pub struct Constraint {
    config: ConstraintConfig,
    root: Node,
    requirements: Requirements,
}

impl Constraint {
    /// Validate and compile a configuration
    pub fn from_config(config: ConstraintConfig) -> Result<Self> {
        config.validate()?;
        let root = Node::compile(&config);
        let requirements = root.requirements();
        Ok(Constraint {
            config,
            root,
            requirements,
        })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Constraint::from_config(ConstraintConfig::from_json(json)?)
    }

    pub fn name(&self) -> String {
        self.root.name()
    }

    pub fn config(&self) -> &ConstraintConfig {
        &self.config
    }

    /// Named bodies the tree needs in every sample
    pub fn required_bodies(&self) -> &[String] {
        &self.requirements.bodies
    }

    /// Evaluate one sample for a fixed target
    pub fn check(&self, sample: &EphemerisSample, target_ra: f64, target_dec: f64) -> Evaluation {
        self.root
            .evaluate(sample, &radec_to_unit_vector(target_ra, target_dec))
    }

    /// Evaluate a unit direction at one sample
    pub(crate) fn check_direction(&self, sample: &EphemerisSample, target: &[f64; 3]) -> Evaluation {
        self.root.evaluate(sample, target)
    }

    /// Evaluate a fixed target at one grid instant
    pub fn check_at(
        &self,
        ctx: &dyn EphemerisContext,
        time: &DateTime<Utc>,
        target_ra: f64,
        target_dec: f64,
    ) -> Result<Evaluation> {
        check_radec(target_ra, target_dec)?;
        let index = ctx.time_grid().index_of(time)?;
        let sample = self.sample(ctx, index)?;
        Ok(self.check(&sample, target_ra, target_dec))
    }

    pub(crate) fn describe(&self, max_severity: f64) -> String {
        format!(
            "{} (max severity {:.3})",
            self.root.violation_description(),
            max_severity
        )
    }

    /// Grid indices selected by the options
    pub(crate) fn selected_indices(
        ctx: &dyn EphemerisContext,
        time_indices: Option<&[usize]>,
    ) -> Result<(Vec<usize>, Vec<DateTime<Utc>>)> {
        let grid = ctx.time_grid();
        match time_indices {
            Some(indices) => Ok((indices.to_vec(), grid.select(indices)?)),
            None => Ok(((0..grid.len()).collect(), grid.as_slice().to_vec())),
        }
    }

    /// Fetch a sample and check it carries what the tree needs
    pub(crate) fn sample(&self, ctx: &dyn EphemerisContext, index: usize) -> Result<EphemerisSample> {
        let sample = ctx.sample(index, &self.requirements.bodies)?;
        if self.requirements.velocity && sample.velocity.is_none() {
            return Err(ConstraintError::MissingData(
                "orbit RAM/pole constraints need platform velocity".to_string(),
            ));
        }
        if self.requirements.geodetic && sample.geodetic.is_none() {
            return Err(ConstraintError::MissingData(
                "SAA constraints need the platform's geodetic position".to_string(),
            ));
        }
        Ok(sample)
    }

    /// Evaluate a fixed target over the time grid
    pub fn evaluate(
        &self,
        ctx: &dyn EphemerisContext,
        target_ra: f64,
        target_dec: f64,
        options: &EvalOptions,
    ) -> Result<ConstraintResult> {
        check_radec(target_ra, target_dec)?;
        let (indices, times) = Self::selected_indices(ctx, options.time_indices.as_deref())?;
        let target = radec_to_unit_vector(target_ra, target_dec);
        let cancel = options.cancel.as_ref();
        debug!(constraint = %self.name(), samples = indices.len(), "evaluating constraint");

        let step = |&index: &usize| -> Result<Evaluation> {
            check_cancelled(cancel)?;
            let sample = self.sample(ctx, index)?;
            Ok(self.root.evaluate(&sample, &target))
        };
        let evaluations: Vec<Evaluation> = if options.parallel {
            indices.par_iter().map(step).collect::<Result<_>>()?
        } else {
            indices.iter().map(step).collect::<Result<_>>()?
        };

        Ok(ConstraintResult::from_series(
            self.name(),
            times,
            &evaluations,
            |s| self.describe(s),
        ))
    }

    /// Evaluate many fixed targets over the same grid
    pub fn evaluate_batch(
        &self,
        ctx: &dyn EphemerisContext,
        target_ras: &[f64],
        target_decs: &[f64],
        options: &EvalOptions,
    ) -> Result<BatchResult> {
        if target_ras.len() != target_decs.len() {
            return Err(ConstraintError::config(format!(
                "target_ras and target_decs must have the same length ({} vs {})",
                target_ras.len(),
                target_decs.len()
            )));
        }
        for (&ra, &dec) in target_ras.iter().zip(target_decs) {
            check_radec(ra, dec)?;
        }
        let (indices, times) = Self::selected_indices(ctx, options.time_indices.as_deref())?;
        let cancel = options.cancel.as_ref();
        debug!(
            constraint = %self.name(),
            targets = target_ras.len(),
            samples = indices.len(),
            "evaluating constraint batch"
        );

        let samples: Vec<EphemerisSample> = indices
            .iter()
            .map(|&index| {
                check_cancelled(cancel)?;
                self.sample(ctx, index)
            })
            .collect::<Result<_>>()?;

        let units = radec_to_unit_vectors_batch(target_ras, target_decs);
        let row = |t: usize| -> Result<Vec<Evaluation>> {
            check_cancelled(cancel)?;
            let target = row3(&units, t);
            Ok(samples.iter().map(|s| self.root.evaluate(s, &target)).collect())
        };
        let rows: Vec<Vec<Evaluation>> = if options.parallel {
            (0..units.nrows())
                .into_par_iter()
                .map(row)
                .collect::<Result<_>>()?
        } else {
            (0..units.nrows()).map(row).collect::<Result<_>>()?
        };

        let shape = (rows.len(), times.len());
        Ok(BatchResult {
            constraint_name: self.name(),
            times,
            satisfied: Array2::from_shape_fn(shape, |(t, j)| rows[t][j].satisfied),
            severity: Array2::from_shape_fn(shape, |(t, j)| rows[t][j].severity()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ephemeris::{EphemerisTable, PlatformKind, TimeGrid};
    use crate::utils::config::AU_TO_KM;
    use chrono::{Duration, TimeZone};

    fn table(n: usize) -> EphemerisTable {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let grid = TimeGrid::generate(t0, t0 + Duration::minutes(n as i64 - 1), 60).unwrap();
        let gcrs = Array2::from_shape_fn((n, 3), |(_, j)| if j == 2 { 7000.0 } else { 0.0 });
        let sun = Array2::from_shape_fn((n, 3), |(_, j)| if j == 0 { AU_TO_KM } else { 0.0 });
        let moon = Array2::from_shape_fn((n, 3), |(_, j)| if j == 1 { 384_400.0 } else { 0.0 });
        EphemerisTable::new(grid, PlatformKind::Spacecraft, gcrs, sun, moon).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected_before_evaluation() {
        let err = Constraint::from_json(r#"{"type":"xor","constraints":[{"type":"sun","min_angle":1}]}"#)
            .unwrap_err();
        assert!(matches!(err, ConstraintError::Configuration { .. }));
    }

    #[test]
    fn test_missing_velocity_reported() {
        let c = Constraint::from_json(r#"{"type":"orbit_ram","min_angle":10}"#).unwrap();
        let err = c.evaluate(&table(3), 0.0, 0.0, &EvalOptions::default()).unwrap_err();
        assert!(matches!(err, ConstraintError::MissingData(_)));
    }

    #[test]
    fn test_time_indices_subset() {
        let c = Constraint::from_config(ConstraintConfig::sun(45.0)).unwrap();
        let ctx = table(5);
        let opts = EvalOptions { time_indices: Some(vec![1, 3]), ..Default::default() };
        let result = c.evaluate(&ctx, 30.0, 0.0, &opts).unwrap();
        assert_eq!(result.times, vec![ctx.time_grid().as_slice()[1], ctx.time_grid().as_slice()[3]]);
        assert_eq!(result.violations.len(), 1);

        let bad = EvalOptions { time_indices: Some(vec![7]), ..Default::default() };
        assert!(matches!(
            c.evaluate(&ctx, 30.0, 0.0, &bad),
            Err(ConstraintError::IndexOutOfRange { index: 7, len: 5 })
        ));
    }

    #[test]
    fn test_unordered_time_indices_rejected() {
        let c = Constraint::from_config(ConstraintConfig::sun(45.0)).unwrap();
        let ctx = table(5);
        for indices in [vec![4, 0, 2, 2], vec![1, 1], vec![3, 2]] {
            let opts = EvalOptions { time_indices: Some(indices), ..Default::default() };
            assert!(matches!(
                c.evaluate(&ctx, 30.0, 0.0, &opts),
                Err(ConstraintError::Configuration { .. })
            ));
            assert!(matches!(
                c.evaluate_batch(&ctx, &[30.0], &[0.0], &opts),
                Err(ConstraintError::Configuration { .. })
            ));
        }
    }

    #[test]
    fn test_cancelled_before_start() {
        let c = Constraint::from_config(ConstraintConfig::sun(45.0)).unwrap();
        let token = CancellationToken::new();
        token.cancel();
        let opts = EvalOptions { cancel: Some(token), ..Default::default() };
        assert_eq!(c.evaluate(&table(4), 0.0, 0.0, &opts), Err(ConstraintError::Cancelled));
        assert_eq!(
            c.evaluate_batch(&table(4), &[0.0], &[0.0], &opts),
            Err(ConstraintError::Cancelled)
        );
    }

    #[test]
    fn test_batch_matches_single_target() {
        let c = Constraint::from_config(ConstraintConfig::sun(45.0)).unwrap();
        let ctx = table(4);
        let ras = [0.0, 90.0, 30.0];
        let decs = [0.0, 0.0, 10.0];
        let batch = c.evaluate_batch(&ctx, &ras, &decs, &EvalOptions::default()).unwrap();
        assert_eq!(batch.satisfied.shape(), &[3, 4]);
        for t in 0..3 {
            let single = c.evaluate(&ctx, ras[t], decs[t], &EvalOptions::default()).unwrap();
            assert_eq!(batch.satisfied.row(t).to_vec(), single.satisfied);
            assert_eq!(batch.all_satisfied(t), Some(single.all_satisfied));
        }
        assert_eq!(batch.all_satisfied(1), Some(true));
        assert!(c.evaluate_batch(&ctx, &[0.0], &[], &EvalOptions::default()).is_err());
    }

    #[test]
    fn test_invalid_target_rejected() {
        let c = Constraint::from_config(ConstraintConfig::sun(45.0)).unwrap();
        assert!(matches!(
            c.evaluate(&table(2), 0.0, 95.0, &EvalOptions::default()),
            Err(ConstraintError::Configuration { .. })
        ));
    }
}
