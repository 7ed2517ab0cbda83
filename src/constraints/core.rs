//! Core constraint types: per-sample outcomes, violation intervals and results
//!
//! A constraint is evaluated sample by sample into an [`Evaluation`]; the
//! resulting series is reduced into [`ConstraintViolation`] intervals and,
//! inverted, into [`VisibilityWindow`]s.

use chrono::{DateTime, Utc};
use ndarray::Array1;
use serde::Serialize;

use crate::ephemeris::EphemerisSample;
use crate::error::{ConstraintError, Result};
use crate::utils::time_utils::seconds_between;

/// Outcome of one constraint at one sample
///
/// `margin` is the normalised distance from the satisfaction boundary:
/// how far outside the bounds when violated, how far inside when satisfied.
/// It is never negative. The exposed severity is the margin while violated
/// and 0 while satisfied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub satisfied: bool,
    margin: f64,
}

fn clean(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.max(0.0)
    }
}

impl Evaluation {
    pub fn new(satisfied: bool, margin: f64) -> Self {
        Evaluation {
            satisfied,
            margin: clean(margin),
        }
    }

    /// Satisfied with the given distance inside the bounds
    pub fn pass(margin: f64) -> Self {
        Evaluation::new(true, margin)
    }

    /// Violated with the given severity
    pub fn fail(severity: f64) -> Self {
        Evaluation::new(false, severity)
    }

    /// Severity of a violation; 0 while satisfied
    pub fn severity(&self) -> f64 {
        if self.satisfied {
            0.0
        } else {
            self.margin
        }
    }

    pub fn margin(&self) -> f64 {
        self.margin
    }

    /// Logical negation; the margin is carried over unchanged
    pub fn negate(self) -> Self {
        Evaluation {
            satisfied: !self.satisfied,
            margin: self.margin,
        }
    }
}

/// Check a value against optional inclusive bounds
///
/// `scale` maps a bound to the normaliser used for its severity.
pub(crate) fn check_range(
    value: f64,
    min: Option<f64>,
    max: Option<f64>,
    scale: impl Fn(f64) -> f64,
) -> Evaluation {
    if let Some(min) = min {
        if value < min {
            return Evaluation::fail((min - value) / scale(min));
        }
    }
    if let Some(max) = max {
        if value > max {
            return Evaluation::fail((value - max) / scale(max));
        }
    }
    let below = min.map(|m| (value - m) / scale(m));
    let above = max.map(|m| (m - value) / scale(m));
    let margin = match (below, above) {
        (Some(a), Some(b)) => a.min(b),
        (Some(a), None) | (None, Some(a)) => a,
        (None, None) => 1.0,
    };
    Evaluation::pass(margin)
}

/// Angular severity normaliser: the bound itself, floored at one degree
pub(crate) fn angle_scale(bound: f64) -> f64 {
    bound.abs().max(1.0)
}

/// A primitive constraint evaluated at a single sample
pub trait ConstraintEvaluator: Send + Sync {
    /// Evaluate against a platform sample and a target unit vector
    fn evaluate_sample(&self, sample: &EphemerisSample, target: &[f64; 3]) -> Evaluation;

    /// Human-readable name
    fn name(&self) -> String;

    /// Text used for violation intervals
    fn violation_description(&self) -> String {
        format!("{} violated", self.name())
    }
}

/// One contiguous run of violated samples
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstraintViolation {
    /// First violated instant
    pub start_time: DateTime<Utc>,
    /// First satisfied instant after the run, or the last grid instant when
    /// the run reaches the end of the grid
    pub end_time: DateTime<Utc>,
    /// Largest severity within the run
    pub max_severity: f64,
    pub description: String,
}

impl ConstraintViolation {
    pub fn duration_seconds(&self) -> f64 {
        seconds_between(&self.start_time, &self.end_time)
    }
}

/// One contiguous run of satisfied samples
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisibilityWindow {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Window length in seconds
    pub duration: f64,
}

/// Scan a satisfied/severity series into violation intervals
///
/// Intervals are half-open `[start, end)` with `end` the first satisfied
/// instant; a run that reaches the end of the series closes at the last
/// instant.
pub fn track_violations(
    times: &[DateTime<Utc>],
    evaluations: &[Evaluation],
    describe: impl Fn(f64) -> String,
) -> Vec<ConstraintViolation> {
    let mut violations = Vec::new();
    let mut current_violation: Option<(usize, f64)> = None;

    for (i, eval) in evaluations.iter().enumerate() {
        if !eval.satisfied {
            let severity = eval.severity();
            current_violation = match current_violation {
                Some((start_idx, max_sev)) => Some((start_idx, max_sev.max(severity))),
                None => Some((i, severity)),
            };
        } else if let Some((start_idx, max_severity)) = current_violation.take() {
            violations.push(ConstraintViolation {
                start_time: times[start_idx],
                end_time: times[i],
                max_severity,
                description: describe(max_severity),
            });
        }
    }

    if let (Some((start_idx, max_severity)), Some(last)) = (current_violation, times.last()) {
        violations.push(ConstraintViolation {
            start_time: times[start_idx],
            end_time: *last,
            max_severity,
            description: describe(max_severity),
        });
    }

    violations
}

/// Scan a satisfied series into visibility windows, the complement of
/// [`track_violations`]
pub fn visibility_windows(times: &[DateTime<Utc>], satisfied: &[bool]) -> Vec<VisibilityWindow> {
    let mut windows = Vec::new();
    let mut open: Option<usize> = None;

    let mut close = |start: usize, end: &DateTime<Utc>| {
        windows.push(VisibilityWindow {
            start_time: times[start],
            end_time: *end,
            duration: seconds_between(&times[start], end),
        });
    };

    for (i, &ok) in satisfied.iter().enumerate() {
        match (ok, open) {
            (true, None) => open = Some(i),
            (false, Some(start)) => {
                close(start, &times[i]);
                open = None;
            }
            _ => {}
        }
    }
    if let (Some(start), Some(last)) = (open, times.last()) {
        close(start, last);
    }

    windows
}

/// Result of evaluating one constraint for one target over a time grid
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstraintResult {
    pub violations: Vec<ConstraintViolation>,
    /// True iff `violations` is empty
    pub all_satisfied: bool,
    pub constraint_name: String,
    /// Evaluated instants, aligned with the series below
    pub times: Vec<DateTime<Utc>>,
    pub satisfied: Vec<bool>,
    pub severity: Vec<f64>,
}

impl ConstraintResult {
    /// Reduce a per-sample series into a result
    pub fn from_series(
        constraint_name: String,
        times: Vec<DateTime<Utc>>,
        evaluations: &[Evaluation],
        describe: impl Fn(f64) -> String,
    ) -> Self {
        let violations = track_violations(&times, evaluations, describe);
        ConstraintResult {
            all_satisfied: violations.is_empty(),
            violations,
            constraint_name,
            times,
            satisfied: evaluations.iter().map(|e| e.satisfied).collect(),
            severity: evaluations.iter().map(Evaluation::severity).collect(),
        }
    }

    /// Per-sample satisfied flags
    pub fn constraint_array(&self) -> Array1<bool> {
        Array1::from_vec(self.satisfied.clone())
    }

    /// Per-sample severities (0 where satisfied)
    pub fn severity_array(&self) -> Array1<f64> {
        Array1::from_vec(self.severity.clone())
    }

    /// Whether the constraint holds at an evaluated instant
    pub fn in_constraint(&self, time: &DateTime<Utc>) -> Result<bool> {
        self.times
            .binary_search(time)
            .map(|i| self.satisfied[i])
            .map_err(|_| ConstraintError::LookupBounds { time: *time })
    }

    /// Sum of violation interval lengths in seconds
    pub fn total_violation_duration(&self) -> f64 {
        self.violations
            .iter()
            .map(ConstraintViolation::duration_seconds)
            .sum()
    }

    /// Satisfied runs of the series
    pub fn visibility(&self) -> Vec<VisibilityWindow> {
        visibility_windows(&self.times, &self.satisfied)
    }
}
