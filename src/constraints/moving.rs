//! Moving-target visibility
//!
//! The target direction changes per timestep: either resolved from a body
//! identifier through [`BodyResolver`] or supplied as ra/dec series.

use serde::Serialize;
use tracing::{debug, warn};

use super::core::{ConstraintResult, Evaluation, VisibilityWindow};
use super::engine::{check_cancelled, CancellationToken, Constraint};
use crate::ephemeris::EphemerisContext;
use crate::error::{ConstraintError, ResolutionError, Result};
use crate::resolver::{BodyResolver, Resolution, ResolveOptions, Tier};
use crate::utils::vector_math::{radec_to_unit_vector, subtract, vector_to_radec};

/// Where a moving target's direction comes from
#[derive(Debug, Clone, PartialEq)]
pub enum MovingTarget {
    /// Body identifier resolved per timestep
    Body { id: String },
    /// Per-timestep coordinates in degrees, aligned with the evaluated instants
    Coordinates { ras: Vec<f64>, decs: Vec<f64> },
}

impl MovingTarget {
    pub fn body(id: impl Into<String>) -> Self {
        MovingTarget::Body { id: id.into() }
    }

    pub fn coordinates(ras: Vec<f64>, decs: Vec<f64>) -> Result<Self> {
        if ras.len() != decs.len() {
            return Err(ConstraintError::config(format!(
                "ras and decs must have the same length ({} vs {})",
                ras.len(),
                decs.len()
            )));
        }
        Ok(MovingTarget::Coordinates { ras, decs })
    }

    /// Build a target from optional caller inputs; exactly one of a body
    /// identifier or a complete ra/dec pair must be given
    pub fn from_parts(
        body: Option<&str>,
        ras: Option<Vec<f64>>,
        decs: Option<Vec<f64>>,
    ) -> Result<Self> {
        match (body, ras, decs) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => Err(ConstraintError::config(
                "give either a body identifier or ra/dec arrays, not both",
            )),
            (Some(id), None, None) if id.trim().is_empty() => {
                Err(ConstraintError::config("body identifier must not be empty"))
            }
            (Some(id), None, None) => Ok(MovingTarget::body(id)),
            (None, Some(ras), Some(decs)) => MovingTarget::coordinates(ras, decs),
            (None, Some(_), None) | (None, None, Some(_)) => Err(ConstraintError::config(
                "ras and decs must be given together",
            )),
            (None, None, None) => Err(ConstraintError::config(
                "a moving target needs a body identifier or ra/dec arrays",
            )),
        }
    }
}

/// What to do when body resolution fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OnFailure {
    /// Mark unresolved steps violated and keep going
    #[default]
    Degrade,
    /// Return the resolution error
    Abort,
}

#[derive(Debug, Clone, Default)]
pub struct MovingOptions {
    pub resolve: ResolveOptions,
    pub on_failure: OnFailure,
    pub time_indices: Option<Vec<usize>>,
    pub cancel: Option<CancellationToken>,
}

/// Visibility of a moving target over a time grid
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovingVisibilityResult {
    #[serde(flatten)]
    pub result: ConstraintResult,
    /// Apparent right ascension per step, `None` where unresolved
    pub ras: Vec<Option<f64>>,
    pub decs: Vec<Option<f64>>,
    pub visibility: Vec<VisibilityWindow>,
    /// Positions in the evaluated series that had no target direction
    pub unresolved_steps: Vec<usize>,
    #[serde(serialize_with = "serialize_error")]
    pub resolution_error: Option<ResolutionError>,
    pub resolved_by: Option<Tier>,
}

fn serialize_error<S: serde::Serializer>(
    error: &Option<ResolutionError>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match error {
        Some(e) => serializer.serialize_some(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

/// Target direction source for one step
enum StepTarget {
    /// Geocentric body position (km)
    Position([f64; 3]),
    /// Fixed sky coordinates (degrees)
    RaDec(f64, f64),
    Missing,
}

impl Constraint {
    /// Evaluate a moving target over the time grid
    ///
    /// A body target needs `resolver`. Steps whose direction is unknown are
    /// violated with severity 1; with [`OnFailure::Abort`] a failed
    /// resolution is returned as an error instead.
    pub fn evaluate_moving(
        &self,
        ctx: &dyn EphemerisContext,
        target: &MovingTarget,
        resolver: Option<&BodyResolver>,
        options: &MovingOptions,
    ) -> Result<MovingVisibilityResult> {
        let (indices, times) = Self::selected_indices(ctx, options.time_indices.as_deref())?;
        let cancel = options.cancel.as_ref();

        let mut resolution_error = None;
        let mut resolved_by = None;
        let steps: Vec<StepTarget> = match target {
            MovingTarget::Body { id } => {
                let resolver = resolver.ok_or_else(|| {
                    ConstraintError::config(format!("no body resolver available for '{id}'"))
                })?;
                check_cancelled(cancel)?;
                let resolution = resolver.resolve(id, &times, &options.resolve);
                let positions = match resolution {
                    Resolution::Local(track) | Resolution::Network(track) => {
                        resolved_by = Some(track.tier);
                        track.positions.clone()
                    }
                    Resolution::Failed { error, partial } => {
                        if options.on_failure == OnFailure::Abort {
                            return Err(error.into());
                        }
                        warn!(body = %id, %error, "degrading moving-target evaluation");
                        resolution_error = Some(error);
                        partial.map(|p| p.positions).unwrap_or_default()
                    }
                };
                (0..times.len())
                    .map(|k| match positions.get(k).copied().flatten() {
                        Some(p) => StepTarget::Position(p),
                        None => StepTarget::Missing,
                    })
                    .collect()
            }
            MovingTarget::Coordinates { ras, decs } => {
                if ras.len() != times.len() || decs.len() != times.len() {
                    return Err(ConstraintError::config(format!(
                        "coordinate arrays have {} entries but {} instants are evaluated",
                        ras.len(),
                        times.len()
                    )));
                }
                ras.iter()
                    .zip(decs)
                    .map(|(&ra, &dec)| {
                        if ra.is_finite() && dec.is_finite() && (-90.0..=90.0).contains(&dec) {
                            StepTarget::RaDec(ra, dec)
                        } else {
                            StepTarget::Missing
                        }
                    })
                    .collect()
            }
        };
        debug!(constraint = %self.name(), samples = indices.len(), "evaluating moving target");

        let n = indices.len();
        let mut evaluations = Vec::with_capacity(n);
        let mut ras = Vec::with_capacity(n);
        let mut decs = Vec::with_capacity(n);
        let mut unresolved_steps = Vec::new();
        for (k, (&index, step)) in indices.iter().zip(&steps).enumerate() {
            check_cancelled(cancel)?;
            let sample = self.sample(ctx, index)?;
            let radec = match *step {
                StepTarget::Position(p) => vector_to_radec(&subtract(&p, &sample.position)),
                StepTarget::RaDec(ra, dec) => Some((ra, dec)),
                StepTarget::Missing => None,
            };
            match radec {
                Some((ra, dec)) => {
                    evaluations
                        .push(self.check_direction(&sample, &radec_to_unit_vector(ra, dec)));
                    ras.push(Some(ra));
                    decs.push(Some(dec));
                }
                None => {
                    evaluations.push(Evaluation::fail(1.0));
                    ras.push(None);
                    decs.push(None);
                    unresolved_steps.push(k);
                }
            }
        }

        let result =
            ConstraintResult::from_series(self.name(), times, &evaluations, |s| self.describe(s));
        Ok(MovingVisibilityResult {
            visibility: result.visibility(),
            result,
            ras,
            decs,
            unresolved_steps,
            resolution_error,
            resolved_by,
        })
    }
}
