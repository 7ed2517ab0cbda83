/// Moon phase constraint implementation
use serde::{Deserialize, Serialize};

use super::core::{angle_scale, check_range, ConstraintEvaluator, Evaluation};
use crate::ephemeris::EphemerisSample;
use crate::utils::config::MOON_PARTIAL_VISIBILITY_DEG;
use crate::utils::geo::altitude_deg;
use crate::utils::moon::{calculate_moon_illumination_from_vectors, moon_phase_name};
use crate::utils::vector_math::angular_separation;

/// How much of the Moon must be above the horizon for the constraint to apply
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoonVisibility {
    /// Moon centre above the horizon
    #[default]
    Full,
    /// Any part of the disc above the horizon
    Partial,
}

impl MoonVisibility {
    fn min_altitude_deg(self) -> f64 {
        match self {
            MoonVisibility::Full => 0.0,
            MoonVisibility::Partial => MOON_PARTIAL_VISIBILITY_DEG,
        }
    }
}

/// Configuration for Moon phase constraint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoonPhaseConfig {
    /// Maximum allowed Moon illumination fraction (0.0 = new moon, 1.0 = full moon)
    pub max_illumination: f64,
    /// Minimum allowed Moon illumination fraction (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_illumination: Option<f64>,
    /// Minimum allowed Moon distance in degrees (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_distance: Option<f64>,
    /// Maximum allowed Moon distance in degrees (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_distance: Option<f64>,
    /// Whether to enforce constraint when Moon is below horizon (default: false)
    #[serde(default)]
    pub enforce_when_below_horizon: bool,
    #[serde(default)]
    pub moon_visibility: MoonVisibility,
}

impl MoonPhaseConfig {
    pub(crate) fn to_evaluator(&self) -> MoonPhaseEvaluator {
        MoonPhaseEvaluator {
            max_illumination: self.max_illumination,
            min_illumination: self.min_illumination,
            min_distance: self.min_distance,
            max_distance: self.max_distance,
            enforce_when_below_horizon: self.enforce_when_below_horizon,
            moon_visibility: self.moon_visibility,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct MoonPhaseEvaluator {
    max_illumination: f64,
    min_illumination: Option<f64>,
    min_distance: Option<f64>,
    max_distance: Option<f64>,
    enforce_when_below_horizon: bool,
    moon_visibility: MoonVisibility,
}

impl MoonPhaseEvaluator {
    fn illumination(sample: &EphemerisSample) -> f64 {
        calculate_moon_illumination_from_vectors(sample.sun_relative(), sample.moon_relative())
    }
}

impl ConstraintEvaluator for MoonPhaseEvaluator {
    fn evaluate_sample(&self, sample: &EphemerisSample, target: &[f64; 3]) -> Evaluation {
        let moon_rel = sample.moon_relative();
        if !self.enforce_when_below_horizon {
            let moon_alt = altitude_deg(&moon_rel, &sample.zenith());
            if moon_alt < self.moon_visibility.min_altitude_deg() {
                return Evaluation::pass(0.0);
            }
        }

        let phase = check_range(
            Self::illumination(sample),
            self.min_illumination,
            Some(self.max_illumination),
            |_| 1.0,
        );
        if self.min_distance.is_none() && self.max_distance.is_none() {
            return phase;
        }

        let distance = check_range(
            angular_separation(target, &moon_rel),
            self.min_distance,
            self.max_distance,
            angle_scale,
        );
        match (phase.satisfied, distance.satisfied) {
            (true, true) => Evaluation::pass(phase.margin().min(distance.margin())),
            (false, true) => phase,
            (true, false) => distance,
            (false, false) => Evaluation::fail(phase.severity().max(distance.severity())),
        }
    }

    fn name(&self) -> String {
        let mut parts = Vec::new();

        match self.min_illumination {
            Some(min) => parts.push(format!("illum={:.2}-{:.2}", min, self.max_illumination)),
            None => parts.push(format!("illum≤{:.2}", self.max_illumination)),
        }

        match (self.min_distance, self.max_distance) {
            (Some(min), Some(max)) => parts.push(format!("dist={min:.1}°-{max:.1}°")),
            (Some(min), None) => parts.push(format!("dist≥{min:.1}°")),
            (None, Some(max)) => parts.push(format!("dist≤{max:.1}°")),
            (None, None) => {}
        }

        if !self.enforce_when_below_horizon {
            parts.push("no-enforce-below-horizon".to_string());
        }
        if self.moon_visibility == MoonVisibility::Partial {
            parts.push("visibility=partial".to_string());
        }

        format!("MoonPhaseConstraint({})", parts.join(", "))
    }

    fn violation_description(&self) -> String {
        format!(
            "Moon too bright (max illumination {:.2}, {}) or too close",
            self.max_illumination,
            moon_phase_name(self.max_illumination)
        )
    }
}
