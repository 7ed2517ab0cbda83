/// Airmass constraint implementation
use serde::{Deserialize, Serialize};

use super::core::{check_range, ConstraintEvaluator, Evaluation};
use crate::ephemeris::EphemerisSample;
use crate::utils::geo::altitude_deg;

/// Configuration for Airmass constraint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirmassConfig {
    /// Maximum allowed airmass (lower values = better observing conditions)
    pub max_airmass: f64,
    /// Minimum allowed airmass (optional, for excluding very high targets)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_airmass: Option<f64>,
}

impl AirmassConfig {
    pub(crate) fn to_evaluator(&self) -> AirmassEvaluator {
        AirmassEvaluator {
            max_airmass: self.max_airmass,
            min_airmass: self.min_airmass,
        }
    }
}

/// Relative air mass at a given apparent altitude (Kasten & Young 1989)
///
/// Infinite at or below the horizon.
pub fn altitude_to_airmass(altitude_deg: f64) -> f64 {
    if altitude_deg <= 0.0 {
        return f64::INFINITY;
    }
    1.0 / (altitude_deg.to_radians().sin() + 0.50572 * (altitude_deg + 6.07995).powf(-1.6364))
}

#[derive(Debug, Clone)]
pub(crate) struct AirmassEvaluator {
    max_airmass: f64,
    min_airmass: Option<f64>,
}

impl ConstraintEvaluator for AirmassEvaluator {
    fn evaluate_sample(&self, sample: &EphemerisSample, target: &[f64; 3]) -> Evaluation {
        let airmass = altitude_to_airmass(altitude_deg(target, &sample.zenith()));
        if !airmass.is_finite() {
            return Evaluation::fail(1.0);
        }
        check_range(airmass, self.min_airmass, Some(self.max_airmass), |bound| bound.abs().max(1.0))
    }

    fn name(&self) -> String {
        match self.min_airmass {
            Some(min) => format!(
                "AirmassConstraint(min={:.2}, max={:.2})",
                min, self.max_airmass
            ),
            None => format!("AirmassConstraint(max={:.2})", self.max_airmass),
        }
    }

    fn violation_description(&self) -> String {
        format!("Airmass above {:.2} or target below horizon", self.max_airmass)
    }
}
