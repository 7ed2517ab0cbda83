/// Orbit pole direction constraint implementation
use serde::{Deserialize, Serialize};

use super::core::{angle_scale, check_range, ConstraintEvaluator, Evaluation};
use crate::ephemeris::EphemerisSample;
use crate::utils::vector_math::angular_separation;

/// Configuration for Orbit Pole constraint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrbitPoleConfig {
    /// Minimum allowed angular separation from the nearer orbital pole in
    /// degrees, within [0, 90]
    pub min_angle: f64,
    /// Maximum allowed angular separation from the nearer orbital pole in
    /// degrees, within [0, 90] (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_angle: Option<f64>,
    /// Measure the minimum from the Earth limb point below the pole
    #[serde(default)]
    pub earth_limb_pole: bool,
}

impl OrbitPoleConfig {
    pub(crate) fn to_evaluator(&self) -> OrbitPoleEvaluator {
        OrbitPoleEvaluator {
            min_angle_deg: self.min_angle,
            max_angle_deg: self.max_angle,
            earth_limb_pole: self.earth_limb_pole,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct OrbitPoleEvaluator {
    min_angle_deg: f64,
    max_angle_deg: Option<f64>,
    earth_limb_pole: bool,
}

impl OrbitPoleEvaluator {
    fn effective_min(&self, sample: &EphemerisSample) -> f64 {
        if self.earth_limb_pole {
            sample.earth_radius_deg + self.min_angle_deg - 90.0
        } else {
            self.min_angle_deg
        }
    }
}

impl ConstraintEvaluator for OrbitPoleEvaluator {
    fn evaluate_sample(&self, sample: &EphemerisSample, target: &[f64; 3]) -> Evaluation {
        let Some(pole) = sample.orbit_pole() else {
            return Evaluation::fail(1.0);
        };
        let theta = angular_separation(target, &pole);
        let angle_deg = theta.min(180.0 - theta);
        check_range(
            angle_deg,
            Some(self.effective_min(sample)),
            self.max_angle_deg,
            angle_scale,
        )
    }

    fn name(&self) -> String {
        let limb = if self.earth_limb_pole { ", earth_limb_pole" } else { "" };
        match self.max_angle_deg {
            Some(max) => format!(
                "OrbitPoleConstraint(min={:.1}°, max={:.1}°{limb})",
                self.min_angle_deg, max
            ),
            None => format!("OrbitPoleConstraint(min={:.1}°{limb})", self.min_angle_deg),
        }
    }

    fn violation_description(&self) -> String {
        format!("Target within {:.1}° of the orbit pole", self.min_angle_deg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ephemeris::PlatformKind;
    use crate::utils::vector_math::radec_to_unit_vector;
    use chrono::{TimeZone, Utc};

    fn equatorial_orbit() -> EphemerisSample {
        EphemerisSample::from_positions(
            0,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            PlatformKind::Spacecraft,
            [7000.0, 0.0, 0.0],
            Some([0.0, 7.5, 0.0]),
            [1.5e8, 0.0, 0.0],
            [0.0, 3.8e5, 0.0],
        )
    }

    #[test]
    fn test_both_poles_are_avoided() {
        let eval = OrbitPoleConfig { min_angle: 20.0, max_angle: None, earth_limb_pole: false }
            .to_evaluator();
        let s = equatorial_orbit();
        assert!(!eval.evaluate_sample(&s, &radec_to_unit_vector(0.0, 80.0)).satisfied);
        assert!(!eval.evaluate_sample(&s, &radec_to_unit_vector(0.0, -80.0)).satisfied);
        assert!(eval.evaluate_sample(&s, &radec_to_unit_vector(0.0, 60.0)).satisfied);
    }

    #[test]
    fn test_earth_limb_pole_shifts_minimum() {
        let s = equatorial_orbit();
        // earth_radius ~65.7°, so the effective minimum is ~-4.3°: always satisfied
        let eval = OrbitPoleConfig { min_angle: 20.0, max_angle: None, earth_limb_pole: true }
            .to_evaluator();
        assert!(eval.evaluate_sample(&s, &radec_to_unit_vector(0.0, 89.0)).satisfied);
    }

    #[test]
    fn test_missing_velocity_is_violated() {
        let mut s = equatorial_orbit();
        s.velocity = None;
        let eval = OrbitPoleConfig { min_angle: 0.0, max_angle: None, earth_limb_pole: false }
            .to_evaluator();
        assert!(!eval.evaluate_sample(&s, &[1.0, 0.0, 0.0]).satisfied);
    }
}
