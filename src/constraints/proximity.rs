/// Angular proximity constraints: Sun, Moon, named bodies and orbit RAM
use serde::{Deserialize, Serialize};

use super::core::{angle_scale, check_range, ConstraintEvaluator, Evaluation};
use crate::ephemeris::EphemerisSample;
use crate::utils::vector_math::angular_separation;

/// Configuration for a minimum/maximum separation from a reference direction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProximityConfig {
    /// Minimum allowed angular separation in degrees
    pub min_angle: f64,
    /// Maximum allowed angular separation in degrees (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_angle: Option<f64>,
}

/// Configuration for proximity to a named solar-system body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyProximityConfig {
    /// NAIF id, body name or designation
    pub body: String,
    pub min_angle: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_angle: Option<f64>,
}

/// Direction the separation is measured from
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Reference {
    Sun,
    Moon,
    Body(String),
    Ram,
}

impl Reference {
    fn label(&self) -> &str {
        match self {
            Reference::Sun => "Sun",
            Reference::Moon => "Moon",
            Reference::Body(name) => name,
            Reference::Ram => "orbit RAM",
        }
    }

    fn direction(&self, sample: &EphemerisSample) -> Option<[f64; 3]> {
        match self {
            Reference::Sun => Some(sample.sun_relative()),
            Reference::Moon => Some(sample.moon_relative()),
            Reference::Body(name) => sample.body_relative(name),
            Reference::Ram => sample.ram_direction(),
        }
    }
}

impl ProximityConfig {
    pub(crate) fn to_evaluator(&self, reference: Reference) -> ProximityEvaluator {
        ProximityEvaluator {
            reference,
            min_angle_deg: self.min_angle,
            max_angle_deg: self.max_angle,
        }
    }
}

impl BodyProximityConfig {
    pub(crate) fn to_evaluator(&self) -> ProximityEvaluator {
        ProximityEvaluator {
            reference: Reference::Body(self.body.clone()),
            min_angle_deg: self.min_angle,
            max_angle_deg: self.max_angle,
        }
    }
}

/// Evaluator for every separation-from-a-direction constraint
#[derive(Debug, Clone)]
pub(crate) struct ProximityEvaluator {
    reference: Reference,
    min_angle_deg: f64,
    max_angle_deg: Option<f64>,
}

impl ProximityEvaluator {
    pub(crate) fn reference(&self) -> &Reference {
        &self.reference
    }
}

impl ConstraintEvaluator for ProximityEvaluator {
    fn evaluate_sample(&self, sample: &EphemerisSample, target: &[f64; 3]) -> Evaluation {
        // A missing reference cannot be judged; the engine rejects contexts
        // that cannot supply one before evaluation starts.
        let Some(direction) = self.reference.direction(sample) else {
            return Evaluation::fail(1.0);
        };
        let angle_deg = angular_separation(target, &direction);
        check_range(angle_deg, Some(self.min_angle_deg), self.max_angle_deg, angle_scale)
    }

    fn name(&self) -> String {
        let prefix = match &self.reference {
            Reference::Sun => "SunProximity".to_string(),
            Reference::Moon => "MoonProximity".to_string(),
            Reference::Body(body) => format!("BodyProximity(body='{body}', "),
            Reference::Ram => "OrbitRamConstraint".to_string(),
        };
        let bounds = match self.max_angle_deg {
            Some(max) => format!("min={}°, max={}°", self.min_angle_deg, max),
            None => format!("min={}°", self.min_angle_deg),
        };
        match &self.reference {
            Reference::Body(_) => format!("{prefix}{bounds})"),
            _ => format!("{prefix}({bounds})"),
        }
    }

    fn violation_description(&self) -> String {
        match self.max_angle_deg {
            Some(max) => format!(
                "Target too close to {} (min: {:.1}°) or too far (max: {:.1}°)",
                self.reference.label(),
                self.min_angle_deg,
                max
            ),
            None => format!(
                "Target too close to {} (min allowed: {:.1}°)",
                self.reference.label(),
                self.min_angle_deg
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ephemeris::PlatformKind;
    use crate::utils::config::AU_TO_KM;
    use crate::utils::vector_math::radec_to_unit_vector;
    use chrono::{TimeZone, Utc};

    fn sample() -> EphemerisSample {
        EphemerisSample::from_positions(
            0,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            PlatformKind::Spacecraft,
            [7000.0, 0.0, 0.0],
            Some([0.0, 7.5, 0.0]),
            [AU_TO_KM, 0.0, 0.0],
            [0.0, 384_400.0, 0.0],
        )
    }

    #[test]
    fn test_sun_min_angle() {
        let sun = ProximityConfig { min_angle: 45.0, max_angle: None }.to_evaluator(Reference::Sun);
        let near = sun.evaluate_sample(&sample(), &radec_to_unit_vector(30.0, 0.0));
        assert!(!near.satisfied);
        assert!((near.severity() - 15.0 / 45.0).abs() < 1e-6);
        assert!(sun.evaluate_sample(&sample(), &radec_to_unit_vector(90.0, 0.0)).satisfied);
        assert_eq!(sun.name(), "SunProximity(min=45°)");
    }

    #[test]
    fn test_ram_uses_velocity_direction() {
        let ram = ProximityConfig { min_angle: 10.0, max_angle: Some(60.0) }.to_evaluator(Reference::Ram);
        assert!(!ram.evaluate_sample(&sample(), &radec_to_unit_vector(90.0, 0.0)).satisfied);
        assert!(ram.evaluate_sample(&sample(), &radec_to_unit_vector(90.0, 30.0)).satisfied);
        assert!(!ram.evaluate_sample(&sample(), &radec_to_unit_vector(270.0, 0.0)).satisfied);
    }

    #[test]
    fn test_body_missing_from_sample_is_violated() {
        let cfg = BodyProximityConfig { body: "Mars".into(), min_angle: 5.0, max_angle: None };
        let eval = cfg.to_evaluator();
        assert!(!eval.evaluate_sample(&sample(), &[0.0, 0.0, 1.0]).satisfied);
        let with_mars = sample().with_body("Mars", [0.0, 0.0, 2e8]);
        assert!(!eval.evaluate_sample(&with_mars, &[0.0, 0.0, 1.0]).satisfied);
        assert!(eval.evaluate_sample(&with_mars, &[0.0, 1.0, 0.0]).satisfied);
        assert_eq!(eval.name(), "BodyProximity(body='Mars', min=5°)");
    }
}
