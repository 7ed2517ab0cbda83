/// Earth limb avoidance constraint
use serde::{Deserialize, Serialize};

use super::core::{angle_scale, check_range, ConstraintEvaluator, Evaluation};
use crate::ephemeris::{EphemerisSample, PlatformKind};
use crate::utils::config::{EARTH_RADIUS_KM, HORIZON_REFRACTION_DEG};
use crate::utils::geo::altitude_deg;
use crate::utils::vector_math::{angular_separation, vector_magnitude};

/// Configuration for Earth limb avoidance
///
/// Angles are measured from the limb: `min_angle = 10` keeps the target at
/// least 10° above the apparent edge of the Earth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarthLimbConfig {
    pub min_angle: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_angle: Option<f64>,
    /// Ground platforms: lower the horizon by nominal refraction
    #[serde(default)]
    pub include_refraction: bool,
    /// Ground platforms: lower the horizon by the dip due to site height
    #[serde(default)]
    pub horizon_dip: bool,
}

impl EarthLimbConfig {
    pub(crate) fn to_evaluator(&self) -> EarthLimbEvaluator {
        EarthLimbEvaluator {
            min_angle_deg: self.min_angle,
            max_angle_deg: self.max_angle,
            include_refraction: self.include_refraction,
            horizon_dip: self.horizon_dip,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct EarthLimbEvaluator {
    min_angle_deg: f64,
    max_angle_deg: Option<f64>,
    include_refraction: bool,
    horizon_dip: bool,
}

/// Depression of the sea-level horizon seen from `height_km` (degrees)
pub(crate) fn horizon_dip_deg(height_km: f64) -> f64 {
    if height_km <= 0.0 {
        return 0.0;
    }
    (EARTH_RADIUS_KM / (EARTH_RADIUS_KM + height_km))
        .clamp(-1.0, 1.0)
        .acos()
        .to_degrees()
}

impl EarthLimbEvaluator {
    /// Apparent angular radius of the Earth and the target's angle from the
    /// Earth's centre, both in degrees
    fn geometry(&self, sample: &EphemerisSample, target: &[f64; 3]) -> (f64, f64) {
        match sample.platform {
            PlatformKind::Spacecraft => (
                sample.earth_radius_deg,
                angular_separation(target, &sample.earth_center_direction()),
            ),
            PlatformKind::Ground => {
                // The local horizon is the limb; corrections lower it.
                let mut radius = 90.0;
                if self.horizon_dip {
                    let height = sample
                        .geodetic
                        .map(|g| g.height_km)
                        .unwrap_or_else(|| vector_magnitude(&sample.position) - EARTH_RADIUS_KM);
                    radius -= horizon_dip_deg(height);
                }
                if self.include_refraction {
                    radius -= HORIZON_REFRACTION_DEG;
                }
                (radius, 90.0 + altitude_deg(target, &sample.zenith()))
            }
        }
    }
}

impl ConstraintEvaluator for EarthLimbEvaluator {
    fn evaluate_sample(&self, sample: &EphemerisSample, target: &[f64; 3]) -> Evaluation {
        let (earth_radius_deg, angle_from_center) = self.geometry(sample, target);
        let above_limb = angle_from_center - earth_radius_deg;
        check_range(above_limb, Some(self.min_angle_deg), self.max_angle_deg, angle_scale)
    }

    fn name(&self) -> String {
        match self.max_angle_deg {
            Some(max) => format!("EarthLimb(min={}°, max={}°)", self.min_angle_deg, max),
            None => format!("EarthLimb(min={}°)", self.min_angle_deg),
        }
    }

    fn violation_description(&self) -> String {
        format!(
            "Target within {:.1}° of the Earth limb",
            self.min_angle_deg
        )
    }
}
